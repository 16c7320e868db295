use actix_multipart::{Field, Multipart};
use blob_store::IncomingBlob;
use futures_util::TryStreamExt as _;
use crate::errors::UploadErr;

/// Form field carrying a single upload.
pub const SINGLE_FIELD: &str = "file";
/// Form field repeated once per file in a batch upload.
pub const BATCH_FIELD: &str = "files";

#[derive(Debug, Default)]
pub struct FormFiles {
    pub single: Option<IncomingBlob>,
    pub batch: Vec<IncomingBlob>,
}

/// Pulls the file parts we care about out of a multipart body. Anything that
/// is not a file part named `file` or `files` is read and thrown away.
/// `limit` bounds the bytes kept across all parts of the request.
pub async fn read_form(mut payload: Multipart, limit: usize) -> Result<FormFiles, UploadErr> {
    let mut form = FormFiles::default();
    let mut buffered = 0usize;

    while let Some(mut field) = payload.try_next().await? {
        let content_disposition = field.content_disposition().cloned();
        let field_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        let original_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let wanted = match (field_name.as_str(), &original_name) {
            (_, None) => false,
            (SINGLE_FIELD, _) => form.single.is_none(),
            (BATCH_FIELD, _) => true,
            _ => false,
        };
        if !wanted {
            drain(&mut field).await?;
            continue;
        }

        let data = read_field(&mut field, limit - buffered, limit).await?;
        buffered += data.len();
        let blob = IncomingBlob::new(original_name.unwrap_or_default(), data);
        if field_name == BATCH_FIELD {
            form.batch.push(blob);
        } else {
            form.single = Some(blob);
        }
    }
    Ok(form)
}

async fn read_field(field: &mut Field, remaining: usize, limit: usize) -> Result<Vec<u8>, UploadErr> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if data.len() + chunk.len() > remaining {
            return Err(UploadErr::TooLarge { limit });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn drain(field: &mut Field) -> Result<(), UploadErr> {
    while field.try_next().await?.is_some() {}
    Ok(())
}
