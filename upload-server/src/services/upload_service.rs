use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use blob_store::{BlobStore, IncomingBlob, StoreError};
use serde::Serialize;
use crate::errors::UploadErr;
use crate::services::multipart::{read_form, SINGLE_FIELD};
use crate::services::{AppState, APP_TYPE_JSON};

#[derive(Serialize)]
struct SuccessResponse<T> {
    status: &'static str,
    message: String,
    data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> HttpResponse {
        HttpResponse::Ok()
            .content_type(APP_TYPE_JSON)
            .json(SuccessResponse { status: "success", message: message.into(), data })
    }
}

/// Single upload through the `file` field, or a batch when `files` parts are present.
#[post("/upload")]
pub async fn upload(
    payload: Multipart,
    shared_state: web::Data<AppState>,
) -> Result<HttpResponse, UploadErr> {
    let form = read_form(payload, shared_state.max_upload_size)
        .await
        .map_err(|e| match e {
            UploadErr::Multipart(e) => UploadErr::MissingFile(e.to_string()),
            other => other,
        })?;
    if !form.batch.is_empty() {
        return store_batch(&shared_state, form.batch).await;
    }

    let file = form.single.ok_or_else(|| {
        UploadErr::MissingFile(format!("no file part named \"{}\" in request", SINGLE_FIELD))
    })?;
    let stored = shared_state.store.put_blob(&file.original_name, &file.data).await?;
    tracing::info!("uploaded {} ({} bytes)", stored.filename, stored.size);
    Ok(SuccessResponse::ok("File uploaded successfully", stored))
}

#[post("/upload/multiple")]
pub async fn upload_multiple(
    payload: Multipart,
    shared_state: web::Data<AppState>,
) -> Result<HttpResponse, UploadErr> {
    let form = read_form(payload, shared_state.max_upload_size).await?;
    store_batch(&shared_state, form.batch).await
}

async fn store_batch(
    shared_state: &web::Data<AppState>,
    files: Vec<IncomingBlob>,
) -> Result<HttpResponse, UploadErr> {
    let stored = shared_state.store.put_batch(&files).await?;
    tracing::info!("uploaded batch of {} files", stored.len());
    Ok(SuccessResponse::ok(format!("{} files uploaded successfully", stored.len()), stored))
}

#[get("/files")]
pub async fn list_files(shared_state: web::Data<AppState>) -> Result<HttpResponse, UploadErr> {
    let listing = shared_state.store.list_blobs().await?;
    if !listing.directory_found {
        return Ok(SuccessResponse::ok("No uploads directory found", listing.entries));
    }
    Ok(SuccessResponse::ok(format!("Found {} files", listing.entries.len()), listing.entries))
}

#[get("/files/{filename:.*}")]
pub async fn download_file(
    req: HttpRequest,
    filename: web::Path<String>,
    shared_state: web::Data<AppState>,
) -> Result<HttpResponse, UploadErr> {
    let filename = filename.into_inner();
    let path = shared_state.store.locate_blob(&filename).await?;

    let file = NamedFile::open_async(&path)
        .await
        .map_err(StoreError::Read)?
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        });
    Ok(file.into_response(&req))
}
