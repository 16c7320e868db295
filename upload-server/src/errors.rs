use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use blob_store::StoreError;
use serde::Serialize;
use thiserror::Error;


#[derive(Debug, Error)]
pub enum UploadErr {
    #[error("Error retrieving file from request")]
    MissingFile(String),

    #[error("Error parsing multipart form")]
    Multipart(#[from] MultipartError),

    #[error("File too large")]
    TooLarge { limit: usize },

    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl UploadErr {
    fn detail(&self) -> Option<String> {
        match self {
            UploadErr::MissingFile(detail) => Some(detail.clone()),
            UploadErr::Multipart(e) => Some(e.to_string()),
            UploadErr::TooLarge { limit } => Some(format!("uploads are limited to {} bytes per request", limit)),
            UploadErr::Store(e) => e.detail(),
        }
    }
}

impl ResponseError for UploadErr {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadErr::MissingFile(_) | UploadErr::Multipart(_) => StatusCode::BAD_REQUEST,
            UploadErr::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadErr::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            UploadErr::Store(e) if e.is_caller_error() => StatusCode::BAD_REQUEST,
            UploadErr::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}: {:?}", self, self.detail());
        } else {
            tracing::debug!("rejected request: {}", self);
        }
        HttpResponse::build(status).json(ErrorBody {
            status: "error",
            message: self.to_string(),
            error: self.detail(),
        })
    }
}
