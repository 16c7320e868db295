use actix_web::web;
use blob_store::LocalFileBlobStore;

pub mod health_service;
pub mod multipart;
pub mod upload_service;

pub const APP_TYPE_JSON: &str = "application/json";

pub struct AppState {
    pub(crate) store: LocalFileBlobStore,
    pub(crate) max_upload_size: usize,
}

impl AppState {
    pub fn new(store: LocalFileBlobStore, max_upload_size: usize) -> Self {
        Self { store, max_upload_size }
    }
}

/// Registers every route the server answers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_service::health)
        .service(health_service::hello)
        .service(web::scope("/api/v1").service(health_service::health))
        .service(upload_service::upload)
        .service(upload_service::upload_multiple)
        .service(upload_service::list_files)
        .service(upload_service::download_file);
}
