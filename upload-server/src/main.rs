mod errors;
mod params;
mod services;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use blob_store::LocalFileBlobStore;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use crate::params::Args;
use crate::services::{configure, AppState};


#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let shared_state = web::Data::new(AppState::new(
        LocalFileBlobStore::new(&args.upload_dir),
        args.max_upload_size,
    ));

    tracing::info!("Storing uploads in {}", args.upload_dir);
    tracing::info!("Listening on http://{}", args.http_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(shared_state.clone())
            .configure(configure)
    })
        .bind(args.http_addr.clone())?
        .run()
        .await
}
