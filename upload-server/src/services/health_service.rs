use actix_web::{get, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use crate::services::APP_TYPE_JSON;

#[derive(Serialize, Deserialize)]
struct Health {
    status: String,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct Hello {
    message: String,
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok()
        .content_type(APP_TYPE_JSON)
        .json(Health { status: "success".to_string(), message: "healthy".to_string() })
}

#[get("/hello")]
pub async fn hello() -> impl Responder {
    HttpResponse::Ok()
        .content_type(APP_TYPE_JSON)
        .json(Hello { message: "Hello, World!".to_string() })
}
