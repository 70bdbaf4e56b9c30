use crate::store::DocumentStore;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde_json::json;

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({
            "status": "healthy",
            "store": "mysql",
            "timestamp": "2024-01-01T08:00:00Z"
        }))
    ),
    tag = "Health"
)]
pub async fn health(store: web::Data<dyn DocumentStore>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "store": store.backend(),
        "timestamp": Utc::now(),
    }))
}
