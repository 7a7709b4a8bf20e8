use actix_web::{web, HttpResponse, Responder};
use finance_repo::HealthCheck;
use std::sync::Arc;

#[get("/health")]
pub async fn health_check(checker: web::Data<Arc<dyn HealthCheck>>) -> impl Responder {
    if checker.check().await {
        HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "unavailable" }))
    }
}
