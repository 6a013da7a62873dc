use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::{db::Store, error::Result};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

async fn ping(store: &dyn Store) -> Result<()> {
    store.connect().await?.ping().await
}

#[get("/health")]
pub async fn health_check(store: web::Data<dyn Store>) -> HttpResponse {
    match ping(store.get_ref()).await {
        Ok(()) => HttpResponse::Ok().json(HealthCheckResponse {
            status: "healthy".to_string(),
        }),
        Err(err) => {
            log::error!("Health check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(HealthCheckResponse {
                status: "unavailable".to_string(),
            })
        }
    }
}
