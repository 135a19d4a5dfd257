use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::api::AppInfo;
use crate::repository::TodoRepository;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub uptime: f64,
    pub version: String,
    pub environment: String,
    pub database: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct Probe {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct Liveness {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub uptime: f64,
    pub pid: u32,
}

async fn database_reachable(repo: web::Data<dyn TodoRepository>) -> bool {
    let repo = repo.into_inner();
    match web::block(move || repo.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(error = %err, "Database ping failed");
            false
        }
        Err(err) => {
            warn!(error = %err, "Database ping was cancelled");
            false
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service and database state", body = HealthReport))
)]
#[get("/health")]
pub async fn healthcheck(
    info: web::Data<AppInfo>,
    repo: web::Data<dyn TodoRepository>,
) -> HttpResponse {
    let database = if database_reachable(repo).await {
        "healthy"
    } else {
        "unhealthy"
    };
    HttpResponse::Ok().json(HealthReport {
        status: "OK",
        timestamp: Utc::now(),
        uptime: info.uptime_seconds(),
        version: info.api_version.clone(),
        environment: info.environment.to_string(),
        database,
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve", body = Probe),
        (status = 503, description = "Database unreachable", body = Probe),
    )
)]
#[get("/health/ready")]
pub async fn readiness(repo: web::Data<dyn TodoRepository>) -> HttpResponse {
    if database_reachable(repo).await {
        HttpResponse::Ok().json(Probe {
            status: "ready",
            timestamp: Utc::now(),
        })
    } else {
        HttpResponse::ServiceUnavailable().json(Probe {
            status: "not ready",
            timestamp: Utc::now(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = Liveness))
)]
#[get("/health/live")]
pub async fn liveness(info: web::Data<AppInfo>) -> HttpResponse {
    HttpResponse::Ok().json(Liveness {
        status: "alive",
        timestamp: Utc::now(),
        uptime: info.uptime_seconds(),
        pid: std::process::id(),
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(healthcheck)
        .service(readiness)
        .service(liveness);
}
