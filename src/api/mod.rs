use std::time::Instant;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::config::Environment;
use crate::error::AppError;

/// Builds an initialized test service wired like `main`, around `$repo`.
#[cfg(test)]
macro_rules! test_app {
    ($repo:expr) => {{
        let repo: std::sync::Arc<dyn $crate::repository::TodoRepository> = $repo;
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::from(repo))
                .app_data(actix_web::web::Data::new($crate::api::AppInfo::new(
                    $crate::config::Environment::Test,
                    "v1",
                )))
                .configure(|cfg| $crate::api::config(cfg, "v1"))
                .default_service(actix_web::web::route().to($crate::api::not_found))
                .wrap(actix_web::middleware::from_fn($crate::api::cors::cors)),
        )
        .await
    }};
}

pub mod cors;
pub mod docs;
pub mod health;
pub mod todos;

/// Process facts reported by the health and service-info endpoints.
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub started_at: Instant,
    pub environment: Environment,
    pub api_version: String,
}

impl AppInfo {
    pub fn new(environment: Environment, api_version: &str) -> Self {
        AppInfo {
            started_at: Instant::now(),
            environment,
            api_version: api_version.to_string(),
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Mounts every route: probes, docs, and the todo API under
/// `/api/{version}` and the `/{version}` alias.
pub fn config(cfg: &mut web::ServiceConfig, api_version: &str) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .configure(health::config)
    .route("/docs", web::get().to(docs::redirect_to_ui))
    .service(docs::swagger_ui(api_version))
    .service(
        web::scope(&format!("/api/{api_version}"))
            .configure(todos::config)
            .route("", web::get().to(service_info)),
    )
    .service(web::scope(&format!("/{api_version}")).configure(todos::config));
}

async fn service_info(info: web::Data<AppInfo>) -> HttpResponse {
    let version = &info.api_version;
    HttpResponse::Ok().json(json!({
        "message": "TODO Service API",
        "version": version,
        "timestamp": Utc::now(),
        "documentation": "/docs/",
        "endpoints": {
            "todos": format!("/api/{version}/todos"),
            "health": "/health",
        },
    }))
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::not_found(format!(
        "Can't find {} on this server!",
        req.path()
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use serde_json::Value;

    use crate::error::ErrorBody;
    use crate::repository::memory::InMemoryRepository;

    #[actix_web::test]
    async fn unknown_routes_answer_json_404() {
        let app = test_app!(Arc::new(InMemoryRepository::new()));
        let resp = test::call_service(&app, TestRequest::get().uri("/nowhere").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.status, "fail");
        assert_eq!(body.message, "Can't find /nowhere on this server!");
    }

    #[actix_web::test]
    async fn api_root_describes_the_service() {
        let app = test_app!(Arc::new(InMemoryRepository::new()));
        let resp = test::call_service(&app, TestRequest::get().uri("/api/v1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["version"], "v1");
        assert_eq!(body["endpoints"]["todos"], "/api/v1/todos");
    }
}
