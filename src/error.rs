use std::sync::OnceLock;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Environment;
use crate::models::ValidationError;

static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Decides once, at startup, whether 500 responses carry error details.
pub fn init(environment: Environment) {
    let _ = EXPOSE_DETAILS.set(environment.exposes_error_details());
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// Wraps an unexpected failure and logs it in the current span.
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        let message = message.into();
        let source = source.into();
        tracing::error!(error = %format!("{source:#}"), "{message}");
        AppError::Internal { message, source }
    }

    /// Anticipated errors whose message is safe to show to the caller.
    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Internal { .. })
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.0)
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    /// `fail` for client errors, `error` for server errors.
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body(expose_details()))
    }
}

impl AppError {
    /// The response envelope; `expose` adds the source chain of internal
    /// errors.
    pub(crate) fn body(&self, expose: bool) -> ErrorBody {
        let error = match self {
            AppError::Internal { source, .. } if expose => Some(format!("{source:#}")),
            _ => None,
        };
        ErrorBody {
            status: if self.is_operational() { "fail" } else { "error" }.to_string(),
            message: self.to_string(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_errors_map_to_client_statuses() {
        let validation = AppError::validation("Title is required");
        assert!(validation.is_operational());
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let missing = AppError::not_found("Todo not found");
        assert!(missing.is_operational());
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let internal = AppError::internal("Failed to fetch todos", anyhow::anyhow!("boom"));
        assert!(!internal.is_operational());
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn internal_errors_hide_details_unless_enabled() {
        // tests never call init, so details stay hidden
        let err = AppError::internal("Failed to fetch todos", anyhow::anyhow!("relation missing"));
        let response = err.error_response();
        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "error");
        assert_eq!(body.message, "Failed to fetch todos");
        assert_eq!(body.error, None);
    }

    #[test]
    fn development_exposes_the_source_chain() {
        let source = anyhow::anyhow!("relation \"todos\" does not exist").context("query failed");
        let err = AppError::internal("Failed to fetch todos", source);

        let body = err.body(Environment::Development.exposes_error_details());
        assert_eq!(body.status, "error");
        assert_eq!(body.message, "Failed to fetch todos");
        assert_eq!(
            body.error.as_deref(),
            Some("query failed: relation \"todos\" does not exist")
        );

        for environment in [Environment::Production, Environment::Test] {
            let body = err.body(environment.exposes_error_details());
            assert_eq!(body.error, None);
            assert_eq!(body.message, "Failed to fetch todos");
        }
    }

    #[test]
    fn client_errors_never_carry_details() {
        let body = AppError::validation("Title is required").body(true);
        assert_eq!(body.status, "fail");
        assert_eq!(body.error, None);
    }
}
