use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use shopflow::FlowError;
use thiserror::Error;

const GENERIC_FAILURE: &str = "Something went wrong on our side. Please try again later.";

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  /// A rejected form submission; `retry` is where the caller should go to try again.
  #[error("Form Rejected: {message}")]
  Form { message: String, retry: &'static str },

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Login required")]
  Unauthenticated,

  #[error("Admin role required")]
  Forbidden,

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Mail Delivery Error: {0}")]
  Mail(String),

  #[error("Storage Error: {0}")]
  Storage(#[from] std::io::Error),

  #[error("Session Error: {0}")]
  Session(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn form(message: impl Into<String>, retry: &'static str) -> Self {
    AppError::Form {
      message: message.into(),
      retry,
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Form { .. } => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Unauthenticated => StatusCode::SEE_OTHER,
      AppError::Forbidden => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({ "error": m })),
      AppError::Form { message, retry } => {
        HttpResponse::BadRequest().json(json!({ "error": message, "link": retry }))
      }
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({ "error": m, "link": "/login" })),
      AppError::Unauthenticated => HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .finish(),
      AppError::Forbidden => {
        tracing::warn!("Non-admin user attempted an admin route.");
        HttpResponse::Forbidden().json(json!({ "error": "Forbidden: you do not have admin access." }))
      }
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({ "error": m })),
      server_side => {
        tracing::error!(application_error = %server_side, "Responding with internal error");
        HttpResponse::InternalServerError().json(json!({ "error": GENERIC_FAILURE }))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unauthenticated_redirects_to_login() {
    let resp = AppError::Unauthenticated.error_response();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
  }

  #[test]
  fn downstream_failures_hide_detail() {
    let err = AppError::Mail("smtp relay refused: 550 mailbox unavailable".to_string());
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn engine_errors_become_workflow_errors() {
    let err: AppError = FlowError::HandlerMissing {
      step_name: "persist_order".to_string(),
    }
    .into();
    assert!(matches!(err, AppError::Workflow { .. }));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
