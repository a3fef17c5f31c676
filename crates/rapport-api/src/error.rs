//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Please authenticate")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<rapport_core::Error> for ApiError {
  fn from(e: rapport_core::Error) -> Self {
    use rapport_core::Error as Core;
    match e {
      Core::Validation(m) => Self::BadRequest(m),
      Core::InvalidTarget => Self::BadRequest(e.to_string()),
      Core::NotFound(m) => Self::NotFound(m),
      Core::NoSuchRequest(_) => Self::NotFound(e.to_string()),
      Core::Forbidden(m) => Self::Forbidden(m),
      Core::Conflict(m) => Self::Conflict(m),
      Core::Store(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
