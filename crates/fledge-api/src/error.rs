//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Transient failure — the whole request is safe to retry.
  #[error("temporarily unavailable: {0}")]
  Unavailable(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<fledge_core::Error> for ApiError {
  fn from(err: fledge_core::Error) -> Self {
    use fledge_core::Error as E;
    match &err {
      E::Validation { .. } => Self::BadRequest(err.to_string()),
      E::RegistrationNotFound(_) | E::ReferenceNotFound(_) => {
        Self::NotFound(err.to_string())
      }
      E::InvalidTransition { .. } => Self::Conflict(err.to_string()),
      E::DuplicateReference { .. } => Self::Unavailable(err.to_string()),
      E::Store(_) => Self::Internal(err.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
