//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use lumen_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    let message = e.to_string();
    match e {
      CoreError::StudentNotFound(_)
      | CoreError::CourseNotFound(_)
      | CoreError::TopicNotFound(_)
      | CoreError::NotRegistered(_) => ApiError::NotFound(message),

      CoreError::NotEnrolled { .. }
      | CoreError::ConcurrentCreateConflict(_)
      | CoreError::DuplicateTopicOrder { .. }
      | CoreError::AlreadyRegistered(_)
      | CoreError::AssignmentNotSubmitted(_) => ApiError::Conflict(message),

      CoreError::PaymentPending(_)
      | CoreError::FinalExamLocked { .. }
      | CoreError::NotAStudent(_) => ApiError::Forbidden(message),

      CoreError::InvalidAssignmentScore { .. }
      | CoreError::InvalidMaxScore(_)
      | CoreError::InvalidTopicOrder
      | CoreError::InvalidCorrectOption(_)
      | CoreError::InvalidPassMark(_) => ApiError::BadRequest(message),

      CoreError::Store(source) => ApiError::Store(source),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
