//! Handlers for student identity, payment and read-model endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/students` | Body: [`NewStudent`]; 409 if phone or email is taken |
//! | `GET`  | `/students/{id}` | 404 if not found |
//! | `POST` | `/students/{id}/payment` | Marks the account paid |
//! | `GET`  | `/students/{id}/dashboard` | Enrolled courses and overall progress |
//! | `GET`  | `/students/{id}/performance` | Completion statistics |
//! | `POST` | `/sessions` | Body: `{"phone":"..."}`; 403 until paid |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use lumen_core::{
  aggregate::PerformanceReport,
  catalog::{NewStudent, Student},
  portal::Dashboard,
  store::ProgressStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `POST /students`
pub async fn create<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  let student = state.portal.add_student(body).await?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `GET /students/{id}`
pub async fn get_one<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(state.portal.student(id).await?))
}

/// `POST /students/{id}/payment`
pub async fn confirm_payment<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(state.portal.confirm_payment(id).await?))
}

/// `GET /students/{id}/dashboard`
pub async fn dashboard<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Dashboard>, ApiError> {
  Ok(Json(state.portal.dashboard(id).await?))
}

/// `GET /students/{id}/performance`
pub async fn performance<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PerformanceReport>, ApiError> {
  Ok(Json(state.portal.performance_report(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
  pub phone: String,
}

/// `POST /sessions`
///
/// Only checks that the account may sign in. Issuing a session token is
/// left to the caller.
pub async fn sign_in<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<SessionBody>,
) -> Result<Json<Student>, ApiError> {
  Ok(Json(state.portal.admit(&body.phone).await?))
}
