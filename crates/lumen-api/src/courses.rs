//! Handlers for course content.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/courses` | Body: [`CourseBody`]; `pass_mark` falls back to config |
//! | `GET`  | `/courses/{id}` | 404 if not found |
//! | `POST` | `/courses/{id}/topics` | Body: [`TopicBody`]; 409 on a taken order |
//! | `POST` | `/questions` | Body: [`NewQuestion`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use lumen_core::{
  catalog::{
    Assignment, ClassLevel, Course, NewCourse, NewQuestion, NewTopic,
  },
  store::ProgressStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Courses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CourseBody {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub class_level: ClassLevel,
  pub pass_mark:   Option<u8>,
}

/// `POST /courses`
pub async fn create<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<CourseBody>,
) -> Result<impl IntoResponse, ApiError> {
  let course = state
    .portal
    .add_course(NewCourse {
      title:       body.title,
      description: body.description,
      class_level: body.class_level,
      pass_mark:   body.pass_mark.unwrap_or(state.default_pass_mark),
    })
    .await?;
  Ok((StatusCode::CREATED, Json(course)))
}

/// `GET /courses/{id}`
pub async fn get_one<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Course>, ApiError> {
  Ok(Json(state.portal.course(id).await?))
}

// ─── Topics and questions ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TopicBody {
  pub title:      String,
  pub order:      u32,
  #[serde(default)]
  pub assignment: Option<Assignment>,
}

/// `POST /courses/{id}/topics`
pub async fn add_topic<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(course_id): Path<Uuid>,
  Json(body): Json<TopicBody>,
) -> Result<impl IntoResponse, ApiError> {
  let topic = state
    .portal
    .add_topic(NewTopic {
      course_id,
      title: body.title,
      order: body.order,
      assignment: body.assignment,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(topic)))
}

/// `POST /questions`
pub async fn add_question<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewQuestion>,
) -> Result<impl IntoResponse, ApiError> {
  let question = state.portal.add_question(body).await?;
  Ok((StatusCode::CREATED, Json(question)))
}
