//! Handlers for enrollment, completion events and per-course reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/students/{id}/courses/{course_id}/enrollment` | Get or create |
//! | `GET`  | `/students/{id}/courses/{course_id}/outline` | Every topic with its lock state |
//! | `GET`  | `/students/{id}/courses/{course_id}/unlocked` | Unlocked topic IDs |
//! | `GET`  | `/students/{id}/courses/{course_id}/progress` | Live percentage |
//! | `GET`  | `/students/{id}/courses/{course_id}/eligibility` | Exam and certificate gates |
//! | `POST` | `/students/{id}/topics/{topic_id}/events` | Body: `{"kind":"video_watched"}` |
//! | `PUT`  | `/students/{id}/topics/{topic_id}/assignment-score` | Body: [`AssignmentGrade`] |
//! | `GET`  | `/topics/{id}/submissions` | Grading queue, oldest first |

use axum::{
  Json,
  extract::{Path, State},
};
use lumen_core::{
  gate::Eligibility,
  portal::AssignmentSubmission,
  progress::{AssignmentGrade, EventKind, Progress, TopicCompletion},
  store::ProgressStore,
  unlock::TopicAccess,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `POST /students/{id}/courses/{course_id}/enrollment`
pub async fn enroll<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Progress>, ApiError> {
  Ok(Json(state.portal.enroll(sid, cid).await?))
}

/// `GET /students/{id}/courses/{course_id}/outline`
pub async fn outline<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<TopicAccess>>, ApiError> {
  Ok(Json(state.portal.course_outline(sid, cid).await?))
}

/// `GET /students/{id}/courses/{course_id}/unlocked`
pub async fn unlocked<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
  Ok(Json(state.portal.unlocked_topics(sid, cid).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseProgress {
  pub student_id:       Uuid,
  pub course_id:        Uuid,
  pub overall_progress: u8,
}

/// `GET /students/{id}/courses/{course_id}/progress`
pub async fn progress<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<CourseProgress>, ApiError> {
  let overall_progress = state.portal.course_progress(sid, cid).await?;
  Ok(Json(CourseProgress {
    student_id: sid,
    course_id: cid,
    overall_progress,
  }))
}

/// `GET /students/{id}/courses/{course_id}/eligibility`
pub async fn eligibility<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Eligibility>, ApiError> {
  Ok(Json(state.portal.eligibility(sid, cid).await?))
}

#[derive(Debug, Deserialize)]
pub struct EventBody {
  pub kind: EventKind,
}

/// `POST /students/{id}/topics/{topic_id}/events`
pub async fn record_event<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, tid)): Path<(Uuid, Uuid)>,
  Json(body): Json<EventBody>,
) -> Result<Json<TopicCompletion>, ApiError> {
  Ok(Json(state.portal.record_topic_event(sid, tid, body.kind).await?))
}

/// `PUT /students/{id}/topics/{topic_id}/assignment-score`
pub async fn grade_assignment<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, tid)): Path<(Uuid, Uuid)>,
  Json(body): Json<AssignmentGrade>,
) -> Result<Json<TopicCompletion>, ApiError> {
  Ok(Json(state.portal.grade_assignment(sid, tid, body).await?))
}

/// `GET /topics/{id}/submissions`
pub async fn submissions<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(topic_id): Path<Uuid>,
) -> Result<Json<Vec<AssignmentSubmission>>, ApiError> {
  Ok(Json(state.portal.assignment_submissions(topic_id).await?))
}
