//! Handlers for topic quizzes and final exams.
//!
//! Question sets are served without their answers. Submissions carry one
//! selected option (1–4, or 0 for blank) per served question, in order.

use axum::{
  Json,
  extract::{Path, State},
};
use lumen_core::{
  catalog::QuestionPrompt,
  progress::{ExamRecord, FinalExamSubmission},
  scoring::QuizOutcome,
  store::ProgressStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AnswersBody {
  pub answers: Vec<u8>,
}

/// `GET /topics/{id}/quiz`
pub async fn quiz<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(tid): Path<Uuid>,
) -> Result<Json<Vec<QuestionPrompt>>, ApiError> {
  Ok(Json(state.portal.quiz_prompts(tid).await?))
}

/// `POST /students/{id}/topics/{topic_id}/quiz`
pub async fn submit_quiz<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, tid)): Path<(Uuid, Uuid)>,
  Json(body): Json<AnswersBody>,
) -> Result<Json<QuizOutcome>, ApiError> {
  Ok(Json(state.portal.submit_quiz(sid, tid, &body.answers).await?))
}

/// `GET /courses/{id}/exam`
pub async fn exam<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path(cid): Path<Uuid>,
) -> Result<Json<Vec<QuestionPrompt>>, ApiError> {
  Ok(Json(state.portal.exam_prompts(cid).await?))
}

/// `POST /students/{id}/courses/{course_id}/exam`
pub async fn submit_exam<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
  Json(body): Json<AnswersBody>,
) -> Result<Json<ExamRecord>, ApiError> {
  Ok(Json(
    state
      .portal
      .submit_final_exam(sid, cid, &body.answers)
      .await?,
  ))
}

/// `GET /students/{id}/courses/{course_id}/exam`, newest attempt first.
pub async fn history<S: ProgressStore>(
  State(state): State<AppState<S>>,
  Path((sid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<FinalExamSubmission>>, ApiError> {
  Ok(Json(state.portal.exam_history(sid, cid).await?))
}
