//! Lookup and get-or-create helpers for progress and completion rows.
//!
//! Creation races are settled by the store's unique keys: the loser of an
//! insert race sees [`Insert::Conflict`] and re-fetches the winner's row
//! once.

use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::Student,
  progress::{Progress, TopicCompletion},
  store::{Insert, ProgressStore},
};

pub async fn require_student<S: ProgressStore>(
  store: &S,
  student_id: Uuid,
) -> Result<Student> {
  store
    .get_student(student_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::StudentNotFound(student_id))
}

/// The progress row for the pair, or `NotEnrolled`.
///
/// Reports `StudentNotFound` instead when the student does not exist at all.
pub async fn require_progress<S: ProgressStore>(
  store: &S,
  student_id: Uuid,
  course_id: Uuid,
) -> Result<Progress> {
  if let Some(progress) = store
    .get_progress(student_id, course_id)
    .await
    .map_err(Error::store)?
  {
    return Ok(progress);
  }

  require_student(store, student_id).await?;
  Err(Error::NotEnrolled { student_id, course_id })
}

/// Get or create the progress row for the pair. Callers check that the
/// student and course exist.
pub async fn ensure_progress<S: ProgressStore>(
  store: &S,
  student_id: Uuid,
  course_id: Uuid,
) -> Result<Progress> {
  if let Some(progress) = store
    .get_progress(student_id, course_id)
    .await
    .map_err(Error::store)?
  {
    return Ok(progress);
  }

  match store
    .create_progress(student_id, course_id)
    .await
    .map_err(Error::store)?
  {
    Insert::Created(progress) => {
      tracing::info!(%student_id, %course_id, "enrolled");
      Ok(progress)
    }
    Insert::Conflict => store
      .get_progress(student_id, course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ConcurrentCreateConflict("progress")),
  }
}

/// Get or create the completion row for a topic under `progress_id`.
pub async fn ensure_completion<S: ProgressStore>(
  store: &S,
  progress_id: Uuid,
  topic_id: Uuid,
) -> Result<TopicCompletion> {
  if let Some(completion) = store
    .get_completion(progress_id, topic_id)
    .await
    .map_err(Error::store)?
  {
    return Ok(completion);
  }

  match store
    .create_completion(progress_id, topic_id)
    .await
    .map_err(Error::store)?
  {
    Insert::Created(completion) => Ok(completion),
    Insert::Conflict => store
      .get_completion(progress_id, topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ConcurrentCreateConflict("topic completion")),
  }
}
