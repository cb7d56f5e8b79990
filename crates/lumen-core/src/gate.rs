//! Final-exam and certificate eligibility.
//!
//! The exam gate needs *full* completion of every topic (video, quiz and
//! assignment), which is stricter than both unlocking and the progress bar.

use std::{collections::HashSet, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::Topic,
  progress::{Progress, TopicCompletion},
  store::ProgressStore,
};

/// Both predicates, as rendered next to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
  pub final_exam:  bool,
  pub certificate: bool,
}

/// `true` when the course has topics and every one of them is completed.
pub fn exam_open(topics: &[Topic], completions: &[TopicCompletion]) -> bool {
  let done: HashSet<Uuid> = completions
    .iter()
    .filter(|c| c.completed)
    .map(|c| c.topic_id)
    .collect();
  !topics.is_empty() && topics.iter().all(|t| done.contains(&t.topic_id))
}

pub fn certified(progress: &Progress) -> bool { progress.final_exam_passed }

pub struct CertificationGate<S> {
  store: Arc<S>,
}

impl<S> Clone for CertificationGate<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: ProgressStore> CertificationGate<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Option<Progress>> {
    self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseNotFound(course_id))?;
    self
      .store
      .get_progress(student_id, course_id)
      .await
      .map_err(Error::store)
  }

  /// Not enrolled reads as not eligible.
  pub async fn final_exam_eligible(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<bool> {
    let Some(progress) = self.progress(student_id, course_id).await? else {
      return Ok(false);
    };
    let topics = self.store.list_topics(course_id).await.map_err(Error::store)?;
    let completions = self
      .store
      .list_completions(progress.progress_id)
      .await
      .map_err(Error::store)?;
    Ok(exam_open(&topics, &completions))
  }

  pub async fn certificate_eligible(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<bool> {
    Ok(
      self
        .progress(student_id, course_id)
        .await?
        .is_some_and(|p| certified(&p)),
    )
  }

  pub async fn eligibility(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Eligibility> {
    Ok(Eligibility {
      final_exam:  self.final_exam_eligible(student_id, course_id).await?,
      certificate: self.certificate_eligible(student_id, course_id).await?,
    })
  }
}
