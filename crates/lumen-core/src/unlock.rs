//! Sequential topic unlocking.
//!
//! The first topic of a course is always open. Every later topic opens once
//! the topic before it is open and its video has been watched. Unlocking is
//! purely navigational: the quiz and assignment of the previous topic are
//! not required.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::Topic,
  progress::TopicCompletion,
  store::ProgressStore,
};

// ─── Pure rules ──────────────────────────────────────────────────────────────

/// One row of a course outline, in course order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAccess {
  pub topic_id:             Uuid,
  pub title:                String,
  pub order:                u32,
  pub unlocked:             bool,
  pub video_watched:        bool,
  pub mcq_passed:           bool,
  pub assignment_submitted: bool,
  pub completed:            bool,
}

/// Walk `topics` in ascending `order` and decide which are open.
///
/// `topics` need not be sorted. Topics without a completion row count as
/// untouched.
pub fn outline(
  topics: &[Topic],
  completions: &[TopicCompletion],
) -> Vec<TopicAccess> {
  let by_topic: HashMap<Uuid, &TopicCompletion> =
    completions.iter().map(|c| (c.topic_id, c)).collect();

  let mut ordered: Vec<&Topic> = topics.iter().collect();
  ordered.sort_by_key(|t| t.order);

  let mut rows = Vec::with_capacity(ordered.len());
  // The first topic has no predecessor gating it.
  let mut open = true;

  for topic in ordered {
    let c = by_topic.get(&topic.topic_id);
    let video_watched = c.is_some_and(|c| c.video_watched);

    rows.push(TopicAccess {
      topic_id: topic.topic_id,
      title: topic.title.clone(),
      order: topic.order,
      unlocked: open,
      video_watched,
      mcq_passed: c.is_some_and(|c| c.mcq_passed),
      assignment_submitted: c.is_some_and(|c| c.assignment_submitted),
      completed: c.is_some_and(|c| c.completed),
    });

    open = open && video_watched;
  }

  rows
}

/// The unlocked topic IDs, in course order.
pub fn unlocked(topics: &[Topic], completions: &[TopicCompletion]) -> Vec<Uuid> {
  outline(topics, completions)
    .into_iter()
    .filter(|row| row.unlocked)
    .map(|row| row.topic_id)
    .collect()
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Reads topic ordering and completion state from the store on every call.
pub struct UnlockEngine<S> {
  store: Arc<S>,
}

impl<S> Clone for UnlockEngine<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: ProgressStore> UnlockEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Topics of the course and the student's completion rows for it. A
  /// student who has not enrolled has no rows.
  async fn load(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<(Vec<Topic>, Vec<TopicCompletion>)> {
    self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseNotFound(course_id))?;

    let topics = self.store.list_topics(course_id).await.map_err(Error::store)?;

    let completions = match self
      .store
      .get_progress(student_id, course_id)
      .await
      .map_err(Error::store)?
    {
      Some(p) => self
        .store
        .list_completions(p.progress_id)
        .await
        .map_err(Error::store)?,
      None => Vec::new(),
    };

    Ok((topics, completions))
  }

  /// Every topic of the course with its access state. A student who has not
  /// enrolled sees only the first topic open.
  pub async fn course_outline(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Vec<TopicAccess>> {
    let (topics, completions) = self.load(student_id, course_id).await?;
    Ok(outline(&topics, &completions))
  }

  pub async fn unlocked_topics(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Vec<Uuid>> {
    let (topics, completions) = self.load(student_id, course_id).await?;
    Ok(unlocked(&topics, &completions))
  }
}
