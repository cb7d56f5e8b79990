//! Topic completion tracking.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::Aggregator,
  enrollment,
  progress::{AssignmentGrade, EventKind, TopicCompletion, Transition},
  store::ProgressStore,
};

/// Records completion sub-events and keeps the course percentage current.
///
/// The aggregator is called directly whenever a recorded event can move the
/// percentage: a newly watched video, or a topic that just became complete.
pub struct Tracker<S> {
  store:      Arc<S>,
  aggregator: Aggregator<S>,
}

impl<S> Clone for Tracker<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      aggregator: self.aggregator.clone(),
    }
  }
}

impl<S: ProgressStore> Tracker<S> {
  pub fn new(store: Arc<S>, aggregator: Aggregator<S>) -> Self {
    Self { store, aggregator }
  }

  /// Apply `kind` to the student's completion row for `topic_id`.
  ///
  /// Replaying an event that is already recorded is a no-op and returns the
  /// row unchanged.
  pub async fn record_event(
    &self,
    student_id: Uuid,
    topic_id: Uuid,
    kind: EventKind,
  ) -> Result<TopicCompletion> {
    let topic = self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))?;

    let progress =
      enrollment::require_progress(&*self.store, student_id, topic.course_id)
        .await?;
    let completion =
      enrollment::ensure_completion(&*self.store, progress.progress_id, topic_id)
        .await?;

    if completion.has(kind) {
      tracing::debug!(%student_id, %topic_id, %kind, "event already recorded");
      return Ok(completion);
    }

    let (completion, transition) = self
      .store
      .mark_completion(
        completion.completion_id,
        kind,
        Utc::now(),
        topic.due_date(),
      )
      .await
      .map_err(Error::store)?;

    if transition.is_change()
      && kind == EventKind::AssignmentSubmitted
      && completion.assignment_late
    {
      tracing::info!(%student_id, %topic_id, "assignment submitted late");
    }

    match transition {
      Transition::Unchanged => {
        // Lost a race with an identical event; the winner recomputed.
        tracing::debug!(%student_id, %topic_id, %kind, "event already recorded");
      }
      Transition::Marked => {
        tracing::info!(%student_id, %topic_id, %kind, "event recorded");
        if kind == EventKind::VideoWatched {
          self
            .aggregator
            .recompute_course_progress(student_id, topic.course_id)
            .await?;
        }
      }
      Transition::Completed => {
        tracing::info!(%student_id, %topic_id, %kind, "topic completed");
        self
          .aggregator
          .recompute_course_progress(student_id, topic.course_id)
          .await?;
      }
    }

    Ok(completion)
  }

  /// Store a grade for a submitted assignment. The score is bounded by the
  /// assignment's `max_score`. Sub-flags are untouched.
  pub async fn grade_assignment(
    &self,
    student_id: Uuid,
    topic_id: Uuid,
    grade: AssignmentGrade,
  ) -> Result<TopicCompletion> {
    let topic = self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))?;

    let max_score = topic.max_score();
    if !(0.0..=max_score).contains(&grade.score) {
      return Err(Error::InvalidAssignmentScore {
        score: grade.score,
        max_score,
      });
    }
    let progress =
      enrollment::require_progress(&*self.store, student_id, topic.course_id)
        .await?;

    let completion = self
      .store
      .get_completion(progress.progress_id, topic_id)
      .await
      .map_err(Error::store)?
      .filter(|c| c.assignment_submitted)
      .ok_or(Error::AssignmentNotSubmitted(topic_id))?;

    let status = grade.status();
    let graded = self
      .store
      .record_grade(completion.completion_id, grade)
      .await
      .map_err(Error::store)?;
    tracing::info!(%student_id, %topic_id, %status, "assignment graded");
    Ok(graded)
  }
}
