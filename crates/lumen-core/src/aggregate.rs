//! Course and cross-course progress figures.
//!
//! Course progress counts *watched videos*, not completed topics: the bar
//! reflects pacing, while the exam gate in [`crate::gate`] reflects mastery.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  enrollment,
  progress::{Progress, TopicCompletion},
  scoring::percent,
  store::ProgressStore,
};

// ─── Pure rules ──────────────────────────────────────────────────────────────

/// Share of the course's topics whose video has been watched.
pub fn course_percent(completions: &[TopicCompletion], total_topics: usize) -> u8 {
  let watched = completions.iter().filter(|c| c.video_watched).count();
  percent(watched, total_topics)
}

/// Mean of the per-course percentages, skipping courses still at zero.
///
/// A course the student has not started yet does not drag the figure down.
pub fn mean_of_started(values: impl IntoIterator<Item = u8>) -> u8 {
  let (sum, n) = values
    .into_iter()
    .filter(|v| *v > 0)
    .fold((0u32, 0u32), |(sum, n), v| (sum + u32::from(v), n + 1));
  if n == 0 { 0 } else { (sum / n) as u8 }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Per-course slice of a [`PerformanceReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStats {
  pub course_id:             Uuid,
  /// Topics the student has interacted with.
  pub touched_topics:        usize,
  pub completed_topics:      usize,
  pub completion_percentage: u8,
}

/// Completion statistics for the admin "student performance" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceReport {
  pub student_id:            Uuid,
  pub touched_topics:        usize,
  pub completed_topics:      usize,
  pub completion_percentage: u8,
  pub courses:               Vec<CourseStats>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct Aggregator<S> {
  store: Arc<S>,
}

impl<S> Clone for Aggregator<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: ProgressStore> Aggregator<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Recompute and persist `overall_progress` for one course, then refresh
  /// the student's cross-course figure.
  pub async fn recompute_course_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Progress> {
    let progress =
      enrollment::require_progress(&*self.store, student_id, course_id).await?;

    let pct = self.percent_for(&progress).await?;
    let progress = self
      .store
      .set_course_progress(progress.progress_id, pct)
      .await
      .map_err(Error::store)?;

    let overall = self.overall_progress(student_id).await?;
    self
      .store
      .set_student_progress(student_id, overall)
      .await
      .map_err(Error::store)?;

    tracing::debug!(%student_id, %course_id, pct, overall, "progress recomputed");
    Ok(progress)
  }

  /// Live course percentage, computed from completion rows. `0` for a
  /// student who has not enrolled.
  pub async fn course_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<u8> {
    self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseNotFound(course_id))?;

    match self
      .store
      .get_progress(student_id, course_id)
      .await
      .map_err(Error::store)?
    {
      Some(progress) => self.percent_for(&progress).await,
      None => Ok(0),
    }
  }

  /// Mean of the stored course percentages, excluding courses at zero.
  pub async fn overall_progress(&self, student_id: Uuid) -> Result<u8> {
    let rows = self
      .store
      .list_progress(student_id)
      .await
      .map_err(Error::store)?;
    Ok(mean_of_started(rows.iter().map(|p| p.overall_progress)))
  }

  pub async fn performance_report(
    &self,
    student_id: Uuid,
  ) -> Result<PerformanceReport> {
    enrollment::require_student(&*self.store, student_id).await?;

    let rows = self
      .store
      .list_progress(student_id)
      .await
      .map_err(Error::store)?;

    let mut courses = Vec::with_capacity(rows.len());
    for progress in &rows {
      let completions = self
        .store
        .list_completions(progress.progress_id)
        .await
        .map_err(Error::store)?;
      let touched = completions.len();
      let completed = completions.iter().filter(|c| c.completed).count();
      courses.push(CourseStats {
        course_id:             progress.course_id,
        touched_topics:        touched,
        completed_topics:      completed,
        completion_percentage: percent(completed, touched),
      });
    }

    let touched = courses.iter().map(|c| c.touched_topics).sum();
    let completed = courses.iter().map(|c| c.completed_topics).sum();

    Ok(PerformanceReport {
      student_id,
      touched_topics: touched,
      completed_topics: completed,
      completion_percentage: percent(completed, touched),
      courses,
    })
  }

  async fn percent_for(&self, progress: &Progress) -> Result<u8> {
    let total = self
      .store
      .list_topics(progress.course_id)
      .await
      .map_err(Error::store)?
      .len();
    let completions = self
      .store
      .list_completions(progress.progress_id)
      .await
      .map_err(Error::store)?;
    Ok(course_percent(&completions, total))
  }
}
