//! Progress records and completion events.
//!
//! A [`Progress`] row ties a student to a course; a [`TopicCompletion`] row
//! tracks the three sub-events of one topic under that progress. Sub-flags
//! only ever move from `false` to `true`, and the denormalised `completed`
//! flag is recomputed in the same write that flips a sub-flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ─── Events ──────────────────────────────────────────────────────────────────

/// A completion sub-event reported by the surrounding web layer.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
  VideoWatched,
  McqPassed,
  AssignmentSubmitted,
}

/// The effect of applying an [`EventKind`] to a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The sub-flag was already set; nothing changed.
  Unchanged,
  /// The sub-flag flipped but the topic is not yet complete.
  Marked,
  /// The sub-flag flipped and the topic became complete.
  Completed,
}

impl Transition {
  pub fn is_change(self) -> bool { !matches!(self, Self::Unchanged) }
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// Review state of a submitted assignment.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentStatus {
  Submitted,
  Graded,
  /// Sent back to the student for revision.
  Returned,
}

/// A mentor's verdict on a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentGrade {
  pub score:    f64,
  #[serde(default)]
  pub feedback: String,
  /// Return the work for revision instead of marking it graded.
  #[serde(default)]
  pub returned: bool,
}

impl AssignmentGrade {
  pub fn status(&self) -> AssignmentStatus {
    if self.returned {
      AssignmentStatus::Returned
    } else {
      AssignmentStatus::Graded
    }
  }
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// One per (student, course). Its existence is what "enrolled" means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
  pub progress_id:           Uuid,
  pub student_id:            Uuid,
  pub course_id:             Uuid,
  /// Percentage of topics whose video was watched. Derived, never
  /// authoritative.
  pub overall_progress:      u8,
  /// Score of the latest passing final exam.
  pub final_exam_score:      Option<u8>,
  /// Durable pass record; never reverts to `false`.
  pub final_exam_passed:     bool,
  /// Set on the first passing exam and never cleared or moved.
  pub certificate_issued_at: Option<DateTime<Utc>>,
  pub created_at:            DateTime<Utc>,
}

impl Progress {
  pub fn new(student_id: Uuid, course_id: Uuid) -> Self {
    Self {
      progress_id: Uuid::new_v4(),
      student_id,
      course_id,
      overall_progress: 0,
      final_exam_score: None,
      final_exam_passed: false,
      certificate_issued_at: None,
      created_at: Utc::now(),
    }
  }

  /// Fold a final-exam result into the durable record.
  ///
  /// Failing attempts leave the record untouched. Returns `true` when this
  /// call issued the certificate.
  pub fn apply_exam_result(
    &mut self,
    score: u8,
    passed: bool,
    at: DateTime<Utc>,
  ) -> bool {
    if !passed {
      return false;
    }
    self.final_exam_score = Some(score);
    self.final_exam_passed = true;
    if self.certificate_issued_at.is_none() {
      self.certificate_issued_at = Some(at);
      return true;
    }
    false
  }
}

// ─── TopicCompletion ─────────────────────────────────────────────────────────

/// One per (progress, topic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCompletion {
  pub completion_id:           Uuid,
  pub progress_id:             Uuid,
  pub topic_id:                Uuid,
  pub video_watched:           bool,
  pub video_watched_at:        Option<DateTime<Utc>>,
  pub mcq_passed:              bool,
  pub mcq_passed_at:           Option<DateTime<Utc>>,
  pub assignment_submitted:    bool,
  pub assignment_submitted_at: Option<DateTime<Utc>>,
  /// Always equal to the AND of the three sub-flags.
  pub completed:               bool,
  /// Set with the submission when it arrived after the due date.
  pub assignment_late:         bool,
  /// `None` until the assignment is submitted.
  pub assignment_status:       Option<AssignmentStatus>,
  pub assignment_score:        Option<f64>,
  pub assignment_feedback:     Option<String>,
}

impl TopicCompletion {
  pub fn new(progress_id: Uuid, topic_id: Uuid) -> Self {
    Self {
      completion_id: Uuid::new_v4(),
      progress_id,
      topic_id,
      video_watched: false,
      video_watched_at: None,
      mcq_passed: false,
      mcq_passed_at: None,
      assignment_submitted: false,
      assignment_submitted_at: None,
      completed: false,
      assignment_late: false,
      assignment_status: None,
      assignment_score: None,
      assignment_feedback: None,
    }
  }

  /// Whether the sub-flag for `kind` is set.
  pub fn has(&self, kind: EventKind) -> bool {
    match kind {
      EventKind::VideoWatched => self.video_watched,
      EventKind::McqPassed => self.mcq_passed,
      EventKind::AssignmentSubmitted => self.assignment_submitted,
    }
  }

  fn all_flags(&self) -> bool {
    self.video_watched && self.mcq_passed && self.assignment_submitted
  }

  /// Apply an event at `at` for a topic without a deadline.
  pub fn record(&mut self, kind: EventKind, at: DateTime<Utc>) -> Transition {
    self.apply(kind, at, None)
  }

  /// Apply an event at `at`. A set flag is left alone, timestamp included.
  ///
  /// An assignment submitted after `due` is marked late.
  pub fn apply(
    &mut self,
    kind: EventKind,
    at: DateTime<Utc>,
    due: Option<DateTime<Utc>>,
  ) -> Transition {
    if self.has(kind) {
      return Transition::Unchanged;
    }

    match kind {
      EventKind::VideoWatched => {
        self.video_watched = true;
        self.video_watched_at = Some(at);
      }
      EventKind::McqPassed => {
        self.mcq_passed = true;
        self.mcq_passed_at = Some(at);
      }
      EventKind::AssignmentSubmitted => {
        self.assignment_submitted = true;
        self.assignment_submitted_at = Some(at);
        self.assignment_late = due.is_some_and(|due| at > due);
        self.assignment_status = Some(AssignmentStatus::Submitted);
      }
    }

    let was_completed = self.completed;
    self.completed = self.all_flags();

    if self.completed && !was_completed {
      Transition::Completed
    } else {
      Transition::Marked
    }
  }
}

// ─── Final exam ──────────────────────────────────────────────────────────────

/// How one question of a submission was answered. `selected_option` is `0`
/// when the question was left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDetail {
  pub question_id:     Uuid,
  pub selected_option: u8,
  pub correct_option:  u8,
}

impl AnswerDetail {
  pub fn is_correct(&self) -> bool {
    self.selected_option != 0 && self.selected_option == self.correct_option
  }
}

/// An append-only record of one final-exam attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalExamSubmission {
  pub submission_id: Uuid,
  pub student_id:    Uuid,
  pub course_id:     Uuid,
  /// Percentage, 0–100.
  pub score:         u8,
  pub passed:        bool,
  pub submitted_at:  DateTime<Utc>,
  pub answers:       Vec<AnswerDetail>,
}

/// Result of [`crate::store::ProgressStore::record_final_exam`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRecord {
  pub submission:         FinalExamSubmission,
  /// The progress row after the attempt was folded in.
  pub progress:           Progress,
  /// `true` only for the attempt that first issued the certificate.
  pub certificate_issued: bool,
}
