//! Catalogue types: students, courses, topics and questions.
//!
//! These are owned by the identity and content collaborators. The progress
//! rules only read them, with the single exception of
//! [`Student::progress`], which is written by the aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Students ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  Student,
  Mentor,
  Admin,
}

/// The school band a student or course belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
pub enum ClassLevel {
  #[serde(rename = "6-8")]
  #[strum(serialize = "6-8")]
  Middle,
  #[serde(rename = "9-12")]
  #[strum(serialize = "9-12")]
  Senior,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id:     Uuid,
  /// Sign-in identifier; unique across all users.
  pub phone:          String,
  pub email:          String,
  pub name:           String,
  pub class_level:    ClassLevel,
  pub role:           Role,
  /// Gate on sign-in. Flipped to `true` once a payment is confirmed.
  pub payment_status: bool,
  /// Cross-course progress percentage, maintained by the aggregator.
  pub progress:       u8,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ProgressStore::add_student`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
  pub phone:       String,
  pub email:       String,
  pub name:        String,
  pub class_level: ClassLevel,
  #[serde(default)]
  pub role:        Role,
}

// ─── Courses and topics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
  pub course_id:   Uuid,
  pub title:       String,
  pub description: String,
  pub class_level: ClassLevel,
  /// Minimum final-exam percentage that counts as a pass.
  pub pass_mark:   u8,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ProgressStore::add_course`].
#[derive(Debug, Clone)]
pub struct NewCourse {
  pub title:       String,
  pub description: String,
  pub class_level: ClassLevel,
  pub pass_mark:   u8,
}

impl NewCourse {
  pub fn validate(&self) -> Result<()> {
    if self.pass_mark > 100 {
      return Err(Error::InvalidPassMark(self.pass_mark));
    }
    Ok(())
  }
}

/// Score ceiling for assignments that do not name one, and for grading a
/// submission on a topic without an assignment.
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

fn default_max_score() -> f64 { DEFAULT_MAX_SCORE }

/// The assignment attached to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  /// Submissions after this instant are late. `None` means no deadline.
  #[serde(default)]
  pub due_date:    Option<DateTime<Utc>>,
  #[serde(default = "default_max_score")]
  pub max_score:   f64,
}

impl Assignment {
  pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
    self.due_date.is_some_and(|due| now > due)
  }

  pub fn validate(&self) -> Result<()> {
    if !self.max_score.is_finite() || self.max_score <= 0.0 {
      return Err(Error::InvalidMaxScore(self.max_score));
    }
    Ok(())
  }
}

/// The smallest unit of content in a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:   Uuid,
  pub course_id:  Uuid,
  pub title:      String,
  /// Position within the course. Strictly positive and unique per course.
  pub order:      u32,
  pub assignment: Option<Assignment>,
}

impl Topic {
  /// Highest score a submission on this topic can be graded with.
  pub fn max_score(&self) -> f64 {
    self
      .assignment
      .as_ref()
      .map_or(DEFAULT_MAX_SCORE, |a| a.max_score)
  }

  /// Deadline for submissions, if the assignment sets one.
  pub fn due_date(&self) -> Option<DateTime<Utc>> {
    self.assignment.as_ref().and_then(|a| a.due_date)
  }
}

/// Input to [`crate::store::ProgressStore::add_topic`].
#[derive(Debug, Clone)]
pub struct NewTopic {
  pub course_id:  Uuid,
  pub title:      String,
  pub order:      u32,
  pub assignment: Option<Assignment>,
}

impl NewTopic {
  pub fn validate(&self) -> Result<()> {
    if self.order == 0 {
      return Err(Error::InvalidTopicOrder);
    }
    if let Some(assignment) = &self.assignment {
      assignment.validate()?;
    }
    Ok(())
  }
}

// ─── Questions ───────────────────────────────────────────────────────────────

/// What a question belongs to: a topic quiz or a course's final exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum QuestionScope {
  Topic(Uuid),
  FinalExam(Uuid),
}

/// A four-option multiple-choice question. `correct_option` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
  pub question_id:    Uuid,
  pub scope:          QuestionScope,
  pub text:           String,
  pub options:        [String; 4],
  pub correct_option: u8,
}

/// A question as shown to the student, without its answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPrompt {
  pub question_id: Uuid,
  pub text:        String,
  pub options:     [String; 4],
}

impl From<&Question> for QuestionPrompt {
  fn from(q: &Question) -> Self {
    Self {
      question_id: q.question_id,
      text:        q.text.clone(),
      options:     q.options.clone(),
    }
  }
}

/// Input to [`crate::store::ProgressStore::add_question`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
  pub scope:          QuestionScope,
  pub text:           String,
  pub options:        [String; 4],
  pub correct_option: u8,
}

impl NewQuestion {
  /// `0` is reserved as the "no answer" sentinel, so it can never be correct.
  pub fn validate(&self) -> Result<()> {
    if !(1..=4).contains(&self.correct_option) {
      return Err(Error::InvalidCorrectOption(self.correct_option));
    }
    Ok(())
  }
}
