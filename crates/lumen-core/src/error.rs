//! Error types for `lumen-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("course not found: {0}")]
  CourseNotFound(Uuid),

  #[error("topic not found: {0}")]
  TopicNotFound(Uuid),

  /// No progress row exists for the pair; the student must enroll first.
  #[error("student {student_id} is not enrolled in course {course_id}")]
  NotEnrolled { student_id: Uuid, course_id: Uuid },

  /// A get-or-create lost its insert race and the re-fetch found nothing.
  #[error("conflicting concurrent create for {0}")]
  ConcurrentCreateConflict(&'static str),

  #[error("final exam for course {course_id} is locked until every topic is completed")]
  FinalExamLocked { course_id: Uuid },

  #[error("no assignment submitted for topic {0}")]
  AssignmentNotSubmitted(Uuid),

  #[error("assignment score must be between 0 and {max_score}, got {score}")]
  InvalidAssignmentScore { score: f64, max_score: f64 },

  #[error("assignment max score must be positive, got {0}")]
  InvalidMaxScore(f64),

  #[error("topic order must be strictly positive")]
  InvalidTopicOrder,

  #[error("course {course_id} already has a topic at order {order}")]
  DuplicateTopicOrder { course_id: Uuid, order: u32 },

  #[error("correct option must be between 1 and 4, got {0}")]
  InvalidCorrectOption(u8),

  #[error("pass mark must be at most 100, got {0}")]
  InvalidPassMark(u8),

  #[error("phone or email already registered: {0}")]
  AlreadyRegistered(String),

  #[error("user {0} is not a student")]
  NotAStudent(Uuid),

  #[error("phone number {0} is not registered")]
  NotRegistered(String),

  #[error("account {0} has not completed payment")]
  PaymentPending(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend failure.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
