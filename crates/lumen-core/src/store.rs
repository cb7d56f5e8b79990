//! The `ProgressStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `lumen-store-sqlite`).
//! The services in this crate and the HTTP layer depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  catalog::{
    Course, NewCourse, NewQuestion, NewStudent, NewTopic, Question,
    QuestionScope, Student, Topic,
  },
  progress::{
    AnswerDetail, AssignmentGrade, EventKind, ExamRecord, FinalExamSubmission,
    Progress, TopicCompletion, Transition,
  },
};

// ─── Supporting types ────────────────────────────────────────────────────────

/// Outcome of an insert guarded by a unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum Insert<T> {
  Created(T),
  /// Another writer already holds the key. Callers re-fetch the winner.
  Conflict,
}

/// Input to [`ProgressStore::record_final_exam`].
#[derive(Debug, Clone)]
pub struct NewExamSubmission {
  pub progress_id:  Uuid,
  pub score:        u8,
  pub passed:       bool,
  pub submitted_at: DateTime<Utc>,
  pub answers:      Vec<AnswerDetail>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Lumen storage backend.
///
/// Backends must enforce uniqueness of `(student, course)` progress rows,
/// `(progress, topic)` completion rows and `(course, order)` topics. Flag
/// marking and exam recording must each be atomic.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ProgressStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Students ──────────────────────────────────────────────────────────

  /// Reports [`Insert::Conflict`] if the phone or email is already taken.
  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Insert<Student>, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn find_student_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + 'a;

  /// Set `payment_status` to `true`. Returns `None` if the student does not
  /// exist.
  fn confirm_payment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Persist the cross-course progress percentage on the student.
  fn set_student_progress(
    &self,
    id: Uuid,
    progress: u8,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Content ───────────────────────────────────────────────────────────

  fn add_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Reports [`Insert::Conflict`] if the course already has a topic at
  /// `input.order`.
  fn add_topic(
    &self,
    input: NewTopic,
  ) -> impl Future<Output = Result<Insert<Topic>, Self::Error>> + Send + '_;

  fn get_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  /// All topics of a course, ascending by `order`.
  fn list_topics(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  fn add_question(
    &self,
    input: NewQuestion,
  ) -> impl Future<Output = Result<Question, Self::Error>> + Send + '_;

  /// The question pool for a scope, in insertion order.
  fn list_questions(
    &self,
    scope: QuestionScope,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  // ── Progress ──────────────────────────────────────────────────────────

  fn get_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Option<Progress>, Self::Error>> + Send + '_;

  /// Insert a fresh progress row, or report [`Insert::Conflict`] if one
  /// already exists for the pair.
  fn create_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Insert<Progress>, Self::Error>> + Send + '_;

  /// Every progress row of a student.
  fn list_progress(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Progress>, Self::Error>> + Send + '_;

  fn set_course_progress(
    &self,
    progress_id: Uuid,
    overall_progress: u8,
  ) -> impl Future<Output = Result<Progress, Self::Error>> + Send + '_;

  // ── Topic completions ─────────────────────────────────────────────────

  fn get_completion(
    &self,
    progress_id: Uuid,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<Option<TopicCompletion>, Self::Error>>
  + Send
  + '_;

  /// Insert a blank completion row, or report [`Insert::Conflict`] if one
  /// already exists for the pair.
  fn create_completion(
    &self,
    progress_id: Uuid,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<Insert<TopicCompletion>, Self::Error>>
  + Send
  + '_;

  fn list_completions(
    &self,
    progress_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TopicCompletion>, Self::Error>>
  + Send
  + '_;

  /// Atomically apply `kind` to a completion via
  /// [`TopicCompletion::apply`], persisting the sub-flag, its timestamp,
  /// the assignment state and the recomputed `completed` flag in one write.
  fn mark_completion(
    &self,
    completion_id: Uuid,
    kind: EventKind,
    at: DateTime<Utc>,
    due: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(TopicCompletion, Transition), Self::Error>>
  + Send
  + '_;

  /// Store a grade's score, feedback and status. Sub-flags are untouched.
  fn record_grade(
    &self,
    completion_id: Uuid,
    grade: AssignmentGrade,
  ) -> impl Future<Output = Result<TopicCompletion, Self::Error>> + Send + '_;

  /// Completions of a topic with a submitted assignment, paired with the
  /// submitting student, oldest submission first.
  fn list_submissions(
    &self,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<Vec<(Uuid, TopicCompletion)>, Self::Error>>
  + Send
  + '_;

  // ── Final exams ───────────────────────────────────────────────────────

  /// Atomically append a submission and fold it into the progress row via
  /// [`Progress::apply_exam_result`].
  fn record_final_exam(
    &self,
    input: NewExamSubmission,
  ) -> impl Future<Output = Result<ExamRecord, Self::Error>> + Send + '_;

  /// Every attempt for the pair, newest first.
  fn list_exam_submissions(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FinalExamSubmission>, Self::Error>>
  + Send
  + '_;
}
