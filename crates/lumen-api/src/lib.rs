//! JSON REST API for Lumen.
//!
//! Exposes an axum [`Router`] backed by a [`Portal`] over any
//! [`ProgressStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lumen_api::api_router(AppState::new(store, 70)))
//! ```

pub mod courses;
pub mod error;
pub mod exams;
pub mod students;
pub mod tracking;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use lumen_core::{Portal, store::ProgressStore};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub portal:            Portal<S>,
  /// Applied to new courses that do not name a pass mark.
  pub default_pass_mark: u8,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      portal:            self.portal.clone(),
      default_pass_mark: self.default_pass_mark,
    }
  }
}

impl<S: ProgressStore> AppState<S> {
  pub fn new(store: Arc<S>, default_pass_mark: u8) -> Self {
    Self { portal: Portal::new(store), default_pass_mark }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ProgressStore + 'static,
{
  Router::new()
    // Students
    .route("/students", post(students::create::<S>))
    .route("/students/{id}", get(students::get_one::<S>))
    .route("/students/{id}/payment", post(students::confirm_payment::<S>))
    .route("/students/{id}/dashboard", get(students::dashboard::<S>))
    .route("/students/{id}/performance", get(students::performance::<S>))
    .route("/sessions", post(students::sign_in::<S>))
    // Content
    .route("/courses", post(courses::create::<S>))
    .route("/courses/{id}", get(courses::get_one::<S>))
    .route("/courses/{id}/topics", post(courses::add_topic::<S>))
    .route("/questions", post(courses::add_question::<S>))
    // Enrollment and tracking
    .route(
      "/students/{id}/courses/{course_id}/enrollment",
      post(tracking::enroll::<S>),
    )
    .route(
      "/students/{id}/courses/{course_id}/outline",
      get(tracking::outline::<S>),
    )
    .route(
      "/students/{id}/courses/{course_id}/unlocked",
      get(tracking::unlocked::<S>),
    )
    .route(
      "/students/{id}/courses/{course_id}/progress",
      get(tracking::progress::<S>),
    )
    .route(
      "/students/{id}/courses/{course_id}/eligibility",
      get(tracking::eligibility::<S>),
    )
    .route(
      "/students/{id}/topics/{topic_id}/events",
      post(tracking::record_event::<S>),
    )
    .route(
      "/students/{id}/topics/{topic_id}/assignment-score",
      put(tracking::grade_assignment::<S>),
    )
    // Quizzes and exams
    .route("/topics/{id}/quiz", get(exams::quiz::<S>))
    .route("/topics/{id}/submissions", get(tracking::submissions::<S>))
    .route(
      "/students/{id}/topics/{topic_id}/quiz",
      post(exams::submit_quiz::<S>),
    )
    .route("/courses/{id}/exam", get(exams::exam::<S>))
    .route(
      "/students/{id}/courses/{course_id}/exam",
      get(exams::history::<S>).post(exams::submit_exam::<S>),
    )
    .with_state(state)
}
