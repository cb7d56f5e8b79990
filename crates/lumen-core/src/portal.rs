//! [`Portal`], the entry point the web layer talks to.
//!
//! Bundles the tracker, unlock engine, aggregator, scorer and certification
//! gate over one shared store, and adds the thin identity and content
//! operations they rely on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{Aggregator, PerformanceReport},
  catalog::{
    Course, NewCourse, NewQuestion, NewStudent, NewTopic, Question,
    QuestionPrompt, QuestionScope, Role, Student, Topic,
  },
  enrollment,
  gate::{CertificationGate, Eligibility},
  progress::{
    AssignmentGrade, AssignmentStatus, EventKind, ExamRecord,
    FinalExamSubmission, Progress, TopicCompletion,
  },
  scoring::{QuizOutcome, Scorer},
  store::{Insert, ProgressStore},
  tracker::Tracker,
  unlock::{TopicAccess, UnlockEngine},
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// One enrolled course on a student's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
  pub course_id:             Uuid,
  pub title:                 String,
  pub overall_progress:      u8,
  pub final_exam_passed:     bool,
  pub certificate_issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
  pub student:          Student,
  pub courses:          Vec<CourseSummary>,
  /// Mean over courses with non-zero progress.
  pub overall_progress: u8,
}

/// One entry in a topic's grading queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSubmission {
  pub student_id:    Uuid,
  pub completion_id: Uuid,
  pub submitted_at:  DateTime<Utc>,
  pub late:          bool,
  pub status:        AssignmentStatus,
  pub score:         Option<f64>,
  pub feedback:      Option<String>,
}

impl AssignmentSubmission {
  /// `None` when the completion has no submitted assignment.
  fn from_completion(student_id: Uuid, c: TopicCompletion) -> Option<Self> {
    Some(Self {
      student_id,
      completion_id: c.completion_id,
      submitted_at: c.assignment_submitted_at?,
      late: c.assignment_late,
      status: c.assignment_status.unwrap_or(AssignmentStatus::Submitted),
      score: c.assignment_score,
      feedback: c.assignment_feedback,
    })
  }
}

// ─── Portal ──────────────────────────────────────────────────────────────────

pub struct Portal<S> {
  store:      Arc<S>,
  tracker:    Tracker<S>,
  unlock:     UnlockEngine<S>,
  aggregator: Aggregator<S>,
  scorer:     Scorer<S>,
  gate:       CertificationGate<S>,
}

impl<S> Clone for Portal<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      tracker:    self.tracker.clone(),
      unlock:     self.unlock.clone(),
      aggregator: self.aggregator.clone(),
      scorer:     self.scorer.clone(),
      gate:       self.gate.clone(),
    }
  }
}

impl<S: ProgressStore> Portal<S> {
  pub fn new(store: Arc<S>) -> Self {
    let aggregator = Aggregator::new(Arc::clone(&store));
    let tracker = Tracker::new(Arc::clone(&store), aggregator.clone());
    let gate = CertificationGate::new(Arc::clone(&store));
    let scorer = Scorer::new(Arc::clone(&store), tracker.clone(), gate.clone());
    Self {
      unlock: UnlockEngine::new(Arc::clone(&store)),
      store,
      tracker,
      aggregator,
      scorer,
      gate,
    }
  }

  // ── Identity ──────────────────────────────────────────────────────────

  pub async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let phone = input.phone.trim().to_owned();
    let input = NewStudent { phone: phone.clone(), ..input };
    match self.store.add_student(input).await.map_err(Error::store)? {
      Insert::Created(student) => Ok(student),
      Insert::Conflict => Err(Error::AlreadyRegistered(phone)),
    }
  }

  pub async fn student(&self, student_id: Uuid) -> Result<Student> {
    enrollment::require_student(&*self.store, student_id).await
  }

  /// Mark the student as paid. The payment record itself lives elsewhere.
  pub async fn confirm_payment(&self, student_id: Uuid) -> Result<Student> {
    let student = self
      .store
      .confirm_payment(student_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::StudentNotFound(student_id))?;
    tracing::info!(%student_id, "payment confirmed");
    Ok(student)
  }

  /// The sign-in gate: a registered phone number on a paid account.
  pub async fn admit(&self, phone: &str) -> Result<Student> {
    let phone = phone.trim();
    let Some(student) = self
      .store
      .find_student_by_phone(phone)
      .await
      .map_err(Error::store)?
    else {
      tracing::warn!(phone, "sign-in refused: unknown phone");
      return Err(Error::NotRegistered(phone.to_owned()));
    };

    if !student.payment_status {
      tracing::warn!(phone, "sign-in refused: payment pending");
      return Err(Error::PaymentPending(phone.to_owned()));
    }
    Ok(student)
  }

  // ── Content ───────────────────────────────────────────────────────────

  pub async fn add_course(&self, input: NewCourse) -> Result<Course> {
    input.validate()?;
    self.store.add_course(input).await.map_err(Error::store)
  }

  pub async fn course(&self, course_id: Uuid) -> Result<Course> {
    self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseNotFound(course_id))
  }

  pub async fn add_topic(&self, input: NewTopic) -> Result<Topic> {
    input.validate()?;
    let (course_id, order) = (input.course_id, input.order);
    self.course(course_id).await?;
    match self.store.add_topic(input).await.map_err(Error::store)? {
      Insert::Created(topic) => Ok(topic),
      Insert::Conflict => Err(Error::DuplicateTopicOrder { course_id, order }),
    }
  }

  pub async fn add_question(&self, input: NewQuestion) -> Result<Question> {
    input.validate()?;
    match input.scope {
      QuestionScope::Topic(id) => {
        self
          .store
          .get_topic(id)
          .await
          .map_err(Error::store)?
          .ok_or(Error::TopicNotFound(id))?;
      }
      QuestionScope::FinalExam(id) => {
        self.course(id).await?;
      }
    }
    self.store.add_question(input).await.map_err(Error::store)
  }

  // ── Enrollment and tracking ───────────────────────────────────────────

  /// Get or create the student's progress row for a course.
  pub async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> Result<Progress> {
    let student = self.student(student_id).await?;
    if student.role != Role::Student {
      return Err(Error::NotAStudent(student_id));
    }
    self.course(course_id).await?;
    enrollment::ensure_progress(&*self.store, student_id, course_id).await
  }

  pub async fn record_topic_event(
    &self,
    student_id: Uuid,
    topic_id: Uuid,
    kind: EventKind,
  ) -> Result<TopicCompletion> {
    self.tracker.record_event(student_id, topic_id, kind).await
  }

  pub async fn grade_assignment(
    &self,
    student_id: Uuid,
    topic_id: Uuid,
    grade: AssignmentGrade,
  ) -> Result<TopicCompletion> {
    self.tracker.grade_assignment(student_id, topic_id, grade).await
  }

  /// Submitted assignments for a topic, oldest first, for grading.
  pub async fn assignment_submissions(
    &self,
    topic_id: Uuid,
  ) -> Result<Vec<AssignmentSubmission>> {
    self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))?;

    let rows = self
      .store
      .list_submissions(topic_id)
      .await
      .map_err(Error::store)?;
    Ok(
      rows
        .into_iter()
        .filter_map(|(student_id, c)| {
          AssignmentSubmission::from_completion(student_id, c)
        })
        .collect(),
    )
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn unlocked_topics(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Vec<Uuid>> {
    self.unlock.unlocked_topics(student_id, course_id).await
  }

  pub async fn course_outline(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Vec<TopicAccess>> {
    self.unlock.course_outline(student_id, course_id).await
  }

  pub async fn course_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<u8> {
    self.aggregator.course_progress(student_id, course_id).await
  }

  pub async fn overall_progress(&self, student_id: Uuid) -> Result<u8> {
    self.aggregator.overall_progress(student_id).await
  }

  pub async fn performance_report(
    &self,
    student_id: Uuid,
  ) -> Result<PerformanceReport> {
    self.aggregator.performance_report(student_id).await
  }

  pub async fn dashboard(&self, student_id: Uuid) -> Result<Dashboard> {
    let student = self.student(student_id).await?;
    let rows = self
      .store
      .list_progress(student_id)
      .await
      .map_err(Error::store)?;

    let mut courses = Vec::with_capacity(rows.len());
    for p in &rows {
      let course = self.course(p.course_id).await?;
      courses.push(CourseSummary {
        course_id:             p.course_id,
        title:                 course.title,
        overall_progress:      p.overall_progress,
        final_exam_passed:     p.final_exam_passed,
        certificate_issued_at: p.certificate_issued_at,
      });
    }

    let overall_progress = self.aggregator.overall_progress(student_id).await?;
    Ok(Dashboard { student, courses, overall_progress })
  }

  pub async fn final_exam_eligible(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<bool> {
    self.gate.final_exam_eligible(student_id, course_id).await
  }

  pub async fn certificate_eligible(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<bool> {
    self.gate.certificate_eligible(student_id, course_id).await
  }

  pub async fn eligibility(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Eligibility> {
    self.gate.eligibility(student_id, course_id).await
  }

  // ── Quizzes and exams ─────────────────────────────────────────────────

  pub async fn quiz_prompts(&self, topic_id: Uuid) -> Result<Vec<QuestionPrompt>> {
    self.scorer.quiz_prompts(topic_id).await
  }

  pub async fn exam_prompts(&self, course_id: Uuid) -> Result<Vec<QuestionPrompt>> {
    self.scorer.exam_prompts(course_id).await
  }

  pub async fn submit_quiz(
    &self,
    student_id: Uuid,
    topic_id: Uuid,
    answers: &[u8],
  ) -> Result<QuizOutcome> {
    self.scorer.submit_quiz(student_id, topic_id, answers).await
  }

  pub async fn submit_final_exam(
    &self,
    student_id: Uuid,
    course_id: Uuid,
    answers: &[u8],
  ) -> Result<ExamRecord> {
    self.scorer.submit_final_exam(student_id, course_id, answers).await
  }

  /// Every exam attempt for the pair, newest first. The first entry is the
  /// one shown to the student.
  pub async fn exam_history(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Vec<FinalExamSubmission>> {
    self.student(student_id).await?;
    self.course(course_id).await?;
    self
      .store
      .list_exam_submissions(student_id, course_id)
      .await
      .map_err(Error::store)
  }
}
