//! Quiz and final-exam scoring.
//!
//! Answers are compared positionally with the questions they were served
//! with. `0` is the "no answer" sentinel: correct options are always 1–4, so
//! a blank can never score.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::{Question, QuestionPrompt, QuestionScope},
  enrollment,
  gate::CertificationGate,
  progress::{AnswerDetail, EventKind, ExamRecord},
  store::{NewExamSubmission, ProgressStore},
  tracker::Tracker,
};

/// Number of questions served in a topic quiz when the pool is large enough.
pub const QUIZ_LENGTH: usize = 10;

/// Correct answers needed to pass a topic quiz.
///
/// This is a raw count, not a share of [`QUIZ_LENGTH`]: a quiz drawn from a
/// pool of fewer than seven questions cannot be passed.
pub const QUIZ_PASS_COUNT: usize = 7;

pub const NO_ANSWER: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOutcome {
  pub correct: usize,
  pub total:   usize,
  pub passed:  bool,
  pub answers: Vec<AnswerDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamOutcome {
  /// Percentage of correct answers, truncated.
  pub score:   u8,
  pub correct: usize,
  pub total:   usize,
  pub passed:  bool,
  pub answers: Vec<AnswerDetail>,
}

/// Pick the questions served for a topic quiz: the first [`QUIZ_LENGTH`] of
/// the pool, in pool order.
pub fn select_quiz(mut pool: Vec<Question>) -> Vec<Question> {
  pool.truncate(QUIZ_LENGTH);
  pool
}

/// `part / whole` as a truncated integer percentage; `0` when `whole == 0`.
pub fn percent(part: usize, whole: usize) -> u8 {
  if whole == 0 {
    return 0;
  }
  (part.min(whole) * 100 / whole) as u8
}

fn mark(questions: &[Question], submitted: &[u8]) -> Vec<AnswerDetail> {
  questions
    .iter()
    .enumerate()
    .map(|(i, q)| AnswerDetail {
      question_id:     q.question_id,
      selected_option: submitted.get(i).copied().unwrap_or(NO_ANSWER),
      correct_option:  q.correct_option,
    })
    .collect()
}

pub fn score_quiz(questions: &[Question], submitted: &[u8]) -> QuizOutcome {
  let answers = mark(questions, submitted);
  let correct = answers.iter().filter(|a| a.is_correct()).count();
  QuizOutcome {
    correct,
    total: questions.len(),
    passed: correct >= QUIZ_PASS_COUNT,
    answers,
  }
}

pub fn score_final_exam(
  questions: &[Question],
  submitted: &[u8],
  pass_mark: u8,
) -> ExamOutcome {
  let answers = mark(questions, submitted);
  let correct = answers.iter().filter(|a| a.is_correct()).count();
  let score = percent(correct, questions.len());
  ExamOutcome {
    score,
    correct,
    total: questions.len(),
    // An empty pool never passes, even with a pass mark of zero.
    passed: !questions.is_empty() && score >= pass_mark,
    answers,
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Serves question sets and turns submissions into completion events and
/// exam records.
pub struct Scorer<S> {
  store:   Arc<S>,
  tracker: Tracker<S>,
  gate:    CertificationGate<S>,
}

impl<S> Clone for Scorer<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      tracker: self.tracker.clone(),
      gate:    self.gate.clone(),
    }
  }
}

impl<S: ProgressStore> Scorer<S> {
  pub fn new(
    store: Arc<S>,
    tracker: Tracker<S>,
    gate: CertificationGate<S>,
  ) -> Self {
    Self { store, tracker, gate }
  }

  async fn pool(&self, scope: QuestionScope) -> Result<Vec<Question>> {
    let pool = self.store.list_questions(scope).await.map_err(Error::store)?;
    if pool.is_empty() {
      tracing::warn!(?scope, "empty question pool; scoring as zero");
    }
    Ok(pool)
  }

  async fn quiz_questions(&self, topic_id: Uuid) -> Result<Vec<Question>> {
    Ok(select_quiz(self.pool(QuestionScope::Topic(topic_id)).await?))
  }

  /// The quiz for a topic, in the order answers are expected.
  pub async fn quiz_prompts(&self, topic_id: Uuid) -> Result<Vec<QuestionPrompt>> {
    self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))?;
    let questions = self.quiz_questions(topic_id).await?;
    Ok(questions.iter().map(QuestionPrompt::from).collect())
  }

  /// The final exam for a course, in the order answers are expected.
  pub async fn exam_prompts(&self, course_id: Uuid) -> Result<Vec<QuestionPrompt>> {
    self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseNotFound(course_id))?;
    let questions = self.pool(QuestionScope::FinalExam(course_id)).await?;
    Ok(questions.iter().map(QuestionPrompt::from).collect())
  }

  /// Score a topic quiz. A pass records `McqPassed` for the topic.
  pub async fn submit_quiz(
    &self,
    student_id: Uuid,
    topic_id: Uuid,
    answers: &[u8],
  ) -> Result<QuizOutcome> {
    let topic = self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))?;
    enrollment::require_progress(&*self.store, student_id, topic.course_id)
      .await?;

    let questions = self.quiz_questions(topic_id).await?;
    let outcome = score_quiz(&questions, answers);
    tracing::info!(
      %student_id,
      %topic_id,
      correct = outcome.correct,
      total = outcome.total,
      passed = outcome.passed,
      "quiz scored"
    );

    if outcome.passed {
      self
        .tracker
        .record_event(student_id, topic_id, EventKind::McqPassed)
        .await?;
    }
    Ok(outcome)
  }

  /// Score and record a final-exam attempt.
  ///
  /// Every attempt is appended. Only passing attempts touch the progress
  /// row, and only the first pass issues the certificate.
  pub async fn submit_final_exam(
    &self,
    student_id: Uuid,
    course_id: Uuid,
    answers: &[u8],
  ) -> Result<ExamRecord> {
    let course = self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseNotFound(course_id))?;
    let progress =
      enrollment::require_progress(&*self.store, student_id, course_id).await?;

    if !self.gate.final_exam_eligible(student_id, course_id).await? {
      return Err(Error::FinalExamLocked { course_id });
    }

    let questions = self.pool(QuestionScope::FinalExam(course_id)).await?;
    let outcome = score_final_exam(&questions, answers, course.pass_mark);

    let record = self
      .store
      .record_final_exam(NewExamSubmission {
        progress_id:  progress.progress_id,
        score:        outcome.score,
        passed:       outcome.passed,
        submitted_at: Utc::now(),
        answers:      outcome.answers,
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(
      %student_id,
      %course_id,
      score = record.submission.score,
      passed = record.submission.passed,
      "final exam recorded"
    );
    if record.certificate_issued {
      tracing::info!(%student_id, %course_id, "certificate issued");
    }
    Ok(record)
  }
}
