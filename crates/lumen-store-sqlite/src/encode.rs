//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. Exam answers are stored as a compact JSON array.

use chrono::{DateTime, Utc};
use lumen_core::{
  catalog::{
    Assignment, ClassLevel, Course, Question, QuestionScope, Role, Student,
    Topic,
  },
  progress::{
    AnswerDetail, AssignmentStatus, FinalExamSubmission, Progress,
    TopicCompletion,
  },
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

fn decode_class_level(s: &str) -> Result<ClassLevel> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown class level: {s:?}")))
}

fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::Decode(format!("unknown role: {s:?}")))
}

fn decode_status(s: &str) -> Result<AssignmentStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown assignment status: {s:?}")))
}

// ─── QuestionScope ───────────────────────────────────────────────────────────

pub fn encode_scope(scope: QuestionScope) -> (&'static str, String) {
  match scope {
    QuestionScope::Topic(id) => ("topic", encode_uuid(id)),
    QuestionScope::FinalExam(id) => ("final_exam", encode_uuid(id)),
  }
}

pub fn decode_scope(kind: &str, id: &str) -> Result<QuestionScope> {
  let id = decode_uuid(id)?;
  match kind {
    "topic" => Ok(QuestionScope::Topic(id)),
    "final_exam" => Ok(QuestionScope::FinalExam(id)),
    other => Err(Error::Decode(format!("unknown question scope: {other:?}"))),
  }
}

// ─── Answers ─────────────────────────────────────────────────────────────────

pub fn encode_answers(answers: &[AnswerDetail]) -> Result<String> {
  Ok(serde_json::to_string(answers)?)
}

pub fn decode_answers(s: &str) -> Result<Vec<AnswerDetail>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `COLUMNS` constant lists the columns in the order `from_row` reads
// them.

pub struct RawStudent {
  pub student_id:     String,
  pub phone:          String,
  pub email:          String,
  pub name:           String,
  pub class_level:    String,
  pub role:           String,
  pub payment_status: bool,
  pub progress:       u8,
  pub created_at:     String,
}

impl RawStudent {
  pub const COLUMNS: &'static str = "student_id, phone, email, name, \
                                     class_level, role, payment_status, \
                                     progress, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:     row.get(0)?,
      phone:          row.get(1)?,
      email:          row.get(2)?,
      name:           row.get(3)?,
      class_level:    row.get(4)?,
      role:           row.get(5)?,
      payment_status: row.get(6)?,
      progress:       row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:     decode_uuid(&self.student_id)?,
      phone:          self.phone,
      email:          self.email,
      name:           self.name,
      class_level:    decode_class_level(&self.class_level)?,
      role:           decode_role(&self.role)?,
      payment_status: self.payment_status,
      progress:       self.progress,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCourse {
  pub course_id:   String,
  pub title:       String,
  pub description: String,
  pub class_level: String,
  pub pass_mark:   u8,
  pub created_at:  String,
}

impl RawCourse {
  pub const COLUMNS: &'static str =
    "course_id, title, description, class_level, pass_mark, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id:   row.get(0)?,
      title:       row.get(1)?,
      description: row.get(2)?,
      class_level: row.get(3)?,
      pass_mark:   row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:   decode_uuid(&self.course_id)?,
      title:       self.title,
      description: self.description,
      class_level: decode_class_level(&self.class_level)?,
      pass_mark:   self.pass_mark,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawTopic {
  pub topic_id:               String,
  pub course_id:              String,
  pub title:                  String,
  pub position:               u32,
  pub assignment_title:       Option<String>,
  pub assignment_description: Option<String>,
  pub assignment_due:         Option<String>,
  pub assignment_max_score:   Option<f64>,
}

impl RawTopic {
  pub const COLUMNS: &'static str = "topic_id, course_id, title, position, \
                                     assignment_title, \
                                     assignment_description, assignment_due, \
                                     assignment_max_score";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:               row.get(0)?,
      course_id:              row.get(1)?,
      title:                  row.get(2)?,
      position:               row.get(3)?,
      assignment_title:       row.get(4)?,
      assignment_description: row.get(5)?,
      assignment_due:         row.get(6)?,
      assignment_max_score:   row.get(7)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    let assignment = match self.assignment_title {
      Some(title) => Some(Assignment {
        title,
        description: self.assignment_description.unwrap_or_default(),
        due_date: decode_opt_dt(self.assignment_due.as_deref())?,
        max_score: self
          .assignment_max_score
          .unwrap_or(lumen_core::catalog::DEFAULT_MAX_SCORE),
      }),
      None => None,
    };

    Ok(Topic {
      topic_id: decode_uuid(&self.topic_id)?,
      course_id: decode_uuid(&self.course_id)?,
      title: self.title,
      order: self.position,
      assignment,
    })
  }
}

pub struct RawQuestion {
  pub question_id:    String,
  pub scope_kind:     String,
  pub scope_id:       String,
  pub text:           String,
  pub options:        [String; 4],
  pub correct_option: u8,
}

impl RawQuestion {
  pub const COLUMNS: &'static str = "question_id, scope_kind, scope_id, text, \
                                     option_1, option_2, option_3, option_4, \
                                     correct_option";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id:    row.get(0)?,
      scope_kind:     row.get(1)?,
      scope_id:       row.get(2)?,
      text:           row.get(3)?,
      options:        [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?],
      correct_option: row.get(8)?,
    })
  }

  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      question_id:    decode_uuid(&self.question_id)?,
      scope:          decode_scope(&self.scope_kind, &self.scope_id)?,
      text:           self.text,
      options:        self.options,
      correct_option: self.correct_option,
    })
  }
}

pub struct RawProgress {
  pub progress_id:           String,
  pub student_id:            String,
  pub course_id:             String,
  pub overall_progress:      u8,
  pub final_exam_score:      Option<u8>,
  pub final_exam_passed:     bool,
  pub certificate_issued_at: Option<String>,
  pub created_at:            String,
}

impl RawProgress {
  pub const COLUMNS: &'static str = "progress_id, student_id, course_id, \
                                     overall_progress, final_exam_score, \
                                     final_exam_passed, certificate_issued_at, \
                                     created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      progress_id:           row.get(0)?,
      student_id:            row.get(1)?,
      course_id:             row.get(2)?,
      overall_progress:      row.get(3)?,
      final_exam_score:      row.get(4)?,
      final_exam_passed:     row.get(5)?,
      certificate_issued_at: row.get(6)?,
      created_at:            row.get(7)?,
    })
  }

  pub fn into_progress(self) -> Result<Progress> {
    Ok(Progress {
      progress_id:           decode_uuid(&self.progress_id)?,
      student_id:            decode_uuid(&self.student_id)?,
      course_id:             decode_uuid(&self.course_id)?,
      overall_progress:      self.overall_progress,
      final_exam_score:      self.final_exam_score,
      final_exam_passed:     self.final_exam_passed,
      certificate_issued_at: decode_opt_dt(
        self.certificate_issued_at.as_deref(),
      )?,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCompletion {
  pub completion_id:           String,
  pub progress_id:             String,
  pub topic_id:                String,
  pub video_watched:           bool,
  pub video_watched_at:        Option<String>,
  pub mcq_passed:              bool,
  pub mcq_passed_at:           Option<String>,
  pub assignment_submitted:    bool,
  pub assignment_submitted_at: Option<String>,
  pub completed:               bool,
  pub assignment_late:         bool,
  pub assignment_status:       Option<String>,
  pub assignment_score:        Option<f64>,
  pub assignment_feedback:     Option<String>,
}

impl RawCompletion {
  pub const COLUMNS: &'static str = "completion_id, progress_id, topic_id, \
                                     video_watched, video_watched_at, \
                                     mcq_passed, mcq_passed_at, \
                                     assignment_submitted, \
                                     assignment_submitted_at, completed, \
                                     assignment_late, assignment_status, \
                                     assignment_score, assignment_feedback";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Self::from_row_at(row, 0)
  }

  /// Read the columns starting at index `at`, for queries that select
  /// something before them.
  pub fn from_row_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      completion_id:           row.get(at)?,
      progress_id:             row.get(at + 1)?,
      topic_id:                row.get(at + 2)?,
      video_watched:           row.get(at + 3)?,
      video_watched_at:        row.get(at + 4)?,
      mcq_passed:              row.get(at + 5)?,
      mcq_passed_at:           row.get(at + 6)?,
      assignment_submitted:    row.get(at + 7)?,
      assignment_submitted_at: row.get(at + 8)?,
      completed:               row.get(at + 9)?,
      assignment_late:         row.get(at + 10)?,
      assignment_status:       row.get(at + 11)?,
      assignment_score:        row.get(at + 12)?,
      assignment_feedback:     row.get(at + 13)?,
    })
  }

  pub fn into_completion(self) -> Result<TopicCompletion> {
    Ok(TopicCompletion {
      completion_id:           decode_uuid(&self.completion_id)?,
      progress_id:             decode_uuid(&self.progress_id)?,
      topic_id:                decode_uuid(&self.topic_id)?,
      video_watched:           self.video_watched,
      video_watched_at:        decode_opt_dt(self.video_watched_at.as_deref())?,
      mcq_passed:              self.mcq_passed,
      mcq_passed_at:           decode_opt_dt(self.mcq_passed_at.as_deref())?,
      assignment_submitted:    self.assignment_submitted,
      assignment_submitted_at: decode_opt_dt(
        self.assignment_submitted_at.as_deref(),
      )?,
      completed:               self.completed,
      assignment_late:         self.assignment_late,
      assignment_status:       self
        .assignment_status
        .as_deref()
        .map(decode_status)
        .transpose()?,
      assignment_score:        self.assignment_score,
      assignment_feedback:     self.assignment_feedback,
    })
  }
}

pub struct RawSubmission {
  pub submission_id: String,
  pub student_id:    String,
  pub course_id:     String,
  pub score:         u8,
  pub passed:        bool,
  pub submitted_at:  String,
  pub answers:       String,
}

impl RawSubmission {
  pub const COLUMNS: &'static str = "submission_id, student_id, course_id, \
                                     score, passed, submitted_at, answers";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(0)?,
      student_id:    row.get(1)?,
      course_id:     row.get(2)?,
      score:         row.get(3)?,
      passed:        row.get(4)?,
      submitted_at:  row.get(5)?,
      answers:       row.get(6)?,
    })
  }

  pub fn into_submission(self) -> Result<FinalExamSubmission> {
    Ok(FinalExamSubmission {
      submission_id: decode_uuid(&self.submission_id)?,
      student_id:    decode_uuid(&self.student_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      score:         self.score,
      passed:        self.passed,
      submitted_at:  decode_dt(&self.submitted_at)?,
      answers:       decode_answers(&self.answers)?,
    })
  }
}
