//! [`SqliteStore`]: the SQLite implementation of [`ProgressStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use lumen_core::{
  catalog::{
    Course, NewCourse, NewQuestion, NewStudent, NewTopic, Question,
    QuestionScope, Student, Topic,
  },
  progress::{
    AssignmentGrade, EventKind, ExamRecord, FinalExamSubmission, Progress,
    TopicCompletion, Transition,
  },
  store::{Insert, NewExamSubmission, ProgressStore},
};

use crate::{
  Error, Result,
  encode::{
    RawCompletion, RawCourse, RawProgress, RawQuestion, RawStudent,
    RawSubmission, RawTopic, decode_uuid, encode_answers, encode_dt,
    encode_scope, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Whether `e` is a UNIQUE or PRIMARY KEY violation.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// Map an insert result to `false` when the row lost a uniqueness race.
fn inserted(res: rusqlite::Result<usize>) -> rusqlite::Result<bool> {
  match res {
    Ok(_) => Ok(true),
    Err(e) if is_unique_violation(&e) => Ok(false),
    Err(e) => Err(e),
  }
}

/// Carry a decode failure out of a `Connection::call` closure.
fn call_error(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn select(columns: &str, table: &str, filter: &str) -> String {
  format!("SELECT {columns} FROM {table} WHERE {filter}")
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lumen progress store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub(crate) async fn progress_by_id(
    &self,
    progress_id: Uuid,
  ) -> Result<Option<Progress>> {
    let id_str = encode_uuid(progress_id);
    let sql = select(RawProgress::COLUMNS, "progress", "progress_id = ?1");

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawProgress::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProgress::into_progress).transpose()
  }

  async fn completion_by_id(
    &self,
    completion_id: Uuid,
  ) -> Result<Option<TopicCompletion>> {
    let id_str = encode_uuid(completion_id);
    let sql =
      select(RawCompletion::COLUMNS, "topic_completions", "completion_id = ?1");

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawCompletion::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCompletion::into_completion).transpose()
  }
}

impl ProgressStore for SqliteStore {
  type Error = Error;

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Insert<Student>> {
    let student = Student {
      student_id:     Uuid::new_v4(),
      phone:          input.phone,
      email:          input.email,
      name:           input.name,
      class_level:    input.class_level,
      role:           input.role,
      payment_status: false,
      progress:       0,
      created_at:     Utc::now(),
    };

    let id_str    = encode_uuid(student.student_id);
    let phone     = student.phone.clone();
    let email     = student.email.clone();
    let name      = student.name.clone();
    let level_str = student.class_level.to_string();
    let role_str  = student.role.to_string();
    let at_str    = encode_dt(student.created_at);

    let created = self
      .conn
      .call(move |conn| {
        Ok(inserted(conn.execute(
          "INSERT INTO students
             (student_id, phone, email, name, class_level, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, phone, email, name, level_str, role_str, at_str
          ],
        ))?)
      })
      .await?;

    Ok(if created { Insert::Created(student) } else { Insert::Conflict })
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);
    let sql = select(RawStudent::COLUMNS, "students", "student_id = ?1");

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawStudent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn find_student_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> Result<Option<Student>> {
    let phone = phone.to_owned();
    let sql = select(RawStudent::COLUMNS, "students", "phone = ?1");

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![phone], RawStudent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn confirm_payment(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE students SET payment_status = 1 WHERE student_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_student(id).await
  }

  async fn set_student_progress(&self, id: Uuid, progress: u8) -> Result<()> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE students SET progress = ?2 WHERE student_id = ?1",
          rusqlite::params![id_str, progress],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::RowNotFound("student", id));
    }
    Ok(())
  }

  // ── Content ───────────────────────────────────────────────────────────────

  async fn add_course(&self, input: NewCourse) -> Result<Course> {
    let course = Course {
      course_id:   Uuid::new_v4(),
      title:       input.title,
      description: input.description,
      class_level: input.class_level,
      pass_mark:   input.pass_mark,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(course.course_id);
    let title       = course.title.clone();
    let description = course.description.clone();
    let level_str   = course.class_level.to_string();
    let pass_mark   = course.pass_mark;
    let at_str      = encode_dt(course.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses
             (course_id, title, description, class_level, pass_mark, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str, title, description, level_str, pass_mark, at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(course)
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    let id_str = encode_uuid(id);
    let sql = select(RawCourse::COLUMNS, "courses", "course_id = ?1");

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawCourse::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn add_topic(&self, input: NewTopic) -> Result<Insert<Topic>> {
    let topic = Topic {
      topic_id:   Uuid::new_v4(),
      course_id:  input.course_id,
      title:      input.title,
      order:      input.order,
      assignment: input.assignment,
    };

    let id_str     = encode_uuid(topic.topic_id);
    let course_str = encode_uuid(topic.course_id);
    let title      = topic.title.clone();
    let position   = topic.order;
    let assignment = topic.assignment.as_ref();
    let a_title    = assignment.map(|a| a.title.clone());
    let a_desc     = assignment.map(|a| a.description.clone());
    let a_due      = assignment.and_then(|a| a.due_date).map(encode_dt);
    let a_max      = assignment.map(|a| a.max_score);

    let created = self
      .conn
      .call(move |conn| {
        Ok(inserted(conn.execute(
          "INSERT INTO topics
             (topic_id, course_id, title, position, assignment_title,
              assignment_description, assignment_due, assignment_max_score)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, course_str, title, position, a_title, a_desc, a_due, a_max
          ],
        ))?)
      })
      .await?;

    Ok(if created { Insert::Created(topic) } else { Insert::Conflict })
  }

  async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>> {
    let id_str = encode_uuid(id);
    let sql = select(RawTopic::COLUMNS, "topics", "topic_id = ?1");

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawTopic::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTopic::into_topic).transpose()
  }

  async fn list_topics(&self, course_id: Uuid) -> Result<Vec<Topic>> {
    let id_str = encode_uuid(course_id);
    let sql = select(
      RawTopic::COLUMNS,
      "topics",
      "course_id = ?1 ORDER BY position ASC",
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawTopic::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTopic::into_topic).collect()
  }

  async fn add_question(&self, input: NewQuestion) -> Result<Question> {
    let question = Question {
      question_id:    Uuid::new_v4(),
      scope:          input.scope,
      text:           input.text,
      options:        input.options,
      correct_option: input.correct_option,
    };

    let id_str                 = encode_uuid(question.question_id);
    let (scope_kind, scope_id) = encode_scope(question.scope);
    let text                   = question.text.clone();
    let [o1, o2, o3, o4]       = question.options.clone();
    let correct                = question.correct_option;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions
             (question_id, scope_kind, scope_id, text,
              option_1, option_2, option_3, option_4, correct_option)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, scope_kind, scope_id, text, o1, o2, o3, o4, correct
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(question)
  }

  async fn list_questions(&self, scope: QuestionScope) -> Result<Vec<Question>> {
    let (kind, id_str) = encode_scope(scope);
    let sql = select(
      RawQuestion::COLUMNS,
      "questions",
      "scope_kind = ?1 AND scope_id = ?2 ORDER BY rowid ASC",
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind, id_str], RawQuestion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  // ── Progress ──────────────────────────────────────────────────────────────

  async fn get_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Option<Progress>> {
    let student_str = encode_uuid(student_id);
    let course_str = encode_uuid(course_id);
    let sql = select(
      RawProgress::COLUMNS,
      "progress",
      "student_id = ?1 AND course_id = ?2",
    );

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![student_str, course_str],
              RawProgress::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProgress::into_progress).transpose()
  }

  async fn create_progress(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Insert<Progress>> {
    let progress = Progress::new(student_id, course_id);

    let id_str      = encode_uuid(progress.progress_id);
    let student_str = encode_uuid(student_id);
    let course_str  = encode_uuid(course_id);
    let at_str      = encode_dt(progress.created_at);

    let created = self
      .conn
      .call(move |conn| {
        Ok(inserted(conn.execute(
          "INSERT INTO progress (progress_id, student_id, course_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, student_str, course_str, at_str],
        ))?)
      })
      .await?;

    Ok(if created { Insert::Created(progress) } else { Insert::Conflict })
  }

  async fn list_progress(&self, student_id: Uuid) -> Result<Vec<Progress>> {
    let id_str = encode_uuid(student_id);
    let sql = select(
      RawProgress::COLUMNS,
      "progress",
      "student_id = ?1 ORDER BY rowid ASC",
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawProgress::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProgress::into_progress).collect()
  }

  async fn set_course_progress(
    &self,
    progress_id: Uuid,
    overall_progress: u8,
  ) -> Result<Progress> {
    let id_str = encode_uuid(progress_id);

    self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE progress SET overall_progress = ?2 WHERE progress_id = ?1",
          rusqlite::params![id_str, overall_progress],
        )?)
      })
      .await?;

    self
      .progress_by_id(progress_id)
      .await?
      .ok_or(Error::RowNotFound("progress", progress_id))
  }

  // ── Topic completions ─────────────────────────────────────────────────────

  async fn get_completion(
    &self,
    progress_id: Uuid,
    topic_id: Uuid,
  ) -> Result<Option<TopicCompletion>> {
    let progress_str = encode_uuid(progress_id);
    let topic_str = encode_uuid(topic_id);
    let sql = select(
      RawCompletion::COLUMNS,
      "topic_completions",
      "progress_id = ?1 AND topic_id = ?2",
    );

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![progress_str, topic_str],
              RawCompletion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCompletion::into_completion).transpose()
  }

  async fn create_completion(
    &self,
    progress_id: Uuid,
    topic_id: Uuid,
  ) -> Result<Insert<TopicCompletion>> {
    let completion = TopicCompletion::new(progress_id, topic_id);

    let id_str       = encode_uuid(completion.completion_id);
    let progress_str = encode_uuid(progress_id);
    let topic_str    = encode_uuid(topic_id);

    let created = self
      .conn
      .call(move |conn| {
        Ok(inserted(conn.execute(
          "INSERT INTO topic_completions (completion_id, progress_id, topic_id)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, progress_str, topic_str],
        ))?)
      })
      .await?;

    Ok(if created { Insert::Created(completion) } else { Insert::Conflict })
  }

  async fn list_completions(
    &self,
    progress_id: Uuid,
  ) -> Result<Vec<TopicCompletion>> {
    let id_str = encode_uuid(progress_id);
    let sql = select(
      RawCompletion::COLUMNS,
      "topic_completions",
      "progress_id = ?1 ORDER BY rowid ASC",
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawCompletion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompletion::into_completion).collect()
  }

  async fn mark_completion(
    &self,
    completion_id: Uuid,
    kind: EventKind,
    at: DateTime<Utc>,
    due: Option<DateTime<Utc>>,
  ) -> Result<(TopicCompletion, Transition)> {
    let id_str = encode_uuid(completion_id);
    let sql =
      select(RawCompletion::COLUMNS, "topic_completions", "completion_id = ?1");

    // Read, apply and write under one write lock.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(raw) = tx
          .query_row(&sql, rusqlite::params![id_str], RawCompletion::from_row)
          .optional()?
        else {
          return Ok(None);
        };
        let mut completion = raw.into_completion().map_err(call_error)?;

        let transition = completion.apply(kind, at, due);
        if transition.is_change() {
          tx.execute(
            "UPDATE topic_completions SET
               video_watched           = ?2,
               video_watched_at        = ?3,
               mcq_passed              = ?4,
               mcq_passed_at           = ?5,
               assignment_submitted    = ?6,
               assignment_submitted_at = ?7,
               completed               = ?8,
               assignment_late         = ?9,
               assignment_status       = ?10
             WHERE completion_id = ?1",
            rusqlite::params![
              id_str,
              completion.video_watched,
              completion.video_watched_at.map(encode_dt),
              completion.mcq_passed,
              completion.mcq_passed_at.map(encode_dt),
              completion.assignment_submitted,
              completion.assignment_submitted_at.map(encode_dt),
              completion.completed,
              completion.assignment_late,
              completion.assignment_status.map(|s| s.to_string()),
            ],
          )?;
        }
        tx.commit()?;

        Ok(Some((completion, transition)))
      })
      .await?;

    outcome.ok_or(Error::RowNotFound("topic completion", completion_id))
  }

  async fn record_grade(
    &self,
    completion_id: Uuid,
    grade: AssignmentGrade,
  ) -> Result<TopicCompletion> {
    let id_str     = encode_uuid(completion_id);
    let status_str = grade.status().to_string();

    self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE topic_completions SET
             assignment_score    = ?2,
             assignment_feedback = ?3,
             assignment_status   = ?4
           WHERE completion_id = ?1",
          rusqlite::params![id_str, grade.score, grade.feedback, status_str],
        )?)
      })
      .await?;

    self
      .completion_by_id(completion_id)
      .await?
      .ok_or(Error::RowNotFound("topic completion", completion_id))
  }

  async fn list_submissions(
    &self,
    topic_id: Uuid,
  ) -> Result<Vec<(Uuid, TopicCompletion)>> {
    let id_str = encode_uuid(topic_id);
    let sql = format!(
      "SELECT (SELECT student_id FROM progress p
               WHERE p.progress_id = c.progress_id),
              {}
       FROM topic_completions c
       WHERE topic_id = ?1 AND assignment_submitted = 1
       ORDER BY assignment_submitted_at ASC, rowid ASC",
      RawCompletion::COLUMNS
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            let student: String = row.get(0)?;
            Ok((student, RawCompletion::from_row_at(row, 1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(student, raw)| -> Result<(Uuid, TopicCompletion)> {
        Ok((decode_uuid(&student)?, raw.into_completion()?))
      })
      .collect()
  }

  // ── Final exams ───────────────────────────────────────────────────────────

  async fn record_final_exam(
    &self,
    input: NewExamSubmission,
  ) -> Result<ExamRecord> {
    let submission_id = Uuid::new_v4();
    let NewExamSubmission { progress_id, score, passed, submitted_at, answers } =
      input;

    let submission_str = encode_uuid(submission_id);
    let progress_str   = encode_uuid(progress_id);
    let at_str         = encode_dt(submitted_at);
    let answers_json   = encode_answers(&answers)?;
    let sql = select(RawProgress::COLUMNS, "progress", "progress_id = ?1");

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(raw) = tx
          .query_row(&sql, rusqlite::params![progress_str], RawProgress::from_row)
          .optional()?
        else {
          return Ok(None);
        };
        let mut progress = raw.into_progress().map_err(call_error)?;

        tx.execute(
          "INSERT INTO final_exam_submissions
             (submission_id, student_id, course_id, score, passed,
              submitted_at, answers)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            submission_str,
            encode_uuid(progress.student_id),
            encode_uuid(progress.course_id),
            score,
            passed,
            at_str,
            answers_json,
          ],
        )?;

        let issued = progress.apply_exam_result(score, passed, submitted_at);
        if passed {
          tx.execute(
            "UPDATE progress SET
               final_exam_score      = ?2,
               final_exam_passed     = ?3,
               certificate_issued_at = ?4
             WHERE progress_id = ?1",
            rusqlite::params![
              progress_str,
              progress.final_exam_score,
              progress.final_exam_passed,
              progress.certificate_issued_at.map(encode_dt),
            ],
          )?;
        }
        tx.commit()?;

        Ok(Some((progress, issued)))
      })
      .await?;

    let (progress, certificate_issued) =
      outcome.ok_or(Error::RowNotFound("progress", progress_id))?;

    Ok(ExamRecord {
      submission: FinalExamSubmission {
        submission_id,
        student_id: progress.student_id,
        course_id: progress.course_id,
        score,
        passed,
        submitted_at,
        answers,
      },
      progress,
      certificate_issued,
    })
  }

  async fn list_exam_submissions(
    &self,
    student_id: Uuid,
    course_id: Uuid,
  ) -> Result<Vec<FinalExamSubmission>> {
    let student_str = encode_uuid(student_id);
    let course_str = encode_uuid(course_id);
    let sql = select(
      RawSubmission::COLUMNS,
      "final_exam_submissions",
      "student_id = ?1 AND course_id = ?2
       ORDER BY submitted_at DESC, rowid DESC",
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![student_str, course_str],
            RawSubmission::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }
}
