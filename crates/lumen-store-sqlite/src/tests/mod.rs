//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use lumen_core::{
  Portal,
  catalog::{
    Assignment, ClassLevel, Course, DEFAULT_MAX_SCORE, NewCourse,
    NewQuestion, NewStudent, NewTopic, Question, QuestionScope, Role, Student,
    Topic,
  },
};
use uuid::Uuid;

use crate::SqliteStore;

mod portal;
mod store;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn portal() -> Portal<SqliteStore> { Portal::new(Arc::new(store().await)) }

fn new_student(phone: &str) -> NewStudent {
  NewStudent {
    phone:       phone.to_owned(),
    email:       format!("{phone}@example.com"),
    name:        "Ada".to_owned(),
    class_level: ClassLevel::Senior,
    role:        Role::Student,
  }
}

fn new_course(pass_mark: u8) -> NewCourse {
  NewCourse {
    title: "Algebra".to_owned(),
    description: "Linear equations".to_owned(),
    class_level: ClassLevel::Senior,
    pass_mark,
  }
}

fn new_topic(course_id: Uuid, order: u32) -> NewTopic {
  NewTopic {
    course_id,
    title: format!("Topic {order}"),
    order,
    assignment: Some(Assignment {
      title:       "Worksheet".to_owned(),
      description: "Show your working".to_owned(),
      due_date:    None,
      max_score:   DEFAULT_MAX_SCORE,
    }),
  }
}

fn new_question(scope: QuestionScope, correct_option: u8) -> NewQuestion {
  NewQuestion {
    scope,
    text: "Which one?".to_owned(),
    options: ["a".into(), "b".into(), "c".into(), "d".into()],
    correct_option,
  }
}

/// A student enrolled in a course with `topics` topics.
struct Fixture {
  portal:  Portal<SqliteStore>,
  student: Student,
  course:  Course,
  topics:  Vec<Topic>,
}

async fn fixture(topics: u32, pass_mark: u8) -> Fixture {
  let portal = portal().await;
  let student = portal.add_student(new_student("0700000001")).await.unwrap();
  let course = portal.add_course(new_course(pass_mark)).await.unwrap();

  let mut added = Vec::new();
  for order in 1..=topics {
    added.push(
      portal
        .add_topic(new_topic(course.course_id, order))
        .await
        .unwrap(),
    );
  }
  portal
    .enroll(student.student_id, course.course_id)
    .await
    .unwrap();

  Fixture { portal, student, course, topics: added }
}

/// Add `n` questions to `scope`, cycling the correct option through 1–4.
async fn seed_questions(
  portal: &Portal<SqliteStore>,
  scope: QuestionScope,
  n: usize,
) -> Vec<Question> {
  let mut out = Vec::with_capacity(n);
  for i in 0..n {
    out.push(
      portal
        .add_question(new_question(scope, (i % 4) as u8 + 1))
        .await
        .unwrap(),
    );
  }
  out
}

/// Answers with the first `right` correct and the rest wrong.
fn answers(questions: &[Question], right: usize) -> Vec<u8> {
  questions
    .iter()
    .enumerate()
    .map(|(i, q)| {
      if i < right { q.correct_option } else { q.correct_option % 4 + 1 }
    })
    .collect()
}
