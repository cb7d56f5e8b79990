//! Backend behaviour of the `ProgressStore` methods.

use chrono::{TimeZone as _, Utc};
use lumen_core::{
  progress::{
    AnswerDetail, AssignmentGrade, AssignmentStatus, EventKind, Transition,
  },
  store::{Insert, NewExamSubmission, ProgressStore},
};

use super::*;

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_student() {
  let s = store().await;

  let Insert::Created(student) =
    s.add_student(new_student("0711111111")).await.unwrap()
  else {
    panic!("expected a new student");
  };
  assert!(!student.payment_status);
  assert_eq!(student.progress, 0);

  let fetched = s.get_student(student.student_id).await.unwrap().unwrap();
  assert_eq!(fetched.phone, "0711111111");
  assert_eq!(fetched.class_level, ClassLevel::Senior);
  assert_eq!(fetched.role, Role::Student);
}

#[tokio::test]
async fn duplicate_phone_is_a_conflict() {
  let s = store().await;
  s.add_student(new_student("0711111111")).await.unwrap();

  let mut again = new_student("0711111111");
  again.email = "other@example.com".to_owned();
  assert!(matches!(
    s.add_student(again).await.unwrap(),
    Insert::Conflict
  ));
}

#[tokio::test]
async fn confirm_payment_flips_the_flag() {
  let s = store().await;
  let Insert::Created(student) =
    s.add_student(new_student("0711111111")).await.unwrap()
  else {
    panic!("expected a new student");
  };

  let paid = s.confirm_payment(student.student_id).await.unwrap().unwrap();
  assert!(paid.payment_status);

  let by_phone = s.find_student_by_phone("0711111111").await.unwrap().unwrap();
  assert!(by_phone.payment_status);
}

#[tokio::test]
async fn confirm_payment_for_missing_student_is_none() {
  let s = store().await;
  assert!(s.confirm_payment(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Content ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn topics_list_in_order_regardless_of_insertion() {
  let s = store().await;
  let course = s.add_course(new_course(70)).await.unwrap();

  for order in [3, 1, 2] {
    s.add_topic(new_topic(course.course_id, order)).await.unwrap();
  }

  let orders: Vec<u32> = s
    .list_topics(course.course_id)
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.order)
    .collect();
  assert_eq!(orders, vec![1, 2, 3]);
}

#[tokio::test]
async fn topic_assignment_round_trips() {
  let s = store().await;
  let course = s.add_course(new_course(70)).await.unwrap();

  let due = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
  let mut input = new_topic(course.course_id, 1);
  input.assignment = Some(Assignment {
    title:       "Lab report".to_owned(),
    description: "Two pages".to_owned(),
    due_date:    Some(due),
    max_score:   20.0,
  });
  let Insert::Created(topic) = s.add_topic(input).await.unwrap() else {
    panic!("expected a new topic");
  };
  let plain = NewTopic { assignment: None, ..new_topic(course.course_id, 2) };
  let Insert::Created(bare) = s.add_topic(plain).await.unwrap() else {
    panic!("expected a new topic");
  };

  let fetched = s.get_topic(topic.topic_id).await.unwrap().unwrap();
  assert_eq!(fetched, topic);
  assert_eq!(fetched.due_date(), Some(due));
  assert_eq!(fetched.max_score(), 20.0);

  let fetched = s.get_topic(bare.topic_id).await.unwrap().unwrap();
  assert_eq!(fetched.assignment, None);
  assert_eq!(fetched.max_score(), DEFAULT_MAX_SCORE);
}

#[tokio::test]
async fn duplicate_topic_order_is_a_conflict() {
  let s = store().await;
  let course = s.add_course(new_course(70)).await.unwrap();

  s.add_topic(new_topic(course.course_id, 1)).await.unwrap();
  let again = s.add_topic(new_topic(course.course_id, 1)).await.unwrap();
  assert_eq!(again, Insert::Conflict);
}

#[tokio::test]
async fn questions_keep_insertion_order_per_scope() {
  let s = store().await;
  let course = s.add_course(new_course(70)).await.unwrap();
  let scope = QuestionScope::FinalExam(course.course_id);

  let first = s.add_question(new_question(scope, 2)).await.unwrap();
  let second = s.add_question(new_question(scope, 4)).await.unwrap();
  s.add_question(new_question(QuestionScope::Topic(Uuid::new_v4()), 1))
    .await
    .unwrap();

  let pool = s.list_questions(scope).await.unwrap();
  let ids: Vec<Uuid> = pool.iter().map(|q| q.question_id).collect();
  assert_eq!(ids, vec![first.question_id, second.question_id]);
  assert_eq!(pool[1].correct_option, 4);
  assert_eq!(pool[0].scope, scope);
}

// ─── Progress and completions ────────────────────────────────────────────────

async fn enrolled(s: &SqliteStore) -> (Uuid, Topic) {
  let Insert::Created(student) =
    s.add_student(new_student("0722222222")).await.unwrap()
  else {
    panic!("expected a new student");
  };
  let course = s.add_course(new_course(70)).await.unwrap();
  let Insert::Created(topic) =
    s.add_topic(new_topic(course.course_id, 1)).await.unwrap()
  else {
    panic!("expected a new topic");
  };
  let Insert::Created(progress) = s
    .create_progress(student.student_id, course.course_id)
    .await
    .unwrap()
  else {
    panic!("expected a new progress row");
  };
  (progress.progress_id, topic)
}

#[tokio::test]
async fn second_progress_row_for_a_pair_is_a_conflict() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;
  let progress = s.progress_by_id(progress_id).await.unwrap().unwrap();

  let again = s
    .create_progress(progress.student_id, topic.course_id)
    .await
    .unwrap();
  assert_eq!(again, Insert::Conflict);
}

#[tokio::test]
async fn second_completion_row_for_a_pair_is_a_conflict() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;

  s.create_completion(progress_id, topic.topic_id).await.unwrap();
  let again = s
    .create_completion(progress_id, topic.topic_id)
    .await
    .unwrap();
  assert_eq!(again, Insert::Conflict);
}

#[tokio::test]
async fn mark_completion_sets_flag_once() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;
  let Insert::Created(c) = s
    .create_completion(progress_id, topic.topic_id)
    .await
    .unwrap()
  else {
    panic!("expected a new completion");
  };

  let first = Utc.timestamp_opt(1_000, 0).unwrap();
  let later = Utc.timestamp_opt(2_000, 0).unwrap();

  let (c1, t1) = s
    .mark_completion(c.completion_id, EventKind::VideoWatched, first, None)
    .await
    .unwrap();
  assert_eq!(t1, Transition::Marked);
  assert_eq!(c1.video_watched_at, Some(first));

  let (c2, t2) = s
    .mark_completion(c.completion_id, EventKind::VideoWatched, later, None)
    .await
    .unwrap();
  assert_eq!(t2, Transition::Unchanged);
  assert_eq!(c2.video_watched_at, Some(first));

  let stored = s
    .get_completion(progress_id, topic.topic_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored, c2);
}

#[tokio::test]
async fn completed_is_persisted_with_the_last_flag() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;
  let Insert::Created(c) = s
    .create_completion(progress_id, topic.topic_id)
    .await
    .unwrap()
  else {
    panic!("expected a new completion");
  };

  for kind in [EventKind::McqPassed, EventKind::AssignmentSubmitted] {
    let (after, t) = s
      .mark_completion(c.completion_id, kind, Utc::now(), None)
      .await
      .unwrap();
    assert_eq!(t, Transition::Marked);
    assert!(!after.completed);
  }

  let (after, t) = s
    .mark_completion(
      c.completion_id,
      EventKind::VideoWatched,
      Utc::now(),
      None,
    )
    .await
    .unwrap();
  assert_eq!(t, Transition::Completed);
  assert!(after.completed);

  let listed = s.list_completions(progress_id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert!(listed[0].completed);
}

#[tokio::test]
async fn mark_missing_completion_is_an_error() {
  let s = store().await;
  let err = s
    .mark_completion(Uuid::new_v4(), EventKind::McqPassed, Utc::now(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::RowNotFound(..)));
}

#[tokio::test]
async fn late_submission_is_persisted() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;
  let Insert::Created(c) = s
    .create_completion(progress_id, topic.topic_id)
    .await
    .unwrap()
  else {
    panic!("expected a new completion");
  };

  let due = Utc.timestamp_opt(1_000, 0).unwrap();
  let at = Utc.timestamp_opt(1_500, 0).unwrap();
  s.mark_completion(
    c.completion_id,
    EventKind::AssignmentSubmitted,
    at,
    Some(due),
  )
  .await
  .unwrap();

  let stored = s
    .get_completion(progress_id, topic.topic_id)
    .await
    .unwrap()
    .unwrap();
  assert!(stored.assignment_late);
  assert_eq!(stored.assignment_status, Some(AssignmentStatus::Submitted));
  assert_eq!(stored.assignment_submitted_at, Some(at));
}

#[tokio::test]
async fn grade_is_stored_without_touching_flags() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;
  let Insert::Created(c) = s
    .create_completion(progress_id, topic.topic_id)
    .await
    .unwrap()
  else {
    panic!("expected a new completion");
  };

  let graded = s
    .record_grade(
      c.completion_id,
      AssignmentGrade {
        score:    87.5,
        feedback: "Neat".to_owned(),
        returned: false,
      },
    )
    .await
    .unwrap();
  assert_eq!(graded.assignment_score, Some(87.5));
  assert_eq!(graded.assignment_feedback.as_deref(), Some("Neat"));
  assert_eq!(graded.assignment_status, Some(AssignmentStatus::Graded));
  assert!(!graded.assignment_submitted);
  assert!(!graded.completed);
}

#[tokio::test]
async fn submissions_are_listed_per_topic_oldest_first() {
  let s = store().await;
  let (progress_id, topic) = enrolled(&s).await;

  let Insert::Created(other) =
    s.add_student(new_student("0733333333")).await.unwrap()
  else {
    panic!("expected a new student");
  };
  let Insert::Created(other_progress) = s
    .create_progress(other.student_id, topic.course_id)
    .await
    .unwrap()
  else {
    panic!("expected a new progress row");
  };

  let mut expected = Vec::new();
  for (secs, pid) in [(2_000, other_progress.progress_id), (1_000, progress_id)] {
    let Insert::Created(c) =
      s.create_completion(pid, topic.topic_id).await.unwrap()
    else {
      panic!("expected a new completion");
    };
    let at = Utc.timestamp_opt(secs, 0).unwrap();
    s.mark_completion(c.completion_id, EventKind::AssignmentSubmitted, at, None)
    .await
    .unwrap();
    expected.push(c.completion_id);
  }
  expected.reverse();

  let listed = s.list_submissions(topic.topic_id).await.unwrap();
  let ids: Vec<_> = listed.iter().map(|(_, c)| c.completion_id).collect();
  assert_eq!(ids, expected);
  assert_eq!(listed[1].0, other.student_id);
  assert!(s.list_submissions(Uuid::new_v4()).await.unwrap().is_empty());
}

// ─── Final exams ─────────────────────────────────────────────────────────────

fn attempt(
  progress_id: Uuid,
  score: u8,
  passed: bool,
  secs: i64,
) -> NewExamSubmission {
  NewExamSubmission {
    progress_id,
    score,
    passed,
    submitted_at: Utc.timestamp_opt(secs, 0).unwrap(),
    answers: vec![AnswerDetail {
      question_id:     Uuid::new_v4(),
      selected_option: 2,
      correct_option:  2,
    }],
  }
}

#[tokio::test]
async fn failing_attempt_is_kept_but_changes_nothing() {
  let s = store().await;
  let (progress_id, _) = enrolled(&s).await;

  let record = s
    .record_final_exam(attempt(progress_id, 40, false, 100))
    .await
    .unwrap();
  assert!(!record.certificate_issued);
  assert!(!record.progress.final_exam_passed);
  assert_eq!(record.progress.final_exam_score, None);

  let stored = s.progress_by_id(progress_id).await.unwrap().unwrap();
  assert_eq!(stored, record.progress);
}

#[tokio::test]
async fn first_pass_issues_the_certificate_once() {
  let s = store().await;
  let (progress_id, _) = enrolled(&s).await;

  let first = s
    .record_final_exam(attempt(progress_id, 80, true, 100))
    .await
    .unwrap();
  assert!(first.certificate_issued);
  let issued_at = first.progress.certificate_issued_at;
  assert_eq!(issued_at, Some(Utc.timestamp_opt(100, 0).unwrap()));

  let second = s
    .record_final_exam(attempt(progress_id, 95, true, 200))
    .await
    .unwrap();
  assert!(!second.certificate_issued);
  assert_eq!(second.progress.final_exam_score, Some(95));
  assert_eq!(second.progress.certificate_issued_at, issued_at);

  let third = s
    .record_final_exam(attempt(progress_id, 10, false, 300))
    .await
    .unwrap();
  assert!(third.progress.final_exam_passed);
  assert_eq!(third.progress.final_exam_score, Some(95));
  assert_eq!(third.progress.certificate_issued_at, issued_at);
}

#[tokio::test]
async fn submissions_list_newest_first_with_answers() {
  let s = store().await;
  let (progress_id, _) = enrolled(&s).await;
  let progress = s.progress_by_id(progress_id).await.unwrap().unwrap();

  s.record_final_exam(attempt(progress_id, 30, false, 100))
    .await
    .unwrap();
  s.record_final_exam(attempt(progress_id, 90, true, 200))
    .await
    .unwrap();

  let history = s
    .list_exam_submissions(progress.student_id, progress.course_id)
    .await
    .unwrap();
  let scores: Vec<u8> = history.iter().map(|h| h.score).collect();
  assert_eq!(scores, vec![90, 30]);
  assert_eq!(history[0].answers.len(), 1);
  assert!(history[0].answers[0].is_correct());
}
