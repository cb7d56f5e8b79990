//! End-to-end flows through `Portal` on the SQLite backend.

use chrono::{Duration, Utc};
use lumen_core::{
  Error,
  progress::{AssignmentGrade, AssignmentStatus, EventKind},
};

use super::*;

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admit_requires_registration_and_payment() {
  let p = portal().await;

  let err = p.admit("0799999999").await.unwrap_err();
  assert!(matches!(err, Error::NotRegistered(_)));

  let student = p.add_student(new_student("0799999999")).await.unwrap();
  let err = p.admit(" 0799999999 ").await.unwrap_err();
  assert!(matches!(err, Error::PaymentPending(_)));

  p.confirm_payment(student.student_id).await.unwrap();
  let admitted = p.admit("0799999999").await.unwrap();
  assert_eq!(admitted.student_id, student.student_id);
}

#[tokio::test]
async fn registering_a_phone_twice_fails() {
  let p = portal().await;
  p.add_student(new_student("0799999999")).await.unwrap();

  let mut again = new_student("0799999999");
  again.email = "someone.else@example.com".to_owned();
  let err = p.add_student(again).await.unwrap_err();
  assert!(matches!(err, Error::AlreadyRegistered(_)));
}

#[tokio::test]
async fn only_students_can_enroll() {
  let p = portal().await;
  let mut mentor = new_student("0788888888");
  mentor.role = Role::Mentor;
  let mentor = p.add_student(mentor).await.unwrap();
  let course = p.add_course(new_course(70)).await.unwrap();

  let err = p
    .enroll(mentor.student_id, course.course_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotAStudent(_)));
}

#[tokio::test]
async fn enrolling_twice_returns_the_same_row() {
  let f = fixture(1, 70).await;
  let a = f
    .portal
    .enroll(f.student.student_id, f.course.course_id)
    .await
    .unwrap();
  let b = f
    .portal
    .enroll(f.student.student_id, f.course.course_id)
    .await
    .unwrap();
  assert_eq!(a.progress_id, b.progress_id);
}

// ─── Content ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_topic_order_is_reported() {
  let f = fixture(2, 70).await;
  let err = f
    .portal
    .add_topic(new_topic(f.course.course_id, 2))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateTopicOrder { order: 2, .. }));
}

#[tokio::test]
async fn question_for_unknown_topic_is_rejected() {
  let p = portal().await;
  let err = p
    .add_question(new_question(QuestionScope::Topic(Uuid::new_v4()), 1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TopicNotFound(_)));
}

// ─── Unlocking and progress ──────────────────────────────────────────────────

#[tokio::test]
async fn watching_the_first_video_opens_the_second_topic() {
  let f = fixture(3, 70).await;
  let sid = f.student.student_id;
  let cid = f.course.course_id;

  assert_eq!(
    f.portal.unlocked_topics(sid, cid).await.unwrap(),
    vec![f.topics[0].topic_id]
  );

  f.portal
    .record_topic_event(sid, f.topics[0].topic_id, EventKind::VideoWatched)
    .await
    .unwrap();

  assert_eq!(
    f.portal.unlocked_topics(sid, cid).await.unwrap(),
    vec![f.topics[0].topic_id, f.topics[1].topic_id]
  );
  assert_eq!(f.portal.course_progress(sid, cid).await.unwrap(), 33);

  let stored = f.portal.enroll(sid, cid).await.unwrap();
  assert_eq!(stored.overall_progress, 33);
  let student = f.portal.student(sid).await.unwrap();
  assert_eq!(student.progress, 33);
}

#[tokio::test]
async fn skipping_ahead_does_not_open_later_topics() {
  let f = fixture(3, 70).await;
  let sid = f.student.student_id;
  let cid = f.course.course_id;

  f.portal
    .record_topic_event(sid, f.topics[1].topic_id, EventKind::VideoWatched)
    .await
    .unwrap();

  let outline = f.portal.course_outline(sid, cid).await.unwrap();
  let open: Vec<bool> = outline.iter().map(|t| t.unlocked).collect();
  assert_eq!(open, vec![true, false, false]);
}

#[tokio::test]
async fn repeated_video_event_is_idempotent() {
  let f = fixture(2, 70).await;
  let sid = f.student.student_id;
  let tid = f.topics[0].topic_id;

  let first = f
    .portal
    .record_topic_event(sid, tid, EventKind::VideoWatched)
    .await
    .unwrap();
  let second = f
    .portal
    .record_topic_event(sid, tid, EventKind::VideoWatched)
    .await
    .unwrap();
  assert_eq!(first, second);
  assert_eq!(
    f.portal.course_progress(sid, f.course.course_id).await.unwrap(),
    50
  );
}

#[tokio::test]
async fn assignment_alone_does_not_complete_a_topic() {
  let f = fixture(1, 70).await;
  let c = f
    .portal
    .record_topic_event(
      f.student.student_id,
      f.topics[0].topic_id,
      EventKind::AssignmentSubmitted,
    )
    .await
    .unwrap();
  assert!(c.assignment_submitted);
  assert!(!c.completed);
}

#[tokio::test]
async fn events_require_enrollment() {
  let f = fixture(1, 70).await;
  let other = f.portal.add_student(new_student("0733333333")).await.unwrap();

  let err = f
    .portal
    .record_topic_event(
      other.student_id,
      f.topics[0].topic_id,
      EventKind::VideoWatched,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotEnrolled { .. }));
}

#[tokio::test]
async fn empty_course_reads_zero_and_keeps_the_exam_closed() {
  let f = fixture(0, 70).await;
  let sid = f.student.student_id;
  let cid = f.course.course_id;

  assert_eq!(f.portal.course_progress(sid, cid).await.unwrap(), 0);
  assert!(f.portal.unlocked_topics(sid, cid).await.unwrap().is_empty());
  assert!(!f.portal.final_exam_eligible(sid, cid).await.unwrap());
}

#[tokio::test]
async fn dashboard_averages_only_started_courses() {
  let f = fixture(2, 70).await;
  let sid = f.student.student_id;
  let idle = f.portal.add_course(new_course(70)).await.unwrap();
  f.portal.add_topic(new_topic(idle.course_id, 1)).await.unwrap();
  f.portal.enroll(sid, idle.course_id).await.unwrap();

  f.portal
    .record_topic_event(sid, f.topics[0].topic_id, EventKind::VideoWatched)
    .await
    .unwrap();

  let dashboard = f.portal.dashboard(sid).await.unwrap();
  assert_eq!(dashboard.courses.len(), 2);
  assert_eq!(dashboard.overall_progress, 50);
}

#[tokio::test]
async fn performance_report_counts_touched_and_completed_topics() {
  let f = fixture(3, 70).await;
  let sid = f.student.student_id;

  for kind in [
    EventKind::VideoWatched,
    EventKind::McqPassed,
    EventKind::AssignmentSubmitted,
  ] {
    f.portal
      .record_topic_event(sid, f.topics[0].topic_id, kind)
      .await
      .unwrap();
  }
  f.portal
    .record_topic_event(sid, f.topics[1].topic_id, EventKind::VideoWatched)
    .await
    .unwrap();

  let report = f.portal.performance_report(sid).await.unwrap();
  assert_eq!(report.touched_topics, 2);
  assert_eq!(report.completed_topics, 1);
  assert_eq!(report.completion_percentage, 50);
  assert_eq!(report.courses.len(), 1);
}

// ─── Quizzes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn seven_correct_answers_pass_the_quiz() {
  let f = fixture(1, 70).await;
  let tid = f.topics[0].topic_id;
  let questions =
    seed_questions(&f.portal, QuestionScope::Topic(tid), 10).await;

  let outcome = f
    .portal
    .submit_quiz(f.student.student_id, tid, &answers(&questions, 7))
    .await
    .unwrap();
  assert!(outcome.passed);

  let outline = f
    .portal
    .course_outline(f.student.student_id, f.course.course_id)
    .await
    .unwrap();
  assert!(outline[0].mcq_passed);
}

#[tokio::test]
async fn six_correct_answers_record_nothing() {
  let f = fixture(1, 70).await;
  let tid = f.topics[0].topic_id;
  let questions =
    seed_questions(&f.portal, QuestionScope::Topic(tid), 10).await;

  let outcome = f
    .portal
    .submit_quiz(f.student.student_id, tid, &answers(&questions, 6))
    .await
    .unwrap();
  assert!(!outcome.passed);

  let outline = f
    .portal
    .course_outline(f.student.student_id, f.course.course_id)
    .await
    .unwrap();
  assert!(!outline[0].mcq_passed);
}

#[tokio::test]
async fn quiz_serves_the_first_ten_questions_without_answers() {
  let f = fixture(1, 70).await;
  let tid = f.topics[0].topic_id;
  let questions =
    seed_questions(&f.portal, QuestionScope::Topic(tid), 12).await;

  let prompts = f.portal.quiz_prompts(tid).await.unwrap();
  assert_eq!(prompts.len(), 10);
  assert_eq!(prompts[0].question_id, questions[0].question_id);
  assert_eq!(prompts[9].question_id, questions[9].question_id);
}

// ─── Final exam and certificate ──────────────────────────────────────────────

async fn complete_every_topic(f: &Fixture) {
  for topic in &f.topics {
    for kind in [
      EventKind::VideoWatched,
      EventKind::McqPassed,
      EventKind::AssignmentSubmitted,
    ] {
      f.portal
        .record_topic_event(f.student.student_id, topic.topic_id, kind)
        .await
        .unwrap();
    }
  }
}

#[tokio::test]
async fn exam_is_locked_until_every_topic_is_complete() {
  let f = fixture(2, 70).await;
  let sid = f.student.student_id;
  let cid = f.course.course_id;
  let questions =
    seed_questions(&f.portal, QuestionScope::FinalExam(cid), 10).await;

  let err = f
    .portal
    .submit_final_exam(sid, cid, &answers(&questions, 10))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::FinalExamLocked { .. }));

  complete_every_topic(&f).await;
  assert!(f.portal.final_exam_eligible(sid, cid).await.unwrap());
}

#[tokio::test]
async fn passing_exam_issues_a_stable_certificate() {
  let f = fixture(2, 70).await;
  let sid = f.student.student_id;
  let cid = f.course.course_id;
  let questions =
    seed_questions(&f.portal, QuestionScope::FinalExam(cid), 10).await;
  complete_every_topic(&f).await;

  let pass = f
    .portal
    .submit_final_exam(sid, cid, &answers(&questions, 8))
    .await
    .unwrap();
  assert_eq!(pass.submission.score, 80);
  assert!(pass.submission.passed);
  assert!(pass.certificate_issued);
  let issued_at = pass.progress.certificate_issued_at;
  assert!(issued_at.is_some());

  let retake = f
    .portal
    .submit_final_exam(sid, cid, &answers(&questions, 2))
    .await
    .unwrap();
  assert!(!retake.submission.passed);
  assert!(!retake.certificate_issued);
  assert_eq!(retake.progress.certificate_issued_at, issued_at);
  assert_eq!(retake.progress.final_exam_score, Some(80));

  let eligibility = f.portal.eligibility(sid, cid).await.unwrap();
  assert!(eligibility.final_exam);
  assert!(eligibility.certificate);

  let history = f.portal.exam_history(sid, cid).await.unwrap();
  assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn exam_history_needs_a_known_student_and_course() {
  let f = fixture(1, 70).await;
  let (sid, cid) = (f.student.student_id, f.course.course_id);

  assert!(f.portal.exam_history(sid, cid).await.unwrap().is_empty());

  let err = f
    .portal
    .exam_history(Uuid::new_v4(), cid)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StudentNotFound(_)));

  let err = f
    .portal
    .exam_history(sid, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::CourseNotFound(_)));
}

#[tokio::test]
async fn exam_with_no_questions_never_passes() {
  let f = fixture(1, 0).await;
  complete_every_topic(&f).await;

  let record = f
    .portal
    .submit_final_exam(f.student.student_id, f.course.course_id, &[])
    .await
    .unwrap();
  assert_eq!(record.submission.score, 0);
  assert!(!record.submission.passed);
  assert!(
    !f.portal
      .certificate_eligible(f.student.student_id, f.course.course_id)
      .await
      .unwrap()
  );
}

// ─── Assignment grading ──────────────────────────────────────────────────────

fn grade(score: f64) -> AssignmentGrade {
  AssignmentGrade { score, feedback: String::new(), returned: false }
}

#[tokio::test]
async fn grading_requires_a_submission() {
  let f = fixture(1, 70).await;
  let sid = f.student.student_id;
  let tid = f.topics[0].topic_id;

  let err = f.portal.grade_assignment(sid, tid, grade(75.0)).await.unwrap_err();
  assert!(matches!(err, Error::AssignmentNotSubmitted(_)));

  f.portal
    .record_topic_event(sid, tid, EventKind::AssignmentSubmitted)
    .await
    .unwrap();
  let graded = f.portal.grade_assignment(sid, tid, grade(75.0)).await.unwrap();
  assert_eq!(graded.assignment_score, Some(75.0));
  assert_eq!(graded.assignment_status, Some(AssignmentStatus::Graded));

  let err = f
    .portal
    .grade_assignment(sid, tid, grade(101.0))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidAssignmentScore { .. }));
}

#[tokio::test]
async fn late_work_is_flagged_and_graded_against_its_max_score() {
  let p = portal().await;
  let student = p.add_student(new_student("0700000002")).await.unwrap();
  let course = p.add_course(new_course(70)).await.unwrap();
  let mut input = new_topic(course.course_id, 1);
  input.assignment = Some(Assignment {
    title:       "Essay".to_owned(),
    description: String::new(),
    due_date:    Some(Utc::now() - Duration::days(1)),
    max_score:   20.0,
  });
  let topic = p.add_topic(input).await.unwrap();
  let (sid, tid) = (student.student_id, topic.topic_id);
  p.enroll(sid, course.course_id).await.unwrap();

  let submitted = p
    .record_topic_event(sid, tid, EventKind::AssignmentSubmitted)
    .await
    .unwrap();
  assert!(submitted.assignment_late);
  assert_eq!(submitted.assignment_status, Some(AssignmentStatus::Submitted));

  let err = p.grade_assignment(sid, tid, grade(25.0)).await.unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidAssignmentScore { max_score, .. } if max_score == 20.0
  ));

  let returned = p
    .grade_assignment(
      sid,
      tid,
      AssignmentGrade {
        score:    12.0,
        feedback: "Cite your sources".to_owned(),
        returned: true,
      },
    )
    .await
    .unwrap();
  assert_eq!(returned.assignment_status, Some(AssignmentStatus::Returned));
  assert_eq!(
    returned.assignment_feedback.as_deref(),
    Some("Cite your sources")
  );
  assert!(returned.assignment_submitted);
  assert!(!returned.video_watched && !returned.mcq_passed);
  assert!(!returned.completed);

  let queue = p.assignment_submissions(tid).await.unwrap();
  assert_eq!(queue.len(), 1);
  assert_eq!(queue[0].student_id, sid);
  assert!(queue[0].late);
  assert_eq!(queue[0].status, AssignmentStatus::Returned);
  assert_eq!(queue[0].score, Some(12.0));
}

#[tokio::test]
async fn work_before_the_deadline_is_on_time() {
  let p = portal().await;
  let student = p.add_student(new_student("0700000003")).await.unwrap();
  let course = p.add_course(new_course(70)).await.unwrap();
  let mut input = new_topic(course.course_id, 1);
  if let Some(a) = input.assignment.as_mut() {
    a.due_date = Some(Utc::now() + Duration::days(7));
  }
  let topic = p.add_topic(input).await.unwrap();
  p.enroll(student.student_id, course.course_id).await.unwrap();

  let c = p
    .record_topic_event(
      student.student_id,
      topic.topic_id,
      EventKind::AssignmentSubmitted,
    )
    .await
    .unwrap();
  assert!(!c.assignment_late);

  let err = p.assignment_submissions(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::TopicNotFound(_)));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_enrollment_and_events_share_one_row() {
  for _ in 0..20 {
    let p = portal().await;
    let student = p.add_student(new_student("0700000004")).await.unwrap();
    let course = p.add_course(new_course(70)).await.unwrap();
    let mut topics = Vec::new();
    for order in 1..=3 {
      topics.push(
        p.add_topic(new_topic(course.course_id, order)).await.unwrap(),
      );
    }
    let (sid, cid, tid) =
      (student.student_id, course.course_id, topics[0].topic_id);

    let (a, b) = tokio::join!(p.enroll(sid, cid), p.enroll(sid, cid));
    assert_eq!(a.unwrap().progress_id, b.unwrap().progress_id);

    let (a, b) = tokio::join!(
      p.record_topic_event(sid, tid, EventKind::VideoWatched),
      p.record_topic_event(sid, tid, EventKind::VideoWatched),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.completion_id, b.completion_id);
    assert_eq!(a.video_watched_at, b.video_watched_at);

    assert_eq!(p.course_progress(sid, cid).await.unwrap(), 33);
    assert_eq!(
      p.unlocked_topics(sid, cid).await.unwrap(),
      vec![topics[0].topic_id, topics[1].topic_id]
    );
    assert_eq!(p.student(sid).await.unwrap().progress, 33);
    assert_eq!(p.dashboard(sid).await.unwrap().overall_progress, 33);
  }
}
