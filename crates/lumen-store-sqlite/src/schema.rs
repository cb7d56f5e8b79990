//! SQL schema for the Lumen SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    student_id     TEXT PRIMARY KEY,
    phone          TEXT NOT NULL UNIQUE,
    email          TEXT NOT NULL UNIQUE,
    name           TEXT NOT NULL,
    class_level    TEXT NOT NULL,                -- '6-8' | '9-12'
    role           TEXT NOT NULL DEFAULT 'student',
    payment_status INTEGER NOT NULL DEFAULT 0,
    progress       INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    course_id   TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    class_level TEXT NOT NULL,
    pass_mark   INTEGER NOT NULL CHECK (pass_mark BETWEEN 0 AND 100),
    created_at  TEXT NOT NULL
);

-- `position` is the topic's order within its course. The assignment columns
-- are all NULL for a topic without one.
CREATE TABLE IF NOT EXISTS topics (
    topic_id               TEXT PRIMARY KEY,
    course_id              TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    title                  TEXT NOT NULL,
    position               INTEGER NOT NULL CHECK (position > 0),
    assignment_title       TEXT,
    assignment_description TEXT,
    assignment_due         TEXT,
    assignment_max_score   REAL CHECK (assignment_max_score > 0),
    UNIQUE (course_id, position)
);

CREATE TABLE IF NOT EXISTS questions (
    question_id    TEXT PRIMARY KEY,
    scope_kind     TEXT NOT NULL,               -- 'topic' | 'final_exam'
    scope_id       TEXT NOT NULL,
    text           TEXT NOT NULL,
    option_1       TEXT NOT NULL,
    option_2       TEXT NOT NULL,
    option_3       TEXT NOT NULL,
    option_4       TEXT NOT NULL,
    correct_option INTEGER NOT NULL CHECK (correct_option BETWEEN 1 AND 4)
);

CREATE TABLE IF NOT EXISTS progress (
    progress_id           TEXT PRIMARY KEY,
    student_id            TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    course_id             TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    overall_progress      INTEGER NOT NULL DEFAULT 0,
    final_exam_score      INTEGER,
    final_exam_passed     INTEGER NOT NULL DEFAULT 0,
    certificate_issued_at TEXT,
    created_at            TEXT NOT NULL,
    UNIQUE (student_id, course_id)
);

CREATE TABLE IF NOT EXISTS topic_completions (
    completion_id           TEXT PRIMARY KEY,
    progress_id             TEXT NOT NULL REFERENCES progress(progress_id) ON DELETE CASCADE,
    topic_id                TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    video_watched           INTEGER NOT NULL DEFAULT 0,
    video_watched_at        TEXT,
    mcq_passed              INTEGER NOT NULL DEFAULT 0,
    mcq_passed_at           TEXT,
    assignment_submitted    INTEGER NOT NULL DEFAULT 0,
    assignment_submitted_at TEXT,
    completed               INTEGER NOT NULL DEFAULT 0,
    assignment_late         INTEGER NOT NULL DEFAULT 0,
    assignment_status       TEXT,                -- 'submitted' | 'graded' | 'returned'
    assignment_score        REAL,
    assignment_feedback     TEXT,
    UNIQUE (progress_id, topic_id),
    CHECK  (completed = (video_watched AND mcq_passed AND assignment_submitted))
);

-- Exam attempts are strictly append-only.
CREATE TABLE IF NOT EXISTS final_exam_submissions (
    submission_id TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    course_id     TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    score         INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
    passed        INTEGER NOT NULL,
    submitted_at  TEXT NOT NULL,
    answers       TEXT NOT NULL DEFAULT '[]'   -- JSON array of AnswerDetail
);

CREATE INDEX IF NOT EXISTS questions_scope_idx   ON questions(scope_kind, scope_id);
CREATE INDEX IF NOT EXISTS progress_student_idx  ON progress(student_id);
CREATE INDEX IF NOT EXISTS completions_topic_idx ON topic_completions(topic_id);
CREATE INDEX IF NOT EXISTS submissions_pair_idx  ON final_exam_submissions(student_id, course_id);

PRAGMA user_version = 1;
";
