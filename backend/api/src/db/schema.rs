//! Table definitions. Creation is idempotent so it can run on every startup.
use super::{errors::DatabaseError, ConnectionPool};

/// Table DDL in dependency order.
const TABLES: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS chapters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT
    )",
    r"CREATE TABLE IF NOT EXISTS topics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        chapter_id INTEGER REFERENCES chapters(id),
        chapter_order INTEGER NOT NULL DEFAULT 0
    )",
    r"CREATE TABLE IF NOT EXISTS contents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content_type TEXT NOT NULL
            CHECK (content_type IN ('lesson', 'example', 'theorem', 'definition', 'proof')),
        text_content TEXT NOT NULL,
        latex_content TEXT,
        topic_id INTEGER NOT NULL REFERENCES topics(id),
        order_index INTEGER NOT NULL DEFAULT 0
    )",
    r"CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        latex_content TEXT,
        question_type TEXT NOT NULL CHECK (question_type IN ('multiple_choice', 'open_ended')),
        difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
        topic_id INTEGER NOT NULL REFERENCES topics(id)
    )",
    r"CREATE TABLE IF NOT EXISTS answers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        latex_content TEXT,
        is_correct BOOLEAN NOT NULL DEFAULT 0,
        explanation TEXT,
        question_id INTEGER NOT NULL REFERENCES questions(id)
    )",
    r"CREATE TABLE IF NOT EXISTS user_progress (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        topic_id INTEGER NOT NULL REFERENCES topics(id),
        score REAL NOT NULL,
        time_spent INTEGER,
        completed_at TEXT NOT NULL,
        topic_name TEXT,
        difficulty TEXT
    )",
    r"CREATE TABLE IF NOT EXISTS quiz_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        started_at TEXT NOT NULL,
        completed_at TEXT,
        score REAL
    )",
    r"CREATE TABLE IF NOT EXISTS user_answers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quiz_attempt_id INTEGER NOT NULL REFERENCES quiz_attempts(id),
        question_id INTEGER NOT NULL REFERENCES questions(id),
        selected_answer_id INTEGER NOT NULL REFERENCES answers(id),
        is_correct BOOLEAN NOT NULL,
        time_taken INTEGER
    )",
    r"CREATE TABLE IF NOT EXISTS knowledge_gaps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        topic_id INTEGER NOT NULL REFERENCES topics(id),
        identified_at TEXT NOT NULL,
        confidence_level REAL NOT NULL,
        meta_data TEXT
    )",
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_topics_chapter ON topics(chapter_id, chapter_order)",
    "CREATE INDEX IF NOT EXISTS idx_contents_topic ON contents(topic_id)",
    "CREATE INDEX IF NOT EXISTS idx_questions_topic ON questions(topic_id, difficulty)",
    "CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id)",
    "CREATE INDEX IF NOT EXISTS idx_progress_user ON user_progress(user_id, topic_id)",
    "CREATE INDEX IF NOT EXISTS idx_attempts_user ON quiz_attempts(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_user_answers_attempt ON user_answers(quiz_attempt_id)",
    "CREATE INDEX IF NOT EXISTS idx_gaps_user ON knowledge_gaps(user_id)",
];

/// Table names in reverse dependency order, for dropping.
const DROP_ORDER: &[&str] = &[
    "knowledge_gaps",
    "user_answers",
    "quiz_attempts",
    "user_progress",
    "answers",
    "questions",
    "contents",
    "topics",
    "chapters",
    "users",
];

/// Create all database tables and indexes that do not already exist.
pub async fn create_tables(db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(db_conn).await?;
    }
    Ok(())
}

/// Drop all database tables. Every row is lost.
pub async fn drop_tables(db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
    for table in DROP_ORDER {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(db_conn)
            .await?;
    }
    Ok(())
}
