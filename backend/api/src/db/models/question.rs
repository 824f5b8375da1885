//! Models mapping to the questions database table. Questions are quiz items
//! attached to a topic; their options live in the answers table.
use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{query_as, FromRow, SqliteExecutor};

use crate::db::{errors::DatabaseError, ConnectionPool};

/// The form of a question.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    OpenEnded,
}

/// How hard a question is.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::MultipleChoice => "multiple_choice",
            Self::OpenEnded => "open_ended",
        })
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

/// INSERT model for a `Question`.
pub struct QuestionInsert {
    pub text: String,
    pub latex_content: Option<String>,
    pub question_type: QuestionType,
    pub difficulty: DifficultyLevel,
    pub topic_id: i64,
}

/// A `Question` which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Question {
    /// The question's ID primary key.
    id: i64,
    /// The question as posed to the learner.
    pub text: String,
    /// Optional LaTeX form of the question.
    pub latex_content: Option<String>,
    pub question_type: QuestionType,
    pub difficulty: DifficultyLevel,
    /// The topic the question tests.
    pub topic_id: i64,
}

impl QuestionInsert {
    /// Store this INSERT model and return the complete `Question`.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<Question, DatabaseError> {
        Ok(query_as::<_, Question>(
            "INSERT INTO questions (text, latex_content, question_type, difficulty, topic_id)
            VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.text)
        .bind(self.latex_content)
        .bind(self.question_type)
        .bind(self.difficulty)
        .bind(self.topic_id)
        .fetch_one(executor)
        .await?)
    }
}

impl Question {
    /// Get the question's ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Select a `Question` by its ID.
    pub async fn select_one(
        id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM questions WHERE id = ?")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve up to `limit` questions for a topic, optionally of a single difficulty.
    pub async fn select_for_topic(
        topic_id: i64,
        difficulty: Option<DifficultyLevel>,
        limit: u32,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM questions
            WHERE topic_id = ? AND (? IS NULL OR difficulty = ?)
            ORDER BY id LIMIT ?",
        )
        .bind(topic_id)
        .bind(difficulty)
        .bind(difficulty)
        .bind(i64::from(limit))
        .fetch_all(db_client)
        .await?)
    }
}
