//! Models mapping to the answers database table. Each answer is one option
//! for a question, flagged as correct or not.
use serde::Serialize;
use sqlx::{query_as, FromRow, SqliteExecutor};

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for an `Answer`.
pub struct AnswerInsert {
    pub text: String,
    pub latex_content: Option<String>,
    pub is_correct: bool,
    pub explanation: Option<String>,
    pub question_id: i64,
}

/// An `Answer` which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Answer {
    /// The answer's ID primary key.
    id: i64,
    /// The answer option as shown to the learner.
    pub text: String,
    /// Optional LaTeX form of the option.
    pub latex_content: Option<String>,
    /// Whether selecting this option is correct.
    pub is_correct: bool,
    /// Why this option is right or wrong.
    pub explanation: Option<String>,
    /// The question this answer belongs to.
    pub question_id: i64,
}

impl AnswerInsert {
    /// Store this INSERT model and return the complete `Answer`.
    pub async fn store<'e>(self, executor: impl SqliteExecutor<'e>) -> Result<Answer, DatabaseError> {
        Ok(query_as::<_, Answer>(
            "INSERT INTO answers (text, latex_content, is_correct, explanation, question_id)
            VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.text)
        .bind(self.latex_content)
        .bind(self.is_correct)
        .bind(self.explanation)
        .bind(self.question_id)
        .fetch_one(executor)
        .await?)
    }
}

impl Answer {
    /// Get the answer's ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Select an `Answer` by its ID.
    pub async fn select_one(
        id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM answers WHERE id = ?")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve every option for a question.
    pub async fn select_by_question(
        question_id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM answers WHERE question_id = ? ORDER BY id")
                .bind(question_id)
                .fetch_all(db_client)
                .await?,
        )
    }
    /// Select the first option flagged as correct for a question.
    pub async fn select_correct(
        question_id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM answers WHERE question_id = ? AND is_correct = 1 ORDER BY id LIMIT 1",
        )
        .bind(question_id)
        .fetch_optional(db_client)
        .await?)
    }
}
