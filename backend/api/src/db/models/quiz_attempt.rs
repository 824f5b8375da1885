//! Models mapping to the quiz_attempts database table.
use serde::Serialize;
use sqlx::{query, query_as, FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `QuizAttempt`.
pub struct QuizAttemptInsert {
    pub user_id: i64,
    pub started_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

/// A `QuizAttempt` which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct QuizAttempt {
    /// The attempt's ID primary key.
    id: i64,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// Fraction of answers that were correct, once graded.
    pub score: Option<f64>,
}

impl QuizAttemptInsert {
    /// Store this INSERT model and return the complete `QuizAttempt`.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<QuizAttempt, DatabaseError> {
        Ok(query_as::<_, QuizAttempt>(
            "INSERT INTO quiz_attempts (user_id, started_at, completed_at)
            VALUES (?, ?, ?) RETURNING *",
        )
        .bind(self.user_id)
        .bind(self.started_at)
        .bind(self.completed_at)
        .fetch_one(executor)
        .await?)
    }
}

impl QuizAttempt {
    /// Get the attempt's ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Select a `QuizAttempt` by its ID.
    pub async fn select_one(
        id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM quiz_attempts WHERE id = ?")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve a user's attempts, newest first. When `topic_id` is given only
    /// attempts which answered at least one question on that topic are returned.
    pub async fn select_for_user(
        user_id: i64,
        topic_id: Option<i64>,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM quiz_attempts qa
            WHERE qa.user_id = ?1 AND (?2 IS NULL OR EXISTS (
                SELECT 1 FROM user_answers ua
                JOIN questions q ON q.id = ua.question_id
                WHERE ua.quiz_attempt_id = qa.id AND q.topic_id = ?2
            ))
            ORDER BY qa.started_at DESC, qa.id DESC",
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_all(db_client)
        .await?)
    }
    /// Update the database record to match the model's current state.
    pub async fn update<'e>(
        &self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<(), DatabaseError> {
        query("UPDATE quiz_attempts SET completed_at = ?, score = ? WHERE id = ?")
            .bind(self.completed_at)
            .bind(self.score)
            .bind(self.id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
