//! Models mapping to the user_answers database table: the option a learner
//! picked for each question of a quiz attempt.
use sqlx::{query_as, FromRow, SqliteExecutor};

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `UserAnswer`.
pub struct UserAnswerInsert {
    pub quiz_attempt_id: i64,
    pub question_id: i64,
    pub selected_answer_id: i64,
    pub is_correct: bool,
    /// Seconds taken to answer.
    pub time_taken: Option<i64>,
}

/// A `UserAnswer` which is stored in the database.
#[derive(FromRow, Debug, Clone)]
pub struct UserAnswer {
    id: i64,
    pub quiz_attempt_id: i64,
    pub question_id: i64,
    pub selected_answer_id: i64,
    pub is_correct: bool,
    pub time_taken: Option<i64>,
}

impl UserAnswerInsert {
    /// Store this INSERT model and return the complete `UserAnswer`.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<UserAnswer, DatabaseError> {
        Ok(query_as::<_, UserAnswer>(
            "INSERT INTO user_answers
            (quiz_attempt_id, question_id, selected_answer_id, is_correct, time_taken)
            VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.quiz_attempt_id)
        .bind(self.question_id)
        .bind(self.selected_answer_id)
        .bind(self.is_correct)
        .bind(self.time_taken)
        .fetch_one(executor)
        .await?)
    }
}

impl UserAnswer {
    /// Retrieve the answers recorded for an attempt in submission order.
    pub async fn select_for_attempt(
        quiz_attempt_id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM user_answers WHERE quiz_attempt_id = ? ORDER BY id",
        )
        .bind(quiz_attempt_id)
        .fetch_all(db_client)
        .await?)
    }
}
