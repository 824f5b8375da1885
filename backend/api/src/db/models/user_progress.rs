//! Models mapping to the user_progress database table. Each row records a
//! learner's score on a topic at a point in time.
use serde::Serialize;
use sqlx::{query_as, FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `UserProgress` entry.
pub struct UserProgressInsert {
    pub user_id: i64,
    pub topic_id: i64,
    /// Fraction of the topic answered correctly, 0 to 1.
    pub score: f64,
    /// Seconds spent on the topic.
    pub time_spent: Option<i64>,
    pub completed_at: OffsetDateTime,
    /// Denormalised topic name for easier querying.
    pub topic_name: Option<String>,
    pub difficulty: Option<String>,
}

/// A `UserProgress` entry which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct UserProgress {
    /// The entry's ID primary key.
    id: i64,
    pub user_id: i64,
    pub topic_id: i64,
    /// Fraction of the topic answered correctly, 0 to 1.
    pub score: f64,
    /// Seconds spent on the topic.
    pub time_spent: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    /// Denormalised topic name for easier querying.
    pub topic_name: Option<String>,
    pub difficulty: Option<String>,
}

impl UserProgressInsert {
    /// Store this INSERT model and return the complete `UserProgress` entry.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<UserProgress, DatabaseError> {
        Ok(query_as::<_, UserProgress>(
            "INSERT INTO user_progress
            (user_id, topic_id, score, time_spent, completed_at, topic_name, difficulty)
            VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.user_id)
        .bind(self.topic_id)
        .bind(self.score)
        .bind(self.time_spent)
        .bind(self.completed_at)
        .bind(self.topic_name)
        .bind(self.difficulty)
        .fetch_one(executor)
        .await?)
    }
}

impl UserProgress {
    /// Retrieve a user's progress entries, newest first, optionally for one topic.
    pub async fn select_for_user(
        user_id: i64,
        topic_id: Option<i64>,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM user_progress
            WHERE user_id = ? AND (? IS NULL OR topic_id = ?)
            ORDER BY completed_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(topic_id)
        .bind(topic_id)
        .fetch_all(db_client)
        .await?)
    }
}
