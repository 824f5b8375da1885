//! Models mapping to the knowledge_gaps database table. A gap marks a topic
//! where a learner has shown low confidence.
use serde::Serialize;
use serde_json::Value;
use sqlx::{query_as, types::Json, FromRow, SqliteExecutor};
use time::OffsetDateTime;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `KnowledgeGap`.
pub struct KnowledgeGapInsert {
    pub user_id: i64,
    pub topic_id: i64,
    /// Confidence in the topic on a 0 to 1 scale.
    pub confidence_level: f64,
    /// Free-form details about how the gap was identified.
    pub meta_data: Option<Value>,
    pub identified_at: OffsetDateTime,
}

/// A `KnowledgeGap` which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct KnowledgeGap {
    id: i64,
    pub user_id: i64,
    pub topic_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub identified_at: OffsetDateTime,
    /// Confidence in the topic on a 0 to 1 scale.
    pub confidence_level: f64,
    /// Free-form details about how the gap was identified.
    pub meta_data: Option<Json<Value>>,
}

impl KnowledgeGapInsert {
    /// Store this INSERT model and return the complete `KnowledgeGap`.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<KnowledgeGap, DatabaseError> {
        Ok(query_as::<_, KnowledgeGap>(
            "INSERT INTO knowledge_gaps
            (user_id, topic_id, identified_at, confidence_level, meta_data)
            VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.user_id)
        .bind(self.topic_id)
        .bind(self.identified_at)
        .bind(self.confidence_level)
        .bind(self.meta_data.map(Json))
        .fetch_one(executor)
        .await?)
    }
}

impl KnowledgeGap {
    /// Retrieve a user's gaps, lowest confidence first.
    pub async fn select_for_user(
        user_id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM knowledge_gaps WHERE user_id = ? ORDER BY confidence_level, id",
        )
        .bind(user_id)
        .fetch_all(db_client)
        .await?)
    }
}
