//! Models mapping to the topics database table. A topic is a single unit of
//! study within a chapter.
use serde::Serialize;
use sqlx::{query_as, FromRow, SqliteExecutor};

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `Topic`.
pub struct TopicInsert {
    /// An explicit ID, used when importing curriculum data with fixed IDs.
    pub id: Option<i64>,
    /// The topic's name.
    pub name: String,
    /// A description of what the topic covers.
    pub description: String,
    /// The chapter the topic belongs to, if any.
    pub chapter_id: Option<i64>,
    /// Position of the topic within its chapter.
    pub chapter_order: i64,
}

/// A `Topic` which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Topic {
    /// The topic's ID primary key.
    id: i64,
    /// The topic's name.
    pub name: String,
    /// A description of what the topic covers.
    pub description: String,
    /// The chapter the topic belongs to, if any.
    pub chapter_id: Option<i64>,
    /// Position of the topic within its chapter.
    pub chapter_order: i64,
}

impl TopicInsert {
    /// Store this INSERT model and return the complete `Topic`.
    pub async fn store<'e>(self, executor: impl SqliteExecutor<'e>) -> Result<Topic, DatabaseError> {
        Ok(query_as::<_, Topic>(
            "INSERT INTO topics (id, name, description, chapter_id, chapter_order)
            VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.id)
        .bind(self.name)
        .bind(self.description)
        .bind(self.chapter_id)
        .bind(self.chapter_order)
        .fetch_one(executor)
        .await?)
    }
}

impl Topic {
    /// Get the topic's ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Select a `Topic` by its ID.
    pub async fn select_one(
        id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM topics WHERE id = ?")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve every topic ordered by ID.
    pub async fn select_all(db_client: &ConnectionPool) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM topics ORDER BY id")
            .fetch_all(db_client)
            .await?)
    }
    /// Retrieve every topic which belongs to a chapter, in chapter order.
    pub async fn select_by_chapter(
        chapter_id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM topics WHERE chapter_id = ? ORDER BY chapter_order, id",
        )
        .bind(chapter_id)
        .fetch_all(db_client)
        .await?)
    }
    /// Retrieve topics whose name or description contains `needle`, ignoring ASCII case.
    pub async fn search(
        needle: &str,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            r"SELECT * FROM topics
            WHERE name LIKE '%' || ?1 || '%' ESCAPE '\'
            OR description LIKE '%' || ?1 || '%' ESCAPE '\'
            ORDER BY id",
        )
        .bind(super::escape_like(needle))
        .fetch_all(db_client)
        .await?)
    }
}
