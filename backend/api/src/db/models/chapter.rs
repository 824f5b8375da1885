//! Models mapping to the chapters database table. A chapter groups related topics.
use serde::Serialize;
use sqlx::{query_as, FromRow, SqliteExecutor};

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `Chapter`.
pub struct ChapterInsert {
    /// An explicit ID, used when importing curriculum data with fixed IDs.
    pub id: Option<i64>,
    /// The chapter's title.
    pub title: String,
    /// An optional summary of the chapter.
    pub description: Option<String>,
}

/// A `Chapter` which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Chapter {
    /// The chapter's ID primary key.
    id: i64,
    /// The chapter's title.
    pub title: String,
    /// An optional summary of the chapter.
    pub description: Option<String>,
}

impl ChapterInsert {
    /// Store this INSERT model and return the complete `Chapter`.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<Chapter, DatabaseError> {
        Ok(query_as::<_, Chapter>(
            "INSERT INTO chapters (id, title, description) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(self.id)
        .bind(self.title)
        .bind(self.description)
        .fetch_one(executor)
        .await?)
    }
}

impl Chapter {
    /// Get the chapter's ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Select a `Chapter` by its ID.
    pub async fn select_one(
        id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM chapters WHERE id = ?")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve all chapters ordered by ID.
    pub async fn select_all(db_client: &ConnectionPool) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM chapters ORDER BY id")
            .fetch_all(db_client)
            .await?)
    }
}
