//! Models mapping to the contents database table. Content items are the
//! lessons, examples, theorems, definitions and proofs that make up a topic.
use serde::{Deserialize, Serialize};
use sqlx::{query_as, FromRow, SqliteExecutor};

use crate::db::{errors::DatabaseError, ConnectionPool};

/// The kind of material a content item holds.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Lesson,
    Example,
    Theorem,
    Definition,
    Proof,
}

impl ContentType {
    /// The stored name of the content type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lesson => "lesson",
            Self::Example => "example",
            Self::Theorem => "theorem",
            Self::Definition => "definition",
            Self::Proof => "proof",
        }
    }
}

/// INSERT model for a `Content` item.
pub struct ContentInsert {
    /// The content's title.
    pub title: String,
    /// The kind of material.
    pub content_type: ContentType,
    /// The prose body.
    pub text_content: String,
    /// Optional LaTeX accompanying the prose.
    pub latex_content: Option<String>,
    /// The topic this content belongs to.
    pub topic_id: i64,
    /// Position of the content within its topic.
    pub order_index: i64,
}

/// A `Content` item which is stored in the database.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Content {
    /// The content's ID primary key.
    id: i64,
    /// The content's title.
    pub title: String,
    /// The kind of material.
    pub content_type: ContentType,
    /// The prose body.
    pub text_content: String,
    /// Optional LaTeX accompanying the prose.
    pub latex_content: Option<String>,
    /// The topic this content belongs to.
    pub topic_id: i64,
    /// Position of the content within its topic.
    pub order_index: i64,
}

impl ContentInsert {
    /// Store this INSERT model and return the complete `Content` item.
    pub async fn store<'e>(
        self,
        executor: impl SqliteExecutor<'e>,
    ) -> Result<Content, DatabaseError> {
        Ok(query_as::<_, Content>(
            "INSERT INTO contents
            (title, content_type, text_content, latex_content, topic_id, order_index)
            VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(self.title)
        .bind(self.content_type)
        .bind(self.text_content)
        .bind(self.latex_content)
        .bind(self.topic_id)
        .bind(self.order_index)
        .fetch_one(executor)
        .await?)
    }
}

impl Content {
    /// Get the content's ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Retrieve all content for a topic in presentation order.
    pub async fn select_by_topic(
        topic_id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM contents WHERE topic_id = ? ORDER BY order_index, id",
        )
        .bind(topic_id)
        .fetch_all(db_client)
        .await?)
    }
    /// Retrieve content whose title or text contains `needle`, ignoring ASCII case.
    pub async fn search(
        needle: &str,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            r"SELECT * FROM contents
            WHERE title LIKE '%' || ?1 || '%' ESCAPE '\'
            OR text_content LIKE '%' || ?1 || '%' ESCAPE '\'
            ORDER BY id",
        )
        .bind(super::escape_like(needle))
        .fetch_all(db_client)
        .await?)
    }
}
