//! Read access to the curriculum: chapters, topics and their content.
use serde::Serialize;

use crate::db::{
    self,
    models::{chapter::Chapter, content::Content, topic::Topic},
};

/// A chapter together with its topics in chapter order.
#[derive(Serialize, Debug)]
pub struct ChapterWithTopics {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub topics: Vec<Topic>,
}

/// Topics and content items matching a search query.
#[derive(Serialize, Debug)]
pub struct SearchResults {
    pub topics: Vec<Topic>,
    pub contents: Vec<Content>,
}

async fn with_topics(
    chapter: Chapter,
    db_conn: &db::ConnectionPool,
) -> Result<ChapterWithTopics, db::errors::DatabaseError> {
    let topics = Topic::select_by_chapter(chapter.id(), db_conn).await?;
    Ok(ChapterWithTopics { chapter, topics })
}

pub async fn list_chapters(
    db_conn: &db::ConnectionPool,
) -> Result<Vec<ChapterWithTopics>, errors::ContentRetrievalError> {
    let mut chapters = Vec::new();
    for chapter in Chapter::select_all(db_conn).await? {
        chapters.push(with_topics(chapter, db_conn).await?);
    }
    Ok(chapters)
}

pub async fn retrieve_chapter(
    chapter_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<ChapterWithTopics, errors::ContentRetrievalError> {
    let chapter = Chapter::select_one(chapter_id, db_conn)
        .await?
        .ok_or(errors::ContentRetrievalError::ChapterNonExistent(chapter_id))?;
    Ok(with_topics(chapter, db_conn).await?)
}

pub async fn list_topics(
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Topic>, errors::ContentRetrievalError> {
    Ok(Topic::select_all(db_conn).await?)
}

pub async fn retrieve_topic(
    topic_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<Topic, errors::ContentRetrievalError> {
    Topic::select_one(topic_id, db_conn)
        .await?
        .ok_or(errors::ContentRetrievalError::TopicNonExistent(topic_id))
}

/// The content of a topic in presentation order.
pub async fn topic_contents(
    topic_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<Content>, errors::ContentRetrievalError> {
    retrieve_topic(topic_id, db_conn).await?;
    Ok(Content::select_by_topic(topic_id, db_conn).await?)
}

/// Case-insensitive substring search across topics and content.
pub async fn search(
    query: &str,
    db_conn: &db::ConnectionPool,
) -> Result<SearchResults, errors::ContentRetrievalError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(errors::ContentRetrievalError::EmptyQuery);
    }
    Ok(SearchResults {
        topics: Topic::search(query, db_conn).await?,
        contents: Content::search(query, db_conn).await?,
    })
}

pub mod errors {
    use thiserror::Error;

    use crate::db::errors::DatabaseError;

    #[derive(Debug, Error)]
    pub enum ContentRetrievalError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Chapter {0} not found")]
        ChapterNonExistent(i64),
        #[error("Topic {0} not found")]
        TopicNonExistent(i64),
        #[error("Search query must not be empty")]
        EmptyQuery,
    }
}

#[cfg(test)]
pub mod testing {
    //! Curriculum fixtures shared by service and route tests.
    use crate::db::{
        models::{
            chapter::{Chapter, ChapterInsert},
            content::{ContentInsert, ContentType},
            topic::{Topic, TopicInsert},
        },
        ConnectionPool,
    };

    pub async fn chapter(title: &str, pool: &ConnectionPool) -> Chapter {
        ChapterInsert {
            id: None,
            title: title.to_owned(),
            description: None,
        }
        .store(pool)
        .await
        .unwrap()
    }

    pub async fn topic(
        name: &str,
        chapter_id: i64,
        chapter_order: i64,
        pool: &ConnectionPool,
    ) -> Topic {
        TopicInsert {
            id: None,
            name: name.to_owned(),
            description: format!("All about {name}"),
            chapter_id: Some(chapter_id),
            chapter_order,
        }
        .store(pool)
        .await
        .unwrap()
    }

    pub async fn lesson(title: &str, text: &str, topic_id: i64, order_index: i64, pool: &ConnectionPool) {
        ContentInsert {
            title: title.to_owned(),
            content_type: ContentType::Lesson,
            text_content: text.to_owned(),
            latex_content: None,
            topic_id,
            order_index,
        }
        .store(pool)
        .await
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    #[tokio::test]
    async fn chapters_carry_topics_in_chapter_order() {
        let pool = memory_pool().await;
        let chapter = testing::chapter("Vectors", &pool).await;
        testing::topic("Dot product", chapter.id(), 2, &pool).await;
        testing::topic("Vector addition", chapter.id(), 1, &pool).await;
        let chapters = list_chapters(&pool).await.unwrap();
        assert_eq!(chapters.len(), 1);
        let names: Vec<&str> = chapters[0].topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Vector addition", "Dot product"]);
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let pool = memory_pool().await;
        assert!(matches!(
            retrieve_chapter(7, &pool).await,
            Err(errors::ContentRetrievalError::ChapterNonExistent(7))
        ));
        assert!(matches!(
            topic_contents(9, &pool).await,
            Err(errors::ContentRetrievalError::TopicNonExistent(9))
        ));
    }

    #[tokio::test]
    async fn contents_follow_order_index() {
        let pool = memory_pool().await;
        let chapter = testing::chapter("Matrices", &pool).await;
        let topic = testing::topic("Determinants", chapter.id(), 1, &pool).await;
        testing::lesson("Cofactor expansion", "Expand along a row.", topic.id(), 1, &pool).await;
        testing::lesson("2x2 determinants", "ad - bc", topic.id(), 0, &pool).await;
        let contents = topic_contents(topic.id(), &pool).await.unwrap();
        assert_eq!(contents[0].title, "2x2 determinants");
        assert_eq!(contents[1].title, "Cofactor expansion");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_literal() {
        let pool = memory_pool().await;
        let chapter = testing::chapter("Spaces", &pool).await;
        let topic = testing::topic("Eigenvalues", chapter.id(), 1, &pool).await;
        testing::lesson("Characteristic polynomial", "det(A - xI) = 0", topic.id(), 0, &pool).await;
        testing::lesson("Percentages", "100% of columns", topic.id(), 1, &pool).await;

        let results = search("EIGEN", &pool).await.unwrap();
        assert_eq!(results.topics.len(), 1);
        assert!(results.contents.is_empty());

        let results = search("%", &pool).await.unwrap();
        assert!(results.topics.is_empty());
        assert_eq!(results.contents.len(), 1);
        assert_eq!(results.contents[0].title, "Percentages");

        assert!(matches!(
            search("  ", &pool).await,
            Err(errors::ContentRetrievalError::EmptyQuery)
        ));
    }
}
