//! Curriculum import from the textbook CSV files.
use std::{collections::HashMap, io::Read};

use serde::Deserialize;

use super::{
    errors::DatabaseError,
    models::{
        chapter::ChapterInsert,
        content::{ContentInsert, ContentType},
        topic::{Topic, TopicInsert},
    },
    schema, ConnectionPool,
};

/// One row of the topics CSV.
#[derive(Deserialize)]
struct TopicRow {
    chapter: String,
    name: String,
    chapter_order: Option<i64>,
    chapter_id: Option<i64>,
    topic_id: Option<i64>,
}

/// One row of the content CSV.
#[derive(Deserialize)]
struct ContentRow {
    title: String,
    latex_content: Option<String>,
    text_content: String,
    content_type: ContentType,
    topic_id: Option<i64>,
}

/// Counts of imported rows.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub chapters: usize,
    pub topics: usize,
    pub contents: usize,
    pub skipped_contents: usize,
}

/// Load chapters and topics from a topics CSV. A chapter is created the first
/// time its title appears. Returns every topic keyed by ID.
pub async fn init_topics(
    reader: impl Read,
    db_conn: &ConnectionPool,
    summary: &mut SeedSummary,
) -> Result<HashMap<i64, Topic>, errors::SeedError> {
    let mut chapters_by_title: HashMap<String, i64> = HashMap::new();
    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    for row in csv::Reader::from_reader(reader).deserialize() {
        let row: TopicRow = row?;
        let chapter_id = if let Some(&id) = chapters_by_title.get(&row.chapter) {
            id
        } else {
            let chapter = ChapterInsert {
                id: row.chapter_id,
                title: row.chapter.clone(),
                description: None,
            }
            .store(&mut *tx)
            .await?;
            summary.chapters += 1;
            chapters_by_title.insert(row.chapter, chapter.id());
            chapter.id()
        };
        TopicInsert {
            id: row.topic_id,
            name: row.name,
            description: String::new(),
            chapter_id: Some(chapter_id),
            chapter_order: row.chapter_order.unwrap_or(0),
        }
        .store(&mut *tx)
        .await?;
        summary.topics += 1;
    }
    tx.commit().await.map_err(DatabaseError::from)?;

    Ok(Topic::select_all(db_conn)
        .await?
        .into_iter()
        .map(|topic| (topic.id(), topic))
        .collect())
}

/// Load content items from a content CSV. Rows naming an unknown topic are skipped.
pub async fn init_contents(
    reader: impl Read,
    topics: &HashMap<i64, Topic>,
    db_conn: &ConnectionPool,
    summary: &mut SeedSummary,
) -> Result<(), errors::SeedError> {
    let mut next_index: HashMap<i64, i64> = HashMap::new();
    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    for row in csv::Reader::from_reader(reader).deserialize() {
        let row: ContentRow = row?;
        let Some(topic_id) = row.topic_id.filter(|id| topics.contains_key(id)) else {
            tracing::warn!(
                "topic_id {:?} not found in topics. Skipping content '{}'.",
                row.topic_id,
                row.title
            );
            summary.skipped_contents += 1;
            continue;
        };
        let order_index = next_index.entry(topic_id).or_insert(0);
        ContentInsert {
            title: row.title,
            content_type: row.content_type,
            text_content: row.text_content,
            latex_content: row.latex_content.filter(|latex| !latex.is_empty()),
            topic_id,
            order_index: *order_index,
        }
        .store(&mut *tx)
        .await?;
        *order_index += 1;
        summary.contents += 1;
    }
    tx.commit().await.map_err(DatabaseError::from)?;
    Ok(())
}

/// Initialise the database with tables and the curriculum from the textbook CSVs.
/// With `should_drop` every existing table is dropped first.
pub async fn init_db(
    db_conn: &ConnectionPool,
    topics_csv: &str,
    content_csv: &str,
    should_drop: bool,
) -> Result<SeedSummary, errors::SeedError> {
    if should_drop {
        tracing::warn!("Dropping existing tables...");
        schema::drop_tables(db_conn).await?;
    }
    tracing::info!("Creating tables...");
    schema::create_tables(db_conn).await?;

    let mut summary = SeedSummary::default();
    tracing::info!("Adding topics and chapters from {topics_csv}...");
    let topics = init_topics(open(topics_csv)?, db_conn, &mut summary).await?;
    tracing::info!("Adding content from {content_csv}...");
    init_contents(open(content_csv)?, &topics, db_conn, &mut summary).await?;
    tracing::info!(?summary, "Database initialization complete");
    Ok(summary)
}

fn open(path: &str) -> Result<std::fs::File, errors::SeedError> {
    std::fs::File::open(path).map_err(|source| errors::SeedError::Io {
        path: path.to_owned(),
        source,
    })
}

pub mod errors {
    use thiserror::Error;

    use crate::db::errors::DatabaseError;

    #[derive(Debug, Error)]
    pub enum SeedError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Malformed CSV row: {0}")]
        Csv(#[from] csv::Error),
        #[error("Could not open {path}: {source}")]
        Io {
            path: String,
            source: std::io::Error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        models::{chapter::Chapter, content::Content},
        testing::memory_pool,
    };

    const TOPICS: &str = "\
chapter,name,chapter_order,chapter_id,topic_id
Vectors,Vector addition,1,1,10
Vectors,Dot product,2,1,11
Matrices,Matrix multiplication,,2,20
";

    const CONTENTS: &str = "\
title,latex_content,text_content,content_type,topic_id
Adding vectors,,Add componentwise.,lesson,10
Dot product definition,u \\cdot v,Sum of products.,definition,11
Worked example,,Compute it.,example,11
Orphan,,Belongs nowhere.,lesson,99
";

    #[tokio::test]
    async fn topics_create_each_chapter_once() {
        let pool = memory_pool().await;
        let mut summary = SeedSummary::default();
        let topics = init_topics(TOPICS.as_bytes(), &pool, &mut summary)
            .await
            .unwrap();

        assert_eq!(summary.chapters, 2);
        assert_eq!(summary.topics, 3);
        assert_eq!(Chapter::select_all(&pool).await.unwrap().len(), 2);
        assert_eq!(topics[&11].chapter_id, Some(1));
        assert_eq!(topics[&20].chapter_order, 0);
    }

    #[tokio::test]
    async fn contents_skip_unknown_topics_and_keep_file_order() {
        let pool = memory_pool().await;
        let mut summary = SeedSummary::default();
        let topics = init_topics(TOPICS.as_bytes(), &pool, &mut summary)
            .await
            .unwrap();
        init_contents(CONTENTS.as_bytes(), &topics, &pool, &mut summary)
            .await
            .unwrap();

        assert_eq!(summary.contents, 3);
        assert_eq!(summary.skipped_contents, 1);
        let dot = Content::select_by_topic(11, &pool).await.unwrap();
        assert_eq!(dot.len(), 2);
        assert_eq!(dot[0].title, "Dot product definition");
        assert_eq!(dot[0].latex_content.as_deref(), Some("u \\cdot v"));
        assert_eq!(dot[1].order_index, 1);
        let add = Content::select_by_topic(10, &pool).await.unwrap();
        assert_eq!(add[0].latex_content, None);
    }

    #[tokio::test]
    async fn init_db_with_drop_reseeds_from_scratch() {
        let dir = tempfile::TempDir::new().unwrap();
        let topics_csv = dir.path().join("topics.csv");
        let content_csv = dir.path().join("content.csv");
        std::fs::write(&topics_csv, TOPICS).unwrap();
        std::fs::write(&content_csv, CONTENTS).unwrap();
        let topics_csv = topics_csv.to_str().unwrap();
        let content_csv = content_csv.to_str().unwrap();
        let pool = memory_pool().await;

        let first = init_db(&pool, topics_csv, content_csv, true).await.unwrap();
        let second = init_db(&pool, topics_csv, content_csv, true).await.unwrap();

        assert_eq!(
            first,
            SeedSummary {
                chapters: 2,
                topics: 3,
                contents: 3,
                skipped_contents: 1,
            }
        );
        assert_eq!(second, first);
        assert_eq!(Chapter::select_all(&pool).await.unwrap().len(), 2);
        assert_eq!(Content::select_by_topic(11, &pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_csv_is_an_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.csv");
        let missing = missing.to_str().unwrap();
        let pool = memory_pool().await;

        let result = init_db(&pool, missing, missing, false).await;
        assert!(matches!(
            result,
            Err(errors::SeedError::Io { ref path, .. }) if path == missing
        ));
    }

    #[tokio::test]
    async fn malformed_content_type_rolls_back() {
        let pool = memory_pool().await;
        let mut summary = SeedSummary::default();
        let topics = init_topics(TOPICS.as_bytes(), &pool, &mut summary)
            .await
            .unwrap();
        let bad = "title,latex_content,text_content,content_type,topic_id\n\
                   Fine,,ok,lesson,10\n\
                   Broken,,bad,essay,10\n";
        let result = init_contents(bad.as_bytes(), &topics, &pool, &mut summary).await;

        assert!(matches!(result, Err(errors::SeedError::Csv(_))));
        assert!(Content::select_by_topic(10, &pool).await.unwrap().is_empty());
    }
}
