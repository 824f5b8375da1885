//! Routes under /content exposing the curriculum.
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    db::models::{content::Content, topic::Topic},
    services::content::{self, ChapterWithTopics, SearchResults},
    state::AppState,
    utils::httperror::HttpError,
};

/// Create a router for the /content route.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/chapters", get(list_chapters))
        .route("/chapters/{chapter_id}", get(retrieve_chapter))
        .route("/topics", get(list_topics))
        .route("/topics/{topic_id}", get(retrieve_topic))
        .route("/topics/{topic_id}/contents", get(topic_contents))
        .route("/search", get(search))
}

async fn list_chapters(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChapterWithTopics>>, HttpError> {
    Ok(Json(content::list_chapters(&state.db).await?))
}

async fn retrieve_chapter(
    State(state): State<AppState>,
    Path(chapter_id): Path<i64>,
) -> Result<Json<ChapterWithTopics>, HttpError> {
    Ok(Json(content::retrieve_chapter(chapter_id, &state.db).await?))
}

async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, HttpError> {
    Ok(Json(content::list_topics(&state.db).await?))
}

async fn retrieve_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i64>,
) -> Result<Json<Topic>, HttpError> {
    Ok(Json(content::retrieve_topic(topic_id, &state.db).await?))
}

async fn topic_contents(
    State(state): State<AppState>,
    Path(topic_id): Path<i64>,
) -> Result<Json<Vec<Content>>, HttpError> {
    Ok(Json(content::topic_contents(topic_id, &state.db).await?))
}

#[derive(Deserialize)]
struct SearchParameters {
    #[serde(default)]
    query: String,
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParameters>, QueryRejection>,
) -> Result<Json<SearchResults>, HttpError> {
    let Query(params) = params?;
    Ok(Json(content::search(&params.query, &state.db).await?))
}

impl From<content::errors::ContentRetrievalError> for HttpError {
    fn from(error: content::errors::ContentRetrievalError) -> Self {
        match error {
            content::errors::ContentRetrievalError::DatabaseError(err) => err.into(),
            content::errors::ContentRetrievalError::ChapterNonExistent(_)
            | content::errors::ContentRetrievalError::TopicNonExistent(_) => {
                Self::with_message(StatusCode::NOT_FOUND, error.to_string())
            }
            content::errors::ContentRetrievalError::EmptyQuery => {
                Self::with_message(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::{
        routes::{create_router, testing},
        services::content::testing as curriculum,
    };

    #[tokio::test]
    async fn browse_the_curriculum() {
        let state = testing::test_state().await;
        let chapter = curriculum::chapter("Linear maps", &state.db).await;
        let kernel = curriculum::topic("Kernel", chapter.id(), 1, &state.db).await;
        curriculum::lesson("Null space", "Vectors sent to zero.", kernel.id(), 0, &state.db).await;
        let app = create_router(state);

        let (status, chapters) = testing::send(
            &app,
            testing::request(Method::GET, "/api/content/chapters", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(chapters[0]["title"], "Linear maps");
        assert_eq!(chapters[0]["topics"][0]["name"], "Kernel");

        let (status, contents) = testing::send(
            &app,
            testing::request(
                Method::GET,
                &format!("/api/content/topics/{}/contents", kernel.id()),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(contents[0]["title"], "Null space");
        assert_eq!(contents[0]["content_type"], "lesson");
        assert_eq!(contents[0]["order_index"], 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = create_router(testing::test_state().await);
        for uri in ["/api/content/chapters/5", "/api/content/topics/5"] {
            let (status, body) =
                testing::send(&app, testing::request(Method::GET, uri, None, None)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body["message"].as_str().unwrap().contains("not found"));
        }
    }

    #[tokio::test]
    async fn search_needs_a_query() {
        let state = testing::test_state().await;
        let chapter = curriculum::chapter("Linear maps", &state.db).await;
        curriculum::topic("Kernel", chapter.id(), 1, &state.db).await;
        let app = create_router(state);

        let (status, _) = testing::send(
            &app,
            testing::request(Method::GET, "/api/content/search", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, results) = testing::send(
            &app,
            testing::request(Method::GET, "/api/content/search?query=kern", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results["topics"][0]["name"], "Kernel");
        assert_eq!(results["contents"].as_array().unwrap().len(), 0);
    }
}
