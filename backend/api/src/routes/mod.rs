//! API routes within the application. Mainly exposes sub-routers which are
//! nested under /api by `create_router`.
pub mod auth;
pub mod content;
pub mod quiz;
pub mod users;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::{constants::api::WELCOME_MESSAGE, state::AppState};

#[derive(Serialize)]
struct WelcomeResponse {
    message: &'static str,
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE,
    })
}

/// Build the complete application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/api/auth", auth::create_router(&state))
        .nest("/api/content", content::create_router())
        .nest("/api/users", users::create_router(&state))
        .nest("/api/quiz", quiz::create_router(&state))
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::{create_router, testing};

    #[tokio::test]
    async fn root_welcomes() {
        let app = create_router(testing::test_state().await);
        let (status, body) = testing::send(&app, testing::request(Method::GET, "/", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "Welcome to Linear Algebra Learning Platform API"
        );
    }
}
