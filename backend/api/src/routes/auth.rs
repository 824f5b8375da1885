//! Routes under /auth handling authentication related mechanisms.
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    constants::auth::TOKEN_TYPE,
    db::models::appuser::AppUser,
    middleware::auth::{bearer_middleware, AuthenticatedUser},
    services::{auth, users},
    state::AppState,
    utils::httperror::HttpError,
};

/// Create a router for the /auth route.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/whoami", get(whoami))
        .layer(from_fn_with_state(state.clone(), bearer_middleware))
        .route("/login", post(login))
}

#[derive(Deserialize)]
/// A request to /auth/login.
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
/// A response to /auth/login.
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, HttpError> {
    let Json(body) = payload?;
    let access_token = auth::login(&body.email, &body.password, &state.jwt, &state.db)
        .await
        .map_err(|err| {
            if let auth::errors::LoginError::InvalidCredentials = err {
                tracing::info!("Failed login as {}", body.email);
            }
            HttpError::from(err)
        })?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: TOKEN_TYPE,
    }))
}

/// Get the currently authenticated user.
async fn whoami(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<AppUser>, HttpError> {
    let user = users::retrieve_user(caller.user_id, &state.db)
        .await?
        .ok_or_else(|| {
            tracing::error!(
                "User {} was not found after authenticating. Something is critically wrong.",
                caller.user_id
            );
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(user))
}

impl From<auth::errors::LoginError> for HttpError {
    fn from(error: auth::errors::LoginError) -> Self {
        match error {
            auth::errors::LoginError::DatabaseError(err) => err.into(),
            auth::errors::LoginError::InvalidCredentials => Self::with_message(
                StatusCode::UNAUTHORIZED,
                "Incorrect email or password",
            ),
            auth::errors::LoginError::Inactive(user_id) => {
                tracing::warn!("Deactivated user {user_id} attempted to log in");
                Self::with_message(StatusCode::FORBIDDEN, "Inactive user")
            }
            auth::errors::LoginError::Token(err) => {
                tracing::error!("Failed to sign access token: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::{create_router, testing};

    #[tokio::test]
    async fn login_then_whoami() {
        let app = create_router(testing::test_state().await);
        let (user_id, token) = testing::register_and_login(&app, "banach").await;
        let (status, body) = testing::send(
            &app,
            testing::request(Method::GET, "/api/auth/whoami", None, Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user_id);
        assert_eq!(body["username"], "banach");
        assert!(body.get("hashed_password").is_none());
    }

    #[tokio::test]
    async fn login_reports_token_type() {
        let app = create_router(testing::test_state().await);
        testing::register_and_login(&app, "banach").await;
        let (status, body) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/auth/login",
                Some(&json!({"email": "banach@example.com", "password": "orthonormal"})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let app = create_router(testing::test_state().await);
        testing::register_and_login(&app, "banach").await;
        let (status, body) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/auth/login",
                Some(&json!({"email": "banach@example.com", "password": "not it at all"})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect email or password");
    }

    #[tokio::test]
    async fn whoami_requires_a_valid_token() {
        let app = create_router(testing::test_state().await);
        let (status, _) = testing::send(
            &app,
            testing::request(Method::GET, "/api/auth/whoami", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = testing::send(
            &app,
            testing::request(Method::GET, "/api/auth/whoami", None, Some("forged")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deactivated_users_are_forbidden_from_login() {
        let app = create_router(testing::test_state().await);
        let (user_id, token) = testing::register_and_login(&app, "banach").await;
        let (status, _) = testing::send(
            &app,
            testing::request(Method::DELETE, &format!("/api/users/{user_id}"), None, Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = testing::send(
            &app,
            testing::request(
                Method::POST,
                "/api/auth/login",
                Some(&json!({"email": "banach@example.com", "password": "orthonormal"})),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Inactive user");
    }
}
