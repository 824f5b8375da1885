//! Routes under /users: accounts, and each user's progress records.
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::{
    db::models::{
        appuser::AppUser, knowledge_gap::KnowledgeGap, quiz_attempt::QuizAttempt,
        user_progress::UserProgress,
    },
    middleware::auth::{bearer_middleware, AuthenticatedUser},
    services::{
        progress::{self, CurriculumProgress, QuizResult, Recommendations},
        users,
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Create a router for the /users route.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/{user_id}", put(update_user).delete(deactivate_user))
        .route("/{user_id}/progress", post(record_progress))
        .route("/{user_id}/knowledge-gaps", post(record_knowledge_gap))
        .layer(from_fn_with_state(state.clone(), bearer_middleware));
    let public = Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/{user_id}", get(retrieve_user))
        .route("/{user_id}/progress", get(list_progress))
        .route("/{user_id}/knowledge-gaps", get(list_knowledge_gaps))
        .route("/{user_id}/quiz-attempts", get(list_quiz_attempts))
        .route(
            "/{user_id}/quiz-attempts/{attempt_id}",
            get(retrieve_quiz_result),
        )
        .route("/{user_id}/curriculum-progress", get(curriculum_progress))
        .route("/{user_id}/recommendations", get(recommendations));
    authenticated.merge(public)
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<users::AppUserCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<AppUser>), HttpError> {
    let Json(body) = payload?;
    let user = users::create_user(body, &state.db).await?;
    tracing::info!("Registered user {} ({})", user.id(), user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
struct PageParameters {
    #[serde(default)]
    skip: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

const fn default_limit() -> u32 {
    100
}

async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<PageParameters>, QueryRejection>,
) -> Result<Json<Vec<AppUser>>, HttpError> {
    let Query(params) = params?;
    Ok(Json(
        users::list_users(params.skip, params.limit, &state.db).await?,
    ))
}

async fn retrieve_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<AppUser>, HttpError> {
    let user = users::retrieve_user(user_id, &state.db)
        .await?
        .ok_or_else(|| {
            HttpError::with_message(StatusCode::NOT_FOUND, format!("User {user_id} not found"))
        })?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
    payload: Result<Json<users::AppUserUpdate>, JsonRejection>,
) -> Result<Json<AppUser>, HttpError> {
    caller.ensure_is(user_id, "update account details")?;
    let Json(body) = payload?;
    tracing::info!("User {user_id} updated their data: {body}");
    Ok(Json(users::update_user(user_id, body, &state.db).await?))
}

async fn deactivate_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
) -> Result<Json<AppUser>, HttpError> {
    caller.ensure_is(user_id, "deactivate an account")?;
    let user = users::deactivate_user(user_id, &state.db).await?;
    tracing::info!("User {user_id} deactivated their account");
    Ok(Json(user))
}

#[derive(Deserialize)]
struct TopicFilter {
    topic_id: Option<i64>,
}

async fn list_progress(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    params: Result<Query<TopicFilter>, QueryRejection>,
) -> Result<Json<Vec<UserProgress>>, HttpError> {
    let Query(params) = params?;
    Ok(Json(
        progress::list_progress(user_id, params.topic_id, &state.db).await?,
    ))
}

async fn record_progress(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
    payload: Result<Json<progress::ProgressCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProgress>), HttpError> {
    caller.ensure_is(user_id, "record progress")?;
    let Json(body) = payload?;
    let entry = progress::record_progress(user_id, body, &state.db).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_knowledge_gaps(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<KnowledgeGap>>, HttpError> {
    Ok(Json(
        progress::list_knowledge_gaps(user_id, &state.db).await?,
    ))
}

async fn record_knowledge_gap(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
    payload: Result<Json<progress::KnowledgeGapCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<KnowledgeGap>), HttpError> {
    caller.ensure_is(user_id, "record a knowledge gap")?;
    let Json(body) = payload?;
    let gap = progress::record_knowledge_gap(user_id, body, &state.db).await?;
    Ok((StatusCode::CREATED, Json(gap)))
}

async fn list_quiz_attempts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    params: Result<Query<TopicFilter>, QueryRejection>,
) -> Result<Json<Vec<QuizAttempt>>, HttpError> {
    let Query(params) = params?;
    Ok(Json(
        progress::list_quiz_attempts(user_id, params.topic_id, &state.db).await?,
    ))
}

async fn retrieve_quiz_result(
    State(state): State<AppState>,
    Path((user_id, attempt_id)): Path<(i64, i64)>,
) -> Result<Json<QuizResult>, HttpError> {
    Ok(Json(
        progress::retrieve_quiz_result(user_id, attempt_id, &state.db).await?,
    ))
}

async fn curriculum_progress(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<CurriculumProgress>, HttpError> {
    Ok(Json(
        progress::curriculum_progress(user_id, &state.db).await?,
    ))
}

async fn recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Recommendations>, HttpError> {
    Ok(Json(progress::recommendations(user_id, &state.db).await?))
}

impl From<users::errors::UserRetrievalError> for HttpError {
    fn from(error: users::errors::UserRetrievalError) -> Self {
        match error {
            users::errors::UserRetrievalError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<users::errors::UserCreationError> for HttpError {
    fn from(error: users::errors::UserCreationError) -> Self {
        match error {
            users::errors::UserCreationError::DatabaseError(err) => err.into(),
            users::errors::UserCreationError::Hashing(err) => {
                tracing::error!("Password hashing failed during registration: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into()
            }
            users::errors::UserCreationError::PasswordPolicy(_)
            | users::errors::UserCreationError::BlankUsername => {
                Self::with_message(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            users::errors::UserCreationError::DuplicateEmail
            | users::errors::UserCreationError::DuplicateUsername => {
                tracing::info!("Registration rejected: {error}");
                Self::with_message(StatusCode::BAD_REQUEST, error.to_string())
            }
        }
    }
}

impl From<users::errors::UserUpdateError> for HttpError {
    fn from(error: users::errors::UserUpdateError) -> Self {
        match error {
            users::errors::UserUpdateError::DatabaseError(err) => err.into(),
            users::errors::UserUpdateError::Hashing(err) => {
                tracing::error!("Password hashing failed during account update: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into()
            }
            users::errors::UserUpdateError::UserNonExistent(user_id) => {
                tracing::warn!("Attempted to update non-existent user {user_id}");
                Self::with_message(StatusCode::NOT_FOUND, format!("User {user_id} not found"))
            }
            users::errors::UserUpdateError::PasswordPolicy(_)
            | users::errors::UserUpdateError::BlankUsername => {
                Self::with_message(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            users::errors::UserUpdateError::DuplicateEmail
            | users::errors::UserUpdateError::DuplicateUsername => {
                Self::with_message(StatusCode::BAD_REQUEST, error.to_string())
            }
        }
    }
}

impl From<progress::errors::ProgressError> for HttpError {
    fn from(error: progress::errors::ProgressError) -> Self {
        let status = match error {
            progress::errors::ProgressError::DatabaseError(err) => return err.into(),
            progress::errors::ProgressError::UserNonExistent(_)
            | progress::errors::ProgressError::TopicNonExistent(_)
            | progress::errors::ProgressError::AttemptNonExistent(_) => StatusCode::NOT_FOUND,
            progress::errors::ProgressError::UserMismatch => StatusCode::BAD_REQUEST,
            progress::errors::ProgressError::ScoreOutOfRange(_)
            | progress::errors::ProgressError::ConfidenceOutOfRange(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            progress::errors::ProgressError::AttemptNotOwned { attempt_id, user_id } => {
                tracing::warn!(
                    "Quiz attempt {attempt_id} requested under user {user_id}, who does not own it"
                );
                StatusCode::FORBIDDEN
            }
        };
        Self::with_message(status, error.to_string())
    }
}
