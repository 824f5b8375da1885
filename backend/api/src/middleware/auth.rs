//! Middleware used for checking user authentication/authorisation.
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::{services::auth, state::AppState, utils::httperror::HttpError};

#[derive(Copy, Clone, Debug)]
/// The user a request's access token was issued to.
pub struct AuthenticatedUser {
    pub user_id: i64,
}

impl AuthenticatedUser {
    /// Fail with 403 unless the caller is `user_id`.
    pub fn ensure_is(self, user_id: i64, action: &str) -> Result<(), HttpError> {
        if self.user_id == user_id {
            return Ok(());
        }
        tracing::warn!(
            "User {} attempted to {action} on behalf of user {user_id}",
            self.user_id
        );
        Err(HttpError::with_message(
            StatusCode::FORBIDDEN,
            format!("Not authorized to {action} for another user"),
        ))
    }
}

fn unauthorized() -> HttpError {
    HttpError::with_message(StatusCode::UNAUTHORIZED, "Could not validate credentials")
}

/// Middleware to check a bearer access token and identify the associated user.
pub async fn bearer_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_err| {
        tracing::debug!("Request is missing a bearer token");
        unauthorized()
    })?;
    let user = auth::authenticate_token(bearer.token(), &state.jwt, &state.db)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Rejected invalid, expired or revoked access token");
            unauthorized()
        })?;
    req.extensions_mut().insert(AuthenticatedUser { user_id: user.id() });
    Ok(next.run(req).await)
}
