//! Password login and access token issuance.
use crate::db::{self, models::appuser::AppUser};

use super::security::{self, JwtKeys};

/// Check a user's credentials and issue an access token for them.
pub async fn login(
    email: &str,
    password: &str,
    keys: &JwtKeys,
    db_conn: &db::ConnectionPool,
) -> Result<String, errors::LoginError> {
    let user = AppUser::select_by_email(email, db_conn)
        .await?
        .ok_or(errors::LoginError::InvalidCredentials)?;
    if !security::verify_password(password, user.hashed_password()) {
        return Err(errors::LoginError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(errors::LoginError::Inactive(user.id()));
    }
    Ok(security::create_access_token(user.id(), None, keys)?)
}

/// Resolve the user an access token was issued to. Returns `None` for any
/// token which should not grant access: malformed, expired, or naming a user
/// who no longer exists or has been deactivated.
pub async fn authenticate_token(
    token: &str,
    keys: &JwtKeys,
    db_conn: &db::ConnectionPool,
) -> Result<Option<AppUser>, db::errors::DatabaseError> {
    let Some(user_id) = security::verify_token(token, keys).and_then(|claims| claims.user_id())
    else {
        return Ok(None);
    };
    Ok(AppUser::select_one(user_id, db_conn)
        .await?
        .filter(|user| user.is_active))
}

pub mod errors {
    use thiserror::Error;

    use crate::db::errors::DatabaseError;

    #[derive(Debug, Error)]
    pub enum LoginError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Incorrect email or password")]
        InvalidCredentials,
        #[error("Inactive user")]
        Inactive(i64),
        #[error("Token signing failed: {0}")]
        Token(#[from] jsonwebtoken::errors::Error),
    }
}
