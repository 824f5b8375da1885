//! Password hashing and access token handling.
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::constants::auth::ACCESS_TOKEN_EXPIRE_MINUTES;

/// Instantiate an Argon2 context with the standard parameters.
fn create_argon2<'a>() -> Argon2<'a> {
    Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(12288, 3, 1, None).expect("Invalid Argon2id parameters"),
    )
}

/// Convert a raw password string into a hashed representation for storing.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(create_argon2()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext password against a stored hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    let Ok(hash) = PasswordHash::new(hashed_password) else {
        tracing::error!("Stored Argon2id hash is malformed");
        return false;
    };
    create_argon2()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

/// The signing and verification keys for access tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Derive both keys from a shared HMAC secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The claims carried by an access token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The user ID the token was issued to.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

impl Claims {
    /// The user ID named by the token, if the subject is well formed.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Create an HS256 access token for a user. Without `expires_in` the token
/// lives for the standard access token lifetime.
pub fn create_access_token(
    user_id: i64,
    expires_in: Option<Duration>,
    keys: &JwtKeys,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expire = OffsetDateTime::now_utc()
        + expires_in.unwrap_or_else(|| Duration::minutes(ACCESS_TOKEN_EXPIRE_MINUTES));
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expire.unix_timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)
}

/// Verify an access token and return its claims. Invalid, tampered or
/// expired tokens yield `None`.
pub fn verify_token(token: &str, keys: &JwtKeys) -> Option<Claims> {
    jsonwebtoken::decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims)
        .map_err(|err| tracing::debug!("Rejected access token: {err}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(b"unit-test-secret")
    }

    #[test]
    fn password_round_trips_and_rejects_others() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse battery", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_carries_user_id() {
        let token = create_access_token(42, None, &keys()).unwrap();
        let claims = verify_token(&token, &keys()).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        let lifetime = claims.exp - OffsetDateTime::now_utc().unix_timestamp();
        assert!((29 * 60..=30 * 60).contains(&lifetime));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_access_token(1, Some(Duration::hours(-2)), &keys()).unwrap();
        assert_eq!(verify_token(&token, &keys()), None);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_access_token(1, None, &JwtKeys::new(b"someone-else")).unwrap();
        assert_eq!(verify_token(&token, &keys()), None);
    }
}
