//! Constants related to authentication and access tokens.
use std::{env::var, sync::LazyLock};

use super::secrets::read_secret;

/// The HMAC secret used to sign and verify access tokens.
pub static JWT_SECRET: LazyLock<String> = LazyLock::new(|| {
    var("JWT_SECRET").unwrap_or_else(|_| {
        let secret_path = var("JWT_SECRET_DOCKER_SECRET").expect(
            "Neither JWT_SECRET nor JWT_SECRET_DOCKER_SECRET provided in environment variables",
        );
        read_secret(&secret_path).expect("Failed to read JWT_SECRET docker secret")
    })
});

/// Lifetime of an access token in minutes.
pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// The token type reported alongside issued access tokens.
pub const TOKEN_TYPE: &str = "bearer";
