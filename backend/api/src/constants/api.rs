//! Constants related to the general configuration of the entire API and its deployment.

use std::{env::var, sync::LazyLock};

/// The socket address the HTTP listener binds to.
pub static BIND_ADDRESS: LazyLock<String> =
    LazyLock::new(|| var("BIND_ADDRESS").unwrap_or_else(|_| String::from("0.0.0.0:8000")));

/// The frontend origin allowed to make credentialed cross-origin requests.
pub static CORS_ALLOWED_ORIGIN: LazyLock<String> = LazyLock::new(|| {
    var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| String::from("http://localhost:3000"))
});

/// The message returned from the root route.
pub const WELCOME_MESSAGE: &str = "Welcome to Linear Algebra Learning Platform API";
