//! Configuration for the language model used to generate quiz questions.
use std::{env::var, sync::LazyLock};

use super::secrets::read_secret;

/// The Anthropic API key. Question generation is disabled when absent.
pub static ANTHROPIC_API_KEY: LazyLock<Option<String>> = LazyLock::new(|| {
    var("ANTHROPIC_API_KEY")
        .ok()
        .or_else(|| {
            var("ANTHROPIC_API_KEY_DOCKER_SECRET")
                .ok()
                .and_then(|secret_path| read_secret(&secret_path).ok())
        })
        .filter(|key| !key.trim().is_empty())
});

/// The model used for question generation.
pub static ANTHROPIC_MODEL: LazyLock<String> = LazyLock::new(|| {
    var("ANTHROPIC_MODEL").unwrap_or_else(|_| String::from("claude-sonnet-4-5-20250929"))
});

/// Base URL of the Anthropic API.
pub static ANTHROPIC_BASE_URL: LazyLock<String> = LazyLock::new(|| {
    var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| String::from("https://api.anthropic.com"))
});

/// The Messages API version header value.
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Upper bound on tokens in a generation response.
pub const MAX_TOKENS: u32 = 4096;

/// How many times a failed generation is retried before giving up.
pub const GENERATION_RETRIES: u32 = 1;
