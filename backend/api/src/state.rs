//! Defines the state shared across the Axum application.
use std::sync::Arc;

use crate::{
    db,
    services::{llm::LlmClient, security::JwtKeys},
};

#[derive(Clone)]
/// The state struct shared across routers.
pub struct AppState {
    /// A database connection pool for getting new database connections.
    pub db: db::ConnectionPool,
    /// Keys for signing and checking access tokens.
    pub jwt: JwtKeys,
    /// The language model used to top up quizzes. Generation is skipped when absent.
    pub llm: Option<Arc<dyn LlmClient>>,
}
