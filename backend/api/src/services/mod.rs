//! Business logic sitting between the HTTP routes and the database models.
pub mod auth;
pub mod content;
pub mod llm;
pub mod progress;
pub mod quiz;
pub mod security;
pub mod users;
