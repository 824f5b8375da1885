//! Constants (primary environment variables/secrets) used across the application.
pub mod api;
pub mod auth;
pub mod db;
pub mod llm;
pub mod passwords;
pub mod progress;
pub mod quiz;
mod secrets;
