//! Middleware applied to groups of routes.
pub mod auth;
