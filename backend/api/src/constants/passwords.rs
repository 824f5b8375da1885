//! Password policy for learner accounts.

/// Shortest password accepted at registration or on update.
pub const PASSWORD_MIN_LENGTH: usize = 8;
/// Longest password accepted. Caps the work a single Argon2id hash can cost.
pub const PASSWORD_MAX_LENGTH: usize = 128;
