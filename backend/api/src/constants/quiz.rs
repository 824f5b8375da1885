//! Quiz sizing.

/// Number of questions served when a quiz request does not say.
pub const DEFAULT_QUESTION_COUNT: u32 = 5;
/// Largest quiz that can be requested at once.
pub const MAX_QUESTION_COUNT: u32 = 20;
