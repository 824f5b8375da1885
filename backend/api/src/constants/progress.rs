//! Thresholds and limits used when summarising a learner's progress.

/// A topic counts as completed once its latest score reaches this value.
pub const COMPLETION_THRESHOLD: f64 = 0.7;
/// Completed topics scoring below this are suggested for review.
pub const REVIEW_THRESHOLD: f64 = 0.8;
/// Maximum number of next topics in a recommendation.
pub const NEXT_TOPICS_LIMIT: usize = 3;
/// Maximum number of review topics in a recommendation.
pub const REVIEW_TOPICS_LIMIT: usize = 5;
/// Maximum number of knowledge gaps in a recommendation.
pub const KNOWLEDGE_GAPS_LIMIT: usize = 5;
