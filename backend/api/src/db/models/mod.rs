//! Defines data models (structs) which map directly to rows in the database.
pub mod answer;
pub mod appuser;
pub mod chapter;
pub mod content;
pub mod knowledge_gap;
pub mod question;
pub mod quiz_attempt;
pub mod topic;
pub mod user_answer;
pub mod user_progress;

/// Escape `LIKE` wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
