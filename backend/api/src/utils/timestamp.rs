//! Timestamp helpers shared by the models.
use time::OffsetDateTime;

/// The current instant in UTC, truncated to microseconds so that it survives a
/// round trip through SQLite text storage unchanged.
pub fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
