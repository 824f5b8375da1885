//! Database and seed data locations.
use std::{env::var, sync::LazyLock};

/// The connection URL of the SQLite database. The file is created if it does not exist.
pub static DB_URL: LazyLock<String> = LazyLock::new(|| {
    var("DATABASE_URL").unwrap_or_else(|_| String::from("sqlite://linear_algebra_app.db"))
});

/// CSV file listing the chapters and topics of the curriculum.
pub static TEXTBOOK_TOPICS_CSV: LazyLock<String> = LazyLock::new(|| {
    var("TEXTBOOK_TOPICS_CSV")
        .unwrap_or_else(|_| String::from("textbooks/linear_algebra_topics.csv"))
});

/// CSV file listing the content items attached to each topic.
pub static TEXTBOOK_CONTENT_CSV: LazyLock<String> = LazyLock::new(|| {
    var("TEXTBOOK_CONTENT_CSV")
        .unwrap_or_else(|_| String::from("textbooks/linear_algebra_content.csv"))
});
