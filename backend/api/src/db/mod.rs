//! Contains database models and interaction code.
pub mod models;
pub mod schema;
pub mod seed;

use core::str::FromStr as _;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// An alias for the underlying DBMS specific pool type.
pub type ConnectionPool = sqlx::SqlitePool;

/// Initiate a pooled connection to the database, creating the database file if needed.
pub async fn connect(url: &str) -> Result<ConnectionPool, errors::DatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    Ok(SqlitePoolOptions::new().connect_with(options).await?)
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct DatabaseError(#[from] sqlx::Error);

    impl DatabaseError {
        /// The `table.column` named by a failed UNIQUE constraint, if that is
        /// what went wrong.
        pub fn unique_violation(&self) -> Option<&str> {
            let db_err = self.0.as_database_error()?;
            if !db_err.is_unique_violation() {
                return None;
            }
            db_err.message().strip_prefix("UNIQUE constraint failed: ")
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Helpers for tests which need a live database.
    use sqlx::sqlite::SqlitePoolOptions;

    use super::{schema, ConnectionPool};

    /// A fresh in-memory database with every table created. A single,
    /// never-recycled connection keeps the in-memory database alive.
    pub async fn memory_pool() -> ConnectionPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite should open");
        schema::create_tables(&pool)
            .await
            .expect("schema should apply to an empty database");
        pool
    }
}
