//! Models mapping to the users database table. Represents a learner account.
use serde::Serialize;
use sqlx::{query, query_as, FromRow};
use time::OffsetDateTime;

use crate::{
    db::{errors::DatabaseError, ConnectionPool},
    utils::{email::EmailAddress, timestamp},
};

/// INSERT model for an `AppUser`. Used ONLY when creating a new user.
pub struct AppUserInsert {
    /// The user's email address. Private to enforce validity.
    email: String,
    /// The user's public handle.
    pub username: String,
    /// The Argon2id hash of the user's password.
    hashed_password: String,
}

/// An `AppUser` which is stored in the database. Can only be constructed by
/// reading it from the database. Serialises to the public user view, which
/// never includes the password hash.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct AppUser {
    /// The user's ID primary key.
    id: i64,
    /// The user's email address. Private to enforce validity.
    email: String,
    /// The user's public handle.
    pub username: String,
    /// The Argon2id hash of the user's password.
    #[serde(skip)]
    hashed_password: String,
    /// Whether the account is active. Deactivated accounts cannot sign in.
    pub is_active: bool,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl AppUserInsert {
    /// Construct a new `AppUser` INSERT model from an already hashed password.
    pub fn new(email: EmailAddress, username: &str, hashed_password: String) -> Self {
        Self {
            email: email.into(),
            username: username.to_owned(),
            hashed_password,
        }
    }

    /// Store this INSERT model in the database and return a complete `AppUser` model.
    pub async fn store(self, db_client: &ConnectionPool) -> Result<AppUser, DatabaseError> {
        Ok(query_as::<_, AppUser>(
            "INSERT INTO users (email, username, hashed_password, is_active, created_at)
            VALUES (?, ?, ?, 1, ?) RETURNING *",
        )
        .bind(self.email)
        .bind(self.username)
        .bind(self.hashed_password)
        .bind(timestamp::now())
        .fetch_one(db_client)
        .await?)
    }
}

impl AppUser {
    /// Get the `AppUser`'s ID primary key.
    pub const fn id(&self) -> i64 {
        self.id
    }
    /// Get the user's email address.
    pub fn email(&self) -> &str {
        &self.email
    }
    /// Replace the user's email address.
    pub fn set_email(&mut self, email: EmailAddress) {
        self.email = email.into();
    }
    /// Get the stored password hash.
    pub fn hashed_password(&self) -> &str {
        &self.hashed_password
    }
    /// Replace the stored password hash.
    pub fn set_hashed_password(&mut self, hashed_password: String) {
        self.hashed_password = hashed_password;
    }
    /// Select an `AppUser` from the database by ID.
    pub async fn select_one(
        id: i64,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    /// Select an `AppUser` from the database by email.
    pub async fn select_by_email(
        email: &str,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db_client)
            .await?)
    }
    /// Select an `AppUser` from the database by username.
    pub async fn select_by_username(
        username: &str,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(db_client)
            .await?)
    }
    /// Retrieve a page of `AppUser` records ordered by ID.
    pub async fn select_page(
        skip: u32,
        limit: u32,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
                .bind(i64::from(limit))
                .bind(i64::from(skip))
                .fetch_all(db_client)
                .await?,
        )
    }
    /// Update the database record to match the model's current state.
    pub async fn update(&self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query(
            "UPDATE users SET email = ?, username = ?, hashed_password = ?, is_active = ?
            WHERE id = ?",
        )
        .bind(&self.email)
        .bind(&self.username)
        .bind(&self.hashed_password)
        .bind(self.is_active)
        .bind(self.id)
        .execute(db_client)
        .await?;
        Ok(())
    }
}
