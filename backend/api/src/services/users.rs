//! Account management: registration, profile updates and deactivation.
use core::fmt;

use serde::Deserialize;

use crate::{
    constants::passwords::{PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH},
    db::{
        self,
        models::appuser::{AppUser, AppUserInsert},
    },
    utils::email::EmailAddress,
};

use super::security;

/// A request to create a new account.
#[derive(Deserialize)]
pub struct AppUserCreate {
    pub email: EmailAddress,
    pub username: String,
    pub password: String,
}

/// A partial update to an account. Absent fields are left unchanged.
#[derive(Deserialize, Default)]
pub struct AppUserUpdate {
    pub email: Option<EmailAddress>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Display for AppUserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref email) = self.email {
            write!(f, "email={email} ")?;
        }
        if let Some(ref username) = self.username {
            write!(f, "username={username} ")?;
        }
        if self.password.is_some() {
            write!(f, "password=[REDACTED] ")?;
        }
        Ok(())
    }
}

fn check_password_policy(password: &str) -> Result<(), errors::PasswordPolicyError> {
    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        return Err(errors::PasswordPolicyError::TooShort);
    }
    if length > PASSWORD_MAX_LENGTH {
        return Err(errors::PasswordPolicyError::TooLong);
    }
    Ok(())
}

fn check_username(username: &str) -> Result<(), errors::UserCreationError> {
    if username.trim().is_empty() {
        return Err(errors::UserCreationError::BlankUsername);
    }
    Ok(())
}

pub async fn retrieve_user(
    user_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<Option<AppUser>, errors::UserRetrievalError> {
    Ok(AppUser::select_one(user_id, db_conn).await?)
}

pub async fn list_users(
    skip: u32,
    limit: u32,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<AppUser>, errors::UserRetrievalError> {
    Ok(AppUser::select_page(skip, limit, db_conn).await?)
}

pub async fn create_user(
    data: AppUserCreate,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, errors::UserCreationError> {
    check_username(&data.username)?;
    check_password_policy(&data.password)?;
    if AppUser::select_by_email(data.email.as_ref(), db_conn)
        .await?
        .is_some()
    {
        return Err(errors::UserCreationError::DuplicateEmail);
    }
    if AppUser::select_by_username(&data.username, db_conn)
        .await?
        .is_some()
    {
        return Err(errors::UserCreationError::DuplicateUsername);
    }
    let hashed_password = security::hash_password(&data.password)?;
    Ok(AppUserInsert::new(data.email, &data.username, hashed_password)
        .store(db_conn)
        .await?)
}

pub async fn update_user(
    user_id: i64,
    data: AppUserUpdate,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, errors::UserUpdateError> {
    let mut user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::UserUpdateError::UserNonExistent(user_id))?;
    if let Some(email) = data.email {
        if email.as_ref() != user.email() {
            if AppUser::select_by_email(email.as_ref(), db_conn)
                .await?
                .is_some()
            {
                return Err(errors::UserUpdateError::DuplicateEmail);
            }
            user.set_email(email);
        }
    }
    if let Some(username) = data.username {
        if username != user.username {
            if username.trim().is_empty() {
                return Err(errors::UserUpdateError::BlankUsername);
            }
            if AppUser::select_by_username(&username, db_conn)
                .await?
                .is_some()
            {
                return Err(errors::UserUpdateError::DuplicateUsername);
            }
            user.username = username;
        }
    }
    if let Some(password) = data.password {
        check_password_policy(&password)?;
        user.set_hashed_password(security::hash_password(&password)?);
    }
    user.update(db_conn).await?;
    Ok(user)
}

/// Soft-delete a user. The account remains but can no longer sign in.
pub async fn deactivate_user(
    user_id: i64,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, errors::UserUpdateError> {
    let mut user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::UserUpdateError::UserNonExistent(user_id))?;
    user.is_active = false;
    user.update(db_conn).await?;
    Ok(user)
}

pub mod errors {
    use thiserror::Error;

    use crate::{
        constants::passwords::{PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH},
        db::errors::DatabaseError,
    };

    #[derive(Debug, Error)]
    pub enum UserRetrievalError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
    }

    #[derive(Debug, Error)]
    pub enum PasswordPolicyError {
        #[error("Password is below the minimum length of {PASSWORD_MIN_LENGTH}")]
        TooShort,
        #[error("Password is above the maximum length of {PASSWORD_MAX_LENGTH}")]
        TooLong,
    }

    #[derive(Debug, Error)]
    pub enum UserCreationError {
        #[error(transparent)]
        DatabaseError(DatabaseError),
        #[error(transparent)]
        PasswordPolicy(#[from] PasswordPolicyError),
        #[error("Password hashing failed: {0}")]
        Hashing(#[from] argon2::password_hash::Error),
        #[error("Email already registered")]
        DuplicateEmail,
        #[error("Username already taken")]
        DuplicateUsername,
        #[error("Username must not be blank")]
        BlankUsername,
    }

    #[derive(Debug, Error)]
    pub enum UserUpdateError {
        #[error(transparent)]
        DatabaseError(DatabaseError),
        #[error(transparent)]
        PasswordPolicy(#[from] PasswordPolicyError),
        #[error("Password hashing failed: {0}")]
        Hashing(#[from] argon2::password_hash::Error),
        #[error("The user being updated does not exist")]
        UserNonExistent(i64),
        #[error("Email already registered")]
        DuplicateEmail,
        #[error("Username already taken")]
        DuplicateUsername,
        #[error("Username must not be blank")]
        BlankUsername,
    }

    /// A concurrent write can slip past the duplicate checks; the UNIQUE
    /// constraints still catch it.
    impl From<DatabaseError> for UserCreationError {
        fn from(err: DatabaseError) -> Self {
            match err.unique_violation() {
                Some("users.email") => Self::DuplicateEmail,
                Some("users.username") => Self::DuplicateUsername,
                _ => Self::DatabaseError(err),
            }
        }
    }

    impl From<DatabaseError> for UserUpdateError {
        fn from(err: DatabaseError) -> Self {
            match err.unique_violation() {
                Some("users.email") => Self::DuplicateEmail,
                Some("users.username") => Self::DuplicateUsername,
                _ => Self::DatabaseError(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    fn new_user(email: &str, username: &str) -> AppUserCreate {
        AppUserCreate {
            email: EmailAddress::try_from(email).unwrap(),
            username: username.to_owned(),
            password: String::from("eigenvalue"),
        }
    }

    #[tokio::test]
    async fn create_user_hashes_password_and_starts_active() {
        let pool = memory_pool().await;
        let user = create_user(new_user("gauss@example.com", "gauss"), &pool)
            .await
            .unwrap();
        assert!(user.is_active);
        assert_ne!(user.hashed_password(), "eigenvalue");
        assert!(security::verify_password("eigenvalue", user.hashed_password()));
    }

    #[tokio::test]
    async fn duplicate_email_and_username_are_rejected() {
        let pool = memory_pool().await;
        create_user(new_user("gauss@example.com", "gauss"), &pool)
            .await
            .unwrap();
        let same_email = create_user(new_user("gauss@example.com", "carl"), &pool).await;
        assert!(matches!(
            same_email,
            Err(errors::UserCreationError::DuplicateEmail)
        ));
        let same_name = create_user(new_user("carl@example.com", "gauss"), &pool).await;
        assert!(matches!(
            same_name,
            Err(errors::UserCreationError::DuplicateUsername)
        ));
    }

    #[tokio::test]
    async fn racing_duplicates_hit_the_unique_constraints() {
        let pool = memory_pool().await;
        let first = create_user(new_user("gauss@example.com", "gauss"), &pool)
            .await
            .unwrap();

        let same_email = AppUserInsert::new(
            EmailAddress::try_from("gauss@example.com").unwrap(),
            "carl",
            first.hashed_password().to_owned(),
        )
        .store(&pool)
        .await
        .unwrap_err();
        assert!(matches!(
            errors::UserCreationError::from(same_email),
            errors::UserCreationError::DuplicateEmail
        ));

        let same_name = AppUserInsert::new(
            EmailAddress::try_from("carl@example.com").unwrap(),
            "gauss",
            first.hashed_password().to_owned(),
        )
        .store(&pool)
        .await
        .unwrap_err();
        assert!(matches!(
            errors::UserUpdateError::from(same_name),
            errors::UserUpdateError::DuplicateUsername
        ));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let pool = memory_pool().await;
        let mut data = new_user("gauss@example.com", "gauss");
        data.password = String::from("short");
        let result = create_user(data, &pool).await;
        assert!(matches!(
            result,
            Err(errors::UserCreationError::PasswordPolicy(
                errors::PasswordPolicyError::TooShort
            ))
        ));
    }

    #[tokio::test]
    async fn update_changes_only_provided_fields() {
        let pool = memory_pool().await;
        let user = create_user(new_user("gauss@example.com", "gauss"), &pool)
            .await
            .unwrap();
        let updated = update_user(
            user.id(),
            AppUserUpdate {
                username: Some(String::from("prince_of_maths")),
                password: Some(String::from("least squares")),
                ..AppUserUpdate::default()
            },
            &pool,
        )
        .await
        .unwrap();
        assert_eq!(updated.username, "prince_of_maths");
        assert_eq!(updated.email(), "gauss@example.com");
        let stored = retrieve_user(user.id(), &pool).await.unwrap().unwrap();
        assert!(security::verify_password("least squares", stored.hashed_password()));
    }

    #[tokio::test]
    async fn update_to_taken_email_is_rejected() {
        let pool = memory_pool().await;
        create_user(new_user("euler@example.com", "euler"), &pool)
            .await
            .unwrap();
        let user = create_user(new_user("gauss@example.com", "gauss"), &pool)
            .await
            .unwrap();
        let result = update_user(
            user.id(),
            AppUserUpdate {
                email: Some(EmailAddress::try_from("euler@example.com").unwrap()),
                ..AppUserUpdate::default()
            },
            &pool,
        )
        .await;
        assert!(matches!(result, Err(errors::UserUpdateError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn deactivate_keeps_the_account() {
        let pool = memory_pool().await;
        let user = create_user(new_user("gauss@example.com", "gauss"), &pool)
            .await
            .unwrap();
        let deactivated = deactivate_user(user.id(), &pool).await.unwrap();
        assert!(!deactivated.is_active);
        let stored = retrieve_user(user.id(), &pool).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(matches!(
            deactivate_user(999, &pool).await,
            Err(errors::UserUpdateError::UserNonExistent(999))
        ));
    }

    #[tokio::test]
    async fn list_users_pages_in_id_order() {
        let pool = memory_pool().await;
        for name in ["a", "b", "c"] {
            create_user(new_user(&format!("{name}@example.com"), name), &pool)
                .await
                .unwrap();
        }
        let page = list_users(1, 1, &pool).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "b");
    }
}
