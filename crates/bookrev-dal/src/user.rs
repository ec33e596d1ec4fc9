use argon2::{
    password_hash::{rand_core::OsRng, Result as HashResult, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use bookrev_types::general::{ValidEmail, ValidUsername};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use tracing::debug;

use crate::{error::Result, Error};

fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateUser {
    #[garde(dive)]
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub username: ValidUsername,
    #[garde(dive)]
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub email: ValidEmail,
    #[garde(length(min = 6, max = 255))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[sqlx(rename = "created")]
    pub created_at: time::PrimitiveDateTime,
}

/// Public part of user, as attached to books and reviews
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserShort {
    pub id: i64,
    pub username: String,
}

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let password = hash_password(&payload.password)?;
        let result = sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
            .bind(payload.username.as_ref())
            .bind(payload.email.as_ref().to_lowercase())
            .bind(password)
            .execute(&self.executor)
            .await
            .map_err(|e| {
                Error::on_unique_violation(e, "User with this email or username already exists")
            })?;

        let id = result.last_insert_rowid();
        debug!("Created user {id}");
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT id, username, email, created FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    pub async fn check_password(&self, email: &str, password: &str) -> Result<User> {
        let (id, hashed_password): (i64, String) =
            sqlx::query_as("SELECT id, password FROM users WHERE email = ?")
                .bind(email.trim().to_lowercase())
                .fetch_one(&self.executor)
                .await
                .map_err(|e| {
                    debug!("User check error: {e}");
                    Error::InvalidCredentials
                })?;
        if verify_password(password, &hashed_password).unwrap_or(false) {
            return self.get(id).await;
        }
        Err(Error::InvalidCredentials)
    }
}
