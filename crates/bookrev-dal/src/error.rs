pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("User password error: {0}")]
    UserPasswordError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not owner of {0}")]
    NotOwner(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Invalid filter field: {0}")]
    InvalidFilterField(String),

    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl Error {
    /// Unique constraint violations are client's fault, everything else stays database error
    pub(crate) fn on_unique_violation(e: sqlx::Error, msg: &str) -> Self {
        match &e {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                Error::Conflict(msg.to_string())
            }
            _ => Error::DatabaseError(e),
        }
    }
}
