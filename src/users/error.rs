use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("user id must be greater than zero")]
    InvalidId,
    #[error("incorrect password provided")]
    InvalidPassword,
    #[error("email address is already registered")]
    EmailTaken,
    #[error("{0}")]
    Invalid(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
