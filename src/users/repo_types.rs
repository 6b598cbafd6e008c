use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    #[serde(skip_serializing)]
    pub remember_hash: Option<String>, // HMAC of the cookie value
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Row about to be inserted; everything is already hashed.
#[derive(Debug, Clone)]
pub struct NewUserRow {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub remember_hash: Option<String>,
}
