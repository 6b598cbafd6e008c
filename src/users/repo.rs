use async_trait::async_trait;
use sqlx::PgPool;

use super::error::UserError;
use super::repo_types::{NewUserRow, User};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, remember_hash, created_at, updated_at";

/// Persistence for users. Soft-deleted rows are invisible to every lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, row: NewUserRow) -> Result<User, UserError>;
    /// Writes every mutable column of `user` back and returns the stored row.
    async fn save(&self, user: &User) -> Result<User, UserError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
    async fn find_by_remember_hash(&self, hash: &str) -> Result<Option<User>, UserError>;
    /// Returns false when no live user had this id.
    async fn delete(&self, id: i64) -> Result<bool, UserError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_where(&self, clause: &str, value: &str) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {clause} = $1 AND deleted_at IS NULL LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

fn map_unique(e: sqlx::Error) -> UserError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.constraint() == Some("users_email_live_idx") {
                UserError::EmailTaken
            } else {
                UserError::Database(e)
            }
        }
        _ => UserError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, row: NewUserRow) -> Result<User, UserError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, remember_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&row.name)
            .bind(&row.email)
            .bind(&row.password_hash)
            .bind(&row.remember_hash)
            .fetch_one(&self.db)
            .await
            .map_err(map_unique)
    }

    async fn save(&self, user: &User) -> Result<User, UserError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, remember_hash = $5,
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.remember_hash)
            .fetch_optional(&self.db)
            .await
            .map_err(map_unique)?
            .ok_or(UserError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        self.find_where("email", email).await
    }

    async fn find_by_remember_hash(&self, hash: &str) -> Result<Option<User>, UserError> {
        self.find_where("remember_hash", hash).await
    }

    async fn delete(&self, id: i64) -> Result<bool, UserError> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = now(), remember_hash = NULL
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
