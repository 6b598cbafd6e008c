use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::error::UserError;
use super::repo::UserStore;
use super::repo_types::{NewUserRow, User};

/// In-process store for tests, honoring the same uniqueness rules as the
/// users table.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<(User, bool)>>, // (user, deleted)
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        let rows = self.rows.lock().unwrap();
        let found = rows
            .iter()
            .find(|(u, deleted)| !deleted && pred(u))
            .map(|(u, _)| u.clone());
        found
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, row: NewUserRow) -> Result<User, UserError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|(u, deleted)| !deleted && u.email == row.email) {
            return Err(UserError::EmailTaken);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: rows.len() as i64 + 1,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            remember_hash: row.remember_hash,
            created_at: now,
            updated_at: now,
        };
        rows.push((user.clone(), false));
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<User, UserError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|(u, deleted)| !deleted && u.id != user.id && u.email == user.email)
        {
            return Err(UserError::EmailTaken);
        }
        let (slot, _) = rows
            .iter_mut()
            .find(|(u, deleted)| !deleted && u.id == user.id)
            .ok_or(UserError::NotFound)?;
        *slot = User {
            updated_at: OffsetDateTime::now_utc(),
            ..user.clone()
        };
        Ok(slot.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_remember_hash(&self, hash: &str) -> Result<Option<User>, UserError> {
        Ok(self.find(|u| u.remember_hash.as_deref() == Some(hash)))
    }

    async fn delete(&self, id: i64) -> Result<bool, UserError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|(u, deleted)| !deleted && u.id == id) {
            Some((u, deleted)) => {
                *deleted = true;
                u.remember_hash = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
