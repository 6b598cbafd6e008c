use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use super::crypto::{hash_password, remember_token, verify_password, TokenHasher};
use super::error::UserError;
use super::repo::UserStore;
use super::repo_types::{NewUserRow, User};

pub const MIN_PASSWORD_LEN: usize = 8;
/// Column widths of `users.name` and `users.email`.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims the name, normalizes the email and checks both fit their columns.
fn clean_identity(name: &str, email: &str) -> Result<(String, String), UserError> {
    let name = name.trim().to_string();
    let email = normalize_email(email);

    if name.is_empty() {
        return Err(UserError::Invalid("Name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(UserError::Invalid(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(UserError::Invalid(format!(
            "Email must be at most {MAX_EMAIL_LEN} characters"
        )));
    }
    if !is_valid_email(&email) {
        return Err(UserError::Invalid("Invalid email address".into()));
    }
    Ok((name, email))
}

/// Registration input, password still in plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User operations over a [`UserStore`]. Remember tokens leave this type
/// only in raw form; the store only ever sees their HMAC.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: TokenHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hmac_secret: &str) -> Self {
        Self {
            store,
            hasher: TokenHasher::new(hmac_secret),
        }
    }

    /// Stores a new user with a hashed password and a fresh remember token.
    /// Returns the stored user together with the raw token for the cookie.
    #[instrument(skip(self, new), fields(email = %new.email))]
    pub async fn create(&self, new: NewUser) -> Result<(User, String), UserError> {
        let (name, email) = clean_identity(&new.name, &new.email)?;
        if new.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::Invalid(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(&new.password)?;
        let token = remember_token();
        let user = self
            .store
            .insert(NewUserRow {
                name,
                email,
                password_hash,
                remember_hash: Some(self.hasher.hash(&token)),
            })
            .await?;

        info!(user_id = user.id, "user created");
        Ok((user, token))
    }

    /// Persists every field of `user`, under the same name and email rules
    /// as `create`.
    pub async fn update(&self, user: &User) -> Result<User, UserError> {
        let (name, email) = clean_identity(&user.name, &user.email)?;
        let cleaned = User {
            name,
            email,
            ..user.clone()
        };
        self.store.save(&cleaned).await
    }

    /// Replaces the user's remember token and returns the new raw value.
    /// Any cookie holding the previous token stops working.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn issue_remember_token(&self, user: &mut User) -> Result<String, UserError> {
        let token = remember_token();
        user.remember_hash = Some(self.hasher.hash(&token));
        *user = self.store.save(user).await?;
        debug!("remember token issued");
        Ok(token)
    }

    pub async fn forget_remember_token(&self, user: &mut User) -> Result<(), UserError> {
        user.remember_hash = None;
        *user = self.store.save(user).await?;
        Ok(())
    }

    pub async fn by_remember_token(&self, token: &str) -> Result<User, UserError> {
        if token.is_empty() {
            return Err(UserError::NotFound);
        }
        self.store
            .find_by_remember_hash(&self.hasher.hash(token))
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn by_id(&self, id: i64) -> Result<User, UserError> {
        self.store.find_by_id(id).await?.ok_or(UserError::NotFound)
    }

    pub async fn by_email(&self, email: &str) -> Result<User, UserError> {
        self.store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Soft-deletes the user. Id 0 never names a user.
    pub async fn delete(&self, id: i64) -> Result<(), UserError> {
        if id <= 0 {
            return Err(UserError::InvalidId);
        }
        if !self.store.delete(id).await? {
            return Err(UserError::NotFound);
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError> {
        let user = self.by_email(email).await?;
        if let Err(e) = verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "password check failed");
            return Err(e);
        }
        Ok(user)
    }
}
