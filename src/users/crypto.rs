use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::error;

use super::error::UserError;

/// Random bytes behind every remember token.
pub const REMEMBER_TOKEN_BYTES: usize = 32;

pub fn hash_password(plain: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            UserError::Hash(e.to_string())
        })
}

/// Checks `plain` against a stored PHC string. A mismatch is
/// `InvalidPassword`; a corrupt stored hash is `Hash`.
pub fn verify_password(plain: &str, stored: &str) -> Result<(), UserError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        UserError::Hash(e.to_string())
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(()),
        Err(argon2::password_hash::Error::Password) => Err(UserError::InvalidPassword),
        Err(e) => Err(UserError::Hash(e.to_string())),
    }
}

/// Fresh base64url token suitable for a cookie value.
pub fn remember_token() -> String {
    let mut bytes = [0u8; REMEMBER_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Keyed hash used to store remember tokens. Equal inputs give equal
/// outputs, so a presented cookie can be looked up by its hash.
#[derive(Clone)]
pub struct TokenHasher {
    key: Vec<u8>,
}

impl TokenHasher {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    pub fn hash(&self, token: &str) -> String {
        // HMAC accepts keys of any length
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
        mac.update(token.as_bytes());
        URL_SAFE.encode(mac.finalize().into_bytes())
    }
}
