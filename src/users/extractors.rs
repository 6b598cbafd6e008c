use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, StatusCode},
};
use cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};
use tracing::{error, warn};

use super::error::UserError;
use super::repo_types::User;
use crate::config::{RememberConfig, MAX_REMEMBER_TTL_MINUTES};
use crate::state::AppState;

pub const REMEMBER_COOKIE: &str = "remember_token";

/// Raw remember token from the request's cookies, if any.
pub struct RememberToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for RememberToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == REMEMBER_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());
        Ok(RememberToken(token))
    }
}

/// The user the remember cookie belongs to.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RememberToken(token) = RememberToken::from_request_parts(parts, state).await?;
        let token = token.ok_or((
            StatusCode::UNAUTHORIZED,
            format!("missing {REMEMBER_COOKIE} cookie"),
        ))?;

        match state.users.by_remember_token(&token).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(UserError::NotFound) => {
                warn!("unknown remember token");
                Err((StatusCode::UNAUTHORIZED, "invalid remember token".into()))
            }
            Err(e) => {
                error!(error = %e, "remember token lookup failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
            }
        }
    }
}

/// `Set-Cookie` value handing `token` to the browser.
pub fn remember_cookie(token: &str, cfg: &RememberConfig) -> HeaderValue {
    let ttl = Duration::minutes(cfg.ttl_minutes.clamp(0, MAX_REMEMBER_TTL_MINUTES));
    let mut cookie = Cookie::build((REMEMBER_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(cfg.secure)
        .same_site(SameSite::Lax)
        .max_age(ttl)
        .build();
    if let Some(expires) = OffsetDateTime::now_utc().checked_add(ttl) {
        cookie.set_expires(expires);
    }
    to_header(cookie)
}

/// `Set-Cookie` value that makes the browser drop the remember cookie.
pub fn expired_cookie(cfg: &RememberConfig) -> HeaderValue {
    let cookie = Cookie::build((REMEMBER_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(cfg.secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build();
    to_header(cookie)
}

fn to_header(cookie: Cookie<'_>) -> HeaderValue {
    // base64url tokens and cookie attributes are always visible ASCII
    HeaderValue::from_str(&cookie.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}
