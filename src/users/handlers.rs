use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use tera::Context;
use tracing::{debug, error, info, instrument, warn};

use super::{
    dto::{LoginForm, RegisterForm},
    error::UserError,
    extractors::{expired_cookie, remember_cookie, CurrentUser, RememberToken},
    services::NewUser,
};
use crate::{state::AppState, views::titled};

/// Where a freshly remembered user lands.
const AFTER_LOGIN: &str = "/cookietest";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(show_login).post(login))
        .route("/register", get(show_register).post(register))
        .route("/logout", post(logout))
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/cookietest", get(show_cookie_user))
}

pub async fn show_login(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, String)> {
    state.views.page("auth/login", &titled("Log in"))
}

pub async fn show_register(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, String)> {
    state.views.page("auth/register", &titled("Sign up"))
}

#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, (StatusCode, String)> {
    let new = NewUser {
        name: form.name.clone(),
        email: form.email.clone(),
        password: form.password,
    };

    let (user, token) = match state.users.create(new).await {
        Ok(created) => created,
        Err(UserError::Invalid(msg)) => {
            warn!(reason = %msg, "registration rejected");
            return refill(
                &state,
                "auth/register",
                StatusCode::BAD_REQUEST,
                &msg,
                &form.name,
                &form.email,
            );
        }
        Err(UserError::EmailTaken) => {
            warn!("email already registered");
            return refill(
                &state,
                "auth/register",
                StatusCode::CONFLICT,
                "Email already registered",
                &form.name,
                &form.email,
            );
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(internal(e));
        }
    };

    info!(user_id = user.id, "user registered");
    Ok(remember_and_redirect(&state, &token))
}

#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let mut user = match state.users.authenticate(&form.email, &form.password).await {
        Ok(u) => u,
        Err(UserError::NotFound) => {
            warn!("login unknown email");
            return refill(
                &state,
                "auth/login",
                StatusCode::UNAUTHORIZED,
                "Invalid email address",
                "",
                &form.email,
            );
        }
        Err(UserError::InvalidPassword) => {
            warn!("login invalid password");
            return refill(
                &state,
                "auth/login",
                StatusCode::UNAUTHORIZED,
                "Invalid password provided.",
                "",
                &form.email,
            );
        }
        Err(e) => {
            error!(error = %e, "authenticate failed");
            return Err(internal(e));
        }
    };

    // only the hash is stored, so a returning user always gets a new token
    let token = state.users.issue_remember_token(&mut user).await.map_err(|e| {
        error!(error = %e, user_id = user.id, "issue remember token failed");
        internal(e)
    })?;

    info!(user_id = user.id, "user logged in");
    Ok(remember_and_redirect(&state, &token))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    RememberToken(token): RememberToken,
) -> Result<Response, (StatusCode, String)> {
    if let Some(token) = token {
        match state.users.by_remember_token(&token).await {
            Ok(mut user) => {
                state.users.forget_remember_token(&mut user).await.map_err(internal)?;
                info!(user_id = user.id, "user logged out");
            }
            Err(UserError::NotFound) => {}
            Err(e) => {
                error!(error = %e, "logout lookup failed");
                return Err(internal(e));
            }
        }
    }

    Ok((
        [(header::SET_COOKIE, expired_cookie(&state.config.remember))],
        Redirect::to("/"),
    )
        .into_response())
}

/// Echoes the user behind the remember cookie.
pub async fn show_cookie_user(CurrentUser(user): CurrentUser) -> String {
    debug!(user_id = user.id, "remember cookie resolved");
    format!("id: {}\nname: {}\nemail: {}\n", user.id, user.name, user.email)
}

fn remember_and_redirect(state: &AppState, token: &str) -> Response {
    (
        [(header::SET_COOKIE, remember_cookie(token, &state.config.remember))],
        Redirect::to(AFTER_LOGIN),
    )
        .into_response()
}

/// Renders a form again with an error and the values the user typed.
fn refill(
    state: &AppState,
    view: &str,
    status: StatusCode,
    message: &str,
    name: &str,
    email: &str,
) -> Result<Response, (StatusCode, String)> {
    let title = if view == "auth/login" { "Log in" } else { "Sign up" };
    let mut ctx: Context = titled(title);
    ctx.insert("error", message);
    ctx.insert("name", name);
    ctx.insert("email", email);
    let page = state.views.page(view, &ctx)?;
    Ok((status, page).into_response())
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
