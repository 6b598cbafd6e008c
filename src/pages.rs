use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{state::AppState, views::titled};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/contact", get(contact))
        .route("/gallery", get(gallery))
}

pub async fn home(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    state.views.page("home", &titled("Home"))
}

pub async fn contact(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    state.views.page("contact", &titled("Contact"))
}

pub async fn gallery(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    state.views.page("gallery", &titled("Gallery"))
}

/// Fallback for every unmatched path.
pub async fn not_found(State(state): State<AppState>) -> Response {
    match state.views.page("errors/404", &titled("Not found")) {
        Ok(page) => (StatusCode::NOT_FOUND, page).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
    }
}
