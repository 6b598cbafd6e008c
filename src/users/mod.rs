use crate::state::AppState;
use axum::Router;

pub mod crypto;
mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use error::UserError;
pub use repo::{PgUserStore, UserStore};
pub use repo_types::User;
pub use services::{NewUser, UserService};

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth_routes())
        .merge(handlers::session_routes())
}
