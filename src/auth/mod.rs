use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::{AdminUser, AuthUser};
pub use repo_types::{User, UserRole};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
