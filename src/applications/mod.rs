use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo_types::{Application, ApplicationStatus};

pub fn router() -> Router<AppState> {
    handlers::application_routes()
}

pub fn uploads_router() -> Router<AppState> {
    handlers::resume_routes()
}
