use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo_types::{Employer, VerificationStatus};

pub fn router() -> Router<AppState> {
    handlers::employer_routes().merge(handlers::document_routes())
}
