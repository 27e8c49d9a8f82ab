pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod posts;

pub use auth::{AppOptions, AppState, AppStateInner};
pub use error::ApiError;
