pub mod admin;
pub mod auth;
pub mod common;
pub mod items;
pub mod nightly;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
