//! Parley API crate - axum HTTP server and route handlers.
//!
//! Exposes the chat dispatcher, the standalone query compiler, the list of
//! data contexts and a health check over JSON.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
