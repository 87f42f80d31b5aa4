//! Parley storage crate - SQLite persistence for chat sessions and contracts.
//!
//! Provides a WAL-mode SQLite database with versioned migrations and the
//! session and contract repositories used by the flow engine and dispatcher.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ContractRepository, SessionRepository};
