//! Conversational front door for Parley.
//!
//! Routes each message either into an active flow, into a new flow, or to the
//! query compiler, with per-session serialization of state changes.

pub mod dispatcher;
pub mod error;
pub mod reply;
pub mod session;

pub use dispatcher::{classify, ChatIntent, Dispatcher};
pub use error::ChatError;
pub use reply::Reply;
pub use session::{SessionLocks, SessionStore};
