//! Guided multi-step dialogues for Parley.
//!
//! Flows collect validated fields one step at a time and finish with a
//! persisted contract change plus a call to the external deal system.

pub mod crm;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod validators;

pub use crm::{DealClient, DealReceipt, HubSpotClient, MockDealClient};
pub use definitions::{first_step, flow_steps, FlowStep};
pub use engine::{FlowEngine, FlowReply};
pub use error::{CrmError, FlowError};
pub use validators::{validate, Validation};
