//! Error types for flows and the external deal system.

use std::time::Duration;

use parley_core::error::ParleyError;
use parley_core::StepId;

/// Errors from the external deal system.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    Request(String),
    #[error("CRM returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("CRM call timed out after {0:?}")]
    Timeout(Duration),
    #[error("CRM is not configured: {0}")]
    NotConfigured(String),
    #[error("CRM rejected the request: {0}")]
    Rejected(String),
    #[error("Contract {0} has no CRM deal")]
    MissingDealId(i64),
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        CrmError::Request(err.to_string())
    }
}

/// Errors raised while advancing or finalizing a flow.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("{message}")]
    ValidationFailed { step: StepId, message: String },
    #[error("Contract not found: {0}")]
    ContractNotFound(String),
    #[error("External call failed: {0}")]
    ExternalCallFailed(#[from] CrmError),
    #[error("Corrupt flow state: {0}")]
    CorruptFlowState(String),
    #[error("Missing field: {0}")]
    MissingField(StepId),
    #[error("Storage error: {0}")]
    Storage(#[from] ParleyError),
}

impl FlowError {
    /// Short machine-readable category attached to error replies.
    pub fn category(&self) -> &'static str {
        match self {
            FlowError::ValidationFailed { .. } => "validation",
            FlowError::ContractNotFound(_) => "not_found",
            FlowError::ExternalCallFailed(_) => "external",
            FlowError::CorruptFlowState(_) => "internal",
            FlowError::MissingField(_) => "missing_field",
            FlowError::Storage(_) => "storage",
        }
    }
}
