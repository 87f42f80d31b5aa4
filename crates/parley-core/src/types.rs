//! Shared domain types: flow actions, step identifiers, chat sessions and
//! contracts.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Flow actions and steps
// =============================================================================

/// A guided dialogue the service knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowAction {
    StartContract,
    UpdatePhone,
}

impl fmt::Display for FlowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowAction::StartContract => write!(f, "START_CONTRACT"),
            FlowAction::UpdatePhone => write!(f, "UPDATE_PHONE"),
        }
    }
}

impl std::str::FromStr for FlowAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START_CONTRACT" => Ok(FlowAction::StartContract),
            "UPDATE_PHONE" => Ok(FlowAction::UpdatePhone),
            _ => Err(format!("Unknown flow action: {}", s)),
        }
    }
}

/// A field-collection point inside a flow. Step ids double as field kinds for
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepId {
    Email,
    Name,
    Phone,
    Address,
    ContractId,
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepId::Email => write!(f, "EMAIL"),
            StepId::Name => write!(f, "NAME"),
            StepId::Phone => write!(f, "PHONE"),
            StepId::Address => write!(f, "ADDRESS"),
            StepId::ContractId => write!(f, "CONTRACT_ID"),
        }
    }
}

impl std::str::FromStr for StepId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL" => Ok(StepId::Email),
            "NAME" => Ok(StepId::Name),
            "PHONE" => Ok(StepId::Phone),
            "ADDRESS" => Ok(StepId::Address),
            "CONTRACT_ID" => Ok(StepId::ContractId),
            _ => Err(format!("Unknown step id: {}", s)),
        }
    }
}

/// Raw field values collected during a flow, keyed by step.
pub type FlowData = BTreeMap<StepId, String>;

// =============================================================================
// Chat session
// =============================================================================

/// Persisted dialogue state for one external session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Storage row id.
    pub id: i64,
    /// Caller-supplied session identifier (unique).
    pub session_id: String,
    pub action: Option<FlowAction>,
    pub step: Option<StepId>,
    #[serde(default)]
    pub data: FlowData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// A session with no active flow.
    pub fn is_idle(&self) -> bool {
        self.action.is_none()
    }

    /// The active (action, step) pair, if the session is mid-flow.
    pub fn in_step(&self) -> Option<(FlowAction, StepId)> {
        match (self.action, self.step) {
            (Some(action), Some(step)) => Some((action, step)),
            _ => None,
        }
    }

    /// Return to idle: clear action, step and collected data.
    pub fn reset(&mut self) {
        self.action = None;
        self.step = None;
        self.data.clear();
    }
}

// =============================================================================
// Contract
// =============================================================================

/// Contract lifecycle. Contracts are created `Pending` and only become
/// `Completed` once the CRM accepted the deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Pending,
    Completed,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractStatus::Pending => write!(f, "PENDING"),
            ContractStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ContractStatus::Pending),
            "COMPLETED" => Ok(ContractStatus::Completed),
            _ => Err(format!("Unknown contract status: {}", s)),
        }
    }
}

/// Contact fields collected by the contract flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFields {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl ContractFields {
    /// Build the field set from flow data. Missing steps become empty strings.
    pub fn from_flow_data(data: &FlowData) -> Self {
        let get = |step: StepId| data.get(&step).cloned().unwrap_or_default();
        Self {
            email: get(StepId::Email),
            name: get(StepId::Name),
            phone: get(StepId::Phone),
            address: get(StepId::Address),
        }
    }
}

/// A persisted contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    /// Row id of the chat session that created it.
    pub session_ref: Option<i64>,
    #[serde(flatten)]
    pub fields: ContractFields,
    pub status: ContractStatus,
    pub deal_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
