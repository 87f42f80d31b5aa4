//! Per-field input validators.
//!
//! Step ids double as field kinds: every step is checked by the validator of
//! the same name before its value is recorded.

use std::sync::LazyLock;

use parley_core::StepId;
use regex::Regex;

use crate::error::FlowError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid email regex")
});
static PHONE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()]").expect("Invalid phone noise regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("Invalid phone regex"));
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("Invalid name regex"));

pub const INVALID_EMAIL: &str =
    "Invalid email format. Please provide a valid email (e.g., example@gmail.com)";
pub const INVALID_PHONE: &str =
    "Invalid phone number. Please provide a valid phone number (10-15 digits, optional + prefix)";
pub const INVALID_NAME: &str =
    "Invalid name. Please provide a valid name (at least 2 characters, letters only)";
pub const INVALID_ADDRESS: &str =
    "Invalid address. Please provide a complete address (at least 5 characters)";
pub const INVALID_CONTRACT_ID: &str = "Invalid Contract ID. Please provide a numeric ID";

/// Outcome of a field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Invalid, with the user-facing message naming the expected format.
    Invalid(&'static str),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn into_result(self, step: StepId) -> Result<(), FlowError> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Invalid(message) => Err(FlowError::ValidationFailed {
                step,
                message: message.to_string(),
            }),
        }
    }
}

/// Validate `input` as the field kind named by `step`.
pub fn validate(step: StepId, input: &str) -> Validation {
    let ok = match step {
        StepId::Email => EMAIL.is_match(input.trim()),
        StepId::Phone => PHONE.is_match(&PHONE_NOISE.replace_all(input, "")),
        StepId::Name => {
            let name = input.trim();
            name.chars().count() >= 2 && NAME.is_match(name)
        }
        StepId::Address => input.trim().chars().count() >= 5,
        StepId::ContractId => {
            let id = input.trim();
            !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
        }
    };

    if ok {
        Validation::Valid
    } else {
        Validation::Invalid(match step {
            StepId::Email => INVALID_EMAIL,
            StepId::Phone => INVALID_PHONE,
            StepId::Name => INVALID_NAME,
            StepId::Address => INVALID_ADDRESS,
            StepId::ContractId => INVALID_CONTRACT_ID,
        })
    }
}
