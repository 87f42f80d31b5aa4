//! Flow state machine.
//!
//! A session is either idle or in a step of a flow. `advance` validates the
//! message for the current step, records it, and either moves to the next
//! step or finalizes the flow. All state changes happen on the in-memory
//! session; the caller persists it once the reply is known.
//!
//! Failure handling:
//! - invalid input re-prompts and leaves the session untouched
//! - an unknown contract id re-arms the id step, keeping collected data
//! - everything else resets the session to idle with an error reply

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parley_core::{ChatSession, ContractFields, ContractStatus, FlowAction, StepId};
use parley_storage::ContractRepository;
use tracing::{debug, info, warn};

use crate::crm::{DealClient, DealReceipt};
use crate::definitions::{first_step, flow_steps, position};
use crate::error::{CrmError, FlowError};
use crate::validators::validate;

pub const CONTRACT_STARTED: &str = "Contract started successfully";
pub const PHONE_UPDATED: &str = "Phone updated successfully";
pub const CONTRACT_NOT_FOUND: &str = "Contract not found. Try again.";

/// Outcome of one flow transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowReply {
    /// Prompt for the (new or repeated) current step, or a plain status line.
    Message(String),
    /// The contract flow completed and the CRM accepted the deal.
    ContractStarted { message: String, deal_id: String },
    /// The flow was aborted; the session is idle again.
    Failed {
        error: String,
        category: &'static str,
    },
}

enum Finalized {
    ContractStarted(DealReceipt),
    PhoneUpdated,
}

pub struct FlowEngine {
    contracts: ContractRepository,
    crm: Arc<dyn DealClient>,
    call_timeout: Duration,
}

impl FlowEngine {
    pub fn new(
        contracts: ContractRepository,
        crm: Arc<dyn DealClient>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            contracts,
            crm,
            call_timeout,
        }
    }

    /// Put an idle session at the first step of `action` and return its prompt.
    pub fn start(&self, session: &mut ChatSession, action: FlowAction) -> String {
        let first = first_step(action);
        session.action = Some(action);
        session.step = Some(first.step);
        session.data.clear();
        info!(session_id = %session.session_id, %action, step = %first.step, "Flow started");
        first.prompt.to_string()
    }

    /// Feed one message to an in-step session.
    pub async fn advance(&self, session: &mut ChatSession, message: &str) -> FlowReply {
        match self.try_advance(session, message).await {
            Ok(reply) => reply,
            Err(FlowError::ValidationFailed { step, message }) => {
                debug!(session_id = %session.session_id, %step, "Input rejected, re-prompting");
                FlowReply::Message(message)
            }
            Err(FlowError::ContractNotFound(id)) => {
                info!(session_id = %session.session_id, contract_id = %id, "Contract not found, re-arming id step");
                session.step = Some(StepId::ContractId);
                FlowReply::Message(CONTRACT_NOT_FOUND.to_string())
            }
            Err(e) => {
                warn!(
                    session_id = %session.session_id,
                    category = e.category(),
                    error = %e,
                    "Flow aborted"
                );
                session.reset();
                FlowReply::Failed {
                    error: format!("Error: {}", e),
                    category: e.category(),
                }
            }
        }
    }

    async fn try_advance(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<FlowReply, FlowError> {
        let (action, step) = session.in_step().ok_or_else(|| {
            FlowError::CorruptFlowState("session has no active flow step".to_string())
        })?;
        let steps = flow_steps(action);
        let index = position(action, step).ok_or_else(|| {
            FlowError::CorruptFlowState(format!("step {} is not part of {}", step, action))
        })?;

        validate(step, message).into_result(step)?;
        session.data.insert(step, message.trim().to_string());

        match steps.get(index + 1) {
            Some(next) => {
                session.step = Some(next.step);
                debug!(session_id = %session.session_id, %action, step = %next.step, "Flow advanced");
                Ok(FlowReply::Message(next.prompt.to_string()))
            }
            None => {
                let finalized = self.finalize(session, action).await?;
                info!(session_id = %session.session_id, %action, "Flow finalized");
                session.reset();
                Ok(match finalized {
                    Finalized::ContractStarted(receipt) => FlowReply::ContractStarted {
                        message: CONTRACT_STARTED.to_string(),
                        deal_id: receipt.deal_id,
                    },
                    Finalized::PhoneUpdated => FlowReply::Message(PHONE_UPDATED.to_string()),
                })
            }
        }
    }

    async fn finalize(
        &self,
        session: &ChatSession,
        action: FlowAction,
    ) -> Result<Finalized, FlowError> {
        match action {
            FlowAction::StartContract => {
                let fields = ContractFields::from_flow_data(&session.data);
                let mut contract = self.contracts.insert(Some(session.id), &fields)?;

                let receipt = self.call(self.crm.create_deal(&fields)).await?;
                contract.status = ContractStatus::Completed;
                contract.deal_id = Some(receipt.deal_id.clone());
                self.contracts.update(&mut contract)?;

                info!(contract_id = contract.id, deal_id = %receipt.deal_id, "Contract completed");
                Ok(Finalized::ContractStarted(receipt))
            }
            FlowAction::UpdatePhone => {
                let raw_id = session
                    .data
                    .get(&StepId::ContractId)
                    .filter(|id| !id.is_empty())
                    .ok_or(FlowError::MissingField(StepId::ContractId))?;
                let phone = session
                    .data
                    .get(&StepId::Phone)
                    .ok_or(FlowError::MissingField(StepId::Phone))?;

                // Digits that overflow i64 cannot name a stored contract.
                let mut contract = raw_id
                    .parse::<i64>()
                    .ok()
                    .map(|id| self.contracts.find_by_id(id))
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| FlowError::ContractNotFound(raw_id.clone()))?;

                // The CRM only knows its own deal id, recorded when the deal was created.
                let deal_id = contract
                    .deal_id
                    .clone()
                    .ok_or(CrmError::MissingDealId(contract.id))?;

                contract.fields.phone = phone.clone();
                self.contracts.update(&mut contract)?;
                self.call(self.crm.update_phone(&deal_id, phone)).await?;

                info!(contract_id = contract.id, %deal_id, "Contract phone updated");
                Ok(Finalized::PhoneUpdated)
            }
        }
    }

    /// Run a CRM call under the configured timeout.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, CrmError>>,
    ) -> Result<T, FlowError> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result.map_err(FlowError::from),
            Err(_) => Err(CrmError::Timeout(self.call_timeout).into()),
        }
    }
}
