//! Static dialogue scripts: each flow action maps to an ordered list of
//! (step, prompt) pairs. The first prompt is sent when the flow starts; the
//! last step's completion triggers finalization.

use parley_core::{FlowAction, StepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStep {
    pub step: StepId,
    pub prompt: &'static str,
}

const fn step(step: StepId, prompt: &'static str) -> FlowStep {
    FlowStep { step, prompt }
}

static START_CONTRACT: [FlowStep; 4] = [
    step(StepId::Email, "Please provide your email address"),
    step(StepId::Name, "Please provide your full name"),
    step(StepId::Phone, "Please provide your phone number"),
    step(StepId::Address, "Please provide your address"),
];

static UPDATE_PHONE: [FlowStep; 2] = [
    step(StepId::ContractId, "Please provide your contract ID"),
    step(StepId::Phone, "Please provide the new phone number"),
];

/// Ordered steps of a flow.
pub fn flow_steps(action: FlowAction) -> &'static [FlowStep] {
    match action {
        FlowAction::StartContract => &START_CONTRACT,
        FlowAction::UpdatePhone => &UPDATE_PHONE,
    }
}

/// The step a flow starts at.
pub fn first_step(action: FlowAction) -> FlowStep {
    match action {
        FlowAction::StartContract => START_CONTRACT[0],
        FlowAction::UpdatePhone => UPDATE_PHONE[0],
    }
}

/// Index of `step` within the flow, if it belongs to it.
pub fn position(action: FlowAction, step: StepId) -> Option<usize> {
    flow_steps(action).iter().position(|s| s.step == step)
}
