//! Chat replies.
//!
//! Serialized untagged so plain text replies stay JSON strings and structured
//! replies are bare objects.

use parley_flow::FlowReply;
use parley_query::QueryExpression;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Prompt, status line or capability hint.
    Text(String),
    /// A query was requested without naming a data context.
    ChooseContext {
        message: String,
        available_contexts: Vec<String>,
    },
    /// A compiled query and its rendered form.
    Query {
        query: QueryExpression,
        rendered: String,
    },
    ContractStarted {
        message: String,
        deal_id: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error { .. })
    }
}

impl From<FlowReply> for Reply {
    fn from(reply: FlowReply) -> Self {
        match reply {
            FlowReply::Message(text) => Reply::Text(text),
            FlowReply::ContractStarted { message, deal_id } => {
                Reply::ContractStarted { message, deal_id }
            }
            FlowReply::Failed { error, category } => Reply::Error {
                error,
                category: Some(category.to_string()),
            },
        }
    }
}
