//! Intent dispatcher.
//!
//! In-step sessions go straight to the flow engine. Idle sessions are
//! classified by a fixed, first-match-wins rule list: flow starts, then query
//! keywords, then the capability hint.

use std::sync::LazyLock;

use parley_core::config::QueryRenderer;
use parley_core::{FlowAction, ParleyConfig};
use parley_flow::{FlowEngine, FlowReply};
use parley_query::{render, QueryCompiler, QueryError, QueryExpression};
use parley_storage::SessionRepository;
use regex::Regex;
use tracing::{debug, error, info};

use crate::error::ChatError;
use crate::reply::Reply;
use crate::session::SessionStore;

pub const CHOOSE_CONTEXT: &str = "Please specify data context";
pub const UNRECOGNIZED: &str =
    "I can help start a contract, update phone, or create data filters.";

/// What an idle session's message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIntent {
    StartFlow(FlowAction),
    Query,
    Unrecognized,
}

static INTENT_RULES: LazyLock<Vec<(Regex, ChatIntent)>> = LazyLock::new(|| {
    let rule = |pattern: &str, intent| {
        (
            Regex::new(pattern).expect("Invalid intent regex"),
            intent,
        )
    };
    vec![
        rule(
            r"\b(?:start|new|create|open)\s+(?:a\s+|my\s+)?contract\b",
            ChatIntent::StartFlow(FlowAction::StartContract),
        ),
        rule(
            r"\b(?:update|change)\s+(?:a\s+|my\s+|the\s+)?phone\b",
            ChatIntent::StartFlow(FlowAction::UpdatePhone),
        ),
        rule(
            r"\b(?:filter|query|show|list|find|get|count|how\s+many|max|maximum|highest|min|minimum|lowest|average|avg|mean|greater|less|more\s+than|above|below|at\s+least|at\s+most|equals?|is|between|contains?|like|sort|sorted|order|ordered|desc|descending|where|update|set|change|modify)\b|[<>=]",
            ChatIntent::Query,
        ),
    ]
});

/// Classify a message from an idle session.
pub fn classify(message: &str) -> ChatIntent {
    let text = message.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, intent)| *intent)
        .unwrap_or(ChatIntent::Unrecognized)
}

pub struct Dispatcher {
    sessions: SessionStore,
    engine: FlowEngine,
    compiler: QueryCompiler<'static>,
    renderer: QueryRenderer,
    max_message_length: usize,
}

impl Dispatcher {
    pub fn new(sessions: SessionRepository, engine: FlowEngine, config: &ParleyConfig) -> Self {
        Self {
            sessions: SessionStore::new(sessions),
            engine,
            compiler: QueryCompiler::new(),
            renderer: config.query.renderer,
            max_message_length: config.chat.max_message_length,
        }
    }

    /// Handle one chat message for `session_id`.
    pub async fn handle(
        &self,
        session_id: &str,
        message: &str,
        context: Option<&str>,
    ) -> Result<Reply, ChatError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ChatError::MissingSessionId);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let _guard = self.sessions.lock(session_id).await;
        let mut session = self.sessions.get_or_create(session_id)?;

        if session.in_step().is_some() {
            let reply = self.engine.advance(&mut session, message).await;
            if let Err(e) = self.sessions.save(&mut session) {
                // The stored session still sits on the last step, so a retry
                // would submit the contract a second time.
                if let FlowReply::ContractStarted { deal_id, .. } = &reply {
                    error!(session_id, %deal_id, error = %e, "Deal created but session not saved");
                    return Err(ChatError::StorageError(format!(
                        "{} (deal {} was already created)",
                        e, deal_id
                    )));
                }
                return Err(e.into());
            }
            return Ok(reply.into());
        }

        let intent = classify(message);
        debug!(session_id, ?intent, "Message classified");

        match intent {
            ChatIntent::StartFlow(action) => {
                let prompt = self.engine.start(&mut session, action);
                self.sessions.save(&mut session)?;
                Ok(Reply::Text(prompt))
            }
            ChatIntent::Query => Ok(self.query(context, message)),
            ChatIntent::Unrecognized => Ok(Reply::text(UNRECOGNIZED)),
        }
    }

    /// Compile a chat query, asking for a context when none was given.
    pub fn query(&self, context: Option<&str>, message: &str) -> Reply {
        let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) else {
            return Reply::ChooseContext {
                message: CHOOSE_CONTEXT.to_string(),
                available_contexts: self.contexts(),
            };
        };

        match self.compile(context, message) {
            Ok((query, rendered)) => Reply::Query { query, rendered },
            Err(e) => Reply::Error {
                error: e.to_string(),
                category: None,
            },
        }
    }

    /// Compile and render without touching any session.
    pub fn compile(
        &self,
        context: &str,
        utterance: &str,
    ) -> Result<(QueryExpression, String), QueryError> {
        let query = self.compiler.compile(context, utterance)?;
        let rendered = render(&query, self.renderer);
        info!(context, operation = query.operation(), "Query compiled");
        Ok((query, rendered))
    }

    /// Registered data context names.
    pub fn contexts(&self) -> Vec<String> {
        self.compiler
            .catalog()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
