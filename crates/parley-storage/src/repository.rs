//! Repository implementations for SQLite-backed persistence.
//!
//! `SessionRepository` owns the `chat_sessions` table and `ContractRepository`
//! the `contracts` table. Both operate on a shared [`Database`] using raw SQL.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::{debug, warn};

use parley_core::error::ParleyError;
use parley_core::types::{
    ChatSession, Contract, ContractFields, ContractStatus, FlowAction, FlowData, StepId,
};

use crate::db::Database;

/// Repository for chat session state.
#[derive(Clone)]
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find a session by its caller-supplied id.
    pub fn find_by_external_id(&self, session_id: &str) -> Result<Option<ChatSession>, ParleyError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, session_id, action, step, data, created_at, updated_at
                     FROM chat_sessions WHERE session_id = ?1",
                    rusqlite::params![session_id],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            session_id: row.get(1)?,
                            action: row.get(2)?,
                            step: row.get(3)?,
                            data: row.get(4)?,
                            created_at: row.get(5)?,
                            updated_at: row.get(6)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| ParleyError::Storage(e.to_string()))?;
            Ok(row.map(SessionRow::into_session))
        })
    }

    /// Insert a fresh idle session.
    pub fn insert(&self, session_id: &str) -> Result<ChatSession, ParleyError> {
        let now = Utc::now();
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_sessions (session_id, action, step, data, created_at, updated_at)
                 VALUES (?1, NULL, NULL, '{}', ?2, ?2)",
                rusqlite::params![session_id, now.timestamp()],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to insert session: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!(session_id, row_id = id, "Chat session created");

        Ok(ChatSession {
            id,
            session_id: session_id.to_string(),
            action: None,
            step: None,
            data: FlowData::new(),
            created_at: from_timestamp(now.timestamp()),
            updated_at: from_timestamp(now.timestamp()),
        })
    }

    /// Persist action, step and data of a session in a single statement.
    pub fn update(&self, session: &mut ChatSession) -> Result<(), ParleyError> {
        let data = serde_json::to_string(&session.data)?;
        let now = Utc::now();
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_sessions SET action = ?1, step = ?2, data = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![
                    session.action.map(|a| a.to_string()),
                    session.step.map(|s| s.to_string()),
                    data,
                    now.timestamp(),
                    session.id,
                ],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to update session: {}", e)))
        })?;

        if changed == 0 {
            return Err(ParleyError::Storage(format!(
                "Session row {} does not exist",
                session.id
            )));
        }
        session.updated_at = from_timestamp(now.timestamp());
        Ok(())
    }

    /// Fetch a session by external id, creating an idle one if absent.
    pub fn get_or_create(&self, session_id: &str) -> Result<ChatSession, ParleyError> {
        match self.find_by_external_id(session_id)? {
            Some(session) => Ok(session),
            None => self.insert(session_id),
        }
    }
}

/// Raw `chat_sessions` row before enum parsing.
struct SessionRow {
    id: i64,
    session_id: String,
    action: Option<String>,
    step: Option<String>,
    data: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl SessionRow {
    /// Convert to a domain session. Unparseable action/step values and
    /// missing data are normalized to an idle, empty session.
    fn into_session(self) -> ChatSession {
        let action = self.action.as_deref().and_then(|a| match a.parse::<FlowAction>() {
            Ok(action) => Some(action),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Discarding stored action");
                None
            }
        });
        let step = self.step.as_deref().and_then(|s| match s.parse::<StepId>() {
            Ok(step) => Some(step),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Discarding stored step");
                None
            }
        });
        let data = match self.data.as_deref() {
            None | Some("") => FlowData::new(),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!(session_id = %self.session_id, error = %e, "Discarding unreadable session data");
                FlowData::new()
            }),
        };

        // A half-set (action, step) pair cannot be resumed.
        let (action, step) = match (action, step) {
            (Some(a), Some(s)) => (Some(a), Some(s)),
            _ => (None, None),
        };

        ChatSession {
            id: self.id,
            session_id: self.session_id,
            action,
            step,
            data,
            created_at: from_timestamp(self.created_at),
            updated_at: from_timestamp(self.updated_at),
        }
    }
}

/// Repository for contracts created by the contract flow.
#[derive(Clone)]
pub struct ContractRepository {
    db: Arc<Database>,
}

impl ContractRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new `PENDING` contract.
    pub fn insert(
        &self,
        session_ref: Option<i64>,
        fields: &ContractFields,
    ) -> Result<Contract, ParleyError> {
        let now = Utc::now().timestamp();
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contracts (session_ref, email, name, phone, address, status, deal_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7)",
                rusqlite::params![
                    session_ref,
                    fields.email,
                    fields.name,
                    fields.phone,
                    fields.address,
                    ContractStatus::Pending.to_string(),
                    now,
                ],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to insert contract: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Contract {
            id,
            session_ref,
            fields: fields.clone(),
            status: ContractStatus::Pending,
            deal_id: None,
            created_at: from_timestamp(now),
            updated_at: from_timestamp(now),
        })
    }

    /// Persist every mutable column of a contract.
    pub fn update(&self, contract: &mut Contract) -> Result<(), ParleyError> {
        let now = Utc::now().timestamp();
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE contracts SET email = ?1, name = ?2, phone = ?3, address = ?4,
                     status = ?5, deal_id = ?6, updated_at = ?7
                 WHERE id = ?8",
                rusqlite::params![
                    contract.fields.email,
                    contract.fields.name,
                    contract.fields.phone,
                    contract.fields.address,
                    contract.status.to_string(),
                    contract.deal_id,
                    now,
                    contract.id,
                ],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to update contract: {}", e)))
        })?;

        if changed == 0 {
            return Err(ParleyError::Storage(format!(
                "Contract {} does not exist",
                contract.id
            )));
        }
        contract.updated_at = from_timestamp(now);
        Ok(())
    }

    /// Find a contract by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Contract>, ParleyError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, session_ref, email, name, phone, address, status, deal_id, created_at, updated_at
                     FROM contracts WHERE id = ?1",
                    rusqlite::params![id],
                    |row| Ok(row_to_contract(row)),
                )
                .optional()
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            match result {
                Some(contract) => Ok(Some(contract?)),
                None => Ok(None),
            }
        })
    }

    /// Count all contracts.
    pub fn count(&self) -> Result<u64, ParleyError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM contracts", [], |row| row.get(0))
                .map_err(|e| ParleyError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn row_to_contract(row: &rusqlite::Row<'_>) -> Result<Contract, ParleyError> {
    let get_err = |e: rusqlite::Error| ParleyError::Storage(e.to_string());

    let status_str: String = row.get(6).map_err(get_err)?;
    let status = status_str
        .parse::<ContractStatus>()
        .map_err(ParleyError::Storage)?;

    Ok(Contract {
        id: row.get(0).map_err(get_err)?,
        session_ref: row.get(1).map_err(get_err)?,
        fields: ContractFields {
            email: row.get(2).map_err(get_err)?,
            name: row.get(3).map_err(get_err)?,
            phone: row.get(4).map_err(get_err)?,
            address: row.get(5).map_err(get_err)?,
        },
        status,
        deal_id: row.get(7).map_err(get_err)?,
        created_at: from_timestamp(row.get(8).map_err(get_err)?),
        updated_at: from_timestamp(row.get(9).map_err(get_err)?),
    })
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
