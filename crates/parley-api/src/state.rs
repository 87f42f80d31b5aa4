//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_chat::Dispatcher;
use parley_core::ParleyConfig;
use parley_flow::{DealClient, FlowEngine};
use parley_storage::{ContractRepository, Database, SessionRepository};

/// Shared application state. All fields are `Arc`s or cheap clones.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ParleyConfig>,
    pub database: Arc<Database>,
    pub contracts: ContractRepository,
    pub dispatcher: Arc<Dispatcher>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire repositories, flow engine and dispatcher over one database.
    pub fn new(config: ParleyConfig, database: Database, crm: Arc<dyn DealClient>) -> Self {
        let database = Arc::new(database);
        let contracts = ContractRepository::new(database.clone());
        let engine = FlowEngine::new(
            contracts.clone(),
            crm,
            Duration::from_secs(config.crm.timeout_secs),
        );
        let dispatcher = Dispatcher::new(SessionRepository::new(database.clone()), engine, &config);

        Self {
            config: Arc::new(config),
            database,
            contracts,
            dispatcher: Arc::new(dispatcher),
            start_time: Instant::now(),
        }
    }
}
