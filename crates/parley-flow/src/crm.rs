//! External deal system.
//!
//! Flows finish by pushing the collected contract to a CRM. [`HubSpotClient`]
//! talks to the HubSpot CRM v3 objects API; [`MockDealClient`] keeps
//! everything in memory for tests and for running without credentials.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::config::CrmConfig;
use parley_core::ContractFields;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CrmError;

/// Acknowledgement of a created deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealReceipt {
    pub deal_id: String,
}

/// A remote deal system. Calls may fail; callers decide what failure means.
#[async_trait]
pub trait DealClient: Send + Sync {
    /// Create a deal for a newly collected contract.
    async fn create_deal(&self, fields: &ContractFields) -> Result<DealReceipt, CrmError>;

    /// Push a changed phone number to the deal created for a contract.
    async fn update_phone(&self, deal_id: &str, phone: &str) -> Result<(), CrmError>;
}

// =============================================================================
// HubSpot
// =============================================================================

/// HubSpot CRM client authenticated with a private-app bearer token.
pub struct HubSpotClient {
    client: Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct CrmObject {
    id: String,
}

impl HubSpotClient {
    pub fn new(config: &CrmConfig) -> Result<Self, CrmError> {
        let api_token = config
            .api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CrmError::NotConfigured("crm.api_token is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn deals_url(&self) -> String {
        format!("{}/crm/v3/objects/deals", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CrmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }
}

/// 4xx answers mean the CRM refused this request (bad id, bad payload,
/// bad token); anything else is reported with its raw status.
fn status_error(status: StatusCode, body: String) -> CrmError {
    if status.is_client_error() {
        CrmError::Rejected(format!("{}: {}", status, body))
    } else {
        CrmError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl DealClient for HubSpotClient {
    async fn create_deal(&self, fields: &ContractFields) -> Result<DealReceipt, CrmError> {
        let body = json!({
            "properties": {
                "dealname": format!("Contract - {}", fields.name),
                "pipeline": "default",
                "dealstage": "appointmentscheduled",
                "email": fields.email,
                "phone": fields.phone,
                "address": fields.address,
            }
        });

        let response = self
            .client
            .post(self.deals_url())
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;
        let object: CrmObject = Self::check(response).await?.json().await?;

        tracing::info!(deal_id = %object.id, "CRM deal created");
        Ok(DealReceipt { deal_id: object.id })
    }

    async fn update_phone(&self, deal_id: &str, phone: &str) -> Result<(), CrmError> {
        let url = format!("{}/{}", self.deals_url(), deal_id);
        let body = json!({ "properties": { "phone": phone } });

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        tracing::info!(deal_id, "CRM phone updated");
        Ok(())
    }
}

// =============================================================================
// In-memory mock
// =============================================================================

/// In-memory deal system issuing sequential `mock-deal-N` ids.
#[derive(Default)]
pub struct MockDealClient {
    next_id: AtomicU64,
    failing: AtomicBool,
    delay: Option<Duration>,
    deals: Mutex<Vec<ContractFields>>,
    phone_updates: Mutex<Vec<(String, String)>>,
}

impl MockDealClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that sleeps before answering each call.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Contracts received by `create_deal`, in call order.
    pub fn deals(&self) -> Vec<ContractFields> {
        self.deals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// `(deal_id, phone)` pairs received by `update_phone`.
    pub fn phone_updates(&self) -> Vec<(String, String)> {
        self.phone_updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn respond(&self) -> Result<(), CrmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CrmError::Rejected("mock deal system is failing".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DealClient for MockDealClient {
    async fn create_deal(&self, fields: &ContractFields) -> Result<DealReceipt, CrmError> {
        self.respond().await?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.deals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(fields.clone());
        Ok(DealReceipt {
            deal_id: format!("mock-deal-{}", n),
        })
    }

    async fn update_phone(&self, deal_id: &str, phone: &str) -> Result<(), CrmError> {
        self.respond().await?;
        self.phone_updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((deal_id.to_string(), phone.to_string()));
        Ok(())
    }
}
