//! Supabase (PostgREST) backend for the `orders` and `evidences` tables.

use async_trait::async_trait;
use ecomguard_core::{NewEvidence, NewOrder, Order};
use serde::Serialize;
use tracing::info;

use crate::{EvidenceStore, StoreError};

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL like `https://xyz.supabase.co` (no trailing slash needed).
    pub url: String,
    /// Public anon key, sent as `apikey`.
    pub anon_key: String,
    /// Signed-in user's JWT. Row-level security policies see the anon role
    /// when absent.
    pub access_token: Option<String>,
}

/// PostgREST client for the evidence tables.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    bearer: String,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Self {
        let bearer = config
            .access_token
            .unwrap_or_else(|| config.anon_key.clone());
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            anon_key: config.anon_key,
            bearer,
        }
    }

    fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> reqwest::RequestBuilder {
        let url = format!("{}/{table}", self.base_url);
        self.client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.bearer)
            .json(row)
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(StoreError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl EvidenceStore for RestStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        info!(tracking_number = %order.tracking_number, "inserting order");
        let resp = self
            .insert("orders", &[&order])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let body = check(resp).await?.text().await?;
        let rows: Vec<Order> = serde_json::from_str(&body)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyResponse("orders"))?;
        info!(order_id = %row.id, "order created");
        Ok(row)
    }

    async fn create_evidence(&self, evidence: NewEvidence) -> Result<(), StoreError> {
        info!(order_id = %evidence.order_id, kind = %evidence.kind, "inserting evidence");
        let resp = self
            .insert("evidences", &[&evidence])
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}
