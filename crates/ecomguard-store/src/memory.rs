//! In-memory backend for offline runs (`--dry-run`) and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use ecomguard_core::{NewEvidence, NewOrder, Order};
use tracing::info;

use crate::{EvidenceStore, StoreError};

/// Keeps inserted rows in memory. Order ids are `order-1`, `order-2`, ...
#[derive(Default)]
pub struct MemoryStore {
    orders: Mutex<Vec<Order>>,
    evidences: Mutex<Vec<NewEvidence>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn evidences(&self) -> Vec<NewEvidence> {
        self.evidences.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Other("memory store lock poisoned".to_string())
}

#[async_trait]
impl EvidenceStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut orders = self.orders.lock().map_err(poisoned)?;
        let row = Order {
            id: format!("order-{}", orders.len() + 1),
            seller_id: order.seller_id,
            tracking_number: order.tracking_number,
            status: order.status,
            created_at: Some(Utc::now().to_rfc3339()),
        };
        info!(order_id = %row.id, tracking_number = %row.tracking_number, "order stored in memory");
        orders.push(row.clone());
        Ok(row)
    }

    async fn create_evidence(&self, evidence: NewEvidence) -> Result<(), StoreError> {
        let known = self
            .orders
            .lock()
            .map_err(poisoned)?
            .iter()
            .any(|o| o.id == evidence.order_id);
        if !known {
            return Err(StoreError::Server {
                status: 409,
                body: format!("order {} does not exist", evidence.order_id),
            });
        }
        self.evidences.lock().map_err(poisoned)?.push(evidence);
        Ok(())
    }
}
