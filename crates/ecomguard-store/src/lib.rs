//! Persistence layer: the order/evidence writes behind a submission.

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryStore;

mod rest;
pub use rest::{RestConfig, RestStore};

use async_trait::async_trait;
use ecomguard_core::{NewEvidence, NewOrder, Order};

/// Backend that records orders and their packing evidence.
///
/// The two writes are independent calls; callers create the order first and
/// only then the evidence that references it.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn create_evidence(&self, evidence: NewEvidence) -> Result<(), StoreError>;
}
