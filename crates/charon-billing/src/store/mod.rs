//! Invoice store boundary.

pub mod memory;

pub use memory::MemoryInvoiceStore;

use crate::domain::types::{Invoice, InvoiceId};
use async_trait::async_trait;
use thiserror::Error;

/// Store failures are contract errors: they abort the batch run and
/// propagate to the caller instead of being classified per invoice.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invoice store unavailable: {0}")]
    Unavailable(String),

    #[error("invoice {0} not found")]
    InvoiceNotFound(InvoiceId),
}

/// Durable invoice storage consumed by the batch processor.
///
/// Fetch contract: `fetch_pending` returns only `Pending` invoices
/// and `fetch_retry` only `ToRetry` ones, so terminal statuses are
/// never re-fed to the charge pipeline.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn fetch_pending(&self) -> Result<Vec<Invoice>, StoreError>;

    async fn fetch_retry(&self) -> Result<Vec<Invoice>, StoreError>;

    async fn update_status(&self, invoice: &Invoice) -> Result<(), StoreError>;
}
