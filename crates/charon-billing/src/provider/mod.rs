//! Payment provider boundary.

pub mod simulated;

pub use simulated::SimulatedPaymentProvider;

use crate::domain::types::{Currency, CustomerId, Invoice};
use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a charge attempt. `Network` is transient and
/// retried by the pipeline; the other variants are permanent for the
/// invoice and map to one terminal status each.
#[derive(Debug, Error)]
pub enum ChargeError {
    #[error("network failure reaching payment provider: {0}")]
    Network(String),

    #[error("invoice currency {invoice} does not match customer account currency {customer}")]
    CurrencyMismatch {
        invoice: Currency,
        customer: Currency,
    },

    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),
}

/// External capability that charges a customer for an invoice.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Returns `Ok(true)` when the customer account was charged the
    /// invoice amount, `Ok(false)` when the provider declined the
    /// charge (insufficient balance).
    async fn charge(&self, invoice: &Invoice) -> Result<bool, ChargeError>;
}
