use crate::store::StoreError;
use thiserror::Error;

/// Errors that abort a batch run. Per-invoice charge failures never
/// surface here; they are classified into an `InvoiceStatus` at the
/// single-invoice boundary.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("general error: {0}")]
    General(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BillingError>;
