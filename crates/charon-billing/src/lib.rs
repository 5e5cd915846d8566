//! Charon billing engine.
//!
//! Once per calendar month the scheduler triggers a batch run: every
//! pending invoice is charged through the external payment provider,
//! the outcome is classified into a terminal or retryable status, and
//! the status is written back through the invoice store. Transient
//! network failures are retried with a backoff derived from a
//! throttle level shared across all concurrently processed invoices.
//!
//! Exactly-once delivery to the provider is a non-goal: the window
//! between a successful charge and the status write is accepted and
//! left to out-of-band reconciliation.

pub mod config;
pub mod domain;
pub mod error;
pub mod processor;
pub mod provider;
pub mod scheduler;
pub mod store;
pub mod throttle;

pub use config::BillingConfig;
pub use error::{BillingError, Result};
