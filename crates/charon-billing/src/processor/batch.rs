//! Fans the charge pipeline out over a batch of invoices.
//!
//! Invoices are dispatched in batch order; completion order is
//! unordered. Submission is paced by the shared throttle's current
//! delay, and a semaphore bounds how many charges are in flight at
//! once. Each task persists its invoice's final status as soon as
//! the pipeline classifies it; a crash between charging and
//! persisting can leave an invoice charged but unmarked, which an
//! out-of-band reconciliation against provider records has to close.

use crate::config::ProcessorConfig;
use crate::domain::types::{Invoice, InvoiceStatus};
use crate::error::Result;
use crate::processor::pipeline::charge_invoice;
use crate::provider::PaymentProvider;
use crate::store::InvoiceStore;
use crate::throttle::ThrottleController;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: u64,
    pub failed: u64,
}

pub struct BatchProcessor<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
    throttle: Arc<ThrottleController>,
    limiter: Arc<Semaphore>,
    max_retries: u32,
    // Lifetime count of invoices not left paid. Advisory, read for
    // logging only, so relaxed ordering is enough.
    failed_total: Arc<AtomicU64>,
}

impl<P, S> BatchProcessor<P, S>
where
    P: PaymentProvider + 'static,
    S: InvoiceStore + 'static,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        throttle: Arc<ThrottleController>,
        config: &ProcessorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            throttle,
            limiter: Arc::new(Semaphore::new(config.max_in_flight)),
            max_retries: config.max_retries,
            failed_total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// One billing cycle over all pending invoices.
    pub async fn run_pending(&self) -> Result<BatchOutcome> {
        let invoices = self.store.fetch_pending().await?;
        Ok(self.process(invoices).await)
    }

    /// Separately triggered pass over invoices deferred by earlier
    /// cycles.
    pub async fn run_retry(&self) -> Result<BatchOutcome> {
        let invoices = self.store.fetch_retry().await?;
        Ok(self.process(invoices).await)
    }

    async fn process(&self, invoices: Vec<Invoice>) -> BatchOutcome {
        let processed = invoices.len() as u64;
        let failed_before = self.failed_total.load(Ordering::Relaxed);
        info!(count = processed, "started processing invoice batch");

        let mut tasks = JoinSet::new();
        for mut invoice in invoices {
            let permit = self
                .limiter
                .clone()
                .acquire_owned()
                .await
                .expect("charge limiter semaphore closed");
            let provider = Arc::clone(&self.provider);
            let store = Arc::clone(&self.store);
            let throttle = Arc::clone(&self.throttle);
            let failed_total = Arc::clone(&self.failed_total);
            let max_retries = self.max_retries;

            tasks.spawn(async move {
                let _permit = permit;
                let status =
                    charge_invoice(provider.as_ref(), throttle.as_ref(), &mut invoice, max_retries)
                        .await;
                if status != InvoiceStatus::Paid {
                    failed_total.fetch_add(1, Ordering::Relaxed);
                }
                if let Err(e) = store.update_status(&invoice).await {
                    error!(invoice_id = %invoice.id, err = %e, "failed to persist invoice status");
                }
            });

            // Pace submissions; per-retry backoff inside the pipeline
            // is separate from this.
            sleep(self.throttle.current_delay()).await;
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(err = %e, "charge task failed to complete");
            }
        }

        let failed = self.failed_total.load(Ordering::Relaxed) - failed_before;
        info!(processed, failed, "finished processing invoice batch");
        BatchOutcome { processed, failed }
    }
}
