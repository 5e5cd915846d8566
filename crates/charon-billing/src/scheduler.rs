//! Monthly cycle scheduler.
//!
//! Billing fires at 01:00 on the 1st of each month in the configured
//! zone. The gap between consecutive firsts of the month is not
//! constant, so each cycle computes and arms the next instant instead
//! of using a fixed-period timer.

use crate::error::Result;
use crate::processor::BatchProcessor;
use crate::provider::PaymentProvider;
use crate::store::InvoiceStore;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info};

const BILLING_HOUR: u32 = 1;

/// The next first-of-month billing instant strictly after `now`:
/// 01:00 local time on the 1st of the following month.
pub fn next_billing_instant(now: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    let local = now.with_timezone(&tz);
    let (year, month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };

    let mut hour = BILLING_HOUR;
    loop {
        if let Some(instant) = tz.with_ymd_and_hms(year, month, 1, hour, 0, 0).earliest() {
            return instant;
        }
        // 01:00 fell into a DST gap; take the next existing hour.
        hour += 1;
    }
}

pub struct BillingScheduler<P, S> {
    processor: Arc<BatchProcessor<P, S>>,
    tz: Tz,
}

impl<P, S> BillingScheduler<P, S>
where
    P: PaymentProvider + 'static,
    S: InvoiceStore + 'static,
{
    pub fn new(processor: Arc<BatchProcessor<P, S>>, tz: Tz) -> Self {
        Self { processor, tz }
    }

    /// Arm the first cycle and keep re-arming after each run. A
    /// failed cycle is logged and the next one is still scheduled.
    pub async fn run(self) -> Result<()> {
        loop {
            let now = Utc::now();
            let next = next_billing_instant(now, self.tz);
            let wait = (next.with_timezone(&Utc) - now)
                .to_std()
                .unwrap_or_default();
            info!(next = %next, "armed next billing cycle");

            sleep(wait).await;

            info!("billing cycle fired");
            match self.processor.run_pending().await {
                Ok(outcome) => info!(
                    processed = outcome.processed,
                    failed = outcome.failed,
                    "billing cycle complete"
                ),
                Err(e) => error!(err = %e, "billing cycle aborted"),
            }
        }
    }
}
