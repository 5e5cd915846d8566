//! Single-invoice charge pipeline.
//!
//! Every provider outcome is classified into an `InvoiceStatus` here;
//! no charge failure escapes this boundary. Network failures are the
//! one transient case: they are retried up to `max_retries` times,
//! sleeping the shared throttle's current delay before each retry so
//! that consecutive failures escalate the wait both within one
//! invoice and across concurrently processed ones.

use crate::domain::types::{Invoice, InvoiceStatus};
use crate::provider::{ChargeError, PaymentProvider};
use crate::throttle::ThrottleController;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Charge one invoice and classify the outcome. Mutates
/// `invoice.status` in place and returns the final status, which is
/// never `Pending`. Persistence is the caller's job.
pub async fn charge_invoice<P>(
    provider: &P,
    throttle: &ThrottleController,
    invoice: &mut Invoice,
    max_retries: u32,
) -> InvoiceStatus
where
    P: PaymentProvider + ?Sized,
{
    let mut retries_left = max_retries;

    loop {
        match provider.charge(invoice).await {
            Ok(true) => {
                invoice.status = InvoiceStatus::Paid;
                throttle.on_success();
            }
            Ok(false) => {
                // The provider answered, so the network is healthy;
                // only the customer balance was short.
                invoice.status = InvoiceStatus::FailedNoBalance;
                throttle.on_success();
            }
            Err(ChargeError::Network(reason)) => {
                throttle.on_failure();
                if retries_left > 0 {
                    retries_left -= 1;
                    debug!(
                        invoice_id = %invoice.id,
                        retries_left,
                        reason = %reason,
                        "network failure, backing off before retry"
                    );
                    sleep(throttle.current_delay()).await;
                    continue;
                }
                invoice.status = InvoiceStatus::ToRetry;
                warn!(
                    invoice_id = %invoice.id,
                    "immediate retries exhausted, deferring invoice to a later cycle"
                );
            }
            Err(ChargeError::CurrencyMismatch { invoice: currency, .. }) => {
                invoice.status = InvoiceStatus::FailedCurrency;
                error!(
                    invoice_id = %invoice.id,
                    %currency,
                    customer_id = %invoice.customer_id,
                    "currency mismatch on invoice"
                );
            }
            Err(ChargeError::CustomerNotFound(customer_id)) => {
                invoice.status = InvoiceStatus::FailedNoCustomer;
                error!(%customer_id, "customer not found");
            }
        }
        return invoice.status;
    }
}
