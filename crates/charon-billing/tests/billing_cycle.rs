//! End-to-end billing cycle tests: scripted provider outcomes fanned
//! out by the batch processor, final statuses checked in the store.

use charon_billing::config::BillingConfig;
use charon_billing::domain::types::{
    Currency, CustomerId, Invoice, InvoiceId, InvoiceStatus, Money,
};
use charon_billing::processor::{BatchOutcome, BatchProcessor};
use charon_billing::provider::{ChargeError, PaymentProvider};
use charon_billing::store::{InvoiceStore, MemoryInvoiceStore};
use charon_billing::throttle::ThrottleController;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Charged,
    Declined,
    Network,
    CurrencyMismatch,
    CustomerMissing,
}

/// Provider that replays a per-invoice outcome script and counts
/// charge attempts. Invoices without a script are charged.
#[derive(Default)]
struct ScriptedProvider {
    scripts: Mutex<HashMap<InvoiceId, VecDeque<Outcome>>>,
    attempts: Mutex<HashMap<InvoiceId, u32>>,
    total_calls: AtomicU32,
}

impl ScriptedProvider {
    fn script(&self, id: InvoiceId, outcomes: &[Outcome]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(id, outcomes.iter().copied().collect());
    }

    fn attempts_for(&self, id: InvoiceId) -> u32 {
        self.attempts.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, ChargeError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(invoice.id)
            .or_insert(0) += 1;

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&invoice.id)
            .and_then(|script| script.pop_front())
            .unwrap_or(Outcome::Charged);

        match outcome {
            Outcome::Charged => Ok(true),
            Outcome::Declined => Ok(false),
            Outcome::Network => Err(ChargeError::Network("connection timed out".to_string())),
            Outcome::CurrencyMismatch => Err(ChargeError::CurrencyMismatch {
                invoice: invoice.amount.currency,
                customer: Currency::Sek,
            }),
            Outcome::CustomerMissing => Err(ChargeError::CustomerNotFound(invoice.customer_id)),
        }
    }
}

fn pending_invoice() -> Invoice {
    Invoice::new(CustomerId::new(), Money::new(dec!(120.00), Currency::Eur))
}

fn processor(
    provider: Arc<ScriptedProvider>,
    store: Arc<MemoryInvoiceStore>,
) -> BatchProcessor<ScriptedProvider, MemoryInvoiceStore> {
    let config = BillingConfig::default();
    BatchProcessor::new(
        provider,
        store,
        Arc::new(ThrottleController::default()),
        &config.processor,
    )
}

#[tokio::test(start_paused = true)]
async fn mixed_outcomes_classify_deterministically() {
    let store = Arc::new(MemoryInvoiceStore::new());
    let provider = Arc::new(ScriptedProvider::default());

    let missing = pending_invoice();
    let mismatched = pending_invoice();
    let unreachable = pending_invoice();
    provider.script(missing.id, &[Outcome::CustomerMissing]);
    provider.script(mismatched.id, &[Outcome::CurrencyMismatch]);
    provider.script(unreachable.id, &[Outcome::Network; 4]);

    for invoice in [&missing, &mismatched, &unreachable] {
        store.insert(invoice.clone()).await;
    }

    let processor = processor(provider.clone(), store.clone());
    let outcome = processor.run_pending().await.unwrap();

    assert_eq!(
        outcome,
        BatchOutcome {
            processed: 3,
            failed: 3
        }
    );
    assert_eq!(
        store.get(missing.id).await.unwrap().status,
        InvoiceStatus::FailedNoCustomer
    );
    assert_eq!(
        store.get(mismatched.id).await.unwrap().status,
        InvoiceStatus::FailedCurrency
    );
    assert_eq!(
        store.get(unreachable.id).await.unwrap().status,
        InvoiceStatus::ToRetry
    );
}

#[tokio::test(start_paused = true)]
async fn permanent_failures_are_never_retried() {
    let store = Arc::new(MemoryInvoiceStore::new());
    let provider = Arc::new(ScriptedProvider::default());

    let missing = pending_invoice();
    let mismatched = pending_invoice();
    provider.script(missing.id, &[Outcome::CustomerMissing]);
    provider.script(mismatched.id, &[Outcome::CurrencyMismatch]);
    store.insert(missing.clone()).await;
    store.insert(mismatched.clone()).await;

    let processor = processor(provider.clone(), store.clone());
    processor.run_pending().await.unwrap();

    assert_eq!(provider.attempts_for(missing.id), 1);
    assert_eq!(provider.attempts_for(mismatched.id), 1);
}

#[tokio::test(start_paused = true)]
async fn network_failure_consumes_configured_retries() {
    let store = Arc::new(MemoryInvoiceStore::new());
    let provider = Arc::new(ScriptedProvider::default());

    let unreachable = pending_invoice();
    provider.script(unreachable.id, &[Outcome::Network; 16]);
    store.insert(unreachable.clone()).await;

    let config = BillingConfig::default();
    let processor = processor(provider.clone(), store.clone());
    processor.run_pending().await.unwrap();

    // One initial attempt plus max_retries retries.
    assert_eq!(
        provider.attempts_for(unreachable.id),
        config.processor.max_retries + 1
    );
    assert_eq!(
        store.get(unreachable.id).await.unwrap().status,
        InvoiceStatus::ToRetry
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn hundred_invoice_batch_all_paid() {
    let store = Arc::new(MemoryInvoiceStore::new());
    let provider = Arc::new(ScriptedProvider::default());

    let mut ids = Vec::new();
    for _ in 0..100 {
        let invoice = pending_invoice();
        ids.push(invoice.id);
        store.insert(invoice).await;
    }

    let processor = processor(provider.clone(), store.clone());
    let outcome = processor.run_pending().await.unwrap();

    assert_eq!(
        outcome,
        BatchOutcome {
            processed: 100,
            failed: 0
        }
    );
    assert_eq!(provider.total_calls(), 100);
    for id in ids {
        assert_eq!(store.get(id).await.unwrap().status, InvoiceStatus::Paid);
    }
}

#[tokio::test(start_paused = true)]
async fn terminal_invoices_are_not_refetched() {
    let store = Arc::new(MemoryInvoiceStore::new());
    let provider = Arc::new(ScriptedProvider::default());

    let declined = pending_invoice();
    provider.script(declined.id, &[Outcome::Declined]);
    store.insert(declined.clone()).await;
    store.insert(pending_invoice()).await;

    let processor = processor(provider.clone(), store.clone());
    processor.run_pending().await.unwrap();

    // Everything ended terminal; a second cycle finds nothing.
    let second = processor.run_pending().await.unwrap();
    assert_eq!(
        second,
        BatchOutcome {
            processed: 0,
            failed: 0
        }
    );
    assert_eq!(
        store.get(declined.id).await.unwrap().status,
        InvoiceStatus::FailedNoBalance
    );
}

#[tokio::test(start_paused = true)]
async fn retry_pass_picks_up_deferred_invoices_only() {
    let store = Arc::new(MemoryInvoiceStore::new());
    let provider = Arc::new(ScriptedProvider::default());

    let deferred = pending_invoice();
    provider.script(deferred.id, &[Outcome::Network; 4]);
    store.insert(deferred.clone()).await;

    let processor = processor(provider.clone(), store.clone());
    processor.run_pending().await.unwrap();
    assert_eq!(
        store.get(deferred.id).await.unwrap().status,
        InvoiceStatus::ToRetry
    );

    // The network recovered; the dedicated retry pass charges it.
    let outcome = processor.run_retry().await.unwrap();
    assert_eq!(
        outcome,
        BatchOutcome {
            processed: 1,
            failed: 0
        }
    );
    assert_eq!(
        store.get(deferred.id).await.unwrap().status,
        InvoiceStatus::Paid
    );

    // And nothing is left for either entry point.
    assert!(store.fetch_pending().await.unwrap().is_empty());
    assert!(store.fetch_retry().await.unwrap().is_empty());
}
