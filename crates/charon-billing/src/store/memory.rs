//! In-memory invoice store for demo runs and tests. A SQL-backed
//! implementation plugs in behind the same trait.

use super::{InvoiceStore, StoreError};
use crate::domain::types::{Currency, CustomerId, Invoice, InvoiceId, InvoiceStatus, Money};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `invoice_count` pending invoices
    /// spread over a tenth as many customers, with cent-precision
    /// amounts in random currencies.
    pub fn seeded(invoice_count: usize) -> Self {
        let mut rng = rand::thread_rng();
        let customers: Vec<CustomerId> = (0..invoice_count.div_ceil(10).max(1))
            .map(|_| CustomerId::new())
            .collect();

        let mut invoices = HashMap::with_capacity(invoice_count);
        for _ in 0..invoice_count {
            let customer_id = *customers.choose(&mut rng).unwrap_or(&customers[0]);
            let currency = Currency::ALL[rng.gen_range(0..Currency::ALL.len())];
            let amount = Money::new(Decimal::new(rng.gen_range(100..=50_000), 2), currency);
            let invoice = Invoice::new(customer_id, amount);
            invoices.insert(invoice.id, invoice);
        }
        Self {
            invoices: RwLock::new(invoices),
        }
    }

    pub async fn insert(&self, invoice: Invoice) {
        self.invoices.write().await.insert(invoice.id, invoice);
    }

    pub async fn get(&self, id: InvoiceId) -> Option<Invoice> {
        self.invoices.read().await.get(&id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.invoices.read().await.len()
    }

    async fn fetch_by_status(&self, status: InvoiceStatus) -> Vec<Invoice> {
        let mut matching: Vec<Invoice> = self
            .invoices
            .read()
            .await
            .values()
            .filter(|invoice| invoice.status == status)
            .cloned()
            .collect();
        // HashMap iteration order is arbitrary; keep batches stable.
        matching.sort_by_key(|invoice| invoice.id.as_uuid());
        matching
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn fetch_pending(&self) -> Result<Vec<Invoice>, StoreError> {
        Ok(self.fetch_by_status(InvoiceStatus::Pending).await)
    }

    async fn fetch_retry(&self) -> Result<Vec<Invoice>, StoreError> {
        Ok(self.fetch_by_status(InvoiceStatus::ToRetry).await)
    }

    async fn update_status(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().await;
        let stored = invoices
            .get_mut(&invoice.id)
            .ok_or(StoreError::InvoiceNotFound(invoice.id))?;
        stored.status = invoice.status;
        Ok(())
    }
}
