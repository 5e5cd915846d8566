//! Weighted-random payment provider for demo runs and tests.

use super::{ChargeError, PaymentProvider};
use crate::config::SimulationConfig;
use crate::domain::types::{Currency, Invoice};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

/// Stand-in for the real provider integration: resolves each charge
/// to a weighted-random outcome. Weight zero disables an outcome.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentProvider {
    charged: u32,
    declined: u32,
    network_failure: u32,
    currency_mismatch: u32,
    customer_missing: u32,
}

impl SimulatedPaymentProvider {
    pub fn new(
        charged: u32,
        declined: u32,
        network_failure: u32,
        currency_mismatch: u32,
        customer_missing: u32,
    ) -> Self {
        Self {
            charged,
            declined,
            network_failure,
            currency_mismatch,
            customer_missing,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.charged_weight,
            config.declined_weight,
            config.network_failure_weight,
            config.currency_mismatch_weight,
            config.customer_missing_weight,
        )
    }

    /// A provider that charges every invoice.
    pub fn always_charging() -> Self {
        Self::new(1, 0, 0, 0, 0)
    }

    fn total_weight(&self) -> u64 {
        self.charged as u64
            + self.declined as u64
            + self.network_failure as u64
            + self.currency_mismatch as u64
            + self.customer_missing as u64
    }
}

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, ChargeError> {
        let total = self.total_weight();
        if total == 0 {
            return Ok(true);
        }

        let mut rng = rand::thread_rng();
        let mut roll = rng.gen_range(0..total);

        if roll < self.charged as u64 {
            return Ok(true);
        }
        roll -= self.charged as u64;

        if roll < self.declined as u64 {
            return Ok(false);
        }
        roll -= self.declined as u64;

        if roll < self.network_failure as u64 {
            return Err(ChargeError::Network("connection reset".to_string()));
        }
        roll -= self.network_failure as u64;

        if roll < self.currency_mismatch as u64 {
            let other: Vec<Currency> = Currency::ALL
                .into_iter()
                .filter(|c| *c != invoice.amount.currency)
                .collect();
            let customer = *other
                .choose(&mut rng)
                .unwrap_or(&invoice.amount.currency);
            return Err(ChargeError::CurrencyMismatch {
                invoice: invoice.amount.currency,
                customer,
            });
        }

        Err(ChargeError::CustomerNotFound(invoice.customer_id))
    }
}
