use crate::error::{BillingError, Result};
use crate::throttle::{DEFAULT_MAX_THROTTLE, DEFAULT_THROTTLE_MULTIPLIER_MS};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BillingConfig {
    pub throttle: ThrottleConfig,
    pub processor: ProcessorConfig,
    pub scheduler: SchedulerConfig,
    pub simulation: SimulationConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Milliseconds of delay per backoff level.
    pub multiplier_ms: u64,
    /// Upper bound of the backoff level.
    pub max_level: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Immediate retries per invoice on network failure.
    pub max_retries: u32,
    /// Bound on concurrently in-flight charge operations.
    pub max_in_flight: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA zone the first-of-month 01:00 trigger is computed in.
    pub timezone: String,
}

/// Demo-mode knobs: how many invoices to seed and the relative
/// weights of the simulated provider outcomes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub invoice_count: usize,
    pub charged_weight: u32,
    pub declined_weight: u32,
    pub network_failure_weight: u32,
    pub currency_mismatch_weight: u32,
    pub customer_missing_weight: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleConfig {
                multiplier_ms: DEFAULT_THROTTLE_MULTIPLIER_MS,
                max_level: DEFAULT_MAX_THROTTLE,
            },
            processor: ProcessorConfig {
                max_retries: DEFAULT_MAX_RETRIES,
                max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            },
            scheduler: SchedulerConfig {
                timezone: DEFAULT_TIMEZONE.to_string(),
            },
            simulation: SimulationConfig {
                invoice_count: 100,
                charged_weight: 70,
                declined_weight: 10,
                network_failure_weight: 15,
                currency_mismatch_weight: 3,
                customer_missing_weight: 2,
            },
        }
    }
}

impl BillingConfig {
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(BillingConfig::default()));

        if let Some(path) = path_override {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
            }
        } else {
            let default_path = PathBuf::from("billing.toml");
            if default_path.exists() {
                figment = figment.merge(Toml::file(default_path));
            }
        }

        figment = figment.merge(Env::prefixed("CHARON_").split("__"));

        figment
            .extract()
            .map_err(|e| BillingError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.processor.max_in_flight == 0 {
            return Err(BillingError::Config(
                "processor.max_in_flight must be at least 1".to_string(),
            ));
        }
        let total_weight = self.simulation.charged_weight as u64
            + self.simulation.declined_weight as u64
            + self.simulation.network_failure_weight as u64
            + self.simulation.currency_mismatch_weight as u64
            + self.simulation.customer_missing_weight as u64;
        if total_weight == 0 {
            return Err(BillingError::Config(
                "simulation outcome weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.scheduler.timezone.parse::<Tz>().map_err(|_| {
            BillingError::Config(format!(
                "unknown timezone: {}",
                self.scheduler.timezone
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_recommended_constants() {
        let config = BillingConfig::default();
        assert_eq!(config.throttle.multiplier_ms, 7);
        assert_eq!(config.throttle.max_level, 5);
        assert_eq!(config.processor.max_retries, 3);
        assert_eq!(config.scheduler.timezone, "Europe/Berlin");
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = BillingConfig::default();
        config.scheduler.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = BillingConfig::default();
        config.processor.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_all_zero_weights() {
        let mut config = BillingConfig::default();
        config.simulation = SimulationConfig {
            invoice_count: 10,
            charged_weight: 0,
            declined_weight: 0,
            network_failure_weight: 0,
            currency_mismatch_weight: 0,
            customer_missing_weight: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = BillingConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: BillingConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.processor.max_retries, config.processor.max_retries);
        assert_eq!(parsed.scheduler.timezone, config.scheduler.timezone);
    }
}
