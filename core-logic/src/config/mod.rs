use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GAS_MULTIPLIER: f64 = 1.0001;
pub const DEFAULT_GAS_BUFFER_PERCENT: u32 = 20;
pub const DEFAULT_CHUNK_SIZE: usize = 300;
pub const DEFAULT_COOL_DOWN_SECS: u64 = 5;
pub const DEFAULT_TRANSFER_DELAY_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Gas pricing knobs shared by both dispatch modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Applied to the node's suggested gas price.
    pub multiplier: f64,
    /// When > 0 this limit is used verbatim and estimation is skipped.
    pub fixed_gas_limit: u64,
    /// Safety margin added on top of every gas estimate.
    pub gas_buffer_percent: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_GAS_MULTIPLIER,
            fixed_gas_limit: 0,
            gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
        }
    }
}

impl FeeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "gas_multiplier".to_string(),
                reason: format!("must be a positive number, got {}", self.multiplier),
            });
        }
        if crate::utils::scale_multiplier(self.multiplier) == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gas_multiplier".to_string(),
                reason: format!(
                    "{} is below the smallest step of 1/{}",
                    self.multiplier,
                    crate::utils::MULTIPLIER_SCALE
                ),
            });
        }
        Ok(())
    }
}

/// Fan-out run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub chunk_size: usize,
    pub max_units: Option<usize>,
    pub cool_down: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_units: None,
            cool_down: Duration::from_secs(DEFAULT_COOL_DOWN_SECS),
        }
    }
}

impl BatchSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        validate_cap(self.max_units)
    }
}

/// Fan-in / rotation run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialSettings {
    pub max_units: Option<usize>,
    pub pace_interval: Duration,
}

impl Default for SequentialSettings {
    fn default() -> Self {
        Self {
            max_units: None,
            pace_interval: Duration::from_secs(DEFAULT_TRANSFER_DELAY_SECS),
        }
    }
}

impl SequentialSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cap(self.max_units)
    }
}

/// Node latency probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub endpoints: Vec<String>,
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            endpoints: default_probe_endpoints(),
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

pub fn default_probe_endpoints() -> Vec<String> {
    [
        "https://bsc-dataseed.binance.org/",
        "https://bsc-dataseed1.defibit.io/",
        "https://bsc-dataseed1.ninicoin.io/",
        "https://bsc-dataseed2.defibit.io/",
        "https://bsc-dataseed3.defibit.io/",
        "https://bsc-dataseed4.defibit.io/",
        "https://bsc-dataseed2.ninicoin.io/",
        "https://bsc-dataseed3.ninicoin.io/",
        "https://bsc-dataseed4.ninicoin.io/",
        "https://bsc-dataseed1.binance.org/",
        "https://bsc-dataseed2.binance.org/",
        "https://bsc-dataseed3.binance.org/",
        "https://bsc-dataseed4.binance.org/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// A cap of 0 means "no cap" on the command line; it is normalized to None
// before reaching here.
fn validate_cap(cap: Option<usize>) -> Result<(), ConfigError> {
    match cap {
        Some(0) => Err(ConfigError::InvalidValue {
            field: "max_wallets".to_string(),
            reason: "use no cap instead of 0".to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_config_defaults() {
        let fee = FeeConfig::default();
        assert_eq!(fee.multiplier, 1.0001);
        assert_eq!(fee.fixed_gas_limit, 0);
        assert_eq!(fee.gas_buffer_percent, 20);
        assert!(fee.validate().is_ok());
    }

    #[test]
    fn test_fee_config_rejects_bad_multiplier() {
        for bad in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let fee = FeeConfig {
                multiplier: bad,
                ..Default::default()
            };
            assert!(fee.validate().is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_fee_config_rejects_multiplier_that_rounds_to_zero() {
        let tiny = FeeConfig {
            multiplier: 0.00004,
            ..Default::default()
        };
        let err = tiny.validate().unwrap_err();
        assert!(err.to_string().contains("gas_multiplier"));

        let smallest = FeeConfig {
            multiplier: 0.0001,
            ..Default::default()
        };
        assert!(smallest.validate().is_ok());
    }

    #[test]
    fn test_batch_settings_validation() {
        assert!(BatchSettings::default().validate().is_ok());

        let zero_chunk = BatchSettings {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(zero_chunk.validate().is_err());

        let zero_cap = BatchSettings {
            max_units: Some(0),
            ..Default::default()
        };
        assert!(zero_cap.validate().is_err());
    }

    #[test]
    fn test_probe_defaults() {
        let probe = ProbeSettings::default();
        assert_eq!(probe.endpoints.len(), 13);
        assert_eq!(probe.timeout, Duration::from_secs(5));
    }
}
