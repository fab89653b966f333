//! # Core Logic - Fee Policy
//!
//! Chain-agnostic gas price / gas limit arithmetic. Prices are wei amounts in
//! `u128`; everything is integer math so identical inputs always produce the
//! identical output.

use crate::config::FeeConfig;
use crate::error::FeeError;

/// Fixed-point scale for the price multiplier (4 decimal places).
pub const MULTIPLIER_SCALE: u128 = 10_000;

/// Standard gas limit of a plain value transfer.
pub const LIMIT_TRANSFER: u64 = 21_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasLimit {
    /// Use verbatim; no estimation call is made.
    Fixed(u64),
    /// Estimate per unit, then apply the buffer.
    Estimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub gas_price: u128,
    pub gas_limit: GasLimit,
}

impl FeeQuote {
    pub fn is_fixed_limit(&self) -> bool {
        matches!(self.gas_limit, GasLimit::Fixed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    scaled_multiplier: u128,
    fixed_gas_limit: u64,
    buffer_percent: u32,
}

impl FeePolicy {
    /// Builds the policy from (already validated) configuration.
    pub fn new(config: &FeeConfig) -> Self {
        Self {
            scaled_multiplier: scale_multiplier(config.multiplier),
            fixed_gas_limit: config.fixed_gas_limit,
            buffer_percent: config.gas_buffer_percent,
        }
    }

    pub fn scaled_multiplier(&self) -> u128 {
        self.scaled_multiplier
    }

    pub fn buffer_percent(&self) -> u32 {
        self.buffer_percent
    }

    /// `gas_price = suggested * multiplier`, limit fixed or left to estimation.
    /// A zero suggested price stays zero.
    pub fn compute_fee(&self, suggested_price: u128) -> Result<FeeQuote, FeeError> {
        let gas_price = suggested_price
            .checked_mul(self.scaled_multiplier)
            .ok_or(FeeError::PriceOverflow {
                suggested: suggested_price,
                scaled_multiplier: self.scaled_multiplier,
                scale: MULTIPLIER_SCALE,
            })?
            / MULTIPLIER_SCALE;

        let gas_limit = if self.fixed_gas_limit > 0 {
            GasLimit::Fixed(self.fixed_gas_limit)
        } else {
            GasLimit::Estimate
        };

        Ok(FeeQuote {
            gas_price,
            gas_limit,
        })
    }

    /// `estimated * (100 + buffer) / 100`, truncating.
    pub fn buffered_limit(&self, estimated: u64) -> Result<u64, FeeError> {
        let overflow = FeeError::LimitOverflow {
            estimated,
            buffer_percent: self.buffer_percent,
        };
        let buffered = (estimated as u128) * (100 + self.buffer_percent as u128) / 100;
        u64::try_from(buffered).map_err(|_| overflow)
    }
}

/// Converts a float multiplier into its scaled integer form, rounding to the
/// nearest step so values like 1.0001 are not truncated to 1.0000.
pub fn scale_multiplier(multiplier: f64) -> u128 {
    (multiplier * MULTIPLIER_SCALE as f64).round().max(0.0) as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(multiplier: f64, fixed: u64) -> FeePolicy {
        FeePolicy::new(&FeeConfig {
            multiplier,
            fixed_gas_limit: fixed,
            ..Default::default()
        })
    }

    #[test]
    fn test_scale_multiplier_rounds() {
        assert_eq!(scale_multiplier(1.0001), 10_001);
        assert_eq!(scale_multiplier(1.0), 10_000);
        assert_eq!(scale_multiplier(1.5), 15_000);
    }

    #[test]
    fn test_compute_fee_applies_multiplier() {
        let quote = policy(1.5, 0).compute_fee(3_000_000_000).unwrap();
        assert_eq!(quote.gas_price, 4_500_000_000);
        assert_eq!(quote.gas_limit, GasLimit::Estimate);
    }

    #[test]
    fn test_zero_price_passes_through() {
        let quote = policy(2.0, 0).compute_fee(0).unwrap();
        assert_eq!(quote.gas_price, 0);
    }

    #[test]
    fn test_fixed_limit() {
        let quote = policy(1.0, 90_000).compute_fee(1).unwrap();
        assert_eq!(quote.gas_limit, GasLimit::Fixed(90_000));
        assert!(quote.is_fixed_limit());
    }

    #[test]
    fn test_buffered_limit_matches_twelve_tenths() {
        let p = policy(1.0, 0);
        for estimated in [21_000u64, 21_001, 55_555, 1, 0, 9_999_999] {
            assert_eq!(p.buffered_limit(estimated).unwrap(), estimated * 12 / 10);
        }
    }

    #[test]
    fn test_price_overflow() {
        let result = policy(2.0, 0).compute_fee(u128::MAX);
        assert!(matches!(result, Err(FeeError::PriceOverflow { .. })));
    }
}
