use crate::client::{ChainClient, ChainError, GasParams};
use core_logic::{FeePolicy, FeeQuote, GasLimit};
use ethers::prelude::*;
use tracing::debug;

/// Price resolved once for a run, shared by every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFee {
    pub suggested: U256,
    pub quote: FeeQuote,
}

impl RunFee {
    pub fn gas_price(&self) -> U256 {
        U256::from(self.quote.gas_price)
    }
}

/// Applies a [`FeePolicy`] against live chain data.
#[derive(Clone, Copy, Debug)]
pub struct GasManager {
    policy: FeePolicy,
}

impl GasManager {
    pub fn new(policy: FeePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    /// Reads the suggested price and applies the multiplier.
    pub async fn resolve<C: ChainClient + ?Sized>(&self, client: &C) -> Result<RunFee, ChainError> {
        let suggested = client.suggested_gas_price().await?;
        if suggested > U256::from(u128::MAX) {
            return Err(ChainError::Estimation(format!(
                "suggested gas price {} out of range",
                suggested
            )));
        }

        let quote = self
            .policy
            .compute_fee(suggested.as_u128())
            .map_err(|e| ChainError::Estimation(e.to_string()))?;

        debug!(
            "Suggested gas price {} wei -> {} wei ({}/10000)",
            suggested,
            quote.gas_price,
            self.policy.scaled_multiplier()
        );

        Ok(RunFee { suggested, quote })
    }

    /// Gas params for one unit. Estimation only runs for
    /// [`GasLimit::Estimate`].
    pub async fn params_for<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        fee: &RunFee,
        from: Address,
        to: Address,
        value: U256,
        data: Option<Bytes>,
    ) -> Result<GasParams, ChainError> {
        let gas_limit = match fee.quote.gas_limit {
            GasLimit::Fixed(limit) => U256::from(limit),
            GasLimit::Estimate => {
                let estimated = client.estimate_gas(from, to, value, data).await?;
                if estimated > U256::from(u64::MAX) {
                    return Err(ChainError::Estimation(format!(
                        "estimate {} exceeds u64",
                        estimated
                    )));
                }
                let buffered = self
                    .policy
                    .buffered_limit(estimated.as_u64())
                    .map_err(|e| ChainError::Estimation(e.to_string()))?;
                debug!(
                    "Estimated gas {} -> {} (+{}%)",
                    estimated,
                    buffered,
                    self.policy.buffer_percent()
                );
                U256::from(buffered)
            }
        };

        Ok(GasParams {
            gas_price: fee.gas_price(),
            gas_limit,
        })
    }
}
