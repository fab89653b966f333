use super::{apply_cap, log_outcome, pace, TransferIntent};
use crate::client::{signer_from_record, ChainClient};
use crate::utils::{GasManager, RunFee};
use anyhow::{Context, Result};
use core_logic::{DispatchOutcome, RunMode, RunSummary, SummaryCollector, WalletRecord};
use ethers::prelude::*;
use ethers::utils::format_ether;
use std::sync::Arc;
use tracing::{info, warn};

/// Fan-in dispatcher: every ledger wallet sends a fixed amount to one target.
pub struct SequentialDispatcher<C: ChainClient> {
    client: Arc<C>,
    target: Address,
    intent: TransferIntent,
    gas: GasManager,
}

impl<C: ChainClient> SequentialDispatcher<C> {
    pub fn new(client: Arc<C>, target: Address, intent: TransferIntent) -> Self {
        Self {
            client,
            target,
            gas: GasManager::new(intent.fee),
            intent,
        }
    }

    /// Processes wallets in ledger order. A failed wallet is recorded and the
    /// run moves on to the next one.
    pub async fn run(&self, senders: &[WalletRecord]) -> Result<RunSummary> {
        let senders = apply_cap(senders, self.intent.max_units);
        let total = senders.len();

        let chain_id = self
            .client
            .chain_id()
            .await
            .context("Failed to read chain id")?;
        let fee = self
            .gas
            .resolve(self.client.as_ref())
            .await
            .context("Failed to price the run")?;

        info!(
            "Sending {} ETH from each of {} wallets to {:?}",
            format_ether(self.intent.unit_amount),
            total,
            self.target
        );

        let mut collector = SummaryCollector::new(RunMode::Sequential, total);

        for (i, record) in senders.iter().enumerate() {
            let unit_index = i + 1;
            info!("[{}/{}] Processing {}", unit_index, total, record.address);

            let outcome = self.transfer_one(unit_index, record, chain_id, &fee).await;
            log_outcome(&outcome, total);
            collector.record(outcome);

            if unit_index < total {
                pace(self.intent.pace_interval).await;
            }
        }

        let summary = collector.finish(None);
        if summary.failed > 0 {
            warn!("{} of {} wallets failed", summary.failed, total);
        }
        Ok(summary)
    }

    async fn transfer_one(
        &self,
        unit_index: usize,
        record: &WalletRecord,
        chain_id: u64,
        fee: &RunFee,
    ) -> DispatchOutcome {
        let subject = record.address.as_str();
        let fail = |tx_hash: Option<String>, reason: String| {
            DispatchOutcome::submission_failed(unit_index, subject, tx_hash, reason)
        };

        let signer = match signer_from_record(record, chain_id) {
            Ok(signer) => signer,
            Err(e) => return fail(None, format!("invalid signing key: {}", e)),
        };
        let from = signer.address();

        let nonce = match self.client.next_nonce(from).await {
            Ok(nonce) => nonce,
            Err(e) => return fail(None, format!("nonce lookup failed: {}", e)),
        };

        let gas = match self
            .gas
            .params_for(
                self.client.as_ref(),
                fee,
                from,
                self.target,
                self.intent.unit_amount,
                None,
            )
            .await
        {
            Ok(gas) => gas,
            Err(e) => return fail(None, e.to_string()),
        };

        let tx_hash = match self
            .client
            .submit_direct_transfer(&signer, self.target, self.intent.unit_amount, nonce, gas)
            .await
        {
            Ok(hash) => hash,
            Err(e) => return fail(None, e.to_string()),
        };
        let hash = format!("{:?}", tx_hash);
        info!("Transaction sent: {}, waiting for confirmation...", hash);

        match self.client.wait_confirmed(tx_hash).await {
            Ok(c) if c.success => DispatchOutcome::success(unit_index, subject, hash, c.gas_used),
            Ok(c) => DispatchOutcome::reverted(unit_index, subject, hash, c.gas_used),
            Err(e) => fail(Some(hash), e.to_string()),
        }
    }
}
