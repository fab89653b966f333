use super::{apply_cap, log_outcome, pace, TransferIntent};
use crate::client::{parse_address, ChainClient, ContractCall};
use crate::contracts::BatchSendCall;
use crate::utils::{GasManager, RunFee};
use anyhow::{bail, Context, Result};
use core_logic::{DispatchOutcome, LedgerError, RunMode, RunSummary, SummaryCollector, WalletRecord};
use ethers::abi::AbiEncode;
use ethers::prelude::*;
use ethers::utils::format_ether;
use std::sync::Arc;
use tracing::{info, warn};

/// One `batchSend` invocation: a contiguous slice of the recipient list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based.
    pub index: usize,
    pub total_batches: usize,
    /// Position of the first recipient in the (capped) ledger, 0-based.
    pub offset: usize,
    pub recipients: Vec<Address>,
    pub amounts: Vec<U256>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Value attached to the call.
    pub fn total_value(&self) -> U256 {
        self.amounts
            .iter()
            .fold(U256::zero(), |acc, amount| acc.saturating_add(*amount))
    }

    pub fn label(&self) -> String {
        format!("recipients {}-{}", self.offset + 1, self.offset + self.len())
    }

    pub fn calldata(&self) -> Bytes {
        BatchSendCall {
            recipients: self.recipients.clone(),
            amounts: self.amounts.clone(),
        }
        .encode()
        .into()
    }
}

/// Splits recipients into consecutive chunks of at most `chunk_size`, every
/// recipient receiving `amount`.
pub fn plan_batches(recipients: &[Address], amount: U256, chunk_size: usize) -> Result<Vec<Batch>> {
    if chunk_size == 0 {
        bail!("batch size must be greater than 0");
    }

    let total_batches = recipients.len().div_ceil(chunk_size);
    recipients
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| {
            amount
                .checked_mul(U256::from(chunk.len()))
                .with_context(|| format!("value of batch {} overflows", i + 1))?;
            Ok(Batch {
                index: i + 1,
                total_batches,
                offset: i * chunk_size,
                recipients: chunk.to_vec(),
                amounts: vec![amount; chunk.len()],
            })
        })
        .collect()
}

/// Fan-out dispatcher: one funded sender, many recipients.
pub struct BatchDispatcher<C: ChainClient> {
    client: Arc<C>,
    sender: LocalWallet,
    contract: Address,
    intent: TransferIntent,
    chunk_size: usize,
    gas: GasManager,
}

impl<C: ChainClient> BatchDispatcher<C> {
    pub fn new(
        client: Arc<C>,
        sender: LocalWallet,
        contract: Address,
        intent: TransferIntent,
        chunk_size: usize,
    ) -> Self {
        Self {
            client,
            sender,
            contract,
            gas: GasManager::new(intent.fee),
            intent,
            chunk_size,
        }
    }

    /// Dispatches every chunk in order. The first chunk that does not confirm
    /// successfully ends the run; later chunks are never attempted.
    ///
    /// Errors are returned only for problems found before anything is sent.
    pub async fn run(&self, recipients: &[WalletRecord]) -> Result<RunSummary> {
        let recipients = apply_cap(recipients, self.intent.max_units);

        let addresses = recipients
            .iter()
            .enumerate()
            .map(|(i, record)| {
                parse_address(&record.address).map_err(|e| {
                    LedgerError::malformed("recipient ledger", format!("wallet {}: {}", i + 1, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batches = plan_batches(&addresses, self.intent.unit_amount, self.chunk_size)?;
        let fee = self
            .gas
            .resolve(self.client.as_ref())
            .await
            .context("Failed to price the run")?;

        info!(
            "Sending {} ETH to each of {} recipients in {} batch(es) of up to {} from {:?}",
            format_ether(self.intent.unit_amount),
            addresses.len(),
            batches.len(),
            self.chunk_size,
            self.sender.address()
        );

        let mut collector = SummaryCollector::new(RunMode::Batch, batches.len());
        let mut aborted = None;

        for batch in &batches {
            info!(
                "Batch {}/{}: {} ({} ETH)",
                batch.index,
                batch.total_batches,
                batch.label(),
                format_ether(batch.total_value())
            );

            let outcome = self.dispatch_batch(batch, &fee).await;
            log_outcome(&outcome, batch.total_batches);

            if !outcome.is_success() {
                let reason = format!(
                    "batch {}/{} ({}) failed: {}",
                    batch.index,
                    batch.total_batches,
                    batch.label(),
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                warn!("Stopping, {} batch(es) not attempted", batch.total_batches - batch.index);
                collector.record(outcome);
                aborted = Some(reason);
                break;
            }
            collector.record(outcome);

            if batch.index < batch.total_batches {
                pace(self.intent.pace_interval).await;
            }
        }

        Ok(collector.finish(aborted))
    }

    async fn dispatch_batch(&self, batch: &Batch, fee: &RunFee) -> DispatchOutcome {
        let subject = batch.label();
        let call = ContractCall {
            to: self.contract,
            data: batch.calldata(),
            value: batch.total_value(),
        };

        let gas = match self
            .gas
            .params_for(
                self.client.as_ref(),
                fee,
                self.sender.address(),
                call.to,
                call.value,
                Some(call.data.clone()),
            )
            .await
        {
            Ok(gas) => gas,
            Err(e) => return DispatchOutcome::submission_failed(batch.index, &subject, None, e.to_string()),
        };

        let tx_hash = match self.client.submit_contract_call(&self.sender, &call, gas).await {
            Ok(hash) => hash,
            Err(e) => return DispatchOutcome::submission_failed(batch.index, &subject, None, e.to_string()),
        };
        let hash = format!("{:?}", tx_hash);
        info!("Batch {} sent: {}, waiting for confirmation...", batch.index, hash);

        match self.client.wait_confirmed(tx_hash).await {
            Ok(c) if c.success => DispatchOutcome::success(batch.index, &subject, hash, c.gas_used),
            Ok(c) => DispatchOutcome::reverted(batch.index, &subject, hash, c.gas_used),
            Err(e) => DispatchOutcome::submission_failed(batch.index, &subject, Some(hash), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(n: usize) -> Vec<Address> {
        (1..=n).map(|i| Address::from_low_u64_be(i as u64)).collect()
    }

    #[test]
    fn test_plan_splits_into_ceil_chunks() {
        let recipients = addresses(650);
        let batches = plan_batches(&recipients, U256::from(7u64), 300).unwrap();

        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![300, 300, 50]);
        assert!(batches.iter().all(|b| b.total_batches == 3));
        assert_eq!(batches[2].offset, 600);
        assert_eq!(batches[2].label(), "recipients 601-650");
    }

    #[test]
    fn test_plan_preserves_order_without_overlap() {
        let recipients = addresses(10);
        let batches = plan_batches(&recipients, U256::one(), 3).unwrap();
        let flattened: Vec<Address> = batches.iter().flat_map(|b| b.recipients.clone()).collect();
        assert_eq!(flattened, recipients);
    }

    #[test]
    fn test_batch_value_is_amount_times_len() {
        let amount = U256::exp10(17);
        for batch in plan_batches(&addresses(7), amount, 3).unwrap() {
            assert_eq!(batch.amounts.len(), batch.recipients.len());
            assert_eq!(batch.total_value(), amount * U256::from(batch.len()));
        }
    }

    #[test]
    fn test_plan_exact_multiple_and_empty() {
        assert_eq!(plan_batches(&addresses(600), U256::one(), 300).unwrap().len(), 2);
        assert!(plan_batches(&[], U256::one(), 300).unwrap().is_empty());
    }

    #[test]
    fn test_plan_rejects_zero_chunk_size() {
        assert!(plan_batches(&addresses(3), U256::one(), 0).is_err());
    }

    #[test]
    fn test_plan_rejects_value_overflow() {
        assert!(plan_batches(&addresses(3), U256::MAX, 2).is_err());
    }
}
