//! # Transfer Orchestration
//!
//! Two dispatch modes share the same plumbing: a [`TransferIntent`] fixed for
//! the run, the [`GasManager`](crate::utils::GasManager) for pricing, and a
//! [`SummaryCollector`](core_logic::SummaryCollector) for bookkeeping.
//!
//! - [`BatchDispatcher`] fans one sender out to many recipients through the
//!   `batchSend` contract and stops at the first failed chunk.
//! - [`SequentialDispatcher`] drains many senders into one target and keeps
//!   going past failed wallets.

use core_logic::{
    BatchSettings, DispatchOutcome, FeePolicy, RunSummary, SequentialSettings, UnitStatus,
    RESULT_TARGET,
};
use ethers::types::U256;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod batch;
pub mod sequential;

pub use batch::{plan_batches, Batch, BatchDispatcher};
pub use sequential::SequentialDispatcher;

/// What to move per unit and how fast. Read-only for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferIntent {
    /// Wei per recipient (batch) or per sender (sequential).
    pub unit_amount: U256,
    pub fee: FeePolicy,
    pub max_units: Option<usize>,
    /// Pause between consecutive units. Zero disables pacing.
    pub pace_interval: Duration,
}

impl TransferIntent {
    pub fn for_batch(unit_amount: U256, fee: FeePolicy, settings: &BatchSettings) -> Self {
        Self {
            unit_amount,
            fee,
            max_units: settings.max_units,
            pace_interval: settings.cool_down,
        }
    }

    pub fn for_sequential(unit_amount: U256, fee: FeePolicy, settings: &SequentialSettings) -> Self {
        Self {
            unit_amount,
            fee,
            max_units: settings.max_units,
            pace_interval: settings.pace_interval,
        }
    }
}

/// First `cap` ledger entries, or all of them.
pub fn apply_cap<T>(units: &[T], cap: Option<usize>) -> &[T] {
    match cap {
        Some(cap) if cap < units.len() => {
            info!("Limiting run to the first {} of {} wallets", cap, units.len());
            &units[..cap]
        }
        _ => units,
    }
}

pub(crate) async fn pace(interval: Duration) {
    if !interval.is_zero() {
        info!("Waiting {:?} before the next transfer...", interval);
        tokio::time::sleep(interval).await;
    }
}

pub(crate) fn log_outcome(outcome: &DispatchOutcome, total: usize) {
    let hash = outcome.tx_hash.as_deref().unwrap_or("-");
    let reason = outcome.error.as_deref().unwrap_or("unknown error");
    match outcome.status {
        UnitStatus::ConfirmedSuccess => info!(
            target: RESULT_TARGET,
            "[{}/{}] SUCCESS {} | tx {} | gas used {}",
            outcome.unit_index,
            total,
            outcome.subject,
            hash,
            outcome.gas_used.map(|g| g.to_string()).unwrap_or_else(|| "?".into())
        ),
        UnitStatus::ConfirmedReverted => error!(
            target: RESULT_TARGET,
            "[{}/{}] REVERTED {} | tx {}",
            outcome.unit_index,
            total,
            outcome.subject,
            hash
        ),
        _ => error!(
            target: RESULT_TARGET,
            "[{}/{}] FAILED {} | tx {} | {}",
            outcome.unit_index,
            total,
            outcome.subject,
            hash,
            reason
        ),
    }
}

pub fn log_summary(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    info!(
        "Run complete | Total: {} | Success: {} | Failed: {} | Not attempted: {} | Success Rate: {:.2}% | Took {}s",
        summary.total_units,
        summary.succeeded,
        summary.failed,
        summary.not_attempted(),
        summary.success_rate(),
        elapsed.num_seconds()
    );
    if let Some(reason) = &summary.aborted {
        warn!("Run aborted: {}", reason);
    }
}
