//! # Run Summary
//!
//! Per-unit outcome bookkeeping for one orchestration run. A unit is a chunk
//! in batch mode or a wallet in sequential mode. Outcomes are collected while
//! the run progresses; the [`RunSummary`] is produced once at the end and is
//! read-only afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Batch,
    Sequential,
}

/// `Pending -> Submitted -> {ConfirmedSuccess | ConfirmedReverted | SubmissionFailed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Pending,
    Submitted,
    ConfirmedSuccess,
    ConfirmedReverted,
    SubmissionFailed,
}

impl UnitStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UnitStatus::ConfirmedSuccess
                | UnitStatus::ConfirmedReverted
                | UnitStatus::SubmissionFailed
        )
    }

    pub fn is_success(self) -> bool {
        self == UnitStatus::ConfirmedSuccess
    }

    /// Legal transitions of the unit state machine.
    pub fn can_transition_to(self, next: UnitStatus) -> bool {
        matches!(
            (self, next),
            (UnitStatus::Pending, UnitStatus::Submitted)
                | (UnitStatus::Pending, UnitStatus::SubmissionFailed)
                | (UnitStatus::Submitted, UnitStatus::ConfirmedSuccess)
                | (UnitStatus::Submitted, UnitStatus::ConfirmedReverted)
                | (UnitStatus::Submitted, UnitStatus::SubmissionFailed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// 1-based position of the unit in the run.
    pub unit_index: usize,
    /// Sender address (sequential) or recipient range label (batch).
    pub subject: String,
    pub status: UnitStatus,
    pub tx_hash: Option<String>,
    pub confirmed: bool,
    pub gas_used: Option<u64>,
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn success(unit_index: usize, subject: &str, tx_hash: String, gas_used: Option<u64>) -> Self {
        Self {
            unit_index,
            subject: subject.to_string(),
            status: UnitStatus::ConfirmedSuccess,
            tx_hash: Some(tx_hash),
            confirmed: true,
            gas_used,
            error: None,
        }
    }

    /// Mined but execution failed: gas was consumed and a hash exists.
    pub fn reverted(unit_index: usize, subject: &str, tx_hash: String, gas_used: Option<u64>) -> Self {
        Self {
            unit_index,
            subject: subject.to_string(),
            status: UnitStatus::ConfirmedReverted,
            tx_hash: Some(tx_hash.clone()),
            confirmed: true,
            gas_used,
            error: Some(format!("transaction {} reverted on-chain", tx_hash)),
        }
    }

    /// Never reached (or was never observed on) the chain. `tx_hash` is set
    /// when the submission went out but confirmation failed.
    pub fn submission_failed(
        unit_index: usize,
        subject: &str,
        tx_hash: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            unit_index,
            subject: subject.to_string(),
            status: UnitStatus::SubmissionFailed,
            tx_hash,
            confirmed: false,
            gas_used: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub total_units: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<DispatchOutcome>,
    /// Set when a batch run stopped before attempting every unit.
    pub aborted: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn not_attempted(&self) -> usize {
        self.total_units.saturating_sub(self.outcomes.len())
    }

    pub fn is_complete_success(&self) -> bool {
        self.aborted.is_none() && self.failed == 0 && self.succeeded == self.total_units
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted() > 0 {
            self.succeeded as f64 / self.attempted() as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn export_json(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Mutable accumulator used while a run is in progress.
#[derive(Debug)]
pub struct SummaryCollector {
    mode: RunMode,
    total_units: usize,
    outcomes: Vec<DispatchOutcome>,
    started_at: DateTime<Utc>,
}

impl SummaryCollector {
    pub fn new(mode: RunMode, total_units: usize) -> Self {
        Self {
            mode,
            total_units,
            outcomes: Vec::with_capacity(total_units),
            started_at: Utc::now(),
        }
    }

    pub fn record(&mut self, outcome: DispatchOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn recorded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn finish(self, aborted: Option<String>) -> RunSummary {
        let succeeded = self.outcomes.iter().filter(|o| o.is_success()).count();
        let failed = self.outcomes.len() - succeeded;
        RunSummary {
            mode: self.mode,
            total_units: self.total_units,
            succeeded,
            failed,
            outcomes: self.outcomes,
            aborted,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_transitions() {
        assert!(UnitStatus::Pending.can_transition_to(UnitStatus::Submitted));
        assert!(UnitStatus::Submitted.can_transition_to(UnitStatus::ConfirmedReverted));
        assert!(UnitStatus::Submitted.can_transition_to(UnitStatus::SubmissionFailed));
        assert!(!UnitStatus::Pending.can_transition_to(UnitStatus::ConfirmedSuccess));
        assert!(!UnitStatus::ConfirmedSuccess.can_transition_to(UnitStatus::Submitted));
        assert!(!UnitStatus::Submitted.is_terminal());
        assert!(UnitStatus::ConfirmedReverted.is_terminal());
    }

    #[test]
    fn test_revert_keeps_hash_and_gas() {
        let outcome = DispatchOutcome::reverted(2, "chunk", "0xabc".to_string(), Some(50_000));
        assert_eq!(outcome.tx_hash.as_deref(), Some("0xabc"));
        assert!(outcome.confirmed);
        assert!(!outcome.is_success());
        assert_eq!(outcome.gas_used, Some(50_000));
    }

    #[test]
    fn test_collector_tally() {
        let mut collector = SummaryCollector::new(RunMode::Batch, 3);
        collector.record(DispatchOutcome::success(1, "a", "0x1".into(), Some(1)));
        collector.record(DispatchOutcome::reverted(2, "b", "0x2".into(), Some(1)));
        let summary = collector.finish(Some("chunk 2 reverted".into()));

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.not_attempted(), 1);
        assert!(!summary.is_complete_success());
        assert_eq!(summary.success_rate(), 50.0);
    }

    #[test]
    fn test_export_json() {
        let mut collector = SummaryCollector::new(RunMode::Sequential, 1);
        collector.record(DispatchOutcome::submission_failed(1, "0xabc", None, "nonce fetch failed"));
        let summary = collector.finish(None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        summary.export_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["mode"], "sequential");
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][0]["status"], "submission_failed");
    }
}
