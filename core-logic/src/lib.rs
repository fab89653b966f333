//! # Core Logic - Shared Utilities for the Account Splitter
//!
//! Chain-agnostic building blocks used by the chain crates: the wallet
//! ledger reader, the fee policy, run configuration, outcome bookkeeping and
//! the logger.
//!
//! ## Modules
//!
//! - [`config`] - Immutable run settings (fees, batching, pacing, probing)
//! - [`error`] - Typed error handling with thiserror
//! - [`summary`] - Per-unit outcomes and the terminal run summary
//! - `utils` - Ledger reader, fee policy, logger

pub mod config;
pub mod error;
pub mod summary;
pub(crate) mod utils;

pub use config::{BatchSettings, FeeConfig, ProbeSettings, SequentialSettings};
pub use error::{ConfigError, FeeError, LedgerError, WalletError};
pub use summary::{DispatchOutcome, RunMode, RunSummary, SummaryCollector, UnitStatus};

pub use utils::{
    normalize_private_key, scale_multiplier, select_wallet, setup_logger, FeePolicy,
    FeeQuote, GasLimit, LedgerReader, LedgerWriter, WalletRecord, LIMIT_TRANSFER, MULTIPLIER_SCALE,
    RESULT_TARGET,
};
