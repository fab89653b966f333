//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod gas;
pub(crate) mod ledger;
pub(crate) mod logger;

// Selective exports - only public utilities
pub use gas::{scale_multiplier, FeePolicy, FeeQuote, GasLimit, LIMIT_TRANSFER, MULTIPLIER_SCALE};
pub use ledger::{normalize_private_key, select_wallet, LedgerReader, LedgerWriter, WalletRecord};
pub use logger::{setup_logger, RESULT_TARGET};
