//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Wallet ledger errors. Always fatal: raised before any on-chain action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Malformed ledger '{path}': {reason}")]
    MalformedLedger { path: String, reason: String },

    #[error("I/O error reading ledger {path}: {msg}")]
    Io { path: String, msg: String },
}

impl LedgerError {
    pub fn malformed(path: &str, reason: impl Into<String>) -> Self {
        LedgerError::MalformedLedger {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Wallet and signing-key errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Wallet not found at index {index} (total wallets: {total})")]
    NotFound { index: usize, total: usize },

    #[error("Invalid private key format: expected hex string")]
    InvalidKeyFormat,

    #[error("Invalid private key length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { length: usize },

    #[error("Invalid address '{address}'")]
    InvalidAddress { address: String },

    #[error("Wallet address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: String, actual: String },
}

/// Fee policy arithmetic errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeeError {
    #[error("Gas price overflow: {suggested} wei x {scaled_multiplier}/{scale}")]
    PriceOverflow {
        suggested: u128,
        scaled_multiplier: u128,
        scale: u128,
    },

    #[error("Gas limit overflow applying {buffer_percent}% buffer to {estimated}")]
    LimitOverflow { estimated: u64, buffer_percent: u32 },
}
