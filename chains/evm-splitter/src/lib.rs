//! # EVM Splitter
//!
//! Moves native value between ledger wallets on an EVM chain, either fanned
//! out from one sender through a `batchSend` contract or drained wallet by
//! wallet into a single target. It also creates and checks wallet ledgers.

pub mod client;
pub mod config;
pub mod contracts;
pub mod dispatch;
pub mod generate;
pub mod probe;
pub mod utils;
pub mod verify;

pub use client::{
    parse_address, signer_from_record, ChainClient, ChainError, ClientSettings, Confirmation,
    ContractCall, EthersClient, GasParams,
};
pub use config::SplitterConfig;
pub use dispatch::{log_summary, plan_batches, Batch, BatchDispatcher, SequentialDispatcher, TransferIntent};
pub use generate::{generate_mnemonic_wallets, generate_wallets};
pub use probe::{probe_nodes, NodeResult, OutputFormat};
pub use utils::{GasManager, RunFee};
pub use verify::{verify_file, verify_ledger, verify_records, VerifyReport};
