//! # Chain Client Facade
//!
//! The only seam between the dispatchers and the chain. Dispatchers are
//! generic over [`ChainClient`] so they can be driven by the ethers-backed
//! [`EthersClient`] in production and by scripted clients in tests.

use async_trait::async_trait;
use core_logic::{WalletError, WalletRecord};
use ethers::prelude::*;
use ethers::utils::to_checksum;
use std::str::FromStr;
use thiserror::Error;

pub mod ethers_client;
pub use ethers_client::{ClientSettings, EthersClient};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Gas estimation failed: {0}")]
    Estimation(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Confirmation failed: {0}")]
    Confirmation(String),
}

/// Gas parameters attached to one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    pub gas_price: U256,
    pub gas_limit: U256,
}

/// A payable contract invocation with pre-encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Inclusion result of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// `false` means the transaction was mined but execution reverted.
    pub success: bool,
    pub gas_used: Option<u64>,
    pub block_number: Option<u64>,
}

impl Confirmation {
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            success: receipt.status != Some(U64::zero()),
            gas_used: receipt.gas_used.map(|g| g.low_u64()),
            block_number: receipt.block_number.map(|b| b.as_u64()),
        }
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    async fn suggested_gas_price(&self) -> Result<U256, ChainError>;

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Option<Bytes>,
    ) -> Result<U256, ChainError>;

    /// Next usable sequence number, including pending transactions.
    async fn next_nonce(&self, address: Address) -> Result<U256, ChainError>;

    async fn submit_contract_call(
        &self,
        signer: &LocalWallet,
        call: &ContractCall,
        gas: GasParams,
    ) -> Result<H256, ChainError>;

    async fn submit_direct_transfer(
        &self,
        signer: &LocalWallet,
        to: Address,
        value: U256,
        nonce: U256,
        gas: GasParams,
    ) -> Result<H256, ChainError>;

    /// Blocks until the transaction is included or the client gives up.
    async fn wait_confirmed(&self, tx_hash: H256) -> Result<Confirmation, ChainError>;
}

/// Turns a ledger record into a signer bound to `chain_id`.
///
/// The ledger address must be the one derived from the key.
pub fn signer_from_record(record: &WalletRecord, chain_id: u64) -> Result<LocalWallet, WalletError> {
    let key = record.private_key.as_str();
    if key.len() != 64 {
        return Err(WalletError::InvalidKeyLength { length: key.len() });
    }
    let wallet = LocalWallet::from_str(key).map_err(|_| WalletError::InvalidKeyFormat)?;

    let expected = Address::from_str(&record.address).map_err(|_| WalletError::InvalidAddress {
        address: record.address.clone(),
    })?;
    if wallet.address() != expected {
        return Err(WalletError::AddressMismatch {
            expected: to_checksum(&expected, None),
            actual: to_checksum(&wallet.address(), None),
        });
    }

    Ok(wallet.with_chain_id(chain_id))
}

/// Parses a hex address, reporting the offending input on failure.
pub fn parse_address(raw: &str) -> Result<Address, WalletError> {
    Address::from_str(raw.trim()).map_err(|_| WalletError::InvalidAddress {
        address: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test key and its address
    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn test_signer_from_matching_record() {
        let record = WalletRecord::new(ADDRESS, KEY, None);
        let signer = signer_from_record(&record, 56).unwrap();
        assert_eq!(to_checksum(&signer.address(), None), ADDRESS);
        assert_eq!(signer.chain_id(), 56);
    }

    #[test]
    fn test_signer_lowercase_address_matches() {
        let record = WalletRecord::new(&ADDRESS.to_lowercase(), KEY, None);
        assert!(signer_from_record(&record, 1).is_ok());
    }

    #[test]
    fn test_signer_rejects_short_key() {
        let record = WalletRecord::new(ADDRESS, "abcd", None);
        assert_eq!(
            signer_from_record(&record, 1).unwrap_err(),
            WalletError::InvalidKeyLength { length: 4 }
        );
    }

    #[test]
    fn test_signer_rejects_non_hex_key() {
        let record = WalletRecord::new(ADDRESS, &"z".repeat(64), None);
        assert_eq!(
            signer_from_record(&record, 1).unwrap_err(),
            WalletError::InvalidKeyFormat
        );
    }

    #[test]
    fn test_signer_rejects_mismatched_address() {
        let record = WalletRecord::new("0x63FaC9201494f0bd17B9892B9fae4d52fe3BD377", KEY, None);
        assert!(matches!(
            signer_from_record(&record, 1),
            Err(WalletError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn test_confirmation_from_receipt() {
        let mut receipt = TransactionReceipt {
            status: Some(U64::from(1)),
            gas_used: Some(U256::from(21_000u64)),
            block_number: Some(U64::from(42)),
            ..Default::default()
        };
        let ok = Confirmation::from_receipt(&receipt);
        assert!(ok.success);
        assert_eq!(ok.gas_used, Some(21_000));
        assert_eq!(ok.block_number, Some(42));

        receipt.status = Some(U64::zero());
        assert!(!Confirmation::from_receipt(&receipt).success);
    }
}
