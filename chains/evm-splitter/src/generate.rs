//! Fresh wallet ledgers, either from raw random keys or from one BIP-39
//! mnemonic per wallet (first account, `m/44'/60'/0'/0/0`).

use anyhow::{Context, Result};
use core_logic::WalletRecord;
use ethers::core::rand::{CryptoRng, Rng};
use ethers::signers::coins_bip39::{English, Mnemonic};
use ethers::signers::{LocalWallet, MnemonicBuilder, Signer};
use ethers::utils::{hex, to_checksum};

const MNEMONIC_WORDS: usize = 12;

pub fn generate_wallets<R: Rng + CryptoRng>(count: usize, rng: &mut R) -> Vec<WalletRecord> {
    (0..count)
        .map(|_| record_for(&LocalWallet::new(&mut *rng), None))
        .collect()
}

pub fn generate_mnemonic_wallets<R: Rng + CryptoRng>(
    count: usize,
    rng: &mut R,
) -> Result<Vec<WalletRecord>> {
    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let phrase = Mnemonic::<English>::new_with_count(&mut *rng, MNEMONIC_WORDS)
            .with_context(|| format!("Failed to create mnemonic {}", i + 1))?
            .to_phrase();
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase.as_str())
            .build()
            .with_context(|| format!("Failed to derive wallet {}", i + 1))?;
        records.push(record_for(&wallet, Some(&phrase)));
    }
    Ok(records)
}

fn record_for(wallet: &LocalWallet, mnemonic: Option<&str>) -> WalletRecord {
    let key = hex::encode(wallet.signer().to_bytes());
    WalletRecord::new(&to_checksum(&wallet.address(), None), &key, mnemonic)
}
