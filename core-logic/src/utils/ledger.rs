//! # Wallet Ledger Reader
//!
//! Parses the tabular wallet ledger (`Address, Private Key[, Mnemonic]`)
//! into validated, immutable [`WalletRecord`]s. Cryptographic consistency of
//! address/key pairs is not checked here; that happens when a key is turned
//! into a signer.

use crate::error::{LedgerError, WalletError};
use std::fmt;
use std::fs::File;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const HEADER_ADDRESS: &str = "Address";
pub const HEADER_PRIVATE_KEY: &str = "Private Key";
pub const HEADER_MNEMONIC: &str = "Mnemonic";

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WalletRecord {
    pub address: String,
    /// Hex encoded, stored without the `0x` prefix.
    pub private_key: String,
    pub mnemonic: Option<String>,
}

impl WalletRecord {
    pub fn new(address: &str, private_key: &str, mnemonic: Option<&str>) -> Self {
        Self {
            address: address.trim().to_string(),
            private_key: normalize_private_key(private_key),
            mnemonic: mnemonic
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("address", &self.address)
            .field("private_key", &"***REDACTED***")
            .field(
                "mnemonic",
                &self.mnemonic.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

/// Strips surrounding whitespace and an optional `0x`/`0X` prefix.
pub fn normalize_private_key(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_string()
}

/// Column layout detected from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schema {
    AddressKey,
    AddressKeyMnemonic,
}

impl Schema {
    fn columns(self) -> usize {
        match self {
            Schema::AddressKey => 2,
            Schema::AddressKeyMnemonic => 3,
        }
    }

    fn detect(header: &[String]) -> Option<Self> {
        let cols: Vec<&str> = header.iter().map(String::as_str).collect();
        match cols.as_slice() {
            [HEADER_ADDRESS, HEADER_PRIVATE_KEY] => Some(Schema::AddressKey),
            [HEADER_ADDRESS, HEADER_PRIVATE_KEY, HEADER_MNEMONIC] => {
                Some(Schema::AddressKeyMnemonic)
            }
            _ => None,
        }
    }
}

/// Stateless reader; the same file always yields the same records.
pub struct LedgerReader;

impl LedgerReader {
    pub fn read(path: impl AsRef<Path>) -> Result<Vec<WalletRecord>, LedgerError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| LedgerError::Io {
            path: display.clone(),
            msg: e.to_string(),
        })?;
        Self::parse(file, &display)
    }

    /// Parses ledger content from any reader. `source` names the input in errors.
    pub fn parse<R: Read>(input: R, source: &str) -> Result<Vec<WalletRecord>, LedgerError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| LedgerError::malformed(source, e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.len() < 2 {
            return Err(LedgerError::malformed(
                source,
                format!(
                    "expected a header and at least one data row, found {} row(s)",
                    rows.len()
                ),
            ));
        }

        let mut header = rows.remove(0);
        if let Some(first) = header.first_mut() {
            *first = first.trim_start_matches('\u{feff}').to_string();
        }

        let schema = Schema::detect(&header).ok_or_else(|| {
            LedgerError::malformed(
                source,
                format!(
                    "header must be [{}, {}] or [{}, {}, {}], got {:?}",
                    HEADER_ADDRESS,
                    HEADER_PRIVATE_KEY,
                    HEADER_ADDRESS,
                    HEADER_PRIVATE_KEY,
                    HEADER_MNEMONIC,
                    header
                ),
            )
        })?;

        let mut wallets = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            // +2: 1-based lines, header occupies line 1
            let line = i + 2;
            if row.len() != schema.columns() {
                return Err(LedgerError::malformed(
                    source,
                    format!(
                        "line {} has {} column(s), expected {}",
                        line,
                        row.len(),
                        schema.columns()
                    ),
                ));
            }

            let mnemonic = match schema {
                Schema::AddressKey => None,
                Schema::AddressKeyMnemonic => Some(row[2].as_str()),
            };
            wallets.push(WalletRecord::new(&row[0], &row[1], mnemonic));
        }

        Ok(wallets)
    }
}

/// Writes ledgers in the layout [`LedgerReader`] accepts.
pub struct LedgerWriter;

impl LedgerWriter {
    /// Creates missing parent directories. The mnemonic column is written
    /// when any record carries one.
    pub fn write(path: impl AsRef<Path>, records: &[WalletRecord]) -> Result<(), LedgerError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let io_err = |e: std::io::Error| LedgerError::Io {
            path: display.clone(),
            msg: e.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        Self::to_writer(file, records, &display)
    }

    pub fn to_writer<W: Write>(
        output: W,
        records: &[WalletRecord],
        source: &str,
    ) -> Result<(), LedgerError> {
        let io_err = |e: csv::Error| LedgerError::Io {
            path: source.to_string(),
            msg: e.to_string(),
        };
        let schema = if records.iter().any(|r| r.mnemonic.is_some()) {
            Schema::AddressKeyMnemonic
        } else {
            Schema::AddressKey
        };

        let mut writer = csv::Writer::from_writer(output);
        match schema {
            Schema::AddressKey => writer.write_record([HEADER_ADDRESS, HEADER_PRIVATE_KEY]),
            Schema::AddressKeyMnemonic => {
                writer.write_record([HEADER_ADDRESS, HEADER_PRIVATE_KEY, HEADER_MNEMONIC])
            }
        }
        .map_err(io_err)?;

        for record in records {
            match schema {
                Schema::AddressKey => {
                    writer.write_record([record.address.as_str(), record.private_key.as_str()])
                }
                Schema::AddressKeyMnemonic => writer.write_record([
                    record.address.as_str(),
                    record.private_key.as_str(),
                    record.mnemonic.as_deref().unwrap_or_default(),
                ]),
            }
            .map_err(io_err)?;
        }

        writer.flush().map_err(|e| LedgerError::Io {
            path: source.to_string(),
            msg: e.to_string(),
        })
    }
}

/// Picks one record out of a ledger, e.g. the funded sender of a batch run.
pub fn select_wallet(records: &[WalletRecord], index: usize) -> Result<WalletRecord, WalletError> {
    records.get(index).cloned().ok_or(WalletError::NotFound {
        index,
        total: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_private_key() {
        assert_eq!(normalize_private_key("0xabc"), "abc");
        assert_eq!(normalize_private_key("0XABC"), "ABC");
        assert_eq!(normalize_private_key("  abc  "), "abc");
        assert_eq!(normalize_private_key(" 0xabc"), "abc");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let record = WalletRecord::new("0x1", "0xdeadbeef", Some("word word"));
        let dbg = format!("{:?}", record);
        assert!(dbg.contains("0x1"));
        assert!(!dbg.contains("deadbeef"));
        assert!(!dbg.contains("word word"));
    }

    #[test]
    fn test_empty_mnemonic_is_none() {
        let record = WalletRecord::new("0x1", "aa", Some("   "));
        assert!(record.mnemonic.is_none());
    }

    #[test]
    fn test_select_wallet_out_of_bounds() {
        let records = vec![WalletRecord::new("0x1", "aa", None)];
        assert!(select_wallet(&records, 0).is_ok());
        assert_eq!(
            select_wallet(&records, 3),
            Err(WalletError::NotFound { index: 3, total: 1 })
        );
    }
}
