//! Offline check that every ledger key really controls its ledger address.
//!
//! Unlike [`core_logic::LedgerReader`], reading a ledger here never stops at a
//! bad row: short or unreadable rows are reported with their line number and
//! the remaining rows are still checked.

use crate::client::signer_from_record;
use anyhow::{bail, Context, Result};
use core_logic::WalletRecord;
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// 1-based file line (the header is line 1).
    pub line: usize,
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub total: usize,
    pub matched: usize,
    pub mismatched: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
    }

    fn check(&mut self, line: usize, record: &WalletRecord) {
        self.total += 1;
        // Chain id does not affect address derivation
        match signer_from_record(record, 1) {
            Ok(_) => self.matched += 1,
            Err(e) => self.mismatch(line, &record.address, e.to_string()),
        }
    }

    fn mismatch(&mut self, line: usize, address: &str, reason: String) {
        self.mismatched.push(Mismatch {
            line,
            address: address.to_string(),
            reason,
        });
    }
}

/// Checks already parsed records; line numbers assume a one-line header.
pub fn verify_records(records: &[WalletRecord]) -> VerifyReport {
    let mut report = VerifyReport::default();
    for (i, record) in records.iter().enumerate() {
        report.check(i + 2, record);
    }
    report
}

pub fn verify_file<P: AsRef<Path>>(path: P) -> Result<VerifyReport> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    verify_ledger(file).with_context(|| format!("Failed to verify {}", path.display()))
}

/// Reads the ledger row by row. Only an unreadable header or an I/O failure
/// is an error; every other problem becomes a [`Mismatch`].
pub fn verify_ledger<R: Read>(input: R) -> Result<VerifyReport> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);
    let mut rows = reader.records();

    let header = match rows.next() {
        Some(header) => header.context("Unreadable header row")?,
        None => bail!("Ledger is empty"),
    };
    if header.len() < 2 {
        bail!(
            "Header has {} column(s), expected at least Address and Private Key",
            header.len()
        );
    }

    let mut report = VerifyReport::default();
    for (i, row) in rows.enumerate() {
        let fallback_line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e).context("Failed to read ledger"),
            Err(e) => {
                let line = e
                    .position()
                    .map_or(fallback_line, |p| p.line() as usize);
                report.total += 1;
                report.mismatch(line, "", e.to_string());
                continue;
            }
        };
        let line = row.position().map_or(fallback_line, |p| p.line() as usize);

        if row.len() < 2 {
            report.total += 1;
            report.mismatch(
                line,
                row.get(0).unwrap_or_default(),
                format!("row has {} column(s), expected at least 2", row.len()),
            );
            continue;
        }
        if row[0].is_empty() {
            report.total += 1;
            report.mismatch(line, "", "address is empty".to_string());
            continue;
        }

        report.check(line, &WalletRecord::new(&row[0], &row[1], None));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn test_verify_reports_each_bad_row() {
        let records = vec![
            WalletRecord::new(ADDRESS, KEY, None),
            WalletRecord::new(&ADDRESS.to_lowercase(), KEY, None),
            WalletRecord::new("0x63FaC9201494f0bd17B9892B9fae4d52fe3BD377", KEY, None),
            WalletRecord::new(ADDRESS, "1234", None),
            WalletRecord::new("not-an-address", KEY, None),
        ];

        let report = verify_records(&records);
        assert_eq!(report.total, 5);
        assert_eq!(report.matched, 2);
        assert!(!report.is_clean());

        let lines: Vec<usize> = report.mismatched.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![4, 5, 6]);
        assert_eq!(report.mismatched[2].address, "not-an-address");
    }

    #[test]
    fn test_verify_ledger_keeps_going_past_bad_rows() {
        let input = format!(
            "Address,Private Key\n{a},{k}\n{a}\n,{k}\n0x63FaC9201494f0bd17B9892B9fae4d52fe3BD377,{k}\n{a},0x{k}\n",
            a = ADDRESS,
            k = KEY
        );

        let report = verify_ledger(input.as_bytes()).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.matched, 2);

        let lines: Vec<usize> = report.mismatched.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(report.mismatched[0].reason.contains("1 column(s)"));
        assert_eq!(report.mismatched[0].address, ADDRESS);
        assert_eq!(report.mismatched[1].reason, "address is empty");
        assert!(report.mismatched[2].reason.contains("mismatch"));
    }

    #[test]
    fn test_verify_ledger_accepts_mnemonic_column() {
        let input = format!(
            "Address,Private Key,Mnemonic\n{},{},\"word word word\"\n",
            ADDRESS, KEY
        );
        let report = verify_ledger(input.as_bytes()).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_verify_ledger_rejects_unusable_header() {
        assert!(verify_ledger("".as_bytes()).is_err());
        assert!(verify_ledger("Address\n0xabc\n".as_bytes()).is_err());
    }

    #[test]
    fn test_verify_file_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            format!("Address,Private Key\n{},{}\n", ADDRESS, KEY).as_bytes(),
        )
        .unwrap();

        let report = verify_file(file.path()).unwrap();
        assert!(report.is_clean());
        assert!(verify_file("no/such/ledger.csv").is_err());
    }

    #[test]
    fn test_verify_clean_ledger() {
        let report = verify_records(&[WalletRecord::new(ADDRESS, KEY, None)]);
        assert!(report.is_clean());
        assert_eq!(report.matched, 1);
    }
}
