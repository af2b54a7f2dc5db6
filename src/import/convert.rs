use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::errors::FormatError;

/// Placeholder for payees that are empty after trimming, so the
/// duplicate key never hashes an empty string.
const UNKNOWN_PAYEE: &str = "Unknown";

/// Supported bank export layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankFormat {
    /// Already in the canonical `date,payee,notes,amount` shape.
    Standard,
    DeutscheBank,
    Ing,
}

impl BankFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::DeutscheBank => "deutsche-bank",
            Self::Ing => "ing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "deutsche-bank" => Some(Self::DeutscheBank),
            "ing" => Some(Self::Ing),
            _ => None,
        }
    }

    pub fn all() -> &'static [BankFormat] {
        &[Self::Standard, Self::DeutscheBank, Self::Ing]
    }
}

impl std::fmt::Display for BankFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The normalized four-field row every converter produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub date: NaiveDate,
    pub payee: String,
    pub notes: String,
    pub amount: Decimal,
}

/// Converter output: canonical rows sorted ascending by date, plus the
/// number of data rows dropped for unparseable dates or amounts.
#[derive(Debug, Clone, Default)]
pub struct ConvertOutcome {
    pub rows: Vec<CanonicalRow>,
    pub dropped: usize,
}

/// Column layout of one bank's export. Mirrors the vendor CSVs exactly;
/// nothing here is user-configurable.
struct BankProfile {
    delimiter: u8,
    skip_rows: usize,
    latin1: bool,
    date_column: &'static str,
    payee_column: &'static str,
    /// Multiple source columns are joined with " - " into the notes field.
    notes_columns: &'static [&'static str],
    amount_column: &'static str,
}

/// Semicolon delimiter, decimal comma, DD.MM.YYYY dates, 7 metadata rows.
const DEUTSCHE_BANK: BankProfile = BankProfile {
    delimiter: b';',
    skip_rows: 7,
    latin1: false,
    date_column: "Buchungstag",
    payee_column: "Beg\u{fc}nstigter / Auftraggeber",
    notes_columns: &["Verwendungszweck"],
    amount_column: "Betrag",
};

/// Like Deutsche Bank but ISO-8859-1 encoded, 13 metadata rows, and
/// notes assembled from two source columns.
const ING: BankProfile = BankProfile {
    delimiter: b';',
    skip_rows: 13,
    latin1: true,
    date_column: "Buchung",
    payee_column: "Auftraggeber/Empf\u{e4}nger",
    notes_columns: &["Buchungstext", "Verwendungszweck"],
    amount_column: "Betrag",
};

/// Convert a raw export file into canonical rows. Pure: same bytes in,
/// same rows out.
pub fn convert(path: &Path, format: BankFormat) -> Result<ConvertOutcome, FormatError> {
    match format {
        BankFormat::Standard => convert_standard(path),
        BankFormat::DeutscheBank => convert_bank(path, &DEUTSCHE_BANK),
        BankFormat::Ing => convert_bank(path, &ING),
    }
}

fn convert_standard(path: &Path) -> Result<ConvertOutcome, FormatError> {
    let content = read_file(path, false)?;
    if content.trim().is_empty() {
        return Err(FormatError::Empty);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let date_col = require_column(&headers, "date")?;
    let payee_col = require_column(&headers, "payee")?;
    let amount_col = require_column(&headers, "amount")?;
    let notes_col = headers.iter().position(|h| h == "notes");

    let mut rows = Vec::new();
    let mut dropped = 0;
    for result in rdr.records() {
        let Ok(record) = result else {
            dropped += 1;
            continue;
        };
        let date_str = record.get(date_col).unwrap_or("").trim();
        let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let amount_str = record.get(amount_col).unwrap_or("").trim();
        let Some(amount) = parse_plain_decimal(amount_str) else {
            dropped += 1;
            continue;
        };
        rows.push(CanonicalRow {
            date,
            payee: clean_payee(record.get(payee_col).unwrap_or("")),
            notes: notes_col
                .and_then(|c| record.get(c))
                .unwrap_or("")
                .trim()
                .to_string(),
            amount,
        });
    }

    // Stable: rows sharing a date keep source order, so downstream
    // identity keys are deterministic regardless of file row order.
    rows.sort_by_key(|r| r.date);
    Ok(ConvertOutcome { rows, dropped })
}

fn convert_bank(path: &Path, profile: &BankProfile) -> Result<ConvertOutcome, FormatError> {
    let content = read_file(path, profile.latin1)?;
    let body = skip_lines(&content, profile.skip_rows);
    if body.trim().is_empty() {
        return Err(FormatError::Empty);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(profile.delimiter)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let date_col = require_column(&headers, profile.date_column)?;
    let payee_col = require_column(&headers, profile.payee_column)?;
    let amount_col = require_column(&headers, profile.amount_column)?;
    let mut notes_cols = Vec::with_capacity(profile.notes_columns.len());
    for name in profile.notes_columns {
        notes_cols.push(require_column(&headers, name)?);
    }

    let mut rows = Vec::new();
    let mut dropped = 0;
    for result in rdr.records() {
        let Ok(record) = result else {
            dropped += 1;
            continue;
        };
        let date_str = record.get(date_col).unwrap_or("").trim();
        // Footer/balance rows carry text in the date column; they are
        // noise, not data, so they do not count as dropped.
        if !day_first_date_re().is_match(date_str) {
            continue;
        }
        let date = match NaiveDate::parse_from_str(date_str, "%d.%m.%Y") {
            Ok(d) => d,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let amount_str = record.get(amount_col).unwrap_or("").trim();
        let Some(amount) = parse_german_decimal(amount_str) else {
            dropped += 1;
            continue;
        };
        let notes = notes_cols
            .iter()
            .map(|&c| record.get(c).unwrap_or("").trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" - ");
        rows.push(CanonicalRow {
            date,
            payee: clean_payee(record.get(payee_col).unwrap_or("")),
            notes,
            amount,
        });
    }

    rows.sort_by_key(|r| r.date);
    Ok(ConvertOutcome { rows, dropped })
}

fn read_file(path: &Path, latin1: bool) -> Result<String, FormatError> {
    let bytes = std::fs::read(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if latin1 {
        // ISO-8859-1 maps each byte to the same Unicode codepoint.
        Ok(bytes.iter().map(|&b| b as char).collect())
    } else {
        String::from_utf8(bytes).map_err(|_| FormatError::Encoding("UTF-8"))
    }
}

fn skip_lines(content: &str, n: usize) -> &str {
    let mut rest = content;
    for _ in 0..n {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

fn require_column(headers: &[String], name: &str) -> Result<usize, FormatError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| FormatError::MissingColumn(name.to_string()))
}

fn clean_payee(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_PAYEE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Canonical decimals: optional `-`, `.` decimal point, no grouping.
fn parse_plain_decimal(s: &str) -> Option<Decimal> {
    let cleaned = s.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}

/// German locale: `.` thousands separator, `,` decimal point.
/// "1.234,56" -> 1234.56 with no precision loss.
fn parse_german_decimal(s: &str) -> Option<Decimal> {
    let cleaned = s.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn day_first_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // literal pattern
        Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$").unwrap()
    })
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
