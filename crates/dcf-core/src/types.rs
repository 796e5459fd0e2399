//! Core data types for financial statement data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`StatementKind`] - Which standardized statement to read
//! - [`StatementRecord`] - Tag/value pairs of one fiscal year's statement
//! - [`YearSeries`] - Values keyed by fiscal year

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, trimming whitespace and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Standardized financial statement type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Income statement.
    IncomeStatement,
    /// Balance sheet.
    BalanceSheet,
    /// Cash flow statement.
    CashFlowStatement,
}

impl StatementKind {
    /// Returns the statement code used in fundamental identifiers and cache keys.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "income_statement",
            Self::BalanceSheet => "balance_sheet_statement",
            Self::CashFlowStatement => "cash_flow_statement",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One fiscal year of a standardized statement: tag name to value.
///
/// ```text
/// {
///   "netcashfromcontinuingoperatingactivities": 77434000000.0,
///   "purchaseofplantpropertyandequipment": -13313000000.0
/// }
/// ```
pub type StatementRecord = BTreeMap<String, f64>;

/// Values keyed by fiscal year, in ascending year order.
pub type YearSeries<T> = BTreeMap<i32, T>;

/// Returns the subset of `record` whose tags appear in `tag_filter`.
///
/// A `None` filter keeps every tag.
#[must_use]
pub fn filter_statement(record: StatementRecord, tag_filter: Option<&[&str]>) -> StatementRecord {
    match tag_filter {
        None => record,
        Some(tags) => record
            .into_iter()
            .filter(|(tag, _)| tags.contains(&tag.as_str()))
            .collect(),
    }
}
