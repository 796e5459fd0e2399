#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for discounted cash flow valuation.
//!
//! This crate provides the foundational abstractions used by the valuation engine:
//!
//! - [`FinancialDataProvider`](provider::FinancialDataProvider) - Historical statements, metrics and prices
//! - [`FinancialCache`](cache::FinancialCache) - Key/value caching abstraction
//! - [`DcfError`](error::DcfError) - Chained error taxonomy
//! - [`fiscal_year_period`](period::fiscal_year_period) - Fiscal year date ranges

/// Cache trait for storing fetched data.
pub mod cache;
/// Error types for valuation operations.
pub mod error;
/// Fiscal period helpers.
pub mod period;
/// Provider traits for fetching financial data.
pub mod provider;
/// Financial statement tag names.
pub mod tags;
/// Core data types (Symbol, StatementRecord, YearSeries, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{DEFAULT_MAX_SIZE_BYTES, FinancialCache};
pub use error::{BoxError, DcfError, Result};
pub use period::{MAX_FISCAL_YEAR, MIN_FISCAL_YEAR, fiscal_year_period};
pub use provider::{DataProvider, FinancialDataProvider};
pub use types::{StatementKind, StatementRecord, Symbol, YearSeries, filter_statement};
