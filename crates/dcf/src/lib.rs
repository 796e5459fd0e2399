#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Discounted cash flow valuation of equities.
//!
//! This crate re-exports the core types, cache backends, the Intrinio
//! provider, the valuation models and the report writer, and provides
//! [`CachedProvider`] for putting a cache in front of a provider.
//!
//! # Features
//!
//! - `cache-sqlite` - SQLite-based caching (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dcf::{CachedProvider, IntrinioProvider, JimmyModel, SqliteCache, ValuationModel};
//!
//! #[tokio::main]
//! async fn main() -> dcf::Result<()> {
//!     let cache = Arc::new(SqliteCache::open_default("./financial-data/")?);
//!     let provider = CachedProvider::new(IntrinioProvider::new("your_api_key"), cache);
//!
//!     let mut model = JimmyModel::new("AAPL", 2018)?;
//!     let price = model.calculate_price(&provider).await?;
//!     println!("AAPL intrinsic price: {price:.2}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use dcf_core::*;

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use dcf_cache::SqliteCache;
pub use dcf_cache::{InMemoryCache, NoopCache};

// Providers
pub use dcf_intrinio::{INTRINIO_BASE_URL, IntrinioProvider};

// Valuation
pub use dcf_valuation::{
    DEFAULT_DISCOUNT_RATE, DEFAULT_LONG_TERM_GROWTH_RATE, EnterpriseValue, JimmyModel,
    ValuationModel, ValuationResults, calc_enterprise_value, calc_graham_number,
};

// Reports
pub use dcf_report::{JimmyReportWorksheet, ReportWorksheet, SheetGrid, WorkbookReport};

mod cached;
pub use cached::{CachedProvider, metric_key, statement_key};
