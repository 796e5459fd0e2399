#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Discounted cash flow valuation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dcf_valuation::{JimmyModel, ValuationModel};
//! use dcf_intrinio::IntrinioProvider;
//!
//! let provider = IntrinioProvider::new("your_api_key");
//! let mut model = JimmyModel::new("AAPL", 2018)?.with_discount_rate(0.09);
//! let price = model.calculate_price(&provider).await?;
//! println!("{}", serde_json::to_string_pretty(model.results())?);
//! ```

/// Stateless financial calculations.
pub mod calculator;
/// Jimmy DCF model.
pub mod jimmy;
/// Valuation model trait.
pub mod model;
/// Structured valuation results.
pub mod results;

pub use calculator::{
    EnterpriseValue, calc_enterprise_value, calc_graham_number, historical_net_income,
    historical_simple_fcfe, median,
};
pub use jimmy::{DEFAULT_DISCOUNT_RATE, DEFAULT_LONG_TERM_GROWTH_RATE, JimmyModel};
pub use model::ValuationModel;
pub use results::ValuationResults;
