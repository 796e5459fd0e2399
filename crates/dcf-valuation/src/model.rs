//! Valuation model trait.

use async_trait::async_trait;
use dcf_core::{FinancialDataProvider, Result};

use crate::results::ValuationResults;

/// A model that derives an intrinsic price per share from financial data.
///
/// Models keep the results of their last run so that reports and logs can
/// show how the price was reached.
#[async_trait]
pub trait ValuationModel: Send + Sync + std::fmt::Debug {
    /// Short name of this model (e.g. "jimmy").
    fn name(&self) -> &str;

    /// Runs the valuation against `provider` and returns the intrinsic price
    /// per share.
    ///
    /// Each call starts from a fresh results record.
    async fn calculate_price(&mut self, provider: &dyn FinancialDataProvider) -> Result<f64>;

    /// Results of the last run.
    fn results(&self) -> &ValuationResults;
}
