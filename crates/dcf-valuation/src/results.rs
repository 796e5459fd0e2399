//! Structured record of a valuation run.

use dcf_core::{Symbol, YearSeries};
use serde::Serialize;

/// Inputs, intermediate values and outputs of a valuation.
///
/// The scalar parameters are set when the model is built; every `Option`
/// field is filled in as the corresponding calculation step completes, so a
/// failed run leaves the later fields empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValuationResults {
    /// Security being valued.
    pub ticker: Symbol,
    /// Discount rate (cost of capital).
    pub discount_rate: f64,
    /// Long term growth rate used by the terminal value.
    pub long_term_growth_rate: f64,
    /// First fiscal year of history.
    pub history_start_year: i32,
    /// Last fiscal year of history, the fiscal year being valued.
    pub history_end_year: i32,
    /// First forecast year.
    pub forecast_start_year: i32,
    /// Last forecast year.
    pub forecast_end_year: i32,

    /// Historical free cash flow to equity.
    pub historical_fcfe: Option<YearSeries<f64>>,
    /// Historical net income.
    pub historical_net_income: Option<YearSeries<f64>>,
    /// Historical total revenue.
    pub historical_revenue: Option<YearSeries<f64>>,
    /// Diluted shares outstanding in the fiscal year.
    pub outstanding_shares: Option<f64>,

    /// FCFE to net income ratio per historical year.
    pub fcfe_ni_ratio: Option<YearSeries<f64>>,
    /// Median FCFE to net income ratio.
    pub calculated_fcfe_ni_ratio: Option<f64>,
    /// Profit margin per historical year.
    pub hist_profit_margin: Option<YearSeries<f64>>,
    /// Median profit margin.
    pub calculated_profit_margin: Option<f64>,
    /// Year over year revenue growth, keyed by the later year.
    pub hist_revenue_growth: Option<YearSeries<f64>>,
    /// Median revenue growth.
    pub calculated_growth_rate: Option<f64>,

    /// Forecast revenue.
    pub revenue_forecast: Option<YearSeries<f64>>,
    /// Forecast net income.
    pub net_income_forecast: Option<YearSeries<f64>>,
    /// Forecast free cash flow to equity.
    pub fcfe_forecast: Option<YearSeries<f64>>,

    /// Forecast cash flows discounted to present value.
    pub discounted_cashflows: Option<YearSeries<f64>>,
    /// Terminal value.
    pub terminal_value: Option<f64>,
    /// Enterprise value.
    pub enterprise_value: Option<f64>,
    /// Sum of the discounted cash flows.
    pub sum_discounted_cashflows: Option<f64>,
    /// Enterprise value divided by diluted shares outstanding.
    pub intrinsic_value_per_share: Option<f64>,
}

impl ValuationResults {
    /// Creates an empty record for `ticker` over the given history and
    /// forecast windows.
    #[must_use]
    pub fn new(
        ticker: Symbol,
        discount_rate: f64,
        long_term_growth_rate: f64,
        history: (i32, i32),
        forecast: (i32, i32),
    ) -> Self {
        Self {
            ticker,
            discount_rate,
            long_term_growth_rate,
            history_start_year: history.0,
            history_end_year: history.1,
            forecast_start_year: forecast.0,
            forecast_end_year: forecast.1,
            ..Self::default()
        }
    }

    /// Fiscal years covered by the history window.
    pub fn history_years(&self) -> std::ops::RangeInclusive<i32> {
        self.history_start_year..=self.history_end_year
    }

    /// Years covered by the forecast window.
    pub fn forecast_years(&self) -> std::ops::RangeInclusive<i32> {
        self.forecast_start_year..=self.forecast_end_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_results_are_empty() {
        let results =
            ValuationResults::new(Symbol::new("aapl"), 0.0975, 0.025, (2014, 2018), (2019, 2022));

        assert_eq!(results.ticker.as_str(), "AAPL");
        assert_eq!(results.history_years().count(), 5);
        assert_eq!(results.forecast_years().count(), 4);
        assert!(results.intrinsic_value_per_share.is_none());
    }

    #[test]
    fn test_serializes_to_json() {
        let mut results =
            ValuationResults::new(Symbol::new("AAPL"), 0.0975, 0.025, (2014, 2018), (2019, 2022));
        results.outstanding_shares = Some(1000.0);

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["outstanding_shares"], 1000.0);
        assert!(json["terminal_value"].is_null());
    }
}
