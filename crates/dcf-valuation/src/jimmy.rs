//! Jimmy discounted cash flow model.
//!
//! A variation of the "Jimmy" method:
//!
//! 1. Read five years of cash flow statements and derive historical free cash
//!    flow to equity (FCFE) and net income.
//! 2. Take the median FCFE / net income ratio.
//! 3. Take the median year over year revenue growth and project revenue four
//!    years forward from the last reported year.
//! 4. Take the median profit margin and forecast net income from the revenue
//!    forecast, then FCFE from the net income forecast.
//! 5. Discount the FCFE forecast, add a terminal value and divide by diluted
//!    shares outstanding.
//!
//! Works best for companies that pay little or no dividends and whose free
//! cash flow tracks profitability.

use async_trait::async_trait;
use dcf_core::{
    DcfError, FinancialDataProvider, MAX_FISCAL_YEAR, MIN_FISCAL_YEAR, Result, Symbol, YearSeries,
};
use std::ops::RangeInclusive;
use tracing::{debug, instrument};

use crate::{
    calculator::{self, EnterpriseValue},
    model::ValuationModel,
    results::ValuationResults,
};

/// Default discount rate (cost of capital).
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.0975;

/// Default long term growth rate.
pub const DEFAULT_LONG_TERM_GROWTH_RATE: f64 = 0.025;

/// Number of fiscal years of history before the valued year.
const HISTORY_YEARS: i32 = 4;

/// Number of forecast years after the valued year.
const FORECAST_YEARS: i32 = 4;

/// Jimmy DCF model for one security and fiscal year.
#[derive(Debug, Clone)]
pub struct JimmyModel {
    symbol: Symbol,
    fiscal_year: i32,
    discount_rate: f64,
    long_term_growth_rate: f64,
    results: ValuationResults,
}

impl JimmyModel {
    /// Creates a model valuing `symbol` as of the end of `fiscal_year`.
    ///
    /// # Errors
    /// Returns a validation error if the symbol is empty or the fiscal year
    /// is outside `2000..=9999`.
    pub fn new(symbol: impl Into<Symbol>, fiscal_year: i32) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(DcfError::validation(
                "Could not create valuation model: ticker symbol is empty",
            ));
        }

        if !(MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&fiscal_year) {
            return Err(DcfError::validation(format!(
                "Could not create valuation model: fiscal year must be between \
                 {MIN_FISCAL_YEAR} and {MAX_FISCAL_YEAR}, got {fiscal_year}"
            )));
        }

        let mut model = Self {
            symbol,
            fiscal_year,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            long_term_growth_rate: DEFAULT_LONG_TERM_GROWTH_RATE,
            results: ValuationResults::default(),
        };
        model.results = model.fresh_results();
        Ok(model)
    }

    /// Sets the discount rate.
    #[must_use]
    pub fn with_discount_rate(mut self, discount_rate: f64) -> Self {
        self.set_discount_rate(discount_rate);
        self
    }

    /// Sets the long term growth rate.
    #[must_use]
    pub fn with_growth_rate(mut self, long_term_growth_rate: f64) -> Self {
        self.set_growth_rate(long_term_growth_rate);
        self
    }

    /// Sets the discount rate used by the next run.
    pub fn set_discount_rate(&mut self, discount_rate: f64) {
        self.discount_rate = discount_rate;
    }

    /// Sets the long term growth rate used by the next run.
    pub fn set_growth_rate(&mut self, long_term_growth_rate: f64) {
        self.long_term_growth_rate = long_term_growth_rate;
    }

    /// Security being valued.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Fiscal year being valued.
    pub fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }

    /// Discount rate.
    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Long term growth rate.
    pub fn growth_rate(&self) -> f64 {
        self.long_term_growth_rate
    }

    fn history_window(&self) -> (i32, i32) {
        (self.fiscal_year - HISTORY_YEARS, self.fiscal_year)
    }

    fn forecast_window(&self) -> (i32, i32) {
        (self.fiscal_year + 1, self.fiscal_year + FORECAST_YEARS)
    }

    fn forecast_years(&self) -> RangeInclusive<i32> {
        let (start, end) = self.forecast_window();
        start..=end
    }

    fn fresh_results(&self) -> ValuationResults {
        ValuationResults::new(
            self.symbol.clone(),
            self.discount_rate,
            self.long_term_growth_rate,
            self.history_window(),
            self.forecast_window(),
        )
    }
}

#[async_trait]
impl ValuationModel for JimmyModel {
    fn name(&self) -> &str {
        "jimmy"
    }

    #[instrument(
        skip(self, provider),
        fields(symbol = %self.symbol, fiscal_year = self.fiscal_year)
    )]
    async fn calculate_price(&mut self, provider: &dyn FinancialDataProvider) -> Result<f64> {
        self.results = self.fresh_results();
        let (history_start, history_end) = self.history_window();
        let history = history_start..=history_end;
        let forecast = self.forecast_years();

        let cashflow_statements = provider
            .historical_cashflow_stmt(&self.symbol, history_start, history_end, None)
            .await?;

        let historical_fcfe = calculator::historical_simple_fcfe(&cashflow_statements)?;
        self.results.historical_fcfe = Some(historical_fcfe.clone());

        let historical_net_income = calculator::historical_net_income(&cashflow_statements)?;
        self.results.historical_net_income = Some(historical_net_income.clone());

        let historical_revenue = provider
            .historical_revenue(&self.symbol, history_start, history_end)
            .await?;
        self.results.historical_revenue = Some(historical_revenue.clone());

        let outstanding_shares = provider
            .outstanding_diluted_shares(&self.symbol, self.fiscal_year)
            .await?;
        self.results.outstanding_shares = Some(outstanding_shares);

        let fcfe_ni_ratio = ratio_by_year(
            &historical_fcfe,
            &historical_net_income,
            history.clone(),
            "fcfe_ni_ratio",
        )?;
        let calculated_fcfe_ni_ratio = calculator::median(fcfe_ni_ratio.values().copied())?;
        self.results.fcfe_ni_ratio = Some(fcfe_ni_ratio);
        self.results.calculated_fcfe_ni_ratio = Some(calculated_fcfe_ni_ratio);

        let hist_revenue_growth = revenue_growth_by_year(&historical_revenue, history.clone())?;
        let calculated_growth_rate = calculator::median(hist_revenue_growth.values().copied())?;
        self.results.hist_revenue_growth = Some(hist_revenue_growth);
        self.results.calculated_growth_rate = Some(calculated_growth_rate);

        let hist_profit_margin = ratio_by_year(
            &historical_net_income,
            &historical_revenue,
            history,
            "profit margin",
        )?;
        let calculated_profit_margin = calculator::median(hist_profit_margin.values().copied())?;
        self.results.hist_profit_margin = Some(hist_profit_margin);
        self.results.calculated_profit_margin = Some(calculated_profit_margin);

        let latest_revenue = year_value(&historical_revenue, history_end, "revenue forecast")?;
        let revenue_forecast =
            compound_forecast(latest_revenue, calculated_growth_rate, forecast.clone());
        self.results.revenue_forecast = Some(revenue_forecast.clone());

        let net_income_forecast = scale_forecast(
            &revenue_forecast,
            calculated_profit_margin,
            forecast.clone(),
            "net income",
        )?;
        self.results.net_income_forecast = Some(net_income_forecast.clone());

        let fcfe_forecast = scale_forecast(
            &net_income_forecast,
            calculated_fcfe_ni_ratio,
            forecast,
            "free cash flow",
        )?;
        self.results.fcfe_forecast = Some(fcfe_forecast.clone());

        let EnterpriseValue {
            enterprise_value,
            discounted_cashflows,
            terminal_value,
            sum_discounted_cashflows,
        } = calculator::calc_enterprise_value(
            &fcfe_forecast,
            self.long_term_growth_rate,
            self.discount_rate,
        )?;
        self.results.discounted_cashflows = Some(discounted_cashflows);
        self.results.terminal_value = Some(terminal_value);
        self.results.enterprise_value = Some(enterprise_value);
        self.results.sum_discounted_cashflows = Some(sum_discounted_cashflows);

        if outstanding_shares <= 0.0 {
            return Err(DcfError::calculation(format!(
                "Could not calculate price per share: \
                 {outstanding_shares} diluted shares outstanding"
            )));
        }

        let intrinsic_value_per_share = enterprise_value / outstanding_shares;
        self.results.intrinsic_value_per_share = Some(intrinsic_value_per_share);

        debug!(intrinsic_value_per_share, "Valuation complete");
        Ok(intrinsic_value_per_share)
    }

    fn results(&self) -> &ValuationResults {
        &self.results
    }
}

fn year_value(series: &YearSeries<f64>, year: i32, what: &str) -> Result<f64> {
    series.get(&year).copied().ok_or_else(|| {
        DcfError::calculation(format!(
            "Could not calculate {what} because there was not enough history"
        ))
        .with_cause(format!("no value for {year}"))
    })
}

/// `numerator[y] / denominator[y]` for every year in `years`.
fn ratio_by_year(
    numerator: &YearSeries<f64>,
    denominator: &YearSeries<f64>,
    years: RangeInclusive<i32>,
    what: &str,
) -> Result<YearSeries<f64>> {
    years
        .map(|year| {
            let n = year_value(numerator, year, what)?;
            let d = year_value(denominator, year, what)?;
            Ok((year, n / d))
        })
        .collect()
}

/// `revenue[y + 1] / revenue[y] - 1`, keyed by `y + 1`.
fn revenue_growth_by_year(
    revenue: &YearSeries<f64>,
    years: RangeInclusive<i32>,
) -> Result<YearSeries<f64>> {
    let (start, end) = years.into_inner();
    (start..end)
        .map(|year| {
            let current = year_value(revenue, year, "revenue growth")?;
            let next = year_value(revenue, year + 1, "revenue growth")?;
            Ok((year + 1, next / current - 1.0))
        })
        .collect()
}

/// Grows `latest` by `growth_rate` once per year, starting with the first year.
fn compound_forecast(latest: f64, growth_rate: f64, years: RangeInclusive<i32>) -> YearSeries<f64> {
    let mut next = latest;
    years
        .map(|year| {
            next *= 1.0 + growth_rate;
            (year, next)
        })
        .collect()
}

fn scale_forecast(
    base: &YearSeries<f64>,
    factor: f64,
    years: RangeInclusive<i32>,
    what: &str,
) -> Result<YearSeries<f64>> {
    years
        .map(|year| {
            base.get(&year)
                .map(|value| (year, value * factor))
                .ok_or_else(|| {
                    DcfError::calculation(format!(
                        "Could not forecast {what} because not enough data was supplied"
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use dcf_core::{DataProvider, StatementKind, StatementRecord, tags};
    use std::collections::BTreeMap;

    /// Five years of cash flow statements (each tag 10, 20, .. 50), revenue
    /// 100 .. 500 and 1000 diluted shares.
    #[derive(Debug)]
    struct FixtureProvider;

    impl DataProvider for FixtureProvider {
        fn name(&self) -> &str {
            "fixture"
        }

        fn description(&self) -> &str {
            "Fixed financial statements for 2014-2018"
        }
    }

    #[async_trait]
    impl FinancialDataProvider for FixtureProvider {
        async fn fetch_statement(
            &self,
            symbol: &Symbol,
            kind: StatementKind,
            year: i32,
        ) -> Result<StatementRecord> {
            if !(2014..=2018).contains(&year) {
                return Err(DcfError::data(format!("No {kind} for {symbol} in {year}")));
            }
            let step = f64::from(year - 2013);
            let record = match kind {
                StatementKind::CashFlowStatement => [
                    (tags::OPERATING_CASH_FLOW, step * 10.0),
                    (tags::CAPITAL_EXPENDITURE, step * 10.0),
                    (tags::NET_INCOME, step * 10.0),
                ]
                .into_iter()
                .map(|(tag, value)| (tag.to_string(), value))
                .collect(),
                StatementKind::IncomeStatement => {
                    [(tags::TOTAL_REVENUE.to_string(), step * 100.0)].into_iter().collect()
                }
                StatementKind::BalanceSheet => StatementRecord::new(),
            };
            Ok(record)
        }

        async fn fetch_metric(&self, _symbol: &Symbol, tag: &str, _year: i32) -> Result<f64> {
            match tag {
                tags::DILUTED_SHARES_OUTSTANDING => Ok(1000.0),
                _ => Err(DcfError::data(format!("unknown tag {tag}"))),
            }
        }

        async fn fetch_daily_close_prices(
            &self,
            _symbol: &Symbol,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<BTreeMap<NaiveDate, f64>> {
            Ok(BTreeMap::new())
        }
    }

    fn round3(value: f64) -> f64 {
        (value * 1000.0).round() / 1000.0
    }

    #[test]
    fn test_empty_symbol_rejected() {
        assert!(matches!(
            JimmyModel::new("", 2018),
            Err(DcfError::Validation { .. })
        ));
        assert!(matches!(
            JimmyModel::new("   ", 2018),
            Err(DcfError::Validation { .. })
        ));
    }

    #[test]
    fn test_out_of_range_fiscal_year_rejected() {
        for year in [i32::MAX, i32::MIN, 1999, MAX_FISCAL_YEAR + 1] {
            assert!(
                matches!(JimmyModel::new("aapl", year), Err(DcfError::Validation { .. })),
                "year {year} should be rejected"
            );
        }
        assert!(JimmyModel::new("aapl", MIN_FISCAL_YEAR).is_ok());
        assert!(JimmyModel::new("aapl", MAX_FISCAL_YEAR).is_ok());
    }

    #[test]
    fn test_defaults_and_windows() {
        let model = JimmyModel::new("aapl", 2018).unwrap();
        assert_eq!(model.name(), "jimmy");
        assert_eq!(model.symbol().as_str(), "AAPL");
        assert_eq!(model.discount_rate(), DEFAULT_DISCOUNT_RATE);
        assert_eq!(model.growth_rate(), DEFAULT_LONG_TERM_GROWTH_RATE);

        let results = model.results();
        assert_eq!(results.history_start_year, 2014);
        assert_eq!(results.history_end_year, 2018);
        assert_eq!(results.forecast_start_year, 2019);
        assert_eq!(results.forecast_end_year, 2022);
    }

    #[tokio::test]
    async fn test_price_with_valid_parameters() {
        let mut model = JimmyModel::new("aapl", 2018)
            .unwrap()
            .with_discount_rate(0.0975)
            .with_growth_rate(0.025);

        let price = model.calculate_price(&FixtureProvider).await.unwrap();
        assert_eq!(round3(price), 4.618);

        model.set_discount_rate(0.08);
        let price = model.calculate_price(&FixtureProvider).await.unwrap();
        assert_eq!(round3(price), 6.208);

        model.set_discount_rate(1.0);
        let price = model.calculate_price(&FixtureProvider).await.unwrap();
        assert_eq!(round3(price), 0.208);
    }

    #[tokio::test]
    async fn test_intermediate_results() {
        let mut model = JimmyModel::new("AAPL", 2018).unwrap();
        let price = model.calculate_price(&FixtureProvider).await.unwrap();
        let results = model.results();

        assert_eq!(results.historical_fcfe.as_ref().unwrap()[&2018], 100.0);
        assert_eq!(results.historical_net_income.as_ref().unwrap()[&2014], 10.0);
        assert_eq!(results.outstanding_shares, Some(1000.0));
        assert_relative_eq!(results.calculated_fcfe_ni_ratio.unwrap(), 2.0);
        assert_relative_eq!(results.calculated_profit_margin.unwrap(), 0.1);
        assert_relative_eq!(results.calculated_growth_rate.unwrap(), 5.0 / 12.0);
        assert_relative_eq!(results.hist_revenue_growth.as_ref().unwrap()[&2015], 1.0);

        let revenue_forecast = results.revenue_forecast.as_ref().unwrap();
        assert_eq!(revenue_forecast.len(), 4);
        assert_relative_eq!(revenue_forecast[&2019], 500.0 * (1.0 + 5.0 / 12.0));

        let fcfe_forecast = results.fcfe_forecast.as_ref().unwrap();
        assert_relative_eq!(
            fcfe_forecast[&2019],
            revenue_forecast[&2019] * 0.1 * 2.0,
            epsilon = 1e-9
        );

        assert_relative_eq!(
            results.enterprise_value.unwrap(),
            results.sum_discounted_cashflows.unwrap() + results.terminal_value.unwrap()
        );
        assert_eq!(results.intrinsic_value_per_share, Some(price));
    }

    #[tokio::test]
    async fn test_price_with_invalid_parameters() {
        for (discount_rate, growth_rate) in [(0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (5.0, 10.0)] {
            let mut model = JimmyModel::new("aapl", 2018)
                .unwrap()
                .with_discount_rate(discount_rate)
                .with_growth_rate(growth_rate);

            let result = model.calculate_price(&FixtureProvider).await;
            assert!(
                matches!(result, Err(DcfError::Calculation { .. })),
                "discount={discount_rate} growth={growth_rate}"
            );
        }
    }

    #[tokio::test]
    async fn test_results_reset_between_runs() {
        let mut model = JimmyModel::new("aapl", 2018).unwrap();
        model.calculate_price(&FixtureProvider).await.unwrap();
        assert!(model.results().intrinsic_value_per_share.is_some());

        model.set_growth_rate(0.5);
        assert!(model.calculate_price(&FixtureProvider).await.is_err());

        let results = model.results();
        assert_eq!(results.long_term_growth_rate, 0.5);
        assert!(results.fcfe_forecast.is_some());
        assert!(results.enterprise_value.is_none());
        assert!(results.intrinsic_value_per_share.is_none());
    }

    #[tokio::test]
    async fn test_missing_history_is_data_error() {
        let mut model = JimmyModel::new("aapl", 2020).unwrap();
        let result = model.calculate_price(&FixtureProvider).await;
        assert!(matches!(result, Err(DcfError::Data { .. })));
    }

    #[test]
    fn test_ratio_missing_year_names_ratio() {
        let fcfe: YearSeries<f64> = [(2014, 20.0), (2015, 40.0)].into_iter().collect();
        let net_income: YearSeries<f64> = [(2014, 10.0)].into_iter().collect();

        let err = ratio_by_year(&fcfe, &net_income, 2014..=2015, "fcfe_ni_ratio").unwrap_err();
        assert!(matches!(err, DcfError::Calculation { .. }));
        assert!(err.to_string().contains("fcfe_ni_ratio"));
    }

    #[test]
    fn test_revenue_growth_by_year() {
        let revenue: YearSeries<f64> = [(2016, 100.0), (2017, 150.0), (2018, 300.0)]
            .into_iter()
            .collect();

        let growth = revenue_growth_by_year(&revenue, 2016..=2018).unwrap();
        assert_eq!(growth.len(), 2);
        assert_relative_eq!(growth[&2017], 0.5);
        assert_relative_eq!(growth[&2018], 1.0);

        assert!(revenue_growth_by_year(&revenue, 2015..=2018).is_err());
    }

    #[test]
    fn test_compound_forecast() {
        let forecast = compound_forecast(100.0, 0.1, 2019..=2021);
        assert_relative_eq!(forecast[&2019], 110.0, epsilon = 1e-9);
        assert_relative_eq!(forecast[&2021], 133.1, epsilon = 1e-9);
    }
}
