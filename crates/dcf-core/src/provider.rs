//! Provider traits for fetching financial data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`FinancialDataProvider`] - Standardized statements, yearly metrics and daily prices
//!
//! Providers implement three primitives (one statement, one metric, one price
//! range). The historical helpers consumed by the valuation engine are provided
//! on top of them so that caching layers and test fixtures only need to supply
//! the primitives.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

use crate::{
    error::{DcfError, Result},
    tags,
    types::{StatementKind, StatementRecord, Symbol, YearSeries, filter_statement},
};

/// Number of days looked back when searching for the latest close price.
pub const LATEST_PRICE_LOOKBACK_DAYS: i64 = 5;

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Intrinio").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for historical financial statement data.
#[async_trait]
pub trait FinancialDataProvider: DataProvider {
    /// Fetches the complete standardized statement of `kind` for a fiscal year.
    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        year: i32,
    ) -> Result<StatementRecord>;

    /// Fetches the yearly value of a data tag (e.g. `adjdilutedeps`) for a fiscal year.
    async fn fetch_metric(&self, symbol: &Symbol, tag: &str, year: i32) -> Result<f64>;

    /// Fetches daily close prices between `start` and `end`, inclusive.
    async fn fetch_daily_close_prices(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>>;

    /// Fetches one statement per fiscal year in `year_from..=year_to`, keeping
    /// only the tags in `tag_filter` (all tags when `None`).
    async fn historical_statements(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        year_from: i32,
        year_to: i32,
        tag_filter: Option<&[&str]>,
    ) -> Result<YearSeries<StatementRecord>> {
        if year_from > year_to {
            return Err(DcfError::validation(format!(
                "Invalid year range {year_from}..{year_to} for {symbol} {kind}"
            )));
        }

        let mut statements = YearSeries::new();
        for year in year_from..=year_to {
            let record = self.fetch_statement(symbol, kind, year).await?;
            statements.insert(year, filter_statement(record, tag_filter));
        }

        Ok(statements)
    }

    /// Historical cash flow statements keyed by fiscal year.
    async fn historical_cashflow_stmt(
        &self,
        symbol: &Symbol,
        year_from: i32,
        year_to: i32,
        tag_filter: Option<&[&str]>,
    ) -> Result<YearSeries<StatementRecord>> {
        self.historical_statements(
            symbol,
            StatementKind::CashFlowStatement,
            year_from,
            year_to,
            tag_filter,
        )
        .await
    }

    /// Historical income statements keyed by fiscal year.
    async fn historical_income_stmt(
        &self,
        symbol: &Symbol,
        year_from: i32,
        year_to: i32,
        tag_filter: Option<&[&str]>,
    ) -> Result<YearSeries<StatementRecord>> {
        self.historical_statements(
            symbol,
            StatementKind::IncomeStatement,
            year_from,
            year_to,
            tag_filter,
        )
        .await
    }

    /// Historical balance sheets keyed by fiscal year.
    async fn historical_balance_sheet(
        &self,
        symbol: &Symbol,
        year_from: i32,
        year_to: i32,
        tag_filter: Option<&[&str]>,
    ) -> Result<YearSeries<StatementRecord>> {
        self.historical_statements(
            symbol,
            StatementKind::BalanceSheet,
            year_from,
            year_to,
            tag_filter,
        )
        .await
    }

    /// Historical total revenue keyed by fiscal year.
    ///
    /// # Errors
    /// Returns a data error if any year's income statement lacks total revenue.
    async fn historical_revenue(
        &self,
        symbol: &Symbol,
        year_from: i32,
        year_to: i32,
    ) -> Result<YearSeries<f64>> {
        let statements = self
            .historical_income_stmt(symbol, year_from, year_to, Some(&[tags::TOTAL_REVENUE]))
            .await?;

        statements
            .into_iter()
            .map(|(year, stmt)| {
                stmt.get(tags::TOTAL_REVENUE)
                    .copied()
                    .map(|revenue| (year, revenue))
                    .ok_or_else(|| {
                        DcfError::data(format!(
                            "Income statement for ('{symbol}', {year}) has no '{}'",
                            tags::TOTAL_REVENUE
                        ))
                    })
            })
            .collect()
    }

    /// Weighted average diluted shares outstanding for a fiscal year.
    async fn outstanding_diluted_shares(&self, symbol: &Symbol, year: i32) -> Result<f64> {
        self.fetch_metric(symbol, tags::DILUTED_SHARES_OUTSTANDING, year)
            .await
    }

    /// Diluted EPS, adjusted for stock splits, for a fiscal year.
    async fn diluted_eps(&self, symbol: &Symbol, year: i32) -> Result<f64> {
        self.fetch_metric(symbol, tags::ADJUSTED_DILUTED_EPS, year).await
    }

    /// Book value per share for a fiscal year.
    async fn book_value_per_share(&self, symbol: &Symbol, year: i32) -> Result<f64> {
        self.fetch_metric(symbol, tags::BOOK_VALUE_PER_SHARE, year)
            .await
    }

    /// Daily close prices keyed by date.
    async fn daily_close_prices(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        if start > end {
            return Err(DcfError::validation(format!(
                "Invalid price range {start}..{end} for {symbol}"
            )));
        }
        self.fetch_daily_close_prices(symbol, start, end).await
    }

    /// Most recent close price within the few days leading up to `as_of`.
    ///
    /// # Errors
    /// Returns a data error if no price was reported in the look-back window.
    async fn latest_close_price(&self, symbol: &Symbol, as_of: NaiveDate) -> Result<f64> {
        let start = as_of - Duration::days(LATEST_PRICE_LOOKBACK_DAYS);
        let prices = self.daily_close_prices(symbol, start, as_of).await?;
        debug!(%symbol, %start, %as_of, days = prices.len(), "Close prices for look-back window");

        prices
            .last_key_value()
            .map(|(_, price)| *price)
            .ok_or_else(|| {
                DcfError::data(format!(
                    "No close price for {symbol} between {start} and {as_of}"
                ))
            })
    }
}
