#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Intrinio data provider.
//!
//! This crate implements the dcf-core provider trait for the
//! [Intrinio](https://docs.intrinio.com/documentation/api_v2) API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dcf_intrinio::IntrinioProvider;
//! use dcf_core::{FinancialDataProvider, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = IntrinioProvider::new("your_api_key");
//!     let symbol = Symbol::new("AAPL");
//!
//!     let cashflows = provider
//!         .historical_cashflow_stmt(&symbol, 2014, 2018, None)
//!         .await?;
//!     let shares = provider.outstanding_diluted_shares(&symbol, 2018).await?;
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use dcf_core::{
    DataProvider, DcfError, FinancialDataProvider, Result, StatementKind, StatementRecord,
    Symbol, fiscal_year_period,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Base URL for the Intrinio v2 API.
pub const INTRINIO_BASE_URL: &str = "https://api-v2.intrinio.com";

/// Maximum number of pages followed when reading stock prices.
const MAX_PRICE_PAGES: usize = 50;

/// Intrinio data provider.
///
/// Provides access to:
/// - Standardized income statements, balance sheets and cash flow statements
/// - Yearly historical values of data tags (EPS, book value, diluted shares)
/// - Daily stock prices
#[derive(Clone)]
pub struct IntrinioProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for IntrinioProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrinioProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl IntrinioProvider {
    /// Create a new Intrinio provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: INTRINIO_BASE_URL.to_string(),
        }
    }

    /// Create a new Intrinio provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: INTRINIO_BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a URL with the API key appended.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{}/{endpoint}&api_key={}", self.base_url, self.api_key)
        } else {
            format!("{}/{endpoint}?api_key={}", self.base_url, self.api_key)
        }
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        tracing::debug!("Intrinio request: {}", endpoint);

        let response = self.client.get(&url).send().await.map_err(|e| {
            DcfError::data(format!("Error calling Intrinio API: {endpoint}")).with_cause(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DcfError::data(
                "Authentication failed for Intrinio API, check INTRINIO_API_KEY",
            ));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DcfError::data(format!(
                "Rate limited by Intrinio API: {endpoint}"
            )));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DcfError::data(format!(
                "Error retrieving {endpoint} from Intrinio API"
            ))
            .with_cause(format!("HTTP {status}: {text}")));
        }

        let text = response.text().await.map_err(|e| {
            DcfError::data(format!("Error reading Intrinio response: {endpoint}")).with_cause(e)
        })?;

        serde_json::from_str(&text).map_err(|e| {
            DcfError::validation(format!("Error parsing {endpoint} from Intrinio API"))
                .with_cause(e)
        })
    }

    /// Fetch the standardized financials of one fiscal-year statement.
    async fn fetch_standardized_financials(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        year: i32,
    ) -> Result<Vec<IntrinioStandardizedFinancial>> {
        let endpoint = format!(
            "fundamentals/{}/standardized_financials",
            fundamental_id(symbol, kind, year)
        );
        let response: IntrinioStandardizedFinancials = self.get(&endpoint).await?;
        Ok(response.standardized_financials)
    }

    /// Fetch one page of daily stock prices.
    async fn fetch_price_page(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        next_page: Option<&str>,
    ) -> Result<IntrinioStockPrices> {
        let page_param = next_page
            .map(|p| format!("&next_page={p}"))
            .unwrap_or_default();
        let endpoint = format!(
            "securities/{}/prices?start_date={start}&end_date={end}&frequency=daily{page_param}",
            symbol.as_str()
        );
        self.get(&endpoint).await
    }
}

/// Identifier of a fiscal-year fundamental, e.g. `AAPL-cash_flow_statement-2018-FY`.
fn fundamental_id(symbol: &Symbol, kind: StatementKind, year: i32) -> String {
    format!("{}-{}-{year}-FY", symbol.as_str(), kind.code())
}

impl DataProvider for IntrinioProvider {
    fn name(&self) -> &str {
        "Intrinio"
    }

    fn description(&self) -> &str {
        "Intrinio - Standardized financial statements and stock prices"
    }
}

#[async_trait]
impl FinancialDataProvider for IntrinioProvider {
    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        year: i32,
    ) -> Result<StatementRecord> {
        let financials = self
            .fetch_standardized_financials(symbol, kind, year)
            .await?;

        let mut record = StatementRecord::new();
        for financial in financials {
            let value = financial.value.as_f64().ok_or_else(|| {
                DcfError::data(format!(
                    "Non numeric value for '{}' in {}",
                    financial.data_tag.tag,
                    fundamental_id(symbol, kind, year)
                ))
                .with_cause(financial.value.to_string())
            })?;
            record.insert(financial.data_tag.tag, value);
        }

        Ok(record)
    }

    async fn fetch_metric(&self, symbol: &Symbol, tag: &str, year: i32) -> Result<f64> {
        let (start, end) = fiscal_year_period(year, 0)?;
        let endpoint = format!(
            "companies/{}/historical_data/{tag}?frequency=yearly&start_date={start}&end_date={end}",
            symbol.as_str()
        );

        let response: IntrinioHistoricalData = self.get(&endpoint).await?;

        response
            .historical_data
            .first()
            .and_then(|point| point.value)
            .ok_or_else(|| {
                DcfError::data(format!(
                    "No Data returned for ('{symbol}', {year}) -> '{tag}' from Intrinio API"
                ))
            })
    }

    async fn fetch_daily_close_prices(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        let mut prices = BTreeMap::new();
        let mut next_page: Option<String> = None;

        for _ in 0..MAX_PRICE_PAGES {
            let page = self
                .fetch_price_page(symbol, start, end, next_page.as_deref())
                .await?;

            for price in page.stock_prices {
                let date = NaiveDate::parse_from_str(&price.date, "%Y-%m-%d").map_err(|e| {
                    DcfError::validation(format!(
                        "Invalid price date '{}' for {symbol}",
                        price.date
                    ))
                    .with_cause(e)
                })?;
                if let Some(close) = price.close {
                    prices.insert(date, close);
                }
            }

            match page.next_page.filter(|p| !p.is_empty()) {
                Some(p) => next_page = Some(p),
                None => break,
            }
        }

        Ok(prices)
    }
}

// ============================================================================
// Intrinio API Response Types
// ============================================================================

/// Standardized financials response.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioStandardizedFinancials {
    #[serde(default)]
    standardized_financials: Vec<IntrinioStandardizedFinancial>,
}

/// A single tagged value of a standardized statement.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioStandardizedFinancial {
    data_tag: IntrinioDataTag,
    #[serde(default)]
    value: Value,
}

/// Data tag descriptor.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioDataTag {
    tag: String,
}

/// Historical data response.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioHistoricalData {
    #[serde(default)]
    historical_data: Vec<IntrinioHistoricalPoint>,
}

/// A single historical data point.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioHistoricalPoint {
    value: Option<f64>,
}

/// Stock prices response.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioStockPrices {
    #[serde(default)]
    stock_prices: Vec<IntrinioStockPrice>,
    next_page: Option<String>,
}

/// A single daily stock price.
#[derive(Debug, Clone, Deserialize)]
struct IntrinioStockPrice {
    date: String,
    close: Option<f64>,
}
