//! Financial calculations supporting the valuation models.
//!
//! Everything here is stateless: the functions take already fetched series
//! (or a provider, for the Graham number) and return plain numbers.

use dcf_core::{
    DcfError, FinancialDataProvider, Result, StatementRecord, Symbol, YearSeries, tags,
};
use serde::Serialize;
use tracing::debug;

/// Output of a discounted cash flow calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnterpriseValue {
    /// Sum of the discounted cash flows plus the terminal value.
    pub enterprise_value: f64,
    /// Each forecast cash flow discounted back to present value, by year.
    pub discounted_cashflows: YearSeries<f64>,
    /// Perpetuity value of the last discounted cash flow.
    pub terminal_value: f64,
    /// Sum of the discounted cash flows, excluding the terminal value.
    pub sum_discounted_cashflows: f64,
}

/// Calculates the enterprise value of a cash flow forecast.
///
/// Each forecast value is discounted by `(1 + discount_rate)^n`, where `n` is
/// 1 for the first forecast year, 2 for the second and so on. The terminal
/// value is the last discounted cash flow capitalized at
/// `discount_rate - long_term_growth_rate`.
///
/// # Errors
/// Returns a calculation error if the forecast is empty, if either rate is
/// not strictly positive, or if the growth rate is not below the discount rate.
pub fn calc_enterprise_value(
    forecast: &YearSeries<f64>,
    long_term_growth_rate: f64,
    discount_rate: f64,
) -> Result<EnterpriseValue> {
    if forecast.is_empty() || long_term_growth_rate <= 0.0 || discount_rate <= 0.0 {
        return Err(DcfError::calculation(
            "Could not perform discounted cash flow because the supplied parameters are invalid",
        ));
    }

    if long_term_growth_rate >= discount_rate {
        return Err(DcfError::calculation(format!(
            "Could not perform discounted cash flow because long term growth rate \
             ({long_term_growth_rate}) is not below the discount rate ({discount_rate})"
        )));
    }

    let discounted_cashflows: YearSeries<f64> = forecast
        .iter()
        .zip(1..)
        .map(|((&year, &cashflow), exp)| (year, cashflow / (1.0 + discount_rate).powi(exp)))
        .collect();

    let last_discounted = discounted_cashflows
        .last_key_value()
        .map(|(_, value)| *value)
        .unwrap_or_default();

    let terminal_value = last_discounted / (discount_rate - long_term_growth_rate);
    let sum_discounted_cashflows: f64 = discounted_cashflows.values().sum();
    let enterprise_value = sum_discounted_cashflows + terminal_value;

    debug!(
        enterprise_value,
        terminal_value, sum_discounted_cashflows, "Calculated enterprise value"
    );

    Ok(EnterpriseValue {
        enterprise_value,
        discounted_cashflows,
        terminal_value,
        sum_discounted_cashflows,
    })
}

/// Historical free cash flow to equity, computed as operating cash flow plus
/// capital expenditure (which is reported as a negative number).
///
/// # Errors
/// Returns a data error if any statement lacks either tag.
pub fn historical_simple_fcfe(
    cashflow_statements: &YearSeries<StatementRecord>,
) -> Result<YearSeries<f64>> {
    cashflow_statements
        .iter()
        .map(|(&year, statement)| {
            let operating = statement_value(statement, tags::OPERATING_CASH_FLOW, year, "fcfe")?;
            let capex = statement_value(statement, tags::CAPITAL_EXPENDITURE, year, "fcfe")?;
            Ok((year, operating + capex))
        })
        .collect()
}

/// Historical net income as reported on the cash flow statement.
///
/// # Errors
/// Returns a data error if any statement lacks net income.
pub fn historical_net_income(
    cashflow_statements: &YearSeries<StatementRecord>,
) -> Result<YearSeries<f64>> {
    cashflow_statements
        .iter()
        .map(|(&year, statement)| {
            statement_value(statement, tags::NET_INCOME, year, "net income")
                .map(|net_income| (year, net_income))
        })
        .collect()
}

fn statement_value(statement: &StatementRecord, tag: &str, year: i32, what: &str) -> Result<f64> {
    statement.get(tag).copied().ok_or_else(|| {
        DcfError::data(format!(
            "Could not compute historical {what}, because '{tag}' is missing from the {year} cash flow statement"
        ))
    })
}

/// Calculates the Graham number, `sqrt(15 * 1.5 * eps * book_value_per_share)`.
///
/// # Errors
/// Returns a calculation error if EPS or book value per share is not positive,
/// and propagates any provider error.
pub async fn calc_graham_number(
    provider: &dyn FinancialDataProvider,
    symbol: &Symbol,
    year: i32,
) -> Result<f64> {
    let eps = provider.diluted_eps(symbol, year).await?;
    let book_value_per_share = provider.book_value_per_share(symbol, year).await?;

    if eps <= 0.0 {
        return Err(DcfError::calculation(format!("EPS value [{eps}] is invalid")));
    }

    if book_value_per_share <= 0.0 {
        return Err(DcfError::calculation(format!(
            "Book Value Share per value [{book_value_per_share}] is invalid"
        )));
    }

    Ok((15.0 * 1.5 * eps * book_value_per_share).sqrt())
}

/// Median of a set of values. Even-length inputs average the two middle values.
///
/// # Errors
/// Returns a calculation error if `values` is empty.
pub fn median(values: impl IntoIterator<Item = f64>) -> Result<f64> {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    if sorted.is_empty() {
        return Err(DcfError::calculation("Cannot take the median of no values"));
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}
