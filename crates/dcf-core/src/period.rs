//! Fiscal period helpers.

use chrono::{Duration, NaiveDate};

use crate::error::{DcfError, Result};

/// Earliest fiscal year accepted by [`fiscal_year_period`].
pub const MIN_FISCAL_YEAR: i32 = 2000;

/// Latest fiscal year accepted by [`fiscal_year_period`].
pub const MAX_FISCAL_YEAR: i32 = 9999;

/// Largest number of days a fiscal period may be extended by.
pub const MAX_EXTEND_BY_DAYS: i64 = 350;

/// Returns the first and last day of a fiscal year, with the end date
/// optionally extended by `extend_by_days`.
///
/// ```text
/// (2018, 0)  -> (2018-01-01, 2018-12-31)
/// (2018, 10) -> (2018-01-01, 2019-01-10)
/// ```
///
/// # Errors
/// Returns a validation error if `year` is outside `2000..=9999` or
/// `extend_by_days` is outside `0..=350`.
pub fn fiscal_year_period(year: i32, extend_by_days: i64) -> Result<(NaiveDate, NaiveDate)> {
    if !(MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&year) {
        return Err(DcfError::validation(format!(
            "Invalid Date. Must be between {MIN_FISCAL_YEAR} and {MAX_FISCAL_YEAR}, got {year}"
        )));
    }

    if !(0..=MAX_EXTEND_BY_DAYS).contains(&extend_by_days) {
        return Err(DcfError::validation(format!(
            "Invalid extend_by_days. Must be between 0 and {MAX_EXTEND_BY_DAYS}, got {extend_by_days}"
        )));
    }

    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| DcfError::validation(format!("Invalid fiscal year: {year}")))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| DcfError::validation(format!("Invalid fiscal year: {year}")))?
        + Duration::days(extend_by_days);

    Ok((start, end))
}
