//! Report worksheets.
//!
//! A [`ReportWorksheet`] knows which template to start from and which cells of
//! that template receive the results of a valuation.

use std::path::{Path, PathBuf};

use dcf_core::{DcfError, Result, YearSeries};
use dcf_valuation::ValuationResults;

use crate::grid::SheetGrid;

/// Default location of the Jimmy DCF template.
pub const DEFAULT_JIMMY_TEMPLATE: &str = "./templates/dcf_jimmy_template.xlsx";

const PERCENT_FORMAT: &str = "0.00%";
const AMOUNT_FORMAT: &str = "#,##0.00";
const PRICE_FORMAT: &str = "$#,##0.000";

/// A worksheet produced from a template and a set of valuation results.
pub trait ReportWorksheet: Send + Sync + std::fmt::Debug {
    /// Path of the `.xlsx` template.
    fn template_path(&self) -> &Path;

    /// Writes `results` into a grid loaded from the template.
    ///
    /// # Errors
    /// Returns a report error if a result the worksheet needs is missing.
    fn prepare_worksheet(&self, sheet: &mut SheetGrid, results: &ValuationResults) -> Result<()>;

    /// Loads the template and prepares it with `results`.
    ///
    /// # Errors
    /// Returns a report error if the template cannot be read or prepared.
    fn create_worksheet(&self, results: &ValuationResults) -> Result<SheetGrid> {
        let mut sheet = SheetGrid::from_xlsx(self.template_path())?;
        self.prepare_worksheet(&mut sheet, results)?;
        Ok(sheet)
    }
}

/// Worksheet for the Jimmy DCF model.
///
/// Cell layout (row, column):
///
/// | cells | contents |
/// |---|---|
/// | (1, 2..=6), (14, 2..=6) | `FY {year}` history labels |
/// | (1, 7..=10), (6, 7..=10) | `{year} Forecast` labels |
/// | (2, 2..), (3, 2..), (4, 2..) | historical revenue, net income, FCFE |
/// | (2, 7..), (3, 7..), (4, 7..) | forecast revenue, net income, FCFE |
/// | (7, 2), (8, 2) | long term growth rate, discount rate |
/// | (7, 7..) | discounted cash flows |
/// | (9, 7), (10, 7), (11, 7), (12, 7) | terminal value, enterprise value, diluted shares, intrinsic price |
/// | (15, 7), (16, 7), (17, 7) | revenue growth, profit margin, FCFE / net income ratio |
#[derive(Debug, Clone)]
pub struct JimmyReportWorksheet {
    template_path: PathBuf,
}

impl JimmyReportWorksheet {
    /// Creates the worksheet from the template at `template_path`.
    ///
    /// # Errors
    /// Returns a validation error if the path is empty.
    pub fn new(template_path: impl Into<PathBuf>) -> Result<Self> {
        let template_path = template_path.into();
        if template_path.as_os_str().is_empty() {
            return Err(DcfError::validation("Invalid parameters: empty template name"));
        }
        Ok(Self { template_path })
    }
}

impl ReportWorksheet for JimmyReportWorksheet {
    fn template_path(&self) -> &Path {
        &self.template_path
    }

    fn prepare_worksheet(&self, sheet: &mut SheetGrid, results: &ValuationResults) -> Result<()> {
        let historical_revenue = required(&results.historical_revenue, "historical_revenue")?;
        let historical_net_income =
            required(&results.historical_net_income, "historical_net_income")?;
        let historical_fcfe = required(&results.historical_fcfe, "historical_fcfe")?;
        let revenue_forecast = required(&results.revenue_forecast, "revenue_forecast")?;
        let net_income_forecast = required(&results.net_income_forecast, "net_income_forecast")?;
        let fcfe_forecast = required(&results.fcfe_forecast, "fcfe_forecast")?;
        let discounted_cashflows =
            required(&results.discounted_cashflows, "discounted_cashflows")?;

        // parameters
        sheet.set_with_format(7, 2, results.long_term_growth_rate, PERCENT_FORMAT);
        sheet.set_with_format(8, 2, results.discount_rate, PERCENT_FORMAT);
        sheet.set_with_format(
            11,
            7,
            *required(&results.outstanding_shares, "outstanding_shares")?,
            AMOUNT_FORMAT,
        );

        // multipliers
        sheet.set_with_format(
            15,
            7,
            *required(&results.calculated_growth_rate, "calculated_growth_rate")?,
            PERCENT_FORMAT,
        );
        sheet.set_with_format(
            16,
            7,
            *required(&results.calculated_profit_margin, "calculated_profit_margin")?,
            PERCENT_FORMAT,
        );
        sheet.set_with_format(
            17,
            7,
            *required(&results.calculated_fcfe_ni_ratio, "calculated_fcfe_ni_ratio")?,
            PERCENT_FORMAT,
        );

        let history_rows = [
            (2, historical_revenue, "historical_revenue"),
            (3, historical_net_income, "historical_net_income"),
            (4, historical_fcfe, "historical_fcfe"),
        ];
        for (col, year) in (2..).zip(results.history_years()) {
            let label = format!("FY {year}");
            sheet.set(1, col, label.clone());
            sheet.set(14, col, label);

            for (row, series, field) in history_rows {
                sheet.set_with_format(row, col, year_value(series, year, field)?, AMOUNT_FORMAT);
            }
        }

        let forecast_rows = [
            (2, revenue_forecast, "revenue_forecast"),
            (3, net_income_forecast, "net_income_forecast"),
            (4, fcfe_forecast, "fcfe_forecast"),
            (7, discounted_cashflows, "discounted_cashflows"),
        ];
        for (col, year) in (7..).zip(results.forecast_years()) {
            let label = format!("{year} Forecast");
            sheet.set(1, col, label.clone());
            sheet.set(6, col, label);

            for (row, series, field) in forecast_rows {
                sheet.set_with_format(row, col, year_value(series, year, field)?, AMOUNT_FORMAT);
            }
        }

        // outputs
        let terminal_value = *required(&results.terminal_value, "terminal_value")?;
        let enterprise_value = *required(&results.enterprise_value, "enterprise_value")?;
        sheet.set_with_format(9, 7, terminal_value, AMOUNT_FORMAT);
        sheet.set_with_format(10, 7, enterprise_value, AMOUNT_FORMAT);
        sheet.set_with_format(
            12,
            7,
            *required(&results.intrinsic_value_per_share, "intrinsic_value_per_share")?,
            PRICE_FORMAT,
        );

        sheet.set_column_width(1, 32.0);
        for col in 2..=10 {
            sheet.set_column_width(col, 18.0);
        }

        Ok(())
    }
}

fn required<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| {
        DcfError::report(format!(
            "Could not prepare report because of an error with report parameters: missing '{field}'"
        ))
    })
}

fn year_value(series: &YearSeries<f64>, year: i32, field: &str) -> Result<f64> {
    series.get(&year).copied().ok_or_else(|| {
        DcfError::report(format!(
            "Could not prepare report because of an error with report parameters: '{field}' has no value for {year}"
        ))
    })
}
