//! Shared fixtures for report tests.

use std::path::{Path, PathBuf};

use dcf_core::{Symbol, YearSeries};
use dcf_valuation::ValuationResults;
use rust_xlsxwriter::Workbook;

fn series(start: i32, values: &[f64]) -> YearSeries<f64> {
    (start..).zip(values.iter().copied()).collect()
}

/// Results of a completed valuation of AAPL for fiscal 2018.
pub(crate) fn sample_results() -> ValuationResults {
    let mut results =
        ValuationResults::new(Symbol::new("AAPL"), 0.0975, 0.025, (2014, 2018), (2019, 2022));

    results.historical_revenue = Some(series(2014, &[100.0, 200.0, 300.0, 400.0, 500.0]));
    results.historical_net_income = Some(series(2014, &[10.0, 20.0, 30.0, 40.0, 50.0]));
    results.historical_fcfe = Some(series(2014, &[20.0, 40.0, 60.0, 80.0, 100.0]));
    results.outstanding_shares = Some(1000.0);
    results.calculated_growth_rate = Some(5.0 / 12.0);
    results.calculated_profit_margin = Some(0.1);
    results.calculated_fcfe_ni_ratio = Some(2.0);
    results.revenue_forecast = Some(series(2019, &[708.33, 1003.47, 1421.59, 2013.91]));
    results.net_income_forecast = Some(series(2019, &[70.83, 100.35, 142.16, 201.39]));
    results.fcfe_forecast = Some(series(2019, &[141.67, 200.69, 284.32, 402.78]));
    results.discounted_cashflows = Some(series(2019, &[129.08, 166.62, 215.08, 277.63]));
    results.terminal_value = Some(3829.41);
    results.enterprise_value = Some(4617.82);
    results.sum_discounted_cashflows = Some(788.41);
    results.intrinsic_value_per_share = Some(4.618);
    results
}

/// Writes a minimal Jimmy template with row labels and a formula.
pub(crate) fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("dcf_jimmy_template.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("DCF").unwrap();
    for (row, label) in [(1, "Revenue"), (2, "Net Income"), (3, "Free Cash Flow to Equity")] {
        worksheet.write_string(row, 0, label).unwrap();
    }
    worksheet.write_string(12, 0, "Price / Share x 1000").unwrap();
    worksheet.write_formula(12, 6, "=G12*1000").unwrap();
    workbook.save(&path).unwrap();

    path
}
