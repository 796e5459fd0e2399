//! Multi-sheet workbook reports.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use dcf_core::{DcfError, Result};
use dcf_valuation::ValuationResults;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{debug, info, instrument};

use crate::grid::{CellValue, SheetGrid};
use crate::worksheet::ReportWorksheet;

/// Default output directory for reports.
pub const DEFAULT_OUTPUT_DIR: &str = "./reports/";

#[derive(Debug)]
struct QueuedWorksheet {
    worksheet: Box<dyn ReportWorksheet>,
    title: String,
    results: ValuationResults,
}

/// A workbook with one worksheet per valuation.
///
/// Worksheets are queued with [`add_worksheet`](Self::add_worksheet) and
/// written together by [`generate_report`](Self::generate_report), which also
/// records the intrinsic price behind each worksheet in
/// [`price_dict`](Self::price_dict).
#[derive(Debug)]
pub struct WorkbookReport {
    output_dir: PathBuf,
    worksheets: Vec<QueuedWorksheet>,
    price_dict: BTreeMap<String, f64>,
}

impl WorkbookReport {
    /// Creates a report writing into `output_dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns a file system error if the path is empty or cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if output_dir.as_os_str().is_empty() {
            return Err(DcfError::file_system("Invalid report directory: empty path"));
        }

        std::fs::create_dir_all(&output_dir).map_err(|e| {
            DcfError::file_system(format!(
                "Could not create report directory {}",
                output_dir.display()
            ))
            .with_cause(e)
        })?;

        Ok(Self {
            output_dir,
            worksheets: Vec::new(),
            price_dict: BTreeMap::new(),
        })
    }

    /// Queues a worksheet for a completed valuation.
    pub fn add_worksheet(
        &mut self,
        worksheet: impl ReportWorksheet + 'static,
        title: impl Into<String>,
        results: ValuationResults,
    ) {
        self.worksheets.push(QueuedWorksheet {
            worksheet: Box::new(worksheet),
            title: title.into(),
            results,
        });
    }

    /// Directory reports are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Intrinsic price per worksheet title, filled in by `generate_report`.
    ///
    /// Titles are the names the sheets were saved under, so a repeated title
    /// appears with its counter suffix (`AAPL`, `AAPL1`).
    #[must_use]
    pub fn price_dict(&self) -> &BTreeMap<String, f64> {
        &self.price_dict
    }

    /// Number of queued worksheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.worksheets.len()
    }

    /// Returns true if no worksheets are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Writes every queued worksheet to `output_dir/filename`.
    ///
    /// Returns the path of the saved workbook.
    ///
    /// # Errors
    /// Returns a validation error if no worksheets are queued or the filename
    /// is empty, and a report error if a worksheet cannot be prepared or the
    /// workbook cannot be saved.
    #[instrument(skip(self), fields(worksheets = self.worksheets.len()))]
    pub fn generate_report(&mut self, filename: &str) -> Result<PathBuf> {
        if self.worksheets.is_empty() {
            return Err(DcfError::validation("No worksheets were supplied to the report"));
        }

        if filename.is_empty() {
            return Err(DcfError::validation("No report filename was supplied"));
        }

        let mut workbook = Workbook::new();
        let mut used_titles = HashSet::new();
        self.price_dict.clear();

        for queued in &self.worksheets {
            let price = queued.results.intrinsic_value_per_share.ok_or_else(|| {
                DcfError::report(format!(
                    "Could not generate worksheet '{}': valuation has no intrinsic price",
                    queued.title
                ))
            })?;

            let title = unique_title(&queued.title, &mut used_titles);
            if title != queued.title {
                debug!(requested = %queued.title, %title, "Renamed duplicate worksheet");
            }
            self.price_dict.insert(title.clone(), price);

            let grid = queued.worksheet.create_worksheet(&queued.results)?;
            let target = workbook.add_worksheet();
            target.set_name(&title).map_err(|e| write_error(&title, e))?;
            copy_grid(&grid, target).map_err(|e| write_error(&title, e))?;

            debug!(%title, cells = grid.len(), "Added worksheet");
        }

        let path = self.output_dir.join(filename);
        workbook
            .save(&path)
            .map_err(|e| DcfError::report("Error saving report").with_cause(e))?;

        info!("Report saved to {}", path.display());
        Ok(path)
    }
}

/// Returns `title`, or `title` followed by the first free counter when a sheet
/// with that name (ignoring case) already exists.
fn unique_title(title: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = title.to_string();
    let mut counter = 1;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{title}{counter}");
        counter += 1;
    }
    candidate
}

fn write_error(title: &str, e: XlsxError) -> DcfError {
    DcfError::report(format!("Could not write worksheet '{title}'")).with_cause(e)
}

/// Copies a grid cell by cell into `target`, converting to 0-based positions.
fn copy_grid(grid: &SheetGrid, target: &mut Worksheet) -> std::result::Result<(), XlsxError> {
    for ((row, col), cell) in grid.cells() {
        let (row, col) = (row - 1, col - 1);
        let format = cell
            .number_format
            .as_deref()
            .map(|code| Format::new().set_num_format(code));

        match (&cell.value, &format) {
            (CellValue::Number(n), Some(f)) => target.write_number_with_format(row, col, *n, f)?,
            (CellValue::Number(n), None) => target.write_number(row, col, *n)?,
            (CellValue::Text(s), Some(f)) => target.write_string_with_format(row, col, s, f)?,
            (CellValue::Text(s), None) => target.write_string(row, col, s)?,
            (CellValue::Bool(b), Some(f)) => target.write_boolean_with_format(row, col, *b, f)?,
            (CellValue::Bool(b), None) => target.write_boolean(row, col, *b)?,
            (CellValue::Formula(s), Some(f)) => {
                target.write_formula_with_format(row, col, s.as_str(), f)?
            }
            (CellValue::Formula(s), None) => target.write_formula(row, col, s.as_str())?,
        };
    }

    for (col, width) in grid.column_widths() {
        target.set_column_width(col - 1, width)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_results, write_template};
    use crate::worksheet::JimmyReportWorksheet;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("reports").join("2018");

        let report = WorkbookReport::new(&output_dir).unwrap();
        assert!(output_dir.is_dir());
        assert_eq!(report.output_dir(), output_dir.as_path());
        assert!(report.is_empty());
    }

    #[test]
    fn test_new_rejects_empty_path() {
        assert!(matches!(
            WorkbookReport::new(""),
            Err(DcfError::FileSystem { .. })
        ));
    }

    #[test]
    fn test_generate_without_worksheets() {
        let dir = TempDir::new().unwrap();
        let mut report = WorkbookReport::new(dir.path()).unwrap();

        let result = report.generate_report("dcf-2018.xlsx");
        assert!(matches!(result, Err(DcfError::Validation { .. })));
    }

    #[test]
    fn test_generate_without_filename() {
        let dir = TempDir::new().unwrap();
        let template = write_template(dir.path());
        let mut report = WorkbookReport::new(dir.path().join("out")).unwrap();
        report.add_worksheet(
            JimmyReportWorksheet::new(&template).unwrap(),
            "AAPL",
            sample_results(),
        );

        let result = report.generate_report("");
        assert!(matches!(result, Err(DcfError::Validation { .. })));
    }

    #[test]
    fn test_generate_report_with_two_sheets() {
        let dir = TempDir::new().unwrap();
        let template = write_template(dir.path());
        let mut report = WorkbookReport::new(dir.path().join("out")).unwrap();

        let mut msft = sample_results();
        msft.intrinsic_value_per_share = Some(6.208);

        report.add_worksheet(
            JimmyReportWorksheet::new(&template).unwrap(),
            "AAPL",
            sample_results(),
        );
        report.add_worksheet(JimmyReportWorksheet::new(&template).unwrap(), "MSFT", msft);
        assert_eq!(report.len(), 2);

        let path = report.generate_report("dcf-2018.xlsx").unwrap();
        assert!(path.ends_with("dcf-2018.xlsx"));
        assert_eq!(report.price_dict()["AAPL"], 4.618);
        assert_eq!(report.price_dict()["MSFT"], 6.208);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["AAPL".to_string(), "MSFT".to_string()]);

        let range = workbook.worksheet_range("MSFT").unwrap();
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("FY 2014".into())));
        assert_eq!(range.get_value((11, 6)), Some(&Data::Float(6.208)));

        let formulas = workbook.worksheet_formula("MSFT").unwrap();
        let formula = formulas.get_value((12, 6)).cloned().unwrap_or_default();
        assert!(formula.contains("G12*1000"));
    }

    #[test]
    fn test_unique_title() {
        let mut used = HashSet::new();
        assert_eq!(unique_title("AAPL", &mut used), "AAPL");
        assert_eq!(unique_title("MSFT", &mut used), "MSFT");
        assert_eq!(unique_title("AAPL", &mut used), "AAPL1");
        assert_eq!(unique_title("aapl", &mut used), "aapl2");
    }

    #[test]
    fn test_generate_report_with_duplicate_titles() {
        let dir = TempDir::new().unwrap();
        let template = write_template(dir.path());
        let mut report = WorkbookReport::new(dir.path().join("out")).unwrap();

        let mut repeated = sample_results();
        repeated.intrinsic_value_per_share = Some(5.0);

        let worksheet = JimmyReportWorksheet::new(&template).unwrap();
        report.add_worksheet(worksheet.clone(), "AAPL", sample_results());
        report.add_worksheet(worksheet.clone(), "MSFT", sample_results());
        report.add_worksheet(worksheet, "AAPL", repeated);

        let path = report.generate_report("dcf-2018.xlsx").unwrap();
        assert_eq!(report.price_dict().len(), 3);
        assert_eq!(report.price_dict()["AAPL"], 4.618);
        assert_eq!(report.price_dict()["AAPL1"], 5.0);

        let workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec!["AAPL".to_string(), "MSFT".to_string(), "AAPL1".to_string()]
        );
    }

    #[test]
    fn test_generate_report_without_price() {
        let dir = TempDir::new().unwrap();
        let template = write_template(dir.path());
        let mut report = WorkbookReport::new(dir.path().join("out")).unwrap();

        let mut results = sample_results();
        results.intrinsic_value_per_share = None;
        report.add_worksheet(JimmyReportWorksheet::new(&template).unwrap(), "AAPL", results);

        let result = report.generate_report("dcf-2018.xlsx");
        assert!(matches!(result, Err(DcfError::Report { .. })));
    }
}
