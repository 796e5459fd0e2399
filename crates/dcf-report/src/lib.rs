#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Spreadsheet reports for valuation results.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dcf_report::{JimmyReportWorksheet, WorkbookReport};
//!
//! let mut report = WorkbookReport::new("./reports/")?;
//! let worksheet = JimmyReportWorksheet::new("./templates/dcf_jimmy_template.xlsx")?;
//! report.add_worksheet(worksheet, "AAPL", model.results().clone());
//! report.generate_report("dcf-2018.xlsx")?;
//! ```

/// In-memory worksheet contents.
pub mod grid;
/// Multi-sheet workbook reports.
pub mod workbook;
/// Template-backed report worksheets.
pub mod worksheet;

#[cfg(test)]
mod test_support;

pub use grid::{Cell, CellValue, SheetGrid};
pub use workbook::{DEFAULT_OUTPUT_DIR, WorkbookReport};
pub use worksheet::{DEFAULT_JIMMY_TEMPLATE, JimmyReportWorksheet, ReportWorksheet};
