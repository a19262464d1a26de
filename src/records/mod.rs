//! Attendance record browsing: load, filter and export.

mod browser;
mod export;
mod filter;

pub use browser::{LoadingFlag, RecordBrowser};
pub use export::{export_csv, export_file_name, render_csv, CsvStyle, ExportError, CSV_HEADER};
pub use filter::{distinct_branches, filter_records, FilterCriteria};
