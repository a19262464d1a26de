//! CSV export of attendance records.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::models::AttendanceRecord;

pub const CSV_HEADER: [&str; 7] = [
    "Name",
    "Roll Number",
    "Branch",
    "Year",
    "Email",
    "Timestamp",
    "Confidence",
];

/// Errors writing an export file.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Export directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How fields are joined into a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CsvStyle {
    /// Quote fields containing a comma, quote or line break; double inner quotes.
    #[default]
    Quoted,
    /// Plain comma join with no escaping. Matches older exports byte for byte.
    Legacy,
}

/// `attendance_export_<YYYY-MM-DD>.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("attendance_export_{}.csv", date.format("%Y-%m-%d"))
}

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\r', '\n'])
}

fn quote_field(field: &str) -> String {
    if needs_quoting(field) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record_fields(record: &AttendanceRecord) -> [String; 7] {
    [
        record.name.clone(),
        record.roll_number.clone(),
        record.branch.clone(),
        record.year.to_string(),
        record.email.clone(),
        record.timestamp.clone(),
        format!("{:.2}", record.confidence_percent()),
    ]
}

fn join_line<S: AsRef<str>>(fields: &[S], style: CsvStyle) -> String {
    match style {
        CsvStyle::Quoted => fields
            .iter()
            .map(|f| quote_field(f.as_ref()))
            .collect::<Vec<_>>()
            .join(","),
        CsvStyle::Legacy => fields
            .iter()
            .map(|f| f.as_ref())
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Header line plus one line per record, newline separated.
pub fn render_csv<'a, I>(records: I, style: CsvStyle) -> String
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut lines = vec![join_line(&CSV_HEADER, style)];
    for record in records {
        let fields = record_fields(record);
        if style == CsvStyle::Legacy && fields.iter().any(|f| needs_quoting(f)) {
            log::warn!(
                "Record for {} contains a comma, quote or line break; the legacy export will be misaligned",
                record.roll_number
            );
        }
        lines.push(join_line(&fields, style));
    }
    lines.join("\n")
}

/// Write `records` to `<dir>/attendance_export_<date>.csv`.
///
/// Returns `Ok(None)` without touching the filesystem when there is
/// nothing to export. An earlier export from the same date is replaced.
pub fn export_csv(
    records: &[&AttendanceRecord],
    dir: &Path,
    date: NaiveDate,
    style: CsvStyle,
) -> Result<Option<PathBuf>, ExportError> {
    if records.is_empty() {
        log::info!("Nothing to export");
        return Ok(None);
    }
    if !dir.is_dir() {
        return Err(ExportError::MissingDirectory(dir.to_path_buf()));
    }

    let path = dir.join(export_file_name(date));
    if path.exists() {
        log::warn!("Replacing earlier export {}", path.display());
    }
    let contents = render_csv(records.iter().copied(), style);
    std::fs::write(&path, contents).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;

    log::info!("Exported {} record(s) to {}", records.len(), path.display());
    Ok(Some(path))
}
