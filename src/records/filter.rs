//! Client-side record filtering.

use std::collections::BTreeSet;

use crate::models::AttendanceRecord;

/// Optional constraints on the loaded records. Unset or blank fields match
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Substring of the record timestamp, usually `YYYY-MM-DD`
    pub date: Option<String>,
    pub branch: Option<String>,
    pub year: Option<u32>,
    /// Case-insensitive substring of the name or roll number
    pub search: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        non_blank(&self.date).is_none()
            && non_blank(&self.branch).is_none()
            && self.year.is_none()
            && non_blank(&self.search).is_none()
    }

    /// Whether `record` satisfies every supplied criterion.
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if let Some(date) = non_blank(&self.date) {
            if !record.timestamp.contains(date) {
                return false;
            }
        }
        if let Some(branch) = non_blank(&self.branch) {
            if record.branch != branch {
                return false;
            }
        }
        if let Some(year) = self.year {
            if record.year != year {
                return false;
            }
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            if !record.name.to_lowercase().contains(&needle)
                && !record.roll_number.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Records matching `criteria`, in their original order.
pub fn filter_records<'a>(
    records: &'a [AttendanceRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a AttendanceRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}

/// Unique branch labels, sorted.
pub fn distinct_branches(records: &[AttendanceRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.branch.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
