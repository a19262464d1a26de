//! Domain records shared by the backend client, the record store and the flows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Row identifier as returned by the record store.
///
/// Tables may be keyed by a bigint or a uuid, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// An enrolled student as stored in the `students` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub name: String,
    pub branch: String,
    pub year: u32,
    pub roll_number: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Insert payload for a new student profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStudent {
    pub name: String,
    pub branch: String,
    pub year: u32,
    pub roll_number: String,
    pub email: String,
}

/// One row of the denormalized `attendance_with_student` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    /// Observation time exactly as the store rendered it.
    pub timestamp: String,
    pub confidence: f64,
    pub student_id: RecordId,
    pub name: String,
    pub branch: String,
    pub year: u32,
    pub roll_number: String,
    pub email: String,
}

impl AttendanceRecord {
    /// Confidence as a percentage in `[0, 100]`.
    pub fn confidence_percent(&self) -> f64 {
        clamp_percent(self.confidence)
    }

    /// Confidence formatted for display, e.g. `92.50%`.
    pub fn confidence_display(&self) -> String {
        format_percent(self.confidence)
    }
}

/// Best face match reported by the recognition backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub similarity: f64,
    #[serde(default)]
    pub face_id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Clamp a score into the displayable percentage range.
///
/// NaN is treated as zero.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Render a score as a two-decimal percentage.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", clamp_percent(value))
}
