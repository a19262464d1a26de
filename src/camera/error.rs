//! Camera error types and acquisition failure classification.

use std::fmt;

/// Why a camera could not be acquired.
///
/// Each class carries its own operator-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireFailure {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    Other,
}

impl AcquireFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AcquireFailure::PermissionDenied => {
                "Camera access denied. Grant camera permission to this terminal and try again."
            }
            AcquireFailure::DeviceNotFound => {
                "No camera found. Connect a camera and try again."
            }
            AcquireFailure::DeviceBusy => {
                "Camera is already in use by another application. Close it and try again."
            }
            AcquireFailure::Other => "Could not start the camera.",
        }
    }
}

impl fmt::Display for AcquireFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

const PERMISSION_MARKERS: &[&str] = &[
    "permission denied",
    "not authorized",
    "not permitted",
    "authorization",
    "access denied",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "no such file or directory",
    "no such device",
    "device not found",
    "no camera",
    "invalid device index",
    "could not find video device",
];

const BUSY_MARKERS: &[&str] = &[
    "device or resource busy",
    "resource busy",
    "already in use",
    "could not lock",
];

/// Classify a backend failure text into one of the acquisition failure classes.
/// Permission markers are checked before busy and not-found markers.
pub fn classify_failure(text: &str) -> AcquireFailure {
    let lower = text.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(PERMISSION_MARKERS) {
        AcquireFailure::PermissionDenied
    } else if has(BUSY_MARKERS) {
        AcquireFailure::DeviceBusy
    } else if has(NOT_FOUND_MARKERS) {
        AcquireFailure::DeviceNotFound
    } else {
        AcquireFailure::Other
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("{}{}", .kind, detail_suffix(.detail))]
    Acquire {
        kind: AcquireFailure,
        detail: Option<String>,
    },

    #[error("FFmpeg not found. Install it (e.g. `brew install ffmpeg` or `apt install ffmpeg`) and try again.")]
    FfmpegNotFound,

    #[error("Camera is not active. Start the camera first.")]
    NotActive,

    #[error("Could not obtain a frame to render: {0}")]
    SurfaceUnavailable(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Failed to stop track '{track}': {message}")]
    TrackStop { track: String, message: String },

    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(" ({})", d),
        _ => String::new(),
    }
}

impl CameraError {
    /// Build an acquisition error, classifying the backend's failure text.
    pub fn acquire(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        CameraError::Acquire {
            kind: classify_failure(&detail),
            detail: Some(detail),
        }
    }

    /// The acquisition class, if this is an acquisition error.
    pub fn acquire_failure(&self) -> Option<AcquireFailure> {
        match self {
            CameraError::Acquire { kind, .. } => Some(*kind),
            CameraError::FfmpegNotFound => Some(AcquireFailure::Other),
            _ => None,
        }
    }
}
