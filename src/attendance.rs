//! Attendance check: capture one frame and ask the backend who it is.
//!
//! The backend records attendance itself when it finds a match; this side
//! only reports the outcome.

use std::fmt;

use crate::api::Recognition;
use crate::camera::{CameraError, CameraSession, FeedInfo};
use crate::models::{format_percent, StudentProfile};
use crate::services::Services;

/// Shown when the backend finds no match and gives no reason.
pub const NO_MATCH_MESSAGE: &str = "Face not recognized. Please try again or register first.";

/// Prefix for transport and backend failures.
pub const CHECK_FAILED_MESSAGE: &str = "Error processing attendance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Idle,
    Recognizing,
}

/// Result of one attendance check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Matched {
        student: StudentProfile,
        /// Match score in percent, as reported by the backend
        similarity: f64,
    },
    Unmatched {
        message: String,
    },
    Failed {
        message: String,
    },
}

impl CheckOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, CheckOutcome::Matched { .. })
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Matched {
                student,
                similarity,
            } => write!(
                f,
                "Attendance marked for {} ({}, {} year {}), confidence {}",
                student.name,
                student.roll_number,
                student.branch,
                student.year,
                format_percent(*similarity)
            ),
            CheckOutcome::Unmatched { message } => f.write_str(message),
            CheckOutcome::Failed { message } => f.write_str(message),
        }
    }
}

/// The attendance view: a camera and a recognition service.
#[derive(Debug)]
pub struct AttendanceCheck {
    services: Services,
    camera: CameraSession,
    state: CheckState,
}

impl AttendanceCheck {
    pub fn new(services: Services, camera: CameraSession) -> Self {
        Self {
            services,
            camera,
            state: CheckState::Idle,
        }
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn camera(&self) -> &CameraSession {
        &self.camera
    }

    pub fn start_camera(&mut self) -> Result<FeedInfo, CameraError> {
        self.camera.start()
    }

    pub fn stop_camera(&mut self) {
        self.camera.stop();
    }

    /// Capture one frame and submit it for recognition.
    ///
    /// Camera problems are returned as errors before anything is sent.
    /// Everything after capture ends in a [`CheckOutcome`]; the camera stays
    /// live for the next check.
    pub async fn check_once(&mut self) -> Result<CheckOutcome, CameraError> {
        let image = self.camera.capture_frame()?;

        self.state = CheckState::Recognizing;
        let outcome = match self.services.recognition.recognize_face(&image).await {
            Ok(response) => match response.into_recognition() {
                Recognition::Matched {
                    student,
                    face_match,
                } => {
                    log::info!(
                        "Matched {} ({}) at {}",
                        student.name,
                        student.roll_number,
                        format_percent(face_match.similarity)
                    );
                    CheckOutcome::Matched {
                        student,
                        similarity: face_match.similarity,
                    }
                }
                Recognition::Unmatched { message } => {
                    log::info!("No match: {}", message.as_deref().unwrap_or("-"));
                    CheckOutcome::Unmatched {
                        message: message
                            .filter(|m| !m.trim().is_empty())
                            .unwrap_or_else(|| NO_MATCH_MESSAGE.to_string()),
                    }
                }
            },
            Err(e) => {
                log::error!("Recognition request failed: {}", e);
                CheckOutcome::Failed {
                    message: format!("{}: {}", CHECK_FAILED_MESSAGE, e),
                }
            }
        };
        self.state = CheckState::Idle;

        Ok(outcome)
    }
}
