//! Request and response bodies of the recognition backend.

use serde::{Deserialize, Serialize};

use crate::models::{FaceMatch, StudentProfile};

/// `status` value the backend uses for a successful call.
pub const STATUS_SUCCESS: &str = "success";

/// Body of `POST /recognize-face`.
#[derive(Debug, Serialize)]
pub(crate) struct RecognizeRequest<'a> {
    pub image: &'a str,
}

/// Body of `POST /register-face`.
#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub image: &'a str,
    pub roll_number: &'a str,
}

/// Response of `POST /recognize-face`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognitionResponse {
    pub status: String,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default, rename = "match")]
    pub face_match: Option<FaceMatch>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What a recognition response amounts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    Matched {
        student: StudentProfile,
        face_match: FaceMatch,
    },
    Unmatched {
        message: Option<String>,
    },
}

impl RecognitionResponse {
    /// A match needs a success status plus both the student and the score.
    pub fn into_recognition(self) -> Recognition {
        match (self.status == STATUS_SUCCESS, self.student, self.face_match) {
            (true, Some(student), Some(face_match)) => Recognition::Matched {
                student,
                face_match,
            },
            _ => Recognition::Unmatched {
                message: self.message,
            },
        }
    }
}

/// Response of `POST /register-face`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrollmentResponse {
    pub status: String,
    #[serde(default)]
    pub face_ids: Vec<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl EnrollmentResponse {
    pub fn is_accepted(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
