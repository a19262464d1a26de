//! Face-recognition backend integration.
//!
//! The backend owns face matching, enrollment and the attendance writes
//! that follow a match. This module only speaks its HTTP API.

mod client;
mod types;

pub use client::{
    service_root, ApiError, RecognitionClient, API_URL_ENV, DEFAULT_API_BASE_URL,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT,
};
pub use types::{EnrollmentResponse, HealthStatus, Recognition, RecognitionResponse, STATUS_SUCCESS};
