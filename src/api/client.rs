//! RecognitionClient - handles communication with the face-recognition backend.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::types::{
    EnrollmentResponse, HealthStatus, RecognitionResponse, RecognizeRequest, RegisterRequest,
};
use crate::camera::EncodedImage;
use crate::models::StudentProfile;

/// The environment variable overriding the backend base address.
pub const API_URL_ENV: &str = "ATTENDANCE_API_URL";

/// Default base address of the backend API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default timeout for HTTP requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors talking to the recognition backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Client for the recognition backend.
#[derive(Debug, Clone)]
pub struct RecognitionClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl RecognitionClient {
    /// Create a client from `ATTENDANCE_API_URL`, falling back to the
    /// default local address.
    pub fn new() -> Result<Self, ApiError> {
        let base_url =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        Self::with_base_url(base_url)
    }

    /// Create a client for an explicit base address.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with custom request and connect timeouts.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the backend who is in `image`.
    ///
    /// A service-reported "no match" comes back as a normal response; only
    /// transport problems and unparseable bodies are errors.
    pub async fn recognize_face(
        &self,
        image: &EncodedImage,
    ) -> Result<RecognitionResponse, ApiError> {
        let url = format!("{}/recognize-face", self.base_url);
        let data_url = image.to_data_url();
        let body = RecognizeRequest { image: &data_url };

        log::debug!("POST {} ({} byte image)", url, image.len());
        let response = self.http_client.post(&url).json(&body).send().await?;
        parse_json(response).await
    }

    /// Enroll one face image against the student with `roll_number`.
    pub async fn register_face(
        &self,
        image: &EncodedImage,
        roll_number: &str,
    ) -> Result<EnrollmentResponse, ApiError> {
        let url = format!("{}/register-face", self.base_url);
        let data_url = image.to_data_url();
        let body = RegisterRequest {
            image: &data_url,
            roll_number,
        };

        log::debug!("POST {} for {} ({} byte image)", url, roll_number, image.len());
        let response = self.http_client.post(&url).json(&body).send().await?;
        parse_json(response).await
    }

    /// List students through the backend.
    pub async fn list_students(&self) -> Result<Vec<StudentProfile>, ApiError> {
        let url = format!("{}/students", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        // The backend answers `null` when its own store call failed.
        let students: Option<Vec<StudentProfile>> = parse_json(response).await?;
        students.ok_or_else(|| {
            ApiError::MalformedResponse("backend could not list students".to_string())
        })
    }

    /// Check the backend's health endpoint, which lives outside the API prefix.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = format!("{}/health", service_root(&self.base_url));
        let response = self.http_client.get(&url).send().await?;
        parse_json(response).await
    }
}

/// Strip a trailing `/api` segment from the base address.
pub fn service_root(base_url: &str) -> &str {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}

/// Decode a JSON body, accepting error statuses that still carry a
/// well-formed body.
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    match serde_json::from_str::<T>(&text) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        }),
        Err(e) => Err(ApiError::MalformedResponse(e.to_string())),
    }
}
