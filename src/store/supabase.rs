//! SupabaseStore - REST access to the hosted attendance database.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::models::{AttendanceRecord, NewStudent, StudentProfile};

/// Environment variable holding the project URL.
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";

/// Environment variable holding the API key.
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_KEY";

/// Denormalized attendance view joined with student fields.
pub const ATTENDANCE_VIEW: &str = "attendance_with_student";

pub const STUDENTS_TABLE: &str = "students";

/// Number of attendance rows fetched per load.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Errors talking to the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record store URL not configured (set {})", SUPABASE_URL_ENV)]
    MissingUrl,

    #[error("Record store key not configured (set {})", SUPABASE_KEY_ENV)]
    MissingKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("A student with this roll number already exists: {0}")]
    Conflict(String),

    #[error("Record store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Insert returned no rows")]
    EmptyInsert,
}

/// Error body PostgREST sends with failed requests.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Client for the Supabase REST interface.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeouts(base_url, api_key, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        let api_key = api_key.into();
        if base_url.trim().is_empty() {
            return Err(StoreError::MissingUrl);
        }
        if api_key.is_empty() {
            return Err(StoreError::MissingKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, resource)
    }

    fn get(&self, resource: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(self.endpoint(resource))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Most recent attendance rows, newest first.
    pub async fn list_attendance(&self, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError> {
        let limit = limit.to_string();
        let response = self
            .get(ATTENDANCE_VIEW)
            .query(&[
                ("select", "*"),
                ("order", "timestamp.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let records: Vec<AttendanceRecord> = parse_rows(response).await?;
        log::info!("Loaded {} attendance record(s)", records.len());
        Ok(records)
    }

    /// Insert a student and return the stored row.
    pub async fn create_student(&self, student: &NewStudent) -> Result<StudentProfile, StoreError> {
        let response = self
            .http_client
            .post(self.endpoint(STUDENTS_TABLE))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(student)
            .send()
            .await?;
        let rows: Vec<StudentProfile> = parse_rows(response).await?;
        let created = rows.into_iter().next().ok_or(StoreError::EmptyInsert)?;
        log::info!("Created student {} ({})", created.name, created.roll_number);
        Ok(created)
    }

    pub async fn list_students(&self) -> Result<Vec<StudentProfile>, StoreError> {
        let response = self
            .get(STUDENTS_TABLE)
            .query(&[("select", "*")])
            .send()
            .await?;
        parse_rows(response).await
    }

    pub async fn find_student_by_roll(
        &self,
        roll_number: &str,
    ) -> Result<Option<StudentProfile>, StoreError> {
        let filter = format!("eq.{}", roll_number);
        let response = self
            .get(STUDENTS_TABLE)
            .query(&[("roll_number", filter.as_str()), ("select", "*")])
            .send()
            .await?;
        let rows: Vec<StudentProfile> = parse_rows(response).await?;
        Ok(rows.into_iter().next())
    }
}

async fn parse_rows<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<PostgrestError>(&text)
            .ok()
            .and_then(|e| e.message.or(e.details))
            .unwrap_or(text);
        log::error!("Record store returned {}: {}", status, message);
        if status == reqwest::StatusCode::CONFLICT {
            return Err(StoreError::Conflict(message));
        }
        return Err(StoreError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| StoreError::MalformedResponse(e.to_string()))
}
