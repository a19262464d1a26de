//! Service handles injected into the flows.
//!
//! Flows never build their own clients; they receive a [`Services`] bundle
//! so tests can swap in doubles.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{ApiError, EnrollmentResponse, RecognitionClient, RecognitionResponse};
use crate::camera::EncodedImage;
use crate::models::{AttendanceRecord, NewStudent, StudentProfile};
use crate::store::{StoreError, SupabaseStore};

/// Face recognition and enrollment.
#[async_trait]
pub trait RecognitionService: Send + Sync {
    async fn recognize_face(&self, image: &EncodedImage) -> Result<RecognitionResponse, ApiError>;

    async fn register_face(
        &self,
        image: &EncodedImage,
        roll_number: &str,
    ) -> Result<EnrollmentResponse, ApiError>;
}

/// Attendance listing and student creation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_attendance(&self, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn create_student(&self, student: &NewStudent) -> Result<StudentProfile, StoreError>;
}

#[async_trait]
impl RecognitionService for RecognitionClient {
    async fn recognize_face(&self, image: &EncodedImage) -> Result<RecognitionResponse, ApiError> {
        RecognitionClient::recognize_face(self, image).await
    }

    async fn register_face(
        &self,
        image: &EncodedImage,
        roll_number: &str,
    ) -> Result<EnrollmentResponse, ApiError> {
        RecognitionClient::register_face(self, image, roll_number).await
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn list_attendance(&self, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError> {
        SupabaseStore::list_attendance(self, limit).await
    }

    async fn create_student(&self, student: &NewStudent) -> Result<StudentProfile, StoreError> {
        SupabaseStore::create_student(self, student).await
    }
}

/// The external services a view talks to.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub recognition: Arc<dyn RecognitionService>,
}

impl Services {
    pub fn new(store: Arc<dyn RecordStore>, recognition: Arc<dyn RecognitionService>) -> Self {
        Self { store, recognition }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
