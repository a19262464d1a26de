//! Service doubles shared by the flow tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use face_attendance::api::{ApiError, EnrollmentResponse, RecognitionResponse};
use face_attendance::camera::mock::{MockBackend, MockSurface};
use face_attendance::camera::{CameraSession, CameraSettings, EncodedImage, Resolution};
use face_attendance::models::{AttendanceRecord, NewStudent, RecordId, StudentProfile};
use face_attendance::services::{RecognitionService, RecordStore, Services};
use face_attendance::store::StoreError;
use serde_json::json;
use tokio::sync::Notify;

/// One call made against the service doubles.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateStudent(String),
    RegisterFace { roll_number: String, bytes: Vec<u8> },
}

/// Calls across both doubles, in the order they were made.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

/// Canned reply for one backend call.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(serde_json::Value),
    Status(u16),
}

fn api_result<T: serde::de::DeserializeOwned>(reply: &Reply) -> Result<T, ApiError> {
    match reply {
        Reply::Json(value) => serde_json::from_value(value.clone())
            .map_err(|e| ApiError::MalformedResponse(e.to_string())),
        Reply::Status(status) => Err(ApiError::Status {
            status: *status,
            body: "unavailable".to_string(),
        }),
    }
}

/// An image received by `register_face`.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub roll_number: String,
    pub bytes: Vec<u8>,
}

/// Recognition backend double. Replies are consumed in call order; when
/// the list runs out the last reply repeats.
#[derive(Debug, Default)]
pub struct FakeRecognition {
    recognize_replies: Vec<Reply>,
    enroll_replies: Vec<Reply>,
    recognize_calls: AtomicUsize,
    enrolled: Mutex<Vec<Enrollment>>,
    enrolling_now: AtomicBool,
    overlapped: AtomicBool,
    log: CallLog,
}

impl FakeRecognition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recognizing(mut self, reply: Reply) -> Self {
        self.recognize_replies.push(reply);
        self
    }

    pub fn enrolling(mut self, replies: Vec<Reply>) -> Self {
        self.enroll_replies = replies;
        self
    }

    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn recognize_calls(&self) -> usize {
        self.recognize_calls.load(Ordering::SeqCst)
    }

    /// Every enrollment call, in arrival order.
    pub fn enrolled(&self) -> Vec<Enrollment> {
        self.enrolled.lock().unwrap().clone()
    }

    /// True if an enrollment started while another was still running.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn pick(replies: &[Reply], call: usize) -> Reply {
        replies
            .get(call)
            .or_else(|| replies.last())
            .cloned()
            .unwrap_or_else(|| Reply::Json(json!({ "status": "success" })))
    }
}

#[async_trait]
impl RecognitionService for FakeRecognition {
    async fn recognize_face(&self, _image: &EncodedImage) -> Result<RecognitionResponse, ApiError> {
        let call = self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        api_result(&Self::pick(&self.recognize_replies, call))
    }

    async fn register_face(
        &self,
        image: &EncodedImage,
        roll_number: &str,
    ) -> Result<EnrollmentResponse, ApiError> {
        if self.enrolling_now.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        let call = {
            let mut enrolled = self.enrolled.lock().unwrap();
            enrolled.push(Enrollment {
                roll_number: roll_number.to_string(),
                bytes: image.bytes.clone(),
            });
            enrolled.len() - 1
        };
        self.log.push(Call::RegisterFace {
            roll_number: roll_number.to_string(),
            bytes: image.bytes.clone(),
        });

        // Give a concurrent caller the chance to start its own call.
        tokio::task::yield_now().await;
        self.enrolling_now.store(false, Ordering::SeqCst);
        api_result(&Self::pick(&self.enroll_replies, call))
    }
}

/// Record store double.
#[derive(Debug, Default)]
pub struct FakeStore {
    pub records: Vec<AttendanceRecord>,
    pub fail_list: AtomicBool,
    pub fail_create: Option<u16>,
    pub created: Mutex<Vec<NewStudent>>,
    pub list_calls: AtomicUsize,
    pub log: CallLog,
    /// When set, `list_attendance` waits for a notification first.
    pub gate: Option<Arc<Notify>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<AttendanceRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_list.store(failing, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<NewStudent> {
        self.created.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn list_attendance(&self, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(self.records.iter().take(limit).cloned().collect())
    }

    async fn create_student(&self, student: &NewStudent) -> Result<StudentProfile, StoreError> {
        self.created.lock().unwrap().push(student.clone());
        self.log.push(Call::CreateStudent(student.roll_number.clone()));
        match self.fail_create {
            Some(409) => Err(StoreError::Conflict("duplicate key".to_string())),
            Some(status) => Err(StoreError::Api {
                status,
                message: "insert failed".to_string(),
            }),
            None => Ok(StudentProfile {
                id: Some(RecordId::Int(7)),
                name: student.name.clone(),
                branch: student.branch.clone(),
                year: student.year,
                roll_number: student.roll_number.clone(),
                email: student.email.clone(),
                created_at: Some("2024-03-01T08:00:00+00:00".to_string()),
            }),
        }
    }
}

pub fn services(store: &Arc<FakeStore>, recognition: &Arc<FakeRecognition>) -> Services {
    Services::new(store.clone(), recognition.clone())
}

/// Camera session over a small mock feed.
pub fn mock_camera() -> (CameraSession, MockBackend, MockSurface) {
    let backend = MockBackend::new().with_resolution(Resolution {
        width: 32,
        height: 24,
    });
    let surface = MockSurface::new();
    let session = CameraSession::new(
        Box::new(backend.clone()),
        Box::new(surface.clone()),
        CameraSettings::default(),
    );
    (session, backend, surface)
}

pub fn student_json() -> serde_json::Value {
    json!({
        "id": 7,
        "name": "Asha Rao",
        "branch": "CS",
        "year": 2,
        "roll_number": "CS2201",
        "email": "asha@example.edu"
    })
}

pub fn record(id: i64, name: &str, roll: &str, branch: &str, year: u32, ts: &str) -> AttendanceRecord {
    AttendanceRecord {
        id: RecordId::Int(id),
        timestamp: ts.to_string(),
        confidence: 88.0,
        student_id: RecordId::Int(id + 100),
        name: name.to_string(),
        branch: branch.to_string(),
        year,
        roll_number: roll.to_string(),
        email: format!("{}@example.edu", roll.to_lowercase()),
    }
}
