//! Attendance check flow against service doubles and the mock camera.

mod common;

use std::sync::Arc;

use common::{mock_camera, services, student_json, FakeRecognition, FakeStore, Reply};
use face_attendance::attendance::{
    AttendanceCheck, CheckOutcome, CheckState, CHECK_FAILED_MESSAGE, NO_MATCH_MESSAGE,
};
use face_attendance::camera::CameraError;
use face_attendance::models::format_percent;
use serde_json::json;

fn check_with(reply: Reply) -> (AttendanceCheck, Arc<FakeRecognition>) {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new().recognizing(reply));
    let (camera, _backend, _surface) = mock_camera();
    let check = AttendanceCheck::new(services(&store, &recognition), camera);
    (check, recognition)
}

#[tokio::test]
async fn test_match_reports_student_and_similarity() {
    let (mut check, recognition) = check_with(Reply::Json(json!({
        "status": "success",
        "student": student_json(),
        "match": { "similarity": 92.5 }
    })));
    check.start_camera().unwrap();

    let outcome = check.check_once().await.unwrap();
    match &outcome {
        CheckOutcome::Matched {
            student,
            similarity,
        } => {
            assert_eq!(student.name, "Asha Rao");
            assert_eq!(format_percent(*similarity), "92.50%");
        }
        other => panic!("Expected a match, got {:?}", other),
    }
    assert!(outcome.to_string().ends_with("confidence 92.50%"));

    assert_eq!(recognition.recognize_calls(), 1);
    assert_eq!(check.state(), CheckState::Idle);
    assert!(check.camera().is_active());
}

#[tokio::test]
async fn test_no_match_uses_backend_message() {
    let (mut check, _recognition) = check_with(Reply::Json(json!({
        "status": "error",
        "message": "No matching face found"
    })));
    check.start_camera().unwrap();

    let outcome = check.check_once().await.unwrap();
    assert_eq!(
        outcome,
        CheckOutcome::Unmatched {
            message: "No matching face found".to_string()
        }
    );
}

#[tokio::test]
async fn test_success_without_match_is_unmatched_with_fallback() {
    let (mut check, _recognition) = check_with(Reply::Json(json!({
        "status": "success",
        "student": student_json()
    })));
    check.start_camera().unwrap();

    let outcome = check.check_once().await.unwrap();
    assert_eq!(
        outcome,
        CheckOutcome::Unmatched {
            message: NO_MATCH_MESSAGE.to_string()
        }
    );
}

#[tokio::test]
async fn test_transport_error_is_failed_outcome() {
    let (mut check, _recognition) = check_with(Reply::Status(503));
    check.start_camera().unwrap();

    let outcome = check.check_once().await.unwrap();
    match outcome {
        CheckOutcome::Failed { message } => {
            assert!(message.starts_with(CHECK_FAILED_MESSAGE));
            assert!(message.contains("503"));
        }
        other => panic!("Expected a failure, got {:?}", other),
    }
    assert_eq!(check.state(), CheckState::Idle);
    assert!(check.camera().is_active());
}

#[tokio::test]
async fn test_check_without_camera_sends_nothing() {
    let (mut check, recognition) = check_with(Reply::Json(json!({ "status": "error" })));

    let err = check.check_once().await.unwrap_err();
    assert!(matches!(err, CameraError::NotActive));
    assert_eq!(recognition.recognize_calls(), 0);
}

#[tokio::test]
async fn test_repeated_checks_reuse_camera() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new().recognizing(Reply::Json(json!({
        "status": "error",
        "message": "No matching face found"
    }))));
    let (camera, backend, _surface) = mock_camera();
    let probe = backend.probe();
    let mut check = AttendanceCheck::new(services(&store, &recognition), camera);
    check.start_camera().unwrap();

    for _ in 0..3 {
        check.check_once().await.unwrap();
    }
    assert_eq!(recognition.recognize_calls(), 3);
    assert_eq!(probe.acquisitions(), 1);

    check.stop_camera();
    assert_eq!(probe.live_tracks(), 0);
}
