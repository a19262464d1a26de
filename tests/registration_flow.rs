//! Registration flow against service doubles and the mock camera.

mod common;

use std::sync::Arc;

use common::{mock_camera, services, Call, CallLog, FakeRecognition, FakeStore, Reply};
use face_attendance::camera::CameraError;
use face_attendance::registration::{
    FormField, RegistrationError, RegistrationFlow, RegistrationForm, RegistrationState,
    ValidationError, MIN_IMAGES,
};
use face_attendance::store::StoreError;
use serde_json::json;

fn fill(form: &mut RegistrationForm) {
    form.name = "Asha Rao".to_string();
    form.branch = "CS".to_string();
    form.year = "2".to_string();
    form.roll_number = "CS2201".to_string();
    form.email = "asha@example.edu".to_string();
}

fn accepted() -> Reply {
    Reply::Json(json!({ "status": "success", "face_ids": ["f"], "count": 1 }))
}

#[tokio::test]
async fn test_submit_creates_profile_then_enrolls_each_image() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new().enrolling(vec![accepted()]));
    let (camera, backend, surface) = mock_camera();
    let probe = backend.probe();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    assert_eq!(flow.state(), &RegistrationState::Capturing);
    fill(flow.form_mut());
    for expected in 1..=3 {
        assert_eq!(flow.capture().unwrap(), expected);
    }

    let outcome = flow.submit().await.unwrap();
    assert_eq!(outcome.accepted, 3);
    assert_eq!(outcome.attempted, 3);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.student.roll_number, "CS2201");

    let created = store.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].year, 2);

    let enrolled = recognition.enrolled();
    assert_eq!(enrolled.len(), 3);
    assert!(enrolled
        .iter()
        .all(|e| e.roll_number == "CS2201" && !e.bytes.is_empty()));

    // Success resets the view and releases the camera.
    assert_eq!(
        flow.state(),
        &RegistrationState::Success {
            accepted: 3,
            attempted: 3
        }
    );
    assert_eq!(flow.form(), &RegistrationForm::default());
    assert!(flow.images().is_empty());
    assert!(!flow.camera().is_active());
    assert_eq!(probe.live_tracks(), 0);
    assert!(surface.attached().is_none());
}

#[tokio::test]
async fn test_enrollment_runs_one_at_a_time_in_capture_order() {
    let log = CallLog::new();
    let store = Arc::new(FakeStore {
        log: log.clone(),
        ..FakeStore::default()
    });
    let recognition = Arc::new(
        FakeRecognition::new()
            .enrolling(vec![accepted()])
            .logging_to(&log),
    );
    let (camera, backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    for _ in 0..4 {
        flow.capture().unwrap();
        assert!(backend.advance_frame());
    }
    assert!(flow.remove_image(1).is_some());

    let kept: Vec<Vec<u8>> = flow.images().iter().map(|i| i.bytes.clone()).collect();
    assert_eq!(kept.len(), 3);
    assert_ne!(kept[0], kept[1]);
    assert_ne!(kept[1], kept[2]);
    assert_ne!(kept[0], kept[2]);

    flow.submit().await.unwrap();

    let sent: Vec<Vec<u8>> = recognition
        .enrolled()
        .into_iter()
        .map(|e| e.bytes)
        .collect();
    assert_eq!(sent, kept);
    assert!(!recognition.overlapped());

    let calls = log.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], Call::CreateStudent("CS2201".to_string()));
    for (call, bytes) in calls[1..].iter().zip(&kept) {
        assert_eq!(
            call,
            &Call::RegisterFace {
                roll_number: "CS2201".to_string(),
                bytes: bytes.clone(),
            }
        );
    }
}

#[tokio::test]
async fn test_two_images_rejected_without_external_calls() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    flow.capture().unwrap();
    flow.capture().unwrap();

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::NotEnoughImages {
            captured: 2,
            required: MIN_IMAGES
        })
    ));
    assert!(store.created().is_empty());
    assert!(recognition.enrolled().is_empty());

    // Nothing is lost; the operator can keep capturing.
    assert_eq!(flow.state(), &RegistrationState::Capturing);
    assert_eq!(flow.images().len(), 2);
    assert_eq!(flow.form().roll_number, "CS2201");
    assert!(flow.camera().is_active());
}

#[tokio::test]
async fn test_missing_field_blocks_submission() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    flow.form_mut().set(FormField::Branch, "");
    for _ in 0..3 {
        flow.capture().unwrap();
    }

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::MissingField(FormField::Branch))
    ));
    assert!(store.created().is_empty());
}

#[tokio::test]
async fn test_invalid_email_blocks_submission() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    flow.form_mut().email = "asha.example.edu".to_string();
    for _ in 0..3 {
        flow.capture().unwrap();
    }

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::InvalidEmail(_))
    ));
    assert!(store.created().is_empty());
    assert!(recognition.enrolled().is_empty());
}

#[tokio::test]
async fn test_profile_failure_skips_enrollment_and_keeps_input() {
    let store = Arc::new(FakeStore {
        fail_create: Some(409),
        ..FakeStore::default()
    });
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    for _ in 0..3 {
        flow.capture().unwrap();
    }

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::ProfileCreation(StoreError::Conflict(_))
    ));
    assert_eq!(store.created().len(), 1);
    assert!(recognition.enrolled().is_empty());

    assert!(matches!(flow.state(), RegistrationState::Failed { .. }));
    assert_eq!(flow.form().name, "Asha Rao");
    assert_eq!(flow.images().len(), 3);
    assert!(flow.camera().is_active());
}

#[tokio::test]
async fn test_enrollment_failures_do_not_abort_siblings() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new().enrolling(vec![
        accepted(),
        Reply::Json(json!({ "status": "error", "message": "No faces detected in the image." })),
        Reply::Status(502),
        accepted(),
    ]));
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    for _ in 0..4 {
        flow.capture().unwrap();
    }

    let outcome = flow.submit().await.unwrap();
    assert_eq!(recognition.enrolled().len(), 4);
    assert_eq!(outcome.accepted, 2);
    assert_eq!(outcome.attempted, 4);
    let failed: Vec<usize> = outcome.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2]);
    assert_eq!(outcome.failures[0].message, "No faces detected in the image.");
    assert_eq!(
        flow.state(),
        &RegistrationState::Success {
            accepted: 2,
            attempted: 4
        }
    );
}

#[tokio::test]
async fn test_removed_image_counts_against_minimum() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    for _ in 0..3 {
        flow.capture().unwrap();
    }
    assert!(flow.remove_image(0).is_some());
    assert!(flow.remove_image(7).is_none());

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::NotEnoughImages { captured: 2, .. })
    ));
}

#[test]
fn test_capture_requires_live_camera() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, _backend, _surface) = mock_camera();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    assert!(matches!(flow.capture(), Err(CameraError::NotActive)));
    assert!(flow.images().is_empty());
}

#[test]
fn test_reset_clears_and_releases_camera() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, backend, _surface) = mock_camera();
    let probe = backend.probe();

    let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
    flow.start_camera().unwrap();
    fill(flow.form_mut());
    flow.capture().unwrap();

    flow.reset();
    assert_eq!(flow.state(), &RegistrationState::Idle);
    assert_eq!(flow.form(), &RegistrationForm::default());
    assert!(flow.images().is_empty());
    assert!(!flow.camera().is_active());
    assert_eq!(probe.live_tracks(), 0);
}

#[test]
fn test_dropping_flow_releases_camera() {
    let store = Arc::new(FakeStore::new());
    let recognition = Arc::new(FakeRecognition::new());
    let (camera, backend, _surface) = mock_camera();
    let probe = backend.probe();

    {
        let mut flow = RegistrationFlow::new(services(&store, &recognition), camera);
        flow.start_camera().unwrap();
        assert_eq!(probe.live_tracks(), 1);
    }
    assert_eq!(probe.live_tracks(), 0);
}
