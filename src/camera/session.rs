//! Camera session manager.

use super::backend::{CameraBackend, MediaStream, PreviewSurface};
use super::encode::encode_frame;
use super::error::CameraError;
use super::types::{CameraSettings, EncodedImage, FeedInfo};

/// Owns at most one live camera stream for a view.
///
/// The stream is released by [`CameraSession::stop`], by starting a new
/// stream, or when the session is dropped, whichever comes first.
pub struct CameraSession {
    backend: Box<dyn CameraBackend>,
    surface: Box<dyn PreviewSurface>,
    settings: CameraSettings,
    stream: Option<MediaStream>,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("settings", &self.settings)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl CameraSession {
    pub fn new(
        backend: Box<dyn CameraBackend>,
        surface: Box<dyn PreviewSurface>,
        settings: CameraSettings,
    ) -> Self {
        Self {
            backend,
            surface,
            settings,
            stream: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Acquire the camera and bind it to the preview surface.
    ///
    /// Any stream held from an earlier start is released first. On failure
    /// the session stays inactive and the error carries the failure class.
    pub fn start(&mut self) -> Result<FeedInfo, CameraError> {
        self.stop();

        let stream = self.backend.acquire(&self.settings.constraints).map_err(|e| {
            log::warn!("Camera start failed: {}", e);
            e
        })?;

        let feed = stream.feed_info();
        self.surface.attach(&feed);
        log::info!("Camera active: {} ({})", feed.label, feed.resolution);
        self.stream = Some(stream);
        Ok(feed)
    }

    /// Release the camera. Does nothing when already inactive.
    ///
    /// Every track gets a stop call even if an earlier one fails.
    pub fn stop(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        for track in stream.tracks.iter_mut() {
            if let Err(e) = track.stop() {
                log::warn!("{}", e);
            } else {
                log::debug!("Stopped track {}", track.label());
            }
        }
        self.surface.detach();
        log::info!("Camera stopped: {}", stream.label);
    }

    /// Grab the current frame and encode it with the session's settings.
    pub fn capture_frame(&self) -> Result<EncodedImage, CameraError> {
        let stream = self.stream.as_ref().ok_or(CameraError::NotActive)?;
        let frame = stream.latest_frame()?;
        let image = encode_frame(&frame, &self.settings.encode)?;
        log::debug!(
            "Captured {}x{} frame ({} bytes)",
            image.width,
            image.height,
            image.len()
        );
        Ok(image)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::mock::{MockBackend, MockSurface};
    use crate::camera::{AcquireFailure, ImageFormat, Resolution};

    fn session_with(backend: MockBackend, surface: MockSurface) -> CameraSession {
        CameraSession::new(
            Box::new(backend),
            Box::new(surface),
            CameraSettings::default(),
        )
    }

    #[test]
    fn test_start_binds_feed_to_surface() {
        let surface = MockSurface::new();
        let mut session = session_with(MockBackend::new(), surface.clone());

        let feed = session.start().unwrap();
        assert!(session.is_active());
        assert_eq!(feed.resolution, Resolution::MEDIUM);
        assert_eq!(surface.attached(), Some(feed));
    }

    #[test]
    fn test_start_failure_leaves_session_inactive() {
        let surface = MockSurface::new();
        let backend = MockBackend::new().failing(AcquireFailure::PermissionDenied);
        let mut session = session_with(backend, surface.clone());

        let err = session.start().unwrap_err();
        assert_eq!(err.acquire_failure(), Some(AcquireFailure::PermissionDenied));
        assert!(!session.is_active());
        assert!(surface.attached().is_none());
    }

    #[test]
    fn test_restart_releases_previous_stream() {
        let backend = MockBackend::new().with_tracks(2);
        let probe = backend.probe();
        let mut session = session_with(backend, MockSurface::new());

        session.start().unwrap();
        session.start().unwrap();
        assert_eq!(probe.acquisitions(), 2);
        assert_eq!(probe.live_tracks(), 2);
    }

    #[test]
    fn test_stop_twice_is_noop() {
        let surface = MockSurface::new();
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut session = session_with(backend, surface.clone());

        session.start().unwrap();
        session.stop();
        assert!(!session.is_active());
        assert_eq!(probe.stop_calls(), 1);

        session.stop();
        assert!(!session.is_active());
        assert_eq!(probe.stop_calls(), 1);
        assert!(surface.attached().is_none());
    }

    #[test]
    fn test_stop_continues_past_failing_track() {
        let backend = MockBackend::new().with_tracks(3).with_failing_track(0);
        let probe = backend.probe();
        let mut session = session_with(backend, MockSurface::new());

        session.start().unwrap();
        session.stop();
        assert_eq!(probe.stop_calls(), 3);
        // only the failing track is left live
        assert_eq!(probe.live_tracks(), 1);
        assert!(!session.is_active());
    }

    #[test]
    fn test_drop_releases_camera() {
        let backend = MockBackend::new().with_tracks(2);
        let probe = backend.probe();
        {
            let mut session = session_with(backend, MockSurface::new());
            session.start().unwrap();
            assert_eq!(probe.live_tracks(), 2);
        }
        assert_eq!(probe.live_tracks(), 0);
    }

    #[test]
    fn test_capture_requires_active_session() {
        let session = session_with(MockBackend::new(), MockSurface::new());
        assert!(matches!(session.capture_frame(), Err(CameraError::NotActive)));
    }

    #[test]
    fn test_capture_uses_native_feed_size() {
        let backend = MockBackend::new().with_resolution(Resolution::LOW);
        let mut session = session_with(backend, MockSurface::new());
        session.start().unwrap();

        let image = session.capture_frame().unwrap();
        assert_eq!((image.width, image.height), (320, 240));
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert!(!image.is_empty());
    }

    #[test]
    fn test_capture_follows_new_frames() {
        let backend = MockBackend::new().with_resolution(Resolution::LOW);
        let mut session = session_with(backend.clone(), MockSurface::new());
        session.start().unwrap();

        let first = session.capture_frame().unwrap();
        let again = session.capture_frame().unwrap();
        assert_eq!(first, again);

        assert!(backend.advance_frame());
        let next = session.capture_frame().unwrap();
        assert_ne!(first.bytes, next.bytes);
        assert_eq!(backend.probe().frames_delivered(), 2);
    }

    #[test]
    fn test_capture_without_frame_fails() {
        let backend = MockBackend::new().without_frames();
        let mut session = session_with(backend, MockSurface::new());
        session.start().unwrap();

        let err = session.capture_frame().unwrap_err();
        assert!(matches!(err, CameraError::SurfaceUnavailable(_)));
    }
}
