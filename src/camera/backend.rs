//! Seams between the session manager and the device layer.

use std::sync::{Arc, Mutex};

use super::error::CameraError;
use super::types::{CaptureConstraints, FeedInfo, Frame, Resolution};

/// Latest frame delivered by a live feed, shared with the producer.
pub type FrameBuffer = Arc<Mutex<Option<Frame>>>;

/// One underlying media track of an acquired stream.
pub trait MediaTrack: Send {
    /// Short label used in logs.
    fn label(&self) -> &str;

    /// Stop the track and release whatever it holds.
    fn stop(&mut self) -> Result<(), CameraError>;
}

/// An acquired device: its tracks plus the shared frame buffer they feed.
pub struct MediaStream {
    pub label: String,
    pub resolution: Resolution,
    pub tracks: Vec<Box<dyn MediaTrack>>,
    pub frames: FrameBuffer,
}

impl MediaStream {
    pub fn feed_info(&self) -> FeedInfo {
        FeedInfo {
            label: self.label.clone(),
            resolution: self.resolution,
        }
    }

    /// Clone out the most recent frame, if one has arrived.
    pub fn latest_frame(&self) -> Result<Frame, CameraError> {
        let buffer = self
            .frames
            .lock()
            .map_err(|_| CameraError::SurfaceUnavailable("frame buffer poisoned".to_string()))?;
        buffer
            .clone()
            .ok_or_else(|| CameraError::SurfaceUnavailable("no frame received yet".to_string()))
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("label", &self.label)
            .field("resolution", &self.resolution)
            .field("tracks", &self.tracks.len())
            .finish_non_exhaustive()
    }
}

/// Something that can hand out camera devices.
pub trait CameraBackend: Send {
    /// Request a device matching `constraints`.
    ///
    /// Failures are reported as [`CameraError::Acquire`] with their class
    /// already worked out.
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<MediaStream, CameraError>;
}

/// Where the live feed is shown while a session is active.
pub trait PreviewSurface: Send {
    fn attach(&mut self, feed: &FeedInfo);
    fn detach(&mut self);
}
