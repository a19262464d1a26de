//! In-memory camera backend for tests and demos without hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::backend::{CameraBackend, FrameBuffer, MediaStream, MediaTrack, PreviewSurface};
use super::error::{AcquireFailure, CameraError};
use super::types::{CaptureConstraints, FeedInfo, Frame, Resolution};

/// Counters shared between a [`MockBackend`] and the test observing it.
#[derive(Debug, Default)]
pub struct MockProbe {
    acquisitions: AtomicUsize,
    live_tracks: AtomicUsize,
    stop_calls: AtomicUsize,
    frames_delivered: AtomicUsize,
    feed: Mutex<Option<FrameBuffer>>,
}

impl MockProbe {
    /// Number of successful acquisitions.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Tracks handed out and not yet stopped.
    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    /// Every `MediaTrack::stop` call, failed ones included.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Frames written to any feed so far.
    pub fn frames_delivered(&self) -> usize {
        self.frames_delivered.load(Ordering::SeqCst)
    }
}

/// Camera backend producing a synthetic gradient feed.
#[derive(Debug, Clone)]
pub struct MockBackend {
    resolution: Option<Resolution>,
    tracks: usize,
    failing_tracks: Vec<usize>,
    fail_with: Option<AcquireFailure>,
    deliver_frames: bool,
    probe: Arc<MockProbe>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            resolution: None,
            tracks: 1,
            failing_tracks: Vec::new(),
            fail_with: None,
            deliver_frames: true,
            probe: Arc::new(MockProbe::default()),
        }
    }

    /// Deliver frames at this size instead of the requested one.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Hand out `count` tracks per stream.
    pub fn with_tracks(mut self, count: usize) -> Self {
        self.tracks = count;
        self
    }

    /// Make the track at `index` fail when stopped.
    pub fn with_failing_track(mut self, index: usize) -> Self {
        self.failing_tracks.push(index);
        self
    }

    /// Fail every acquisition with this class.
    pub fn failing(mut self, failure: AcquireFailure) -> Self {
        self.fail_with = Some(failure);
        self
    }

    /// Acquire successfully but never deliver a frame.
    pub fn without_frames(mut self) -> Self {
        self.deliver_frames = false;
        self
    }

    pub fn probe(&self) -> Arc<MockProbe> {
        Arc::clone(&self.probe)
    }

    /// Push a new frame into the most recently acquired feed.
    ///
    /// Every frame carries its sequence number in the pixel data, so
    /// captures taken between two calls encode to different bytes.
    /// Returns false when there is no feed or it delivers no frames.
    pub fn advance_frame(&self) -> bool {
        let Ok(feed) = self.probe.feed.lock() else {
            return false;
        };
        let Some(buffer) = feed.as_ref() else {
            return false;
        };
        let Ok(mut slot) = buffer.lock() else {
            return false;
        };
        let Some(current) = slot.as_ref() else {
            return false;
        };

        let resolution = Resolution {
            width: current.width,
            height: current.height,
        };
        let seq = self.probe.frames_delivered.fetch_add(1, Ordering::SeqCst);
        *slot = Some(gradient_frame(resolution, seq));
        true
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for MockBackend {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<MediaStream, CameraError> {
        if let Some(kind) = self.fail_with {
            return Err(CameraError::Acquire {
                kind,
                detail: Some("mock device".to_string()),
            });
        }

        let resolution = self.resolution.unwrap_or(constraints.ideal);
        let frames: FrameBuffer = Arc::new(Mutex::new(None));
        if self.deliver_frames {
            if let Ok(mut slot) = frames.lock() {
                let seq = self.probe.frames_delivered.fetch_add(1, Ordering::SeqCst);
                *slot = Some(gradient_frame(resolution, seq));
            }
        }
        if let Ok(mut feed) = self.probe.feed.lock() {
            *feed = Some(Arc::clone(&frames));
        }

        let tracks = (0..self.tracks)
            .map(|i| {
                self.probe.live_tracks.fetch_add(1, Ordering::SeqCst);
                Box::new(MockTrack {
                    label: format!("mock-track-{}", i),
                    fail_on_stop: self.failing_tracks.contains(&i),
                    stopped: false,
                    probe: Arc::clone(&self.probe),
                }) as Box<dyn MediaTrack>
            })
            .collect();

        self.probe.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(MediaStream {
            label: "Mock Camera".to_string(),
            resolution,
            tracks,
            frames,
        })
    }
}

struct MockTrack {
    label: String,
    fail_on_stop: bool,
    stopped: bool,
    probe: Arc<MockProbe>,
}

impl MediaTrack for MockTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.probe.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_stop {
            return Err(CameraError::TrackStop {
                track: self.label.clone(),
                message: "mock stop failure".to_string(),
            });
        }
        if !self.stopped {
            self.stopped = true;
            self.probe.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Preview surface that records what it was shown.
#[derive(Debug, Clone, Default)]
pub struct MockSurface {
    attached: Arc<Mutex<Option<FeedInfo>>>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The feed currently attached, if any.
    pub fn attached(&self) -> Option<FeedInfo> {
        self.attached.lock().ok().and_then(|f| f.clone())
    }
}

impl PreviewSurface for MockSurface {
    fn attach(&mut self, feed: &FeedInfo) {
        if let Ok(mut slot) = self.attached.lock() {
            *slot = Some(feed.clone());
        }
    }

    fn detach(&mut self) {
        if let Ok(mut slot) = self.attached.lock() {
            *slot = None;
        }
    }
}

/// Gradient shifted by `seq` so consecutive frames differ everywhere.
fn gradient_frame(resolution: Resolution, seq: usize) -> Frame {
    let shift = seq.wrapping_mul(37) % 256;
    let mut data = Vec::with_capacity(resolution.rgb_frame_len());
    for y in 0..resolution.height {
        for x in 0..resolution.width {
            let (x, y) = (x as usize, y as usize);
            data.push(((x + shift) % 256) as u8);
            data.push(((y + shift) % 256) as u8);
            data.push(((x + y + shift) % 256) as u8);
        }
    }
    Frame {
        data,
        width: resolution.width,
        height: resolution.height,
        timestamp: Instant::now(),
    }
}
