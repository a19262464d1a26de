//! Camera session management: device acquisition, release and still capture.
//!
//! - Device enumeration via [`list_devices`]
//! - Session lifecycle via [`CameraSession`]
//! - Device access behind the [`CameraBackend`] seam, implemented by
//!   [`FfmpegBackend`] for real hardware and [`mock::MockBackend`] for tests

mod backend;
mod encode;
mod error;
mod ffmpeg;
pub mod mock;
mod session;
mod types;

pub use backend::{CameraBackend, FrameBuffer, MediaStream, MediaTrack, PreviewSurface};
pub use encode::encode_frame;
pub use error::{classify_failure, AcquireFailure, CameraError};
pub use ffmpeg::{list_devices, FfmpegBackend, FFMPEG_BIN};
pub use session::CameraSession;
pub use types::{
    CameraInfo, CameraSettings, CaptureConstraints, EncodeSettings, EncodedImage, FacingMode,
    FeedInfo, Frame, ImageFormat, Resolution,
};
