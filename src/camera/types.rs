//! Camera types and data structures.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

/// Information about an available capture device.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Low resolution (320x240)
    pub const LOW: Resolution = Resolution {
        width: 320,
        height: 240,
    };

    /// Medium resolution (640x480), the preferred capture size
    pub const MEDIUM: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// High resolution (1280x720)
    pub const HIGH: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// Number of bytes in one packed RGB frame at this size.
    pub fn rgb_frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, looking at the operator
    #[default]
    User,
    /// Rear camera, looking away from the operator
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "back" | "rear" => Ok(FacingMode::Environment),
            other => Err(format!(
                "Unknown facing mode '{}'. Use 'user' or 'environment'",
                other
            )),
        }
    }
}

/// Preferred constraints passed to the backend on acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    /// Ideal feed size; the backend may deliver something else
    pub ideal: Resolution,
    pub facing: FacingMode,
    /// Explicit device selector (index or name), overrides `facing`
    pub device: Option<String>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal: Resolution::MEDIUM,
            facing: FacingMode::User,
            device: None,
        }
    }
}

/// A raw camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Packed RGB pixel data
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// When the frame arrived from the device
    pub timestamp: Instant,
}

/// Still-image encoding applied to captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(format!("Unknown image format '{}'. Use 'jpeg' or 'png'", other)),
        }
    }
}

/// Format and quality for still-frame encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub format: ImageFormat,
    /// JPEG quality, 1-100. Ignored for PNG.
    pub quality: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: 90,
        }
    }
}

/// An encoded still frame, ready to be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Render as a `data:` URL, the form the recognition backend accepts.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Settings for a camera session.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub constraints: CaptureConstraints,
    pub encode: EncodeSettings,
    /// How long to wait for the first frame before giving up
    pub acquire_timeout: Duration,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            encode: EncodeSettings::default(),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Description of a live feed, handed to the preview surface.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedInfo {
    pub label: String,
    pub resolution: Resolution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let info = CameraInfo {
            index: 0,
            name: "Test Camera".to_string(),
        };
        assert_eq!(format!("{}", info), "[0] Test Camera");
    }

    #[test]
    fn test_resolution_default_is_vga() {
        let res = Resolution::default();
        assert_eq!(res, Resolution { width: 640, height: 480 });
        assert_eq!(res.to_string(), "640x480");
        assert_eq!(res.rgb_frame_len(), 640 * 480 * 3);
    }

    #[test]
    fn test_default_constraints() {
        let constraints = CaptureConstraints::default();
        assert_eq!(constraints.ideal, Resolution::MEDIUM);
        assert_eq!(constraints.facing, FacingMode::User);
        assert!(constraints.device.is_none());
    }

    #[test]
    fn test_default_encoding_is_lossy() {
        let encode = EncodeSettings::default();
        assert_eq!(encode.format, ImageFormat::Jpeg);
        assert_eq!(encode.quality, 90);
    }

    #[test]
    fn test_parse_facing_mode() {
        assert_eq!("user".parse::<FacingMode>().unwrap(), FacingMode::User);
        assert_eq!("Back".parse::<FacingMode>().unwrap(), FacingMode::Environment);
        assert!("sideways".parse::<FacingMode>().is_err());
    }

    #[test]
    fn test_parse_image_format() {
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_data_url() {
        let image = EncodedImage {
            bytes: vec![0xff, 0xd8, 0xff],
            format: ImageFormat::Jpeg,
            width: 1,
            height: 1,
        };
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/");
    }
}
