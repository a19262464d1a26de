//! Still-frame encoding.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::RgbImage;

use super::error::CameraError;
use super::types::{EncodeSettings, EncodedImage, Frame, ImageFormat};

/// Render a raw frame into a bitmap of its native size and encode it.
///
/// Fails with [`CameraError::SurfaceUnavailable`] when the pixel data does
/// not cover the frame's stated dimensions.
pub fn encode_frame(frame: &Frame, settings: &EncodeSettings) -> Result<EncodedImage, CameraError> {
    let bitmap = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(|| {
        CameraError::SurfaceUnavailable(format!(
            "frame holds {} bytes, expected {} for {}x{}",
            frame.data.len(),
            frame.width as usize * frame.height as usize * 3,
            frame.width,
            frame.height
        ))
    })?;

    let mut bytes = Vec::new();
    let result = match settings.format {
        ImageFormat::Jpeg => {
            let quality = settings.quality.clamp(1, 100);
            bitmap.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        }
        ImageFormat::Png => bitmap.write_with_encoder(PngEncoder::new(&mut bytes)),
    };
    result.map_err(|e| CameraError::Encode(e.to_string()))?;

    Ok(EncodedImage {
        bytes,
        format: settings.format,
        width: frame.width,
        height: frame.height,
    })
}
