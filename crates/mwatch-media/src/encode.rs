//! JPEG encoding for stream parts.

use image::codecs::jpeg::JpegEncoder;

use crate::error::{MediaError, MediaResult};
use crate::Frame;

/// Encode a color frame as baseline JPEG.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> MediaResult<Vec<u8>> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(MediaError::Encode("cannot encode an empty frame".to_string()));
    }

    let mut jpeg = Vec::with_capacity((width * height / 4) as usize);
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    encoder
        .encode_image(frame)
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    Ok(jpeg)
}
