//! JPEG encoding via the `image` crate

use super::FrameEncoder;
use crate::config::DEFAULT_JPEG_QUALITY;
use crate::error::{Error, Result};
use crate::processing;
use crate::types::Frame;
use bytes::Bytes;

/// Baseline JPEG encoder with a fixed quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// Create an encoder; quality is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&self, frame: &Frame) -> Result<Bytes> {
        let (pixels, color) = processing::pack_for_jpeg(frame)?;

        // Rough guess: JPEG at typical qualities lands well under 1 byte/pixel
        let mut out = Vec::with_capacity(frame.resolution().pixels() as usize / 4 + 1024);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, self.quality);
        encoder
            .encode(&pixels, frame.width, frame.height, color)
            .map_err(|e| Error::Encoding(format!("JPEG {}: {}", frame.resolution(), e)))?;

        Ok(Bytes::from(out))
    }

    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameFormat;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 8) as u8, (y * 8) as u8, 128]);
            }
        }
        Frame::packed(data, width, height, FrameFormat::Rgb24)
    }

    #[test]
    fn test_output_is_jpeg() {
        let jpeg = JpegEncoder::default().encode(&gradient(32, 16)).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);

        let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = JpegEncoder::new(85);
        let frame = gradient(16, 16);
        assert_eq!(encoder.encode(&frame).unwrap(), encoder.encode(&frame).unwrap());
    }

    #[test]
    fn test_gray_and_bgra_frames() {
        let encoder = JpegEncoder::new(60);
        let gray = Frame::packed(vec![200; 8 * 8], 8, 8, FrameFormat::Gray8);
        let bgra = Frame::packed(vec![10; 8 * 8 * 4], 8, 8, FrameFormat::Bgra);
        assert!(encoder.encode(&gray).is_ok());
        assert!(encoder.encode(&bgra).is_ok());
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(JpegEncoder::new(0).quality(), 1);
        assert_eq!(JpegEncoder::new(250).quality(), 100);
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let frame = Frame::packed(vec![0; 10], 8, 8, FrameFormat::Rgb24);
        let err = JpegEncoder::default().encode(&frame).unwrap_err();
        assert!(err.is_recoverable());
    }
}
