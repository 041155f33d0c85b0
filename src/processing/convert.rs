//! Pixel repacking for the JPEG encoder
//!
//! The encoder accepts tightly packed RGB8 or L8 rows. Everything else
//! (BGR order, alpha channels, padded strides) is rewritten here.

use crate::error::{Error, Result};
use crate::types::{Frame, FrameFormat};
use std::borrow::Cow;

/// Check that the buffer covers `height` rows of `stride` bytes
pub fn validate_layout(frame: &Frame) -> Result<()> {
    if frame.is_empty() {
        return Err(Error::InvalidFrame("frame has no pixels".into()));
    }

    let row_bytes = frame.format.row_bytes(frame.width);
    let stride = frame.stride as usize;
    if stride < row_bytes {
        return Err(Error::InvalidFrame(format!(
            "stride {} shorter than row of {} bytes ({} {:?})",
            stride, row_bytes, frame.width, frame.format
        )));
    }

    // The last row does not need trailing padding
    let required = stride * (frame.height as usize - 1) + row_bytes;
    if frame.data.len() < required {
        return Err(Error::InvalidFrame(format!(
            "buffer of {} bytes too small for {} ({} required)",
            frame.data.len(),
            frame.resolution(),
            required
        )));
    }
    Ok(())
}

/// Iterate over the visible bytes of each row
fn rows(frame: &Frame) -> impl Iterator<Item = &[u8]> {
    let row_bytes = frame.format.row_bytes(frame.width);
    let stride = frame.stride as usize;
    (0..frame.height as usize).map(move |y| &frame.data[y * stride..y * stride + row_bytes])
}

/// Repack to RGB24, borrowing when the frame already matches
pub fn to_rgb24(frame: &Frame) -> Result<Cow<'_, [u8]>> {
    validate_layout(frame)?;

    let row_bytes = frame.format.row_bytes(frame.width);
    let tight = frame.stride as usize == row_bytes;
    let pixels = frame.resolution().pixels() as usize;

    match frame.format {
        FrameFormat::Rgb24 if tight => Ok(Cow::Borrowed(&frame.data[..row_bytes * frame.height as usize])),
        FrameFormat::Rgb24 => {
            let mut out = Vec::with_capacity(pixels * 3);
            rows(frame).for_each(|row| out.extend_from_slice(row));
            Ok(Cow::Owned(out))
        }
        FrameFormat::Bgr24 => Ok(Cow::Owned(swizzle(frame, 3, [2, 1, 0]))),
        FrameFormat::Rgba => Ok(Cow::Owned(swizzle(frame, 4, [0, 1, 2]))),
        FrameFormat::Bgra => Ok(Cow::Owned(swizzle(frame, 4, [2, 1, 0]))),
        FrameFormat::Gray8 => {
            let mut out = Vec::with_capacity(pixels * 3);
            for row in rows(frame) {
                for &luma in row {
                    out.extend_from_slice(&[luma, luma, luma]);
                }
            }
            Ok(Cow::Owned(out))
        }
    }
}

/// Repack an 8-bit luminance frame, dropping any row padding
pub fn to_gray8(frame: &Frame) -> Result<Cow<'_, [u8]>> {
    validate_layout(frame)?;
    if frame.format != FrameFormat::Gray8 {
        return Err(Error::InvalidFrame(format!(
            "expected Gray8 frame, got {:?}",
            frame.format
        )));
    }

    let width = frame.width as usize;
    if frame.stride as usize == width {
        return Ok(Cow::Borrowed(&frame.data[..width * frame.height as usize]));
    }
    let mut out = Vec::with_capacity(width * frame.height as usize);
    rows(frame).for_each(|row| out.extend_from_slice(row));
    Ok(Cow::Owned(out))
}

/// Pick three channels (in RGB order) out of each `bpp`-byte pixel
fn swizzle(frame: &Frame, bpp: usize, order: [usize; 3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.resolution().pixels() as usize * 3);
    for row in rows(frame) {
        for px in row.chunks_exact(bpp) {
            out.extend_from_slice(&[px[order[0]], px[order[1]], px[order[2]]]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tight_rgb_is_borrowed() {
        let frame = Frame::packed(vec![1, 2, 3, 4, 5, 6], 2, 1, FrameFormat::Rgb24);
        let rgb = to_rgb24(&frame).unwrap();
        assert!(matches!(rgb, Cow::Borrowed(_)));
        assert_eq!(&*rgb, &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_bgra_with_padding() {
        // 1x2 BGRA, stride 8 (4 bytes padding per row)
        let data = vec![
            30, 20, 10, 255, 0, 0, 0, 0, //
            60, 50, 40, 255, 0, 0, 0, 0,
        ];
        let frame = Frame::from_data(data, 1, 2, 8, FrameFormat::Bgra);
        assert_eq!(&*to_rgb24(&frame).unwrap(), &[10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_bgr_and_rgba() {
        let bgr = Frame::packed(vec![3, 2, 1], 1, 1, FrameFormat::Bgr24);
        assert_eq!(&*to_rgb24(&bgr).unwrap(), &[1, 2, 3]);

        let rgba = Frame::packed(vec![1, 2, 3, 9], 1, 1, FrameFormat::Rgba);
        assert_eq!(&*to_rgb24(&rgba).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_gray_paths() {
        let frame = Frame::from_data(vec![7, 0, 8, 0], 1, 2, 2, FrameFormat::Gray8);
        assert_eq!(&*to_gray8(&frame).unwrap(), &[7, 8]);
        assert_eq!(&*to_rgb24(&frame).unwrap(), &[7, 7, 7, 8, 8, 8]);
    }

    #[test]
    fn test_last_row_without_padding_is_accepted() {
        let frame = Frame::from_data(vec![1, 2, 3, 0, 4, 5, 6], 1, 2, 4, FrameFormat::Rgb24);
        assert_eq!(&*to_rgb24(&frame).unwrap(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let frame = Frame::packed(vec![0; 5], 2, 1, FrameFormat::Rgb24);
        assert!(matches!(to_rgb24(&frame), Err(Error::InvalidFrame(_))));
    }

    #[test]
    fn test_short_stride_rejected() {
        let frame = Frame::from_data(vec![0; 64], 4, 2, 8, FrameFormat::Rgba);
        assert!(matches!(validate_layout(&frame), Err(Error::InvalidFrame(_))));
    }
}
