//! Frame processing module
//!
//! Prepares raster frames for the JPEG encoder:
//! - Layout validation (stride, buffer length)
//! - Channel reordering and alpha removal

mod convert;

pub use convert::{to_gray8, to_rgb24, validate_layout};

use crate::error::Result;
use crate::types::{Frame, FrameFormat};
use image::ExtendedColorType;
use std::borrow::Cow;

/// Pixels in a layout the JPEG encoder accepts directly
pub fn pack_for_jpeg(frame: &Frame) -> Result<(Cow<'_, [u8]>, ExtendedColorType)> {
    match frame.format {
        FrameFormat::Gray8 => Ok((to_gray8(frame)?, ExtendedColorType::L8)),
        _ => Ok((to_rgb24(frame)?, ExtendedColorType::Rgb8)),
    }
}
