//! Frame encoding module
//!
//! The broadcast scheduler encodes each tick's frame exactly once through a
//! [`FrameEncoder`]; the resulting bytes are shared by every recipient.

pub mod jpeg;

use crate::error::Result;
use crate::types::Frame;
use bytes::Bytes;

pub use jpeg::JpegEncoder;

/// Trait for still-image encoders used by the broadcast scheduler
pub trait FrameEncoder: Send + Sync {
    /// Encode a frame into a complete image
    fn encode(&self, frame: &Frame) -> Result<Bytes>;

    /// MIME type of the encoded output
    fn mime_type(&self) -> &'static str;
}
