//! Common types used throughout FrameCast

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Image resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    // Common resolutions
    pub const VGA: Self = Self::new(640, 480);
    pub const HD_720P: Self = Self::new(1280, 720);
    pub const FHD_1080P: Self = Self::new(1920, 1080);

    /// Calculate total pixels
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layout of a raster frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FrameFormat {
    /// RGB24 - 24-bit packed RGB
    #[default]
    Rgb24,
    /// BGR24 - 24-bit packed BGR (common for camera SDKs)
    Bgr24,
    /// RGBA - 32-bit RGBA
    Rgba,
    /// BGRA - 32-bit BGRA (common for desktop capture)
    Bgra,
    /// GRAY8 - 8-bit luminance
    Gray8,
}

impl FrameFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Rgb24 | FrameFormat::Bgr24 => 3,
            FrameFormat::Rgba | FrameFormat::Bgra => 4,
            FrameFormat::Gray8 => 1,
        }
    }

    /// Tightly packed row length for the given width
    pub fn row_bytes(&self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }
}

/// A raster video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Row stride in bytes
    pub stride: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Presentation timestamp in microseconds
    pub pts: i64,
}

impl Frame {
    /// Create a new black frame with a tightly packed buffer
    pub fn new(width: u32, height: u32, format: FrameFormat) -> Self {
        let stride = format.row_bytes(width);
        Self {
            data: vec![0u8; stride * height as usize],
            width,
            height,
            stride: stride as u32,
            format,
            pts: 0,
        }
    }

    /// Create a frame from existing data
    pub fn from_data(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            format,
            pts: 0,
        }
    }

    /// Create a frame from tightly packed pixel data
    pub fn packed(data: Vec<u8>, width: u32, height: u32, format: FrameFormat) -> Self {
        let stride = format.row_bytes(width) as u32;
        Self::from_data(data, width, height, stride, format)
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = pts;
        self
    }

    /// Get resolution
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// A frame with no pixels is treated as "no image"
    pub fn is_empty(&self) -> bool {
        self.resolution().is_empty() || self.data.is_empty()
    }

    /// Calculate frame size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Framerate representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub den: u32,
}

impl Framerate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    // Common framerates
    pub const FPS_15: Self = Self::new(15, 1);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);

    /// Get framerate as f64
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /// Interval between frames, clamped to at least one millisecond
    pub fn frame_interval(&self) -> Duration {
        if self.num == 0 {
            return Duration::from_secs(1);
        }
        let micros = (1_000_000u64 * self.den.max(1) as u64) / self.num as u64;
        Duration::from_micros(micros.max(1_000))
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{} fps", self.num)
        } else {
            write!(f, "{:.2} fps", self.as_f64())
        }
    }
}

/// Statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Non-empty frames accepted by the frame buffer
    pub frames_published: u64,
    /// Broadcast passes that had a frame and at least one client
    pub ticks: u64,
    /// JPEG encodes performed
    pub frames_encoded: u64,
    /// Multipart blocks handed to clients
    pub parts_delivered: u64,
    /// Payload bytes handed to clients
    pub bytes_queued: u64,
    /// Stream clients ever registered
    pub clients_served: u64,
    /// Stream clients removed by the scheduler
    pub clients_evicted: u64,
}
