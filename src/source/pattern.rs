//! Synthetic test pattern

use super::FrameSource;
use crate::error::Result;
use crate::types::{Frame, FrameFormat, Framerate, Resolution};

/// SMPTE-ish bar colors
const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Horizontal scroll per frame, in pixels
const SCROLL_STEP: u32 = 4;

/// Vertical color bars that scroll one step per frame, so a viewer can
/// tell the stream is live
#[derive(Debug, Clone)]
pub struct TestPattern {
    resolution: Resolution,
    framerate: Framerate,
    frame_index: u64,
}

impl TestPattern {
    pub fn new(resolution: Resolution, framerate: Framerate) -> Self {
        Self {
            resolution,
            framerate,
            frame_index: 0,
        }
    }

    /// Frames produced so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn render(&self) -> Frame {
        let Resolution { width, height } = self.resolution;
        let mut frame = Frame::new(width, height, FrameFormat::Rgb24);
        if frame.is_empty() {
            return frame;
        }

        let bar_width = (width / BARS.len() as u32).max(1);
        let offset = (self.frame_index as u32).wrapping_mul(SCROLL_STEP) % width;
        let stride = frame.stride as usize;

        // Build one row, then copy it down
        let mut row = Vec::with_capacity(stride);
        for x in 0..width {
            let bar = ((x + offset) % width / bar_width) as usize % BARS.len();
            row.extend_from_slice(&BARS[bar]);
        }
        for line in frame.data.chunks_exact_mut(stride) {
            line.copy_from_slice(&row);
        }
        frame
    }
}

impl Default for TestPattern {
    fn default() -> Self {
        Self::new(Resolution::VGA, Framerate::FPS_30)
    }
}

#[async_trait::async_trait]
impl FrameSource for TestPattern {
    async fn next_frame(&mut self) -> Result<Frame> {
        let pts = self.frame_index as i64 * self.framerate.frame_interval().as_micros() as i64;
        let frame = self.render().with_pts(pts);
        self.frame_index += 1;
        Ok(frame)
    }

    fn framerate(&self) -> Framerate {
        self.framerate
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pattern_dimensions() {
        let mut pattern = TestPattern::new(Resolution::new(64, 4), Framerate::FPS_30);
        let frame = pattern.next_frame().await.unwrap();
        assert_eq!(frame.resolution(), Resolution::new(64, 4));
        assert_eq!(frame.format, FrameFormat::Rgb24);
        assert_eq!(frame.data.len(), 64 * 4 * 3);
        // first pixel is the first bar
        assert_eq!(&frame.data[..3], &BARS[0]);
        // last pixel is the last bar
        assert_eq!(&frame.data[63 * 3..64 * 3], &BARS[7]);
    }

    #[tokio::test]
    async fn test_pattern_scrolls() {
        let mut pattern = TestPattern::new(Resolution::new(64, 2), Framerate::FPS_30);
        let first = pattern.next_frame().await.unwrap();
        let second = pattern.next_frame().await.unwrap();
        assert_ne!(first.data, second.data);
        assert!(second.pts > first.pts);
        assert_eq!(pattern.frame_index(), 2);
    }

    #[tokio::test]
    async fn test_empty_resolution_yields_empty_frame() {
        let mut pattern = TestPattern::new(Resolution::new(0, 10), Framerate::FPS_30);
        assert!(pattern.next_frame().await.unwrap().is_empty());
    }
}
