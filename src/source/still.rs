//! Still image source

use super::FrameSource;
use crate::error::{Error, Result};
use crate::types::{Frame, FrameFormat, Framerate};
use std::path::{Path, PathBuf};

/// Republishes one decoded image at a fixed rate
#[derive(Debug, Clone)]
pub struct StillImage {
    path: PathBuf,
    frame: Frame,
    framerate: Framerate,
}

impl StillImage {
    /// Decode `path` (any format the `image` crate was built with)
    pub fn open(path: impl AsRef<Path>, framerate: Framerate) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| Error::Source(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        let (width, height) = image.dimensions();
        let frame = Frame::packed(image.into_raw(), width, height, FrameFormat::Rgb24);
        if frame.is_empty() {
            return Err(Error::Source(format!("{}: image has no pixels", path.display())));
        }

        tracing::debug!("Loaded {} ({})", path.display(), frame.resolution());
        Ok(Self {
            path: path.to_path_buf(),
            frame,
            framerate,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

#[async_trait::async_trait]
impl FrameSource for StillImage {
    async fn next_frame(&mut self) -> Result<Frame> {
        Ok(self.frame.clone())
    }

    fn framerate(&self) -> Framerate {
        self.framerate
    }

    fn name(&self) -> &str {
        "still-image"
    }
}
