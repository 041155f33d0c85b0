//! Frame producers
//!
//! The server itself only consumes frames. These sources feed it when
//! running standalone:
//! - [`TestPattern`]: animated color bars
//! - [`StillImage`]: a single image file, republished at a fixed rate

mod pattern;
mod still;

pub use pattern::TestPattern;
pub use still::StillImage;

use crate::error::Result;
use crate::frame_buffer::FrameBuffer;
use crate::types::{Frame, Framerate};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Trait for frame producers
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Produce the next frame
    async fn next_frame(&mut self) -> Result<Frame>;

    /// Rate at which frames should be requested
    fn framerate(&self) -> Framerate;

    /// Short human-readable name
    fn name(&self) -> &str;
}

/// Pull frames from `source` at its framerate and publish them until
/// `shutdown` flips to `true`.
///
/// Recoverable source errors skip one frame; anything else ends the loop.
/// Returns the number of frames published.
pub async fn run_source(
    mut source: Box<dyn FrameSource>,
    frames: Arc<FrameBuffer>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<u64> {
    let mut ticker = tokio::time::interval(source.framerate().frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("Source '{}' running at {}", source.name(), source.framerate());

    let mut produced = 0u64;
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => match source.next_frame().await {
                Ok(frame) => {
                    frames.publish(frame);
                    produced += 1;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Source '{}' skipped a frame: {}", source.name(), e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    tracing::debug!("Source '{}' stopped after {} frames", source.name(), produced);
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{FrameFormat, Resolution};
    use std::time::Duration;

    /// Fails every other frame, fatally after `fatal_after` frames
    struct Flaky {
        calls: u32,
        fatal_after: u32,
    }

    #[async_trait::async_trait]
    impl FrameSource for Flaky {
        async fn next_frame(&mut self) -> Result<Frame> {
            self.calls += 1;
            if self.calls > self.fatal_after {
                return Err(Error::Internal("source gone".into()));
            }
            if self.calls % 2 == 0 {
                return Err(Error::Source("dropped".into()));
            }
            Ok(Frame::new(2, 2, FrameFormat::Rgb24))
        }

        fn framerate(&self) -> Framerate {
            Framerate::new(200, 1)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_run_source_publishes_until_shutdown() {
        let frames = Arc::new(FrameBuffer::new());
        let (tx, rx) = watch::channel(false);
        let source = TestPattern::new(Resolution::new(16, 8), Framerate::new(200, 1));
        let task = tokio::spawn(run_source(Box::new(source), frames.clone(), rx));

        tokio::time::timeout(Duration::from_secs(2), async {
            while frames.published() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        let produced = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(produced >= 3);
        assert_eq!(frames.current_frame().unwrap().resolution(), Resolution::new(16, 8));
    }

    #[tokio::test]
    async fn test_run_source_skips_recoverable_and_stops_on_fatal() {
        let frames = Arc::new(FrameBuffer::new());
        let (_tx, rx) = watch::channel(false);
        let source = Flaky {
            calls: 0,
            fatal_after: 5,
        };

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            run_source(Box::new(source), frames.clone(), rx),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, Error::Internal(_)));
        // calls 1, 3 and 5 succeeded
        assert_eq!(frames.published(), 3);
    }
}
