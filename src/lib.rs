//! FrameCast — live MJPEG over plain HTTP
//!
//! Publish raw frames from any producer; FrameCast encodes the latest one
//! to JPEG at a fixed rate and pushes it to every connected browser as a
//! `multipart/x-mixed-replace` stream.
//!
//! # Features
//!
//! - **Frame buffer**: single-slot, last-writer-wins hand-off from producers
//! - **Broadcast**: encode once per tick, fan out to all clients, evict
//!   anyone who cannot keep up
//! - **HTTP**: landing page at `/`, stream at `/stream.mjpeg`
//!
//! # Example
//!
//! ```rust,no_run
//! use framecast::{Frame, FrameFormat, MjpegServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> framecast::Result<()> {
//!     let server = MjpegServer::new(ServerConfig::default().with_fps(15))?;
//!     let port = server.start(8080).await?;
//!     println!("streaming on port {}", port);
//!
//!     server.publish(Frame::new(640, 480, FrameFormat::Rgb24));
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod events;
pub mod frame_buffer;
pub mod http;
pub mod net;
pub mod processing;
pub mod server;
pub mod source;
pub mod stream;
pub mod types;

// Re-exports for convenience
pub use config::ServerConfig;
pub use encode::{FrameEncoder, JpegEncoder};
pub use error::{Error, Result};
pub use events::ServerEvent;
pub use frame_buffer::FrameBuffer;
pub use server::MjpegServer;
pub use source::{FrameSource, StillImage, TestPattern};
pub use types::{Frame, FrameFormat, Framerate, Resolution, Stats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
