//! MJPEG stream fan-out
//!
//! - [`ConnectionRegistry`]: the set of subscribed clients
//! - [`BroadcastScheduler`]: periodic encode-once, write-to-all
//! - [`TcpSink`]: non-blocking per-client transport
//! - [`mjpeg`]: multipart framing

pub mod connection;
pub mod mjpeg;
pub mod registry;
pub mod scheduler;
pub mod sink;

pub use connection::{ClientConnection, ConnectionId, ConnectionState, Delivery, FrameSink};
pub use registry::ConnectionRegistry;
pub use scheduler::{BroadcastScheduler, TickReport};
pub use sink::{DriveEnd, SinkDriver, TcpSink};
