//! Configuration types for FrameCast

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;
/// Default broadcast period (~30 Hz)
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;
/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_address: IpAddr,
    /// Listening port (0 = any free port)
    pub port: u16,
    /// Broadcast period in milliseconds
    pub frame_interval_ms: u64,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Encoded payloads a stream client may have in flight before it is
    /// considered stalled
    pub client_queue_depth: usize,
    /// Capacity of the server event channel
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            client_queue_depth: 2,
            event_capacity: 64,
        }
    }
}

impl ServerConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind_address(mut self, addr: IpAddr) -> Self {
        self.bind_address = addr;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the broadcast rate in frames per second
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_interval_ms = (1000 / fps.max(1) as u64).max(1);
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_client_queue_depth(mut self, depth: usize) -> Self {
        self.client_queue_depth = depth;
        self
    }

    /// Broadcast period
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Socket address for the given port on the configured interface
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.bind_address, port)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(Error::Config("frame_interval_ms must be positive".into()));
        }
        if self.client_queue_depth == 0 {
            return Err(Error::Config("client_queue_depth must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }
}
