//! Periodic encode-and-fanout
//!
//! Every tick the scheduler takes the latest frame, encodes it once, wraps
//! it in a multipart block and offers that same buffer to every registered
//! connection. Connections that are gone, reject the write, or accept only
//! part of it are collected during the pass and removed afterwards.
//!
//! The scheduler never waits on a client: sinks accept or refuse a payload
//! immediately, and a refusal ends that client's stream.

use super::connection::{ConnectionId, Delivery};
use super::mjpeg;
use super::registry::ConnectionRegistry;
use crate::encode::FrameEncoder;
use crate::events::EventBus;
use crate::frame_buffer::FrameBuffer;
use crate::types::Stats;

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Outcome of one broadcast pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Connections that received the full payload
    pub delivered: usize,
    /// Connections removed at the end of the pass
    pub evicted: usize,
    /// Size of the multipart block
    pub payload_bytes: usize,
}

/// Drives broadcast passes at a fixed period
pub struct BroadcastScheduler {
    frames: Arc<FrameBuffer>,
    registry: Arc<ConnectionRegistry>,
    encoder: Arc<dyn FrameEncoder>,
    interval: Duration,
    stats: Arc<Mutex<Stats>>,
    events: EventBus,
}

impl BroadcastScheduler {
    pub fn new(
        frames: Arc<FrameBuffer>,
        registry: Arc<ConnectionRegistry>,
        encoder: Arc<dyn FrameEncoder>,
        interval: Duration,
    ) -> Self {
        Self {
            frames,
            registry,
            encoder,
            interval,
            stats: Arc::new(Mutex::new(Stats::default())),
            events: EventBus::default(),
        }
    }

    /// Share a statistics block with the owner
    pub fn with_stats(mut self, stats: Arc<Mutex<Stats>>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when a tick would have nothing to do
    pub fn is_idle(&self) -> bool {
        self.registry.is_empty() || !self.frames.has_frame()
    }

    /// Run one broadcast pass.
    ///
    /// Returns `None` when there is no frame, no subscriber, or the frame
    /// could not be encoded.
    pub fn tick(&self) -> Option<TickReport> {
        let frame = self.frames.current_frame()?;
        if self.registry.is_empty() {
            return None;
        }

        let image = match self.encoder.encode(&frame) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Skipping broadcast tick: {}", e);
                self.events.error(format!("Frame encoding failed: {}", e));
                return None;
            }
        };
        let payload = mjpeg::encode_part(self.encoder.mime_type(), &image);

        let mut report = TickReport {
            payload_bytes: payload.len(),
            ..Default::default()
        };
        let mut doomed: Vec<ConnectionId> = Vec::new();

        for connection in self.registry.snapshot() {
            match connection.deliver(&payload) {
                Delivery::Sent => report.delivered += 1,
                Delivery::Skipped => {}
                Delivery::Disconnected => {
                    tracing::debug!("Stream client {} no longer connected", connection.peer());
                    doomed.push(connection.id());
                }
                Delivery::Partial { written, expected } => {
                    tracing::warn!(
                        "Partial write to {}: {} of {} bytes, dropping client",
                        connection.peer(),
                        written,
                        expected
                    );
                    doomed.push(connection.id());
                }
                Delivery::Failed(e) => {
                    tracing::debug!("Frame write to {} failed: {}", connection.peer(), e);
                    doomed.push(connection.id());
                }
            }
        }

        for id in doomed {
            if self.registry.remove(id) {
                report.evicted += 1;
            }
        }

        let mut stats = self.stats.lock();
        stats.ticks += 1;
        stats.frames_encoded += 1;
        stats.parts_delivered += report.delivered as u64;
        stats.bytes_queued += (report.delivered * report.payload_bytes) as u64;
        stats.clients_evicted += report.evicted as u64;

        Some(report)
    }

    /// Tick until `shutdown` flips to true or its sender goes away.
    ///
    /// Encoding runs on the blocking pool. Ticks missed while a pass was
    /// running are skipped rather than bunched up.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!("Broadcast scheduler started ({:?} period)", self.interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if self.is_idle() {
                        continue;
                    }
                    let scheduler = Arc::clone(&self);
                    match tokio::task::spawn_blocking(move || scheduler.tick()).await {
                        Ok(Some(report)) if report.evicted > 0 => {
                            tracing::debug!(
                                "Tick delivered to {} client(s), evicted {}",
                                report.delivered,
                                report.evicted
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!("Broadcast tick panicked: {}", e),
                    }
                }
            }
        }

        tracing::debug!("Broadcast scheduler stopped");
    }
}

impl std::fmt::Debug for BroadcastScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastScheduler")
            .field("interval", &self.interval)
            .field("clients", &self.registry.len())
            .finish()
    }
}
