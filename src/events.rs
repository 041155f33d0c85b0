//! Server notifications
//!
//! Observers subscribe to a broadcast channel of [`ServerEvent`]s. Emitting
//! never blocks and never fails: with no subscribers the event is dropped,
//! and a lagging subscriber loses the oldest events.

use std::net::SocketAddr;
use tokio::sync::broadcast;

/// Lifecycle and client notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Listener bound and broadcast timer running
    Started { port: u16 },
    /// Listener released and all clients disconnected
    Stopped,
    /// A stream client was registered
    ClientConnected { peer: SocketAddr },
    /// A stream client was removed and closed
    ClientDisconnected { peer: SocketAddr },
    /// Something went wrong that observers may want to surface
    Error { message: String },
}

impl std::fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerEvent::Started { port } => write!(f, "server started on port {}", port),
            ServerEvent::Stopped => write!(f, "server stopped"),
            ServerEvent::ClientConnected { peer } => write!(f, "client connected: {}", peer),
            ServerEvent::ClientDisconnected { peer } => {
                write!(f, "client disconnected: {}", peer)
            }
            ServerEvent::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Cloneable emitter shared by the server components
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(ServerEvent::Error {
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(ServerEvent::Stopped);
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.emit(ServerEvent::Started { port: 8080 });
        bus.error("boom");
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Started { port: 8080 });
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerEvent::Error {
                message: "boom".into()
            }
        );
    }
}
