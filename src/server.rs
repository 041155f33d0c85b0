//! MJPEG HTTP server
//!
//! Ties the pieces together: a listener task accepting connections, one
//! task per connection, and the broadcast scheduler ticking on its own.
//!
//! ```text
//! producer ──publish──▶ FrameBuffer ◀──tick── BroadcastScheduler ──▶ ConnectionRegistry ──▶ clients
//!                                                                        ▲
//! TcpListener ──accept──▶ connection task ──GET /stream──────────────────┘
//! ```

use crate::config::ServerConfig;
use crate::encode::{FrameEncoder, JpegEncoder};
use crate::error::{Error, Result};
use crate::events::{EventBus, ServerEvent};
use crate::frame_buffer::FrameBuffer;
use crate::http::{self, Route};
use crate::net;
use crate::stream::sink::{drive, DriveEnd, TcpSink};
use crate::stream::{BroadcastScheduler, ClientConnection, ConnectionRegistry};
use crate::types::{Frame, Stats};

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// State shared with the listener and connection tasks
struct Shared {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<Mutex<Stats>>,
}

/// Handles of a running server
struct Running {
    shutdown: watch::Sender<bool>,
    acceptor: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

/// Live MJPEG server
pub struct MjpegServer {
    config: ServerConfig,
    frames: Arc<FrameBuffer>,
    registry: Arc<ConnectionRegistry>,
    encoder: Arc<dyn FrameEncoder>,
    events: EventBus,
    stats: Arc<Mutex<Stats>>,
    // 0 while stopped
    port: AtomicU16,
    lifecycle: tokio::sync::Mutex<Option<Running>>,
}

impl MjpegServer {
    /// Create a stopped server using a JPEG encoder at the configured quality
    pub fn new(config: ServerConfig) -> Result<Self> {
        let encoder = Arc::new(JpegEncoder::new(config.jpeg_quality));
        Self::with_encoder(config, encoder)
    }

    /// Create a stopped server with a custom encoder
    pub fn with_encoder(config: ServerConfig, encoder: Arc<dyn FrameEncoder>) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            frames: Arc::new(FrameBuffer::new()),
            registry: Arc::new(ConnectionRegistry::new(events.clone())),
            encoder,
            events,
            stats: Arc::new(Mutex::new(Stats::default())),
            port: AtomicU16::new(0),
            lifecycle: tokio::sync::Mutex::new(None),
            config,
        })
    }

    /// Bind the listener and start broadcasting.
    ///
    /// `port` 0 picks any free port. Returns the bound port; if the server
    /// is already running, returns the current port without rebinding.
    pub async fn start(&self, port: u16) -> Result<u16> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            let port = self.server_port();
            tracing::debug!("Server already running on port {}", port);
            return Ok(port);
        }

        let addr = self.config.socket_addr(port);
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = Error::Bind { addr, source };
                tracing::error!("Cannot start server: {}", err);
                self.events.error(format!("Cannot start server: {}", err));
                return Err(err);
            }
        };
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scheduler = Arc::new(
            BroadcastScheduler::new(
                self.frames.clone(),
                self.registry.clone(),
                self.encoder.clone(),
                self.config.frame_interval(),
            )
            .with_stats(self.stats.clone())
            .with_events(self.events.clone()),
        );
        let scheduler = tokio::spawn(scheduler.run(shutdown_rx.clone()));

        // A previous stop() shut the registry
        self.registry.reopen();

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            registry: self.registry.clone(),
            stats: self.stats.clone(),
        });
        let acceptor = tokio::spawn(accept_loop(listener, shared, shutdown_rx));

        *lifecycle = Some(Running {
            shutdown: shutdown_tx,
            acceptor,
            scheduler,
        });
        self.port.store(port, Ordering::SeqCst);

        tracing::info!(
            "Server started on {} ({} fps, JPEG q{})",
            self.config.socket_addr(port),
            1000 / self.config.frame_interval_ms.max(1),
            self.config.jpeg_quality
        );
        self.events.emit(ServerEvent::Started { port });
        Ok(port)
    }

    /// Stop broadcasting, disconnect every client and release the port.
    ///
    /// Does nothing if the server is not running. Failures while closing
    /// individual clients are logged and do not interrupt the shutdown.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(running) = lifecycle.take() else {
            return;
        };
        self.port.store(0, Ordering::SeqCst);

        let _ = running.shutdown.send(true);

        if let Err(e) = running.scheduler.await {
            tracing::warn!("Broadcast scheduler ended abnormally: {}", e);
        }

        // Also refuses handlers that read `GET /stream` but have not
        // registered yet
        let disconnected = self.registry.close_all();

        // The listener and any remaining connection tasks go away with it
        if let Err(e) = running.acceptor.await {
            tracing::warn!("Listener task ended abnormally: {}", e);
        }

        tracing::info!(
            "Server stopped ({} stream client(s) disconnected)",
            disconnected
        );
        self.events.emit(ServerEvent::Stopped);
    }

    pub fn is_running(&self) -> bool {
        self.port.load(Ordering::SeqCst) != 0
    }

    /// Bound port, or 0 while stopped
    pub fn server_port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }

    /// `http://<lan-ip>:<port>` for display, `None` while stopped
    pub fn server_url(&self) -> Option<String> {
        let port = self.server_port();
        if port == 0 {
            return None;
        }
        Some(net::http_url(net::local_ipv4(), port))
    }

    /// Replace the frame sent on the next tick. Empty frames are ignored.
    pub fn publish(&self, frame: Frame) {
        self.frames.publish(frame);
    }

    /// Shared handle for producers running elsewhere
    pub fn frame_buffer(&self) -> Arc<FrameBuffer> {
        self.frames.clone()
    }

    /// Number of registered stream clients
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Lifecycle and client notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current statistics
    pub fn stats(&self) -> Stats {
        let mut stats = self.stats.lock().clone();
        stats.frames_published = self.frames.published();
        stats
    }
}

impl Drop for MjpegServer {
    fn drop(&mut self) {
        if let Some(running) = self.lifecycle.get_mut().take() {
            let _ = running.shutdown.send(true);
            self.registry.close_all();
            tracing::debug!("Server dropped while running, shutdown signalled");
        }
    }
}

impl std::fmt::Debug for MjpegServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegServer")
            .field("port", &self.server_port())
            .field("clients", &self.client_count())
            .field("config", &self.config)
            .finish()
    }
}

/// Accept connections until shutdown, then drop the listener and abort
/// whatever connection tasks are still alive
async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!("Connection accepted from {}", peer);
                    let shared = shared.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, shared).await {
                            tracing::debug!("Connection {} ended with error: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!("Connection task panicked: {}", e);
                    }
                }
            }
        }
    }

    drop(listener);
    connections.shutdown().await;
}

/// Read the request line and answer it
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) -> Result<()> {
    let mut buf = vec![0u8; http::MAX_REQUEST_BYTES];
    let n = stream.read(&mut buf).await?;

    let Some(request) = http::parse_request_line(&buf[..n]) else {
        tracing::debug!("Malformed request from {}, disconnecting", peer);
        return Ok(());
    };
    tracing::debug!("HTTP request: {} {} from {}", request.method, request.path, peer);

    match Route::resolve(&request.path) {
        Route::Index => respond_and_close(&mut stream, &http::index_response()).await,
        Route::NotFound => respond_and_close(&mut stream, http::not_found_response()).await,
        Route::Stream => serve_stream(stream, peer, shared).await,
    }
}

async fn respond_and_close(stream: &mut TcpStream, response: &[u8]) -> Result<()> {
    stream.write_all(response).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

/// Send the multipart head, register the client, and pump frames to it
/// until either side ends the stream
async fn serve_stream(mut stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) -> Result<()> {
    stream.write_all(&http::stream_response_head()).await?;
    stream.flush().await?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("TCP_NODELAY on {}: {}", peer, e);
    }

    let (sink, driver) = TcpSink::channel(shared.config.client_queue_depth);
    let id = shared.registry.next_id();
    let connection = Arc::new(ClientConnection::new(id, peer, Box::new(sink)));
    if !shared.registry.add(connection) {
        return Ok(());
    }
    shared.stats.lock().clients_served += 1;

    let (reader, writer) = stream.into_split();
    if drive(driver, reader, writer, peer).await == DriveEnd::PeerGone {
        tracing::debug!("Stream client {} went away", peer);
    }

    shared.registry.remove(id);
    Ok(())
}
