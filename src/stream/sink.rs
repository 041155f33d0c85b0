//! TCP transport for stream clients
//!
//! Each stream connection gets a small bounded mailbox of encoded payloads.
//! The scheduler drops payloads into it without waiting; a per-connection
//! task drains it into the socket. A mailbox that is still full when the
//! next payload arrives means the client is not keeping up, and the write
//! is refused.

use super::connection::FrameSink;
use bytes::Bytes;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};

/// Sending half handed to the connection registry
#[derive(Debug)]
pub struct TcpSink {
    mailbox: Mutex<Option<mpsc::Sender<Bytes>>>,
    connected: Arc<AtomicBool>,
    closed: Arc<Notify>,
}

/// Receiving half, consumed by [`drive`]
#[derive(Debug)]
pub struct SinkDriver {
    mailbox: mpsc::Receiver<Bytes>,
    connected: Arc<AtomicBool>,
    closed: Arc<Notify>,
}

impl TcpSink {
    /// Create a sink whose mailbox holds at most `depth` payloads
    pub fn channel(depth: usize) -> (TcpSink, SinkDriver) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let connected = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(Notify::new());
        (
            TcpSink {
                mailbox: Mutex::new(Some(tx)),
                connected: connected.clone(),
                closed: closed.clone(),
            },
            SinkDriver {
                mailbox: rx,
                connected,
                closed,
            },
        )
    }
}

impl FrameSink for TcpSink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn try_write(&self, payload: &Bytes) -> io::Result<usize> {
        let mailbox = self.mailbox.lock();
        let tx = mailbox
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink closed"))?;

        match tx.try_send(payload.clone()) {
            Ok(()) => Ok(payload.len()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "client has not drained previous frames",
            )),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection writer has exited",
            )),
        }
    }

    fn close(&self) -> io::Result<()> {
        self.connected.store(false, Ordering::Release);
        self.mailbox.lock().take();
        // notify_one keeps a permit if the driver is not waiting yet
        self.closed.notify_one();
        Ok(())
    }
}

/// Why a driven connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveEnd {
    /// The sink was closed by the registry
    Closed,
    /// The peer hung up or the socket errored
    PeerGone,
}

/// Pump payloads from the mailbox into `writer` while watching `reader`
/// for hang-up. Returns once the sink is closed or the peer is gone.
pub async fn drive<R, W>(driver: SinkDriver, mut reader: R, mut writer: W, peer: SocketAddr) -> DriveEnd
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let SinkDriver {
        mut mailbox,
        connected,
        closed,
    } = driver;

    let writing = async {
        while let Some(payload) = mailbox.recv().await {
            if let Err(e) = writer.write_all(&payload).await {
                tracing::debug!("Write to {} failed: {}", peer, e);
                return DriveEnd::PeerGone;
            }
            if let Err(e) = writer.flush().await {
                tracing::debug!("Flush to {} failed: {}", peer, e);
                return DriveEnd::PeerGone;
            }
        }
        let _ = writer.shutdown().await;
        DriveEnd::Closed
    };

    // Clients have nothing more to say after the request; any read result
    // other than more bytes means the peer is gone
    let watching = async {
        let mut scratch = [0u8; 512];
        loop {
            match reader.read(&mut scratch).await {
                Ok(0) => return,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Read from {} failed: {}", peer, e);
                    return;
                }
            }
        }
    };

    let end = tokio::select! {
        end = writing => end,
        _ = watching => DriveEnd::PeerGone,
        _ = closed.notified() => DriveEnd::Closed,
    };

    connected.store(false, Ordering::Release);
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn peer() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[test]
    fn test_full_mailbox_refuses_write() {
        let (sink, _driver) = TcpSink::channel(1);
        let payload = Bytes::from_static(b"frame");
        assert_eq!(sink.try_write(&payload).unwrap(), 5);
        let err = sink.try_write(&payload).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_closed_sink_refuses_write() {
        let (sink, _driver) = TcpSink::channel(2);
        sink.close().unwrap();
        assert!(!sink.is_connected());
        let err = sink.try_write(&Bytes::from_static(b"x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_dropped_driver_is_broken_pipe() {
        let (sink, driver) = TcpSink::channel(2);
        drop(driver);
        let err = sink.try_write(&Bytes::from_static(b"x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_drive_writes_payloads_until_closed() {
        let (sink, driver) = TcpSink::channel(4);
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(drive(driver, server_read, server_write, peer()));

        sink.try_write(&Bytes::from_static(b"one,")).unwrap();
        sink.try_write(&Bytes::from_static(b"two")).unwrap();

        let (mut client_read, _client_write) = tokio::io::split(client);
        let mut received = vec![0u8; 7];
        client_read.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"one,two");

        sink.close().unwrap();
        let end = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, DriveEnd::Closed);
    }

    #[tokio::test]
    async fn test_drive_detects_hangup() {
        let (sink, driver) = TcpSink::channel(4);
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(drive(driver, server_read, server_write, peer()));

        drop(client);
        let end = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, DriveEnd::PeerGone);
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn test_close_before_drive_starts() {
        let (sink, driver) = TcpSink::channel(4);
        sink.close().unwrap();

        let (_client, server) = tokio::io::duplex(64);
        let (server_read, server_write) = tokio::io::split(server);
        let end = tokio::time::timeout(
            Duration::from_secs(2),
            drive(driver, server_read, server_write, peer()),
        )
        .await
        .unwrap();
        assert_eq!(end, DriveEnd::Closed);
    }
}
