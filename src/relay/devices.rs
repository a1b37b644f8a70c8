//! Device subscribers on the plain TCP feed
//!
//! Devices connect and only listen. Anything they send is read and
//! ignored; end-of-stream marks the subscriber as gone.

use crate::error::Result;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Subscriber {
    peer: SocketAddr,
    writer: OwnedWriteHalf,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl Subscriber {
    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn send_lines(&mut self, lines: &[String]) -> std::io::Result<()> {
        for line in lines {
            debug!("\t{}: {}", self.peer, line.trim_end());
            self.writer.write_all(line.as_bytes()).await?;
        }
        self.writer.flush().await
    }
}

/// Connected device subscribers
#[derive(Default)]
pub struct DeviceHub {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl DeviceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an accepted connection
    pub async fn register(&self, stream: TcpStream) -> Result<SocketAddr> {
        let peer = stream.peer_addr()?;
        let (mut read_half, writer) = stream.into_split();
        let closed = Arc::new(AtomicBool::new(false));

        let flag = closed.clone();
        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
            flag.store(true, Ordering::SeqCst);
        });

        info!("Accepted device client: {peer}");
        self.subscribers.lock().await.push(Subscriber {
            peer,
            writer,
            closed,
            reader,
        });
        Ok(peer)
    }

    pub async fn count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Write every line to every live subscriber.
    ///
    /// Subscribers that are gone or fail a write are dropped. Returns how
    /// many subscribers received the full batch.
    pub async fn broadcast(&self, lines: &[String]) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let mut delivered = 0;
        let mut kept = Vec::with_capacity(subscribers.len());

        for mut subscriber in subscribers.drain(..) {
            if !subscriber.is_connected() {
                info!("Marking {} as disconnected", subscriber.peer);
                subscriber.reader.abort();
                continue;
            }

            debug!("Attempting to send control requests to {}", subscriber.peer);
            match subscriber.send_lines(lines).await {
                Ok(()) => {
                    delivered += 1;
                    kept.push(subscriber);
                }
                Err(e) => {
                    warn!(
                        "Marking {} as disconnected due to write error: {e}",
                        subscriber.peer
                    );
                    subscriber.reader.abort();
                }
            }
        }

        *subscribers = kept;
        delivered
    }

    /// Close every subscriber connection
    pub async fn close_all(&self) {
        let mut subscribers = self.subscribers.lock().await;
        for mut subscriber in subscribers.drain(..) {
            if let Err(e) = subscriber.writer.shutdown().await {
                debug!("Device connection close for {}: {e}", subscriber.peer);
            }
            subscriber.reader.abort();
        }
    }
}
