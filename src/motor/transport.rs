//! Shared access to one physical serial link.
//!
//! Exactly one [`TransportHandle`] owns a link. Controllers relayed through
//! the same link hold a [`RelayLink`], a weak reference that is upgraded only
//! for the duration of one call. Dropping the handle closes the link for every
//! relay.
//!
//! Replies on the link are positional rather than tagged, so every
//! request/response pair runs under the link mutex: no other writer can touch
//! the port between a request and the read of its reply.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::trace;

use crate::error::{ControllerError, ProtocolError, TransportError};
use crate::serial::SerialPortIO;

type SharedPort = Arc<Mutex<Box<dyn SerialPortIO>>>;

/// Owning handle to a serial link.
pub struct TransportHandle {
    port: SharedPort,
    read_timeout: Duration,
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl TransportHandle {
    /// Take ownership of `port`; reply reads give up after `read_timeout`
    pub fn new(port: Box<dyn SerialPortIO>, read_timeout: Duration) -> Self {
        Self {
            port: Arc::new(Mutex::new(port)),
            read_timeout,
        }
    }

    /// Non-owning reference for controllers relayed through this link
    pub fn relay_link(&self) -> RelayLink {
        RelayLink {
            port: Arc::downgrade(&self.port),
            read_timeout: self.read_timeout,
        }
    }

    /// Write a frame without waiting for a reply
    pub async fn send(&self, frame: &[u8]) -> Result<(), ControllerError> {
        send_on(&self.port, frame).await
    }

    /// Write a request and read exactly `reply_len` bytes back
    pub async fn exchange(&self, request: &[u8], reply_len: usize) -> Result<Vec<u8>, ControllerError> {
        exchange_on(&self.port, request, reply_len, self.read_timeout).await
    }
}

/// Weak reference to a link owned by another controller.
#[derive(Clone)]
pub struct RelayLink {
    port: Weak<Mutex<Box<dyn SerialPortIO>>>,
    read_timeout: Duration,
}

impl std::fmt::Debug for RelayLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayLink")
            .field("open", &self.is_open())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl RelayLink {
    /// Whether the owning handle is still alive
    pub fn is_open(&self) -> bool {
        self.port.strong_count() > 0
    }

    fn upgrade(&self) -> Result<SharedPort, TransportError> {
        self.port.upgrade().ok_or(TransportError::Closed)
    }

    /// Write a frame without waiting for a reply
    pub async fn send(&self, frame: &[u8]) -> Result<(), ControllerError> {
        let port = self.upgrade()?;
        send_on(&port, frame).await
    }

    /// Write a request and read exactly `reply_len` bytes back
    pub async fn exchange(&self, request: &[u8], reply_len: usize) -> Result<Vec<u8>, ControllerError> {
        let port = self.upgrade()?;
        exchange_on(&port, request, reply_len, self.read_timeout).await
    }
}

async fn send_on(port: &SharedPort, frame: &[u8]) -> Result<(), ControllerError> {
    let mut port = port.lock().await;
    port.write_all(frame).await.map_err(TransportError::Io)?;
    port.flush().await.map_err(TransportError::Io)?;
    trace!("Sent frame ({} bytes)", frame.len());
    Ok(())
}

async fn exchange_on(
    port: &SharedPort,
    request: &[u8],
    reply_len: usize,
    read_timeout: Duration,
) -> Result<Vec<u8>, ControllerError> {
    let mut port = port.lock().await;

    port.discard_input().map_err(TransportError::Io)?;
    port.write_all(request).await.map_err(TransportError::Io)?;
    port.flush().await.map_err(TransportError::Io)?;

    let mut reply = vec![0u8; reply_len];
    let mut received = 0;
    let read_reply = async {
        while received < reply_len {
            let n = port.read(&mut reply[received..]).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
            }
            received += n;
        }
        Ok::<(), std::io::Error>(())
    };
    let outcome = tokio::time::timeout(read_timeout, read_reply).await;

    match outcome {
        Ok(Ok(())) => {
            trace!("Exchanged {} byte request for {} byte reply", request.len(), reply_len);
            Ok(reply)
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(short_reply(reply_len, received)),
        Ok(Err(e)) => Err(TransportError::Io(e).into()),
        Err(_) if received == 0 => Err(TransportError::Timeout(read_timeout.as_millis() as u64).into()),
        Err(_) => Err(short_reply(reply_len, received)),
    }
}

/// A reply that started arriving but stopped before its full length
fn short_reply(expected: usize, actual: usize) -> ControllerError {
    ProtocolError::TooShort { expected, actual }.into()
}
