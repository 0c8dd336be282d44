//! UDP transport for DNS queries.
//!
//! One socket is bound at startup and shared by every query; resolution is
//! strictly sequential so the socket never has more than one exchange in
//! flight. A query that gets no reply within the timeout is resent exactly
//! once; a second miss surfaces as `Timeout`.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::message::MAX_MESSAGE_SIZE;

/// Port DNS servers listen on.
pub const DNS_PORT: u16 = 53;

/// Trait for exchanging a raw query for raw response bytes.
///
/// Implementations can go over the wire or replay scripted responses in
/// tests; the resolver never sees the difference.
pub trait Transport: Send + Sync + Clone + 'static {
    fn exchange(&self, server: IpAddr, query: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Production transport over a shared UDP socket.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    port: u16,
    timeout: Duration,
}

impl UdpTransport {
    /// Bind the process-wide socket. Failure here is fatal to the caller;
    /// nothing else in the client can run without it.
    pub async fn bind(port: u16, timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(TransportError::Socket)?;
        Ok(Self {
            socket: Arc::new(socket),
            port,
            timeout,
        })
    }

    /// One send/receive attempt; `None` means the timeout elapsed.
    async fn attempt(&self, server: IpAddr, query: &[u8]) -> Result<Option<Vec<u8>>> {
        self.socket
            .send_to(query, (server, self.port))
            .await
            .map_err(TransportError::Socket)?;

        // 512 bytes is the classic UDP limit; larger replies truncate silently
        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        match time::timeout(self.timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _peer))) => Ok(Some(buf[..len].to_vec())),
            Ok(Err(err)) => Err(TransportError::Socket(err).into()),
            Err(_elapsed) => Ok(None),
        }
    }
}

impl Transport for UdpTransport {
    async fn exchange(&self, server: IpAddr, query: &[u8]) -> Result<Vec<u8>> {
        if let Some(response) = self.attempt(server, query).await? {
            return Ok(response);
        }

        debug!(%server, "no reply within timeout, retrying once");
        match self.attempt(server, query).await? {
            Some(response) => Ok(response),
            None => Err(TransportError::Timeout { server }.into()),
        }
    }
}
