//! Connection to the Artemis feed server
//!
//! The `Connector` trait is the seam between the read loop and the network:
//! production uses `TcpConnector`, tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

use crate::error::FeedError;

/// Lifecycle of the feed connection as seen by the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Reconnecting,
}

/// Opens byte streams to the event source.
#[async_trait]
pub trait Connector: Send {
    type Stream: AsyncRead + Unpin + Send;

    async fn connect(&mut self) -> Result<Self::Stream, FeedError>;

    /// Human-readable target for log lines
    fn target(&self) -> String;
}

/// Connects to the feed over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
    keepalive: Option<Duration>,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
            keepalive: None,
        }
    }

    /// Enable TCP keepalive probes after `idle` without traffic, so a peer that
    /// vanished without closing the connection surfaces as a read error.
    pub fn with_keepalive(mut self, idle: Option<Duration>) -> Self {
        self.keepalive = idle;
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self) -> Result<TcpStream, FeedError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(FeedError::Connect {
                    addr: self.target(),
                    source,
                })
            }
            Err(_) => {
                return Err(FeedError::ConnectTimeout {
                    addr: self.target(),
                    timeout: self.connect_timeout,
                })
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        if let Some(idle) = self.keepalive {
            let keepalive = TcpKeepalive::new().with_time(idle);
            if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
                tracing::warn!(error = %e, "failed to enable TCP keepalive");
            }
        }

        Ok(stream)
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
