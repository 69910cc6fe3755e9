//! Host-runtime capabilities consumed by the session loop.
//!
//! The inbound never dials upstream itself; it asks a [`Dispatcher`] for a
//! full-duplex [`Link`] to a logical destination and speaks through that.
//! Tests may run without one, in which case DATA frames are dropped.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::Result;

/// A logical upstream destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Destination {
    /// Build a destination.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One side of a dispatched upstream connection.
#[async_trait]
pub trait Link: Send {
    /// Write a batch of buffers to the upstream.
    async fn write(&mut self, buffers: Vec<Bytes>) -> Result<()>;

    /// Half-close the write side, signalling end of request.
    async fn close_write(&mut self) -> Result<()>;

    /// Read once from the upstream. `None` means EOF.
    async fn read(&mut self) -> Result<Option<Bytes>>;
}

/// Routing capability: resolves a logical destination to a live link.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Open a link to the given destination.
    async fn dispatch(&self, destination: Destination) -> Result<Box<dyn Link>>;
}

/// Plain TCP dispatcher; dials the destination directly.
pub struct TcpDispatcher;

#[async_trait]
impl Dispatcher for TcpDispatcher {
    async fn dispatch(&self, destination: Destination) -> Result<Box<dyn Link>> {
        let stream = TcpStream::connect((destination.host.as_str(), destination.port)).await?;
        let (reader, writer) = stream.into_split();
        Ok(Box::new(TcpLink { reader, writer }))
    }
}

struct TcpLink {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl Link for TcpLink {
    async fn write(&mut self, buffers: Vec<Bytes>) -> Result<()> {
        for buffer in &buffers {
            self.writer.write_all(buffer).await?;
        }
        Ok(())
    }

    async fn close_write(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Bytes>> {
        let mut buf = vec![0u8; 8192];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}
