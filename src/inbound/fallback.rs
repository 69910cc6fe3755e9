//! Fallback relay.
//!
//! Splices an unrecognized connection to the local fallback web server so a
//! probe sees nothing but that server. The peer side is read through the
//! classification `BufReader`, which still holds the peeked bytes — the
//! fallback target receives the byte stream from its very first byte.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Relay the connection to `127.0.0.1:<dest_port>`.
///
/// Two pump tasks copy each direction; a bounded channel collects their
/// results and the first completion wins. EOF-like closures are normal
/// completion. The dialed socket is torn down on every path.
pub(crate) async fn relay<S>(reader: BufReader<S>, dest_port: u16) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let target = match TcpStream::connect(("127.0.0.1", dest_port)).await {
        Ok(target) => target,
        Err(e) => {
            let mut reader = reader;
            let _ = reader.shutdown().await;
            return Err(Error::Network(e));
        }
    };

    let (mut peer_read, mut peer_write) = tokio::io::split(reader);
    let (mut target_read, mut target_write) = target.into_split();

    let (tx, mut rx) = mpsc::channel::<std::io::Result<u64>>(2);

    let tx_up = tx.clone();
    let upstream = tokio::spawn(async move {
        let result = tokio::io::copy(&mut peer_read, &mut target_write).await;
        let _ = target_write.shutdown().await;
        let _ = tx_up.send(result).await;
    });

    let downstream = tokio::spawn(async move {
        let result = tokio::io::copy(&mut target_read, &mut peer_write).await;
        let _ = peer_write.shutdown().await;
        let _ = tx.send(result).await;
    });

    let first = rx.recv().await;

    // The surviving pump dies with its halves; that also closes the target.
    upstream.abort();
    downstream.abort();

    match first {
        Some(Err(e)) if e.kind() != ErrorKind::UnexpectedEof => Err(Error::Network(e)),
        _ => Ok(()),
    }
}
