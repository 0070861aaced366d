//! Turns the mux's accepted substreams into the `Stream` of connections
//! `tonic::transport::Server::serve_with_incoming` and our HTTP accept loop
//! both expect (spec §4.3), and demultiplexes between the two protocols a
//! substream might carry.
//!
//! Streams are tagless at the mux level (spec §9): no custom framing is
//! added. Routing instead peeks the handful of bytes every HTTP/2 client
//! preface (`PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n`, what tonic's RPC client
//! speaks) starts with, versus an HTTP/1.1 request line (what the file
//! transfer client speaks) — the same "sniff the real protocol bytes, don't
//! invent a header" shape as Go's `cmux`, just without a dependency for it.

use crate::error::{Result, TransportError};
use crate::mux::SharedMux;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;
use yamux::Stream as MuxStream;

const H2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// A substream with its first few bytes already read out and buffered, so
/// they can still be delivered to whichever server ultimately claims it.
pub struct PeekedStream {
    prefix: Vec<u8>,
    prefix_pos: usize,
    inner: MuxStream,
}

impl AsyncRead for PeekedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        if this.prefix_pos < this.prefix.len() {
            let remaining = &this.prefix[this.prefix_pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            this.prefix_pos += n;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PeekedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }
    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// No per-connection metadata to surface; a mux substream has no peer
/// address of its own to report. Required by `Server::serve_with_incoming`.
impl tonic::transport::server::Connected for PeekedStream {
    type ConnectInfo = ();

    fn connect_info(&self) -> Self::ConnectInfo {}
}

/// A `Stream` of accepted, already-routed substreams for one protocol.
pub struct StreamListener {
    rx: mpsc::Receiver<PeekedStream>,
}

impl Stream for StreamListener {
    type Item = std::result::Result<PeekedStream, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx).map(|opt| opt.map(Ok))
    }
}

impl StreamListener {
    /// Waits for the next routed substream. Unlike `Stream::poll_next`,
    /// never yields `None` while the mux is alive; used to implement
    /// `axum::serve::Listener`, whose `accept` contract has no "closed"
    /// case of its own (the caller just stops polling when it wants to
    /// stop serving).
    pub async fn accept_one(&mut self) -> Option<PeekedStream> {
        self.rx.recv().await
    }
}

impl axum::serve::Listener for StreamListener {
    type Io = PeekedStream;
    type Addr = &'static str;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            if let Some(stream) = self.accept_one().await {
                return (stream, "mux-substream");
            }
            // The mux closed; axum's serve loop has no way to stop itself
            // short of the future being dropped, so park here rather than
            // spin — `Session::close` drops the whole serve task instead.
            std::future::pending::<()>().await;
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        Ok("mux-substream")
    }
}

/// Accept substreams from `mux` forever, peek each one's leading bytes, and
/// forward it to the RPC or HTTP listener depending on which protocol it
/// looks like. Runs until the mux's inbound channel closes.
///
/// Returns the two listeners to hand to the RPC server and the HTTP server
/// respectively.
pub fn demux(mux: SharedMux) -> (StreamListener, StreamListener) {
    let (rpc_tx, rpc_rx) = mpsc::channel(32);
    let (http_tx, http_rx) = mpsc::channel(32);

    tokio::spawn(async move {
        loop {
            let stream = match mux.accept_stream().await {
                Ok(Some(stream)) => stream,
                Ok(None) | Err(_) => break,
            };

            let peeked = match peek_prefix(stream, H2_PREFACE.len()).await {
                Ok(peeked) => peeked,
                Err(_) => continue,
            };

            let target = if peeked.prefix.starts_with(H2_PREFACE) {
                &rpc_tx
            } else {
                &http_tx
            };
            if target.send(peeked).await.is_err() {
                break;
            }
        }
    });

    (StreamListener { rx: rpc_rx }, StreamListener { rx: http_rx })
}

async fn peek_prefix(mut stream: MuxStream, want: usize) -> Result<PeekedStream> {
    use tokio::io::AsyncReadExt;

    let mut prefix = vec![0u8; want];
    let mut filled = 0;
    while filled < want {
        let n = stream
            .read(&mut prefix[filled..])
            .await
            .map_err(TransportError::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    prefix.truncate(filled);

    Ok(PeekedStream {
        prefix,
        prefix_pos: 0,
        inner: stream,
    })
}
