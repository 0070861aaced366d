//! Adapts an independent reader and writer into one `AsyncRead + AsyncWrite`
//! value, the shape both [`crate::mux`] and `yamux::Connection::new` expect.
//!
//! Generalizes the teacher crate's `ConnectionStream` blanket trait (which
//! assumed a single split-capable socket like `TcpStream`) to the case where
//! the two halves are genuinely two different handles — a child process's
//! stdout and stdin pipes, which cannot be produced by splitting one value.

use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A pinned pair of (reader, writer) presented as one duplex stream.
///
/// `close()` on the writer half is deliberately never called by anything
/// that wraps a `PipeConn` around an ssh child's stdio: closing either pipe
/// would tear down the ssh session immediately, pre-empting the mux's own
/// orderly shutdown (spec §4.2). [`AsyncWrite::poll_shutdown`] is
/// implemented as a no-op for that reason — termination is driven by the
/// subprocess exiting, not by shutting down this adapter.
pub struct PipeConn<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> PipeConn<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> AsyncRead for PipeConn<R, W>
where
    R: AsyncRead + Unpin,
    W: Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.reader).poll_read(cx, buf)
    }
}

impl<R, W> AsyncWrite for PipeConn<R, W>
where
    R: Unpin,
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        Pin::new(&mut this.writer).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.writer).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        // No-op by design: see the struct docs.
        Poll::Ready(Ok(()))
    }
}

/// Blanket bound describing what the mux needs from a `PipeConn`'s halves.
pub trait PipeHalf: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> PipeHalf for T {}
