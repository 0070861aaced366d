//! Stream multiplexing over a single duplex pipe (spec §4.1).
//!
//! Wraps the `yamux` crate's `Connection` in a small handle that hides its
//! poll-driven control loop behind a background task, the same shape the
//! teacher crate gives its framed connections in `connection.rs`: callers
//! get plain async methods (`open_stream`, `accept_stream`) backed by a
//! task they never have to drive themselves.

use crate::error::{Result, TransportError};
use crate::pipe_conn::PipeHalf;
use futures::future::poll_fn;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use yamux::{Config, Connection, ConnectionError, Mode, Stream};

/// Largest single RPC or control message the mux is configured to accept.
/// Matches the chunk-store RPC layer's own ceiling (spec §4.6), since both
/// planes share one set of stream buffers.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A multiplexed session over one duplex transport.
///
/// `open_stream` dials a new substream from our side; `accept_stream`
/// receives substreams the remote side opened. Both the RPC server/client
/// and the HTTP server/client dial and accept through the same `MuxSession`,
/// racing each other for inbound substreams (spec §9, "tagless routing").
pub struct MuxSession {
    opener: Mutex<OpenHandle>,
    inbound: Mutex<mpsc::Receiver<Stream>>,
}

struct OpenHandle {
    control: yamux::Control,
}

impl MuxSession {
    /// Build a session over `io`, configured as `mode`, and start its
    /// background pump task.
    ///
    /// The pump task owns the `yamux::Connection` itself and is the only
    /// thing that ever calls `poll_next_inbound`; everything else talks to
    /// it through the returned handle. The task exits (and drops its
    /// `Connection`, closing `io`) once both the control handle and the
    /// inbound channel are dropped.
    pub fn new<T>(io: T, mode: Mode) -> Self
    where
        T: PipeHalf,
    {
        // Both the per-connection receive window and the per-stream window
        // must match the RPC layer's MAX_MESSAGE_SIZE (spec §4.1, §6):
        // default-sized windows deadlock once a chunk batch message exceeds
        // them, since yamux blocks the writer until the reader grows the
        // window, and the reader can't grow it until it's read a message
        // that doesn't fit its own buffer.
        let mut config = Config::default();
        config.set_max_num_streams(4096);
        config.set_receive_window(MAX_MESSAGE_SIZE as u32);
        config.set_max_buffer_size(MAX_MESSAGE_SIZE);

        let connection = Connection::new(io, config, mode);
        let control = connection.control();
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(Self::pump(connection, tx));

        Self {
            opener: Mutex::new(OpenHandle { control }),
            inbound: Mutex::new(rx),
        }
    }

    async fn pump<T>(mut connection: Connection<T>, tx: mpsc::Sender<Stream>)
    where
        T: PipeHalf,
    {
        loop {
            let next = poll_fn(|cx| connection.poll_next_inbound(cx)).await;
            match next {
                Some(Ok(stream)) => {
                    if tx.send(stream).await.is_err() {
                        break;
                    }
                }
                Some(Err(_)) | None => break,
            }
        }
    }

    /// Open a new outbound substream.
    pub async fn open_stream(&self) -> Result<Stream> {
        let mut handle = self.opener.lock().await;
        handle
            .control
            .open_stream()
            .await
            .map_err(TransportError::Mux)
    }

    /// Receive the next inbound substream the remote side opened.
    ///
    /// Returns `Ok(None)` once the underlying connection has closed
    /// cleanly; any polling error surfaces as `Err`.
    pub async fn accept_stream(&self) -> Result<Option<Stream>> {
        let mut rx = self.inbound.lock().await;
        Ok(rx.recv().await)
    }

    /// Close our half of the connection, signalling EOF to the remote side
    /// without tearing down the substreams still in flight.
    pub async fn close(&self) -> Result<()> {
        let mut handle = self.opener.lock().await;
        handle
            .control
            .close()
            .await
            .map_err(|e: ConnectionError| TransportError::Mux(e))
    }
}

/// Owns the Arc so `MuxSession` can be shared freely between the session's
/// background tasks (RPC server, HTTP server, monitor loop).
pub type SharedMux = Arc<MuxSession>;
