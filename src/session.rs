//! The client-side session object: owns the ssh subprocess, the mux, the
//! RPC client, and the HTTP transport registration, and drives the
//! four-state lifecycle of spec §4.8.

use crate::error::{Result, TransportError};
use crate::http_transport::HttpTransportHandle;
use crate::mux::{MuxSession, SharedMux};
use crate::pipe_conn::PipeConn;
use crate::rpc::proto::chunk_store_client::ChunkStoreClient;
use crate::shutdown::Shutdown;
use crate::stderr_buffer::StderrBuffer;
use std::sync::Arc;
use tokio::process::Child;
use tokio::sync::Mutex;
use tonic::transport::Channel;
use tracing::{info, warn};
use yamux::Mode;

/// The four states a session can occupy (spec §4.8). `Spawning` is
/// implicit — a `Session` is only constructed once it has already reached
/// `Active`, since `TransferFactory::connect` does not return a handle
/// until the mux is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Active,
    Closing,
    Failed,
    Closed,
}

struct Inner {
    state: Mutex<State>,
    child: Mutex<Child>,
    mux: SharedMux,
    rpc: Mutex<ChunkStoreClient<Channel>>,
    http: HttpTransportHandle,
    stderr: StderrBuffer,
    shutdown: Shutdown,
}

/// A live connection to one remote `transfer` subcommand.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Spawn the ssh subprocess for `command`, establish the mux, dial the
    /// RPC client, and register the HTTP transport. Returns a `Session` in
    /// the `Active` state, or `Failed` information folded into the error.
    pub(crate) async fn connect(mut child: Child) -> Result<Self> {
        let stdin = child.stdin.take().ok_or(TransportError::RemoteExited)?;
        let stdout = child.stdout.take().ok_or(TransportError::RemoteExited)?;
        let stderr_pipe = child.stderr.take().ok_or(TransportError::RemoteExited)?;

        let stderr = StderrBuffer::spawn(stderr_pipe);
        let pipe = PipeConn::new(stdout, stdin);
        let mux: SharedMux = Arc::new(MuxSession::new(pipe, Mode::Client));

        let rpc = match crate::rpc::client::connect(mux.clone()).await {
            Ok(rpc) => rpc,
            Err(cause) => {
                let text = stderr.filtered_text().await;
                return Err(
                    crate::factory::TransferFactory::diagnose(
                        "dialing rpc client over mux",
                        "",
                        &text,
                        cause,
                    )
                    .await,
                );
            }
        };
        let http = HttpTransportHandle::register(mux.clone());
        let shutdown = Shutdown::new();

        let session = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Active),
                child: Mutex::new(child),
                mux,
                rpc: Mutex::new(rpc),
                http,
                stderr,
                shutdown,
            }),
        };

        session.spawn_monitor();
        Ok(session)
    }

    /// Forces the mux's read loop to keep running by repeatedly accepting
    /// substreams the remote side never opens; the accept resolves with
    /// `Ok(None)` or an error the instant the remote process exits and the
    /// pipe closes, which is how remote-exit detection is wired without a
    /// dedicated protocol message (spec §9, "subprocess exit detection").
    fn spawn_monitor(&self) {
        let inner = self.inner.clone();
        let shutdown = inner.shutdown.child();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    result = inner.mux.accept_stream() => {
                        match result {
                            Ok(Some(_)) => continue,
                            Ok(None) | Err(_) => {
                                warn!("remote transfer process exited");
                                *inner.state.lock().await = State::Failed;
                                inner.shutdown.cancel();
                                break;
                            }
                        }
                    }
                }
            }
        });
    }

    pub fn mux(&self) -> SharedMux {
        self.inner.mux.clone()
    }

    pub fn http(&self) -> HttpTransportHandle {
        self.inner.http.clone()
    }

    pub async fn rpc(&self) -> Result<ChunkStoreClient<Channel>> {
        match *self.inner.state.lock().await {
            State::Active => Ok(self.inner.rpc.lock().await.clone()),
            State::Failed => Err(TransportError::RemoteExited),
            State::Closing | State::Closed => Err(TransportError::Closed),
        }
    }

    pub async fn state(&self) -> State {
        *self.inner.state.lock().await
    }

    /// Runs the fixed teardown order from spec §4.7.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            if matches!(*state, State::Closing | State::Closed) {
                return Ok(());
            }
            *state = State::Closing;
        }

        self.inner.http.unregister();
        self.inner.shutdown.cancel();
        // mux.close() sends yamux's own termination frame over the pipe,
        // which is what actually signals EOF to the remote `transfer`
        // process (the pipe's stdin handle itself is owned by the mux's
        // internal connection, not exposed back to `Session`, per
        // PipeConn's no-op `AsyncWrite::shutdown`).
        self.inner.mux.close().await.ok();
        {
            let mut child = self.inner.child.lock().await;
            let _ = child.start_kill();
            let _ = child.wait().await;
        }

        *self.inner.state.lock().await = State::Closed;
        info!("session closed");
        Ok(())
    }
}
