//! Crate-wide error type for the SSH-tunneled transport.

use thiserror::Error;

/// Errors surfaced by any stage of the transport: spawning the tunnel,
/// negotiating the mux, dialing the RPC/HTTP planes, or serving them.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local `ssh` binary could not be spawned at all.
    #[error("failed to spawn ssh: {0}")]
    Spawn(#[source] std::io::Error),

    /// The remote repository failed to load. This is what the client's
    /// stderr triage (see [`crate::factory::build_error`]) produces when the
    /// remote's stderr output matches one of the known "not found" signals.
    #[error("repository not found at {path}")]
    RepositoryNotFound {
        /// The path that was requested on the remote host.
        path: String,
    },

    /// Mux, RPC, or HTTP registration failed during session setup.
    #[error("{context}: {cause}")]
    SetupFailed {
        /// What we were trying to do.
        context: String,
        /// The low-level cause, usually with remote stderr appended.
        cause: String,
    },

    /// The remote process exited while operations were still in flight.
    #[error("remote process exited")]
    RemoteExited,

    /// The session (or one of its substreams) was torn down explicitly.
    #[error("connection closed")]
    Closed,

    /// A file-transfer HTTP request failed; carries the status the server
    /// returned and the response body text.
    #[error("upload failed ({status}): {message}")]
    Upload {
        /// HTTP status code returned by the remote file handler.
        status: u16,
        /// Response body text, surfaced verbatim to the caller.
        message: String,
    },

    /// A remote operand (URL, query parameter, ...) was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mux error: {0}")]
    Mux(#[from] yamux::ConnectionError),

    #[error("rpc transport error: {0}")]
    Rpc(#[from] tonic::transport::Error),

    #[error("rpc status: {0}")]
    Status(#[from] tonic::Status),
}

pub type Result<T> = std::result::Result<T, TransportError>;
