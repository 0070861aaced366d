//! SSH-tunneled remote transport.
//!
//! Spawns a child `ssh` process running a hidden `transfer` subcommand on
//! the remote side, and multiplexes an RPC service (chunk-store metadata
//! and coordination calls) and an HTTP file-transfer service over the
//! resulting single pipe.
//!
//! Entry points: [`factory::TransferFactory`] on the client, and
//! [`transfer_cmd::run`] on the server.

pub mod chunk_store;
pub mod error;
pub mod factory;
pub mod file_handler;
pub mod http_transport;
pub mod listener;
pub mod mux;
pub mod pipe_conn;
pub mod rpc;
pub mod session;
pub mod shutdown;
pub mod stderr_buffer;
pub mod transfer_cmd;
pub mod url;

pub use error::{Result, TransportError};
pub use factory::TransferFactory;
pub use session::Session;
