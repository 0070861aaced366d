//! `TransferCmd`: the hidden `transfer` subcommand that runs on the remote
//! side of the ssh tunnel (spec §4.5), serving the RPC and HTTP planes over
//! stdin/stdout.

use crate::chunk_store::ChunkStoreBackend;
use crate::listener;
use crate::mux::{MuxSession, SharedMux};
use crate::pipe_conn::PipeConn;
use crate::shutdown::Shutdown;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use yamux::Mode;

/// Runs the server side of one transfer session to completion and returns
/// the process exit code (spec §4.5 step 7, §6): 0 on clean close or outer
/// cancellation, 1 on any server error.
pub async fn run(backend: Arc<dyn ChunkStoreBackend>, shutdown: Shutdown) -> i32 {
    // Rust has no implicit "SIGPIPE terminates the process" default once a
    // handler is installed for it; installing one and dropping every event
    // achieves the "ignore broken-pipe signals outright" policy spec §4.5
    // step 1 calls for, so a write after the client hangs up surfaces as an
    // `io::Error` instead of a signal.
    let mut sigpipe = match signal(SignalKind::pipe()) {
        Ok(sig) => sig,
        Err(e) => {
            error!(error = %e, "failed to install SIGPIPE handler");
            return 1;
        }
    };
    tokio::spawn(async move { while sigpipe.recv().await.is_some() {} });

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let pipe = PipeConn::new(stdin, stdout);
    let mux: SharedMux = Arc::new(MuxSession::new(pipe, Mode::Server));

    let (rpc_incoming, http_incoming) = listener::demux(mux.clone());

    let rpc_backend = backend.clone();
    let rpc_task = tokio::spawn(crate::rpc::server::serve(rpc_backend, rpc_incoming));

    let http_router = crate::file_handler::router(backend);
    let http_task = tokio::spawn(serve_http(http_router, http_incoming));

    tokio::select! {
        _ = shutdown.recv() => {
            info!("session close requested");
            0
        }
        result = rpc_task => {
            match result {
                Ok(Ok(())) => 0,
                Ok(Err(e)) => { error!(error = %e, "rpc server error"); 1 }
                Err(e) => { error!(error = %e, "rpc server task panicked"); 1 }
            }
        }
        result = http_task => {
            match result {
                Ok(Ok(())) => 0,
                Ok(Err(e)) => { error!(error = %e, "http server error"); 1 }
                Err(e) => { error!(error = %e, "http server task panicked"); 1 }
            }
        }
    }
}

async fn serve_http(
    router: axum::Router,
    incoming: listener::StreamListener,
) -> crate::error::Result<()> {
    axum::serve(incoming, router)
        .await
        .map_err(crate::error::TransportError::Io)
}
