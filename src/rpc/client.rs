//! Dials the chunk-store RPC service over a mux substream.

use crate::error::Result;
use crate::mux::SharedMux;
use crate::rpc::proto::chunk_store_client::ChunkStoreClient;
use crate::rpc::MAX_MESSAGE_SIZE;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tonic::transport::{Channel, Endpoint, Uri};
use tower::Service;

/// Connects to the remote `ChunkStore` service over `mux`.
///
/// Every gRPC connection attempt opens exactly one new mux substream
/// (spec §4.4 step 7); tonic's own HTTP/2 layer then multiplexes as many
/// concurrent RPCs as needed over that single substream, so only one
/// `open_stream` call happens per process lifetime under normal operation.
///
/// Built with `connect_with_connector_lazy` rather than the eager,
/// fallible `connect_with_connector`: the channel is handed back
/// immediately and individual RPC calls wait for the connector to resolve
/// instead of the whole client failing up front. This is what the session
/// monitor's `accept_stream` loop (`session.rs`) exists to unblock — a
/// call sitting on a channel that never becomes ready would otherwise
/// hang forever once the remote process has actually exited.
pub async fn connect(mux: SharedMux) -> Result<ChunkStoreClient<Channel>> {
    let channel =
        Endpoint::from_static("http://transfer.local").connect_with_connector_lazy(MuxConnector { mux });

    Ok(ChunkStoreClient::new(channel)
        .max_decoding_message_size(MAX_MESSAGE_SIZE)
        .max_encoding_message_size(MAX_MESSAGE_SIZE))
}

#[derive(Clone)]
struct MuxConnector {
    mux: SharedMux,
}

impl Service<Uri> for MuxConnector {
    type Response = TokioIo<yamux::Stream>;
    type Error = std::io::Error;
    #[allow(clippy::type_complexity)]
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: Uri) -> Self::Future {
        let mux = self.mux.clone();
        Box::pin(async move {
            let stream = mux
                .open_stream()
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            Ok(TokioIo::new(stream))
        })
    }
}
