//! Serves the chunk-store RPC service over the substreams `listener.rs`
//! routed to us.

use crate::chunk_store::ChunkStoreBackend;
use crate::error::Result;
use crate::listener::StreamListener;
use crate::rpc::proto::chunk_store_server::{ChunkStore, ChunkStoreServer};
use crate::rpc::proto::{CallRequest, CallResponse};
use crate::rpc::MAX_MESSAGE_SIZE;
use std::sync::Arc;
use tonic::{Request, Response, Status};

struct ChunkStoreService {
    backend: Arc<dyn ChunkStoreBackend>,
}

#[tonic::async_trait]
impl ChunkStore for ChunkStoreService {
    async fn call(
        &self,
        request: Request<CallRequest>,
    ) -> std::result::Result<Response<CallResponse>, Status> {
        let payload = request.into_inner().payload;
        let response = self
            .backend
            .call(payload)
            .await
            .map_err(Status::internal)?;
        Ok(Response::new(CallResponse { payload: response }))
    }
}

/// Serve RPCs over `incoming` until the stream ends, dispatching every call
/// to `backend`.
pub async fn serve(backend: Arc<dyn ChunkStoreBackend>, incoming: StreamListener) -> Result<()> {
    let service = ChunkStoreService { backend };
    tonic::transport::Server::builder()
        .add_service(
            ChunkStoreServer::new(service)
                .max_decoding_message_size(MAX_MESSAGE_SIZE)
                .max_encoding_message_size(MAX_MESSAGE_SIZE),
        )
        .serve_with_incoming(incoming)
        .await
        .map_err(crate::error::TransportError::Rpc)
}
