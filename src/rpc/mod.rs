//! The RPC plane: a tonic client/server pair for the chunk-store metadata
//! service, dialed and served over mux substreams rather than TCP.

pub mod client;
pub mod server;

/// Generated from `proto/chunk_store.proto` by `build.rs`.
pub mod proto {
    tonic::include_proto!("chunkstore");
}

/// Ceiling applied uniformly to the mux's per-stream window and to tonic's
/// encode/decode limits, so the two can never drift apart (spec §6).
pub const MAX_MESSAGE_SIZE: usize = crate::mux::MAX_MESSAGE_SIZE;
