//! Client side of the HTTP file-transfer plane: opens one mux substream per
//! request and speaks HTTP/1.1 over it, the idiomatic way to run HTTP atop
//! a non-TCP stream (the same pattern the `bollard` Docker client uses for
//! its Unix-socket API — grounded via the `matbeedotcom-remotemedia-sdk`
//! reference pack, which depends on `bollard` for its container transport).
//!
//! Registered in a process-wide registry keyed by a per-session opaque
//! token (spec §9, redesign option (b)): the wire-level `Host` header stays
//! the literal `transfer.local` the server expects, while disambiguating
//! which session's mux a given in-process client should dial is done by a
//! token the caller keeps, not by anything visible on the wire.

use crate::error::{Result, TransportError};
use crate::mux::SharedMux;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

/// The `Host` header every request on this plane carries, regardless of
/// which session actually handles it (spec §4.6).
pub const VIRTUAL_HOST: &str = "transfer.local";

fn registry() -> &'static RwLock<HashMap<String, SharedMux>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, SharedMux>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn next_token() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("sess-{n}-{:p}", &n)
}

/// A registered, per-session HTTP client handle.
#[derive(Clone)]
pub struct HttpTransportHandle {
    token: String,
}

impl HttpTransportHandle {
    /// Register `mux`'s session in the process-wide transport registry and
    /// return a handle bound to it.
    pub fn register(mux: SharedMux) -> Self {
        let token = next_token();
        registry().write().unwrap().insert(token.clone(), mux);
        Self { token }
    }

    /// Remove this session from the registry. Idempotent.
    pub fn unregister(&self) {
        registry().write().unwrap().remove(&self.token);
    }

    fn mux(&self) -> Result<SharedMux> {
        registry()
            .read()
            .unwrap()
            .get(&self.token)
            .cloned()
            .ok_or(TransportError::Closed)
    }

    /// Issue one request over a freshly dialed substream.
    ///
    /// A new mux substream is opened per call rather than reusing a
    /// persistent HTTP/1.1 connection: uploads and range reads are
    /// infrequent enough relative to RPC traffic that the extra
    /// substream-open round trip is cheaper than keeping an idle
    /// connection (and its yamux flow-control window) open between calls.
    pub async fn request(
        &self,
        method: http::Method,
        path: &str,
        body: Bytes,
    ) -> Result<(http::StatusCode, Bytes)> {
        let mux = self.mux()?;
        let stream = mux.open_stream().await?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| TransportError::SetupFailed {
                context: "http1 handshake over mux substream".into(),
                cause: e.to_string(),
            })?;
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::HOST, VIRTUAL_HOST)
            .body(Full::new(body))
            .map_err(|e| TransportError::InvalidArgument(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| TransportError::SetupFailed {
                context: "sending http request over mux substream".into(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::SetupFailed {
                context: "reading http response body".into(),
                cause: e.to_string(),
            })?
            .to_bytes();

        Ok((status, body))
    }
}
