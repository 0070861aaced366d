//! The repository-side collaborator this transport carries RPC and file
//! traffic for. The real chunk-store implementation is out of scope here
//! (spec §1); this module only defines the narrow interface the RPC and
//! HTTP layers need to call into it.

use async_trait::async_trait;

/// The upload parameters the file handler validates before ever touching
/// the backend (spec §4.6): `num_chunks`, `content_length`, the decoded
/// `content_hash`, and `split_offset`. Passed through to
/// [`ChunkStoreBackend::write_file`] unchanged, per spec.md's testable
/// property 3 ("parses ... and passes them unchanged to the chunk store").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFileMetadata {
    pub num_chunks: u64,
    pub content_length: u64,
    pub content_hash: Vec<u8>,
    pub split_offset: u64,
}

/// What the RPC plane's placeholder `Call` and the HTTP plane's file
/// handler both ultimately delegate to.
///
/// A production caller supplies their own implementation backed by the
/// actual repository storage; this crate ships no implementation of its
/// own beyond what tests need.
#[async_trait]
pub trait ChunkStoreBackend: Send + Sync + 'static {
    /// Handle one opaque RPC call, returning an opaque response payload.
    async fn call(&self, payload: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Read the bytes of `path`, relative to the repository root, optionally
    /// restricted to `range` (inclusive byte offsets), for the GET side of
    /// the file handler (spec §4.6).
    async fn read_file(
        &self,
        path: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Vec<u8>, std::io::Error>;

    /// Persist an uploaded chunk file, already validated by the caller
    /// against `num_chunks`/`content_length`/`content_hash`/`split_offset`,
    /// for the POST/PUT side of the file handler. `metadata` must reach the
    /// table-file write routine unchanged (spec §4.6).
    async fn write_file(
        &self,
        path: &str,
        data: Vec<u8>,
        metadata: ChunkFileMetadata,
    ) -> Result<(), std::io::Error>;
}

/// A plain filesystem-backed [`ChunkStoreBackend`], rooted at a repository's
/// `--data-dir`. Stands in for whatever real chunk-store implementation a
/// production `dolt` binary wires up — good enough for `transfer-cli` to
/// actually serve table files and echo RPC payloads off disk, without
/// reimplementing the repository format this transport deliberately leaves
/// out of scope.
pub struct FsBackend {
    root: std::path::PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> std::path::PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ChunkStoreBackend for FsBackend {
    async fn call(&self, payload: Vec<u8>) -> Result<Vec<u8>, String> {
        Ok(payload)
    }

    async fn read_file(
        &self,
        path: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Vec<u8>, std::io::Error> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        match range {
            Some((start, end)) => {
                let start = (start as usize).min(data.len());
                let end = ((end as usize) + 1).min(data.len());
                Ok(data[start..end.max(start)].to_vec())
            }
            None => Ok(data),
        }
    }

    async fn write_file(
        &self,
        path: &str,
        data: Vec<u8>,
        metadata: ChunkFileMetadata,
    ) -> Result<(), std::io::Error> {
        if data.len() as u64 != metadata.content_length {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "content_length mismatch: declared {} got {} bytes",
                    metadata.content_length,
                    data.len()
                ),
            ));
        }

        let dest = self.resolve(path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, data).await?;

        // A minimal sidecar so the validated fields genuinely reach
        // storage rather than being dropped once validation passes.
        let hash_hex = metadata
            .content_hash
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>();
        let sidecar = format!(
            "num_chunks={}\ncontent_hash={}\nsplit_offset={}\n",
            metadata.num_chunks, hash_hex, metadata.split_offset
        );
        tokio::fs::write(dest.with_extension("meta"), sidecar).await
    }
}

/// An in-memory [`ChunkStoreBackend`] used by this crate's own tests; not
/// exposed as part of the public API.
#[cfg(test)]
pub(crate) mod test_backend {
    use super::{ChunkFileMetadata, ChunkStoreBackend};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryBackend {
        files: Mutex<HashMap<String, Vec<u8>>>,
        /// The metadata each `write_file` call was given, keyed by path —
        /// lets tests assert it reached the backend unchanged.
        pub metadata: Mutex<HashMap<String, ChunkFileMetadata>>,
    }

    #[async_trait]
    impl ChunkStoreBackend for InMemoryBackend {
        async fn call(&self, payload: Vec<u8>) -> Result<Vec<u8>, String> {
            Ok(payload)
        }

        async fn read_file(
            &self,
            path: &str,
            range: Option<(u64, u64)>,
        ) -> Result<Vec<u8>, std::io::Error> {
            let files = self.files.lock().await;
            let data = files
                .get(path)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
            match range {
                Some((start, end)) => {
                    let start = start as usize;
                    let end = ((end as usize) + 1).min(data.len());
                    Ok(data[start.min(data.len())..end].to_vec())
                }
                None => Ok(data.clone()),
            }
        }

        async fn write_file(
            &self,
            path: &str,
            data: Vec<u8>,
            metadata: ChunkFileMetadata,
        ) -> Result<(), std::io::Error> {
            self.files.lock().await.insert(path.to_string(), data);
            self.metadata
                .lock()
                .await
                .insert(path.to_string(), metadata);
            Ok(())
        }
    }
}
