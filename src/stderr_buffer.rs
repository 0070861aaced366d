//! Accumulates a subprocess's stderr while mirroring it to our own stderr,
//! and exposes a one-shot "done" signal for the moment stderr hits EOF.
//!
//! Reading the buffer before the done signal fires is a bug: the drainer is
//! asynchronous, so the buffer's contents are undefined until EOF (spec §9,
//! "Stderr as a diagnostic channel").

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::ChildStderr;
use tokio::sync::{Mutex, Notify};

/// Shared handle to a subprocess's drained stderr.
#[derive(Debug, Clone)]
pub struct StderrBuffer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    buffer: Mutex<Vec<u8>>,
    done: Notify,
    is_done: std::sync::atomic::AtomicBool,
}

impl StderrBuffer {
    /// Spawn the drainer task and return a handle to its output.
    ///
    /// Every line read from `stderr` is appended to the internal buffer and
    /// tee'd to the parent's own stderr, matching the `ssh` child's
    /// diagnostics being visible to whoever is running us interactively.
    pub fn spawn(stderr: ChildStderr) -> Self {
        let inner = Arc::new(Inner {
            buffer: Mutex::new(Vec::new()),
            done: Notify::new(),
            is_done: std::sync::atomic::AtomicBool::new(false),
        });

        let task_inner = inner.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut stderr_out = tokio::io::stderr();
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let _ = stderr_out.write_all(&line).await;
                        task_inner.buffer.lock().await.extend_from_slice(&line);
                    }
                    Err(_) => break,
                }
            }
            task_inner
                .is_done
                .store(true, std::sync::atomic::Ordering::SeqCst);
            task_inner.done.notify_waiters();
        });

        Self { inner }
    }

    /// Block until the drainer has observed EOF on stderr.
    pub async fn wait_done(&self) {
        if self.inner.is_done.load(std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        self.inner.done.notified().await;
    }

    /// Snapshot of the buffered stderr bytes, valid only after
    /// [`StderrBuffer::wait_done`] has returned.
    pub async fn contents(&self) -> Vec<u8> {
        self.inner.buffer.lock().await.clone()
    }

    /// `wait_done` followed by a UTF-8 (lossy) snapshot, filtered of the
    /// known-benign ssh warning line per spec §4.4.
    pub async fn filtered_text(&self) -> String {
        self.wait_done().await;
        let raw = String::from_utf8_lossy(&self.contents().await).into_owned();
        raw.lines()
            .filter(|line| !line.starts_with("Warning: Permanently added"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}
