//! `TransferFactory`: the client-side entry point for the `ssh://` URL
//! scheme (spec §4.4). Spawns the remote `transfer` subcommand over ssh and
//! hands back a `ChunkStoreHandle` ready for RPC and file-transfer calls.

use crate::error::{Result, TransportError};
use crate::session::Session;
use crate::url::RemoteUrl;
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

const DEFAULT_SSH: &str = "ssh";
const DEFAULT_REMOTE_DOLT_PATH: &str = "dolt";

/// Known-benign stderr substrings that flip the diagnosis to
/// "repository not found" rather than a generic setup error (spec §4.4,
/// §7).
const NOT_FOUND_SIGNALS: [&str; 2] = ["no such file or directory", "failed to load database"];

/// Connects to a remote `ssh://` target and returns a live [`Session`].
pub struct TransferFactory;

impl TransferFactory {
    /// Parse `url`, spawn the remote `transfer` subcommand over ssh, and
    /// establish the mux/RPC/HTTP planes.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn connect(url: &str) -> Result<Session> {
        let remote = RemoteUrl::parse(url)?;
        if remote.has_unsafe_path() {
            return Err(TransportError::InvalidArgument(format!(
                "remote path `{}` contains characters unsafe to interpolate into a shell command",
                remote.path()
            )));
        }

        let mut command = build_ssh_command(&remote);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(TransportError::Spawn)?;

        // Session::connect takes ownership of `child`; on failure it has
        // already torn down whatever pipes it managed to open, so the
        // stderr text available here is whatever it chose to capture
        // before failing. It folds that into the returned error itself
        // rather than handing stderr back to us, since by the time
        // `connect` fails the session-local stderr buffer may already be
        // gone.
        Session::connect(child).await
    }

    /// Builds the "repository not found" / "remote: &lt;stderr&gt;" diagnosis
    /// from a session's filtered stderr text, for callers (like
    /// [`Session::connect`]) that have direct access to an
    /// [`crate::stderr_buffer::StderrBuffer`].
    pub(crate) async fn diagnose(
        context: &str,
        path: &str,
        stderr_text: &str,
        cause: TransportError,
    ) -> TransportError {
        build_error(context, path, Some(stderr_text), cause).await
    }
}

/// Resolves `DOLT_SSH` (default `ssh`) into an executable plus leading
/// arguments, builds the full ssh command line for `remote`, and appends
/// the single remote command string (spec §4.4 step 2, §6).
fn build_ssh_command(remote: &RemoteUrl) -> Command {
    let ssh_spec = std::env::var("DOLT_SSH").unwrap_or_else(|_| DEFAULT_SSH.to_string());
    let mut parts = ssh_spec.split_whitespace();
    let ssh_bin = parts.next().unwrap_or(DEFAULT_SSH);
    let leading_args: Vec<&str> = parts.collect();

    let mut command = Command::new(ssh_bin);
    command.args(&leading_args);

    if let Some(port) = remote.port() {
        command.arg("-p").arg(port.to_string());
    }

    command.arg(remote.user_at_host());
    command.arg(remote_command_line(remote));
    command
}

/// The single string passed to the remote shell: `<dolt-path> --data-dir
/// <path> transfer` (spec §4.4 step 2, §6).
fn remote_command_line(remote: &RemoteUrl) -> String {
    let dolt_path =
        std::env::var("DOLT_SSH_EXEC_PATH").unwrap_or_else(|_| DEFAULT_REMOTE_DOLT_PATH.to_string());
    format!("{dolt_path} --data-dir {} transfer", remote.path())
}

/// The stderr-aware error builder from spec §4.4/§7: blocks on the
/// session's stderr-done signal, filters benign ssh lines, and classifies
/// the remaining text against [`NOT_FOUND_SIGNALS`] before falling back to
/// wrapping the low-level cause.
///
/// A free function (not a `Session` method) so it is independently
/// unit-testable against canned stderr fixtures.
pub(crate) async fn build_error(
    context: &str,
    path: &str,
    stderr_text: Option<&str>,
    cause: TransportError,
) -> TransportError {
    let stderr = stderr_text.unwrap_or_default();

    if stderr.is_empty() {
        return cause;
    }

    let lower = stderr.to_lowercase();
    if NOT_FOUND_SIGNALS.iter().any(|signal| lower.contains(signal)) {
        return TransportError::RepositoryNotFound {
            path: path.to_string(),
        };
    }

    TransportError::SetupFailed {
        context: context.to_string(),
        cause: format!("remote: {stderr}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_command_line_uses_defaults() {
        std::env::remove_var("DOLT_SSH_EXEC_PATH");
        let remote = RemoteUrl::parse("ssh://example.com/srv/repo").unwrap();
        assert_eq!(
            remote_command_line(&remote),
            "dolt --data-dir /srv/repo transfer"
        );
    }

    #[test]
    fn remote_command_line_honors_exec_path_override() {
        std::env::set_var("DOLT_SSH_EXEC_PATH", "/opt/dolt/bin/dolt");
        let remote = RemoteUrl::parse("ssh://example.com/srv/repo").unwrap();
        assert_eq!(
            remote_command_line(&remote),
            "/opt/dolt/bin/dolt --data-dir /srv/repo transfer"
        );
        std::env::remove_var("DOLT_SSH_EXEC_PATH");
    }

    #[tokio::test]
    async fn build_error_classifies_not_found() {
        let err = build_error(
            "ctx",
            "/srv/repo",
            Some("failed to load database: no such file or directory"),
            TransportError::RemoteExited,
        )
        .await;
        assert!(matches!(err, TransportError::RepositoryNotFound { .. }));
    }

    #[tokio::test]
    async fn build_error_falls_back_to_setup_failed() {
        let err = build_error(
            "establishing session",
            "/srv/repo",
            Some("database is read only"),
            TransportError::RemoteExited,
        )
        .await;
        match err {
            TransportError::SetupFailed { cause, .. } => {
                assert!(cause.contains("database is read only"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn build_error_passes_through_cause_when_stderr_empty() {
        let err = build_error("ctx", "/srv/repo", None, TransportError::RemoteExited).await;
        assert!(matches!(err, TransportError::RemoteExited));
    }
}
