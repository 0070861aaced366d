//! `transfer-cli`: stands in for the `<remote-dolt-path>` binary the
//! client side spawns over ssh (spec §4.4 step 2). Exposes the hidden
//! `transfer` subcommand `TransferFactory` invokes remotely; every other
//! `dolt` subcommand is out of scope for this crate (spec §1).

use anyhow::bail;
use clap::{Parser, Subcommand};
use ssh_remote_transport::chunk_store::FsBackend;
use ssh_remote_transport::shutdown::Shutdown;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dolt", about = "remote transfer endpoint")]
struct Cli {
    /// Path to the repository's data directory.
    #[arg(long, global = true)]
    data_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server side of one SSH-tunneled transfer session. Hidden:
    /// invoked by `TransferFactory` on the client, never typed by a user.
    #[command(hide = true)]
    Transfer,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if !std::path::Path::new(&cli.data_dir).is_dir() {
        // This exact phrasing is what the client's stderr triage (spec
        // §4.4, §7) recognizes as "repository not found".
        bail!(
            "failed to load database: no such file or directory: {}",
            cli.data_dir
        );
    }

    let Command::Transfer = cli.command;
    let backend = Arc::new(FsBackend::new(cli.data_dir));
    let shutdown = Shutdown::new();

    let code = ssh_remote_transport::transfer_cmd::run(backend, shutdown).await;
    if code == 0 {
        Ok(())
    } else {
        // anyhow's default `Termination` impl exits 1 on `Err`, matching
        // spec §6's server exit codes (0 clean, 1 on any server error).
        bail!("transfer session exited with an error")
    }
}
