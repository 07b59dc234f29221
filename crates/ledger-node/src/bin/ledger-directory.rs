use clap::Parser;
use ledger_node::{config::DEFAULT_PEER_TIMEOUT_MS, directory::DirectoryState};
use std::{net::SocketAddr, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ledger-directory")]
#[command(about = "Directory service that introduces ledger nodes to each other")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, default_value = "127.0.0.1:8000")]
    listen: String,

    /// Timeout for introduction requests to nodes, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    peer_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let state = DirectoryState::new(Duration::from_millis(args.peer_timeout_ms))?;
    let addr: SocketAddr = args.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ledger-directory listening on http://{addr}");
    ledger_node::serve_directory(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}
