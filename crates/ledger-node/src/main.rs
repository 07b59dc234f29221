use clap::Parser;
use ledger_node::{consensus, directory, Args, NodeState};
use ledger_storage::open_store;
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.node_config()?;
    let port = config.port();

    let node = match open_store(args.store.into(), &args.data_dir, &port.to_string())
        .map_err(anyhow::Error::from)
        .and_then(|store| NodeState::open(config, Arc::from(store)))
    {
        Ok(node) => node,
        Err(err) => {
            error!("cannot load the chain snapshot: {err:#}");
            std::process::exit(1);
        }
    };

    for peer in &args.peers {
        if node.add_peer(peer).await? {
            info!(%peer, "registered static peer");
        }
    }
    if let Some(dir) = &args.directory {
        if let Err(err) = directory::join(&node, dir).await {
            warn!("directory registration failed: {err:#}");
        }
    }

    if !args.skip_initial_sync {
        info!("syncing with peers before serving");
        if consensus::resolve_conflicts(&node).await {
            info!(height = node.height().await, "pulled a longer chain from the network");
        } else {
            info!(height = node.height().await, "local chain is up to date");
        }
    }

    let addr: SocketAddr = args.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(node_id = %node.config().node_id, "ledger-node listening on http://{addr}");
    ledger_node::serve(listener, node.clone(), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    if let Some(dir) = &args.directory {
        if let Err(err) = directory::leave(&node, dir).await {
            warn!("directory unregistration failed: {err:#}");
        }
    }
    info!("ledger-node stopped");
    Ok(())
}
