pub mod api;
pub mod client;
pub mod config;
pub mod consensus;
pub mod directory;
pub mod gossip;
pub mod miner;
pub mod state;

use std::{future::Future, net::SocketAddr};
use tokio::net::TcpListener;

pub use config::{Args, NodeConfig, RelayPolicy};
pub use state::NodeState;

/// Serve the node API on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    node: NodeState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, api::router(node))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Serve a directory service on `listener` until `shutdown` resolves.
pub async fn serve_directory(
    listener: TcpListener,
    state: directory::DirectoryState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        directory::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
