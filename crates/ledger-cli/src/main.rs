use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{Timestamp, Transaction};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_NODE: &str = "http://127.0.0.1:5000";

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for ledger nodes")]
struct Cli {
    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        /// Node base URL (e.g. http://127.0.0.1:5000)
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Mine a block on a node
    Mine {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Print a node's chain
    Chain {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Print a node's pending transactions
    Pending {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Ask a node to resolve conflicts with its peers
    Resolve {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
    },
    /// Tell a node about other nodes
    Register {
        #[arg(long, default_value = DEFAULT_NODE)]
        node: String,
        /// Peer address, repeatable
        #[arg(long = "peer", required = true)]
        peers: Vec<String>,
    },
    /// Show height and pool size of one or more nodes
    Status {
        /// Node base URL, repeatable
        #[arg(long = "node", default_values_t = [DEFAULT_NODE.to_string()])]
        nodes: Vec<String>,
    },
}

fn base(node: &str) -> String {
    let node = node.trim_end_matches('/');
    if node.starts_with("http://") || node.starts_with("https://") {
        node.to_string()
    } else {
        format!("http://{node}")
    }
}

async fn print_response(res: Response) -> Result<()> {
    let status = res.status();
    let body: Value = res.json().await.context("node returned a non-JSON body")?;
    println!("status: {status}");
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn status_line(client: &Client, node: &str) -> String {
    let url = base(node);
    let chain = async {
        let chain: Value = client.get(format!("{url}/chain")).send().await?.json().await?;
        let pending: Value = client
            .get(format!("{url}/transactions/pending"))
            .send()
            .await?
            .json()
            .await?;
        Ok::<_, reqwest::Error>((chain["length"].as_u64(), pending["count"].as_u64()))
    };
    match chain.await {
        Ok((Some(length), Some(count))) => {
            format!("{url}  online  length={length}  pending={count}")
        }
        Ok(_) => format!("{url}  online  unexpected response"),
        Err(err) => {
            debug!(%err, "status request failed");
            format!("{url}  offline")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;

    match cli.cmd {
        Command::Submit {
            node,
            from,
            to,
            amount,
        } => {
            let tx = Transaction {
                sender: from,
                recipient: to,
                amount,
                time: Timestamp::now(),
            };
            let res = client
                .post(format!("{}/transactions/new", base(&node)))
                .json(&tx)
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Mine { node } => {
            let res = client.get(format!("{}/mine", base(&node))).send().await?;
            print_response(res).await?;
        }
        Command::Chain { node } => {
            let res = client.get(format!("{}/chain", base(&node))).send().await?;
            print_response(res).await?;
        }
        Command::Pending { node } => {
            let res = client
                .get(format!("{}/transactions/pending", base(&node)))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Resolve { node } => {
            let res = client
                .get(format!("{}/nodes/resolve", base(&node)))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Register { node, peers } => {
            let res = client
                .post(format!("{}/nodes/register", base(&node)))
                .json(&json!({ "nodes": peers }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Status { nodes } => {
            for node in &nodes {
                println!("{}", status_line(&client, node).await);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_adds_scheme_and_trims_slash() {
        assert_eq!(base("127.0.0.1:5000"), "http://127.0.0.1:5000");
        assert_eq!(base("http://127.0.0.1:5000/"), "http://127.0.0.1:5000");
        assert_eq!(base("https://node.example"), "https://node.example");
    }

    #[test]
    fn status_accepts_several_nodes() {
        let cli = Cli::parse_from([
            "ledger-cli",
            "status",
            "--node",
            "127.0.0.1:5000",
            "--node",
            "127.0.0.1:5001",
        ]);
        match cli.cmd {
            Command::Status { nodes } => assert_eq!(nodes.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn register_requires_a_peer() {
        assert!(Cli::try_parse_from(["ledger-cli", "register"]).is_err());
    }
}
