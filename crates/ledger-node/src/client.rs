use ledger_core::{peers::normalize_address, Block, NetworkError, TransactionEnvelope};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Body of `GET /chain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterNodes {
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRequest {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerList {
    pub peers: Vec<String>,
}

/// Outbound HTTP to other nodes and to the directory. Every request is bounded
/// by the configured timeout and attempted once.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    fn url(peer: &str, path: &str) -> String {
        format!("http://{peer}{path}")
    }

    fn unreachable(peer: &str, err: reqwest::Error) -> NetworkError {
        NetworkError::Unreachable {
            peer: peer.to_string(),
            reason: err.to_string(),
        }
    }

    async fn decode<T: DeserializeOwned>(peer: &str, res: reqwest::Response) -> Result<T, NetworkError> {
        let status = res.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }
        res.json::<T>().await.map_err(|e| NetworkError::Decode {
            peer: peer.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, NetworkError> {
        let res = self
            .http
            .get(Self::url(peer, "/chain"))
            .send()
            .await
            .map_err(|e| Self::unreachable(peer, e))?;
        Self::decode(peer, res).await
    }

    /// Push a transaction; the peer's status code is returned as-is since 200
    /// (duplicate) and 201 (accepted) are both normal answers.
    pub async fn send_transaction(
        &self,
        peer: &str,
        envelope: &TransactionEnvelope,
    ) -> Result<StatusCode, NetworkError> {
        let res = self
            .http
            .post(Self::url(peer, "/transactions/new"))
            .json(envelope)
            .send()
            .await
            .map_err(|e| Self::unreachable(peer, e))?;
        Ok(res.status())
    }

    /// Push a block; 201/200/400/409 all carry meaning, so the status is
    /// returned rather than mapped to an error.
    pub async fn send_block(&self, peer: &str, block: &Block) -> Result<StatusCode, NetworkError> {
        let res = self
            .http
            .post(Self::url(peer, "/blocks/receive"))
            .json(block)
            .send()
            .await
            .map_err(|e| Self::unreachable(peer, e))?;
        Ok(res.status())
    }

    /// Ask `peer` to add `nodes` to its peer set.
    pub async fn introduce(&self, peer: &str, nodes: &[String]) -> Result<(), NetworkError> {
        let res = self
            .http
            .post(Self::url(peer, "/nodes/register"))
            .json(&RegisterNodes {
                nodes: nodes.to_vec(),
            })
            .send()
            .await
            .map_err(|e| Self::unreachable(peer, e))?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(NetworkError::Status {
                peer: peer.to_string(),
                status: res.status().as_u16(),
            })
        }
    }

    /// Register with a directory service; returns the peers it already knew.
    pub async fn join_directory(&self, directory: &str, port: u16) -> Result<Vec<String>, NetworkError> {
        let directory = directory_host(directory)?;
        let res = self
            .http
            .post(Self::url(&directory, "/register"))
            .json(&PortRequest { port })
            .send()
            .await
            .map_err(|e| Self::unreachable(&directory, e))?;
        let list: PeerList = Self::decode(&directory, res).await?;
        Ok(list.peers)
    }

    pub async fn leave_directory(&self, directory: &str, port: u16) -> Result<(), NetworkError> {
        let directory = directory_host(directory)?;
        let res = self
            .http
            .post(Self::url(&directory, "/unregister"))
            .json(&PortRequest { port })
            .send()
            .await
            .map_err(|e| Self::unreachable(&directory, e))?;
        let _: serde_json::Value = Self::decode(&directory, res).await?;
        Ok(())
    }
}

fn directory_host(directory: &str) -> Result<String, NetworkError> {
    normalize_address(directory).map_err(|e| NetworkError::Unreachable {
        peer: directory.to_string(),
        reason: e.to_string(),
    })
}
