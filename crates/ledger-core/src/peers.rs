use crate::error::AddressError;
use std::collections::BTreeSet;

/// Reduce a peer address to `host:port`.
///
/// Accepts `http://host:port/...`, `https://host` (default port implied) and
/// bare `host:port`.
pub fn normalize_address(address: &str) -> Result<String, AddressError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    let (default_port, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
            "http" => (Some(80u16), rest),
            "https" => (Some(443u16), rest),
            _ => return Err(AddressError::UnsupportedScheme(address.to_string())),
        },
        None => (None, trimmed),
    };

    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    // Drop any userinfo.
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(AddressError::MissingHost(address.to_string()));
    }

    let (host, port) = split_host_port(authority);
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(AddressError::MissingHost(address.to_string()));
    }
    let port = match (port, default_port) {
        (Some(p), _) => p
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| AddressError::InvalidPort(address.to_string()))?,
        (None, Some(d)) => d,
        (None, None) => return Err(AddressError::MissingPort(address.to_string())),
    };

    Ok(format!("{}:{}", host.to_ascii_lowercase(), port))
}

fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        // IPv6 literal, keep the brackets in the host.
        return match authority.find(']') {
            Some(end) => {
                let host = &authority[..=end];
                let port = authority[end + 1..].strip_prefix(':');
                (host, port)
            }
            None => ("", None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

/// Known peers, kept as normalized `host:port` strings.
///
/// Iteration is lexicographic. Nothing in the protocol depends on the order;
/// it only keeps fan-out and resolve runs reproducible.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
    own: Option<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that silently refuses to list the node's own address.
    pub fn with_own_address(own: &str) -> Result<Self, AddressError> {
        Ok(Self {
            peers: BTreeSet::new(),
            own: Some(normalize_address(own)?),
        })
    }

    /// Returns whether the peer was new. Adding a known peer is a no-op.
    pub fn add_peer(&mut self, address: &str) -> Result<bool, AddressError> {
        let peer = normalize_address(address)?;
        if self.own.as_deref() == Some(peer.as_str()) {
            return Ok(false);
        }
        Ok(self.peers.insert(peer))
    }

    pub fn remove_peer(&mut self, address: &str) -> Result<bool, AddressError> {
        let peer = normalize_address(address)?;
        Ok(self.peers.remove(&peer))
    }

    pub fn peers(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
