//! Service endpoints used by the client

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default faucet URL (local `linera net up` faucet)
pub const DEFAULT_FAUCET_URL: &str = "http://localhost:8080";

/// Default node service URL (local `linera service`)
pub const DEFAULT_NODE_URL: &str = "http://localhost:8081";

/// Endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Faucet used to claim a fresh chain
    pub faucet_url: String,
    /// Node service exposing the GraphQL API and the notification stream
    pub node_url: String,
}

impl Endpoints {
    /// Endpoints of a local development network
    pub fn local() -> Self {
        Self {
            faucet_url: DEFAULT_FAUCET_URL.to_string(),
            node_url: DEFAULT_NODE_URL.to_string(),
        }
    }

    /// Check both URLs use an HTTP scheme
    pub fn validate(&self) -> Result<()> {
        for url in [&self.faucet_url, &self.node_url] {
            if !is_http_url(url) {
                return Err(Error::InvalidEndpoint(url.clone()));
            }
        }
        Ok(())
    }

    /// WebSocket URL of the node service (for subscriptions)
    pub fn node_ws_url(&self) -> String {
        let base = self.node_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}/ws", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}/ws", rest)
        } else {
            format!("{}/ws", base)
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::local()
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoints() {
        let endpoints = Endpoints::local();
        assert_eq!(endpoints.faucet_url, "http://localhost:8080");
        assert!(endpoints.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let endpoints = Endpoints {
            faucet_url: "localhost:8080".to_string(),
            node_url: DEFAULT_NODE_URL.to_string(),
        };
        assert!(matches!(endpoints.validate(), Err(Error::InvalidEndpoint(_))));

        let empty_host = Endpoints {
            faucet_url: DEFAULT_FAUCET_URL.to_string(),
            node_url: "https://".to_string(),
        };
        assert!(empty_host.validate().is_err());
    }

    #[test]
    fn test_ws_url() {
        let mut endpoints = Endpoints::local();
        assert_eq!(endpoints.node_ws_url(), "ws://localhost:8081/ws");

        endpoints.node_url = "https://node.example.org/".to_string();
        assert_eq!(endpoints.node_ws_url(), "wss://node.example.org/ws");
    }
}
