//! Linera faucet and node service backend
//!
//! Chains are claimed from the faucet over GraphQL. Application queries go to
//! the node service over HTTP, and notifications arrive on its WebSocket
//! endpoint using the `graphql-transport-ws` protocol. The notification pump
//! reconnects with backoff until the subscription is dropped.

use crate::backend::{ApplicationHandle, ChainHandle, LedgerBackend, Subscription};
use crate::client::{escape_gql_string, parse_envelope};
use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tictactoe_core::{require_id, Signer};
use tictactoe_params::Endpoints;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const WS_PROTOCOL: &str = "graphql-transport-ws";
const RECONNECT_INITIAL: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(15);

/// Backend talking to a faucet and a node service
#[derive(Clone)]
pub struct NodeBackend {
    endpoints: Endpoints,
    http: reqwest::Client,
}

impl NodeBackend {
    /// Create new backend
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            http: reqwest::Client::new(),
        }
    }
}

async fn post_graphql(http: &reqwest::Client, url: &str, body: String) -> Result<String> {
    let response = http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() && !text.contains("\"errors\"") {
        return Err(Error::Transport(format!("HTTP {} from {}", status, url)));
    }
    Ok(text)
}

/// Chain identifier out of the faucet's `claim` reply, which is either the
/// identifier itself or an object carrying it
fn claimed_chain_id(data: &Value) -> Result<String> {
    let claim = data.get("claim").unwrap_or(&Value::Null);
    let raw = match claim {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map
            .get("chainId")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str),
        _ => None,
    };
    let raw = raw.ok_or_else(|| Error::Transport("Faucet returned no chain id".to_string()))?;
    Ok(require_id(raw)?)
}

#[async_trait]
impl LedgerBackend for NodeBackend {
    async fn initialize(&self) -> Result<()> {
        // Endpoints are checked with the rest of the configuration; the node
        // service needs no client-side runtime.
        debug!(node_url = %self.endpoints.node_url, "Node backend ready");
        Ok(())
    }

    async fn claim_chain(&self, signer: &Signer) -> Result<String> {
        let document = format!(
            "mutation {{ claim(owner: \"{}\") }}",
            escape_gql_string(signer.owner())
        );
        let body = json!({ "query": document }).to_string();
        let text = post_graphql(&self.http, &self.endpoints.faucet_url, body).await?;
        claimed_chain_id(&parse_envelope(&text)?)
    }

    async fn open_chain(&self, chain_id: &str, _signer: &Signer) -> Result<Arc<dyn ChainHandle>> {
        Ok(Arc::new(NodeChain {
            chain_id: chain_id.to_string(),
            endpoints: self.endpoints.clone(),
            http: self.http.clone(),
        }))
    }
}

fn application_url(node_url: &str, chain_id: &str, application_id: &str) -> String {
    format!(
        "{}/chains/{}/applications/{}",
        node_url.trim_end_matches('/'),
        chain_id,
        application_id
    )
}

struct NodeChain {
    chain_id: String,
    endpoints: Endpoints,
    http: reqwest::Client,
}

#[async_trait]
impl ChainHandle for NodeChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn application(&self, application_id: &str) -> Result<Arc<dyn ApplicationHandle>> {
        Ok(Arc::new(NodeApplication {
            url: application_url(&self.endpoints.node_url, &self.chain_id, application_id),
            http: self.http.clone(),
        }))
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let ws_url = self.endpoints.node_ws_url();
        let (tx, rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump_notifications(ws_url, self.chain_id.clone(), tx));
        Ok(Subscription::with_pump(rx, pump))
    }
}

struct NodeApplication {
    url: String,
    http: reqwest::Client,
}

#[async_trait]
impl ApplicationHandle for NodeApplication {
    async fn query(&self, request: &str) -> Result<String> {
        post_graphql(&self.http, &self.url, request.to_string()).await
    }
}

#[derive(Debug, PartialEq)]
enum Frame {
    Notification(Value),
    Ping,
    Closed,
    Ignored,
}

fn parse_frame(text: &str) -> Frame {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Frame::Ignored;
    };
    match value.get("type").and_then(Value::as_str) {
        Some("next") | Some("data") => value
            .pointer("/payload/data/notifications")
            .cloned()
            .map(Frame::Notification)
            .unwrap_or(Frame::Ignored),
        Some("ping") => Frame::Ping,
        Some("complete") | Some("error") => Frame::Closed,
        _ => Frame::Ignored,
    }
}

async fn pump_notifications(ws_url: String, chain_id: String, tx: mpsc::UnboundedSender<Value>) {
    let mut backoff = RECONNECT_INITIAL;
    while !tx.is_closed() {
        match stream_notifications(&ws_url, &chain_id, &tx).await {
            Ok(()) => {
                debug!(chain_id = %chain_id, "Notification socket closed");
                backoff = RECONNECT_INITIAL;
            }
            Err(e) => warn!(
                event = "notification_socket_error",
                chain_id = %chain_id,
                error = %e,
                retry_in_ms = backoff.as_millis() as u64,
                "Notification socket failed"
            ),
        }
        if tx.is_closed() {
            break;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(RECONNECT_MAX);
    }
}

async fn stream_notifications(
    ws_url: &str,
    chain_id: &str,
    tx: &mpsc::UnboundedSender<Value>,
) -> Result<()> {
    let mut request = ws_url.into_client_request()?;
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(WS_PROTOCOL));
    let (mut ws, _) = connect_async(request).await?;

    ws.send(Message::Text(
        json!({ "type": "connection_init", "payload": {} }).to_string(),
    ))
    .await?;
    let subscribe = json!({
        "id": "1",
        "type": "subscribe",
        "payload": {
            "query": format!(
                "subscription {{ notifications(chainId: \"{}\") }}",
                escape_gql_string(chain_id)
            )
        }
    });
    ws.send(Message::Text(subscribe.to_string())).await?;
    info!(event = "notifications_subscribed", chain_id = %chain_id, "Subscribed to chain notifications");

    while let Some(message) = ws.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        match parse_frame(&text) {
            Frame::Notification(event) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Frame::Ping => {
                ws.send(Message::Text(json!({ "type": "pong" }).to_string()))
                    .await?;
            }
            Frame::Closed => break,
            Frame::Ignored => {}
        }
    }
    let _ = ws.close(None).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claimed_chain_id_shapes() {
        assert_eq!(claimed_chain_id(&json!({ "claim": "AB-cd" })).unwrap(), "ABcd");
        assert_eq!(
            claimed_chain_id(&json!({ "claim": { "chainId": "e476" } })).unwrap(),
            "e476"
        );
        assert!(claimed_chain_id(&json!({ "claim": null })).is_err());
        assert!(claimed_chain_id(&json!({ "claim": "---" })).is_err());
    }

    #[test]
    fn test_parse_frames() {
        let next = r#"{"id":"1","type":"next","payload":{"data":{"notifications":{"chainId":"aa","reason":{"NewBlock":{"height":3}}}}}}"#;
        match parse_frame(next) {
            Frame::Notification(event) => assert_eq!(event["chainId"], "aa"),
            other => panic!("unexpected frame {:?}", other),
        }
        assert_eq!(parse_frame(r#"{"type":"ping"}"#), Frame::Ping);
        assert_eq!(parse_frame(r#"{"type":"complete","id":"1"}"#), Frame::Closed);
        assert_eq!(parse_frame(r#"{"type":"connection_ack"}"#), Frame::Ignored);
        assert_eq!(parse_frame("not json"), Frame::Ignored);
    }

    #[test]
    fn test_application_url() {
        assert_eq!(
            application_url("http://localhost:8080/", "aa", "e476"),
            "http://localhost:8080/chains/aa/applications/e476"
        );
    }
}
