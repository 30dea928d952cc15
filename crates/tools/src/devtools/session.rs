//! One duplex connection to a single DevTools target.
//!
//! Unlike daemon-style CDP clients that run background reader/writer tasks,
//! a session here is caller-driven: `send` writes one command envelope and
//! then reads frames until the matching id arrives, bounded by a wall-clock
//! timeout per receive attempt and by a maximum count of discarded frames.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tabscout_core::{DevtoolsConfig, Error, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::tabs::TargetDescriptor;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A command/response session against one target.
///
/// Single-owner and single-use-at-a-time: `send` takes `&mut self`, so the
/// borrow checker rules out concurrent commands on the same session.
/// Concurrent invocations must each open their own session.
pub struct ProtocolSession {
    /// `Some` while connected, `None` once closed. A closed session
    /// cannot be reopened.
    ws: Option<WsStream>,
    /// Last assigned command id; ids start at 1 and reset per session.
    next_id: u64,
    recv_timeout: Duration,
    max_discarded_frames: usize,
}

impl ProtocolSession {
    /// Connect to the target's duplex endpoint.
    pub async fn open(target: &TargetDescriptor, config: &DevtoolsConfig) -> Result<Self> {
        let ws_url = target.ws_url.as_deref().ok_or_else(|| {
            Error::Connection(format!(
                "target '{}' has no WebSocket debugger URL (another debugger may be attached)",
                target.id
            ))
        })?;

        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::Connection(format!("failed to connect to {}: {}", ws_url, e)))?;

        debug!(target = %target.id, title = %target.title, "session opened");

        Ok(Self {
            ws: Some(ws),
            next_id: 0,
            recv_timeout: Duration::from_secs(config.command_timeout_secs),
            max_discarded_frames: config.max_discarded_frames,
        })
    }

    pub fn is_open(&self) -> bool {
        self.ws.is_some()
    }

    /// Send a command and wait for its response.
    ///
    /// Frames whose id does not match are discarded. A timeout or an
    /// exhausted discard budget fails the command, not the session; the
    /// connection stays usable for a subsequent `send`.
    pub async fn send(&mut self, method: &str, params: Value) -> Result<Value> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::Connection("session is closed".to_string()))?;

        self.next_id += 1;
        let id = self.next_id;
        let envelope = json!({ "id": id, "method": method, "params": params });

        ws.send(Message::Text(envelope.to_string()))
            .await
            .map_err(|e| Error::Connection(format!("failed to send {}: {}", method, e)))?;

        let mut discarded = 0usize;
        loop {
            let frame = tokio::time::timeout(self.recv_timeout, ws.next())
                .await
                .map_err(|_| Error::Timeout(method.to_string()))?;

            let msg = match frame {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Err(Error::Connection(format!("receive failed: {}", e)));
                }
                None => {
                    return Err(Error::Connection(
                        "connection closed by remote end".to_string(),
                    ));
                }
            };

            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => {
                    return Err(Error::Connection(
                        "connection closed by remote end".to_string(),
                    ));
                }
                // Keepalive frames are transport noise, not messages.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                Message::Binary(_) => {
                    discarded += 1;
                    if discarded >= self.max_discarded_frames {
                        return Err(Error::Timeout(method.to_string()));
                    }
                    continue;
                }
            };

            match serde_json::from_str::<Value>(&text) {
                Ok(response) if response.get("id").and_then(Value::as_u64) == Some(id) => {
                    if let Some(payload) = response.get("error") {
                        warn!(method, %payload, "command failed");
                        return Err(Error::Protocol {
                            method: method.to_string(),
                            payload: payload.clone(),
                        });
                    }
                    return Ok(response.get("result").cloned().unwrap_or(Value::Null));
                }
                // Responses to other ids, events, and unparsable frames
                // all count against the discard budget.
                _ => {
                    discarded += 1;
                    if discarded >= self.max_discarded_frames {
                        return Err(Error::Timeout(method.to_string()));
                    }
                }
            }
        }
    }

    /// Release the connection. Idempotent; safe on an already-closed
    /// session.
    pub async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!("error closing session (may already be closed): {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn test_config() -> DevtoolsConfig {
        DevtoolsConfig {
            command_timeout_secs: 1,
            max_discarded_frames: 10,
            ..DevtoolsConfig::default()
        }
    }

    fn test_target(ws_url: &str) -> TargetDescriptor {
        TargetDescriptor {
            id: "T1".to_string(),
            kind: "page".to_string(),
            title: "test".to_string(),
            url: "http://localhost/".to_string(),
            ws_url: Some(ws_url.to_string()),
        }
    }

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn read_request(
        ws: &mut WebSocketStream<TcpStream>,
    ) -> Value {
        let msg = ws.next().await.unwrap().unwrap();
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: Value) {
        ws.send(Message::Text(value.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_without_ws_url_is_connection_error() {
        let mut target = test_target("ws://127.0.0.1:1");
        target.ws_url = None;
        let err = ProtocolSession::open(&target, &test_config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_send_skips_interleaved_frames_and_matches_id() {
        let (listener, url) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            let req = read_request(&mut ws).await;
            assert_eq!(req["id"], 1);
            assert_eq!(req["method"], "Runtime.evaluate");

            // Unsolicited event, a response for someone else, then ours.
            send_json(&mut ws, json!({"method": "Page.loadEventFired", "params": {}})).await;
            send_json(&mut ws, json!({"id": 777, "result": {"wrong": true}})).await;
            send_json(&mut ws, json!({"id": 1, "result": {"value": 42}})).await;
        });

        let mut session = ProtocolSession::open(&test_target(&url), &test_config())
            .await
            .unwrap();
        let result = session.send("Runtime.evaluate", json!({})).await.unwrap();
        assert_eq!(result["value"], 42);
        session.close().await;
    }

    #[tokio::test]
    async fn test_ids_increment_within_session() {
        let (listener, url) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            for expected in 1..=3u64 {
                let req = read_request(&mut ws).await;
                assert_eq!(req["id"], expected);
                send_json(&mut ws, json!({"id": expected, "result": {}})).await;
            }
        });

        let mut session = ProtocolSession::open(&test_target(&url), &test_config())
            .await
            .unwrap();
        for _ in 0..3 {
            session.send("Page.enable", json!({})).await.unwrap();
        }
        session.close().await;
    }

    #[tokio::test]
    async fn test_timeout_fails_command_not_session() {
        let (listener, url) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            // Ignore the first command entirely, then serve the second.
            let _ = read_request(&mut ws).await;
            let req = read_request(&mut ws).await;
            assert_eq!(req["id"], 2);
            send_json(&mut ws, json!({"id": 2, "result": {"ok": true}})).await;
        });

        let mut session = ProtocolSession::open(&test_target(&url), &test_config())
            .await
            .unwrap();

        let err = session.send("Page.navigate", json!({})).await.err().unwrap();
        match err {
            Error::Timeout(method) => assert_eq!(method, "Page.navigate"),
            other => panic!("expected Timeout, got {:?}", other),
        }

        // The session survives the failed command.
        assert!(session.is_open());
        let result = session.send("Page.enable", json!({})).await.unwrap();
        assert_eq!(result["ok"], true);
        session.close().await;
    }

    #[tokio::test]
    async fn test_discard_budget_exhaustion_is_timeout() {
        let (listener, url) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let _ = read_request(&mut ws).await;
            // Never the right id.
            for n in 0..20 {
                send_json(&mut ws, json!({"id": 1000 + n, "result": {}})).await;
            }
        });

        let config = DevtoolsConfig {
            command_timeout_secs: 5,
            max_discarded_frames: 5,
            ..DevtoolsConfig::default()
        };
        let mut session = ProtocolSession::open(&test_target(&url), &config)
            .await
            .unwrap();
        let err = session.send("DOM.getDocument", json!({})).await.err().unwrap();
        assert!(matches!(err, Error::Timeout(_)));
        session.close().await;
    }

    #[tokio::test]
    async fn test_error_payload_is_protocol_error() {
        let (listener, url) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let _ = read_request(&mut ws).await;
            send_json(
                &mut ws,
                json!({"id": 1, "error": {"code": -32000, "message": "no such frame"}}),
            )
            .await;
        });

        let mut session = ProtocolSession::open(&test_target(&url), &test_config())
            .await
            .unwrap();
        let err = session.send("Page.navigate", json!({})).await.err().unwrap();
        match err {
            Error::Protocol { method, payload } => {
                assert_eq!(method, "Page.navigate");
                assert_eq!(payload["code"], -32000);
                assert_eq!(payload["message"], "no such frame");
            }
            other => panic!("expected Protocol, got {:?}", other),
        }
        session.close().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_send_after_close_fails() {
        let (listener, url) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let mut session = ProtocolSession::open(&test_target(&url), &test_config())
            .await
            .unwrap();
        session.close().await;
        session.close().await;
        assert!(!session.is_open());

        let err = session.send("Page.enable", json!({})).await.err().unwrap();
        assert!(matches!(err, Error::Connection(_)));
    }
}
