// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket gateway to the remote store.
//!
//! Keeps one connection open and reuses it across requests. The connection
//! is opened lazily on the first `apply` and dropped on any transport error;
//! the next `apply` reconnects. Requests are strictly one at a time.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use till_core::protocol::{ClientMessage, ServerMessage};
use till_core::{Ack, ApplyRequest, GatewayError, GatewayResult, OpId, RemoteGateway};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal WebSocket connection wrapper.
struct Connection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

/// [`RemoteGateway`] speaking the JSON protocol over WebSocket.
pub struct WebSocketGateway {
    url: String,
    connect_timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl WebSocketGateway {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        WebSocketGateway {
            url: url.into(),
            connect_timeout,
            conn: Mutex::new(None),
        }
    }

    /// Returns true if a connection is currently open.
    #[cfg(test)]
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    async fn connect(&self) -> GatewayResult<Connection> {
        let connecting = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| GatewayError::Network(format!("connect to {} timed out", self.url)))?
            .map_err(|e| GatewayError::Network(format!("connect to {}: {}", self.url, e)))?;

        debug!("connected to {}", self.url);
        let (sink, stream) = ws_stream.split();
        Ok(Connection { sink, stream })
    }
}

impl RemoteGateway for WebSocketGateway {
    fn apply(
        &self,
        request: ApplyRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Ack>> + Send + '_>> {
        Box::pin(async move {
            let key = request.idempotency_key;
            let mut guard = self.conn.lock().await;

            if guard.is_none() {
                *guard = Some(self.connect().await?);
            }
            let Some(conn) = guard.as_mut() else {
                return Err(GatewayError::Network("not connected".to_string()));
            };

            let result = exchange(conn, ClientMessage::apply(request), key).await;
            if matches!(result, Err(GatewayError::Network(_))) {
                // Connection is broken, clear it
                *guard = None;
            }
            result
        })
    }
}

/// Sends `msg` and waits for the answer to `key`.
///
/// Answers to other keys are left over from abandoned requests and skipped.
async fn exchange(conn: &mut Connection, msg: ClientMessage, key: OpId) -> GatewayResult<Ack> {
    let json = msg
        .to_json()
        .map_err(|e| GatewayError::Network(format!("serialization error: {}", e)))?;

    conn.sink
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| GatewayError::Network(format!("send failed: {}", e)))?;

    loop {
        let text = match conn.stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                return Err(GatewayError::Network("connection closed".to_string()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(GatewayError::Network(format!("receive failed: {}", e)));
            }
        };

        let reply = ServerMessage::from_json(&text)
            .map_err(|e| GatewayError::Network(format!("malformed frame: {}", e)))?;
        match &reply {
            ServerMessage::Ack {
                idempotency_key, ..
            }
            | ServerMessage::Rejected {
                idempotency_key, ..
            } if *idempotency_key != key => {
                debug!("skipping stale answer for {}", idempotency_key);
                continue;
            }
            _ => {}
        }
        if let Some(outcome) = reply.into_outcome() {
            return outcome;
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
