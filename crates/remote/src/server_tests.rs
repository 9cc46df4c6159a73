// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test server utilities and server tests.
//!
//! Provides a TestServer that runs on a random port over a temporary ledger.

#![cfg(test)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::server;
use crate::state::ServerState;

/// A test server that runs on a random port and can be controlled.
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    state: ServerState,
    _temp_dir: tempfile::TempDir,
}

impl TestServer {
    /// Start a new test server on a random available port.
    pub async fn start() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = ServerState::new(temp_dir.path()).unwrap();

        // Bind to port 0 to get a random available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let state_clone = state.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = server::serve(listener, state_clone) => {
                    if let Err(e) = result {
                        eprintln!("Test server error: {}", e);
                    }
                }
                _ = shutdown_rx => {}
            }
        });

        TestServer {
            addr,
            shutdown_tx,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get the WebSocket URL for connecting to this server.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get access to the server state for verification.
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Shutdown the test server.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

mod tests {
    use super::*;
    use futures_util::stream::{SplitSink, SplitStream};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use std::time::Duration;
    use till_core::protocol::{ClientMessage, ServerMessage};
    use till_core::{
        Action, ApplyRequest, Entity, FailureClass, GatewayError, OpId, RemoteGateway,
    };
    use tillrs::sync::WebSocketGateway;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    struct Client {
        sink: SplitSink<Socket, Message>,
        stream: SplitStream<Socket>,
    }

    impl Client {
        async fn connect(server: &TestServer) -> Self {
            let (socket, _) = connect_async(server.ws_url()).await.unwrap();
            let (sink, stream) = socket.split();
            Client { sink, stream }
        }

        async fn send_text(&mut self, text: String) {
            self.sink.send(Message::Text(text.into())).await.unwrap();
        }

        async fn request(&mut self, msg: ClientMessage) -> ServerMessage {
            self.send_text(msg.to_json().unwrap()).await;
            self.reply().await
        }

        async fn reply(&mut self) -> ServerMessage {
            let next = tokio::time::timeout(Duration::from_secs(5), self.stream.next()).await;
            match next {
                Ok(Some(Ok(Message::Text(text)))) => ServerMessage::from_json(&text).unwrap(),
                other => panic!("expected a text frame, got {:?}", other),
            }
        }
    }

    fn sale(target: &str, total: i64) -> ApplyRequest {
        ApplyRequest {
            idempotency_key: OpId::new(),
            entity: Entity::Sale,
            action: Action::Create,
            target: target.to_string(),
            payload: json!({ "id": target, "total": total }),
        }
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let server = TestServer::start().await;
        let mut client = Client::connect(&server).await;

        let reply = client.request(ClientMessage::ping(42)).await;

        assert_eq!(reply, ServerMessage::pong(42));
        server.shutdown();
    }

    #[tokio::test]
    async fn repeated_apply_is_acknowledged_as_duplicate() {
        let server = TestServer::start().await;
        let mut client = Client::connect(&server).await;
        let request = sale("s1", 1500);
        let key = request.idempotency_key;

        let first = client.request(ClientMessage::apply(request.clone())).await;
        let second = client.request(ClientMessage::apply(request)).await;

        assert_eq!(first, ServerMessage::ack(key, false));
        assert_eq!(second, ServerMessage::ack(key, true));
        assert_eq!(server.state().applied_count().await, 1);
        server.shutdown();
    }

    #[tokio::test]
    async fn duplicate_across_connections() {
        let server = TestServer::start().await;
        let request = sale("s1", 10);
        let key = request.idempotency_key;

        let mut first = Client::connect(&server).await;
        first.request(ClientMessage::apply(request.clone())).await;
        drop(first);
        let mut second = Client::connect(&server).await;
        let reply = second.request(ClientMessage::apply(request)).await;

        assert_eq!(reply, ServerMessage::ack(key, true));
        server.shutdown();
    }

    #[tokio::test]
    async fn invalid_request_is_rejected() {
        let server = TestServer::start().await;
        let mut client = Client::connect(&server).await;
        let request = sale("s1", -1);
        let key = request.idempotency_key;

        let reply = client.request(ClientMessage::apply(request)).await;

        assert_eq!(
            reply,
            ServerMessage::rejected(key, 422, "total must not be negative")
        );
        server.shutdown();
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_and_connection_survives() {
        let server = TestServer::start().await;
        let mut client = Client::connect(&server).await;

        client.send_text("{\"type\":\"op\"}".to_string()).await;
        let reply = client.reply().await;
        assert!(
            matches!(&reply, ServerMessage::Error { message } if message.starts_with("malformed message")),
            "{reply:?}"
        );

        assert_eq!(client.request(ClientMessage::ping(1)).await, ServerMessage::pong(1));
        server.shutdown();
    }

    #[tokio::test]
    async fn gateway_outcomes_against_live_server() {
        let server = TestServer::start().await;
        let gateway = WebSocketGateway::new(server.ws_url(), Duration::from_secs(2));

        let request = sale("s1", 100);
        let ack = gateway.apply(request.clone()).await.unwrap();
        assert_eq!(ack.idempotency_key, request.idempotency_key);
        assert!(!ack.duplicate);
        assert!(gateway.apply(request).await.unwrap().duplicate);

        let err = gateway.apply(sale("s2", -5)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)), "{err:?}");

        server.state().fail_next(1).await;
        let err = gateway.apply(sale("s3", 1)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Transient, "{err:?}");
        server.shutdown();
    }
}
