// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use till_core::ConnectivityMonitor;
use tokio::net::TcpListener;
use yare::parameterized;

#[parameterized(
    explicit_port = { "ws://127.0.0.1:7890", "127.0.0.1", 7890 },
    default_ws = { "ws://example.com/sync", "example.com", 80 },
    default_wss = { "wss://example.com", "example.com", 443 },
    userinfo = { "ws://user:pw@host:9000/path", "host", 9000 },
    ipv6 = { "ws://[::1]:7890", "::1", 7890 },
    ipv6_default = { "wss://[::1]/x", "::1", 443 },
    empty_port = { "ws://example.com:/sync", "example.com", 80 },
    upper_case_scheme = { "WS://Example.com", "example.com", 80 },
)]
fn endpoint_from_url(url: &str, host: &str, port: u16) {
    let endpoint = Endpoint::from_url(url).unwrap();
    assert_eq!(endpoint.host, host);
    assert_eq!(endpoint.port, port);
}

#[parameterized(
    http = { "http://example.com" },
    no_host = { "ws://:80" },
    bad_port = { "ws://host:port" },
    unclosed_bracket = { "ws://[::1:80" },
)]
fn endpoint_from_invalid_url(url: &str) {
    assert!(matches!(Endpoint::from_url(url), Err(Error::InvalidUrl(_))));
}

#[test]
fn ipv6_endpoint_display_is_bracketed() {
    let endpoint = Endpoint::from_url("ws://[::1]:7890").unwrap();
    assert_eq!(endpoint.to_string(), "[::1]:7890");
}

#[tokio::test]
async fn probe_reports_listener_state() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = Endpoint {
        host: addr.ip().to_string(),
        port: addr.port(),
    };

    assert_eq!(
        probe_once(&endpoint, Duration::from_secs(2)).await,
        Connectivity::Online
    );

    drop(listener);
    assert_eq!(
        probe_once(&endpoint, Duration::from_secs(2)).await,
        Connectivity::Offline
    );
}

#[tokio::test]
async fn spawned_probe_updates_signal_until_cancelled() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = Endpoint::from_url(&format!("ws://{}", addr)).unwrap();
    let signal = ConnectivitySignal::new(Connectivity::Offline);
    let mut changes = signal.subscribe();
    let cancel = CancellationToken::new();

    let probe = spawn_probe(
        signal.clone(),
        endpoint,
        Duration::from_millis(20),
        Duration::from_secs(1),
        cancel.clone(),
    );

    tokio::time::timeout(Duration::from_secs(5), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(signal.current_state(), Connectivity::Online);

    cancel.cancel();
    probe.await.unwrap();
}
