// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Connection lifecycle tests against a local websocket server.

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hyperstream_network::{
    error::TransportErrorKind,
    state::ConnectionState,
    websocket::{
        ConnectionEvent, ConnectionLifecycle, EventReceiver, TungsteniteConnector,
        WebSocketConfig,
    },
};
use rstest::rstest;
use tokio::net::TcpListener;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

/// Local echo server. Replies to "close-abnormal" with close code 4000 and drops the connection
/// on "drop-now".
struct TestServer {
    port: u16,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    async fn setup() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };

                    while let Some(Ok(message)) = ws.next().await {
                        match message {
                            Message::Text(text) if text.as_str() == "close-abnormal" => {
                                let frame = CloseFrame {
                                    code: CloseCode::from(4000),
                                    reason: "server restart".into(),
                                };
                                let _ = ws.send(Message::Close(Some(frame))).await;
                            }
                            Message::Text(text) if text.as_str() == "drop-now" => return,
                            Message::Text(text) => {
                                if ws.send(Message::Text(text)).await.is_err() {
                                    return;
                                }
                            }
                            Message::Close(_) => {
                                let _ = ws.close(None).await;
                                return;
                            }
                            _ => {}
                        }
                    }
                });
            }
        });

        Self { port, task }
    }

    fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }
}

fn lifecycle(url: String) -> ConnectionLifecycle {
    ConnectionLifecycle::new(WebSocketConfig::new(url), Arc::new(TungsteniteConnector))
}

async fn next_event(rx: &mut EventReceiver) -> ConnectionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[rstest]
#[tokio::test]
async fn test_echo_round_trip() {
    let server = TestServer::setup().await;
    let mut lifecycle = lifecycle(server.url());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = lifecycle.open(tx).await.unwrap();
    handle.send_text("hello").unwrap();

    assert_eq!(next_event(&mut rx).await, ConnectionEvent::Open { generation: 1 });
    match next_event(&mut rx).await {
        ConnectionEvent::Message { generation, data } => {
            assert_eq!(generation, 1);
            assert_eq!(&data[..], b"hello");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn test_graceful_close_yields_normal_close() {
    let server = TestServer::setup().await;
    let mut lifecycle = lifecycle(server.url());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = lifecycle.open(tx).await.unwrap();
    let _open = next_event(&mut rx).await;
    lifecycle.close();

    match next_event(&mut rx).await {
        ConnectionEvent::Close { generation, code, .. } => {
            assert_eq!(generation, 1);
            assert_eq!(code, Some(1000));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!handle.needs_reconnect());
    assert_eq!(handle.state(), ConnectionState::Closed);
}

#[rstest]
#[tokio::test]
async fn test_abnormal_server_close_flags_reconnect() {
    let server = TestServer::setup().await;
    let mut lifecycle = lifecycle(server.url());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = lifecycle.open(tx).await.unwrap();
    let _open = next_event(&mut rx).await;
    handle.send_text("close-abnormal").unwrap();

    match next_event(&mut rx).await {
        ConnectionEvent::Close { code, reason, .. } => {
            assert_eq!(code, Some(4000));
            assert_eq!(reason, "server restart");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(lifecycle.needs_reconnect());
}

#[rstest]
#[tokio::test]
async fn test_server_drop_reports_error_then_close() {
    let server = TestServer::setup().await;
    let mut lifecycle = lifecycle(server.url());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = lifecycle.open(tx).await.unwrap();
    let _open = next_event(&mut rx).await;
    handle.send_text("drop-now").unwrap();

    match next_event(&mut rx).await {
        ConnectionEvent::Error { kind, .. } => assert!(kind.is_transient()),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        next_event(&mut rx).await,
        ConnectionEvent::Close { code: None, .. }
    ));
    assert!(handle.needs_reconnect());
}

#[rstest]
#[tokio::test]
async fn test_reconnect_opens_new_generation() {
    let server = TestServer::setup().await;
    let mut lifecycle = lifecycle(server.url());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let first = lifecycle.open(tx.clone()).await.unwrap();
    let second = lifecycle.open(tx).await.unwrap();
    second.send_text("fresh").unwrap();

    assert_eq!(second.generation(), 2);
    assert!(first.send_text("stale").is_err());

    let mut saw_fresh = false;
    while !saw_fresh {
        if let ConnectionEvent::Message { generation, data } = next_event(&mut rx).await {
            assert_eq!(generation, 2);
            saw_fresh = &data[..] == b"fresh";
        }
    }
}

#[rstest]
#[tokio::test]
async fn test_refused_connection_is_transient() {
    // Bind then release a port so nothing is listening on it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut lifecycle = lifecycle(format!("ws://127.0.0.1:{port}"));
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

    let error = lifecycle.open(tx).await.unwrap_err();

    assert_eq!(error.kind(), TransportErrorKind::Reset);
    assert!(error.kind().is_transient());
}
