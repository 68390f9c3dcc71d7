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

//! In-memory connector for driving the client without a network.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures_util::future::BoxFuture;
use hyperstream_network::websocket::{FrameSink, FrameStream, WebSocketConnector};
use tokio::{sync::mpsc, time::Instant};
use tokio_tungstenite::tungstenite::{self, Message};

const PING: &str = r#"{"method":"ping"}"#;

/// Server side of one in-memory connection.
#[derive(Debug)]
pub(crate) struct MockPeer {
    outbound_rx: mpsc::UnboundedReceiver<Message>,
    inbound_tx: mpsc::UnboundedSender<Result<Message, tungstenite::Error>>,
}

impl MockPeer {
    /// Returns the next text frame the client wrote, skipping heartbeats.
    pub(crate) async fn next_text(&mut self) -> String {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(60), self.outbound_rx.recv())
                .await
                .expect("timed out waiting for client frame")
                .expect("client connection closed");
            if let Message::Text(text) = message
                && text.as_str() != PING
            {
                return text.as_str().to_owned();
            }
        }
    }

    /// Returns every non-heartbeat text frame already written by the client.
    pub(crate) fn drain_texts(&mut self) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(message) = self.outbound_rx.try_recv() {
            if let Message::Text(text) = message
                && text.as_str() != PING
            {
                texts.push(text.as_str().to_owned());
            }
        }
        texts
    }

    /// Returns every frame already written by the client, heartbeats included.
    pub(crate) fn drain_frames(&mut self) -> Vec<Message> {
        let mut frames = Vec::new();
        while let Ok(message) = self.outbound_rx.try_recv() {
            frames.push(message);
        }
        frames
    }

    pub(crate) fn push_text(&self, text: &str) {
        let _ = self.inbound_tx.send(Ok(Message::Text(text.into())));
    }
}

/// Connector handing each accepted connection's server side to the test.
#[derive(Debug)]
pub(crate) struct MockConnector {
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    refuse: AtomicBool,
    attempts: Mutex<Vec<Instant>>,
}

impl MockConnector {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers_tx,
            refuse: AtomicBool::new(false),
            attempts: Mutex::new(Vec::new()),
        };
        (Arc::new(connector), peers_rx)
    }

    pub(crate) fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Returns the instant of every connect attempt so far.
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl WebSocketConnector for MockConnector {
    fn connect<'a>(
        &'a self,
        _url: &'a str,
        _headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<(FrameSink, FrameStream), tungstenite::Error>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(Instant::now());
            if self.refuse.load(Ordering::SeqCst) {
                return Err(tungstenite::Error::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )));
            }

            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

            let sink = futures_util::sink::unfold(outbound_tx, |tx, message: Message| async move {
                tx.send(message)
                    .map_err(|_| tungstenite::Error::ConnectionClosed)?;
                Ok::<_, tungstenite::Error>(tx)
            });
            let stream = futures_util::stream::unfold(inbound_rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });

            let _ = self.peers_tx.send(MockPeer {
                outbound_rx,
                inbound_tx,
            });
            let sink: FrameSink = Box::pin(sink);
            let stream: FrameStream = Box::pin(stream);
            Ok((sink, stream))
        })
    }
}

/// Waits for the next accepted connection.
pub(crate) async fn next_peer(peers: &mut mpsc::UnboundedReceiver<MockPeer>) -> MockPeer {
    tokio::time::timeout(Duration::from_secs(120), peers.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("connector dropped")
}
