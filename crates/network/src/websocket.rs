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

//! WebSocket connection lifecycle with generation tracking.
//!
//! A [`ConnectionLifecycle`] owns at most one physical connection at a time. Each successful
//! [`ConnectionLifecycle::open`] starts a new *generation* and spawns two tasks:
//!
//! - A writer task, the only component that writes to the socket, fed by a command channel.
//! - A reader task that forwards frames to the owner's event channel.
//!
//! Every event carries the generation that produced it, so an owner can discard late events from
//! a replaced connection. Each generation that opened reports exactly one
//! [`ConnectionEvent::Close`], after any [`ConnectionEvent::Error`].

use std::{
    fmt::Debug,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod connector;
pub mod heartbeat;
pub mod types;

pub use self::{
    config::WebSocketConfig,
    connector::{TungsteniteConnector, WebSocketConnector},
    heartbeat::HeartbeatSender,
    types::{ConnectionEvent, EventReceiver, EventSender, FrameSink, FrameStream},
};
use self::types::WriterCommand;
use crate::{
    error::{ConnectError, SendError, TransportErrorKind, is_normal_close},
    logging::{RECV, SEND},
    state::ConnectionState,
};

/// Wait for the peer to answer a close frame before the read half is released.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// State shared by a generation's handle clones and its tasks.
#[derive(Debug)]
struct GenerationShared {
    generation: u64,
    state: AtomicU8,
    needs_reconnect: AtomicBool,
    cancel: CancellationToken,
    events: EventSender,
    termination: Mutex<Option<(Option<u16>, String)>>,
}

impl GenerationShared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_atomic(&self.state)
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    // First writer wins: the reported close reflects what ended the connection
    fn set_termination(&self, code: Option<u16>, reason: String) {
        let mut termination = self
            .termination
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if termination.is_none() {
            *termination = Some((code, reason));
        }
    }

    fn take_termination(&self) -> (Option<u16>, String) {
        self.termination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or((None, "connection released".to_string()))
    }

    fn fail(&self, kind: TransportErrorKind, message: String) {
        if !self.transition(ConnectionState::Open, ConnectionState::Failed) {
            // Already closing or failed, the pending close covers this error
            self.cancel.cancel();
            return;
        }

        if kind.is_transient() {
            self.needs_reconnect.store(true, Ordering::SeqCst);
        }

        tracing::warn!(
            "Connection generation {} failed ({kind}): {message}",
            self.generation
        );
        self.set_termination(None, message.clone());
        let _ = self.events.send(ConnectionEvent::Error {
            generation: self.generation,
            kind,
            message,
        });
        self.cancel.cancel();
    }
}

/// Cloneable handle to one connection generation.
///
/// The handle stays bound to its generation: once that connection is gone every send fails with
/// [`SendError`], even if the owner has already opened a newer generation.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<GenerationShared>,
    writer_tx: UnboundedSender<WriterCommand>,
}

impl Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ConnectionHandle))
            .field("generation", &self.shared.generation)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl ConnectionHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Returns true if the connection ended in a way that calls for a reconnect.
    #[must_use]
    pub fn needs_reconnect(&self) -> bool {
        self.shared.needs_reconnect.load(Ordering::SeqCst)
    }

    /// Queues a message for the writer task.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not open or the writer task has exited.
    pub fn send(&self, message: Message) -> Result<(), SendError> {
        let state = self.state();
        if !state.is_open() {
            return Err(SendError::NotOpen(state));
        }

        self.writer_tx
            .send(WriterCommand::Send(message))
            .map_err(|_| SendError::Closed)
    }

    /// Queues a text message for the writer task.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not open or the writer task has exited.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SendError> {
        let text = text.into();
        tracing::trace!("{SEND} {text}");
        self.send(Message::Text(text.into()))
    }

    /// Requests a graceful close with a normal close code.
    ///
    /// Idempotent; a [`ConnectionEvent::Close`] always follows for this generation.
    pub fn close(&self) {
        self.close_with(u16::from(CloseCode::Normal), "client closing");
    }

    /// Requests a graceful close with the given code and reason.
    pub fn close_with(&self, code: u16, reason: &str) {
        if !self.shared.transition(ConnectionState::Open, ConnectionState::Closing) {
            return;
        }

        tracing::debug!(
            "Closing connection generation {} ({code}: {reason})",
            self.shared.generation
        );
        self.shared.set_termination(Some(code), reason.to_string());

        let command = WriterCommand::Close {
            code,
            reason: reason.to_string(),
        };
        if self.writer_tx.send(command).is_err() {
            self.shared.cancel.cancel();
        }
    }

    /// Marks the connection as failed and tears it down.
    ///
    /// Flags a reconnect for transient kinds and reports a [`ConnectionEvent::Error`] followed by
    /// the generation's close.
    pub fn fail(&self, kind: TransportErrorKind, message: impl Into<String>) {
        self.shared.fail(kind, message.into());
    }
}

/// Owns the physical connection and opens a new generation on demand.
pub struct ConnectionLifecycle {
    config: WebSocketConfig,
    connector: Arc<dyn WebSocketConnector>,
    generation: AtomicU64,
    current: Option<ConnectionHandle>,
}

impl Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ConnectionLifecycle))
            .field("url", &self.config.url)
            .field("connector", &self.connector)
            .field("generation", &self.generation())
            .field("state", &self.state())
            .finish()
    }
}

impl ConnectionLifecycle {
    /// Creates a new [`ConnectionLifecycle`] instance.
    #[must_use]
    pub fn new(config: WebSocketConfig, connector: Arc<dyn WebSocketConnector>) -> Self {
        Self {
            config,
            connector,
            generation: AtomicU64::new(0),
            current: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    /// Returns the most recent generation number (0 before the first open).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the handle of the current generation, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&ConnectionHandle> {
        self.current.as_ref()
    }

    /// Returns the state of the current generation.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.current
            .as_ref()
            .map_or(ConnectionState::Closed, ConnectionHandle::state)
    }

    /// Opens a new connection generation, reporting its events on `events`.
    ///
    /// Any previous generation is closed first. The [`ConnectionEvent::Open`] event is queued
    /// before the reader task starts, so it precedes every frame of the new generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or does not complete within the connect timeout.
    pub async fn open(&mut self, events: EventSender) -> Result<ConnectionHandle, ConnectError> {
        if let Some(previous) = self.current.take() {
            previous.close();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let timeout = self.config.connect_timeout;
        tracing::debug!("Connecting to {} (generation {generation})", self.config.url);

        let connect = self
            .connector
            .connect(&self.config.url, &self.config.headers);
        let (sink, stream) = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(ConnectError::from(e)),
            Err(_) => return Err(ConnectError::Timeout(timeout)),
        };

        let shared = Arc::new(GenerationShared {
            generation,
            state: AtomicU8::new(ConnectionState::Open.as_u8()),
            needs_reconnect: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            events: events.clone(),
            termination: Mutex::new(None),
        });
        let (writer_tx, writer_rx) = tokio::sync::mpsc::unbounded_channel();

        tracing::info!("Connected to {} (generation {generation})", self.config.url);
        let _ = events.send(ConnectionEvent::Open { generation });

        tokio::spawn(Self::run_writer(shared.clone(), sink, writer_rx));
        tokio::spawn(Self::run_reader(shared.clone(), stream));

        let handle = ConnectionHandle { shared, writer_tx };
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Opens a new connection generation unless `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Cancelled`] if `cancel` fires before the handshake completes,
    /// otherwise any error from [`ConnectionLifecycle::open`].
    pub async fn open_until(
        &mut self,
        events: EventSender,
        cancel: &CancellationToken,
    ) -> Result<ConnectionHandle, ConnectError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Connect to {} cancelled", self.config.url);
                Err(ConnectError::Cancelled)
            }
            result = self.open(events) => result,
        }
    }

    /// Requests a graceful close of the current generation. Idempotent.
    pub fn close(&self) {
        if let Some(handle) = &self.current {
            handle.close();
        }
    }

    /// Returns true if the current generation ended in a way that calls for a reconnect.
    #[must_use]
    pub fn needs_reconnect(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(ConnectionHandle::needs_reconnect)
    }

    async fn run_writer(
        shared: Arc<GenerationShared>,
        mut sink: FrameSink,
        mut writer_rx: UnboundedReceiver<WriterCommand>,
    ) {
        loop {
            tokio::select! {
                () = shared.cancel.cancelled() => break,
                command = writer_rx.recv() => match command {
                    Some(WriterCommand::Send(message)) => {
                        if let Err(e) = sink.send(message).await {
                            shared.fail(
                                TransportErrorKind::classify(&e),
                                format!("Write failed: {e}"),
                            );
                            break;
                        }
                    }
                    Some(WriterCommand::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        };
                        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                            tracing::debug!("Failed to send close frame: {e}");
                        }
                        let _ = sink.close().await;

                        // Give the peer a bounded window to answer before releasing the reader
                        tokio::select! {
                            () = shared.cancel.cancelled() => {}
                            () = tokio::time::sleep(CLOSE_GRACE) => shared.cancel.cancel(),
                        }
                        break;
                    }
                    None => break,
                },
            }
        }

        tracing::trace!("Writer task finished (generation {})", shared.generation);
    }

    async fn run_reader(shared: Arc<GenerationShared>, mut stream: FrameStream) {
        let generation = shared.generation;

        loop {
            tokio::select! {
                () = shared.cancel.cancelled() => break,
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!("{RECV} {}", text.as_str());
                        let data = Bytes::copy_from_slice(text.as_bytes());
                        let _ = shared.events.send(ConnectionEvent::Message { generation, data });
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::trace!("{RECV} binary ({} bytes)", data.len());
                        let _ = shared.events.send(ConnectionEvent::Message { generation, data });
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                        tracing::trace!("{RECV} control frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((None, String::new()), |f| {
                            (Some(u16::from(f.code)), f.reason.as_str().to_owned())
                        });
                        tracing::debug!(
                            "Received close frame (generation {generation}): {code:?} {reason}"
                        );

                        let stopping = shared.state() == ConnectionState::Closing;
                        if !stopping && !is_normal_close(code) {
                            shared.needs_reconnect.store(true, Ordering::SeqCst);
                        }
                        shared.transition(ConnectionState::Open, ConnectionState::Closing);
                        shared.set_termination(code, reason);
                        break;
                    }
                    Some(Err(e)) => {
                        shared.fail(TransportErrorKind::classify(&e), format!("Read failed: {e}"));
                        break;
                    }
                    None => {
                        shared.fail(
                            TransportErrorKind::Eof,
                            "Stream ended without a close frame".to_string(),
                        );
                        break;
                    }
                },
            }
        }

        shared.cancel.cancel();
        shared
            .state
            .store(ConnectionState::Closed.as_u8(), Ordering::SeqCst);

        let (code, reason) = shared.take_termination();
        tracing::debug!("Connection generation {generation} closed: {code:?} {reason}");
        let _ = shared.events.send(ConnectionEvent::Close {
            generation,
            code,
            reason,
        });
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.shared.cancel.cancel();
        }
    }
}
