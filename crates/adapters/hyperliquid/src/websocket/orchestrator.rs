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

//! Connection supervisor: connects, resubscribes, routes, and reconnects with backoff.
//!
//! The orchestrator runs as a single tokio task that owns the [`ConnectionLifecycle`] and the
//! [`HeartbeatSender`]. Every connection generation gets its own event channel, so events from a
//! replaced socket are never mistaken for failures of the current one.
//!
//! ```text
//! Idle -> Connecting -> ResubscribePending -> Ready
//!             ^                                 |
//!             |                                 v
//!             +-------------------------- Disconnected(retry) --> Stopped
//! ```

use std::{sync::Arc, time::Duration};

use hyperstream_network::{
    backoff::ReconnectBackoff,
    error::ConnectError,
    websocket::{ConnectionEvent, ConnectionHandle, ConnectionLifecycle, EventReceiver, HeartbeatSender},
};
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{registry::SubscriptionRegistry, router::MessageRouter, signals::Signals};
use crate::common::enums::LogSeverity;

/// Upper bound on waiting for the server to acknowledge a close during shutdown.
const SHUTDOWN_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Connecting,
    ResubscribePending,
    Ready,
    Disconnected {
        retry: u32,
    },
    Stopped,
}

impl OrchestratorState {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

enum DriveExit {
    Reconnect(String),
    Stop,
}

#[derive(Debug)]
pub struct ReconnectOrchestrator {
    lifecycle: ConnectionLifecycle,
    heartbeat: HeartbeatSender,
    backoff: ReconnectBackoff,
    registry: Arc<SubscriptionRegistry>,
    router: MessageRouter,
    signals: Signals,
    state_tx: Arc<watch::Sender<OrchestratorState>>,
    cancel: CancellationToken,
}

impl ReconnectOrchestrator {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lifecycle: ConnectionLifecycle,
        heartbeat: HeartbeatSender,
        backoff: ReconnectBackoff,
        registry: Arc<SubscriptionRegistry>,
        signals: Signals,
        state_tx: Arc<watch::Sender<OrchestratorState>>,
        cancel: CancellationToken,
    ) -> Self {
        let router = MessageRouter::new(registry.clone(), signals.clone());
        Self {
            lifecycle,
            heartbeat,
            backoff,
            registry,
            router,
            signals,
            state_tx,
            cancel,
        }
    }

    fn set_state(&self, state: OrchestratorState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!("Orchestrator {previous} -> {state}");
        }
    }

    /// Runs until cancelled or until the reconnect budget is exhausted.
    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.set_state(OrchestratorState::Connecting);
            let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();

            let opened = self.lifecycle.open_until(events_tx, &self.cancel).await;

            let reason = match opened {
                Ok(handle) => {
                    self.backoff.reset();
                    let exit = self.drive(&handle, &mut events_rx).await;
                    self.heartbeat.stop().await;
                    self.registry.deactivate();

                    match exit {
                        DriveExit::Reconnect(reason) => reason,
                        DriveExit::Stop => {
                            self.shutdown(Some(events_rx)).await;
                            return;
                        }
                    }
                }
                Err(ConnectError::Cancelled) => break,
                Err(e) => {
                    self.signals
                        .log(LogSeverity::Warning, &format!("Connect failed: {e}"));
                    e.to_string()
                }
            };

            let Some(delay) = self.backoff.next_duration() else {
                self.signals.connectivity_lost(&format!(
                    "Reconnect attempts exhausted after {} retries: {reason}",
                    self.backoff.max_attempts()
                ));
                // Stopped is published last so a re-arm never races this task's exit
                self.set_state(OrchestratorState::Stopped);
                return;
            };

            let retry = self.backoff.attempt();
            self.set_state(OrchestratorState::Disconnected { retry });
            self.signals.log(
                LogSeverity::Info,
                &format!("Reconnecting in {delay:?} (retry {retry}): {reason}"),
            );

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.shutdown(None).await;
    }

    async fn drive(&mut self, handle: &ConnectionHandle, events: &mut EventReceiver) -> DriveExit {
        let generation = handle.generation();

        loop {
            let event = tokio::select! {
                () = self.cancel.cancelled() => return DriveExit::Stop,
                event = events.recv() => event,
            };

            let Some(event) = event else {
                return DriveExit::Reconnect("event channel closed".to_string());
            };

            if event.generation() != generation {
                tracing::trace!("Ignoring event from generation {}", event.generation());
                continue;
            }

            match event {
                ConnectionEvent::Open { .. } => self.on_open(handle).await,
                ConnectionEvent::Message { data, .. } => {
                    self.router.route(&data);
                }
                ConnectionEvent::Error { kind, message, .. } => {
                    self.signals
                        .log(LogSeverity::Warning, &format!("Transport error ({kind}): {message}"));
                }
                ConnectionEvent::Close { code, reason, .. } => {
                    return DriveExit::Reconnect(format!(
                        "connection closed (code {code:?}): {reason}"
                    ));
                }
            }
        }
    }

    async fn on_open(&mut self, handle: &ConnectionHandle) {
        self.set_state(OrchestratorState::ResubscribePending);
        self.heartbeat.start(handle.clone()).await;

        let (replayed, flushed) = self.registry.activate(handle.clone());
        tracing::debug!(
            "Generation {} resubscribed {replayed}, flushed {flushed}",
            handle.generation()
        );

        self.set_state(OrchestratorState::Ready);
    }

    async fn shutdown(&mut self, events: Option<EventReceiver>) {
        self.heartbeat.stop().await;
        self.registry.deactivate();
        self.lifecycle.close();

        if let Some(mut events) = events {
            let wait_for_close = async {
                while let Some(event) = events.recv().await {
                    if matches!(event, ConnectionEvent::Close { .. }) {
                        break;
                    }
                }
            };
            if tokio::time::timeout(SHUTDOWN_CLOSE_TIMEOUT, wait_for_close)
                .await
                .is_err()
            {
                tracing::debug!("Close not acknowledged within {SHUTDOWN_CLOSE_TIMEOUT:?}");
            }
        }

        self.set_state(OrchestratorState::Stopped);
        tracing::info!("Orchestrator stopped");
    }
}
