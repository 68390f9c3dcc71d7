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

//! Periodic keep-alive for one connection generation.

use std::time::Duration;

use bytes::Bytes;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::ConnectionHandle;
use crate::error::TransportErrorKind;

/// Interval used when a zero interval is requested.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Sends a keep-alive on a fixed interval, independent of message traffic.
///
/// At most one heartbeat task runs per sender. [`HeartbeatSender::start`] always stops the
/// previous task before spawning the next, so a stale heartbeat never writes to a replaced socket.
#[derive(Debug)]
pub struct HeartbeatSender {
    interval: Duration,
    message: Option<String>,
    stop_timeout: Duration,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl HeartbeatSender {
    /// Creates a new [`HeartbeatSender`] instance.
    ///
    /// A `message` of `None` sends websocket ping frames instead of text. A zero `interval`
    /// falls back to [`DEFAULT_HEARTBEAT_INTERVAL`].
    #[must_use]
    pub const fn new(interval: Duration, message: Option<String>, stop_timeout: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_HEARTBEAT_INTERVAL
        } else {
            interval
        };
        Self {
            interval,
            message,
            stop_timeout,
            task: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if a heartbeat task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|(_, task)| !task.is_finished())
    }

    /// Stops any running heartbeat, then starts one bound to `handle`.
    pub async fn start(&mut self, handle: ConnectionHandle) {
        self.stop().await;

        tracing::debug!(
            "Starting heartbeat every {:?} (generation {})",
            self.interval,
            handle.generation()
        );
        let token = CancellationToken::new();
        let task = tokio::spawn(Self::run(
            handle,
            self.interval,
            self.message.clone(),
            token.clone(),
        ));
        self.task = Some((token, task));
    }

    /// Stops the running heartbeat, waiting at most the configured stop timeout.
    ///
    /// Returns false if the task had to be abandoned because it did not stop in time.
    pub async fn stop(&mut self) -> bool {
        let Some((token, mut task)) = self.task.take() else {
            return true;
        };

        token.cancel();
        if tokio::time::timeout(self.stop_timeout, &mut task)
            .await
            .is_ok()
        {
            tracing::debug!("Heartbeat stopped");
            true
        } else {
            tracing::warn!(
                "Heartbeat task did not stop within {:?}, abandoning",
                self.stop_timeout
            );
            task.abort();
            false
        }
    }

    async fn run(
        handle: ConnectionHandle,
        interval: Duration,
        message: Option<String>,
        token: CancellationToken,
    ) {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    if !handle.is_open() {
                        tracing::debug!(
                            "Connection not open (generation {}), heartbeat exiting",
                            handle.generation()
                        );
                        break;
                    }

                    let result = match &message {
                        Some(text) => handle.send_text(text.clone()),
                        None => handle.send(Message::Ping(Bytes::new())),
                    };

                    if let Err(e) = result {
                        tracing::warn!("Heartbeat send failed: {e}");
                        handle.fail(TransportErrorKind::Reset, format!("Heartbeat send failed: {e}"));
                        break;
                    }
                    tracing::trace!("Sent heartbeat (generation {})", handle.generation());
                }
            }
        }
    }
}

impl Drop for HeartbeatSender {
    fn drop(&mut self) {
        if let Some((token, task)) = self.task.take() {
            token.cancel();
            task.abort();
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;
    use tokio::sync::mpsc;

    use super::*;
    use crate::websocket::{
        ConnectionEvent, ConnectionLifecycle, WebSocketConfig, tests::ChannelConnector,
    };

    const PING: &str = r#"{"method":"ping"}"#;

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_sends_on_interval_until_stopped() {
        let connector = Arc::new(ChannelConnector::default());
        let mut lifecycle =
            ConnectionLifecycle::new(WebSocketConfig::new("ws://test"), connector.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = lifecycle.open(tx).await.unwrap();
        let mut peer = connector.take_peer();

        let mut heartbeat = HeartbeatSender::new(
            Duration::from_secs(30),
            Some(PING.to_string()),
            Duration::from_secs(2),
        );
        heartbeat.start(handle).await;

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(heartbeat.stop().await);
        assert!(!heartbeat.is_running());

        let mut pings = 0;
        while let Ok(message) = peer.outbound_rx.try_recv() {
            assert_eq!(message, Message::Text(PING.into()));
            pings += 1;
        }
        assert_eq!(pings, 3);

        // Nothing more after stop
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(peer.outbound_rx.try_recv().is_err());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_exits_silently_when_connection_not_open() {
        let connector = Arc::new(ChannelConnector::default());
        let mut lifecycle =
            ConnectionLifecycle::new(WebSocketConfig::new("ws://test"), connector.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = lifecycle.open(tx).await.unwrap();
        let peer = connector.take_peer();

        let mut heartbeat =
            HeartbeatSender::new(Duration::from_secs(1), None, Duration::from_secs(2));
        heartbeat.start(handle.clone()).await;

        drop(peer);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(!heartbeat.is_running());
        let mut errors = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ConnectionEvent::Error { .. }) {
                errors += 1;
            }
        }
        // Only the read side reports the dropped peer
        assert_eq!(errors, 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_task() {
        let connector = Arc::new(ChannelConnector::default());
        let mut lifecycle =
            ConnectionLifecycle::new(WebSocketConfig::new("ws://test"), connector.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = lifecycle.open(tx.clone()).await.unwrap();
        let mut first_peer = connector.take_peer();
        let mut heartbeat = HeartbeatSender::new(
            Duration::from_secs(10),
            Some(PING.to_string()),
            Duration::from_secs(2),
        );
        heartbeat.start(first).await;

        let second = lifecycle.open(tx).await.unwrap();
        let mut second_peer = connector.take_peer();
        heartbeat.start(second).await;

        tokio::time::sleep(Duration::from_secs(25)).await;
        heartbeat.stop().await;

        // The first generation only ever sees its close frame
        while let Ok(message) = first_peer.outbound_rx.try_recv() {
            assert!(matches!(message, Message::Close(_)));
        }
        let mut pings = 0;
        while second_peer.outbound_rx.try_recv().is_ok() {
            pings += 1;
        }
        assert_eq!(pings, 2);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_uses_default() {
        let connector = Arc::new(ChannelConnector::default());
        let mut lifecycle =
            ConnectionLifecycle::new(WebSocketConfig::new("ws://test"), connector.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = lifecycle.open(tx).await.unwrap();
        let mut peer = connector.take_peer();

        let mut heartbeat = HeartbeatSender::new(
            Duration::ZERO,
            Some(PING.to_string()),
            Duration::from_secs(2),
        );
        assert_eq!(heartbeat.interval(), DEFAULT_HEARTBEAT_INTERVAL);

        heartbeat.start(handle).await;
        tokio::time::sleep(DEFAULT_HEARTBEAT_INTERVAL + Duration::from_secs(1)).await;
        assert!(heartbeat.is_running());
        assert!(heartbeat.stop().await);

        let mut pings = 0;
        while let Ok(message) = peer.outbound_rx.try_recv() {
            assert_eq!(message, Message::Text(PING.into()));
            pings += 1;
        }
        assert_eq!(pings, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut heartbeat =
            HeartbeatSender::new(Duration::from_secs(1), None, Duration::from_secs(1));
        assert!(heartbeat.stop().await);
        assert!(heartbeat.stop().await);
    }
}
