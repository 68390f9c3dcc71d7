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

//! Public Hyperliquid websocket client.
//!
//! Subscriptions are durable: they survive disconnects and are replayed after every reconnect
//! until explicitly unsubscribed or the client is disconnected.

use std::{fmt::Debug, sync::Arc, time::Duration};

use hyperstream_network::websocket::{
    ConnectionLifecycle, HeartbeatSender, TungsteniteConnector, WebSocketConnector,
};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use ustr::Ustr;

use super::{
    error::{HyperliquidWsError, HyperliquidWsResult},
    messages::{HyperliquidWsMessage, SubscriptionRequest},
    orchestrator::{OrchestratorState, ReconnectOrchestrator},
    registry::{SubscriptionCallback, SubscriptionRegistry},
    signals::Signals,
};
use crate::{
    common::{
        coins::CoinMap,
        consts::{DISCONNECT_TIMEOUT, HEARTBEAT_INTERVAL},
    },
    config::HyperliquidWsConfig,
};

/// Validates that a URL is a proper websocket URL.
fn validate_url(url: &str) -> HyperliquidWsResult<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| HyperliquidWsError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        scheme => Err(HyperliquidWsError::InvalidUrl(format!(
            "URL must use ws:// or wss://, was {scheme}://"
        ))),
    }
}

/// Subscription-durable, reconnecting Hyperliquid websocket client.
pub struct HyperliquidWebSocketClient {
    config: HyperliquidWsConfig,
    connector: Arc<dyn WebSocketConnector>,
    registry: Arc<SubscriptionRegistry>,
    coins: Arc<CoinMap>,
    signals: Signals,
    state_tx: Arc<watch::Sender<OrchestratorState>>,
    task: tokio::sync::Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Debug for HyperliquidWebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(HyperliquidWebSocketClient))
            .field("url", &self.config.ws_url())
            .field("state", &self.state())
            .field("subscriptions", &self.registry.subscription_count())
            .field("pending", &self.registry.pending_count())
            .finish()
    }
}

impl HyperliquidWebSocketClient {
    /// Creates a new client. No connection is made until [`Self::connect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is not a websocket URL.
    pub fn new(config: HyperliquidWsConfig) -> HyperliquidWsResult<Self> {
        validate_url(&config.ws_url())?;

        let (state_tx, _) = watch::channel(OrchestratorState::Idle);
        Ok(Self {
            config,
            connector: Arc::new(TungsteniteConnector),
            registry: Arc::new(SubscriptionRegistry::new()),
            coins: Arc::new(CoinMap::new()),
            signals: Signals::new(),
            state_tx: Arc::new(state_tx),
            task: tokio::sync::Mutex::new(None),
        })
    }

    /// Replaces the transport connector.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn WebSocketConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Uses `coins` to translate display names in coin-keyed subscriptions.
    #[must_use]
    pub fn with_coin_map(mut self, coins: Arc<CoinMap>) -> Self {
        self.coins = coins;
        self
    }

    #[must_use]
    pub fn with_signals(mut self, signals: Signals) -> Self {
        self.signals = signals;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &HyperliquidWsConfig {
        &self.config
    }

    #[must_use]
    pub fn coin_map(&self) -> &CoinMap {
        &self.coins
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        *self.state_tx.borrow()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Starts the connection supervisor.
    ///
    /// A no-op while the supervisor is running. After it stopped, either from retry exhaustion or
    /// [`Self::disconnect`], this re-arms it; subscriptions queued since are flushed on connect.
    pub async fn connect(&self) {
        let mut task = self.task.lock().await;
        if let Some((_, handle)) = task.as_mut()
            && !handle.is_finished()
        {
            if !self.state().is_stopped() {
                tracing::debug!("Connect requested while running, ignoring");
                return;
            }

            // Stopped is the supervisor's last publish, so the task is already on its way out
            match tokio::time::timeout(DISCONNECT_TIMEOUT, &mut *handle).await {
                Ok(Ok(())) => tracing::debug!("Previous orchestrator task joined"),
                Ok(Err(e)) => tracing::error!("Previous orchestrator task failed: {e}"),
                Err(_) => {
                    tracing::warn!(
                        "Previous orchestrator did not exit within {DISCONNECT_TIMEOUT:?}, aborting"
                    );
                    handle.abort();
                }
            }
        }

        self.registry.reopen();

        let ws_config = self.config.websocket_config();
        let heartbeat = HeartbeatSender::new(
            ws_config.heartbeat_interval().unwrap_or(HEARTBEAT_INTERVAL),
            ws_config.heartbeat_msg.clone(),
            ws_config.heartbeat_stop_timeout,
        );
        tracing::info!("Connecting to {}", ws_config.url);

        let cancel = CancellationToken::new();
        let orchestrator = ReconnectOrchestrator::new(
            ConnectionLifecycle::new(ws_config, self.connector.clone()),
            heartbeat,
            self.config.backoff(),
            self.registry.clone(),
            self.signals.clone(),
            self.state_tx.clone(),
            cancel.clone(),
        );

        *task = Some((cancel, tokio::spawn(orchestrator.run())));
    }

    /// Re-arms a stopped client.
    ///
    /// # Errors
    ///
    /// Returns [`HyperliquidWsError::AlreadyRunning`] unless the client is stopped.
    pub async fn rearm(&self) -> HyperliquidWsResult<()> {
        if !self.state().is_stopped() {
            return Err(HyperliquidWsError::AlreadyRunning);
        }
        self.connect().await;
        Ok(())
    }

    /// Tears the client down: closes the socket, stops the heartbeat and reconnects, and drops
    /// every subscription. Subscribing afterwards fails until [`Self::connect`] is called again.
    pub async fn disconnect(&self) {
        self.registry.close();

        let Some((cancel, mut handle)) = self.task.lock().await.take() else {
            self.state_tx.send_replace(OrchestratorState::Stopped);
            return;
        };

        cancel.cancel();
        match tokio::time::timeout(DISCONNECT_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => tracing::debug!("Orchestrator task joined"),
            Ok(Err(e)) => tracing::error!("Orchestrator task failed: {e}"),
            Err(_) => {
                tracing::warn!("Orchestrator did not stop within {DISCONNECT_TIMEOUT:?}, aborting");
                handle.abort();
            }
        }

        self.state_tx.send_replace(OrchestratorState::Stopped);
        tracing::info!("Disconnected");
    }

    /// Waits until the client is connected with all subscriptions replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not ready within `timeout`.
    pub async fn wait_until_ready(&self, timeout: Duration) -> HyperliquidWsResult<()> {
        let mut state_rx = self.state_tx.subscribe();
        match tokio::time::timeout(timeout, state_rx.wait_for(OrchestratorState::is_ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(HyperliquidWsError::Transport(format!(
                "not ready within {timeout:?} (state {})",
                self.state()
            ))),
        }
    }

    /// Subscribes `callback` to `subscription`, returning its subscription id.
    ///
    /// Never waits for connectivity: while not ready the request is queued and sent on the next
    /// connect.
    ///
    /// # Errors
    ///
    /// Returns [`HyperliquidWsError::NotConnected`] after [`Self::disconnect`].
    pub fn subscribe<F>(
        &self,
        subscription: SubscriptionRequest,
        callback: F,
    ) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe_inner(subscription, Arc::new(callback), None)
    }

    /// Subscribes with a caller-chosen id; re-subscribing the same id replaces its callback.
    ///
    /// # Errors
    ///
    /// Returns [`HyperliquidWsError::DuplicateSubscriptionId`] if `id` is live on another topic,
    /// or [`HyperliquidWsError::NotConnected`] after [`Self::disconnect`].
    pub fn subscribe_with_id<F>(
        &self,
        subscription: SubscriptionRequest,
        callback: F,
        id: u64,
    ) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe_inner(subscription, Arc::new(callback), Some(id))
    }

    fn subscribe_inner(
        &self,
        subscription: SubscriptionRequest,
        callback: SubscriptionCallback,
        id: Option<u64>,
    ) -> HyperliquidWsResult<u64> {
        let subscription = self.coins.remap(subscription);
        self.registry.subscribe(subscription, callback, id)
    }

    /// Removes subscription `id`; returns true if it was active or queued.
    pub fn unsubscribe(&self, subscription: &SubscriptionRequest, id: u64) -> bool {
        let subscription = self.coins.remap(subscription.clone());
        self.registry.unsubscribe(&subscription, id)
    }

    /// Subscribes to trades for `coin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_trades<F>(&self, coin: &str, callback: F) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(
            SubscriptionRequest::Trades {
                coin: Ustr::from(coin),
            },
            callback,
        )
    }

    /// Subscribes to the L2 order book for `coin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_book<F>(&self, coin: &str, callback: F) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(
            SubscriptionRequest::L2Book {
                coin: Ustr::from(coin),
                n_sig_figs: None,
                mantissa: None,
            },
            callback,
        )
    }

    /// Subscribes to best bid/offer for `coin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_bbo<F>(&self, coin: &str, callback: F) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(
            SubscriptionRequest::Bbo {
                coin: Ustr::from(coin),
            },
            callback,
        )
    }

    /// Subscribes to candles for `coin` at `interval` (for example `1m`, `1h`).
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_candle<F>(
        &self,
        coin: &str,
        interval: &str,
        callback: F,
    ) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(
            SubscriptionRequest::Candle {
                coin: Ustr::from(coin),
                interval: interval.to_string(),
            },
            callback,
        )
    }

    /// Subscribes to mid prices across all markets.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_all_mids<F>(&self, callback: F) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(SubscriptionRequest::AllMids { dex: None }, callback)
    }

    /// Subscribes to fills for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_user_fills<F>(&self, user: &str, callback: F) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(
            SubscriptionRequest::UserFills {
                user: user.to_string(),
                aggregate_by_time: None,
            },
            callback,
        )
    }

    /// Subscribes to order updates for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is rejected.
    pub fn subscribe_order_updates<F>(&self, user: &str, callback: F) -> HyperliquidWsResult<u64>
    where
        F: Fn(&HyperliquidWsMessage) + Send + Sync + 'static,
    {
        self.subscribe(
            SubscriptionRequest::OrderUpdates {
                user: user.to_string(),
            },
            callback,
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use rstest::rstest;

    use super::*;
    use crate::websocket::testing::{MockConnector, next_peer};

    const ETH_TRADE: &str = r#"{"channel":"trades","data":[{"coin":"eth","side":"B","px":"3000.0","sz":"0.5","time":1700000000000}]}"#;

    fn client(connector: Arc<MockConnector>) -> HyperliquidWebSocketClient {
        HyperliquidWebSocketClient::new(HyperliquidWsConfig::default())
            .unwrap()
            .with_connector(connector)
    }

    #[rstest]
    #[case("https://api.hyperliquid.xyz/ws")]
    #[case("not a url")]
    fn test_rejects_non_websocket_url(#[case] url: &str) {
        let config = HyperliquidWsConfig {
            base_url_ws: Some(url.to_string()),
            ..HyperliquidWsConfig::default()
        };
        assert!(matches!(
            HyperliquidWebSocketClient::new(config),
            Err(HyperliquidWsError::InvalidUrl(_))
        ));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_subscribe_unsubscribe_scenario() {
        let (connector, mut peers) = MockConnector::new();
        let client = client(connector);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        client.connect().await;
        let mut peer = next_peer(&mut peers).await;
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        let sub = SubscriptionRequest::Trades {
            coin: Ustr::from("ETH"),
        };
        let id = client
            .subscribe_with_id(
                sub.clone(),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                1,
            )
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(
            peer.next_text().await,
            r#"{"method":"subscribe","subscription":{"type":"trades","coin":"ETH"}}"#
        );

        peer.push_text(ETH_TRADE);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(client.unsubscribe(&sub, 1));
        assert_eq!(
            peer.next_text().await,
            r#"{"method":"unsubscribe","subscription":{"type":"trades","coin":"ETH"}}"#
        );

        peer.push_text(ETH_TRADE);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(!client.unsubscribe(&sub, 1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(peer.drain_texts().is_empty());

        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_subscribe_after_disconnect_fails() {
        let (connector, _peers) = MockConnector::new();
        let client = client(connector);
        client.connect().await;
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        client.disconnect().await;

        assert_eq!(client.state(), OrchestratorState::Stopped);
        assert!(matches!(
            client.subscribe_trades("BTC", |_| {}),
            Err(HyperliquidWsError::NotConnected)
        ));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_rearm_only_when_stopped() {
        let (connector, mut peers) = MockConnector::new();
        connector.set_refuse(true);
        let client = client(connector.clone());

        client.connect().await;
        assert!(matches!(
            client.rearm().await,
            Err(HyperliquidWsError::AlreadyRunning)
        ));

        tokio::time::timeout(
            Duration::from_secs(60),
            client.state_tx.subscribe().wait_for(OrchestratorState::is_stopped),
        )
        .await
        .unwrap()
        .unwrap();

        // Queued while stopped, flushed once re-armed
        client.subscribe_bbo("BTC", |_| {}).unwrap();
        connector.set_refuse(false);
        client.rearm().await.unwrap();

        let mut peer = next_peer(&mut peers).await;
        assert_eq!(
            peer.next_text().await,
            r#"{"method":"subscribe","subscription":{"type":"bbo","coin":"BTC"}}"#
        );
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rearm_from_stopped_notification() {
        let (connector, mut peers) = MockConnector::new();
        connector.set_refuse(true);
        let config = HyperliquidWsConfig {
            reconnect_delay_base_ms: 10,
            reconnect_delay_max_ms: 10,
            reconnect_max_attempts: 1,
            ..HyperliquidWsConfig::default()
        };
        let lost = Arc::new(AtomicUsize::new(0));
        let counter = lost.clone();
        let signals = Signals::new().with_connectivity_lost(move |_| {
            // Slow handler holds the supervisor task open
            std::thread::sleep(Duration::from_millis(300));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let client = HyperliquidWebSocketClient::new(config)
            .unwrap()
            .with_connector(connector.clone())
            .with_signals(signals);
        let mut state_rx = client.state_tx.subscribe();

        client.connect().await;
        tokio::time::timeout(
            Duration::from_secs(5),
            state_rx.wait_for(OrchestratorState::is_stopped),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(lost.load(Ordering::SeqCst), 1);

        let before = connector.attempts().len();
        connector.set_refuse(false);
        client.rearm().await.unwrap();

        let _peer = next_peer(&mut peers).await;
        assert_eq!(connector.attempts().len(), before + 1);
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_connect_replaces_lingering_task_once_stopped() {
        let (connector, mut peers) = MockConnector::new();
        let client = client(connector.clone());

        client.connect().await;
        let _first = next_peer(&mut peers).await;
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        // Supervisor reports stopped but its task has not exited
        client.state_tx.send_replace(OrchestratorState::Stopped);
        client.rearm().await.unwrap();

        let _second = next_peer(&mut peers).await;
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();
        assert_eq!(connector.attempts().len(), 2);

        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_coin_map_folds_case() {
        let (connector, mut peers) = MockConnector::new();
        let coins = Arc::new(CoinMap::new());
        coins.insert("HYPE/USDC", "@107");
        let client = client(connector).with_coin_map(coins);

        client.subscribe_book("hype/usdc", |_| {}).unwrap();
        client.connect().await;

        let mut peer = next_peer(&mut peers).await;
        assert_eq!(
            peer.next_text().await,
            r#"{"method":"subscribe","subscription":{"type":"l2Book","coin":"@107"}}"#
        );

        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent_while_running() {
        let (connector, mut peers) = MockConnector::new();
        let client = client(connector.clone());

        client.connect().await;
        let _peer = next_peer(&mut peers).await;
        client.connect().await;
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        assert_eq!(connector.attempts().len(), 1);
        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_coin_map_applied_before_topic() {
        let (connector, mut peers) = MockConnector::new();
        let coins = Arc::new(CoinMap::new());
        coins.insert("HYPE/USDC", "@107");
        let client = client(connector).with_coin_map(coins);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        client
            .subscribe_book("HYPE/USDC", move |msg| sink.lock().unwrap().push(msg.channel()))
            .unwrap();
        client.connect().await;

        let mut peer = next_peer(&mut peers).await;
        assert_eq!(
            peer.next_text().await,
            r#"{"method":"subscribe","subscription":{"type":"l2Book","coin":"@107"}}"#
        );
        peer.push_text(r#"{"channel":"l2Book","data":{"coin":"@107","levels":[[],[]],"time":1}}"#);
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["l2Book"]);
        client.disconnect().await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_pings_on_interval() {
        let (connector, mut peers) = MockConnector::new();
        let client = client(connector);
        client.connect().await;
        let mut peer = next_peer(&mut peers).await;
        client.wait_until_ready(Duration::from_secs(5)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let pings = peer
            .drain_frames()
            .into_iter()
            .filter(|frame| frame.to_text().is_ok_and(|t| t == r#"{"method":"ping"}"#))
            .count();
        assert_eq!(pings, 2);

        client.disconnect().await;
    }
}
