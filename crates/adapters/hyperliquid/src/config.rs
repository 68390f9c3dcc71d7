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

//! Configuration structures for the Hyperliquid websocket client.

use std::{env, path::Path, time::Duration};

use hyperstream_network::{backoff::ReconnectBackoff, websocket::WebSocketConfig};
use serde::Deserialize;

use crate::{
    common::{
        consts::{
            CONNECT_TIMEOUT, HEARTBEAT_INTERVAL, HEARTBEAT_STOP_TIMEOUT, RECONNECT_BASE_BACKOFF,
            RECONNECT_MAX_ATTEMPTS, RECONNECT_MAX_BACKOFF, ws_url,
        },
        enums::HyperliquidNetwork,
    },
    websocket::messages::HyperliquidWsRequest,
};

/// Configuration for the Hyperliquid websocket client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HyperliquidWsConfig {
    /// Mainnet or testnet endpoints.
    pub network: HyperliquidNetwork,
    /// Override for the WebSocket URL.
    pub base_url_ws: Option<String>,
    /// Keep-alive interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Bounded wait for the keep-alive task to stop, in milliseconds.
    pub heartbeat_stop_timeout_ms: u64,
    /// Handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Reconnect delay unit in milliseconds; retry `n` waits `n` units.
    pub reconnect_delay_base_ms: u64,
    /// Reconnect delay cap in milliseconds.
    pub reconnect_delay_max_ms: u64,
    /// Consecutive failed reconnects tolerated before giving up.
    pub reconnect_max_attempts: u32,
}

impl Default for HyperliquidWsConfig {
    fn default() -> Self {
        Self {
            network: HyperliquidNetwork::Mainnet,
            base_url_ws: None,
            heartbeat_interval_secs: HEARTBEAT_INTERVAL.as_secs(),
            heartbeat_stop_timeout_ms: duration_ms(HEARTBEAT_STOP_TIMEOUT),
            connect_timeout_ms: duration_ms(CONNECT_TIMEOUT),
            reconnect_delay_base_ms: duration_ms(RECONNECT_BASE_BACKOFF),
            reconnect_delay_max_ms: duration_ms(RECONNECT_MAX_BACKOFF),
            reconnect_max_attempts: RECONNECT_MAX_ATTEMPTS,
        }
    }
}

const fn duration_ms(duration: Duration) -> u64 {
    duration.as_secs() * 1_000 + duration.subsec_millis() as u64
}

impl HyperliquidWsConfig {
    /// Creates a new configuration with default settings for `network`.
    #[must_use]
    pub fn new(network: HyperliquidNetwork) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Loads the configuration from the environment.
    ///
    /// Reads `HYPERLIQUID_NET` (`mainnet` or `testnet`) and an optional `HYPERLIQUID_WS_URL`
    /// override.
    ///
    /// # Errors
    ///
    /// Returns an error if `HYPERLIQUID_NET` is set to an unknown network.
    pub fn from_env() -> anyhow::Result<Self> {
        let network = match env::var("HYPERLIQUID_NET") {
            Ok(value) => value
                .parse::<HyperliquidNetwork>()
                .map_err(|_| anyhow::anyhow!("Invalid HYPERLIQUID_NET value '{value}'"))?,
            Err(_) => HyperliquidNetwork::default(),
        };

        Ok(Self {
            network,
            base_url_ws: env::var("HYPERLIQUID_WS_URL").ok(),
            ..Self::default()
        })
    }

    /// Parses a TOML document; absent keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this structure.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Returns the WebSocket URL, respecting the network and overrides.
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.base_url_ws
            .clone()
            .unwrap_or_else(|| ws_url(self.network).to_string())
    }

    /// Returns the transport configuration, with the JSON ping as keep-alive.
    #[must_use]
    pub fn websocket_config(&self) -> WebSocketConfig {
        let heartbeat_msg = HyperliquidWsRequest::Ping.to_json().ok();
        WebSocketConfig {
            heartbeat: Some(self.heartbeat_interval_secs),
            heartbeat_msg,
            heartbeat_stop_timeout: Duration::from_millis(self.heartbeat_stop_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ..WebSocketConfig::new(self.ws_url())
        }
    }

    /// Returns the linear reconnect backoff described by this configuration.
    #[must_use]
    pub fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::linear(
            Duration::from_millis(self.reconnect_delay_base_ms),
            Duration::from_millis(self.reconnect_delay_max_ms),
            self.reconnect_max_attempts,
        )
    }
}
