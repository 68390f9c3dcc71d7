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

use std::time::Duration;

use super::enums::HyperliquidNetwork;

// Mainnet URLs
pub const HYPERLIQUID_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";
pub const HYPERLIQUID_API_URL: &str = "https://api.hyperliquid.xyz";

// Testnet URLs
pub const HYPERLIQUID_TESTNET_WS_URL: &str = "wss://api.hyperliquid-testnet.xyz/ws";
pub const HYPERLIQUID_TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Plain-text notice the server sends once when a socket opens.
pub const CONNECTION_BANNER: &str = "Websocket connection established.";

/// Gets WebSocket URL for the specified network.
#[must_use]
pub const fn ws_url(network: HyperliquidNetwork) -> &'static str {
    match network {
        HyperliquidNetwork::Mainnet => HYPERLIQUID_WS_URL,
        HyperliquidNetwork::Testnet => HYPERLIQUID_TESTNET_WS_URL,
    }
}

/// Gets the HTTP API base URL for the specified network.
#[must_use]
pub const fn api_url(network: HyperliquidNetwork) -> &'static str {
    match network {
        HyperliquidNetwork::Mainnet => HYPERLIQUID_API_URL,
        HyperliquidNetwork::Testnet => HYPERLIQUID_TESTNET_API_URL,
    }
}

/// Derives the websocket endpoint from an HTTP API base URL.
///
/// `https://host` becomes `wss://host/ws` and `http://host` becomes `ws://host/ws`.
#[must_use]
pub fn ws_url_from_http(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let rest = base_url.strip_prefix("http").unwrap_or(base_url);
    format!("ws{rest}/ws")
}

// Default configuration values
// Server closes if no message in last 60s, so ping every 30s
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const HEARTBEAT_STOP_TIMEOUT: Duration = Duration::from_secs(2);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const RECONNECT_BASE_BACKOFF: Duration = Duration::from_secs(1);
pub const RECONNECT_MAX_BACKOFF: Duration = Duration::from_secs(30);
pub const RECONNECT_MAX_ATTEMPTS: u32 = 5;
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// Tests
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_ws_url() {
        assert_eq!(ws_url(HyperliquidNetwork::Mainnet), HYPERLIQUID_WS_URL);
        assert_eq!(
            ws_url(HyperliquidNetwork::Testnet),
            HYPERLIQUID_TESTNET_WS_URL
        );
    }

    #[rstest]
    #[case("https://api.hyperliquid.xyz", "wss://api.hyperliquid.xyz/ws")]
    #[case("https://api.hyperliquid.xyz/", "wss://api.hyperliquid.xyz/ws")]
    #[case("http://localhost:3001", "ws://localhost:3001/ws")]
    fn test_ws_url_from_http(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(ws_url_from_http(base), expected);
    }

    #[rstest]
    fn test_api_and_ws_urls_agree() {
        for network in [HyperliquidNetwork::Mainnet, HyperliquidNetwork::Testnet] {
            assert_eq!(ws_url_from_http(api_url(network)), ws_url(network));
        }
    }
}
