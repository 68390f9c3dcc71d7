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

use hyperstream_network::error::SendError;
use thiserror::Error;

/// Errors surfaced by the Hyperliquid websocket client.
#[derive(Debug, Clone, Error)]
pub enum HyperliquidWsError {
    /// The client was disconnected and no longer accepts subscriptions.
    #[error("Client is not connected")]
    NotConnected,
    /// A re-arm was requested while the client is still running.
    #[error("Client is already running")]
    AlreadyRunning,
    /// The subscription id is live on a different topic.
    #[error("Subscription id {0} is already in use")]
    DuplicateSubscriptionId(u64),
    /// No subscription id above the highest one handed out remains.
    #[error("Subscription ids exhausted")]
    SubscriptionIdsExhausted,
    /// Serialization failure.
    #[error("JSON error: {0}")]
    Json(String),
    /// The frame could not be queued on the connection.
    #[error("Send error: {0}")]
    Send(String),
    /// The connection did not become ready.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The configured URL is not a websocket URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<serde_json::Error> for HyperliquidWsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<SendError> for HyperliquidWsError {
    fn from(error: SendError) -> Self {
        Self::Send(error.to_string())
    }
}

/// Result type for Hyperliquid websocket operations.
pub type HyperliquidWsResult<T> = Result<T, HyperliquidWsError>;
