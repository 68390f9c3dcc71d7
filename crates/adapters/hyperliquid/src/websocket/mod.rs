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

//! WebSocket client for the Hyperliquid API.
//!
//! Provides streaming connectivity to Hyperliquid websocket endpoints, supporting:
//!
//! - Durable subscriptions replayed after every reconnect.
//! - Topic-keyed fan-out of inbound messages to subscriber callbacks.
//! - Keep-alive pings and bounded linear reconnect backoff.

pub mod client;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod signals;
pub mod topic;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use crate::websocket::{
    client::HyperliquidWebSocketClient,
    error::{HyperliquidWsError, HyperliquidWsResult},
    messages::{HyperliquidWsMessage, HyperliquidWsRequest, SubscriptionRequest},
    orchestrator::OrchestratorState,
    registry::SubscriptionCallback,
    signals::Signals,
    topic::Topic,
};
