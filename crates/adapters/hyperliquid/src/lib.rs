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

//! Resilient streaming client for the [Hyperliquid](https://hyperliquid.xyz) websocket API.
//!
//! The `hyperstream-hyperliquid` crate keeps a single websocket connection to Hyperliquid alive
//! and makes subscriptions durable across reconnects: every active subscription is replayed on
//! each new connection, requests made while offline are queued and flushed on connect, and
//! inbound messages are fanned out to subscriber callbacks by topic.
//!
//! The official Hyperliquid API reference can be found at
//! <https://hyperliquid.gitbook.io/hyperliquid-docs/for-developers/api/websocket>.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod common;
pub mod config;
pub mod websocket;

pub use crate::{
    common::{CoinMap, HyperliquidNetwork, LogSeverity},
    config::HyperliquidWsConfig,
    websocket::{HyperliquidWebSocketClient, HyperliquidWsMessage, SubscriptionRequest},
};
