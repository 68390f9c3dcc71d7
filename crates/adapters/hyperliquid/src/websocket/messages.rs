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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ustr::Ustr;

/// Represents an outbound WebSocket message from client to Hyperliquid.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method")]
#[serde(rename_all = "lowercase")]
pub enum HyperliquidWsRequest {
    /// Subscribe to a data feed.
    Subscribe {
        /// Subscription details.
        subscription: SubscriptionRequest,
    },
    /// Unsubscribe from a data feed.
    Unsubscribe {
        /// Subscription details to remove.
        subscription: SubscriptionRequest,
    },
    /// Ping for keepalive.
    Ping,
}

impl HyperliquidWsRequest {
    /// Serializes the request to its JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Represents subscription request types for WebSocket feeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionRequest {
    /// All mid prices across markets.
    AllMids {
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },
    /// Notifications for a user
    Notification { user: String },
    /// Web data for frontend
    WebData2 { user: String },
    /// Candlestick data
    Candle { coin: Ustr, interval: String },
    /// Level 2 order book
    L2Book {
        coin: Ustr,
        #[serde(skip_serializing_if = "Option::is_none")]
        #[serde(rename = "nSigFigs")]
        n_sig_figs: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mantissa: Option<u32>,
    },
    /// Trade updates
    Trades { coin: Ustr },
    /// Order updates for a user
    OrderUpdates { user: String },
    /// User events (fills, funding, liquidations)
    UserEvents { user: String },
    /// User fill history
    UserFills {
        user: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        #[serde(rename = "aggregateByTime")]
        aggregate_by_time: Option<bool>,
    },
    /// User funding payments
    UserFundings { user: String },
    /// User ledger updates (non-funding)
    UserNonFundingLedgerUpdates { user: String },
    /// Active asset context
    ActiveAssetCtx { coin: Ustr },
    /// Active asset data for user
    ActiveAssetData { user: String, coin: String },
    /// TWAP slice fills
    UserTwapSliceFills { user: String },
    /// TWAP history
    UserTwapHistory { user: String },
    /// Best bid/offer updates
    Bbo { coin: Ustr },
}

/// Inbound WebSocket message from Hyperliquid server.
///
/// Payloads are typed only as far as routing needs; everything else is kept as raw JSON for the
/// subscriber.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "channel")]
#[serde(rename_all = "camelCase")]
pub enum HyperliquidWsMessage {
    /// Subscription confirmation
    SubscriptionResponse { data: Value },
    /// Post request response
    Post { data: Value },
    /// Server error notice
    Error { data: Value },
    /// Pong response
    Pong,
    /// All mid prices
    AllMids { data: AllMidsData },
    /// Notifications
    Notification { data: NotificationData },
    /// Web data
    WebData2 { data: WsUserKeyedData },
    /// Candlestick data
    Candle { data: CandleData },
    /// Level 2 order book
    L2Book { data: WsBookData },
    /// Trade updates
    Trades { data: Vec<WsTradeData> },
    /// Order updates
    OrderUpdates { data: Vec<Value> },
    /// User events, published on the `user` channel
    #[serde(rename = "user", alias = "userEvents")]
    UserEvents { data: Value },
    /// User fills
    UserFills { data: WsUserFillsData },
    /// User funding payments
    UserFundings { data: WsUserKeyedData },
    /// User ledger updates
    UserNonFundingLedgerUpdates { data: WsUserKeyedData },
    /// Active asset context, perp or spot
    #[serde(alias = "activeSpotAssetCtx")]
    ActiveAssetCtx { data: WsActiveAssetCtxData },
    /// Active asset data
    ActiveAssetData { data: WsActiveAssetData },
    /// TWAP slice fills
    UserTwapSliceFills { data: WsUserKeyedData },
    /// TWAP history
    UserTwapHistory { data: WsUserKeyedData },
    /// Best bid/offer
    Bbo { data: WsBboData },
}

impl HyperliquidWsMessage {
    /// Returns the wire channel name of the message.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::SubscriptionResponse { .. } => "subscriptionResponse",
            Self::Post { .. } => "post",
            Self::Error { .. } => "error",
            Self::Pong => "pong",
            Self::AllMids { .. } => "allMids",
            Self::Notification { .. } => "notification",
            Self::WebData2 { .. } => "webData2",
            Self::Candle { .. } => "candle",
            Self::L2Book { .. } => "l2Book",
            Self::Trades { .. } => "trades",
            Self::OrderUpdates { .. } => "orderUpdates",
            Self::UserEvents { .. } => "user",
            Self::UserFills { .. } => "userFills",
            Self::UserFundings { .. } => "userFundings",
            Self::UserNonFundingLedgerUpdates { .. } => "userNonFundingLedgerUpdates",
            Self::ActiveAssetCtx { .. } => "activeAssetCtx",
            Self::ActiveAssetData { .. } => "activeAssetData",
            Self::UserTwapSliceFills { .. } => "userTwapSliceFills",
            Self::UserTwapHistory { .. } => "userTwapHistory",
            Self::Bbo { .. } => "bbo",
        }
    }
}

/// All mid prices data
#[derive(Debug, Clone, Deserialize)]
pub struct AllMidsData {
    pub mids: HashMap<String, String>,
}

/// Notification data
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationData {
    pub notification: String,
}

/// Candlestick data
#[derive(Debug, Clone, Deserialize)]
pub struct CandleData {
    /// Open time (millis)
    pub t: u64,
    /// Close time (millis)
    #[serde(rename = "T")]
    pub close_time: u64,
    /// Symbol
    pub s: Ustr,
    /// Interval
    pub i: String,
    /// Open price
    pub o: String,
    /// Close price
    pub c: String,
    /// High price
    pub h: String,
    /// Low price
    pub l: String,
    /// Volume
    pub v: String,
    /// Number of trades
    pub n: u32,
}

/// WebSocket book data
#[derive(Debug, Clone, Deserialize)]
pub struct WsBookData {
    pub coin: Ustr,
    pub levels: [Vec<WsLevelData>; 2], // [bids, asks]
    pub time: u64,
}

/// WebSocket level data
#[derive(Debug, Clone, Deserialize)]
pub struct WsLevelData {
    /// Price
    pub px: String,
    /// Size
    pub sz: String,
    /// Number of orders
    pub n: u32,
}

/// WebSocket trade data
#[derive(Debug, Clone, Deserialize)]
pub struct WsTradeData {
    pub coin: Ustr,
    pub side: String,
    pub px: String,
    pub sz: String,
    pub time: u64,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub tid: Option<u64>,
    #[serde(default)]
    pub users: Vec<String>, // [buyer, seller]
}

/// WebSocket BBO data
#[derive(Debug, Clone, Deserialize)]
pub struct WsBboData {
    pub coin: Ustr,
    pub time: u64,
    pub bbo: [Option<WsLevelData>; 2], // [bid, ask]
}

/// WebSocket user fills data
#[derive(Debug, Clone, Deserialize)]
pub struct WsUserFillsData {
    #[serde(rename = "isSnapshot")]
    pub is_snapshot: Option<bool>,
    pub user: String,
    pub fills: Vec<Value>,
}

/// User-keyed payload whose remaining fields are passed through untyped.
#[derive(Debug, Clone, Deserialize)]
pub struct WsUserKeyedData {
    pub user: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// WebSocket active asset context data
#[derive(Debug, Clone, Deserialize)]
pub struct WsActiveAssetCtxData {
    pub coin: Ustr,
    pub ctx: Value,
}

/// WebSocket active asset data
#[derive(Debug, Clone, Deserialize)]
pub struct WsActiveAssetData {
    pub user: String,
    pub coin: Ustr,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
