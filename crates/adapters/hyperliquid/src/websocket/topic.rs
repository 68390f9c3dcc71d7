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

//! Routing identity shared by outbound subscriptions and inbound messages.
//!
//! A subscription and the messages the server publishes for it must produce the same [`Topic`].
//! Coins and user addresses are folded to lowercase when a topic is built, so `BTC` and `btc`
//! address the same stream. Candle intervals are kept verbatim (`1m` and `1M` differ).

use std::fmt::Display;

use ustr::Ustr;

use super::messages::{HyperliquidWsMessage, SubscriptionRequest};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    AllMids,
    L2Book { coin: Ustr },
    Trades { coin: Ustr },
    Bbo { coin: Ustr },
    Candle { coin: Ustr, interval: Ustr },
    ActiveAssetCtx { coin: Ustr },
    ActiveAssetData { coin: Ustr, user: Ustr },
    UserEvents,
    OrderUpdates,
    Notification,
    UserFills { user: Ustr },
    UserFundings { user: Ustr },
    UserNonFundingLedgerUpdates { user: Ustr },
    WebData2 { user: Ustr },
    UserTwapSliceFills { user: Ustr },
    UserTwapHistory { user: Ustr },
}

fn fold(value: &str) -> Ustr {
    Ustr::from(&value.to_ascii_lowercase())
}

impl Topic {
    #[must_use]
    pub fn l2_book(coin: &str) -> Self {
        Self::L2Book { coin: fold(coin) }
    }

    #[must_use]
    pub fn trades(coin: &str) -> Self {
        Self::Trades { coin: fold(coin) }
    }

    #[must_use]
    pub fn bbo(coin: &str) -> Self {
        Self::Bbo { coin: fold(coin) }
    }

    #[must_use]
    pub fn candle(coin: &str, interval: &str) -> Self {
        Self::Candle {
            coin: fold(coin),
            interval: Ustr::from(interval),
        }
    }

    #[must_use]
    pub fn active_asset_ctx(coin: &str) -> Self {
        Self::ActiveAssetCtx { coin: fold(coin) }
    }

    #[must_use]
    pub fn active_asset_data(coin: &str, user: &str) -> Self {
        Self::ActiveAssetData {
            coin: fold(coin),
            user: fold(user),
        }
    }

    #[must_use]
    pub fn user_fills(user: &str) -> Self {
        Self::UserFills { user: fold(user) }
    }

    #[must_use]
    pub fn user_fundings(user: &str) -> Self {
        Self::UserFundings { user: fold(user) }
    }

    #[must_use]
    pub fn user_non_funding_ledger_updates(user: &str) -> Self {
        Self::UserNonFundingLedgerUpdates { user: fold(user) }
    }

    #[must_use]
    pub fn web_data2(user: &str) -> Self {
        Self::WebData2 { user: fold(user) }
    }

    #[must_use]
    pub fn user_twap_slice_fills(user: &str) -> Self {
        Self::UserTwapSliceFills { user: fold(user) }
    }

    #[must_use]
    pub fn user_twap_history(user: &str) -> Self {
        Self::UserTwapHistory { user: fold(user) }
    }

    /// Returns the topic an inbound message is published under.
    ///
    /// Control traffic (pong, acks, post responses, error notices) and empty trade batches have
    /// no topic.
    #[must_use]
    pub fn from_message(message: &HyperliquidWsMessage) -> Option<Self> {
        let topic = match message {
            HyperliquidWsMessage::SubscriptionResponse { .. }
            | HyperliquidWsMessage::Post { .. }
            | HyperliquidWsMessage::Error { .. }
            | HyperliquidWsMessage::Pong => return None,
            HyperliquidWsMessage::AllMids { .. } => Self::AllMids,
            HyperliquidWsMessage::Notification { .. } => Self::Notification,
            HyperliquidWsMessage::WebData2 { data } => Self::web_data2(&data.user),
            HyperliquidWsMessage::Candle { data } => Self::candle(&data.s, &data.i),
            HyperliquidWsMessage::L2Book { data } => Self::l2_book(&data.coin),
            HyperliquidWsMessage::Trades { data } => Self::trades(&data.first()?.coin),
            HyperliquidWsMessage::OrderUpdates { .. } => Self::OrderUpdates,
            HyperliquidWsMessage::UserEvents { .. } => Self::UserEvents,
            HyperliquidWsMessage::UserFills { data } => Self::user_fills(&data.user),
            HyperliquidWsMessage::UserFundings { data } => Self::user_fundings(&data.user),
            HyperliquidWsMessage::UserNonFundingLedgerUpdates { data } => {
                Self::user_non_funding_ledger_updates(&data.user)
            }
            HyperliquidWsMessage::ActiveAssetCtx { data } => Self::active_asset_ctx(&data.coin),
            HyperliquidWsMessage::ActiveAssetData { data } => {
                Self::active_asset_data(&data.coin, &data.user)
            }
            HyperliquidWsMessage::UserTwapSliceFills { data } => {
                Self::user_twap_slice_fills(&data.user)
            }
            HyperliquidWsMessage::UserTwapHistory { data } => Self::user_twap_history(&data.user),
            HyperliquidWsMessage::Bbo { data } => Self::bbo(&data.coin),
        };
        Some(topic)
    }
}

impl From<&SubscriptionRequest> for Topic {
    fn from(subscription: &SubscriptionRequest) -> Self {
        match subscription {
            SubscriptionRequest::AllMids { .. } => Self::AllMids,
            SubscriptionRequest::Notification { .. } => Self::Notification,
            SubscriptionRequest::WebData2 { user } => Self::web_data2(user),
            SubscriptionRequest::Candle { coin, interval } => Self::candle(coin, interval),
            SubscriptionRequest::L2Book { coin, .. } => Self::l2_book(coin),
            SubscriptionRequest::Trades { coin } => Self::trades(coin),
            SubscriptionRequest::OrderUpdates { .. } => Self::OrderUpdates,
            SubscriptionRequest::UserEvents { .. } => Self::UserEvents,
            SubscriptionRequest::UserFills { user, .. } => Self::user_fills(user),
            SubscriptionRequest::UserFundings { user } => Self::user_fundings(user),
            SubscriptionRequest::UserNonFundingLedgerUpdates { user } => {
                Self::user_non_funding_ledger_updates(user)
            }
            SubscriptionRequest::ActiveAssetCtx { coin } => Self::active_asset_ctx(coin),
            SubscriptionRequest::ActiveAssetData { user, coin } => {
                Self::active_asset_data(coin, user)
            }
            SubscriptionRequest::UserTwapSliceFills { user } => Self::user_twap_slice_fills(user),
            SubscriptionRequest::UserTwapHistory { user } => Self::user_twap_history(user),
            SubscriptionRequest::Bbo { coin } => Self::bbo(coin),
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllMids => write!(f, "allMids"),
            Self::L2Book { coin } => write!(f, "l2Book:{coin}"),
            Self::Trades { coin } => write!(f, "trades:{coin}"),
            Self::Bbo { coin } => write!(f, "bbo:{coin}"),
            Self::Candle { coin, interval } => write!(f, "candle:{coin},{interval}"),
            Self::ActiveAssetCtx { coin } => write!(f, "activeAssetCtx:{coin}"),
            Self::ActiveAssetData { coin, user } => write!(f, "activeAssetData:{coin},{user}"),
            Self::UserEvents => write!(f, "userEvents"),
            Self::OrderUpdates => write!(f, "orderUpdates"),
            Self::Notification => write!(f, "notification"),
            Self::UserFills { user } => write!(f, "userFills:{user}"),
            Self::UserFundings { user } => write!(f, "userFundings:{user}"),
            Self::UserNonFundingLedgerUpdates { user } => {
                write!(f, "userNonFundingLedgerUpdates:{user}")
            }
            Self::WebData2 { user } => write!(f, "webData2:{user}"),
            Self::UserTwapSliceFills { user } => write!(f, "userTwapSliceFills:{user}"),
            Self::UserTwapHistory { user } => write!(f, "userTwapHistory:{user}"),
        }
    }
}
