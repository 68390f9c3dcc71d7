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

//! Per-client mapping from display names to wire coin identifiers.
//!
//! Spot markets are addressed on the wire by their universe name (for example `@107`), while
//! callers usually know them by a `BASE/QUOTE` pair such as `HYPE/USDC`. A [`CoinMap`] holds the
//! translation for one client instance and is populated from the exchange's meta documents.

use dashmap::DashMap;
use serde::Deserialize;
use ustr::Ustr;

use crate::websocket::messages::SubscriptionRequest;

/// Perpetuals universe as returned by the `meta` info request.
#[derive(Debug, Clone, Deserialize)]
pub struct PerpMeta {
    pub universe: Vec<PerpAssetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerpAssetInfo {
    pub name: Ustr,
}

/// Spot universe as returned by the `spotMeta` info request.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotMeta {
    pub universe: Vec<SpotAssetInfo>,
    pub tokens: Vec<SpotTokenInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotAssetInfo {
    pub name: Ustr,
    /// Indices into [`SpotMeta::tokens`] for the base and quote token.
    pub tokens: [usize; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotTokenInfo {
    pub name: Ustr,
}

// Lookup keys fold case the same way topics do
fn key(name: &str) -> Ustr {
    Ustr::from(&name.to_lowercase())
}

/// Name-to-coin lookup owned by a single client.
///
/// Names are matched case-insensitively; the stored coin keeps the exchange's spelling.
#[derive(Debug, Default)]
pub struct CoinMap {
    name_to_coin: DashMap<Ustr, Ustr>,
}

impl CoinMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from the perpetuals and spot meta documents.
    #[must_use]
    pub fn from_meta(perp_meta: &PerpMeta, spot_meta: &SpotMeta) -> Self {
        let map = Self::new();
        map.load_perp_meta(perp_meta);
        map.load_spot_meta(spot_meta);
        map
    }

    /// Loads a perpetuals universe; perp coins are addressed by their own name.
    pub fn load_perp_meta(&self, meta: &PerpMeta) {
        for info in &meta.universe {
            self.name_to_coin.insert(key(&info.name), info.name);
        }
        tracing::debug!("Loaded {} perp coins", meta.universe.len());
    }

    /// Loads a spot universe, registering both the universe name and the `BASE/QUOTE` alias.
    pub fn load_spot_meta(&self, meta: &SpotMeta) {
        for info in &meta.universe {
            self.name_to_coin.insert(key(&info.name), info.name);

            let [base, quote] = info.tokens;
            let (Some(base), Some(quote)) = (meta.tokens.get(base), meta.tokens.get(quote)) else {
                tracing::warn!("Spot asset {} references unknown tokens", info.name);
                continue;
            };

            let pair = key(&format!("{}/{}", base.name, quote.name));
            self.name_to_coin.entry(pair).or_insert(info.name);
        }
        tracing::debug!("Loaded {} spot coins", meta.universe.len());
    }

    /// Registers a single alias.
    pub fn insert(&self, name: &str, coin: &str) {
        self.name_to_coin.insert(key(name), Ustr::from(coin));
    }

    /// Returns the wire coin for `name`, or `name` itself when no mapping exists.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Ustr {
        self.name_to_coin
            .get(&key(name))
            .map_or_else(|| Ustr::from(name), |coin| *coin)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.name_to_coin.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_to_coin.is_empty()
    }

    /// Rewrites the coin of coin-keyed subscriptions to its wire identifier.
    #[must_use]
    pub fn remap(&self, subscription: SubscriptionRequest) -> SubscriptionRequest {
        match subscription {
            SubscriptionRequest::L2Book {
                coin,
                n_sig_figs,
                mantissa,
            } => SubscriptionRequest::L2Book {
                coin: self.resolve(&coin),
                n_sig_figs,
                mantissa,
            },
            SubscriptionRequest::Trades { coin } => SubscriptionRequest::Trades {
                coin: self.resolve(&coin),
            },
            SubscriptionRequest::Bbo { coin } => SubscriptionRequest::Bbo {
                coin: self.resolve(&coin),
            },
            SubscriptionRequest::Candle { coin, interval } => SubscriptionRequest::Candle {
                coin: self.resolve(&coin),
                interval,
            },
            SubscriptionRequest::ActiveAssetCtx { coin } => SubscriptionRequest::ActiveAssetCtx {
                coin: self.resolve(&coin),
            },
            other => other,
        }
    }
}
