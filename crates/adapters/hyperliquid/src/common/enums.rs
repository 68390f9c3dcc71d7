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

use std::env;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Represents the network configuration for Hyperliquid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum HyperliquidNetwork {
    #[default]
    Mainnet,
    #[strum(to_string = "testnet", serialize = "test")]
    Testnet,
}

impl HyperliquidNetwork {
    /// Loads network from environment variable `HYPERLIQUID_NET`.
    ///
    /// Defaults to `Mainnet` if not set or invalid.
    #[must_use]
    pub fn from_env() -> Self {
        env::var("HYPERLIQUID_NET")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Severity attached to diagnostics forwarded to a host log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
}
