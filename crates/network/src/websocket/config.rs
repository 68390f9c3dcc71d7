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

//! Configuration for WebSocket client connections.

use std::time::Duration;

/// Default bound on the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for a heartbeat task to acknowledge a stop request.
pub const DEFAULT_HEARTBEAT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for WebSocket client connections.
#[derive(Clone, Debug)]
pub struct WebSocketConfig {
    /// The URL to connect to.
    pub url: String,
    /// The default headers.
    pub headers: Vec<(String, String)>,
    /// The optional heartbeat interval (seconds).
    pub heartbeat: Option<u64>,
    /// The optional heartbeat message. `None` sends a websocket ping frame.
    pub heartbeat_msg: Option<String>,
    /// The bounded wait when stopping a heartbeat task.
    pub heartbeat_stop_timeout: Duration,
    /// The bound on the opening handshake.
    pub connect_timeout: Duration,
}

impl WebSocketConfig {
    /// Creates a configuration for `url` with default timeouts and no heartbeat.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            heartbeat: None,
            heartbeat_msg: None,
            heartbeat_stop_timeout: DEFAULT_HEARTBEAT_STOP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Returns the heartbeat interval, if one is configured and non-zero.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
