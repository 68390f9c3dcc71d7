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

//! Inbound message decoding and fan-out.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use super::{
    messages::HyperliquidWsMessage, registry::SubscriptionRegistry, signals::Signals, topic::Topic,
};
use crate::common::{consts::CONNECTION_BANNER, enums::LogSeverity};

/// What became of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The plain-text connection notice.
    Banner,
    /// Control traffic with no topic (pong, acks, post responses, error notices).
    Control,
    /// The frame could not be decoded.
    Dropped,
    /// No subscriber is registered for the topic.
    Unexpected(Topic),
    /// Delivered to this many callbacks.
    Delivered { topic: Topic, callbacks: usize },
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    registry: Arc<SubscriptionRegistry>,
    signals: Signals,
}

impl MessageRouter {
    #[must_use]
    pub const fn new(registry: Arc<SubscriptionRegistry>, signals: Signals) -> Self {
        Self { registry, signals }
    }

    /// Decodes a frame, returning `None` for the connection banner.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a known channel message.
    pub fn decode(data: &[u8]) -> serde_json::Result<Option<HyperliquidWsMessage>> {
        if data.trim_ascii() == CONNECTION_BANNER.as_bytes() {
            return Ok(None);
        }
        serde_json::from_slice(data).map(Some)
    }

    #[must_use]
    pub fn classify(message: &HyperliquidWsMessage) -> Option<Topic> {
        Topic::from_message(message)
    }

    /// Invokes every callback registered for `topic`, in registration order.
    ///
    /// A panicking callback is logged and does not prevent later callbacks from running. Returns
    /// the number of callbacks invoked.
    pub fn dispatch(&self, topic: &Topic, message: &HyperliquidWsMessage) -> usize {
        let callbacks = self.registry.callbacks_for(topic);
        if callbacks.is_empty() {
            self.signals.log(
                LogSeverity::Warning,
                &format!("Unexpected message for {topic}, no active subscription"),
            );
            return 0;
        }

        for callback in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                self.signals.log(
                    LogSeverity::Error,
                    &format!("Subscriber callback for {topic} panicked"),
                );
            }
        }
        callbacks.len()
    }

    /// Decodes, classifies and dispatches one inbound frame.
    pub fn route(&self, data: &[u8]) -> RouteOutcome {
        let message = match Self::decode(data) {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!("Received connection banner");
                return RouteOutcome::Banner;
            }
            Err(e) => {
                self.signals.log(
                    LogSeverity::Warning,
                    &format!(
                        "Dropping undecodable message ({e}): {}",
                        String::from_utf8_lossy(data)
                    ),
                );
                return RouteOutcome::Dropped;
            }
        };

        let Some(topic) = Self::classify(&message) else {
            match &message {
                HyperliquidWsMessage::Error { data } => {
                    self.signals
                        .log(LogSeverity::Warning, &format!("Server error: {data}"));
                }
                HyperliquidWsMessage::Trades { .. } => {
                    tracing::trace!("Empty trades batch");
                }
                other => tracing::trace!("Control message on {}", other.channel()),
            }
            return RouteOutcome::Control;
        };

        match self.dispatch(&topic, &message) {
            0 => RouteOutcome::Unexpected(topic),
            callbacks => RouteOutcome::Delivered { topic, callbacks },
        }
    }
}
