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

//! Hooks a host application can install to observe the client.

use std::{fmt::Debug, sync::Arc};

use crate::common::enums::LogSeverity;

pub type ConnectivityLostHandler = Arc<dyn Fn(&str) + Send + Sync>;
pub type LogHandler = Arc<dyn Fn(&str, LogSeverity) + Send + Sync>;

/// Collaborator callbacks for connectivity loss and diagnostics.
///
/// Every diagnostic is emitted as a `tracing` event first; the log handler, when set, receives
/// the same text.
#[derive(Clone, Default)]
pub struct Signals {
    on_connectivity_lost: Option<ConnectivityLostHandler>,
    on_log: Option<LogHandler>,
}

impl Debug for Signals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Signals))
            .field("on_connectivity_lost", &self.on_connectivity_lost.is_some())
            .field("on_log", &self.on_log.is_some())
            .finish()
    }
}

impl Signals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_connectivity_lost<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_connectivity_lost = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_log<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, LogSeverity) + Send + Sync + 'static,
    {
        self.on_log = Some(Arc::new(handler));
        self
    }

    pub fn log(&self, severity: LogSeverity, message: &str) {
        match severity {
            LogSeverity::Debug => tracing::debug!("{message}"),
            LogSeverity::Info => tracing::info!("{message}"),
            LogSeverity::Warning => tracing::warn!("{message}"),
            LogSeverity::Error => tracing::error!("{message}"),
        }

        if let Some(handler) = &self.on_log {
            handler(message, severity);
        }
    }

    pub fn connectivity_lost(&self, reason: &str) {
        tracing::error!("Connectivity lost: {reason}");
        if let Some(handler) = &self.on_connectivity_lost {
            handler(reason);
        }
    }
}
