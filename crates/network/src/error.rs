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

//! Error types and failure classification for socket connections.
//!
//! Every transport fault is mapped to a [`TransportErrorKind`]. All kinds except
//! [`TransportErrorKind::StopRequested`] are transient: the connection is torn down and the owner
//! is expected to reconnect.

use std::{io, time::Duration};

use strum::{AsRefStr, Display};
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::state::ConnectionState;

/// Close codes treated as a normal closure (RFC 6455 `Normal` and `Away`).
pub const NORMAL_CLOSE_CODES: [u16; 2] = [1000, 1001];

/// Returns true if `code` is a normal closure; a missing code is abnormal.
#[must_use]
pub fn is_normal_close(code: Option<u16>) -> bool {
    code.is_some_and(|c| NORMAL_CLOSE_CODES.contains(&c))
}

/// Classification of a transport failure.
#[derive(Clone, Copy, Debug, Display, AsRefStr, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum TransportErrorKind {
    /// The peer reset or aborted the connection.
    Reset,
    /// An operation did not complete in time.
    Timeout,
    /// The stream ended without a close frame.
    Eof,
    /// The host name could not be resolved.
    Dns,
    /// The server answered the upgrade request with a non-101 status.
    HandshakeStatus,
    /// The TLS layer failed.
    Tls,
    /// The peer violated the websocket protocol.
    Protocol,
    /// Any other I/O failure.
    Io,
    /// The owner asked the connection to stop.
    StopRequested,
}

impl TransportErrorKind {
    /// Returns true if the failure should be recovered by reconnecting.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::StopRequested)
    }

    /// Classifies a websocket error.
    #[must_use]
    pub fn classify(error: &tungstenite::Error) -> Self {
        match error {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => Self::Eof,
            tungstenite::Error::Io(e) => Self::classify_io(e),
            tungstenite::Error::Http(_) => Self::HandshakeStatus,
            tungstenite::Error::Tls(_) => Self::Tls,
            _ => Self::Protocol,
        }
    }

    /// Classifies an I/O error.
    #[must_use]
    pub fn classify_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => Self::Reset,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::UnexpectedEof => Self::Eof,
            _ if is_dns_failure(error) => Self::Dns,
            _ => Self::Io,
        }
    }
}

// Resolver failures surface as uncategorized I/O errors, only the message identifies them
fn is_dns_failure(error: &io::Error) -> bool {
    let message = error.to_string().to_lowercase();
    message.contains("lookup") || message.contains("resolve") || message.contains("name or service")
}

/// Failure to establish a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("Connection failed ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },
    #[error("Connection cancelled")]
    Cancelled,
}

impl ConnectError {
    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Timeout(_) => TransportErrorKind::Timeout,
            Self::Transport { kind, .. } => *kind,
            Self::Cancelled => TransportErrorKind::StopRequested,
        }
    }
}

impl From<tungstenite::Error> for ConnectError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Transport {
            kind: TransportErrorKind::classify(&error),
            message: error.to_string(),
        }
    }
}

/// Failure to hand a frame to the transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Connection is not open (state {0})")]
    NotOpen(ConnectionState),
    #[error("Connection writer has closed")]
    Closed,
}
