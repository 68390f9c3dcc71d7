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

//! Type definitions for WebSocket operations.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::TransportErrorKind;

/// The write half of a connection, owned by the writer task of one generation.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// The read half of a connection, owned by the reader task of one generation.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

/// Receiver side of the event channel a connection reports to.
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<ConnectionEvent>;

/// Sender side of the event channel a connection reports to.
pub type EventSender = tokio::sync::mpsc::UnboundedSender<ConnectionEvent>;

/// An event reported by one connection generation.
///
/// For every generation that opened, the sequence is one `Open`, any number of `Message` and
/// `Error` events, then exactly one `Close`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The handshake completed.
    Open { generation: u64 },
    /// A data frame arrived.
    Message { generation: u64, data: Bytes },
    /// The transport failed. A `Close` follows.
    Error {
        generation: u64,
        kind: TransportErrorKind,
        message: String,
    },
    /// The connection is gone.
    Close {
        generation: u64,
        code: Option<u16>,
        reason: String,
    },
}

impl ConnectionEvent {
    /// Returns the generation that produced the event.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Open { generation }
            | Self::Message { generation, .. }
            | Self::Error { generation, .. }
            | Self::Close { generation, .. } => *generation,
        }
    }
}

/// Represents a command for the writer task.
#[derive(Debug)]
pub(crate) enum WriterCommand {
    /// Send message to the server.
    Send(Message),
    /// Send a close frame, then release the write half.
    Close { code: u16, reason: String },
}
