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

use std::sync::atomic::{AtomicU8, Ordering};

use strum::{AsRefStr, Display, EnumString};

/// State of one physical connection.
///
/// Transitions run `Connecting -> Open -> (Closing | Failed) -> Closed` and are stored in an
/// atomic owned by the connection lifecycle.
#[derive(Clone, Copy, Debug, Default, Display, Hash, PartialEq, Eq, AsRefStr, EnumString)]
#[repr(u8)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConnectionState {
    /// The handshake is in progress.
    Connecting = 0,
    /// The handshake completed and frames may be sent.
    Open = 1,
    /// A graceful close was requested locally.
    Closing = 2,
    /// The connection hit a transport error and is being torn down.
    Failed = 3,
    /// The socket is released. No further events will be produced for this generation.
    #[default]
    Closed = 4,
}

impl ConnectionState {
    /// Convert a u8 to [`ConnectionState`], useful when loading from an `AtomicU8`.
    ///
    /// Unknown values map to [`ConnectionState::Closed`].
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            3 => Self::Failed,
            _ => Self::Closed,
        }
    }

    #[inline]
    pub fn from_atomic(value: &AtomicU8) -> Self {
        Self::from_u8(value.load(Ordering::SeqCst))
    }

    /// Convert a [`ConnectionState`] to a u8, useful when storing to an `AtomicU8`.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the connection is being torn down or already closed.
    #[inline]
    #[must_use]
    pub const fn is_terminating(&self) -> bool {
        matches!(self, Self::Closing | Self::Failed | Self::Closed)
    }

    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ConnectionState::Connecting)]
    #[case(ConnectionState::Open)]
    #[case(ConnectionState::Closing)]
    #[case(ConnectionState::Failed)]
    #[case(ConnectionState::Closed)]
    fn test_atomic_storage(#[case] state: ConnectionState) {
        let atomic = AtomicU8::new(state.as_u8());
        assert_eq!(ConnectionState::from_atomic(&atomic), state);
    }

    #[rstest]
    fn test_unknown_value_is_closed() {
        assert_eq!(ConnectionState::from_u8(42), ConnectionState::Closed);
    }

    #[rstest]
    fn test_display_and_parse() {
        assert_eq!(ConnectionState::Open.to_string(), "OPEN");
        assert_eq!(
            ConnectionState::from_str("FAILED").unwrap(),
            ConnectionState::Failed
        );
    }

    #[rstest]
    #[case(ConnectionState::Connecting, false)]
    #[case(ConnectionState::Open, false)]
    #[case(ConnectionState::Closing, true)]
    #[case(ConnectionState::Failed, true)]
    #[case(ConnectionState::Closed, true)]
    fn test_is_terminating(#[case] state: ConnectionState, #[case] expected: bool) {
        assert_eq!(state.is_terminating(), expected);
    }
}
