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

//! Connection establishment abstraction for dependency injection and testing.
//!
//! The lifecycle never dials sockets itself: it asks a [`WebSocketConnector`] for a split
//! sink/stream pair. Production code uses [`TungsteniteConnector`]; tests can substitute an
//! in-memory connector and drive the frames directly.

use std::fmt::Debug;

use futures_util::{StreamExt, future::BoxFuture};
use http::{HeaderName, HeaderValue};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest},
};

use super::types::{FrameSink, FrameStream};

/// Trait for types that can establish websocket connections.
pub trait WebSocketConnector: Debug + Send + Sync + 'static {
    /// Performs the handshake with `url` and returns the split connection.
    fn connect<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<(FrameSink, FrameStream), tungstenite::Error>>;
}

/// Production connector backed by `tokio-tungstenite`, with TLS for `wss://` URLs.
#[derive(Default, Clone, Copy, Debug)]
pub struct TungsteniteConnector;

impl WebSocketConnector for TungsteniteConnector {
    fn connect<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<(FrameSink, FrameStream), tungstenite::Error>> {
        Box::pin(async move {
            let mut request = url.into_client_request()?;
            let req_headers = request.headers_mut();

            for (key, val) in headers {
                let header_value = HeaderValue::from_str(val)?;
                let header_name: HeaderName = key.parse()?;
                req_headers.insert(header_name, header_value);
            }

            let (stream, _response) = connect_async(request).await?;
            let (writer, reader) = stream.split();
            let sink: FrameSink = Box::pin(writer);
            let stream: FrameStream = Box::pin(reader);
            Ok((sink, stream))
        })
    }
}
