// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite, MaybeTlsStream, WebSocketStream};

use crate::errors::GatewayError;

#[derive(Debug, Clone)]
pub struct WebSocketBackend;

// These could be made into inherent associated types when that's stabilized
pub type Sink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, tungstenite::Message>;
pub type Stream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

impl WebSocketBackend {
    pub async fn connect(websocket_url: &str) -> Result<(Sink, Stream), GatewayError> {
        let (websocket_stream, _) = match connect_async_tls_with_config(
            websocket_url,
            None,
            false,
            None,
        )
        .await
        {
            Ok(websocket_stream) => websocket_stream,
            Err(e) => {
                return Err(GatewayError::CannotConnect {
                    error: format!("{:?}", e),
                })
            }
        };

        Ok(futures_util::StreamExt::split(websocket_stream))
    }
}
