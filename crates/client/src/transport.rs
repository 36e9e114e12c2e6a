//! Transport boundary: a message-oriented duplex channel.
//!
//! The connection owns both halves. The write half is shared behind a lock
//! so any endpoint may send; the read half belongs exclusively to the
//! reader loop.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("transport closed")]
    Closed,
}

/// Write half of the transport.
#[async_trait]
pub trait TransportTx: Send {
    async fn send(&mut self, message: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of the transport; `Ok(None)` means the peer closed cleanly.
#[async_trait]
pub trait TransportRx: Send {
    async fn receive(&mut self) -> Result<Option<String>, TransportError>;
}

/// Transport tuning knobs.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum inbound message size in bytes. Screenshot and snapshot
    /// results are large base64 blobs; they must not be truncated.
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1 << 24,
        }
    }
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct WebSocketTx {
    sink: WsSink,
}

pub struct WebSocketRx {
    stream: WsStream,
}

/// Open a WebSocket to a DevTools endpoint and split it into halves.
pub async fn connect(
    url: &str,
    config: &TransportConfig,
) -> Result<(WebSocketTx, WebSocketRx), TransportError> {
    let parsed = Url::parse(url).map_err(|error| TransportError::InvalidUrl(error.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme {other:?}"
            )))
        }
    }

    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);
    ws_config.max_frame_size = Some(config.max_message_size);

    let (stream, _) = connect_async_with_config(parsed.as_str(), Some(ws_config), false).await?;
    let (sink, stream) = stream.split();
    Ok((WebSocketTx { sink }, WebSocketRx { stream }))
}

#[async_trait]
impl TransportTx for WebSocketTx {
    async fn send(&mut self, message: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(message))
            .await
            .map_err(TransportError::from)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(TransportError::from)
    }
}

#[async_trait]
impl TransportRx for WebSocketRx {
    async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Close(_) => return Ok(None),
                // DevTools endpoints only speak text; pings are answered by
                // tungstenite during the read.
                _ => continue,
            }
        }
        Ok(None)
    }
}
