use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{DriverError, DriverResult};

/// A framed, ordered byte channel to the server.
///
/// One call writes exactly one frame and reads frames until its response
/// arrives. Implementations need not be safe for concurrent use.
#[async_trait]
pub trait Transport: Send {
    async fn write_frame(&mut self, frame: Vec<u8>) -> DriverResult<()>;

    async fn read_frame(&mut self) -> DriverResult<Vec<u8>>;

    async fn close(&mut self) -> DriverResult<()>;
}

/// WebSocket transport, one text message per frame.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub async fn connect(endpoint: &Url) -> DriverResult<Self> {
        tracing::debug!("Connecting to {}", endpoint);

        let (stream, _) = connect_async(endpoint.as_str()).await.map_err(|e| {
            DriverError::Connection(format!("Failed to connect to {}: {}", endpoint, e))
        })?;

        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn write_frame(&mut self, frame: Vec<u8>) -> DriverResult<()> {
        let text = String::from_utf8(frame)
            .map_err(|e| DriverError::Protocol(format!("Frame is not UTF-8: {}", e)))?;

        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| DriverError::Connection(format!("Write failed: {}", e)))
    }

    async fn read_frame(&mut self) -> DriverResult<Vec<u8>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => return Ok(text.as_str().as_bytes().to_vec()),
                Ok(Message::Binary(bytes)) => return Ok(bytes.to_vec()),
                Ok(Message::Close(frame)) => {
                    return Err(DriverError::Connection(match frame {
                        Some(f) => format!("Closed by server: {}", f.reason),
                        None => "Closed by server".to_string(),
                    }))
                }
                Ok(_) => continue,
                Err(e) => return Err(DriverError::Connection(format!("Read failed: {}", e))),
            }
        }

        Err(DriverError::Connection("Stream ended".to_string()))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| DriverError::Connection(format!("Close failed: {}", e)))
    }
}
