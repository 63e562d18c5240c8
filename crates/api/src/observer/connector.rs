//! WebSocket transport for the observer client.
//!
//! The reconnection controller is generic over this connector so its state
//! machine can be exercised with fakes.

use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("connect failed: {0}")]
    Connect(String),
}

/// One established observer connection.
#[async_trait::async_trait]
pub trait ObserverConnection: Send {
    /// Next text message; `None` once the connection closed or errored.
    async fn next_message(&mut self) -> Option<String>;

    /// Close the connection, tolerating transport errors.
    async fn close(&mut self);
}

/// Opens observer connections.
#[async_trait::async_trait]
pub trait ObserverConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn ObserverConnection>, ObserverError>;
}

/// Real connector backed by tokio-tungstenite.
pub struct WsConnector;

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl ObserverConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn ObserverConnection>, ObserverError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|err| ObserverError::Connect(err.to_string()))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

#[async_trait::async_trait]
impl ObserverConnection for WsConnection {
    async fn next_message(&mut self) -> Option<String> {
        use futures_util::StreamExt;

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                // Control frames are handled by the protocol layer.
                Some(Ok(Message::Ping(_)))
                | Some(Ok(Message::Pong(_)))
                | Some(Ok(Message::Binary(_)))
                | Some(Ok(Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
            }
        }
    }

    async fn close(&mut self) {
        use futures_util::SinkExt;
        let _ = self.stream.close(None).await;
    }
}
