//! Duplex text-frame transport to the device producer.
//!
//! The session only needs "open a link for this device, send text, receive
//! text, close". [`Transport`] captures exactly that so the reconnect logic can
//! be driven by an in-memory script in tests, while [`WebSocketTransport`]
//! speaks to a real producer.

use crate::error::{AppResult, PerfError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

/// Opens links to a producer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a link streaming the given device.
    async fn connect(&self, device_id: &str) -> AppResult<Box<dyn Connection>>;
}

/// One open link.
#[async_trait]
pub trait Connection: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> AppResult<()>;

    /// Next text frame. `None` once the peer has closed the link.
    async fn recv(&mut self) -> Option<AppResult<String>>;

    /// Close the link. Errors on an already dead link may be ignored.
    async fn close(&mut self) -> AppResult<()>;
}

/// WebSocket transport connecting to `{server_url}/ws/monitor/{device_id}`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    base: Url,
}

impl WebSocketTransport {
    /// Create a transport for a `ws://` or `wss://` base URL.
    pub fn new(server_url: &str) -> AppResult<Self> {
        let base = Url::parse(server_url).map_err(|e| {
            PerfError::Configuration(format!("Invalid server_url '{server_url}': {e}"))
        })?;
        if !matches!(base.scheme(), "ws" | "wss") {
            return Err(PerfError::Configuration(format!(
                "Unsupported server_url scheme '{}'. Use ws:// or wss://",
                base.scheme()
            )));
        }
        Ok(Self { base })
    }

    /// Endpoint URL for a device. The device id is percent-encoded as one path segment.
    pub fn endpoint(&self, device_id: &str) -> AppResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PerfError::Configuration(format!("server_url '{}' cannot be a base", self.base))
            })?
            .pop_if_empty()
            .extend(["ws", "monitor", device_id]);
        Ok(url)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, device_id: &str) -> AppResult<Box<dyn Connection>> {
        let url = self.endpoint(device_id)?;
        tracing::debug!(%url, "Opening WebSocket");
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

/// An open WebSocket link.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send(&mut self, frame: String) -> AppResult<()> {
        self.stream.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<AppResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => tracing::debug!(error = %e, "Dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Peer sent close frame");
                    return None;
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> AppResult<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) => match PerfError::from(e) {
                PerfError::ConnectionClosed => Ok(()),
                other => Err(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout() {
        let transport = WebSocketTransport::new("ws://127.0.0.1:8000").unwrap();
        assert_eq!(
            transport.endpoint("emulator-5554").unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/monitor/emulator-5554"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let transport = WebSocketTransport::new("wss://lab.example.com/perf/").unwrap();
        assert_eq!(
            transport.endpoint("R58M123").unwrap().as_str(),
            "wss://lab.example.com/perf/ws/monitor/R58M123"
        );
    }

    #[test]
    fn test_endpoint_encodes_device_id() {
        let transport = WebSocketTransport::new("ws://localhost:8000").unwrap();
        let url = transport.endpoint("192.168.1.20:5555/x").unwrap();
        assert_eq!(url.path(), "/ws/monitor/192.168.1.20:5555%2Fx");
    }

    #[test]
    fn test_rejects_http() {
        assert!(matches!(
            WebSocketTransport::new("http://localhost:8000"),
            Err(PerfError::Configuration(_))
        ));
        assert!(WebSocketTransport::new("not a url").is_err());
    }
}
