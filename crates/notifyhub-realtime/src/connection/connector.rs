//! Physical connection seam and its WebSocket implementation.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use notifyhub_core::error::ErrorKind;
use notifyhub_core::{AppError, AppResult};

/// One open text-frame connection.
#[async_trait]
pub trait Socket: Send {
    /// Write a text frame.
    async fn send_text(&mut self, text: String) -> AppResult<()>;

    /// Next inbound text frame. `None` means the peer closed the connection.
    ///
    /// Must be cancel-safe: the driver polls it inside `select!`.
    async fn next_text(&mut self) -> Option<AppResult<String>>;

    /// Close the connection, ignoring errors.
    async fn close(&mut self);
}

/// Opens sockets to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish one connection to `url`.
    async fn connect(&self, url: &str) -> AppResult<Box<dyn Socket>>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> AppResult<Box<dyn Socket>> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(map_connect_error)?;
        tracing::debug!("WebSocket handshake completed ({})", response.status());
        Ok(Box::new(WsSocket { stream }))
    }
}

/// Socket over a tungstenite stream.
pub struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for WsSocket {
    async fn send_text(&mut self, text: String) -> AppResult<()> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transport,
                    format!("WebSocket send failed: {e}"),
                    e,
                )
            })
    }

    async fn next_text(&mut self) -> Option<AppResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::debug!("Ignoring non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!("Received close frame: {:?}", frame);
                    return None;
                }
                // Pongs are answered by tungstenite itself.
                Ok(_) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    return Some(Err(AppError::connection("Connection reset by peer")));
                }
                Err(e) => {
                    return Some(Err(AppError::with_source(
                        ErrorKind::Transport,
                        format!("WebSocket read failed: {e}"),
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::trace!("Close handshake failed: {}", e);
        }
    }
}

fn map_connect_error(err: WsError) -> AppError {
    match &err {
        WsError::Http(response)
            if response.status() == StatusCode::UNAUTHORIZED
                || response.status() == StatusCode::FORBIDDEN =>
        {
            let status = response.status();
            AppError::with_source(
                ErrorKind::Authentication,
                format!("Endpoint rejected credential ({status})"),
                err,
            )
        }
        _ => AppError::with_source(
            ErrorKind::Connection,
            format!("Failed to connect: {err}"),
            err,
        ),
    }
}
