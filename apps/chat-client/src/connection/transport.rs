//! Transport seam and the WebSocket implementation.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ClientError;

use super::events::{ConnectionEvent, EventSink};

/// Drives a single connection attempt.
///
/// An implementation reports `Opened` once the link is usable, forwards every
/// inbound text frame as `Frame`, writes each string received on `outbound`
/// as a text frame, and finishes with `Closed` or `Failed`. Returning from
/// `run` ends the attempt; the manager treats a silent return as a close.
/// When `outbound` is closed the link should be shut down gracefully.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn run(&self, url: String, outbound: mpsc::UnboundedReceiver<String>, events: EventSink);
}

/// `tokio-tungstenite` backed connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

impl WsConnector {
    async fn open(url: &str) -> Result<WsStream, ClientError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(stream)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn run(
        &self,
        url: String,
        mut outbound: mpsc::UnboundedReceiver<String>,
        events: EventSink,
    ) {
        let stream = match Self::open(&url).await {
            Ok(stream) => stream,
            Err(err) => {
                events.emit(ConnectionEvent::Failed(err.to_string()));
                return;
            }
        };

        if !events.emit(ConnectionEvent::Opened) {
            return;
        }

        let (mut ws_tx, mut ws_rx) = stream.split();

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    match frame {
                        Some(text) => {
                            if let Err(err) = ws_tx.send(Message::Text(text.into())).await {
                                let err = ClientError::from(err);
                                events.emit(ConnectionEvent::Failed(err.to_string()));
                                break;
                            }
                        }
                        None => {
                            // Client dropped its sender: close politely.
                            let _ = ws_tx.send(Message::Close(None)).await;
                            events.emit(ConnectionEvent::Closed {
                                reason: Some("client shutdown".to_string()),
                            });
                            break;
                        }
                    }
                }

                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !events.emit(ConnectionEvent::Frame(text.as_str().to_owned())) {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            events.emit(ConnectionEvent::Closed {
                                reason: frame.map(|f| f.reason.as_str().to_owned()),
                            });
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            let err = ClientError::from(err);
                            events.emit(ConnectionEvent::Failed(err.to_string()));
                            break;
                        }
                        None => {
                            events.emit(ConnectionEvent::Closed { reason: None });
                            break;
                        }
                    }
                }
            }
        }
    }
}
