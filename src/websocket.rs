//! Websocket implementation of [`StreamAdapter`].

use std::borrow::Cow;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use crate::transport::{CloseInfo, Connection, ConnectionDriver, Outbound, StreamAdapter};

/// How long to wait for the peer to acknowledge a close we initiated.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reported when the peer's close frame carries no status code.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Opens interactive sessions over websockets.
///
/// Each call to [`StreamAdapter::connect`] spawns one I/O task on the current
/// tokio runtime.  The task owns the socket; the session talks to it only
/// through the returned [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct WebSocketAdapter;

impl WebSocketAdapter {
    /// Creates a new adapter.
    pub fn new() -> Self {
        Self
    }
}

impl StreamAdapter for WebSocketAdapter {
    fn connect(&self, url: &Url) -> Connection {
        let (connection, driver) = Connection::pair();
        tokio::spawn(run_socket(url.clone(), driver));
        connection
    }
}

async fn run_socket(url: Url, mut driver: ConnectionDriver) {
    tracing::info!(%url, "opening interactive connection");
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(err) => {
            tracing::warn!(%url, error = %err, "interactive connection failed");
            driver.failed(format!("Failed to connect to {url}: {err}"));
            return;
        }
    };
    tracing::info!(%url, "interactive connection open");
    driver.opened();

    let (mut sink, mut stream) = socket.split();
    let close = loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => driver.message(text),
                    Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => driver.message(text),
                        Err(_) => tracing::warn!("dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        let info = frame
                            .map(close_info)
                            .unwrap_or_else(|| CloseInfo::new(NO_STATUS_RECEIVED, ""));
                        tracing::info!(code = info.code, reason = %info.reason, "peer closed interactive connection");
                        driver.closed(info);
                        acknowledge_close(&mut sink, &mut stream).await;
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "interactive connection error");
                        driver.failed(format!("Connection error occurred: {err}"));
                        return;
                    }
                    None => {
                        driver.closed(CloseInfo::abnormal());
                        return;
                    }
                }
            }
            outbound = driver.next_outbound() => {
                match outbound {
                    Some(Outbound::Text(text)) => {
                        if let Err(err) = sink.send(WsMessage::Text(text)).await {
                            tracing::warn!(error = %err, "failed to send frame");
                            driver.failed(format!("Connection error occurred: {err}"));
                            return;
                        }
                    }
                    Some(Outbound::Close(info)) => break info,
                    None => break CloseInfo::normal(),
                }
            }
        }
    };

    tracing::info!(code = close.code, "closing interactive connection");
    let frame = CloseFrame {
        code: CloseCode::from(close.code),
        reason: Cow::Owned(close.reason.clone()),
    };
    if let Err(err) = sink.send(WsMessage::Close(Some(frame))).await {
        tracing::debug!(error = %err, "close frame not delivered");
        driver.closed(close);
        return;
    }

    let deadline = tokio::time::sleep(CLOSE_TIMEOUT);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => driver.message(text),
                    Some(Ok(WsMessage::Close(peer))) => {
                        driver.closed(peer.map(close_info).unwrap_or(close));
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => {
                        driver.closed(close);
                        return;
                    }
                }
            }
            _ = &mut deadline => {
                tracing::debug!("peer did not acknowledge close in time");
                driver.closed(close);
                return;
            }
        }
    }
}

/// Sends the reply tungstenite queued for the peer's close frame, then waits
/// for the peer to drop the socket.
async fn acknowledge_close<S, T>(sink: &mut S, stream: &mut T)
where
    S: futures::Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
    T: futures::Stream + Unpin,
{
    if let Err(err) = sink.flush().await {
        tracing::debug!(error = %err, "close reply not delivered");
        return;
    }
    let drained = tokio::time::timeout(CLOSE_TIMEOUT, async {
        while stream.next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::debug!("peer kept the socket open after closing");
    }
}

fn close_info(frame: CloseFrame<'_>) -> CloseInfo {
    CloseInfo::new(u16::from(frame.code), frame.reason.into_owned())
}
