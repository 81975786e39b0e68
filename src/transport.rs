//! Transport seams between the session and the network.
//!
//! The session never touches sockets or HTTP directly.  Request/response calls
//! go through a [`RequestAdapter`]; interactive sessions go through a
//! [`StreamAdapter`], which hands back a [`Connection`].  A connection is one
//! half of a channel pair: the adapter keeps the [`ConnectionDriver`] half and
//! reports lifecycle events through it, while the session owns the
//! [`Connection`] half exclusively.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{STREAM_FRAMES_IN, STREAM_FRAMES_OUT};
use crate::types::{ResponsePayload, UploadAck};

/// Close code for an orderly shutdown.  It is the only code treated as normal.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when a connection ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// A request/response transport.
#[async_trait::async_trait]
pub trait RequestAdapter: Send + Sync {
    /// Sends a query and returns the raw response body.
    async fn ask(&self, query: &str) -> Result<ResponsePayload>;

    /// Uploads a single file.
    async fn upload(&self, file: &Path) -> Result<UploadAck>;
}

/// A persistent bidirectional transport.
pub trait StreamAdapter: Send + Sync {
    /// Starts connecting to `url`.
    ///
    /// The returned connection reports `Open` once the handshake succeeds; a
    /// failed handshake is reported as an `Error` event, never as a panic or a
    /// synchronous error.
    fn connect(&self, url: &Url) -> Connection;
}

/// Close code and reason of a terminated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// The close code.
    pub code: u16,
    /// The close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Creates close information.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// An orderly close initiated by this side.
    pub fn normal() -> Self {
        Self::new(NORMAL_CLOSURE, "")
    }

    /// A connection that vanished without a close frame.
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSURE, "")
    }

    /// Returns true for code 1000.
    pub fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }
}

/// Lifecycle events of one connection, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The handshake completed; frames may now be sent.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The connection closed.  Terminal.
    Closed(CloseInfo),
    /// The connection failed.  Terminal; implies an abnormal close.
    Error(String),
}

impl ConnectionEvent {
    /// Returns true for the events that end a connection.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionEvent::Closed(_) | ConnectionEvent::Error(_))
    }
}

/// Frames the session asks the adapter to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A raw text frame.
    Text(String),
    /// Close the connection with the given code.
    Close(CloseInfo),
}

/// The session's half of a connection.
///
/// Dropping a connection that is still open requests a normal close, so
/// tearing down a session never looks like an abnormal disconnect.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::UnboundedSender<Outbound>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    open: Arc<AtomicBool>,
    finished: bool,
    close_requested: bool,
}

/// The adapter's half of a connection.
#[derive(Debug)]
pub struct ConnectionDriver {
    outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    open: Arc<AtomicBool>,
}

impl Connection {
    /// Creates a connected pair of halves.
    pub fn pair() -> (Connection, ConnectionDriver) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let connection = Connection {
            outbound: outbound_tx,
            events: events_rx,
            open: Arc::clone(&open),
            finished: false,
            close_requested: false,
        };
        let driver = ConnectionDriver {
            outbound: outbound_rx,
            events: events_tx,
            open,
        };
        (connection, driver)
    }

    /// Returns true between `Open` and the terminal event.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns true until the terminal event has been received.
    pub fn is_live(&self) -> bool {
        !self.finished
    }

    /// Sends a raw text frame.
    ///
    /// Fails immediately if the connection is not open.
    pub fn send(&self, text: &str) -> Result<()> {
        if !self.is_open() {
            return Err(Error::not_connected("the interactive connection is not open"));
        }
        self.outbound
            .send(Outbound::Text(text.to_string()))
            .map_err(|_| Error::not_connected("the interactive connection has shut down"))?;
        STREAM_FRAMES_OUT.click();
        Ok(())
    }

    /// Requests an orderly close.  Calling this more than once has no effect.
    pub fn close(&mut self) {
        self.close_with(CloseInfo::normal());
    }

    /// Requests a close with a specific code.
    pub fn close_with(&mut self, info: CloseInfo) {
        if self.close_requested || self.finished {
            return;
        }
        self.close_requested = true;
        let _ = self.outbound.send(Outbound::Close(info));
    }

    /// Waits for the next event.
    ///
    /// A driver that disappears without a terminal event is reported as an
    /// abnormal close.  After the terminal event this returns `None`.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.finished {
            return None;
        }
        let event = match self.events.recv().await {
            Some(event) => event,
            None => ConnectionEvent::Closed(CloseInfo::abnormal()),
        };
        if event.is_terminal() {
            self.finished = true;
            self.open.store(false, Ordering::Release);
        }
        Some(event)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.finished {
            self.close();
        }
    }
}

impl ConnectionDriver {
    /// Reports a completed handshake.
    pub fn opened(&self) {
        self.open.store(true, Ordering::Release);
        self.emit(ConnectionEvent::Open);
    }

    /// Reports an inbound text frame.
    pub fn message(&self, text: impl Into<String>) {
        STREAM_FRAMES_IN.click();
        self.emit(ConnectionEvent::Message(text.into()));
    }

    /// Reports that the connection closed.
    pub fn closed(&self, info: CloseInfo) {
        self.open.store(false, Ordering::Release);
        self.emit(ConnectionEvent::Closed(info));
    }

    /// Reports that the connection failed.
    pub fn failed(&self, detail: impl Into<String>) {
        self.open.store(false, Ordering::Release);
        self.emit(ConnectionEvent::Error(detail.into()));
    }

    /// Waits for the next frame the session wants sent.
    ///
    /// Returns `None` once the session has dropped its half.
    pub async fn next_outbound(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Returns true while the session still holds its half.
    pub fn is_attached(&self) -> bool {
        !self.events.is_closed()
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("connection event dropped; session no longer listening");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_fails_before_open() {
        let (connection, _driver) = Connection::pair();
        let err = connection.send("hello").unwrap_err();
        assert!(err.is_not_connected());
    }

    #[tokio::test]
    async fn events_flow_in_order() {
        let (mut connection, mut driver) = Connection::pair();
        driver.opened();
        driver.message("one");
        driver.message("two");
        driver.closed(CloseInfo::normal());

        assert_eq!(connection.next_event().await, Some(ConnectionEvent::Open));
        assert_eq!(
            connection.next_event().await,
            Some(ConnectionEvent::Message("one".to_string()))
        );
        assert_eq!(
            connection.next_event().await,
            Some(ConnectionEvent::Message("two".to_string()))
        );
        assert_eq!(
            connection.next_event().await,
            Some(ConnectionEvent::Closed(CloseInfo::normal()))
        );
        assert_eq!(connection.next_event().await, None);
        assert!(!connection.is_open());
        assert!(!connection.is_live());

        drop(connection);
        assert_eq!(driver.next_outbound().await, None);
    }

    #[tokio::test]
    async fn send_after_open_reaches_driver() {
        let (mut connection, mut driver) = Connection::pair();
        driver.opened();
        assert_eq!(connection.next_event().await, Some(ConnectionEvent::Open));
        connection.send("What is my car's mileage?").unwrap();
        assert_eq!(
            driver.next_outbound().await,
            Some(Outbound::Text("What is my car's mileage?".to_string()))
        );
    }

    #[tokio::test]
    async fn vanished_driver_is_abnormal_close() {
        let (mut connection, driver) = Connection::pair();
        driver.opened();
        drop(driver);
        assert_eq!(connection.next_event().await, Some(ConnectionEvent::Open));
        assert_eq!(
            connection.next_event().await,
            Some(ConnectionEvent::Closed(CloseInfo::abnormal()))
        );
    }

    #[tokio::test]
    async fn dropping_connection_requests_normal_close() {
        let (connection, mut driver) = Connection::pair();
        driver.opened();
        drop(connection);
        assert_eq!(
            driver.next_outbound().await,
            Some(Outbound::Close(CloseInfo::normal()))
        );
        assert_eq!(driver.next_outbound().await, None);
        assert!(!driver.is_attached());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut connection, mut driver) = Connection::pair();
        driver.opened();
        connection.close();
        connection.close();
        drop(connection);
        assert_eq!(
            driver.next_outbound().await,
            Some(Outbound::Close(CloseInfo::normal()))
        );
        assert_eq!(driver.next_outbound().await, None);
    }
}
