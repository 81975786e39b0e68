//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct, which owns the message
//! timeline, the current mode and the interactive connection, and applies
//! transport events to them one at a time.
//!
//! The session never blocks on the network.  `send` and `upload` spawn their
//! requests onto the tokio runtime; each request posts a [`SessionEvent`] back
//! into the session's queue when it completes.  The caller drives the session
//! by awaiting [`ChatSession::next_event`] and handing the result to
//! [`ChatSession::handle_event`], or by calling [`ChatSession::process_next`]
//! which does both.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use crate::chat::config::ChatConfig;
use crate::chat::supervisor::{self, ConnectionStatus, Supervisor};
use crate::client::Backend;
use crate::error::{Error, Result};
use crate::normalize::{Normalized, NormalizedEntry, normalize};
use crate::observability::{
    ASK_ESCALATIONS, SOURCES_EXTRACTED, STREAM_ABNORMAL_CLOSES, STREAM_NORMAL_CLOSES,
    STREAM_SEND_ERRORS, TIMELINE_APPENDS,
};
use crate::observer::{Notice, SessionObserver};
use crate::transport::{
    CloseInfo, Connection, ConnectionEvent, RequestAdapter, StreamAdapter,
};
use crate::types::{
    Citation, Content, Message, ResponsePayload, Role, SelectionOption, UploadAck,
};
use crate::utils::time::MonotonicClock;
use crate::websocket::WebSocketAdapter;

/// How long [`ChatSession::shutdown`] waits for the peer to confirm a close.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The protocol mode of a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// One request, one reply.
    Stateless,
    /// Escalation received; waiting for the interactive connection to open.
    Connecting,
    /// Messages flow over the interactive connection.
    Interactive,
}

/// A completion posted into the session's queue.
#[derive(Debug)]
pub enum SessionEvent {
    /// An ask request finished.
    AskCompleted(Result<ResponsePayload>),
    /// An upload finished.
    UploadCompleted {
        /// Name of the uploaded file, for the confirmation message.
        file_name: String,
        /// The outcome.
        result: Result<UploadAck>,
    },
    /// The interactive connection reported something.
    Connection(ConnectionEvent),
}

/// A chat session that mediates between the user and the backend.
pub struct ChatSession {
    requests: Arc<dyn RequestAdapter>,
    streams: Arc<dyn StreamAdapter>,
    stream_url: Url,
    timeline: Vec<Message>,
    mode: Mode,
    in_flight: usize,
    awaiting_agent_reply: bool,
    connection_error: Option<String>,
    connection: Option<Connection>,
    outbox: VecDeque<String>,
    conversation_started: bool,
    sources: Vec<Citation>,
    observers: Vec<Arc<dyn SessionObserver>>,
    supervisor: Supervisor,
    clock: MonotonicClock,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl ChatSession {
    /// Creates a session over the given transports.
    pub fn new(
        requests: Arc<dyn RequestAdapter>,
        streams: Arc<dyn StreamAdapter>,
        stream_url: Url,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            requests,
            streams,
            stream_url,
            timeline: Vec::new(),
            mode: Mode::Stateless,
            in_flight: 0,
            awaiting_agent_reply: false,
            connection_error: None,
            connection: None,
            outbox: VecDeque::new(),
            conversation_started: false,
            sources: Vec::new(),
            observers: Vec::new(),
            supervisor: Supervisor::new(),
            clock: MonotonicClock::new(),
            events_tx,
            events_rx,
        }
    }

    /// Creates a session that talks HTTP and websockets to the configured
    /// endpoints.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let endpoints = config.resolve_endpoints()?;
        let stream_url = endpoints.stream.clone();
        let backend = Backend::with_options(endpoints, Some(config.timeout))?;
        Ok(Self::new(
            Arc::new(backend),
            Arc::new(WebSocketAdapter::new()),
            stream_url,
        ))
    }

    /// Registers an observer.
    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// The message timeline, oldest first.
    pub fn timeline(&self) -> &[Message] {
        &self.timeline
    }

    /// Returns the number of messages in the timeline.
    pub fn message_count(&self) -> usize {
        self.timeline.len()
    }

    /// The current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The user-facing connection status.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from(self.mode)
    }

    /// True while at least one ask request is in flight.
    pub fn pending(&self) -> bool {
        self.in_flight > 0
    }

    /// True in interactive mode when nothing has arrived since the last send.
    pub fn awaiting_agent_reply(&self) -> bool {
        self.awaiting_agent_reply
    }

    /// The last connection failure, if it has not been cleared.
    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error.as_deref()
    }

    /// True once the backend has answered at least once.
    pub fn conversation_started(&self) -> bool {
        self.conversation_started
    }

    /// The most recently published source citations.
    pub fn sources(&self) -> &[Citation] {
        &self.sources
    }

    /// The connection supervisor.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Sends user text to whichever transport the current mode uses.
    ///
    /// Blank input is ignored.  Must be called from within a tokio runtime.
    pub fn send(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.append(Role::User, Content::text(text));
        match self.mode {
            Mode::Stateless => self.ask(text),
            Mode::Connecting => {
                tracing::debug!("interactive connection not open yet; buffering message");
                self.outbox.push_back(text.to_string());
            }
            Mode::Interactive => {
                self.awaiting_agent_reply = true;
                self.forward(text);
            }
        }
    }

    /// Re-sends the text of a prior user message, edited.
    ///
    /// The timeline is append-only: the original message stays and the edited
    /// text is sent as a new message.  Blank edits are discarded.
    pub fn edit(&mut self, index: usize, text: &str) -> Result<()> {
        match self.timeline.get(index) {
            Some(message) if message.role.is_user() => {}
            Some(_) => {
                return Err(Error::validation(
                    format!("message {index} was not written by the user"),
                    Some("index".to_string()),
                ));
            }
            None => {
                return Err(Error::validation(
                    format!("no message at index {index}"),
                    Some("index".to_string()),
                ));
            }
        }
        if text.trim().is_empty() {
            tracing::debug!(index, "discarding empty edit");
            return Ok(());
        }
        self.send(text);
        Ok(())
    }

    /// Uploads a file.  Works in every mode and never changes it.
    pub fn upload(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let file_name = display_name(&path);
        tracing::info!(file = %path.display(), "uploading file");
        let requests = Arc::clone(&self.requests);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = requests.upload(&path).await;
            let _ = events.send(SessionEvent::UploadCompleted { file_name, result });
        });
    }

    /// Opens the interactive connection unless one is already live.
    pub fn enter_interactive(&mut self) {
        let live = self.connection.as_ref().is_some_and(Connection::is_live);
        if !self.supervisor.permit_connect(live) {
            return;
        }
        tracing::info!(url = %self.stream_url, "escalating to interactive session");
        self.connection = Some(self.streams.connect(&self.stream_url));
        self.set_mode(Mode::Connecting);
    }

    /// Makes `citations` the current sources and tells every observer.
    pub fn publish_sources(&mut self, citations: Vec<Citation>) {
        SOURCES_EXTRACTED.click();
        for observer in &self.observers {
            observer.on_sources_extracted(&citations);
        }
        self.sources = citations;
    }

    pub(crate) fn option_unhandled(&self, option: &SelectionOption) {
        tracing::warn!(option = %option.label(), "option selected but no handler is registered");
        for observer in &self.observers {
            observer.on_option_unhandled(option);
        }
    }

    /// Waits for the next event from any in-flight request or the
    /// interactive connection.
    pub async fn next_event(&mut self) -> SessionEvent {
        let connection = self.connection.as_mut();
        tokio::select! {
            Some(event) = self.events_rx.recv() => event,
            Some(event) = connection_event(connection) => SessionEvent::Connection(event),
        }
    }

    /// Waits for one event and applies it.
    pub async fn process_next(&mut self) {
        let event = self.next_event().await;
        self.handle_event(event);
    }

    /// Applies one event to the session state.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AskCompleted(result) => self.ask_completed(result),
            SessionEvent::UploadCompleted { file_name, result } => {
                self.upload_completed(file_name, result)
            }
            SessionEvent::Connection(event) => self.connection_event(event),
        }
    }

    /// Closes the interactive connection with code 1000 and waits briefly for
    /// the close to complete.
    pub async fn shutdown(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        connection.close();
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(event) = connection.next_event().await {
                if event.is_terminal() {
                    return Some(event);
                }
            }
            None
        })
        .await;
        match drained {
            Ok(Some(event)) => self.connection_event(event),
            Ok(None) | Err(_) => {
                tracing::debug!("interactive connection did not confirm close");
                self.connection = None;
                self.outbox.clear();
                self.awaiting_agent_reply = false;
                self.set_mode(Mode::Stateless);
            }
        }
    }

    fn ask(&mut self, text: &str) {
        self.in_flight += 1;
        let requests = Arc::clone(&self.requests);
        let events = self.events_tx.clone();
        let query = text.to_string();
        tokio::spawn(async move {
            let result = requests.ask(&query).await;
            let _ = events.send(SessionEvent::AskCompleted(result));
        });
    }

    fn forward(&mut self, text: &str) {
        let result = match self.connection.as_ref() {
            Some(connection) => connection.send(text),
            None => Err(Error::not_connected("no interactive connection")),
        };
        if let Err(err) = result {
            STREAM_SEND_ERRORS.click();
            tracing::warn!(error = %err, "failed to forward message");
            self.awaiting_agent_reply = false;
            let detail = err.user_detail();
            self.append(Role::Assistant, Content::text(format!("Error: {detail}")));
            self.notify(supervisor::send_failed_notice(&detail));
        }
    }

    fn ask_completed(&mut self, result: Result<ResponsePayload>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(payload) => {
                self.conversation_started = true;
                match normalize(&payload.body) {
                    Normalized::Control(_) => {
                        ASK_ESCALATIONS.click();
                        self.enter_interactive();
                    }
                    Normalized::Entry(entry) => self.append_entry(entry),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "ask request failed");
                let detail = err.user_detail();
                self.append(Role::Assistant, Content::text(format!("Error: {detail}")));
                self.notify(supervisor::request_failed_notice(&detail));
            }
        }
    }

    fn upload_completed(&mut self, file_name: String, result: Result<UploadAck>) {
        match result {
            Ok(ack) => {
                tracing::info!(file = %ack.file_name, "upload complete");
                self.append(
                    Role::System,
                    Content::text(format!("File \"{file_name}\" uploaded successfully")),
                );
                self.notify(supervisor::uploaded_notice(&file_name));
            }
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "upload failed");
                let detail = err.user_detail();
                self.append(
                    Role::System,
                    Content::text(format!("File \"{file_name}\" upload failed: {detail}")),
                );
                self.notify(supervisor::upload_failed_notice(&detail));
            }
        }
    }

    fn connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => self.connection_opened(),
            ConnectionEvent::Message(raw) => {
                self.awaiting_agent_reply = false;
                match normalize(&raw) {
                    Normalized::Control(signal) => {
                        tracing::debug!(?signal, "ignoring control signal on open connection");
                    }
                    Normalized::Entry(entry) => self.append_entry(entry),
                }
            }
            ConnectionEvent::Closed(info) => {
                let failure = supervisor::close_error(&info);
                self.connection_ended(info, failure);
            }
            ConnectionEvent::Error(detail) => {
                tracing::warn!(%detail, "interactive connection failed");
                self.connection_ended(CloseInfo::abnormal(), Some(supervisor::failure_error()));
            }
        }
    }

    fn connection_opened(&mut self) {
        if self.mode != Mode::Connecting {
            tracing::debug!(mode = ?self.mode, "ignoring open outside of connecting mode");
            return;
        }
        tracing::info!("interactive session started");
        self.connection_error = None;
        self.set_mode(Mode::Interactive);
        self.notify(supervisor::connected_notice());
        while let Some(text) = self.outbox.pop_front() {
            self.awaiting_agent_reply = true;
            self.forward(&text);
        }
    }

    fn connection_ended(&mut self, info: CloseInfo, failure: Option<Error>) {
        let was_connecting = self.mode == Mode::Connecting;
        self.connection = None;
        self.awaiting_agent_reply = false;
        let discarded = self.outbox.len();
        self.outbox.clear();

        let mut error = match failure {
            None => {
                STREAM_NORMAL_CLOSES.click();
                tracing::info!(code = info.code, "interactive session completed");
                self.notify(supervisor::ended_notice());
                None
            }
            Some(err) => {
                STREAM_ABNORMAL_CLOSES.click();
                tracing::warn!(code = info.code, reason = %info.reason, error = %err, "interactive session lost");
                if was_connecting {
                    self.notify(supervisor::connect_failed_notice());
                } else {
                    self.notify(supervisor::lost_notice());
                }
                Some(err.user_detail())
            }
        };
        if discarded > 0 {
            tracing::warn!(discarded, "discarding messages sent before the connection opened");
            let note = format!("{discarded} unsent message(s) discarded");
            error = Some(match error {
                Some(description) => format!("{description}; {note}"),
                None => note,
            });
        }
        self.connection_error = error;
        self.set_mode(Mode::Stateless);
    }

    fn append_entry(&mut self, entry: NormalizedEntry) {
        let NormalizedEntry {
            role,
            content,
            citations,
        } = entry;
        self.append(role, content);
        if !citations.is_empty() {
            self.publish_sources(citations);
        }
    }

    fn append(&mut self, role: Role, content: Content) {
        let timestamp = self.clock.now();
        let message = Message::new(role, content, timestamp);
        TIMELINE_APPENDS.click();
        for observer in &self.observers {
            observer.on_message(&message);
        }
        self.timeline.push(message);
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        let status = ConnectionStatus::from(mode);
        for observer in &self.observers {
            observer.on_status(status);
        }
    }

    fn notify(&self, notice: Notice) {
        for observer in &self.observers {
            observer.on_notice(&notice);
        }
    }
}

async fn connection_event(connection: Option<&mut Connection>) -> Option<ConnectionEvent> {
    match connection {
        Some(connection) => connection.next_event().await,
        None => std::future::pending().await,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::transport::ConnectionDriver;
    use crate::types::StructuredKind;

    const CONTROL: &str = r#"{"type":"interactive_session_start"}"#;

    #[derive(Default)]
    struct ScriptedRequests {
        replies: Mutex<VecDeque<Result<ResponsePayload>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedRequests {
        fn with(replies: Vec<Result<ResponsePayload>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl RequestAdapter for ScriptedRequests {
        async fn ask(&self, query: &str) -> Result<ResponsePayload> {
            self.queries.lock().unwrap().push(query.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ResponsePayload::new("ok")))
        }

        async fn upload(&self, file: &Path) -> Result<UploadAck> {
            if file.ends_with("missing.pdf") {
                Err(Error::server(413, Some("File too large".to_string()), "Payload Too Large"))
            } else {
                Ok(UploadAck {
                    file_name: display_name(file),
                    response: None,
                })
            }
        }
    }

    #[derive(Default)]
    struct LoopbackStreams {
        drivers: Mutex<Vec<ConnectionDriver>>,
    }

    impl LoopbackStreams {
        fn take_driver(&self) -> ConnectionDriver {
            self.drivers.lock().unwrap().remove(0)
        }

        fn connects(&self) -> usize {
            self.drivers.lock().unwrap().len()
        }
    }

    impl StreamAdapter for LoopbackStreams {
        fn connect(&self, _url: &Url) -> Connection {
            let (connection, driver) = Connection::pair();
            self.drivers.lock().unwrap().push(driver);
            connection
        }
    }

    #[derive(Default)]
    struct Recorder {
        notices: Mutex<Vec<Notice>>,
        statuses: Mutex<Vec<ConnectionStatus>>,
        sources: Mutex<Vec<Vec<Citation>>>,
    }

    impl SessionObserver for Recorder {
        fn on_status(&self, status: ConnectionStatus) {
            self.statuses.lock().unwrap().push(status);
        }

        fn on_notice(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }

        fn on_sources_extracted(&self, citations: &[Citation]) {
            self.sources.lock().unwrap().push(citations.to_vec());
        }
    }

    fn session(
        replies: Vec<Result<ResponsePayload>>,
    ) -> (ChatSession, Arc<ScriptedRequests>, Arc<LoopbackStreams>) {
        let requests = ScriptedRequests::with(replies);
        let streams = Arc::new(LoopbackStreams::default());
        let session = ChatSession::new(
            requests.clone(),
            streams.clone(),
            Url::parse("ws://localhost:8000/ws").unwrap(),
        );
        (session, requests, streams)
    }

    fn ok(body: &str) -> Result<ResponsePayload> {
        Ok(ResponsePayload::new(body))
    }

    async fn interactive_session() -> (ChatSession, ConnectionDriver) {
        let (mut session, _requests, streams) = session(vec![ok(CONTROL)]);
        session.send("I need a service appointment");
        session.process_next().await;
        let driver = streams.take_driver();
        driver.opened();
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Interactive);
        (session, driver)
    }

    #[test]
    fn new_session_is_stateless_and_empty() {
        let (session, _, _) = session(vec![]);
        assert_eq!(session.mode(), Mode::Stateless);
        assert_eq!(session.status().label(), "Standard Mode");
        assert_eq!(session.message_count(), 0);
        assert!(!session.pending());
        assert!(!session.awaiting_agent_reply());
        assert!(session.connection_error().is_none());
    }

    #[tokio::test]
    async fn stateless_send_appends_user_then_reply() {
        let (mut session, requests, _) = session(vec![ok("Your car is due for service.")]);
        session.send("  When is my next service?  ");
        assert!(session.pending());
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.timeline()[0].text(), Some("When is my next service?"));

        session.process_next().await;
        assert!(!session.pending());
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.timeline()[1].role, Role::Assistant);
        assert_eq!(session.timeline()[1].text(), Some("Your car is due for service."));
        assert!(session.conversation_started());
        assert_eq!(
            requests.queries.lock().unwrap().as_slice(),
            ["When is my next service?"]
        );
    }

    #[tokio::test]
    async fn blank_send_is_ignored() {
        let (mut session, _, _) = session(vec![]);
        session.send("   ");
        assert_eq!(session.message_count(), 0);
        assert!(!session.pending());
    }

    #[tokio::test]
    async fn control_signal_starts_connecting_without_a_message() {
        let (mut session, _, streams) = session(vec![ok(CONTROL)]);
        session.send("Talk to an agent");
        session.process_next().await;
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.mode(), Mode::Connecting);
        assert_eq!(session.status().label(), "Connecting...");
        assert!(!session.pending());
        assert_eq!(streams.connects(), 1);
    }

    #[tokio::test]
    async fn ask_failure_appends_error_message() {
        let (mut session, _, _) = session(vec![Err(Error::server(
            503,
            Some("Agent pool exhausted".to_string()),
            "Service Unavailable",
        ))]);
        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        session.send("hello");
        session.process_next().await;
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.timeline()[1].role, Role::Assistant);
        assert_eq!(session.timeline()[1].text(), Some("Error: Agent pool exhausted"));
        assert!(!session.pending());
        assert_eq!(session.mode(), Mode::Stateless);
        let notices = recorder.notices.lock().unwrap();
        assert_eq!(notices[0].title, "Request Failed");
        assert!(notices[0].is_error());
    }

    #[tokio::test]
    async fn connecting_twice_opens_one_connection() {
        let (mut session, _, streams) = session(vec![ok(CONTROL), ok(CONTROL)]);
        session.send("first");
        session.send("second");
        session.process_next().await;
        session.process_next().await;
        assert_eq!(streams.connects(), 1);
        assert_eq!(session.supervisor().suppressed(), 1);
        session.enter_interactive();
        assert_eq!(streams.connects(), 1);
    }

    #[tokio::test]
    async fn reconnect_is_suppressed_while_interactive() {
        let (mut session, _, streams) = session(vec![ok(CONTROL)]);
        session.send("agent please");
        session.process_next().await;
        streams.drivers.lock().unwrap()[0].opened();
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Interactive);

        session.enter_interactive();
        assert_eq!(streams.connects(), 1);
        assert_eq!(session.supervisor().connects(), 1);
        assert_eq!(session.supervisor().suppressed(), 1);
        assert_eq!(session.mode(), Mode::Interactive);
    }

    #[tokio::test]
    async fn send_after_unprocessed_close_fails_recoverably() {
        let (mut session, driver) = interactive_session().await;
        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        let before = session.message_count();

        driver.closed(CloseInfo::abnormal());
        session.send("are you still there?");
        assert_eq!(session.mode(), Mode::Interactive);
        assert!(!session.awaiting_agent_reply());
        assert_eq!(session.message_count(), before + 2);
        let last = session.timeline().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text(), Some("Error: the interactive connection is not open"));
        {
            let notices = recorder.notices.lock().unwrap();
            assert_eq!(notices[0].title, "Send Failed");
            assert!(notices[0].is_error());
        }

        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);
        assert_eq!(
            session.connection_error(),
            Some("Connection closed unexpectedly (Code: 1006)")
        );
    }

    #[tokio::test]
    async fn open_enters_interactive_and_clears_error() {
        let (mut session, _, streams) = session(vec![ok(CONTROL)]);
        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        session.send("agent please");
        session.process_next().await;
        streams.take_driver().opened();
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Interactive);
        assert_eq!(session.status().label(), "Interactive Mode");
        assert!(session.connection_error().is_none());
        assert_eq!(
            recorder.statuses.lock().unwrap().as_slice(),
            [ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
        assert_eq!(recorder.notices.lock().unwrap()[0].title, "Connected");
    }

    #[tokio::test]
    async fn interactive_send_forwards_raw_text() {
        let (mut session, mut driver) = interactive_session().await;
        session.send("My VIN is 1HGCM82633A004352");
        assert!(session.awaiting_agent_reply());
        assert_eq!(
            driver.next_outbound().await,
            Some(crate::transport::Outbound::Text(
                "My VIN is 1HGCM82633A004352".to_string()
            ))
        );

        driver.message(r#"{"type":"agent_message","sender":"VehicleInfoAgent","text":"Found it."}"#);
        session.process_next().await;
        assert!(!session.awaiting_agent_reply());
        let last = session.timeline().last().unwrap();
        assert_eq!(last.role, Role::Agent(crate::types::AgentKind::VehicleInfo));
        assert_eq!(last.text(), Some("Found it."));
    }

    #[tokio::test]
    async fn sending_while_awaiting_still_appends() {
        let (mut session, _driver) = interactive_session().await;
        let before = session.message_count();
        session.send("one");
        session.send("two");
        assert!(session.awaiting_agent_reply());
        assert_eq!(session.message_count(), before + 2);
    }

    #[tokio::test]
    async fn abnormal_close_resets_without_timeline_entry() {
        let (mut session, driver) = interactive_session().await;
        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        session.send("still there?");
        let before = session.message_count();

        driver.closed(CloseInfo::abnormal());
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);
        assert_eq!(
            session.connection_error(),
            Some("Connection closed unexpectedly (Code: 1006)")
        );
        assert!(!session.awaiting_agent_reply());
        assert_eq!(session.message_count(), before);
        assert_eq!(recorder.notices.lock().unwrap()[0].title, "Connection Lost");
    }

    #[tokio::test]
    async fn normal_close_resets_and_clears_error() {
        let (mut session, driver) = interactive_session().await;
        let before = session.message_count();
        driver.closed(CloseInfo::normal());
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);
        assert!(session.connection_error().is_none());
        assert_eq!(session.message_count(), before);
    }

    #[tokio::test]
    async fn socket_error_is_a_connection_error() {
        let (mut session, driver) = interactive_session().await;
        driver.failed("reset by peer");
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);
        assert_eq!(session.connection_error(), Some("Connection error occurred"));
    }

    #[tokio::test]
    async fn no_reconnect_after_close() {
        let (mut session, _, streams) = session(vec![ok(CONTROL), ok("plain answer")]);
        session.send("escalate");
        session.process_next().await;
        let driver = streams.take_driver();
        driver.opened();
        session.process_next().await;
        driver.closed(CloseInfo::abnormal());
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);

        session.send("back to stateless");
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);
        assert_eq!(streams.connects(), 0);
        assert_eq!(session.timeline().last().unwrap().text(), Some("plain answer"));
    }

    #[tokio::test]
    async fn messages_sent_while_connecting_flush_on_open() {
        let (mut session, _, streams) = session(vec![ok(CONTROL)]);
        session.send("escalate");
        session.process_next().await;
        session.send("queued one");
        session.send("queued two");
        assert_eq!(session.message_count(), 3);

        let mut driver = streams.take_driver();
        driver.opened();
        session.process_next().await;
        assert!(session.awaiting_agent_reply());
        assert_eq!(
            driver.next_outbound().await,
            Some(crate::transport::Outbound::Text("queued one".to_string()))
        );
        assert_eq!(
            driver.next_outbound().await,
            Some(crate::transport::Outbound::Text("queued two".to_string()))
        );
    }

    #[tokio::test]
    async fn failed_connect_discards_buffer() {
        let (mut session, _, streams) = session(vec![ok(CONTROL)]);
        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        session.send("escalate");
        session.process_next().await;
        session.send("queued");

        streams.take_driver().failed("refused");
        session.process_next().await;
        assert_eq!(session.mode(), Mode::Stateless);
        assert_eq!(
            session.connection_error(),
            Some("Connection error occurred; 1 unsent message(s) discarded")
        );
        let notices = recorder.notices.lock().unwrap();
        assert_eq!(notices.last().unwrap().title, "Connection Error");
    }

    #[tokio::test]
    async fn table_reply_publishes_sources_once() {
        let table = json!({
            "type": "table",
            "data": [{"A": "1", "Source": "u1,u2"}, {"B": "2"}],
        });
        let (mut session, _, _) = session(vec![ok(&table.to_string())]);
        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        session.send("show me prices");
        session.process_next().await;

        let last = session.timeline().last().unwrap();
        assert_eq!(last.content.structured_kind(), Some(StructuredKind::Table));
        let expected = vec![Citation::new("u1"), Citation::new("u2")];
        assert_eq!(session.sources(), expected.as_slice());
        assert_eq!(recorder.sources.lock().unwrap().as_slice(), [expected]);
    }

    #[tokio::test]
    async fn edit_appends_instead_of_replacing() {
        let (mut session, requests, _) = session(vec![ok("first"), ok("second")]);
        session.send("orignal question");
        session.process_next().await;
        session.edit(0, "original question").unwrap();
        session.process_next().await;
        assert_eq!(session.message_count(), 4);
        assert_eq!(session.timeline()[0].text(), Some("orignal question"));
        assert_eq!(session.timeline()[2].text(), Some("original question"));
        assert_eq!(requests.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn edit_rejects_bad_indices_and_ignores_blank_text() {
        let (mut session, _, _) = session(vec![ok("reply")]);
        session.send("question");
        session.process_next().await;
        assert!(session.edit(1, "x").unwrap_err().is_validation());
        assert!(session.edit(7, "x").unwrap_err().is_validation());
        session.edit(0, "   ").unwrap();
        assert_eq!(session.message_count(), 2);
        assert!(!session.pending());
    }

    #[tokio::test]
    async fn uploads_report_as_system_messages() {
        let (mut session, _, _) = session(vec![]);
        session.upload("/tmp/invoice.pdf");
        session.process_next().await;
        assert_eq!(session.timeline()[0].role, Role::System);
        assert_eq!(
            session.timeline()[0].text(),
            Some("File \"invoice.pdf\" uploaded successfully")
        );

        session.upload("/tmp/missing.pdf");
        session.process_next().await;
        assert_eq!(
            session.timeline()[1].text(),
            Some("File \"missing.pdf\" upload failed: File too large")
        );
        assert_eq!(session.mode(), Mode::Stateless);
    }

    #[tokio::test]
    async fn timestamps_never_decrease() {
        let (mut session, _, _) = session(vec![]);
        for i in 0..5 {
            session.send(&format!("message {i}"));
        }
        let stamps: Vec<_> = session.timeline().iter().map(|m| m.timestamp).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn shutdown_closes_normally() {
        let (mut session, mut driver) = interactive_session().await;
        let peer = tokio::spawn(async move {
            while let Some(outbound) = driver.next_outbound().await {
                if let crate::transport::Outbound::Close(info) = outbound {
                    driver.closed(info);
                    break;
                }
            }
        });
        session.shutdown().await;
        peer.await.unwrap();
        assert_eq!(session.mode(), Mode::Stateless);
        assert!(session.connection_error().is_none());
    }
}
