//! User intents and their dispatch onto a [`ChatSession`].

use std::path::PathBuf;

use crate::chat::session::ChatSession;
use crate::error::Result;
use crate::types::{Citation, SelectionOption};

/// Something the user asked the presentation layer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Send new text.
    Send(String),
    /// Send an edited copy of the user message at `index`.
    Edit {
        /// Zero-based timeline index of a user message.
        index: usize,
        /// The edited text.
        text: String,
    },
    /// Upload a file.
    Upload(PathBuf),
    /// The user picked a selection card.
    SelectOption(SelectionOption),
    /// Re-emit citations to observers.
    PublishSources(Vec<Citation>),
}

/// Callback for [`Intent::SelectOption`].
pub type OptionHandler = Box<dyn FnMut(&mut ChatSession, &SelectionOption) + Send>;

/// Turns intents into session calls.
#[derive(Default)]
pub struct Dispatcher {
    option_handler: Option<OptionHandler>,
}

impl Dispatcher {
    /// Creates a dispatcher without an option handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes selected options to `handler`.
    pub fn with_option_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&mut ChatSession, &SelectionOption) + Send + 'static,
    {
        self.option_handler = Some(Box::new(handler));
        self
    }

    /// Applies one intent.
    ///
    /// Only an edit naming something other than a user message fails.
    pub fn dispatch(&mut self, session: &mut ChatSession, intent: Intent) -> Result<()> {
        match intent {
            Intent::Send(text) => session.send(&text),
            Intent::Edit { index, text } => session.edit(index, &text)?,
            Intent::Upload(path) => session.upload(path),
            Intent::SelectOption(option) => match self.option_handler.as_mut() {
                Some(handler) => handler(session, &option),
                None => session.option_unhandled(&option),
            },
            Intent::PublishSources(citations) => session.publish_sources(citations),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::observer::SessionObserver;
    use crate::transport::{Connection, RequestAdapter, StreamAdapter};
    use crate::types::{ResponsePayload, Role, UploadAck};

    struct Echo;

    #[async_trait::async_trait]
    impl RequestAdapter for Echo {
        async fn ask(&self, query: &str) -> Result<ResponsePayload> {
            Ok(ResponsePayload::new(format!("echo: {query}")))
        }

        async fn upload(&self, file: &Path) -> Result<UploadAck> {
            Ok(UploadAck {
                file_name: file.display().to_string(),
                response: None,
            })
        }
    }

    struct NoStreams;

    impl StreamAdapter for NoStreams {
        fn connect(&self, _url: &Url) -> Connection {
            Connection::pair().0
        }
    }

    #[derive(Default)]
    struct Unhandled {
        options: Mutex<Vec<SelectionOption>>,
        sources: Mutex<Vec<Citation>>,
    }

    impl SessionObserver for Unhandled {
        fn on_option_unhandled(&self, option: &SelectionOption) {
            self.options.lock().unwrap().push(option.clone());
        }

        fn on_sources_extracted(&self, citations: &[Citation]) {
            self.sources.lock().unwrap().extend_from_slice(citations);
        }
    }

    fn session() -> ChatSession {
        ChatSession::new(
            Arc::new(Echo),
            Arc::new(NoStreams),
            Url::parse("ws://localhost:8000/ws").unwrap(),
        )
    }

    fn option() -> SelectionOption {
        SelectionOption::from_value(&json!({"title": "Oil change", "value": "oil_change"}))
    }

    #[tokio::test]
    async fn send_and_edit_go_through_the_session() {
        let mut session = session();
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .dispatch(&mut session, Intent::Send("hi".to_string()))
            .unwrap();
        session.process_next().await;
        dispatcher
            .dispatch(
                &mut session,
                Intent::Edit {
                    index: 0,
                    text: "hello".to_string(),
                },
            )
            .unwrap();
        session.process_next().await;
        let texts: Vec<_> = session.timeline().iter().filter_map(|m| m.text()).collect();
        assert_eq!(texts, ["hi", "echo: hi", "hello", "echo: hello"]);
        assert!(
            dispatcher
                .dispatch(
                    &mut session,
                    Intent::Edit {
                        index: 1,
                        text: "nope".to_string()
                    }
                )
                .is_err()
        );
    }

    #[tokio::test]
    async fn selected_option_reaches_handler() {
        let mut session = session();
        let mut dispatcher = Dispatcher::new().with_option_handler(|session, option| {
            if let Some(value) = option.value_text() {
                session.send(&value);
            }
        });
        dispatcher
            .dispatch(&mut session, Intent::SelectOption(option()))
            .unwrap();
        assert_eq!(session.timeline()[0].role, Role::User);
        assert_eq!(session.timeline()[0].text(), Some("oil_change"));
    }

    #[test]
    fn unhandled_option_is_reported() {
        let mut session = session();
        let observer = Arc::new(Unhandled::default());
        session.add_observer(observer.clone());
        Dispatcher::new()
            .dispatch(&mut session, Intent::SelectOption(option()))
            .unwrap();
        assert_eq!(observer.options.lock().unwrap().as_slice(), [option()]);
        assert!(session.timeline().is_empty());
    }

    #[test]
    fn published_sources_reach_observers() {
        let mut session = session();
        let observer = Arc::new(Unhandled::default());
        session.add_observer(observer.clone());
        let citations = vec![Citation::new("https://example.com/recall")];
        Dispatcher::new()
            .dispatch(&mut session, Intent::PublishSources(citations.clone()))
            .unwrap();
        assert_eq!(session.sources(), citations.as_slice());
        assert_eq!(*observer.sources.lock().unwrap(), citations);
    }

    #[tokio::test]
    async fn upload_does_not_change_mode() {
        let mut session = session();
        Dispatcher::new()
            .dispatch(&mut session, Intent::Upload(PathBuf::from("manual.pdf")))
            .unwrap();
        session.process_next().await;
        assert_eq!(session.timeline()[0].role, Role::System);
        assert_eq!(session.status().label(), "Standard Mode");
    }
}
