//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for choosing backend endpoints and controlling output.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{DEFAULT_BASE_URL, Endpoints};
use crate::error::Result;

/// Environment variable that overrides the default base URL.
pub const BASE_URL_ENV: &str = "CONCIERGE_BASE_URL";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the concierge-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL the three endpoints are derived from.
    #[arrrg(optional, "Backend base URL (default: http://localhost:8000/)", "URL")]
    pub base_url: Option<String>,

    /// Explicit ask endpoint.
    #[arrrg(optional, "Ask endpoint (default: <base>/api/ask)", "URL")]
    pub ask_url: Option<String>,

    /// Explicit upload endpoint.
    #[arrrg(optional, "Upload endpoint (default: <base>/api/upload)", "URL")]
    pub upload_url: Option<String>,

    /// Explicit websocket endpoint.
    #[arrrg(optional, "Interactive endpoint (default: ws://<host>/ws)", "URL")]
    pub stream_url: Option<String>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log debug output to stderr.
    #[arrrg(flag, "Enable debug logging on stderr")]
    pub verbose: bool,
}

/// Configuration for a chat session.
///
/// Endpoints are kept as strings and only parsed by
/// [`ChatConfig::resolve_endpoints`], so a bad URL surfaces as an error
/// instead of at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL the endpoints are derived from.
    pub base_url: String,

    /// Overrides the derived ask endpoint.
    pub ask_url: Option<String>,

    /// Overrides the derived upload endpoint.
    pub upload_url: Option<String>,

    /// Overrides the derived websocket endpoint.
    pub stream_url: Option<String>,

    /// Timeout applied to each HTTP request.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log at debug level.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: `$CONCIERGE_BASE_URL`, else http://localhost:8000/
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            ask_url: None,
            upload_url: None,
            stream_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
            verbose: false,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the ask endpoint.
    pub fn with_ask_url(mut self, url: impl Into<String>) -> Self {
        self.ask_url = Some(url.into());
        self
    }

    /// Sets the upload endpoint.
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = Some(url.into());
        self
    }

    /// Sets the websocket endpoint.
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables debug logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Parses the configured endpoints.
    ///
    /// Explicit endpoint overrides win; the rest are derived from the base URL.
    pub fn resolve_endpoints(&self) -> Result<Endpoints> {
        let mut endpoints = Endpoints::from_base(&self.base_url)?;
        if let Some(ask) = &self.ask_url {
            endpoints.ask = url::Url::parse(ask)?;
        }
        if let Some(upload) = &self.upload_url {
            endpoints.upload = url::Url::parse(upload)?;
        }
        if let Some(stream) = &self.stream_url {
            endpoints.stream = url::Url::parse(stream)?;
        }
        Ok(endpoints)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            base_url: args.base_url.unwrap_or(defaults.base_url),
            ask_url: args.ask_url,
            upload_url: args.upload_url,
            stream_url: args.stream_url,
            timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            use_color: !args.no_color,
            verbose: args.verbose,
        }
    }
}
