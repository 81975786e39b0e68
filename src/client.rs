use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    ASK_DURATION, ASK_ERRORS, ASK_REQUESTS, UPLOAD_ERRORS, UPLOAD_REQUESTS,
};
use crate::transport::RequestAdapter;
use crate::types::wire::ErrorBody;
use crate::types::{AskRequest, ResponsePayload, UploadAck};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The three backend endpoints a session talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Request/response endpoint (`POST {query}`).
    pub ask: Url,
    /// Multipart upload endpoint.
    pub upload: Url,
    /// Websocket endpoint for interactive sessions.
    pub stream: Url,
}

impl Endpoints {
    /// Creates endpoints from explicit URLs.
    pub fn new(ask: &str, upload: &str, stream: &str) -> Result<Self> {
        Ok(Self {
            ask: Url::parse(ask)?,
            upload: Url::parse(upload)?,
            stream: Url::parse(stream)?,
        })
    }

    /// Derives the conventional `api/ask`, `api/upload` and `ws` endpoints from
    /// an http(s) base URL.
    pub fn from_base(base: &str) -> Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let ask = base.join("api/ask")?;
        let upload = base.join("api/upload")?;
        let mut stream = base.join("ws")?;
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(Error::url(
                    format!("base URL must be http or https, not {other}"),
                    None,
                ));
            }
        };
        stream
            .set_scheme(ws_scheme)
            .map_err(|_| Error::url(format!("cannot use {ws_scheme} for {base}"), None))?;
        Ok(Self {
            ask,
            upload,
            stream,
        })
    }
}

/// HTTP client for the backend's request/response endpoints.
#[derive(Debug, Clone)]
pub struct Backend {
    client: ReqwestClient,
    endpoints: Endpoints,
    timeout: Duration,
}

impl Backend {
    /// Create a new backend client with the default timeout.
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        Self::with_options(endpoints, None)
    }

    /// Create a new backend client with custom settings.
    pub fn with_options(endpoints: Endpoints, timeout: Option<Duration>) -> Result<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    /// The endpoints this client talks to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::transport(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::transport(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Convert a non-2xx response into an error carrying the server's detail.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();
        let reason = status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {status_code}"));

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::transport(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = detail_from_body(&body);
        let message = format!("Request failed with status code {status_code} ({reason})");
        Error::server(status_code, detail, message)
    }
}

/// Extracts the `detail` field from an error body.
///
/// String details are returned verbatim; structured details (validation error
/// lists, for instance) are returned as compact JSON.
pub(crate) fn detail_from_body(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) => Some(detail),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait::async_trait]
impl RequestAdapter for Backend {
    async fn ask(&self, query: &str) -> Result<ResponsePayload> {
        ASK_REQUESTS.click();
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoints.ask.clone())
            .headers(self.default_headers())
            .json(&AskRequest::new(query))
            .send()
            .await
            .map_err(|e| {
                ASK_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            ASK_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let bytes = response.bytes().await.map_err(|e| {
            ASK_ERRORS.click();
            Error::transport(format!("Failed to read response: {}", e), Some(Box::new(e)))
        })?;
        let body = std::str::from_utf8(&bytes).map_err(|e| {
            ASK_ERRORS.click();
            Error::malformed_payload(
                format!("Response body is not valid UTF-8: {}", e),
                Some(Box::new(e)),
            )
        })?;

        ASK_DURATION.add(started.elapsed().as_secs_f64());
        Ok(ResponsePayload::new(body))
    }

    async fn upload(&self, file: &Path) -> Result<UploadAck> {
        UPLOAD_REQUESTS.click();
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UPLOAD_ERRORS.click();
                Error::validation(
                    format!("{} does not name a file", file.display()),
                    Some("file".to_string()),
                )
            })?;
        let contents = tokio::fs::read(file).await.map_err(|err| {
            UPLOAD_ERRORS.click();
            Error::io(format!("failed to read {}", file.display()), err)
        })?;

        let form = Form::new().part("file", Part::bytes(contents).file_name(file_name.clone()));
        let response = self
            .client
            .post(self.endpoints.upload.clone())
            .headers(self.default_headers())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                UPLOAD_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            UPLOAD_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let response = match response.text().await {
            Ok(body) => serde_json::from_str(&body).ok(),
            Err(err) => {
                tracing::debug!(file = %file_name, error = %err, "upload acknowledged without a readable body");
                None
            }
        };
        Ok(UploadAck {
            file_name,
            response,
        })
    }
}
