//! HTTP transport for the inference service.
//!
//! One `POST` per call: `Content-Type` is the sniffed image type and the body
//! is the image exactly as read. A status outside 200..=299 fails the call
//! before the body is looked at.

use std::io::Read;
use std::time::Duration;

use url::Url;

use super::InferenceClient;
use crate::detect::{DetectionParser, InferenceResult, MissingFields};
use crate::error::{AnnotateError, AnnotateResult};
use crate::sniff::sniff_certain;

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("auto-annotate/", env!("CARGO_PKG_VERSION"));

/// Construction options for [`HttpInferenceClient`].
#[derive(Clone, Debug)]
pub struct HttpClientOptions {
    pub user_agent: String,
    /// Overall request timeout. `None` waits as long as the server takes.
    pub timeout: Option<Duration>,
    pub missing_fields: MissingFields,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            missing_fields: MissingFields::default(),
        }
    }
}

/// Blocking HTTP client holding a reusable agent and the endpoint URL.
pub struct HttpInferenceClient {
    agent: ureq::Agent,
    server_url: Option<String>,
    parser: DetectionParser,
}

impl HttpInferenceClient {
    pub fn new(options: HttpClientOptions) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(&options.user_agent);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            server_url: None,
            parser: DetectionParser::new(options.missing_fields),
        }
    }

    pub fn with_endpoint(url: &str, options: HttpClientOptions) -> Self {
        let mut client = Self::new(options);
        client.set_endpoint(Some(url));
        client
    }

    fn target_url(&self) -> AnnotateResult<Url> {
        let raw = self
            .server_url
            .as_deref()
            .ok_or_else(|| AnnotateError::input("no inference endpoint configured"))?;
        let url = Url::parse(raw)
            .map_err(|e| AnnotateError::input(format!("invalid endpoint '{}': {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AnnotateError::input(format!(
                "unsupported endpoint scheme '{}'; expected http(s)",
                other
            ))),
        }
    }
}

impl Default for HttpInferenceClient {
    fn default() -> Self {
        Self::new(HttpClientOptions::default())
    }
}

impl InferenceClient for HttpInferenceClient {
    fn set_endpoint(&mut self, url: Option<&str>) {
        self.server_url = url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
    }

    fn endpoint(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    fn predict(&self, image: &[u8]) -> AnnotateResult<InferenceResult> {
        let content_type = sniff_certain(image)?;
        let url = self.target_url()?;

        log::debug!(
            "POST {} ({} bytes, {})",
            url,
            image.len(),
            content_type
        );
        let response = match self
            .agent
            .post(url.as_str())
            .set("Content-Type", content_type)
            .send_bytes(image)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(status_error(status)),
            Err(ureq::Error::Transport(transport)) => {
                return Err(AnnotateError::Network {
                    status: None,
                    message: transport.to_string(),
                })
            }
        };

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(status_error(status));
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| AnnotateError::Network {
                status: Some(status),
                message: format!("read response body: {}", e),
            })?;
        log::debug!("inference response: status {}, {} bytes", status, body.len());

        self.parser.parse_response(&body)
    }
}

fn status_error(status: u16) -> AnnotateError {
    AnnotateError::Network {
        status: Some(status),
        message: format!("inference server returned status {}", status),
    }
}
