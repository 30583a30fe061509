//! The injected HTTP capability.
//!
//! The executor never opens sockets itself; it hands a fully built
//! [`HttpRequest`] to a [`Transport`] and interprets the [`HttpResponse`].
//! Timeouts and cancellation belong to the transport.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A single outbound POST.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Absolute target URL.
    pub url: String,
    /// Header name/value pairs, in send order.
    pub headers: Vec<(String, String)>,
    /// Encoded command body.
    pub body: Vec<u8>,
    /// Deadline requested by the client configuration, if any.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The response to an [`HttpRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a JSON request and returns the raw response.
///
/// Implementations must send exactly one request per call and must not
/// retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the POST.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[cfg(feature = "reqwest-transport")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest-transport")]
impl ReqwestTransport {
    /// Create a transport with a fresh `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "reqwest-transport")]
#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.post(&request.url).body(request.body);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use super::*;
    use crate::error::MongoFetchError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays queued responses and records every request it sees.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn push(&self, status: u16, content_type: &str, body: &str) {
            self.responses.lock().unwrap().push_back(HttpResponse {
                status,
                content_type: Some(content_type.to_string()),
                body: body.as_bytes().to_vec(),
            });
        }

        pub(crate) fn push_json(&self, body: serde_json::Value) {
            self.push(200, "application/json", &body.to_string());
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// Body of the nth request, parsed as JSON.
        pub(crate) fn body(&self, index: usize) -> serde_json::Value {
            serde_json::from_slice(&self.requests()[index].body).unwrap()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| MongoFetchError::transport("no scripted response"))
        }
    }
}
