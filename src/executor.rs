//! Command execution against the Data API action endpoint.
//!
//! Every operation in the crate funnels through [`Executor::execute`], which
//! performs exactly one POST per call and turns non-success responses into
//! [`MongoFetchError::Remote`].

use crate::client::ClientOptions;
use crate::codec::{to_extended_json, Encoding, ResponseFormat, JSON_CONTENT_TYPE};
use crate::error::{MongoFetchError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::ttl::parse_ttl;
use bson::Document;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A named remote operation exposed by the Data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Query a collection with a filter and modifiers.
    Find,
    /// Return the first document matching a filter.
    FindOne,
    /// Insert one document.
    InsertOne,
    /// Insert a batch of documents.
    InsertMany,
    /// Delete the first matching document.
    DeleteOne,
    /// Delete every matching document.
    DeleteMany,
    /// Update the first matching document.
    UpdateOne,
    /// Update every matching document.
    UpdateMany,
    /// Run an aggregation pipeline.
    Aggregate,
    /// Count documents matching a filter.
    CountDocuments,
    /// Count every document in a collection.
    EstimatedDocumentCount,
    /// List the collections of a database.
    ListCollections,
    /// List the databases of the data source.
    ListDatabases,
}

impl Action {
    /// Every action the client knows how to send.
    pub const ALL: [Action; 13] = [
        Action::Find,
        Action::FindOne,
        Action::InsertOne,
        Action::InsertMany,
        Action::DeleteOne,
        Action::DeleteMany,
        Action::UpdateOne,
        Action::UpdateMany,
        Action::Aggregate,
        Action::CountDocuments,
        Action::EstimatedDocumentCount,
        Action::ListCollections,
        Action::ListDatabases,
    ];

    /// Whether the action only reads. Only reads are served from the cache.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Action::Find
                | Action::FindOne
                | Action::Aggregate
                | Action::CountDocuments
                | Action::EstimatedDocumentCount
                | Action::ListCollections
                | Action::ListDatabases
        )
    }

    /// The path segment used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Find => "find",
            Action::FindOne => "findOne",
            Action::InsertOne => "insertOne",
            Action::InsertMany => "insertMany",
            Action::DeleteOne => "deleteOne",
            Action::DeleteMany => "deleteMany",
            Action::UpdateOne => "updateOne",
            Action::UpdateMany => "updateMany",
            Action::Aggregate => "aggregate",
            Action::CountDocuments => "countDocuments",
            Action::EstimatedDocumentCount => "estimatedDocumentCount",
            Action::ListCollections => "listCollections",
            Action::ListDatabases => "listDatabases",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded response held until `expires_at`.
#[derive(Debug, Clone)]
struct CachedResponse {
    body: Document,
    expires_at: Instant,
}

/// Opt-in cache for read responses, keyed by action and encoded command.
#[derive(Debug)]
struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(action: Action, command: &Document) -> String {
        format!("{}-{}", action, to_extended_json(command))
    }

    async fn get(&self, key: &str) -> Option<Document> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a response, dropping every entry that has already expired.
    async fn put(&self, key: String, body: Document) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            CachedResponse {
                body,
                expires_at: now + self.ttl,
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

struct ExecutorInner {
    data_source: String,
    base_url: String,
    api_key: String,
    transport: Arc<dyn Transport>,
    encoding: Encoding,
    timeout: Option<Duration>,
    cache: Option<ResponseCache>,
}

/// Turns `(action, command)` pairs into Data API calls.
///
/// Cloning is cheap; clones share credentials, transport and cache.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("data_source", &self.inner.data_source)
            .field("base_url", &self.inner.base_url)
            .field("encoding", &self.inner.encoding)
            .field("caching", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Build an executor, validating the configuration.
    pub(crate) fn new(data_source: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let data_source = data_source.into();
        if data_source.is_empty() {
            return Err(MongoFetchError::configuration("data source must not be empty"));
        }
        if options.url.trim().is_empty() {
            return Err(MongoFetchError::configuration("url is required"));
        }
        if options.api_key.is_empty() {
            return Err(MongoFetchError::configuration("api key is required"));
        }
        let transport = options
            .transport
            .ok_or_else(|| MongoFetchError::configuration("no transport was provided"))?;

        let cache = match options.cache_ttl.as_deref() {
            Some(spec) => match parse_ttl(spec)? {
                0 => None,
                seconds => Some(ResponseCache::new(Duration::from_secs(seconds))),
            },
            None => None,
        };

        Ok(Self {
            inner: Arc::new(ExecutorInner {
                data_source,
                base_url: options.url.trim_end_matches('/').to_string(),
                api_key: options.api_key,
                transport,
                encoding: options.request_encoding,
                timeout: options.timeout,
                cache,
            }),
        })
    }

    /// The data source injected into every command.
    pub fn data_source(&self) -> &str {
        &self.inner.data_source
    }

    /// The configured base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Whether the response cache is active.
    pub fn is_caching(&self) -> bool {
        self.inner.cache.is_some()
    }

    /// URL for an action: `{base}/v1/action/{action}`.
    pub fn action_url(&self, action: Action) -> String {
        format!("{}/v1/action/{}", self.inner.base_url, action)
    }

    /// Execute one action and return the decoded response body.
    pub async fn execute(&self, action: Action, mut command: Document) -> Result<Document> {
        command.insert("dataSource", self.inner.data_source.clone());

        let cache_key = self
            .inner
            .cache
            .as_ref()
            .filter(|_| action.is_read())
            .map(|_| ResponseCache::key(action, &command));

        if let (Some(cache), Some(key)) = (&self.inner.cache, &cache_key) {
            if let Some(hit) = cache.get(key).await {
                debug!(%action, "data API cache hit");
                return Ok(hit);
            }
        }

        let url = self.action_url(action);
        let request = HttpRequest {
            url: url.clone(),
            headers: vec![
                ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
                ("Accept".to_string(), JSON_CONTENT_TYPE.to_string()),
                ("api-key".to_string(), self.inner.api_key.clone()),
            ],
            body: self.inner.encoding.encode(&command)?,
            timeout: self.inner.timeout,
        };

        debug!(%action, %url, "posting data API action");
        let response = self.inner.transport.send(request).await?;

        if !response.is_success() {
            let err = remote_error(&response);
            debug!(%action, status = response.status, error = %err, "data API action failed");
            return Err(err);
        }

        let format = ResponseFormat::from_content_type(response.content_type.as_deref());
        if let ResponseFormat::Unrecognized(ref content_type) = format {
            warn!(%action, %content_type, "unrecognized response content type, decoding as JSON");
        }
        let body = format.decode(&response.body)?;

        if let (Some(cache), Some(key)) = (&self.inner.cache, cache_key) {
            cache.put(key, body.clone()).await;
        }

        Ok(body)
    }
}

/// Map a non-success response to a remote command error.
///
/// Server messages are expected to look like `"<CODE> <text>"`; the leading
/// token becomes the code. This convention is assumed, not guaranteed.
fn remote_error(response: &HttpResponse) -> MongoFetchError {
    let error = serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));

    match error {
        Some(text) => match text.split_once(' ') {
            Some((code, message)) => MongoFetchError::remote(response.status, code, message),
            None => MongoFetchError::remote(response.status, text.clone(), text),
        },
        None => MongoFetchError::remote(
            response.status,
            response.status.to_string(),
            String::from_utf8_lossy(&response.body),
        ),
    }
}
