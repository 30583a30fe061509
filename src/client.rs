//! MongoFetchClient for talking to the Data API over HTTP.

use crate::codec::Encoding;
use crate::db::Database;
use crate::error::{MongoFetchError, Result};
use crate::executor::{Action, Executor};
use crate::transport::Transport;
use bson::{doc, Document};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the Data API base URL.
pub const URL_ENV: &str = "MONGO_FETCH_URL";

/// Environment variable holding the Data API key.
pub const API_KEY_ENV: &str = "MONGO_FETCH_API_KEY";

/// Options for connecting to the Data API.
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Base endpoint, e.g. `https://data.mongodb-api.com/app/<id>/endpoint/data`.
    pub url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// HTTP capability. Required.
    pub transport: Option<Arc<dyn Transport>>,
    /// Encoding used for request bodies.
    pub request_encoding: Encoding,
    /// Per-request deadline handed to the transport.
    pub timeout: Option<Duration>,
    /// Response cache TTL such as `"5m"`. Caching is off when unset.
    pub cache_ttl: Option<String>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("transport", &self.transport.as_ref().map(|_| "<transport>"))
            .field("request_encoding", &self.request_encoding)
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl ClientOptions {
    /// Create a new options builder.
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Read the url and API key from `MONGO_FETCH_URL` and
    /// `MONGO_FETCH_API_KEY`.
    ///
    /// A transport still has to be supplied before building a client.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(URL_ENV)
            .map_err(|_| MongoFetchError::configuration(format!("{} is not set", URL_ENV)))?;
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| MongoFetchError::configuration(format!("{} is not set", API_KEY_ENV)))?;

        Ok(Self {
            url,
            api_key,
            ..Self::default()
        })
    }
}

/// Builder for ClientOptions.
#[derive(Clone, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.options.api_key = api_key.into();
        self
    }

    /// Set the transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.options.transport = Some(transport);
        self
    }

    /// Set the request encoding.
    pub fn request_encoding(mut self, encoding: Encoding) -> Self {
        self.options.request_encoding = encoding;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Enable the response cache with the given TTL.
    pub fn cache_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.options.cache_ttl = Some(ttl.into());
        self
    }

    /// Build the options.
    pub fn build(self) -> ClientOptions {
        self.options
    }
}

/// A client for the Data API.
///
/// Handles are cheap: databases and collections created from a client only
/// carry names and a shared [`Executor`].
///
/// # Example
///
/// ```ignore
/// use mongo_fetch::{ClientOptions, MongoFetchClient, ReqwestTransport};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> mongo_fetch::Result<()> {
///     let options = ClientOptions::builder()
///         .url("https://data.mongodb-api.com/app/data-abc/endpoint/data")
///         .api_key("secret")
///         .transport(Arc::new(ReqwestTransport::new()))
///         .build();
///     let client = MongoFetchClient::new("Cluster0", options)?;
///
///     let users = client.database("app").collection_with_doc("users");
///     let count = users.count_documents(None).await?;
///     println!("{} users", count);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MongoFetchClient {
    executor: Executor,
}

impl MongoFetchClient {
    /// Create a client for a data source.
    ///
    /// Fails with a configuration error when the url, API key or transport
    /// is missing. A malformed `cache_ttl` fails with the TTL parser's error.
    pub fn new(data_source: impl Into<String>, options: ClientOptions) -> Result<Self> {
        Ok(Self {
            executor: Executor::new(data_source, options)?,
        })
    }

    /// No-op kept for driver compatibility; HTTP needs no connection.
    pub async fn connect(&self) -> Result<&Self> {
        Ok(self)
    }

    /// No-op kept for driver compatibility.
    pub async fn close(&self) -> Result<&Self> {
        Ok(self)
    }

    /// Get a database handle.
    pub fn database(&self, name: &str) -> Database {
        Database::new(name.to_string(), self.executor.clone())
    }

    /// Alias for [`MongoFetchClient::database`].
    pub fn db(&self, name: &str) -> Database {
        self.database(name)
    }

    /// The data source every command targets.
    pub fn data_source(&self) -> &str {
        self.executor.data_source()
    }

    /// The shared executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// List databases visible to the data source.
    pub async fn list_databases(&self) -> Result<Vec<Document>> {
        let response = self.executor.execute(Action::ListDatabases, doc! {}).await?;
        documents_field(&response, "databases")
    }

    /// List database names.
    pub async fn list_database_names(&self) -> Result<Vec<String>> {
        Ok(names(self.list_databases().await?))
    }
}

/// Extract an array-of-documents field; absent means empty.
pub(crate) fn documents_field(response: &Document, field: &str) -> Result<Vec<Document>> {
    match response.get(field) {
        None | Some(bson::Bson::Null) => Ok(Vec::new()),
        Some(bson::Bson::Array(items)) => items
            .iter()
            .map(|item| match item {
                bson::Bson::Document(doc) => Ok(doc.clone()),
                other => Err(MongoFetchError::Deserialization(format!(
                    "expected documents in `{}`, found {:?}",
                    field,
                    other.element_type()
                ))),
            })
            .collect(),
        Some(other) => Err(MongoFetchError::Deserialization(format!(
            "expected `{}` to be an array, found {:?}",
            field,
            other.element_type()
        ))),
    }
}

/// Pull the `name` field out of listing documents.
pub(crate) fn names(docs: Vec<Document>) -> Vec<String> {
    docs.iter()
        .filter_map(|d| d.get_str("name").ok().map(|s| s.to_string()))
        .collect()
}

/// Alias for MongoFetchClient for compatibility.
pub type Client = MongoFetchClient;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(transport: Arc<ScriptedTransport>) -> MongoFetchClient {
        let options = ClientOptions::builder()
            .url("http://localhost:3000/api")
            .api_key("secret")
            .transport(transport)
            .build();
        MongoFetchClient::new("logs", options).unwrap()
    }

    #[test]
    fn test_client_options_default() {
        let options = ClientOptions::default();
        assert!(options.url.is_empty());
        assert!(options.api_key.is_empty());
        assert!(options.transport.is_none());
        assert_eq!(options.request_encoding, Encoding::Extended);
        assert!(options.timeout.is_none());
        assert!(options.cache_ttl.is_none());
    }

    #[test]
    fn test_client_options_builder() {
        let options = ClientOptions::builder()
            .url("http://localhost")
            .api_key("key")
            .request_encoding(Encoding::Plain)
            .timeout(Duration::from_secs(5))
            .cache_ttl("10m")
            .build();

        assert_eq!(options.url, "http://localhost");
        assert_eq!(options.api_key, "key");
        assert_eq!(options.request_encoding, Encoding::Plain);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.cache_ttl.as_deref(), Some("10m"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let options = ClientOptions::builder().api_key("super-secret").build();
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_new_without_transport_fails_fast() {
        let options = ClientOptions::builder()
            .url("http://localhost")
            .api_key("key")
            .build();
        let err = MongoFetchClient::new("logs", options).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_connect_and_close_are_noops() {
        let transport = ScriptedTransport::new();
        let client = client(transport.clone());

        client.connect().await.unwrap();
        client.close().await.unwrap();
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_handles_do_no_io() {
        let transport = ScriptedTransport::new();
        let client = client(transport.clone());

        let db = client.db("test");
        let _collection = db.collection_with_doc("items");
        assert_eq!(db.name(), "test");
        assert_eq!(client.data_source(), "logs");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_databases() {
        let transport = ScriptedTransport::new();
        transport.push_json(json!({ "databases": [{ "name": "logs" }, { "name": "test" }] }));
        transport.push_json(json!({ "databases": [{ "name": "logs" }] }));
        let client = client(transport.clone());

        let databases = client.list_databases().await.unwrap();
        assert_eq!(databases.len(), 2);
        assert_eq!(databases[0].get_str("name").unwrap(), "logs");

        let names = client.list_database_names().await.unwrap();
        assert_eq!(names, vec!["logs".to_string()]);

        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:3000/api/v1/action/listDatabases"
        );
        assert_eq!(transport.body(0), json!({ "dataSource": "logs" }));
    }

    #[test]
    fn test_documents_field_shapes() {
        assert!(documents_field(&doc! {}, "documents").unwrap().is_empty());
        assert!(documents_field(&doc! { "documents": null }, "documents")
            .unwrap()
            .is_empty());
        assert!(documents_field(&doc! { "documents": 5 }, "documents").is_err());
        assert!(documents_field(&doc! { "documents": [1] }, "documents").is_err());
    }
}
