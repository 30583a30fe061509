//! Database handle.

use crate::client::{documents_field, names};
use crate::collection::Collection;
use crate::error::Result;
use crate::executor::{Action, Executor};
use bson::{doc, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A handle to a database behind the Data API.
///
/// Holds only the database name and a shared executor; creating one sends
/// nothing.
#[derive(Debug, Clone)]
pub struct Database {
    /// Database name.
    pub(crate) name: String,
    /// Shared executor.
    pub(crate) executor: Executor,
}

impl Database {
    /// Create a new database handle.
    pub(crate) fn new(name: String, executor: Executor) -> Self {
        Self { name, executor }
    }

    /// Get the database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A collection whose documents decode into `T`.
    ///
    /// ```ignore
    /// #[derive(Serialize, Deserialize)]
    /// struct Reading { sensor: String, value: f64 }
    ///
    /// let readings = client.db("telemetry").collection::<Reading>("readings");
    /// ```
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static,
    {
        Collection::new(self.name.clone(), name.to_string(), self.executor.clone())
    }

    /// A collection of raw documents.
    pub fn collection_with_doc(&self, name: &str) -> Collection<Document> {
        Collection::new(self.name.clone(), name.to_string(), self.executor.clone())
    }

    /// List the collections in this database.
    pub async fn list_collections(&self) -> Result<Vec<Document>> {
        let response = self
            .executor
            .execute(Action::ListCollections, doc! { "database": self.name.as_str() })
            .await?;
        documents_field(&response, "collections")
    }

    /// List collection names in this database.
    pub async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(names(self.list_collections().await?))
    }
}
