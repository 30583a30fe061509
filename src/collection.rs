//! Collection handle with CRUD operations.

use crate::cursor::{AggregateCursor, Cursor};
use crate::error::{MongoFetchError, Result};
use crate::executor::{Action, Executor};
use bson::{doc, Bson, Document};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;

/// Result of an insert_one operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    /// Always `true` once the endpoint answered successfully.
    pub acknowledged: bool,
    /// The ID of the inserted document.
    #[serde(default)]
    pub inserted_id: Bson,
}

/// Result of an insert_many operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResult {
    /// Always `true` once the endpoint answered successfully.
    pub acknowledged: bool,
    /// IDs of the inserted documents, in input order.
    #[serde(default)]
    pub inserted_ids: Vec<Bson>,
}

/// Result of an update operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Always `true` once the endpoint answered successfully.
    pub acknowledged: bool,
    /// Number of documents matched.
    #[serde(default)]
    pub matched_count: u64,
    /// Number of documents modified.
    #[serde(default)]
    pub modified_count: u64,
    /// The ID of the upserted document, if any.
    #[serde(default)]
    pub upserted_id: Option<Bson>,
}

/// Result of a delete operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Always `true` once the endpoint answered successfully.
    pub acknowledged: bool,
    /// Number of documents deleted.
    #[serde(default)]
    pub deleted_count: u64,
}

/// A handle to a collection.
///
/// # Example
///
/// ```ignore
/// use mongo_fetch::doc;
///
/// let items = client.database("test").collection_with_doc("items");
///
/// items.insert_one(doc! { "hello": "world" }).await?;
/// let first = items.find(doc! {}).sort(doc! { "i": -1 }).limit(1).to_array().await?;
/// ```
pub struct Collection<T = Document> {
    /// Database name.
    db_name: String,
    /// Collection name.
    name: String,
    /// Shared executor.
    executor: Executor,
    /// Type marker.
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace())
            .finish_non_exhaustive()
    }
}

impl<T> Collection<T> {
    /// Create a new collection handle.
    pub(crate) fn new(db_name: String, name: String, executor: Executor) -> Self {
        Self {
            db_name,
            name,
            executor,
            _marker: PhantomData,
        }
    }

    /// Get the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the database name.
    pub fn database_name(&self) -> &str {
        &self.db_name
    }

    /// Get the full namespace (db.collection).
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.db_name, self.name)
    }

    /// Clone this collection with a new type parameter.
    pub fn clone_with_type<U>(&self) -> Collection<U> {
        Collection::new(self.db_name.clone(), self.name.clone(), self.executor.clone())
    }

    /// `{database, collection}`, the prefix of every command.
    fn command(&self) -> Document {
        doc! {
            "database": self.db_name.as_str(),
            "collection": self.name.as_str(),
        }
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        self.clone_with_type()
    }
}

impl<T: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static> Collection<T> {
    /// Start a find cursor. No request is sent until the cursor is read.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let docs = collection.find(doc! { "status": "active" }).limit(10).to_array().await?;
    /// ```
    pub fn find(&self, filter: impl Into<Option<Document>>) -> Cursor<T> {
        self.find_with_options(filter, None)
    }

    /// Start a find cursor with a driver options document.
    pub fn find_with_options(
        &self,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<Document>>,
    ) -> Cursor<T> {
        Cursor::new(
            self.executor.clone(),
            self.db_name.clone(),
            self.name.clone(),
            filter.into().unwrap_or_default(),
            options.into().unwrap_or_default(),
        )
    }

    /// Start an aggregation cursor.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pipeline = vec![
    ///     doc! { "$match": { "hello": "world" } },
    ///     doc! { "$group": { "_id": null, "total": { "$sum": "$i" } } },
    /// ];
    /// let groups = collection.aggregate(pipeline).to_array().await?;
    /// ```
    pub fn aggregate(&self, pipeline: impl IntoIterator<Item = Document>) -> AggregateCursor<Document> {
        self.aggregate_with_options(pipeline, None)
    }

    /// Start an aggregation cursor with a driver options document.
    pub fn aggregate_with_options(
        &self,
        pipeline: impl IntoIterator<Item = Document>,
        options: impl Into<Option<Document>>,
    ) -> AggregateCursor<Document> {
        AggregateCursor::new(
            self.executor.clone(),
            self.db_name.clone(),
            self.name.clone(),
            pipeline.into_iter().collect(),
            options.into().unwrap_or_default(),
        )
    }

    /// Return the `document` field of a `findOne` action, or `None` when the
    /// server matched nothing.
    pub async fn find_one(&self, filter: impl Into<Option<Document>>) -> Result<Option<T>> {
        self.find_one_with_options(filter, None, None).await
    }

    /// Find a single document with a projection and options.
    pub async fn find_one_with_options(
        &self,
        filter: impl Into<Option<Document>>,
        projection: impl Into<Option<Document>>,
        options: impl Into<Option<Document>>,
    ) -> Result<Option<T>> {
        let mut command = self.command();
        command.insert("filter", filter.into().unwrap_or_default());
        if let Some(projection) = projection.into() {
            command.insert("projection", projection);
        }
        if let Some(options) = options.into() {
            command.insert("options", options);
        }

        let response = self.executor.execute(Action::FindOne, command).await?;

        match response.get("document") {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::Document(document)) => Ok(Some(bson::from_document(document.clone())?)),
            Some(other) => Err(MongoFetchError::Deserialization(format!(
                "expected `document` to be a document, found {:?}",
                other.element_type()
            ))),
        }
    }

    /// Insert a single document.
    ///
    /// When the document has no `_id` the server generates an ObjectId,
    /// which comes back in `inserted_id` if the response is extended JSON.
    pub async fn insert_one(&self, doc: impl Into<T>) -> Result<InsertOneResult> {
        let document: T = doc.into();
        let mut command = self.command();
        command.insert("document", bson::to_document(&document)?);

        let response = self.executor.execute(Action::InsertOne, command).await?;
        acknowledged(response)
    }

    /// Insert multiple documents.
    pub async fn insert_many(&self, docs: impl IntoIterator<Item = T>) -> Result<InsertManyResult> {
        let documents: Vec<Bson> = docs
            .into_iter()
            .map(|d| bson::to_document(&d).map(Bson::Document))
            .collect::<std::result::Result<_, _>>()?;

        let mut command = self.command();
        command.insert("documents", documents);

        let response = self.executor.execute(Action::InsertMany, command).await?;
        acknowledged(response)
    }

    /// Apply `update` to the first document matching `filter`.
    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.update_one_with_options(filter, update, None).await
    }

    /// Update a single document with options such as `upsert`.
    pub async fn update_one_with_options(
        &self,
        filter: Document,
        update: Document,
        options: impl Into<Option<Document>>,
    ) -> Result<UpdateResult> {
        self.update(Action::UpdateOne, filter, update, options.into())
            .await
    }

    /// Update multiple documents.
    pub async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.update_many_with_options(filter, update, None).await
    }

    /// Update multiple documents with options such as `upsert`.
    pub async fn update_many_with_options(
        &self,
        filter: Document,
        update: Document,
        options: impl Into<Option<Document>>,
    ) -> Result<UpdateResult> {
        self.update(Action::UpdateMany, filter, update, options.into())
            .await
    }

    async fn update(
        &self,
        action: Action,
        filter: Document,
        update: Document,
        options: Option<Document>,
    ) -> Result<UpdateResult> {
        let mut command = self.command();
        command.insert("filter", filter);
        command.insert("update", update);
        if let Some(options) = options {
            command.insert("options", options);
        }

        let response = self.executor.execute(action, command).await?;
        acknowledged(response)
    }

    /// Delete a single document.
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult> {
        self.delete(Action::DeleteOne, filter).await
    }

    /// Delete multiple documents.
    pub async fn delete_many(&self, filter: Document) -> Result<DeleteResult> {
        self.delete(Action::DeleteMany, filter).await
    }

    async fn delete(&self, action: Action, filter: Document) -> Result<DeleteResult> {
        let mut command = self.command();
        command.insert("filter", filter);

        let response = self.executor.execute(action, command).await?;
        acknowledged(response)
    }

    /// Count documents matching a filter.
    ///
    /// Without a filter this counts documents where `_id` exists, which the
    /// server can answer from the `_id` index.
    pub async fn count_documents(&self, filter: impl Into<Option<Document>>) -> Result<u64> {
        let filter = filter
            .into()
            .unwrap_or_else(|| doc! { "_id": { "$exists": true } });

        let mut command = self.command();
        command.insert("filter", filter);

        let response = self.executor.execute(Action::CountDocuments, command).await?;
        count_field(&response)
    }

    /// Count every document in the collection, without a filter.
    pub async fn estimated_document_count(&self) -> Result<u64> {
        let response = self
            .executor
            .execute(Action::EstimatedDocumentCount, self.command())
            .await?;
        count_field(&response)
    }
}

/// Mark a write response as acknowledged and read it as a result type.
fn acknowledged<R: DeserializeOwned>(mut response: Document) -> Result<R> {
    response.insert("acknowledged", true);
    Ok(bson::from_document(response)?)
}

fn count_field(response: &Document) -> Result<u64> {
    let count = match response.get("count") {
        Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
        Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
        Some(Bson::Double(n)) if n.fract() == 0.0 && *n >= 0.0 => Some(*n as u64),
        _ => None,
    };
    count.ok_or_else(|| MongoFetchError::Deserialization("expected `count` as a number".to_string()))
}
