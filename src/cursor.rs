//! Lazy query cursors.
//!
//! A cursor is a client-side query builder. Chaining modifiers never touches
//! the network; only [`Cursor::to_array`] and [`Cursor::next`] send a
//! command, and each of them re-sends the full command. There is no server
//! side cursor state.

use crate::client::documents_field;
use crate::error::{MongoFetchError, Result};
use crate::executor::{Action, Executor};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::Stream;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Query modifiers accumulated by a find cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindModifiers {
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Sort order.
    pub sort: Option<Document>,
    /// Projection (fields to include/exclude).
    pub projection: Option<Document>,
}

impl FindModifiers {
    /// Append the set modifiers to a command, in a fixed order.
    fn apply(&self, command: &mut Document) {
        if let Some(limit) = self.limit {
            command.insert("limit", limit);
        }
        if let Some(skip) = self.skip {
            command.insert("skip", i64::try_from(skip).unwrap_or(i64::MAX));
        }
        if let Some(ref sort) = self.sort {
            command.insert("sort", sort.clone());
        }
        if let Some(ref projection) = self.projection {
            command.insert("projection", projection.clone());
        }
    }
}

/// A compiled cursor command, ready to execute.
#[derive(Debug, Clone)]
pub struct CursorQuery {
    executor: Executor,
    action: Action,
    command: Document,
}

impl CursorQuery {
    /// The action this query runs under.
    pub fn action(&self) -> Action {
        self.action
    }

    /// The command body, before the data source is injected.
    pub fn command(&self) -> &Document {
        &self.command
    }

    /// Execute the command and return the `documents` array.
    pub async fn fetch(&self) -> Result<Vec<Document>> {
        let response = self
            .executor
            .execute(self.action, self.command.clone())
            .await?;
        documents_field(&response, "documents")
    }
}

/// Decides how a cursor produces its next document.
#[async_trait]
pub trait PullStrategy: Send + Sync {
    /// Produce the next document, or `None` when exhausted.
    async fn pull(&mut self, query: &CursorQuery) -> Result<Option<Document>>;
}

/// Re-runs the whole query on every pull and indexes into the result.
///
/// Each call costs a full round trip, and results are only consistent if the
/// remote result set does not change between pulls.
#[derive(Debug, Default)]
pub struct RefetchPull {
    position: usize,
}

impl RefetchPull {
    /// Zero-based index of the next document to return.
    pub fn position(&self) -> usize {
        self.position
    }
}

#[async_trait]
impl PullStrategy for RefetchPull {
    async fn pull(&mut self, query: &CursorQuery) -> Result<Option<Document>> {
        let mut documents = query.fetch().await?;
        if self.position >= documents.len() {
            return Ok(None);
        }

        let document = documents.swap_remove(self.position);
        self.position += 1;
        Ok(Some(document))
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> Result<T> {
    Ok(bson::from_document(document)?)
}

fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>> {
    documents.into_iter().map(decode).collect()
}

/// A find cursor.
///
/// # Example
///
/// ```ignore
/// let docs = collection
///     .find(doc! { "status": "active" })
///     .sort(doc! { "i": -1 })
///     .skip(10)
///     .limit(5)
///     .to_array()
///     .await?;
/// ```
pub struct Cursor<T> {
    executor: Executor,
    db_name: String,
    collection: String,
    filter: Document,
    options: Document,
    modifiers: FindModifiers,
    pull: Box<dyn PullStrategy>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("namespace", &format!("{}.{}", self.db_name, self.collection))
            .field("filter", &self.filter)
            .field("options", &self.options)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

impl<T> Cursor<T> {
    pub(crate) fn new(
        executor: Executor,
        db_name: String,
        collection: String,
        filter: Document,
        options: Document,
    ) -> Self {
        Self {
            executor,
            db_name,
            collection,
            filter,
            options,
            modifiers: FindModifiers::default(),
            pull: Box::new(RefetchPull::default()),
            _marker: PhantomData,
        }
    }

    /// Limit the number of documents returned.
    pub fn limit(mut self, limit: i64) -> Self {
        self.modifiers.limit = Some(limit);
        self
    }

    /// Skip documents before returning results.
    pub fn skip(mut self, skip: u64) -> Self {
        self.modifiers.skip = Some(skip);
        self
    }

    /// Set the sort order.
    pub fn sort(mut self, sort: Document) -> Self {
        self.modifiers.sort = Some(sort);
        self
    }

    /// Set the projection.
    pub fn project(mut self, projection: Document) -> Self {
        self.modifiers.projection = Some(projection);
        self
    }

    /// Replace how [`Cursor::next`] pulls documents.
    pub fn with_pull_strategy(mut self, strategy: impl PullStrategy + 'static) -> Self {
        self.pull = Box::new(strategy);
        self
    }

    /// The accumulated modifiers.
    pub fn modifiers(&self) -> &FindModifiers {
        &self.modifiers
    }

    /// Compile the `find` command without sending it.
    pub fn command(&self) -> Document {
        let mut command = doc! {
            "database": self.db_name.as_str(),
            "collection": self.collection.as_str(),
            "filter": self.filter.clone(),
            "options": self.options.clone(),
        };
        self.modifiers.apply(&mut command);
        command
    }

    /// Compile the cursor into an executable query.
    pub fn query(&self) -> CursorQuery {
        CursorQuery {
            executor: self.executor.clone(),
            action: Action::Find,
            command: self.command(),
        }
    }
}

impl<T: DeserializeOwned + Send + Unpin + 'static> Cursor<T> {
    /// Run the query and return every matching document.
    ///
    /// Each call sends the command again.
    pub async fn to_array(&self) -> Result<Vec<T>> {
        decode_all(self.query().fetch().await?)
    }

    /// Return the next document, or `None` once the results run out.
    pub async fn next(&mut self) -> Result<Option<T>> {
        let query = self.query();
        match self.pull.pull(&query).await? {
            Some(document) => decode(document).map(Some),
            None => Ok(None),
        }
    }

    /// Alias for [`Cursor::next`].
    pub async fn try_next(&mut self) -> Result<Option<T>> {
        self.next().await
    }

    /// Turn the cursor into a stream of documents.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await?;
            Ok::<_, MongoFetchError>(next.map(|document| (document, cursor)))
        })
    }
}

/// An aggregation cursor.
pub struct AggregateCursor<T> {
    executor: Executor,
    db_name: String,
    collection: String,
    pipeline: Vec<Document>,
    options: Document,
    pull: Box<dyn PullStrategy>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for AggregateCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateCursor")
            .field("namespace", &format!("{}.{}", self.db_name, self.collection))
            .field("pipeline", &self.pipeline)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T> AggregateCursor<T> {
    pub(crate) fn new(
        executor: Executor,
        db_name: String,
        collection: String,
        pipeline: Vec<Document>,
        options: Document,
    ) -> Self {
        Self {
            executor,
            db_name,
            collection,
            pipeline,
            options,
            pull: Box::new(RefetchPull::default()),
            _marker: PhantomData,
        }
    }

    /// Replace how [`AggregateCursor::next`] pulls documents.
    pub fn with_pull_strategy(mut self, strategy: impl PullStrategy + 'static) -> Self {
        self.pull = Box::new(strategy);
        self
    }

    /// Compile the `aggregate` command without sending it.
    pub fn command(&self) -> Document {
        let pipeline: Vec<Bson> = self
            .pipeline
            .iter()
            .cloned()
            .map(Bson::Document)
            .collect();
        doc! {
            "database": self.db_name.as_str(),
            "collection": self.collection.as_str(),
            "pipeline": pipeline,
            "options": self.options.clone(),
        }
    }

    /// Compile the cursor into an executable query.
    pub fn query(&self) -> CursorQuery {
        CursorQuery {
            executor: self.executor.clone(),
            action: Action::Aggregate,
            command: self.command(),
        }
    }
}

impl<T: DeserializeOwned + Send + Unpin + 'static> AggregateCursor<T> {
    /// Run the pipeline and return every resulting document.
    pub async fn to_array(&self) -> Result<Vec<T>> {
        decode_all(self.query().fetch().await?)
    }

    /// Return the next document, or `None` once the results run out.
    pub async fn next(&mut self) -> Result<Option<T>> {
        let query = self.query();
        match self.pull.pull(&query).await? {
            Some(document) => decode(document).map(Some),
            None => Ok(None),
        }
    }

    /// Turn the cursor into a stream of documents.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await?;
            Ok::<_, MongoFetchError>(next.map(|document| (document, cursor)))
        })
    }
}
