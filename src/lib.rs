//! # mongo-fetch
//!
//! A MongoDB driver-shaped client for the stateless HTTP Data API.
//!
//! Code written against the familiar client → database → collection →
//! cursor object graph runs over plain HTTPS: every materialization point
//! becomes exactly one POST to `{url}/v1/action/{action}`, and responses
//! (plain or extended JSON) are reinflated into BSON values.
//!
//! ## Features
//!
//! - Driver-like handles (`MongoFetchClient`, `Database`, `Collection`)
//! - Lazy cursors: `limit`, `skip`, `sort` and `project` never touch the network
//! - Extended JSON on the wire, so object ids and dates survive the trip
//! - Remote errors carry the server's leading code token
//! - Injectable transport; `reqwest` ships behind the default feature
//! - Opt-in TTL response cache
//!
//! ## Quick Start
//!
//! ```ignore
//! use mongo_fetch::{doc, ClientOptions, MongoFetchClient, ReqwestTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> mongo_fetch::Result<()> {
//!     let options = ClientOptions::builder()
//!         .url("https://data.mongodb-api.com/app/data-abc/endpoint/data")
//!         .api_key(std::env::var("MONGO_FETCH_API_KEY").unwrap_or_default())
//!         .transport(Arc::new(ReqwestTransport::new()))
//!         .build();
//!     let client = MongoFetchClient::new("Cluster0", options)?;
//!
//!     let items = client.db("test").collection_with_doc("items");
//!     items.insert_one(doc! { "hello": "world", "i": 1 }).await?;
//!
//!     let latest = items
//!         .find(doc! {})
//!         .sort(doc! { "i": -1 })
//!         .limit(1)
//!         .to_array()
//!         .await?;
//!     println!("{:?}", latest);
//!
//!     items.delete_many(doc! { "hello": "world" }).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod collection;
pub mod cursor;
pub mod db;
pub mod error;
pub mod executor;
pub mod transport;
pub mod ttl;

// Re-export main types
pub use client::{Client, ClientOptions, ClientOptionsBuilder, MongoFetchClient};
pub use codec::{decode_response, Encoding, ResponseFormat};
pub use collection::{Collection, DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};
pub use cursor::{AggregateCursor, Cursor, CursorQuery, FindModifiers, PullStrategy, RefetchPull};
pub use db::Database;
pub use error::{ErrorKind, MongoFetchError, Result};
pub use executor::{Action, Executor};
#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
pub use transport::{HttpRequest, HttpResponse, Transport};
pub use ttl::parse_ttl;

// Re-export bson for convenience
pub use bson;
pub use bson::doc;

/// Prelude module for common imports.
pub mod prelude {
    pub use super::client::{ClientOptions, MongoFetchClient};
    pub use super::collection::{
        Collection, DeleteResult, InsertManyResult, InsertOneResult, UpdateResult,
    };
    pub use super::cursor::{AggregateCursor, Cursor};
    pub use super::db::Database;
    pub use super::error::{ErrorKind, MongoFetchError, Result};
    pub use super::transport::Transport;
    pub use bson::{doc, Document};
    pub use serde::{Deserialize, Serialize};
}

/// Get the SDK version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _: Result<()> = Ok(());
        let document: Document = doc! { "test": 1 };
        assert_eq!(document.get_i32("test").unwrap(), 1);
    }

    #[test]
    fn test_error_kind_variants() {
        let _ = ErrorKind::Configuration;
        let _ = ErrorKind::Command;
        let _ = ErrorKind::Ttl;
        let _ = ErrorKind::Codec;
        let _ = ErrorKind::Network;
        let _ = ErrorKind::Serialization;
    }
}
