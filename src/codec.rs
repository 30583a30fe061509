//! Wire encoding for commands and responses.
//!
//! Requests are encoded under a fixed per-client [`Encoding`] policy.
//! Responses are decoded according to the content type the server declares,
//! see [`ResponseFormat`].

use crate::error::{MongoFetchError, Result};
use base64::Engine;
use bson::{Bson, Document};
use serde_json::Value as JsonValue;

/// Content type announcing an extended JSON body.
pub const EJSON_CONTENT_TYPE: &str = "application/ejson";

/// Content type announcing a plain JSON body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Request body encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Relaxed extended JSON; object ids, dates and binary survive the trip.
    #[default]
    Extended,
    /// Plain JSON; non-JSON types are flattened to strings.
    Plain,
}

impl Encoding {
    /// Serialize a command into a request body.
    pub fn encode(&self, command: &Document) -> Result<Vec<u8>> {
        let value = match self {
            Encoding::Extended => to_extended_json(command),
            Encoding::Plain => bson_to_plain_json(&Bson::Document(command.clone())),
        };
        Ok(serde_json::to_vec(&value)?)
    }
}

/// How a response body should be decoded, derived from its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `application/json`.
    Plain,
    /// `application/ejson`.
    Extended,
    /// Anything else, including a missing header. Decoded as plain JSON.
    Unrecognized(String),
}

impl ResponseFormat {
    /// Classify a `Content-Type` header value.
    ///
    /// Matching ignores case and any `;` parameters.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let raw = content_type.unwrap_or_default();
        let essence = raw.split(';').next().unwrap_or_default().trim();

        if essence.eq_ignore_ascii_case(EJSON_CONTENT_TYPE) {
            ResponseFormat::Extended
        } else if essence.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            ResponseFormat::Plain
        } else {
            ResponseFormat::Unrecognized(raw.to_string())
        }
    }

    /// Decode a response body under this format.
    pub fn decode(&self, body: &[u8]) -> Result<Document> {
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|e| MongoFetchError::codec(format!("malformed response body: {}", e)))?;

        let bson = match self {
            ResponseFormat::Extended => Bson::try_from(value)?,
            ResponseFormat::Plain | ResponseFormat::Unrecognized(_) => plain_json_to_bson(value),
        };

        match bson {
            Bson::Document(doc) => Ok(doc),
            other => Err(MongoFetchError::codec(format!(
                "expected a document body, got {:?}",
                other.element_type()
            ))),
        }
    }
}

/// Decode a response body, picking the strategy from its content type.
pub fn decode_response(content_type: Option<&str>, body: &[u8]) -> Result<Document> {
    ResponseFormat::from_content_type(content_type).decode(body)
}

/// Render a document as relaxed extended JSON.
pub(crate) fn to_extended_json(doc: &Document) -> JsonValue {
    Bson::Document(doc.clone()).into_relaxed_extjson()
}

/// Convert a BSON value to plain JSON, flattening types JSON cannot hold.
fn bson_to_plain_json(bson: &Bson) -> JsonValue {
    match bson {
        Bson::Double(v) => serde_json::json!(*v),
        Bson::String(v) => JsonValue::String(v.clone()),
        Bson::Array(arr) => JsonValue::Array(arr.iter().map(bson_to_plain_json).collect()),
        Bson::Document(doc) => {
            let mut map = serde_json::Map::new();
            for (k, v) in doc {
                map.insert(k.clone(), bson_to_plain_json(v));
            }
            JsonValue::Object(map)
        }
        Bson::Boolean(v) => JsonValue::Bool(*v),
        Bson::Null | Bson::Undefined => JsonValue::Null,
        Bson::Int32(v) => serde_json::json!(*v),
        Bson::Int64(v) => serde_json::json!(*v),
        Bson::ObjectId(oid) => JsonValue::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => JsonValue::String(s),
            Err(_) => serde_json::json!(dt.timestamp_millis()),
        },
        Bson::Binary(bin) => {
            JsonValue::String(base64::engine::general_purpose::STANDARD.encode(&bin.bytes))
        }
        Bson::Symbol(s) | Bson::JavaScriptCode(s) => JsonValue::String(s.clone()),
        other => JsonValue::String(other.to_string()),
    }
}

/// Convert plain JSON to BSON without interpreting `$`-prefixed wrappers.
fn plain_json_to_bson(json: JsonValue) -> Bson {
    match json {
        JsonValue::Null => Bson::Null,
        JsonValue::Bool(v) => Bson::Boolean(v),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => Bson::Int32(small),
                    Err(_) => Bson::Int64(i),
                }
            } else if let Some(f) = n.as_f64() {
                Bson::Double(f)
            } else {
                Bson::Null
            }
        }
        JsonValue::String(s) => Bson::String(s),
        JsonValue::Array(arr) => Bson::Array(arr.into_iter().map(plain_json_to_bson).collect()),
        JsonValue::Object(obj) => {
            let mut doc = Document::new();
            for (k, v) in obj {
                doc.insert(k, plain_json_to_bson(v));
            }
            Bson::Document(doc)
        }
    }
}
