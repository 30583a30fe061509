//! Error types for Data API operations.

use thiserror::Error;

/// All errors that can occur while talking to the Data API.
#[derive(Debug, Error)]
pub enum MongoFetchError {
    /// Missing or invalid construction-time configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The action endpoint answered with a non-success status.
    #[error("remote command error: {code} {message}")]
    Remote {
        /// HTTP status of the response.
        status: u16,
        /// Leading token of the server message.
        code: String,
        /// Remainder of the server message.
        message: String,
    },

    /// A TTL token used a unit outside `s`, `m`, `h`, `d`, `w`.
    #[error("invalid TTL unit: {0}")]
    InvalidTtlUnit(char),

    /// A TTL token could not be represented in seconds.
    #[error("invalid TTL: {0}")]
    InvalidTtl(String),

    /// Response body did not parse as its declared encoding.
    #[error("codec error: {0}")]
    Codec(String),

    /// The injected transport failed before a response was produced.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl MongoFetchError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        MongoFetchError::Configuration(msg.into())
    }

    /// Create a remote command error.
    pub fn remote(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        MongoFetchError::Remote {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a codec error.
    pub fn codec(msg: impl Into<String>) -> Self {
        MongoFetchError::Codec(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        MongoFetchError::Transport(msg.into())
    }

    /// Check if this error came back from the action endpoint.
    pub fn is_remote(&self) -> bool {
        matches!(self, MongoFetchError::Remote { .. })
    }

    /// Check if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, MongoFetchError::Configuration(_))
    }

    /// Get the remote error code if available.
    pub fn code(&self) -> Option<&str> {
        match self {
            MongoFetchError::Remote { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Get the HTTP status if available.
    pub fn status(&self) -> Option<u16> {
        match self {
            MongoFetchError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            MongoFetchError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for MongoFetchError {
    fn from(err: serde_json::Error) -> Self {
        MongoFetchError::Serialization(err.to_string())
    }
}

impl From<bson::ser::Error> for MongoFetchError {
    fn from(err: bson::ser::Error) -> Self {
        MongoFetchError::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for MongoFetchError {
    fn from(err: bson::de::Error) -> Self {
        MongoFetchError::Deserialization(err.to_string())
    }
}

impl From<bson::extjson::de::Error> for MongoFetchError {
    fn from(err: bson::extjson::de::Error) -> Self {
        MongoFetchError::Codec(err.to_string())
    }
}

#[cfg(feature = "reqwest-transport")]
impl From<reqwest::Error> for MongoFetchError {
    fn from(err: reqwest::Error) -> Self {
        MongoFetchError::Transport(err.to_string())
    }
}

/// Result type alias for Data API operations.
pub type Result<T> = std::result::Result<T, MongoFetchError>;

/// Error kind enumeration for pattern matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration error.
    Configuration,
    /// Remote command error.
    Command,
    /// TTL parse error.
    Ttl,
    /// Wire format error.
    Codec,
    /// Transport error.
    Network,
    /// Serialization error.
    Serialization,
}

impl MongoFetchError {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MongoFetchError::Configuration(_) => ErrorKind::Configuration,
            MongoFetchError::Remote { .. } => ErrorKind::Command,
            MongoFetchError::InvalidTtlUnit(_) | MongoFetchError::InvalidTtl(_) => ErrorKind::Ttl,
            MongoFetchError::Codec(_) => ErrorKind::Codec,
            MongoFetchError::Transport(_) => ErrorKind::Network,
            MongoFetchError::Serialization(_) | MongoFetchError::Deserialization(_) => {
                ErrorKind::Serialization
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = MongoFetchError::remote(409, "409", "duplicate key");
        assert_eq!(err.to_string(), "remote command error: 409 duplicate key");
        assert_eq!(err.code(), Some("409"));
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.message(), "duplicate key");
    }

    #[test]
    fn test_configuration_error() {
        let err = MongoFetchError::configuration("missing transport");
        assert!(err.is_configuration_error());
        assert!(!err.is_remote());
        assert_eq!(err.code(), None);
        assert_eq!(err.message(), "configuration error: missing transport");
    }

    #[test]
    fn test_invalid_ttl_unit_display() {
        let err = MongoFetchError::InvalidTtlUnit('x');
        assert_eq!(err.to_string(), "invalid TTL unit: x");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            MongoFetchError::configuration("test").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            MongoFetchError::remote(500, "500", "boom").kind(),
            ErrorKind::Command
        );
        assert_eq!(MongoFetchError::InvalidTtlUnit('q').kind(), ErrorKind::Ttl);
        assert_eq!(MongoFetchError::codec("bad").kind(), ErrorKind::Codec);
        assert_eq!(MongoFetchError::transport("down").kind(), ErrorKind::Network);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: MongoFetchError = json_err.into();
        assert!(matches!(err, MongoFetchError::Serialization(_)));
    }
}
