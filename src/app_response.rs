use std::fmt::{Display, Formatter};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::error::LibraryError;
use crate::storage::StorageError;

/// Result record handed back to the presentation layer.
///
/// Serializes as `{"status":"ok", ...body}` on success and as
/// `{"status":"error","error":"<Kind>","message":"..."}` on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum AppResponse {
    Ok(Map<String, JsonValue>),
    DuplicateKey(String),
    NotFound(String),
    Unavailable(String),
    HasActiveReferences(String),
    InvalidFormat(String),
    ValidationError(String),
    BadRequest(String),
    DatabaseError(String),
    SerializationError(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::Ok(body) => match body.get("message").and_then(JsonValue::as_str) {
                Some(msg) => write!(f, "Ok: {}", msg),
                None => write!(f, "Ok"),
            },
            AppResponse::DuplicateKey(msg) => write!(f, "Duplicate key: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
            AppResponse::HasActiveReferences(msg) => write!(f, "Has active references: {}", msg),
            AppResponse::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Serialize for AppResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AppResponse::Ok(body) => {
                let mut map = serializer.serialize_map(Some(body.len() + 1))?;
                map.serialize_entry("status", "ok")?;
                for (key, value) in body.iter().filter(|(key, _)| key.as_str() != "status") {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            _ => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("status", "error")?;
                map.serialize_entry("error", self.kind())?;
                map.serialize_entry("message", self.message().unwrap_or_default())?;
                map.end()
            }
        }
    }
}

impl From<LibraryError> for AppResponse {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::DuplicateKey(msg) => AppResponse::DuplicateKey(msg),
            LibraryError::NotFound(msg) => AppResponse::NotFound(msg),
            LibraryError::Unavailable(msg) => AppResponse::Unavailable(msg),
            LibraryError::HasActiveReferences(msg) => AppResponse::HasActiveReferences(msg),
            LibraryError::InvalidFormat(msg) => AppResponse::InvalidFormat(msg),
            LibraryError::Validation(msg) => AppResponse::ValidationError(msg),
            LibraryError::BadRequest(msg) => AppResponse::BadRequest(msg),
            LibraryError::Storage(e) => AppResponse::from(e),
            LibraryError::Serialization(e) => {
                AppResponse::SerializationError(format!("JSON serialization error: {}", e))
            }
        }
    }
}

impl From<StorageError> for AppResponse {
    fn from(err: StorageError) -> Self {
        AppResponse::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppResponse {
    fn from(err: serde_json::Error) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl AppResponse {
    /// Success carrying only a message.
    pub fn success(msg: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("message".to_string(), JsonValue::String(msg.into()));
        AppResponse::Ok(body)
    }

    /// Success carrying a body. Adds `message` when given.
    pub fn with_body(msg: Option<&str>, fields: impl IntoIterator<Item = (&'static str, JsonValue)>) -> Self {
        let mut body = Map::new();
        if let Some(msg) = msg {
            body.insert("message".to_string(), JsonValue::String(msg.to_string()));
        }
        for (key, value) in fields {
            body.insert(key.to_string(), value);
        }
        AppResponse::Ok(body)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AppResponse::Ok(_))
    }

    /// Error kind name as it appears in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppResponse::Ok(_) => "Ok",
            AppResponse::DuplicateKey(_) => "DuplicateKey",
            AppResponse::NotFound(_) => "NotFound",
            AppResponse::Unavailable(_) => "Unavailable",
            AppResponse::HasActiveReferences(_) => "HasActiveReferences",
            AppResponse::InvalidFormat(_) => "InvalidFormat",
            AppResponse::ValidationError(_) => "ValidationError",
            AppResponse::BadRequest(_) => "BadRequest",
            AppResponse::DatabaseError(_) => "DatabaseError",
            AppResponse::SerializationError(_) => "SerializationError",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AppResponse::Ok(body) => body.get("message").and_then(JsonValue::as_str),
            AppResponse::DuplicateKey(msg)
            | AppResponse::NotFound(msg)
            | AppResponse::Unavailable(msg)
            | AppResponse::HasActiveReferences(msg)
            | AppResponse::InvalidFormat(msg)
            | AppResponse::ValidationError(msg)
            | AppResponse::BadRequest(msg)
            | AppResponse::DatabaseError(msg)
            | AppResponse::SerializationError(msg) => Some(msg.as_str()),
        }
    }

    /// Field of a success body.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            AppResponse::Ok(body) => body.get(key),
            _ => None,
        }
    }
}
