use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `extensions.code` value the backend uses for a missing or rejected token
pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";

/// A structured error returned inside an otherwise delivered response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

impl GraphQLError {
    /// Machine-readable classification, if the server sent one
    pub fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.code() == Some(UNAUTHENTICATED)
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// Body of a delivered GraphQL response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

impl Response {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// First error classified as an authentication failure
    pub fn unauthenticated_error(&self) -> Option<&GraphQLError> {
        self.errors.iter().find(|e| e.is_unauthenticated())
    }

    /// Decode `data.<field>`, failing with the response's errors if any.
    pub fn decode_field<T: DeserializeOwned>(&self, field: &str) -> Result<T, super::PipelineError> {
        if self.has_errors() {
            return Err(super::PipelineError::Application(self.errors.clone()));
        }
        let value = self
            .data
            .as_ref()
            .and_then(|d| d.get(field))
            .cloned()
            .ok_or_else(|| super::PipelineError::Decode(format!("response has no `{}` field", field)))?;
        serde_json::from_value(value)
            .map_err(|e| super::PipelineError::Decode(format!("invalid `{}` field: {}", field, e)))
    }
}
