//! Package metadata documents.
//!
//! A [`Package`] is the parsed form of one uploaded `composer.json`-style
//! document. Only the `name` field is interpreted; everything else is carried
//! through to the indices untouched.

use crate::error::{RepoError, RepoResult};
use crate::name::Name;
use crate::validation;
use serde_json::{Map, Value};
use tracing::warn;

/// Immutable package metadata document.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    name: Name,
    json: Map<String, Value>,
}

impl Package {
    /// Parse a raw document, enforcing the default size limit.
    pub fn from_slice(content: &[u8]) -> RepoResult<Self> {
        Self::from_slice_with_limit(content, validation::MAX_DOCUMENT_SIZE)
    }

    /// Parse a raw document no larger than `max_size` bytes.
    pub fn from_slice_with_limit(content: &[u8], max_size: usize) -> RepoResult<Self> {
        validation::validate_document_size(content.len(), Some(max_size)).map_err(|e| {
            warn!(size = content.len(), max_size, "Package document too large");
            RepoError::MalformedDocument(e.to_string())
        })?;

        let value: Value = serde_json::from_slice(content).map_err(|e| {
            warn!(error = %e, "Failed to parse package document JSON");
            RepoError::MalformedDocument(format!("Invalid JSON: {e}"))
        })?;

        Self::from_value(value)
    }

    /// Wrap an already parsed JSON value.
    pub fn from_value(value: Value) -> RepoResult<Self> {
        let Value::Object(json) = value else {
            return Err(RepoError::MalformedDocument(
                "Package document must be a JSON object".to_string(),
            ));
        };

        let name = json
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                warn!("Package document name field missing or not a string");
                RepoError::MalformedDocument(
                    "'name' field missing or not a string".to_string(),
                )
            })?;
        let name = Name::new(name)?;

        Ok(Self { name, json })
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The `version` field, when present as a string
    pub fn version(&self) -> Option<&str> {
        self.json.get("version").and_then(Value::as_str)
    }

    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.json.clone())
    }
}
