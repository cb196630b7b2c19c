//! Source Map v3 records
//!
//! The stage never interprets generated code; it only carries the maps
//! the engine produces and composes them with whatever chain the file
//! already has.

mod apply;
pub mod mappings;
pub mod vlq;

pub use apply::{compose, ChainApplier, SourceMapApplier};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from decoding or composing source maps.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceMapError {
    #[error("source map is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid mappings: {0}")]
    InvalidVlq(String),
    #[error("source index {0} out of range")]
    SourceOutOfRange(u32),
    #[error("name index {0} out of range")]
    NameOutOfRange(u32),
    #[error("invalid source map JSON: {0}")]
    Json(String),
}

/// A version 3 source map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
}

impl SourceMap {
    /// An empty map for `file`, as a pipeline's source-map init step creates it.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            version: 3,
            file: Some(file.into()),
            source_root: None,
            sources: Vec::new(),
            sources_content: Vec::new(),
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>, content: Option<String>) -> Self {
        self.sources.push(source.into());
        self.sources_content.push(content);
        self
    }

    pub fn with_mappings(mut self, mappings: impl Into<String>) -> Self {
        self.mappings = mappings.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        serde_json::from_str(json).map_err(|e| SourceMapError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SourceMapError> {
        serde_json::to_string(self).map_err(|e| SourceMapError::Json(e.to_string()))
    }

    /// Decode `mappings` into per-line segments.
    pub fn segments(&self) -> Result<Vec<Vec<mappings::Segment>>, SourceMapError> {
        mappings::decode(&self.mappings)
    }
}

/// Normalise Windows separators so map paths compare equal across platforms.
pub fn unix_style(path: &str) -> String {
    path.replace('\\', "/")
}
