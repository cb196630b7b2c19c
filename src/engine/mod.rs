//! Transform engine contract
//!
//! The engine is the external compiler. The stage only knows this trait:
//! probe it once for caller support, then hand it source text plus options.
//! Two implementations ship with the crate:
//! - `CommandEngine`: spawns an external compiler process per call (production)
//! - `MockEngine`: returns preconfigured responses (testing)

mod command;
mod mock;

pub use command::{CommandEngine, CommandEngineConfig};
pub use mock::{MockEngine, RecordedCall};

use crate::options::TransformOptions;
use crate::sourcemap::SourceMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// What the engine hands back for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOutput {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub map: Option<SourceMap>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl TransformOutput {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
            metadata: None,
        }
    }

    pub fn with_map(mut self, map: SourceMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Arguments for the caller-support probe: a config load that names a
/// caller and skips every on-disk config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOptions {
    pub caller: Option<Map<String, Value>>,
    pub config_lookup: bool,
    pub config_file: bool,
}

impl ProbeOptions {
    pub fn caller_probe() -> Self {
        Self {
            caller: None,
            config_lookup: false,
            config_file: false,
        }
    }
}

/// Errors raised by an engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The engine rejected the input (syntax errors, plugin errors, internal faults)
    #[error("{message}")]
    Diagnostic {
        message: String,
        /// Extra properties the engine attached to its error object
        properties: Map<String, Value>,
    },
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("invalid engine response: {0}")]
    Protocol(String),
    #[error("engine timed out after {0} seconds")]
    Timeout(u64),
}

impl EngineError {
    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self::Diagnostic {
            message: message.into(),
            properties: Map::new(),
        }
    }

    /// Attach an extra property to a `Diagnostic`. Other variants are returned unchanged.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::Diagnostic { properties, .. } = &mut self {
            properties.insert(key.into(), value.into());
        }
        self
    }

    pub fn properties(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Diagnostic { properties, .. } => Some(properties),
            _ => None,
        }
    }
}

/// The external compiler.
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Human-readable engine name, used in dependency errors
    fn name(&self) -> &str;

    /// Load a partial configuration without transforming anything.
    ///
    /// Engines that do not understand the `caller` option must fail here.
    async fn load_partial_config(&self, options: &ProbeOptions) -> Result<(), EngineError>;

    /// Transform `code`.
    ///
    /// `Ok(None)` means the engine deliberately left the file alone.
    async fn transform(
        &self,
        code: &str,
        options: &TransformOptions,
    ) -> Result<Option<TransformOutput>, EngineError>;
}
