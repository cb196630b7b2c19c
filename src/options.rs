//! Options handed to the engine
//!
//! `StageOptions` is fixed when the stage is built. `TransformOptions` is
//! assembled per file from those base options, the file's paths, and the
//! caller identity.

use crate::file::File;
use crate::STAGE_NAME;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Keys the stage sets per file. Base options never override them.
const PER_FILE_KEYS: [&str; 5] = [
    "filename",
    "filenameRelative",
    "sourceFileName",
    "sourceMap",
    "caller",
];

/// Process-wide options supplied when the stage is constructed.
///
/// Everything except `caller` is forwarded to the engine verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOptions {
    /// Caller identity overrides, merged over `{name: "transpile-stage"}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.passthrough.insert(key.into(), value.into());
        self
    }

    pub fn with_caller_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.caller
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Merge the stage's default identity with user-supplied caller fields.
///
/// User fields are applied last, so a user `name` replaces the default.
pub fn caller_identity(user: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut caller = Map::new();
    caller.insert("name".to_string(), Value::from(STAGE_NAME));
    if let Some(user) = user {
        for (key, value) in user {
            caller.insert(key.clone(), value.clone());
        }
    }
    caller
}

/// Options for one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
    pub filename: PathBuf,
    pub filename_relative: PathBuf,
    pub source_file_name: PathBuf,
    /// Whether the file carries a source map the engine should extend
    pub source_map: bool,
    pub caller: Map<String, Value>,
}

impl TransformOptions {
    pub fn for_file(base: &StageOptions, file: &File) -> Self {
        let mut passthrough = base.passthrough.clone();
        for key in PER_FILE_KEYS {
            passthrough.remove(key);
        }

        let relative = file.relative();
        Self {
            passthrough,
            filename: file.path.clone(),
            filename_relative: relative.clone(),
            source_file_name: relative,
            source_map: file.source_map.is_some(),
            caller: caller_identity(base.caller.as_ref()),
        }
    }
}
