//! Stage configuration loaded from YAML or JSON
//!
//! ```yaml
//! apply_source_maps: true
//! output_extension: js
//! options:
//!   caller:
//!     name: my-pipeline
//!   presets: [env]
//! engine:
//!   program: compiler-bridge
//!   timeout_seconds: 30
//! ```

use crate::engine::{CommandEngine, CommandEngineConfig, TransformEngine};
use crate::options::StageOptions;
use crate::stage::{
    normalize_extension, InvalidExtension, TransformStage, DEFAULT_OUTPUT_EXTENSION,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidExtension(#[from] InvalidExtension),
    #[error("no engine configured")]
    MissingEngine,
}

fn default_apply_source_maps() -> bool {
    true
}

fn default_output_extension() -> String {
    DEFAULT_OUTPUT_EXTENSION.to_string()
}

/// Everything needed to build a [`TransformStage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Base options forwarded to the engine
    #[serde(default)]
    pub options: StageOptions,
    /// Compose source maps (`true`) or replace them (`false`)
    #[serde(default = "default_apply_source_maps")]
    pub apply_source_maps: bool,
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
    #[serde(default)]
    pub engine: Option<CommandEngineConfig>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            options: StageOptions::default(),
            apply_source_maps: default_apply_source_maps(),
            output_extension: default_output_extension(),
            engine: None,
        }
    }
}

impl StageConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validated()
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validated()
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.output_extension = normalize_extension(&self.output_extension)?;
        Ok(self)
    }

    /// Build a stage around `engine`.
    pub fn build(self, engine: Arc<dyn TransformEngine>) -> Result<TransformStage, ConfigError> {
        let stage = TransformStage::new(engine, self.options)
            .apply_source_maps(self.apply_source_maps)
            .with_output_extension(&self.output_extension)?;
        Ok(stage)
    }

    /// Build a stage around the configured command engine.
    pub fn build_with_command_engine(mut self) -> Result<TransformStage, ConfigError> {
        let engine = self.engine.take().ok_or(ConfigError::MissingEngine)?;
        self.build(Arc::new(CommandEngine::from_config(engine)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::SourceMapMode;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = StageConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, StageConfig::default());
        assert!(config.apply_source_maps);
        assert_eq!(config.output_extension, "js");
    }

    #[test]
    fn yaml_options_split_caller_from_passthrough() {
        let config = StageConfig::from_yaml_str(concat!(
            "apply_source_maps: false\n",
            "options:\n  caller:\n    name: my-pipeline\n",
            "  presets: [env]\n",
        ))
        .unwrap();
        assert!(!config.apply_source_maps);
        assert_eq!(
            config.options.caller.as_ref().unwrap().get("name"),
            Some(&json!("my-pipeline"))
        );
        assert_eq!(config.options.passthrough.get("presets"), Some(&json!(["env"])));
    }

    #[test]
    fn leading_dot_is_stripped_from_extension() {
        let config = StageConfig::from_json_str(r#"{"output_extension": ".mjs"}"#).unwrap();
        assert_eq!(config.output_extension, "mjs");
    }

    #[test]
    fn invalid_extensions_are_rejected() {
        for bad in [r#"{"output_extension": ""}"#, r#"{"output_extension": "a/b"}"#] {
            assert!(matches!(
                StageConfig::from_json_str(bad),
                Err(ConfigError::InvalidExtension(_))
            ));
        }
    }

    #[test]
    fn build_carries_mode_and_extension() {
        let config = StageConfig::from_yaml_str("apply_source_maps: false\noutput_extension: cjs\n")
            .unwrap();
        let stage = config.build(Arc::new(crate::engine::MockEngine::noop())).unwrap();
        assert_eq!(stage.source_map_mode(), SourceMapMode::Replace);
        assert_eq!(stage.output_extension(), "cjs");
    }

    #[test]
    fn build_rejects_hand_written_bad_extension() {
        let config = StageConfig {
            output_extension: "lib/js".to_string(),
            ..StageConfig::default()
        };
        assert!(matches!(
            config.build(Arc::new(crate::engine::MockEngine::noop())),
            Err(ConfigError::InvalidExtension(_))
        ));
    }

    #[test]
    fn command_engine_requires_engine_section() {
        assert!(matches!(
            StageConfig::default().build_with_command_engine(),
            Err(ConfigError::MissingEngine)
        ));
        let config =
            StageConfig::from_yaml_str("engine:\n  program: compiler-bridge\n").unwrap();
        assert!(config.build_with_command_engine().is_ok());
    }

    #[test]
    fn loads_json_and_yaml_files() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("stage.json");
        let mut f = std::fs::File::create(&json_path).unwrap();
        write!(f, r#"{{"options": {{"compact": true}}}}"#).unwrap();
        let config = StageConfig::from_path(&json_path).unwrap();
        assert_eq!(config.options.passthrough.get("compact"), Some(&json!(true)));

        let yaml_path = dir.path().join("stage.yaml");
        std::fs::write(&yaml_path, "output_extension: cjs\n").unwrap();
        assert_eq!(StageConfig::from_path(&yaml_path).unwrap().output_extension, "cjs");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = StageConfig::from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }
}
