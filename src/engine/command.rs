//! Engine backed by an external compiler process
//!
//! Each call spawns the configured program, writes one JSON request line to
//! its stdin, closes stdin, and reads one JSON response line from stdout.
//!
//! Request:  `{"op":"transform","code":"...","options":{...}}`
//!           `{"op":"loadPartialConfig","options":{...}}`
//! Response: `{"result":{"code":"...","map":{...},"metadata":{...}}}`,
//!           `{"result":null}`, or `{"error":{"message":"...", ...}}`

use super::{EngineError, ProbeOptions, TransformEngine, TransformOutput};
use crate::options::TransformOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Configuration for a [`CommandEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEngineConfig {
    /// Executable to spawn
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Engine name shown in dependency errors (defaults to `program`)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    60
}

impl CommandEngineConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            name: None,
            working_dir: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum EngineRequest<'a> {
    LoadPartialConfig {
        options: &'a ProbeOptions,
    },
    Transform {
        code: &'a str,
        options: &'a TransformOptions,
    },
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    result: Option<TransformOutput>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

/// Engine that delegates to an external compiler process.
pub struct CommandEngine {
    config: CommandEngineConfig,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self::from_config(CommandEngineConfig::new(program))
    }

    pub fn from_config(config: CommandEngineConfig) -> Self {
        Self { config }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    pub fn config(&self) -> &CommandEngineConfig {
        &self.config
    }

    async fn call(
        &self,
        request: &EngineRequest<'_>,
    ) -> Result<Option<TransformOutput>, EngineError> {
        let program = &self.config.program;
        let mut payload = serde_json::to_string(request)
            .map_err(|e| EngineError::Protocol(format!("failed to serialize request: {}", e)))?;
        payload.push('\n');

        let mut cmd = Command::new(program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::Unavailable(format!("failed to start {}: {}", program, e)))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("no stdin available".to_string()))?;

        tracing::trace!("{} <- {}", program, payload.trim_end());

        // Write and drain concurrently so a chatty engine cannot fill its
        // stdout/stderr pipes while we block on stdin. Dropping the child
        // on timeout kills the process.
        let exchange = async move {
            let write = async move {
                let mut written = stdin.write_all(payload.as_bytes()).await;
                if written.is_ok() {
                    written = stdin.flush().await;
                }
                drop(stdin);
                written
            };
            let (written, output) = tokio::join!(write, child.wait_with_output());
            match written {
                // The engine may exit without reading its whole request
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => output,
            }
        };

        let output = timeout(Duration::from_secs(self.config.timeout_seconds), exchange)
            .await
            .map_err(|_| EngineError::Timeout(self.config.timeout_seconds))?
            .map_err(|e| {
                EngineError::Unavailable(format!("failed to exchange with {}: {}", program, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(line) = stdout.lines().rev().find(|l| !l.trim().is_empty()) else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(if output.status.success() {
                EngineError::Protocol(format!("{} produced no response", program))
            } else {
                EngineError::Unavailable(format!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    stderr.trim()
                ))
            });
        };

        tracing::trace!("{} -> {}", program, line);

        let response: EngineResponse = serde_json::from_str(line)
            .map_err(|e| EngineError::Protocol(format!("failed to parse response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(EngineError::Diagnostic {
                message: error.message,
                properties: error.properties,
            });
        }

        Ok(response.result)
    }
}

#[async_trait]
impl TransformEngine for CommandEngine {
    fn name(&self) -> &str {
        self.config.name.as_deref().unwrap_or(&self.config.program)
    }

    async fn load_partial_config(&self, options: &ProbeOptions) -> Result<(), EngineError> {
        self.call(&EngineRequest::LoadPartialConfig { options })
            .await
            .map(|_| ())
    }

    async fn transform(
        &self,
        code: &str,
        options: &TransformOptions,
    ) -> Result<Option<TransformOutput>, EngineError> {
        self.call(&EngineRequest::Transform { code, options }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_operation() {
        let probe = ProbeOptions::caller_probe();
        let request = EngineRequest::LoadPartialConfig { options: &probe };
        let value = serde_json::to_value(request).unwrap();
        assert_eq!(value["op"], json!("loadPartialConfig"));
        assert_eq!(value["options"]["configFile"], json!(false));
    }

    #[test]
    fn error_response_keeps_extra_properties() {
        let response: EngineResponse = serde_json::from_str(
            r#"{"error":{"message":"Unexpected token","loc":{"line":1,"column":4}}}"#,
        )
        .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.message, "Unexpected token");
        assert_eq!(error.properties["loc"]["column"], json!(4));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: CommandEngineConfig =
            serde_json::from_value(json!({"program": "compiler"})).unwrap();
        assert_eq!(config, CommandEngineConfig::new("compiler"));
    }

    #[test]
    fn name_falls_back_to_program() {
        let engine = CommandEngine::new("compiler-bridge");
        assert_eq!(engine.name(), "compiler-bridge");

        let mut config = CommandEngineConfig::new("node");
        config.name = Some("swc".to_string());
        assert_eq!(CommandEngine::from_config(config).name(), "swc");
    }
}
