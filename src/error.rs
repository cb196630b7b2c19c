//! Structured stage errors
//!
//! Every failed file yields exactly one `StageError`. The error names the
//! stage, the file, and the cause, and by default hides the extra
//! properties an engine attaches to its own error objects.

use crate::engine::EngineError;
use crate::sourcemap::SourceMapError;
use crate::STAGE_NAME;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a transform failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    SourceMap(#[from] SourceMapError),
}

/// Error taxonomy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    /// The file's contents are a stream, not a buffer
    #[error("Streaming not supported")]
    UnsupportedInputShape,
    /// The engine does not accept the caller option
    #[error("{0} with caller support is required")]
    IncompatibleDependency(String),
    #[error("{0}")]
    TransformFailure(FailureCause),
}

/// The error emitted on the stream for one failed file.
#[derive(Debug, Clone, PartialEq)]
pub struct StageError {
    pub plugin: &'static str,
    pub kind: ErrorKind,
    pub file_name: Option<PathBuf>,
    /// Whether `report()` includes the engine's extra error properties
    pub show_properties: bool,
}

impl StageError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            plugin: STAGE_NAME,
            kind,
            file_name: None,
            show_properties: false,
        }
    }

    pub fn streaming_not_supported() -> Self {
        Self::new(ErrorKind::UnsupportedInputShape)
    }

    pub fn incompatible_dependency(engine: &str) -> Self {
        Self::new(ErrorKind::IncompatibleDependency(engine.to_string()))
    }

    pub fn transform_failed(cause: impl Into<FailureCause>) -> Self {
        Self::new(ErrorKind::TransformFailure(cause.into()))
    }

    pub fn with_file_name(mut self, path: impl AsRef<Path>) -> Self {
        self.file_name = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_show_properties(mut self, show: bool) -> Self {
        self.show_properties = show;
        self
    }

    pub fn cause(&self) -> Option<&FailureCause> {
        match &self.kind {
            ErrorKind::TransformFailure(cause) => Some(cause),
            _ => None,
        }
    }

    /// Multi-line report for end users.
    pub fn report(&self) -> String {
        let mut out = format!("[{}] {}", self.plugin, self.kind);
        if let Some(path) = &self.file_name {
            let _ = write!(out, "\nfileName: {}", path.display());
        }
        if self.show_properties {
            let properties = match self.cause() {
                Some(FailureCause::Engine(e)) => e.properties(),
                _ => None,
            };
            for (key, value) in properties.into_iter().flatten() {
                let _ = write!(out, "\n{}: {}", key, value);
            }
        }
        out
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.plugin, self.kind)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|c| c as &(dyn std::error::Error + 'static))
    }
}
