//! File records flowing through the pipeline
//!
//! A `File` is handed to the stage by value and handed back (mutated) on
//! success, so the stage holds exclusive access for exactly one call.

use crate::sourcemap::SourceMap;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// What a file currently holds.
pub enum Contents {
    /// No contents: directory entries and metadata-only records
    Null,
    /// Fully materialised bytes
    Buffer(Vec<u8>),
    /// Contents still arriving as a byte stream
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Self::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// One unit of pipeline data.
#[derive(Debug)]
pub struct File {
    /// Full path of the file
    pub path: PathBuf,
    /// Root that `relative()` is computed against
    pub base: PathBuf,
    pub contents: Contents,
    /// Present only when source-map generation is active for this file
    pub source_map: Option<SourceMap>,
    /// Side-channel data attached by the engine after a transform
    pub metadata: Option<Value>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: Contents) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents,
            source_map: None,
            metadata: None,
        }
    }

    /// A file with buffered contents.
    pub fn buffer(
        path: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(path, base, Contents::Buffer(bytes.into()))
    }

    /// A file without contents.
    pub fn null(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self::new(path, base, Contents::Null)
    }

    /// A file whose contents are a byte stream.
    pub fn stream(
        path: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        reader: impl AsyncRead + Send + 'static,
    ) -> Self {
        Self::new(path, base, Contents::Stream(Box::pin(reader)))
    }

    pub fn with_source_map(mut self, map: SourceMap) -> Self {
        self.source_map = Some(map);
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.contents, Contents::Buffer(_))
    }

    /// Path relative to `base`, or the full path when it lies outside `base`.
    pub fn relative(&self) -> PathBuf {
        self.path
            .strip_prefix(&self.base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.path.clone())
    }

    /// Buffered contents as text. Invalid UTF-8 is replaced, not rejected.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(String::from_utf8_lossy(bytes)),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }
}
