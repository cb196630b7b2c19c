//! transpile-stage: a streaming build-pipeline stage around an external compiler
//!
//! Files arrive one at a time. Each buffered file is handed to a
//! [`TransformEngine`] and comes back with new contents, a renamed path, a
//! reconciled source map, and the engine's metadata attached.
//!
//! # Core Concepts
//!
//! - **File**: one unit of pipeline data, owned by the stage for one call
//! - **Engine**: the opaque compiler, probed once for caller-option support
//! - **Source maps**: composed onto the file's existing chain, or replaced
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use transpile_stage::{File, MockEngine, StageOptions, TransformOutput, TransformStage};
//!
//! let engine = Arc::new(MockEngine::returning(TransformOutput::new("const x = 1;")));
//! let stage = TransformStage::new(engine, StageOptions::new());
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let file = rt
//!     .block_on(stage.transform_file(File::buffer("/src/foo.jsx", "/src", "const x = <a/>;")))
//!     .unwrap();
//! assert_eq!(file.path, std::path::PathBuf::from("/src/foo.js"));
//! ```

pub mod capability;
pub mod config;
pub mod engine;
mod error;
mod file;
pub mod options;
pub mod sourcemap;
pub mod stage;

pub use capability::{CallerSupport, CapabilityCache};
pub use config::{ConfigError, StageConfig};
pub use engine::{
    CommandEngine, CommandEngineConfig, EngineError, MockEngine, ProbeOptions, RecordedCall,
    TransformEngine, TransformOutput,
};
pub use error::{ErrorKind, FailureCause, StageError};
pub use file::{Contents, File};
pub use options::{StageOptions, TransformOptions};
pub use sourcemap::{ChainApplier, SourceMap, SourceMapApplier, SourceMapError};
pub use stage::{InvalidExtension, SourceMapMode, TransformStage};

/// Identity this stage reports as `caller.name` and in error reports.
pub const STAGE_NAME: &str = "transpile-stage";

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
