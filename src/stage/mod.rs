//! The transform stage
//!
//! For each file: pass null files through, reject streamed files, make sure
//! the engine supports the caller option, run the engine, then reconcile
//! the result onto the file (contents, path, source map, metadata).
//!
//! Every admitted file produces exactly one `Result`. A failed file never
//! stops the files around it.

mod path;

pub use path::{
    map_file_name, normalize_extension, replace_extension, InvalidExtension,
    DEFAULT_OUTPUT_EXTENSION,
};

use crate::capability::CapabilityCache;
use crate::engine::{TransformEngine, TransformOutput};
use crate::error::StageError;
use crate::file::{Contents, File};
use crate::options::{StageOptions, TransformOptions};
use crate::sourcemap::{ChainApplier, SourceMapApplier, SourceMapError};
use futures::{Stream, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;

/// How a produced source map reaches the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMapMode {
    /// Compose with the file's existing chain through the applier
    #[default]
    Apply,
    /// Replace the file's map with the engine's map
    Replace,
}

impl From<bool> for SourceMapMode {
    fn from(apply: bool) -> Self {
        if apply {
            Self::Apply
        } else {
            Self::Replace
        }
    }
}

/// Streaming stage that runs one engine over every file.
pub struct TransformStage {
    engine: Arc<dyn TransformEngine>,
    options: StageOptions,
    source_maps: SourceMapMode,
    output_extension: String,
    applier: Arc<dyn SourceMapApplier>,
    capability: Arc<CapabilityCache>,
}

impl TransformStage {
    /// The stage shares the process-wide capability cache for `engine.name()`.
    pub fn new(engine: Arc<dyn TransformEngine>, options: StageOptions) -> Self {
        let capability = CapabilityCache::process_wide(engine.name());
        Self {
            engine,
            options,
            source_maps: SourceMapMode::Apply,
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            applier: Arc::new(ChainApplier),
            capability,
        }
    }

    /// `true` composes source maps (the default), `false` replaces them.
    pub fn apply_source_maps(self, apply: bool) -> Self {
        self.with_source_map_mode(apply.into())
    }

    pub fn with_source_map_mode(mut self, mode: SourceMapMode) -> Self {
        self.source_maps = mode;
        self
    }

    /// Set the extension given to output paths; `mjs` and `.mjs` are equivalent.
    pub fn with_output_extension(mut self, extension: &str) -> Result<Self, InvalidExtension> {
        self.output_extension = normalize_extension(extension)?;
        Ok(self)
    }

    pub fn with_applier(mut self, applier: Arc<dyn SourceMapApplier>) -> Self {
        self.applier = applier;
        self
    }

    /// Use a private capability cache instead of the process-wide one.
    pub fn with_capability_cache(mut self, cache: Arc<CapabilityCache>) -> Self {
        self.capability = cache;
        self
    }

    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    pub fn source_map_mode(&self) -> SourceMapMode {
        self.source_maps
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    /// Transform one file.
    ///
    /// Takes the file by value and returns it mutated on success. On
    /// failure the file is consumed and only the error comes back.
    pub async fn transform_file(&self, mut file: File) -> Result<File, StageError> {
        if file.is_null() {
            tracing::debug!("Passing through {} (no contents)", file.path.display());
            return Ok(file);
        }
        if file.is_stream() {
            tracing::warn!("Rejecting streamed contents for {}", file.path.display());
            return Err(StageError::streaming_not_supported().with_file_name(&file.path));
        }

        if !self.capability.supports_caller(self.engine.as_ref()).await {
            tracing::warn!(
                "{} does not accept the caller option; skipping {}",
                self.engine.name(),
                file.path.display()
            );
            return Err(
                StageError::incompatible_dependency(self.engine.name()).with_file_name(&file.path)
            );
        }

        let options = TransformOptions::for_file(&self.options, &file);
        let code = file.text().map(Cow::into_owned).unwrap_or_default();
        tracing::debug!("Transforming {} with {}", file.path.display(), self.engine.name());

        let output = match self.engine.transform(&code, &options).await {
            Ok(Some(output)) => output,
            Ok(None) => {
                tracing::debug!("{} left {} unchanged", self.engine.name(), file.path.display());
                return Ok(file);
            }
            Err(e) => {
                tracing::warn!("Transform failed for {}: {}", file.path.display(), e);
                return Err(StageError::transform_failed(e).with_file_name(&file.path));
            }
        };

        if let Err(e) = self.reconcile(&mut file, output) {
            tracing::warn!("Source map reconciliation failed for {}: {}", file.path.display(), e);
            return Err(StageError::transform_failed(e).with_file_name(&file.path));
        }
        Ok(file)
    }

    /// Write the engine's output onto the file.
    fn reconcile(&self, file: &mut File, output: TransformOutput) -> Result<(), SourceMapError> {
        let TransformOutput { code, map, metadata } = output;

        if let (true, Some(mut map)) = (file.source_map.is_some(), map) {
            map.file = Some(map_file_name(&file.relative(), &self.output_extension));
            match self.source_maps {
                SourceMapMode::Apply => self.applier.apply(file, map)?,
                SourceMapMode::Replace => file.source_map = Some(map),
            }
        }

        file.contents = Contents::Buffer(code.into_bytes());
        file.path = replace_extension(&file.path, &self.output_extension);
        file.metadata = metadata;
        Ok(())
    }

    /// Run every file of `input` through the stage.
    ///
    /// Up to `in_flight` engine calls run concurrently and results are
    /// yielded as they complete, so output order is not input order.
    pub fn pipe<'a, S>(
        &'a self,
        input: S,
        in_flight: usize,
    ) -> impl Stream<Item = Result<File, StageError>> + 'a
    where
        S: Stream<Item = File> + 'a,
    {
        input
            .map(move |file| self.transform_file(file))
            .buffer_unordered(in_flight.max(1))
    }
}
