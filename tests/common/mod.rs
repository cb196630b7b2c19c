//! Common test utilities for stage integration tests
//!
//! Fixtures for files, a stage with an isolated capability cache, and a
//! tracing subscriber that writes through the test harness.

#![allow(dead_code)]

use futures::StreamExt;
use std::sync::{Arc, Once};
use transpile_stage::{
    CapabilityCache, File, SourceMap, StageError, StageOptions, TransformEngine, TransformStage,
};

pub const BASE: &str = "/repo/src";

/// Install a fmt subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// A stage with its own capability cache, so tests do not share probe results.
pub fn isolated_stage(engine: Arc<dyn TransformEngine>) -> TransformStage {
    init_tracing();
    TransformStage::new(engine, StageOptions::new())
        .with_capability_cache(Arc::new(CapabilityCache::new()))
}

/// A buffered file under `BASE`.
pub fn source_file(relative: &str, contents: &str) -> File {
    File::buffer(format!("{}/{}", BASE, relative), BASE, contents)
}

/// A buffered file whose source map was initialised by an earlier step.
pub fn mapped_file(relative: &str, contents: &str) -> File {
    source_file(relative, contents).with_source_map(SourceMap::new(relative))
}

/// Run `files` through `stage` and collect every result.
pub async fn run_all(
    stage: &TransformStage,
    files: Vec<File>,
    in_flight: usize,
) -> Vec<Result<File, StageError>> {
    stage
        .pipe(futures::stream::iter(files), in_flight)
        .collect()
        .await
}
