//! Mock engine for testing: returns preconfigured responses.

use super::{EngineError, ProbeOptions, TransformEngine, TransformOutput};
use crate::options::TransformOptions;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

type Response = Result<Option<TransformOutput>, EngineError>;

/// One recorded `transform` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub code: String,
    pub options: TransformOptions,
}

/// Engine double with canned responses keyed by filename.
pub struct MockEngine {
    name: String,
    supports_caller: bool,
    capability_delay: Option<Duration>,
    fallback: Response,
    responses: HashMap<PathBuf, Response>,
    delays: HashMap<PathBuf, Duration>,
    probes: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockEngine {
    fn with_fallback(fallback: Response) -> Self {
        Self {
            name: "mock-engine".to_string(),
            supports_caller: true,
            capability_delay: None,
            fallback,
            responses: HashMap::new(),
            delays: HashMap::new(),
            probes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every file produces `output`.
    pub fn returning(output: TransformOutput) -> Self {
        Self::with_fallback(Ok(Some(output)))
    }

    /// Every file is left alone.
    pub fn noop() -> Self {
        Self::with_fallback(Ok(None))
    }

    /// Every file fails with `error`.
    pub fn failing(error: EngineError) -> Self {
        Self::with_fallback(Err(error))
    }

    /// Reject the caller-support probe, like engines that predate it.
    pub fn without_caller_support(mut self) -> Self {
        self.supports_caller = false;
        self
    }

    /// Report a different engine name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Delay the caller-support check.
    pub fn with_capability_delay(mut self, delay: Duration) -> Self {
        self.capability_delay = Some(delay);
        self
    }

    /// Register a response for one filename.
    pub fn with_response(mut self, filename: impl Into<PathBuf>, output: TransformOutput) -> Self {
        self.responses.insert(filename.into(), Ok(Some(output)));
        self
    }

    /// Register a failure for one filename.
    pub fn with_failure(mut self, filename: impl Into<PathBuf>, error: EngineError) -> Self {
        self.responses.insert(filename.into(), Err(error));
        self
    }

    /// Delay the response for one filename.
    pub fn with_delay(mut self, filename: impl Into<PathBuf>, delay: Duration) -> Self {
        self.delays.insert(filename.into(), delay);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl TransformEngine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_partial_config(&self, _options: &ProbeOptions) -> Result<(), EngineError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.capability_delay {
            tokio::time::sleep(delay).await;
        }
        if self.supports_caller {
            Ok(())
        } else {
            Err(EngineError::diagnostic("Unknown option: .caller"))
        }
    }

    async fn transform(
        &self,
        code: &str,
        options: &TransformOptions,
    ) -> Result<Option<TransformOutput>, EngineError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                code: code.to_string(),
                options: options.clone(),
            });

        if let Some(delay) = self.delays.get(&options.filename) {
            tokio::time::sleep(*delay).await;
        }

        self.responses
            .get(&options.filename)
            .unwrap_or(&self.fallback)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::File;
    use crate::options::StageOptions;

    fn options_for(path: &str) -> TransformOptions {
        TransformOptions::for_file(&StageOptions::new(), &File::buffer(path, "/r", "x"))
    }

    #[tokio::test]
    async fn per_file_response_overrides_fallback() {
        let engine = MockEngine::noop().with_response("/r/a.js", TransformOutput::new("a"));

        let a = engine.transform("x", &options_for("/r/a.js")).await.unwrap();
        let b = engine.transform("x", &options_for("/r/b.js")).await.unwrap();

        assert_eq!(a, Some(TransformOutput::new("a")));
        assert_eq!(b, None);
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn probe_is_counted_and_can_fail() {
        let engine = MockEngine::noop().without_caller_support();
        assert!(engine
            .load_partial_config(&ProbeOptions::caller_probe())
            .await
            .is_err());
        assert_eq!(engine.probe_count(), 1);
    }

    #[tokio::test]
    async fn calls_record_code_and_options() {
        let engine = MockEngine::failing(EngineError::diagnostic("boom"));
        let result = engine.transform("let a;", &options_for("/r/a.js")).await;

        assert!(result.is_err());
        let calls = engine.calls();
        assert_eq!(calls[0].code, "let a;");
        assert_eq!(calls[0].options.filename, PathBuf::from("/r/a.js"));
    }
}
