//! Caller-support capability cache
//!
//! Whether an engine accepts the `caller` option is probed once and then
//! remembered for the life of the process, one cache per engine name.
//! Concurrent first calls may all probe, but only the first result is
//! stored and every caller reads the stored value back.

use crate::engine::{ProbeOptions, TransformEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Tri-state result of the caller-support probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerSupport {
    Unknown,
    Supported,
    Unsupported,
}

impl CallerSupport {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Supported,
            2 => Self::Unsupported,
            _ => Self::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Supported => 1,
            Self::Unsupported => 2,
        }
    }
}

/// Write-once cache for [`CallerSupport`].
#[derive(Debug)]
pub struct CapabilityCache {
    state: AtomicU8,
}

impl CapabilityCache {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
        }
    }

    /// The cache shared by every stage in this process that uses the engine
    /// named `engine`.
    pub fn process_wide(engine: &str) -> Arc<CapabilityCache> {
        static SHARED: OnceLock<Mutex<HashMap<String, Arc<CapabilityCache>>>> = OnceLock::new();
        SHARED
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(engine.to_string())
            .or_insert_with(|| Arc::new(CapabilityCache::new()))
            .clone()
    }

    pub fn get(&self) -> CallerSupport {
        CallerSupport::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Store a probe result unless one is already stored; returns the stored value.
    pub fn record(&self, supported: bool) -> CallerSupport {
        let value = if supported {
            CallerSupport::Supported
        } else {
            CallerSupport::Unsupported
        };
        match self.state.compare_exchange(
            CallerSupport::Unknown.as_u8(),
            value.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => value,
            Err(existing) => CallerSupport::from_u8(existing),
        }
    }

    /// Whether `engine` accepts the caller option, probing on first use.
    pub async fn supports_caller(&self, engine: &dyn TransformEngine) -> bool {
        match self.get() {
            CallerSupport::Supported => return true,
            CallerSupport::Unsupported => return false,
            CallerSupport::Unknown => {}
        }

        let probe = engine
            .load_partial_config(&ProbeOptions::caller_probe())
            .await;
        if let Err(e) = &probe {
            tracing::debug!("{} rejected caller probe: {}", engine.name(), e);
        }

        let stored = self.record(probe.is_ok());
        tracing::debug!("Caller support for {}: {:?}", engine.name(), stored);
        stored == CallerSupport::Supported
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, TransformEngine};
    use std::time::Duration;

    #[test]
    fn cache_starts_unknown() {
        assert_eq!(CapabilityCache::new().get(), CallerSupport::Unknown);
    }

    #[test]
    fn first_record_wins() {
        let cache = CapabilityCache::new();
        assert_eq!(cache.record(false), CallerSupport::Unsupported);
        assert_eq!(cache.record(true), CallerSupport::Unsupported);
        assert_eq!(cache.get(), CallerSupport::Unsupported);
    }

    #[test]
    fn process_wide_cache_is_keyed_by_engine() {
        let a = CapabilityCache::process_wide("engine-a");
        let b = CapabilityCache::process_wide("engine-a");
        let c = CapabilityCache::process_wide("engine-c");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn support_is_checked_once() {
        let cache = CapabilityCache::new();
        let engine = MockEngine::noop();

        assert!(cache.supports_caller(&engine).await);
        assert!(cache.supports_caller(&engine).await);
        assert_eq!(engine.probe_count(), 1);
        assert_eq!(cache.get(), CallerSupport::Supported);
    }

    #[tokio::test]
    async fn rejection_is_remembered() {
        let cache = CapabilityCache::new();
        let old = MockEngine::noop().without_caller_support();
        assert!(!cache.supports_caller(&old).await);
        assert!(!cache.supports_caller(&old).await);
        assert_eq!(old.probe_count(), 1);
    }

    #[tokio::test]
    async fn each_engine_name_is_checked_separately() {
        let legacy = MockEngine::noop().without_caller_support().named("legacy-compiler");
        let modern = MockEngine::noop().named("modern-compiler");

        let legacy_cache = CapabilityCache::process_wide(legacy.name());
        let modern_cache = CapabilityCache::process_wide(modern.name());
        assert!(!legacy_cache.supports_caller(&legacy).await);
        assert!(modern_cache.supports_caller(&modern).await);
        assert_eq!(modern.probe_count(), 1);

        // Same engine name in a later lookup reuses the stored answer
        let again = CapabilityCache::process_wide(modern.name());
        assert!(again.supports_caller(&modern).await);
        assert_eq!(modern.probe_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_calls_converge() {
        let cache = CapabilityCache::new();
        let engine = MockEngine::noop().with_capability_delay(Duration::from_millis(20));

        let (first, second) = tokio::join!(
            cache.supports_caller(&engine),
            cache.supports_caller(&engine)
        );

        assert!(first && second);
        assert!((1..=2).contains(&engine.probe_count()));
        assert_eq!(cache.get(), CallerSupport::Supported);
        assert!(cache.supports_caller(&engine).await);
        assert!(engine.probe_count() <= 2);
    }

    #[tokio::test]
    async fn concurrent_rejections_converge() {
        let cache = CapabilityCache::new();
        let engine = MockEngine::noop()
            .without_caller_support()
            .with_capability_delay(Duration::from_millis(20));

        let (first, second) = tokio::join!(
            cache.supports_caller(&engine),
            cache.supports_caller(&engine)
        );

        assert_eq!(first, second);
        assert!(!first);
        assert_eq!(cache.get(), CallerSupport::Unsupported);
    }
}
