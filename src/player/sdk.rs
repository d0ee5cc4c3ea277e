//! One-time SDK loading
//!
//! Loading an embedded player SDK is process-wide work that must happen
//! exactly once, no matter how many players are created or how many
//! initializations race. The gate is handed to each adapter explicitly;
//! [`SdkGate::process`] returns the shared instance.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;
use tokio::sync::OnceCell;

use super::error::PlayerError;

static PROCESS_GATE: Lazy<SdkGate> = Lazy::new(SdkGate::new);

/// Single-flight guard around SDK loading
#[derive(Debug, Clone, Default)]
pub struct SdkGate {
    ready: Arc<OnceCell<()>>,
    /// Number of load attempts started
    attempts: Arc<AtomicUsize>,
}

impl SdkGate {
    /// Create an independent gate
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate shared by the whole process
    pub fn process() -> Self {
        PROCESS_GATE.clone()
    }

    /// Whether the SDK has finished loading
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Number of load attempts that have been started
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Run `load` unless the SDK is already loaded
    ///
    /// Concurrent callers wait for the in-flight load instead of starting
    /// their own. A failed load leaves the gate closed so a later call can
    /// retry.
    pub async fn ensure<F, Fut>(&self, load: F) -> Result<(), PlayerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), PlayerError>>,
    {
        self.ready
            .get_or_try_init(|| async {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("Loading player SDK");
                load().await
            })
            .await
            .map(|_| ())
    }
}
