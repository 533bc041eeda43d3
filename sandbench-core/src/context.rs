//! Isolated context interface
//!
//! A provider hands out contexts; a context accepts correlated submissions
//! and produces replies. Contexts are exclusively owned by one run and are
//! returned to their provider through `ContextGuard` on every exit path.

use crate::config::SecurityConfig;
use crate::error::EngineError;
use sandbench_ipc::{FailureKind, Isolation};
use std::time::Duration;

/// One snippet handed to a context
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    /// Correlation id echoed in the reply
    pub id: u64,
    /// Caller's original source
    pub source: &'a str,
    /// Source wrapped in timing scaffolding
    pub script: &'a str,
    /// Per-sample timeout
    pub timeout: Duration,
    /// Policy override for this submission
    pub csp: Option<&'a str>,
}

/// Outcome reported by a context
#[derive(Debug, Clone, PartialEq)]
pub struct ContextReply {
    /// Correlation id of the submission
    pub id: u64,
    /// Whether the snippet completed without throwing
    pub success: bool,
    /// Elapsed time measured by the context
    pub elapsed: Duration,
    /// Normalized error message
    pub error: Option<String>,
    /// Failure category when `success` is false
    pub failure: Option<FailureKind>,
}

impl ContextReply {
    /// Successful reply
    pub fn succeeded(id: u64, elapsed: Duration) -> Self {
        Self {
            id,
            success: true,
            elapsed,
            error: None,
            failure: None,
        }
    }

    /// Failed reply
    pub fn failed(
        id: u64,
        elapsed: Duration,
        failure: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id,
            success: false,
            elapsed,
            error: Some(error.into()),
            failure: Some(failure),
        }
    }
}

/// An execution environment for one run
pub trait IsolatedContext: Send {
    /// Start executing a submission. At most one submission is in flight.
    fn submit(&mut self, submission: &Submission<'_>) -> Result<(), EngineError>;

    /// Wait up to `wait` for the next reply. `Ok(None)` means nothing arrived yet.
    fn recv(&mut self, wait: Duration) -> Result<Option<ContextReply>, EngineError>;

    /// Hard-stop the in-flight submission. The context stays usable.
    fn interrupt(&mut self);

    /// Tear the context down
    fn close(self: Box<Self>);

    /// Engine description for reports
    fn engine(&self) -> &str {
        "unknown"
    }
}

/// Source of isolated contexts
pub trait ContextProvider: Send + Sync {
    /// Create a context honoring `security` in the given mode
    fn acquire(
        &self,
        security: &SecurityConfig,
        isolation: Isolation,
    ) -> Result<Box<dyn IsolatedContext>, EngineError>;

    /// Return a context when its run ends
    fn release(&self, context: Box<dyn IsolatedContext>) {
        context.close();
    }
}

/// Scoped ownership of an acquired context
pub struct ContextGuard<'p> {
    provider: &'p dyn ContextProvider,
    context: Option<Box<dyn IsolatedContext>>,
}

impl<'p> ContextGuard<'p> {
    /// Acquire a context; it is released when the guard drops
    pub fn acquire(
        provider: &'p dyn ContextProvider,
        security: &SecurityConfig,
        isolation: Isolation,
    ) -> Result<Self, EngineError> {
        let context = provider.acquire(security, isolation)?;
        Ok(Self {
            provider,
            context: Some(context),
        })
    }

    /// The guarded context
    pub fn context_mut(&mut self) -> &mut dyn IsolatedContext {
        // Only `Drop` takes the context out.
        match self.context.as_deref_mut() {
            Some(context) => context,
            None => unreachable!("context released before guard dropped"),
        }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.provider.release(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullContext {
        closed: Arc<AtomicUsize>,
    }

    impl IsolatedContext for NullContext {
        fn submit(&mut self, _submission: &Submission<'_>) -> Result<(), EngineError> {
            Ok(())
        }

        fn recv(&mut self, _wait: Duration) -> Result<Option<ContextReply>, EngineError> {
            Ok(None)
        }

        fn interrupt(&mut self) {}

        fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NullProvider {
        closed: Arc<AtomicUsize>,
    }

    impl ContextProvider for NullProvider {
        fn acquire(
            &self,
            _security: &SecurityConfig,
            _isolation: Isolation,
        ) -> Result<Box<dyn IsolatedContext>, EngineError> {
            Ok(Box::new(NullContext {
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let closed = Arc::new(AtomicUsize::new(0));
        let provider = NullProvider {
            closed: Arc::clone(&closed),
        };
        {
            let mut guard =
                ContextGuard::acquire(&provider, &SecurityConfig::default(), Isolation::Isolated)
                    .unwrap();
            assert_eq!(guard.context_mut().engine(), "unknown");
        }
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_on_unwind() {
        let closed = Arc::new(AtomicUsize::new(0));
        let provider = NullProvider {
            closed: Arc::clone(&closed),
        };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard =
                ContextGuard::acquire(&provider, &SecurityConfig::default(), Isolation::Direct)
                    .unwrap();
            panic!("run failed");
        }));
        assert!(result.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
