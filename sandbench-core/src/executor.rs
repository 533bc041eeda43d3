//! Sandboxed Executor
//!
//! Wraps a snippet in timing scaffolding, submits it with a fresh
//! correlation id and races the reply against the per-sample timeout.

use crate::cancel::CancellationToken;
use crate::context::{IsolatedContext, Submission};
use crate::error::EngineError;
use sandbench_ipc::FailureKind;
use sandbench_stats::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Longest single wait on the context before re-checking the deadline
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Extra time granted after the timeout for the context's own reply to arrive
const REPLY_GRACE: Duration = Duration::from_millis(100);

static NEXT_CORRELATION_ID: AtomicU64 = AtomicU64::new(1);

fn next_correlation_id() -> u64 {
    NEXT_CORRELATION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Snippet source together with its wrapped, self-timing form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSnippet {
    source: String,
    script: String,
}

impl PreparedSnippet {
    /// Wrap `source` so that it measures itself with `performance.now()` and
    /// resolves to `{ success, elapsed, error? }` instead of throwing.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let script = format!(
            r#"(async () => {{
  const __sbStart = performance.now();
  try {{
    await (async () => {{
{source}
    }})();
    return {{ success: true, elapsed: performance.now() - __sbStart }};
  }} catch (__sbError) {{
    let message;
    if (__sbError instanceof Error) {{
      message = __sbError.message;
    }} else if (typeof __sbError === 'string') {{
      message = __sbError;
    }} else {{
      try {{
        message = JSON.stringify(__sbError);
      }} catch (_) {{
        message = undefined;
      }}
      if (message === undefined) message = String(__sbError);
    }}
    return {{ success: false, elapsed: performance.now() - __sbStart, error: message }};
  }}
}})()"#
        );
        Self { source, script }
    }

    /// Caller's original source
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Wrapped script
    pub fn script(&self) -> &str {
        &self.script
    }
}

/// Result of one execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Whether the snippet completed without throwing
    pub success: bool,
    /// Measured elapsed time
    pub elapsed: Duration,
    /// Normalized error message
    pub error: Option<String>,
    /// Failure category
    pub failure: Option<FailureKind>,
}

impl ExecutionOutcome {
    fn timed_out(timeout: Duration, elapsed: Duration) -> Self {
        Self {
            success: false,
            elapsed,
            error: Some(format!(
                "Execution timed out after {}ms",
                timeout.as_millis()
            )),
            failure: Some(FailureKind::Timeout),
        }
    }

    /// Convert into a sample
    pub fn into_sample(self) -> Sample {
        if self.success {
            Sample::succeeded(self.elapsed)
        } else {
            Sample::failed(
                self.elapsed,
                self.error.unwrap_or_else(|| "Execution failed".to_string()),
            )
        }
    }
}

/// Runs prepared snippets against one context
pub struct SandboxedExecutor<'c> {
    context: &'c mut dyn IsolatedContext,
    csp: Option<String>,
}

impl<'c> SandboxedExecutor<'c> {
    /// Executor over a borrowed context
    pub fn new(context: &'c mut dyn IsolatedContext) -> Self {
        Self { context, csp: None }
    }

    /// Policy override sent with every submission
    pub fn with_csp(mut self, csp: impl Into<String>) -> Self {
        self.csp = Some(csp.into());
        self
    }

    /// Execute once.
    ///
    /// Execution failures (throws, timeouts) are returned as unsuccessful
    /// outcomes. `Err` means the context itself is unusable. The token is
    /// consulted only before submission; an in-flight execution is bounded by
    /// `timeout`, not by cancellation.
    pub fn run_once(
        &mut self,
        snippet: &PreparedSnippet,
        timeout: Duration,
        token: &CancellationToken,
    ) -> Result<ExecutionOutcome, EngineError> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let id = next_correlation_id();
        self.context.submit(&Submission {
            id,
            source: snippet.source(),
            script: snippet.script(),
            timeout,
            csp: self.csp.as_deref(),
        })?;

        let started = Instant::now();
        let deadline = started + timeout + REPLY_GRACE;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(id, ?timeout, "execution timed out, interrupting context");
                self.context.interrupt();
                return Ok(ExecutionOutcome::timed_out(timeout, started.elapsed()));
            }

            match self.context.recv(remaining.min(POLL_SLICE))? {
                Some(reply) if reply.id == id => {
                    return Ok(ExecutionOutcome {
                        success: reply.success,
                        elapsed: reply.elapsed,
                        error: reply.error,
                        failure: reply.failure,
                    });
                }
                Some(reply) => {
                    debug!(expected = id, got = reply.id, "ignoring stale reply");
                }
                None => {}
            }
        }
    }
}
