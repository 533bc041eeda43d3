//! Inline context: direct evaluation through a caller-supplied closure.
//!
//! The evaluator runs on a dedicated thread inside the caller's process, so
//! nothing separates the snippet from the host. Only `Isolation::Direct` is
//! offered. A timed-out evaluation cannot be stopped; its thread is
//! abandoned and a fresh one takes over.

use crate::config::SecurityConfig;
use crate::context::{ContextProvider, ContextReply, IsolatedContext, Submission};
use crate::error::EngineError;
use sandbench_ipc::{FailureKind, Isolation};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Evaluates raw snippet source; `Err` carries the thrown message
pub type Evaluator = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Provider of inline contexts
#[derive(Clone)]
pub struct InlineProvider {
    evaluator: Evaluator,
}

impl InlineProvider {
    /// Provider around `evaluator`
    pub fn new<F>(evaluator: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            evaluator: Arc::new(evaluator),
        }
    }
}

impl std::fmt::Debug for InlineProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineProvider").finish_non_exhaustive()
    }
}

impl ContextProvider for InlineProvider {
    fn acquire(
        &self,
        _security: &SecurityConfig,
        isolation: Isolation,
    ) -> Result<Box<dyn IsolatedContext>, EngineError> {
        if isolation == Isolation::Isolated {
            return Err(EngineError::IsolationUnavailable(
                "inline evaluation runs in the caller's own context".to_string(),
            ));
        }
        warn!("direct evaluation: snippet runs without isolation");
        Ok(Box::new(InlineContext::start(Arc::clone(&self.evaluator))?))
    }
}

struct Job {
    id: u64,
    source: String,
}

struct InlineContext {
    evaluator: Evaluator,
    jobs: Sender<Job>,
    replies: Receiver<ContextReply>,
}

impl InlineContext {
    fn start(evaluator: Evaluator) -> Result<Self, EngineError> {
        let (jobs, replies) = spawn_evaluator(Arc::clone(&evaluator))?;
        Ok(Self {
            evaluator,
            jobs,
            replies,
        })
    }
}

fn spawn_evaluator(
    evaluator: Evaluator,
) -> Result<(Sender<Job>, Receiver<ContextReply>), EngineError> {
    let (job_tx, job_rx) = mpsc::channel::<Job>();
    let (reply_tx, reply_rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("sandbench-inline".to_string())
        .spawn(move || {
            for job in job_rx {
                let start = Instant::now();
                let result = catch_unwind(AssertUnwindSafe(|| (*evaluator)(&job.source)));
                let elapsed = start.elapsed();

                let reply = match result {
                    Ok(Ok(())) => ContextReply::succeeded(job.id, elapsed),
                    Ok(Err(message)) => {
                        ContextReply::failed(job.id, elapsed, FailureKind::Thrown, message)
                    }
                    Err(panic) => {
                        let message = if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        };
                        ContextReply::failed(job.id, elapsed, FailureKind::Thrown, message)
                    }
                };

                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
        })
        .map_err(EngineError::Spawn)?;

    Ok((job_tx, reply_rx))
}

impl IsolatedContext for InlineContext {
    fn submit(&mut self, submission: &Submission<'_>) -> Result<(), EngineError> {
        self.jobs
            .send(Job {
                id: submission.id,
                source: submission.source.to_string(),
            })
            .map_err(|_| EngineError::WorkerCrashed("inline evaluator thread exited".to_string()))
    }

    fn recv(&mut self, wait: Duration) -> Result<Option<ContextReply>, EngineError> {
        match self.replies.recv_timeout(wait) {
            Ok(reply) => Ok(Some(reply)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::WorkerCrashed(
                "inline evaluator thread exited".to_string(),
            )),
        }
    }

    fn interrupt(&mut self) {
        debug!("abandoning inline evaluator thread");
        match spawn_evaluator(Arc::clone(&self.evaluator)) {
            Ok((jobs, replies)) => {
                self.jobs = jobs;
                self.replies = replies;
            }
            Err(e) => warn!(error = %e, "failed to replace inline evaluator thread"),
        }
    }

    fn close(self: Box<Self>) {}

    fn engine(&self) -> &str {
        "inline"
    }
}
