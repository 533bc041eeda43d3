//! Engine and API errors

use sandbench_guard::CodeRejection;
use sandbench_ipc::FrameError;
use thiserror::Error;

/// Fault in the execution substrate (not in the candidate code)
#[derive(Debug, Error)]
pub enum EngineError {
    /// Worker process or evaluator thread could not be started
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Transport failure
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Worker died or its channel closed
    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),

    /// Worker reported a harness-level fault
    #[error("Worker fault: {0}")]
    WorkerFault(String),

    /// Unexpected message
    #[error("Worker protocol error: expected {expected}, got {got}")]
    Protocol {
        /// What the host waited for
        expected: String,
        /// What arrived
        got: String,
    },

    /// The requested isolation mode cannot be provided
    #[error("Isolated context unavailable: {0}")]
    IsolationUnavailable(String),

    /// Cancellation observed before submission
    #[error("Run cancelled")]
    Cancelled,
}

impl From<FrameError> for EngineError {
    fn from(e: FrameError) -> Self {
        EngineError::Ipc(e.to_string())
    }
}

impl EngineError {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Spawn(_) => "SPAWN_FAILED",
            EngineError::Ipc(_) => "IPC_ERROR",
            EngineError::WorkerCrashed(_) => "WORKER_CRASHED",
            EngineError::WorkerFault(_) => "WORKER_FAULT",
            EngineError::Protocol { .. } => "PROTOCOL_ERROR",
            EngineError::IsolationUnavailable(_) => "ISOLATION_UNAVAILABLE",
            EngineError::Cancelled => "CANCELLED",
        }
    }
}

/// Errors returned to callers of the `Benchmarker`
#[derive(Debug, Error)]
pub enum BenchError {
    /// The snippet failed validation; no samples were taken
    #[error(transparent)]
    Rejected(#[from] CodeRejection),

    /// The benchmarker was disposed
    #[error("Benchmarker has been disposed")]
    Disposed,

    /// Configuration cannot be honored
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BenchError {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BenchError::Rejected(rejection) => rejection.code(),
            BenchError::Disposed => "DISPOSED",
            BenchError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }

    /// The validation failure, if this error is a rejection
    pub fn rejection(&self) -> Option<&CodeRejection> {
        match self {
            BenchError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
