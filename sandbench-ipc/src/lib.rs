#![warn(missing_docs)]
//! Sandbench IPC Protocol
//!
//! Newline-delimited JSON protocol between the host and a script worker
//! process. The worker is an interpreter running a bundled harness, so the
//! wire format must be trivially producible from script code.

mod framing;
mod messages;

pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE, read_frame, write_frame};
pub use messages::{FailureKind, HostCommand, Isolation, WorkerMessage, WorkerSettings};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable carrying the JSON-encoded `WorkerSettings`
pub const WORKER_ENV_VAR: &str = "SANDBENCH_WORKER";
