//! Process context
//!
//! Runs snippets in an interpreter worker process executing the bundled
//! harness. Commands go over the worker's stdin, messages come back on its
//! stdout, one JSON document per line.

use crate::config::SecurityConfig;
use crate::context::{ContextProvider, ContextReply, IsolatedContext, Submission};
use crate::error::EngineError;
use sandbench_ipc::{
    FailureKind, FrameError, FrameReader, FrameWriter, HostCommand, Isolation, PROTOCOL_VERSION,
    WORKER_ENV_VAR, WorkerMessage, WorkerSettings,
};
use std::ffi::OsString;
use std::os::unix::io::{AsRawFd, RawFd};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Harness evaluated by the interpreter with `-e`
const HARNESS: &str = include_str!("../harness/worker.js");

/// Result of polling for data
#[derive(Debug)]
enum PollResult {
    DataAvailable,
    Timeout,
    PipeClosed,
    Error(std::io::Error),
}

/// Wait for data to be available on a file descriptor with timeout
fn wait_for_data(fd: RawFd, timeout: Duration) -> PollResult {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

    let result = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

    if result < 0 {
        PollResult::Error(std::io::Error::last_os_error())
    } else if result == 0 {
        PollResult::Timeout
    } else if pollfd.revents & libc::POLLIN != 0 {
        // Even if the pipe is closing there might be data left
        PollResult::DataAvailable
    } else if pollfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        PollResult::PipeClosed
    } else {
        PollResult::Timeout
    }
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Spawns interpreter workers
#[derive(Debug, Clone)]
pub struct ProcessProvider {
    interpreter: OsString,
    handshake_timeout: Duration,
}

impl Default for ProcessProvider {
    fn default() -> Self {
        Self {
            interpreter: OsString::from("node"),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl ProcessProvider {
    /// Provider using `node` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different interpreter binary
    pub fn with_interpreter(mut self, interpreter: impl Into<OsString>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// How long to wait for the worker's hello
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl ContextProvider for ProcessProvider {
    fn acquire(
        &self,
        security: &SecurityConfig,
        isolation: Isolation,
    ) -> Result<Box<dyn IsolatedContext>, EngineError> {
        if isolation == Isolation::Direct {
            warn!("direct evaluation: snippets share the worker's global context");
        }
        let settings = security.worker_settings(isolation);
        let worker = WorkerHandle::spawn(&self.interpreter, &settings, self.handshake_timeout)?;
        if isolation == Isolation::Isolated && !worker.isolated {
            return Err(EngineError::IsolationUnavailable(format!(
                "{} worker does not isolate scripts",
                worker.engine
            )));
        }
        Ok(Box::new(ProcessContext {
            interpreter: self.interpreter.clone(),
            settings,
            handshake_timeout: self.handshake_timeout,
            engine: worker.engine.clone(),
            worker: Some(worker),
            pending: None,
        }))
    }
}

/// Worker process handle
struct WorkerHandle {
    child: Child,
    reader: FrameReader<ChildStdout>,
    writer: FrameWriter<ChildStdin>,
    msg_read_fd: RawFd,
    engine: String,
    isolated: bool,
}

impl WorkerHandle {
    fn spawn(
        interpreter: &OsString,
        settings: &WorkerSettings,
        handshake_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let env = settings
            .to_env_value()
            .map_err(|e| EngineError::Ipc(e.to_string()))?;

        let mut command = Command::new(interpreter);
        if settings.max_memory_mb > 0 {
            command.arg(format!("--max-old-space-size={}", settings.max_memory_mb));
        }
        if !settings.allows_eval() {
            command.arg("--disallow-code-generation-from-strings");
        }
        command
            .arg("-e")
            .arg(HARNESS)
            .env(WORKER_ENV_VAR, env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(EngineError::Spawn)?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Spawn(std::io::Error::other(
                    "worker pipes unavailable",
                )));
            }
        };

        let msg_read_fd = stdout.as_raw_fd();
        let mut handle = Self {
            child,
            reader: FrameReader::new(stdout),
            writer: FrameWriter::new(stdin),
            msg_read_fd,
            engine: String::new(),
            isolated: false,
        };

        handle.wait_for_hello(handshake_timeout)?;
        debug!(engine = %handle.engine, pid = handle.child.id(), "worker ready");
        Ok(handle)
    }

    /// Wait for Hello message from worker and validate protocol version
    fn wait_for_hello(&mut self, timeout: Duration) -> Result<(), EngineError> {
        if !self.reader.has_complete_frame() {
            match wait_for_data(self.msg_read_fd, timeout) {
                PollResult::DataAvailable => {}
                PollResult::Timeout => {
                    return Err(EngineError::WorkerCrashed(
                        "Timeout waiting for worker hello".to_string(),
                    ));
                }
                PollResult::PipeClosed => {
                    return Err(EngineError::WorkerCrashed(
                        "Worker exited before hello".to_string(),
                    ));
                }
                PollResult::Error(e) => {
                    return Err(EngineError::WorkerCrashed(format!("Pipe error: {}", e)));
                }
            }
        }

        match self.reader.read::<WorkerMessage>() {
            Ok(WorkerMessage::Hello {
                protocol_version,
                engine,
                isolated,
            }) => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(EngineError::Protocol {
                        expected: format!("protocol version {}", PROTOCOL_VERSION),
                        got: format!("protocol version {}", protocol_version),
                    });
                }
                self.engine = engine;
                self.isolated = isolated;
                Ok(())
            }
            Ok(other) => Err(EngineError::Protocol {
                expected: "Hello".to_string(),
                got: format!("{:?}", other),
            }),
            Err(FrameError::EndOfStream) => Err(EngineError::WorkerCrashed(
                "Worker exited before hello".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn send(&mut self, command: &HostCommand) -> Result<(), EngineError> {
        self.writer.write(command)?;
        Ok(())
    }

    /// Check if worker process is still running
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// SIGTERM, brief grace period, then SIGKILL
    fn terminate(&mut self) {
        if self.is_alive() {
            let _ = send_sigterm(self.child.id());
            std::thread::sleep(Duration::from_millis(50));
            if self.is_alive() {
                let _ = self.child.kill();
            }
        }
        let _ = self.child.wait();
    }

    /// Ask the worker to exit, escalating if it does not
    fn shutdown(mut self) {
        if self.send(&HostCommand::Shutdown).is_ok() {
            let deadline = Instant::now() + Duration::from_millis(500);
            while Instant::now() < deadline {
                if !self.is_alive() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        self.terminate();
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Context backed by one worker process, respawned after interrupts
struct ProcessContext {
    interpreter: OsString,
    settings: WorkerSettings,
    handshake_timeout: Duration,
    engine: String,
    worker: Option<WorkerHandle>,
    pending: Option<u64>,
}

impl ProcessContext {
    fn worker(&mut self) -> Result<&mut WorkerHandle, EngineError> {
        if self.worker.is_none() {
            debug!("respawning worker");
            let worker =
                WorkerHandle::spawn(&self.interpreter, &self.settings, self.handshake_timeout)?;
            self.worker = Some(worker);
        }
        match self.worker.as_mut() {
            Some(worker) => Ok(worker),
            None => unreachable!("worker spawned above"),
        }
    }

    /// Drop the worker and turn the pending submission into a crash reply
    fn crashed(&mut self, message: &str) -> Result<Option<ContextReply>, EngineError> {
        warn!(reason = message, "worker crashed");
        self.worker = None;
        match self.pending.take() {
            Some(id) => Ok(Some(ContextReply::failed(
                id,
                Duration::ZERO,
                FailureKind::Crashed,
                message,
            ))),
            None => Err(EngineError::WorkerCrashed(message.to_string())),
        }
    }
}

impl IsolatedContext for ProcessContext {
    fn submit(&mut self, submission: &Submission<'_>) -> Result<(), EngineError> {
        let command = HostCommand::Run {
            id: submission.id,
            script: submission.script.to_string(),
            timeout_ms: submission.timeout.as_secs_f64() * 1000.0,
            csp: submission.csp.map(str::to_string),
        };
        self.worker()?.send(&command)?;
        self.pending = Some(submission.id);
        Ok(())
    }

    fn recv(&mut self, wait: Duration) -> Result<Option<ContextReply>, EngineError> {
        let Some(worker) = self.worker.as_mut() else {
            return Err(EngineError::WorkerCrashed("no worker running".to_string()));
        };

        // A buffered partial line can only complete if the worker is alive
        if !worker.reader.has_complete_frame() {
            match wait_for_data(worker.msg_read_fd, wait) {
                PollResult::DataAvailable => {}
                PollResult::Timeout => {
                    if !worker.is_alive() {
                        return self.crashed("Worker process exited unexpectedly");
                    }
                    return Ok(None);
                }
                PollResult::PipeClosed => return self.crashed("Worker pipe closed unexpectedly"),
                PollResult::Error(e) => return Err(EngineError::Ipc(format!("Pipe error: {}", e))),
            }
        }

        match worker.reader.read::<WorkerMessage>() {
            Ok(WorkerMessage::Result {
                id,
                success,
                elapsed_ms,
                error,
                failure,
            }) => {
                if self.pending == Some(id) {
                    self.pending = None;
                }
                let elapsed = Duration::from_secs_f64(elapsed_ms.max(0.0) / 1000.0);
                Ok(Some(ContextReply {
                    id,
                    success,
                    elapsed,
                    error,
                    failure: if success {
                        None
                    } else {
                        Some(failure.unwrap_or(FailureKind::Thrown))
                    },
                }))
            }
            Ok(WorkerMessage::Fault { id: Some(id), message }) if self.pending == Some(id) => {
                self.pending = None;
                Err(EngineError::WorkerFault(message))
            }
            Ok(WorkerMessage::Fault { id, message }) => {
                warn!(?id, fault = %message, "worker fault");
                Ok(None)
            }
            Ok(WorkerMessage::Hello { .. }) => Err(EngineError::Protocol {
                expected: "Result/Fault".to_string(),
                got: "Hello".to_string(),
            }),
            Err(FrameError::Deserialization(e)) => {
                warn!(error = %e, "ignoring non-protocol worker output");
                Ok(None)
            }
            Err(FrameError::EndOfStream) => self.crashed("Worker closed connection unexpectedly"),
            Err(e) => {
                if !worker.is_alive() {
                    return self.crashed("Worker crashed during read");
                }
                Err(e.into())
            }
        }
    }

    fn interrupt(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            debug!(pid = worker.child.id(), "terminating worker");
            worker.terminate();
        }
        self.pending = None;
    }

    fn close(mut self: Box<Self>) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }

    fn engine(&self) -> &str {
        &self.engine
    }
}
