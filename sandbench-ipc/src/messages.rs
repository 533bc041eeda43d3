//! IPC Message Types
//!
//! Every message is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

/// How a script is evaluated inside the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Fresh context per script with a reduced global surface
    #[default]
    Isolated,
    /// Evaluated in the worker's own global context
    Direct,
}

impl Isolation {
    /// Isolation for the `use_isolated_context` flag
    pub fn from_flag(isolated: bool) -> Self {
        if isolated {
            Isolation::Isolated
        } else {
            Isolation::Direct
        }
    }
}

/// Categories of sample failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The script threw or rejected
    Thrown,
    /// Per-sample timeout exceeded
    Timeout,
    /// The worker died mid-execution
    Crashed,
    /// The context could not be created or used
    Engine,
}

/// Worker configuration, passed once at spawn time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Evaluation mode
    pub isolation: Isolation,
    /// Policy string; `'unsafe-eval'` enables string code generation
    pub content_security_policy: String,
    /// Globals forced to `undefined` in isolated contexts
    pub disabled_globals: Vec<String>,
    /// Strip network primitives even if not listed in `disabled_globals`
    pub disable_network: bool,
    /// Advisory heap limit in MiB
    pub max_memory_mb: u64,
}

impl WorkerSettings {
    /// Whether the policy permits `eval`-style code generation
    pub fn allows_eval(&self) -> bool {
        self.content_security_policy.contains("'unsafe-eval'")
    }

    /// Encode for the worker environment variable
    pub fn to_env_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the worker environment variable
    pub fn from_env_value(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

/// Commands sent from host to worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    /// Evaluate one prepared script and report its timing
    Run {
        /// Correlation id echoed back in the result
        id: u64,
        /// Prepared script source
        script: String,
        /// Per-sample timeout in milliseconds
        timeout_ms: f64,
        /// Policy override for this run
        #[serde(default, skip_serializing_if = "Option::is_none")]
        csp: Option<String>,
    },

    /// Request graceful shutdown
    Shutdown,
}

/// Messages sent from worker to host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Initial handshake
    Hello {
        /// Protocol version for compatibility
        protocol_version: u32,
        /// Interpreter name and version (for reports)
        engine: String,
        /// Whether scripts run in fresh isolated contexts
        isolated: bool,
    },

    /// Outcome of one `Run`
    Result {
        /// Correlation id of the command
        id: u64,
        /// Whether the script completed without throwing
        success: bool,
        /// Elapsed time measured inside the worker
        elapsed_ms: f64,
        /// Normalized error message
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Failure category when `success` is false
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<FailureKind>,
    },

    /// Harness-level failure not tied to a script outcome
    Fault {
        /// Correlation id, if the fault happened while handling a command
        #[serde(default)]
        id: Option<u64>,
        /// Human-readable description
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd = HostCommand::Run {
            id: 7,
            script: "1 + 1".to_string(),
            timeout_ms: 250.0,
            csp: None,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "run");
        assert_eq!(json["id"], 7);
        assert!(json.get("csp").is_none());

        let json = serde_json::to_string(&HostCommand::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn test_parse_worker_messages() {
        let hello: WorkerMessage = serde_json::from_str(
            r#"{"type":"hello","protocol_version":1,"engine":"node v20.11.0","isolated":true}"#,
        )
        .unwrap();
        assert!(matches!(hello, WorkerMessage::Hello { protocol_version: 1, isolated: true, .. }));

        let result: WorkerMessage = serde_json::from_str(
            r#"{"type":"result","id":3,"success":false,"elapsed_ms":0.25,"error":"boom","failure":"thrown"}"#,
        )
        .unwrap();
        assert_eq!(
            result,
            WorkerMessage::Result {
                id: 3,
                success: false,
                elapsed_ms: 0.25,
                error: Some("boom".to_string()),
                failure: Some(FailureKind::Thrown),
            }
        );

        let fault: WorkerMessage =
            serde_json::from_str(r#"{"type":"fault","message":"bad command"}"#).unwrap();
        assert!(matches!(fault, WorkerMessage::Fault { id: None, .. }));
    }

    #[test]
    fn test_settings_allow_eval() {
        let mut settings = WorkerSettings {
            isolation: Isolation::Isolated,
            content_security_policy: "default-src 'none'; script-src 'self'".to_string(),
            disabled_globals: vec!["fetch".to_string()],
            disable_network: true,
            max_memory_mb: 128,
        };
        assert!(!settings.allows_eval());
        settings.content_security_policy.push_str(" 'unsafe-eval'");
        assert!(settings.allows_eval());

        let env = settings.to_env_value().unwrap();
        assert_eq!(WorkerSettings::from_env_value(&env).unwrap(), settings);
    }

    #[test]
    fn test_isolation_from_flag() {
        assert_eq!(Isolation::from_flag(true), Isolation::Isolated);
        assert_eq!(Isolation::from_flag(false), Isolation::Direct);
        assert_eq!(serde_json::to_string(&Isolation::Direct).unwrap(), "\"direct\"");
    }
}
