//! Violation categories

use serde::{Deserialize, Serialize};

/// Category of a detected security violation.
///
/// Each kind has a stable machine code (see [`SecurityErrorKind::code`]) that
/// callers can branch on, and exactly one human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityErrorKind {
    // Unbounded loops
    /// `while(true)` and equivalent always-true conditions
    InfiniteWhileLoop,
    /// `for(;;)`
    InfiniteForLoop,

    // Dynamic code execution
    /// `eval(...)`
    EvalUsage,
    /// `Function(...)` / `new Function(...)`
    FunctionConstructor,

    // Timing and scheduling
    /// `setTimeout(...)`
    SetTimeout,
    /// `setInterval(...)`
    SetInterval,
    /// `requestAnimationFrame(...)`
    RequestAnimationFrame,
    /// `setImmediate(...)`
    SetImmediate,
    /// `process.nextTick(...)`
    ProcessNextTick,

    // Network and streaming
    /// `fetch(...)`
    FetchApi,
    /// `XMLHttpRequest`
    XmlHttpRequest,
    /// `WebSocket`
    WebSocket,
    /// `EventSource`
    EventSource,

    // Concurrency escape
    /// `Worker`
    WebWorker,
    /// `SharedWorker`
    SharedWorker,
    /// `importScripts(...)`
    ImportScripts,

    // DOM injection
    /// `createElement('script')`
    DynamicScript,
    /// `.innerHTML = ...`
    InnerHtml,
    /// `.outerHTML = ...`
    OuterHtml,

    // Storage
    /// `localStorage.`
    LocalStorage,
    /// `sessionStorage.`
    SessionStorage,
    /// `indexedDB.open(...)`
    IndexedDb,

    // Blocking UI
    /// `alert(...)`
    Alert,
    /// `confirm(...)`
    Confirm,
    /// `prompt(...)`
    Prompt,

    // Crypto timing
    /// `crypto.subtle`
    CryptoSubtle,

    // Reflection / environment escape
    /// `history.pushState(...)` and friends
    HistoryApi,
    /// `navigator.`
    NavigatorAccess,
    /// `import(...)`
    DynamicImport,
    /// `require(...)`
    RequireCall,
    /// `include(...)`
    IncludeCall,
    /// `globalThis` / `global.`
    GlobalAccess,
    /// `window.`
    WindowAccess,
    /// `document.`
    DocumentAccess,
    /// `location.`
    LocationAccess,
    /// `console.`
    ConsoleAccess,
    /// `debugger`
    DebuggerStatement,
    /// `with (...)`
    WithStatement,
    /// `delete x.prototype`
    PrototypeDeletion,
    /// Assignment to `__proto__` / `prototype` / `constructor`
    PrototypePollution,
    /// Node `Buffer` primitives
    BufferAccess,
    /// Node `fs` primitives
    FileSystemAccess,
    /// Node child-process primitives
    ChildProcess,
}

impl SecurityErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [SecurityErrorKind; 43] = [
        Self::InfiniteWhileLoop,
        Self::InfiniteForLoop,
        Self::EvalUsage,
        Self::FunctionConstructor,
        Self::SetTimeout,
        Self::SetInterval,
        Self::RequestAnimationFrame,
        Self::SetImmediate,
        Self::ProcessNextTick,
        Self::FetchApi,
        Self::XmlHttpRequest,
        Self::WebSocket,
        Self::EventSource,
        Self::WebWorker,
        Self::SharedWorker,
        Self::ImportScripts,
        Self::DynamicScript,
        Self::InnerHtml,
        Self::OuterHtml,
        Self::LocalStorage,
        Self::SessionStorage,
        Self::IndexedDb,
        Self::Alert,
        Self::Confirm,
        Self::Prompt,
        Self::CryptoSubtle,
        Self::HistoryApi,
        Self::NavigatorAccess,
        Self::DynamicImport,
        Self::RequireCall,
        Self::IncludeCall,
        Self::GlobalAccess,
        Self::WindowAccess,
        Self::DocumentAccess,
        Self::LocationAccess,
        Self::ConsoleAccess,
        Self::DebuggerStatement,
        Self::WithStatement,
        Self::PrototypeDeletion,
        Self::PrototypePollution,
        Self::BufferAccess,
        Self::FileSystemAccess,
        Self::ChildProcess,
    ];

    /// Stable machine-readable code
    pub fn code(self) -> &'static str {
        match self {
            Self::InfiniteWhileLoop => "INFINITE_WHILE_LOOP",
            Self::InfiniteForLoop => "INFINITE_FOR_LOOP",
            Self::EvalUsage => "EVAL_USAGE",
            Self::FunctionConstructor => "FUNCTION_CONSTRUCTOR",
            Self::SetTimeout => "SET_TIMEOUT",
            Self::SetInterval => "SET_INTERVAL",
            Self::RequestAnimationFrame => "REQUEST_ANIMATION_FRAME",
            Self::SetImmediate => "SET_IMMEDIATE",
            Self::ProcessNextTick => "PROCESS_NEXT_TICK",
            Self::FetchApi => "FETCH_API",
            Self::XmlHttpRequest => "XML_HTTP_REQUEST",
            Self::WebSocket => "WEB_SOCKET",
            Self::EventSource => "EVENT_SOURCE",
            Self::WebWorker => "WEB_WORKER",
            Self::SharedWorker => "SHARED_WORKER",
            Self::ImportScripts => "IMPORT_SCRIPTS",
            Self::DynamicScript => "DYNAMIC_SCRIPT",
            Self::InnerHtml => "INNER_HTML",
            Self::OuterHtml => "OUTER_HTML",
            Self::LocalStorage => "LOCAL_STORAGE",
            Self::SessionStorage => "SESSION_STORAGE",
            Self::IndexedDb => "INDEXED_DB",
            Self::Alert => "ALERT",
            Self::Confirm => "CONFIRM",
            Self::Prompt => "PROMPT",
            Self::CryptoSubtle => "CRYPTO_SUBTLE",
            Self::HistoryApi => "HISTORY_API",
            Self::NavigatorAccess => "NAVIGATOR_ACCESS",
            Self::DynamicImport => "DYNAMIC_IMPORT",
            Self::RequireCall => "REQUIRE_CALL",
            Self::IncludeCall => "INCLUDE_CALL",
            Self::GlobalAccess => "GLOBAL_ACCESS",
            Self::WindowAccess => "WINDOW_ACCESS",
            Self::DocumentAccess => "DOCUMENT_ACCESS",
            Self::LocationAccess => "LOCATION_ACCESS",
            Self::ConsoleAccess => "CONSOLE_ACCESS",
            Self::DebuggerStatement => "DEBUGGER_STATEMENT",
            Self::WithStatement => "WITH_STATEMENT",
            Self::PrototypeDeletion => "PROTOTYPE_DELETION",
            Self::PrototypePollution => "PROTOTYPE_POLLUTION",
            Self::BufferAccess => "BUFFER_ACCESS",
            Self::FileSystemAccess => "FILE_SYSTEM_ACCESS",
            Self::ChildProcess => "CHILD_PROCESS",
        }
    }

    /// Human-readable explanation of why the construct is rejected
    pub fn explanation(self) -> &'static str {
        match self {
            Self::InfiniteWhileLoop => {
                "Infinite while loops never terminate and would hang the benchmark"
            }
            Self::InfiniteForLoop => {
                "Infinite for loops never terminate and would hang the benchmark"
            }
            Self::EvalUsage => "eval() executes dynamically generated code that cannot be validated",
            Self::FunctionConstructor => {
                "The Function constructor compiles dynamically generated code that cannot be validated"
            }
            Self::SetTimeout => "setTimeout() schedules work outside the measured region",
            Self::SetInterval => "setInterval() schedules repeating work outside the measured region",
            Self::RequestAnimationFrame => {
                "requestAnimationFrame() ties execution to the display refresh cycle"
            }
            Self::SetImmediate => "setImmediate() schedules work outside the measured region",
            Self::ProcessNextTick => "process.nextTick() schedules work outside the measured region",
            Self::FetchApi => "Network requests are not allowed and would dominate timings",
            Self::XmlHttpRequest => "XMLHttpRequest network access is not allowed",
            Self::WebSocket => "WebSocket connections are not allowed",
            Self::EventSource => "EventSource streaming connections are not allowed",
            Self::WebWorker => "Spawning workers escapes the measured execution context",
            Self::SharedWorker => "Spawning shared workers escapes the measured execution context",
            Self::ImportScripts => "importScripts() loads external code that cannot be validated",
            Self::DynamicScript => "Creating script elements injects code that cannot be validated",
            Self::InnerHtml => "Assigning innerHTML can inject executable markup",
            Self::OuterHtml => "Assigning outerHTML can inject executable markup",
            Self::LocalStorage => "localStorage access persists state between runs",
            Self::SessionStorage => "sessionStorage access persists state between runs",
            Self::IndexedDb => "IndexedDB access persists state between runs",
            Self::Alert => "alert() blocks execution waiting for user input",
            Self::Confirm => "confirm() blocks execution waiting for user input",
            Self::Prompt => "prompt() blocks execution waiting for user input",
            Self::CryptoSubtle => {
                "crypto.subtle operations are asynchronous and enable timing side channels"
            }
            Self::HistoryApi => "History API access manipulates the host navigation state",
            Self::NavigatorAccess => "navigator access exposes host environment details",
            Self::DynamicImport => "Dynamic import() loads external code that cannot be validated",
            Self::RequireCall => "require() loads host modules outside the sandbox",
            Self::IncludeCall => "include() loads external code that cannot be validated",
            Self::GlobalAccess => "Direct global object access can reach disabled host APIs",
            Self::WindowAccess => "window access can reach disabled host APIs",
            Self::DocumentAccess => "document access manipulates the host page",
            Self::LocationAccess => "location access can navigate away from the sandbox",
            Self::ConsoleAccess => "console output adds I/O cost to the measured region",
            Self::DebuggerStatement => "debugger statements pause execution when tools are attached",
            Self::WithStatement => "with statements obscure scope resolution and defeat validation",
            Self::PrototypeDeletion => "Deleting prototype members corrupts shared built-ins",
            Self::PrototypePollution => "Assigning to prototype members pollutes shared built-ins",
            Self::BufferAccess => "Buffer primitives expose raw host memory",
            Self::FileSystemAccess => "File system access is not allowed",
            Self::ChildProcess => "Spawning child processes escapes the sandbox",
        }
    }

    /// Whether the kind belongs to the reflection/environment-escape family
    pub fn is_extended(self) -> bool {
        self >= Self::HistoryApi
    }
}

impl std::fmt::Display for SecurityErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for SecurityErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown security error kind: {}", s))
    }
}
