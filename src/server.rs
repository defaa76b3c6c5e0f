//! Shared data structures for talking to editors, mostly handled in `connection`

use std::error::Error;
use std::fmt;
use std::io;

use crate::debugger::DebuggerCmd;

/// Severity of a log message, the editor decides which levels to show
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    CRITICAL = 1,
    ERROR,
    WARN,
    INFO,
    DEBUG,
}

/// Something every connected editor should hear about
///
/// The command names an editor function and the JSON values are its arguments. For example, a
/// `Notification` with a command `sketchdbg#debugger#JumpToPosition` and arguments
/// `["Tab.pde", 3]` asks the editor to show line 3 of `Tab.pde` as the current line.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    cmd: String,
    args: Vec<serde_json::Value>,
}

impl Notification {
    pub fn new(cmd: String, args: Vec<serde_json::Value>) -> Self {
        Notification { cmd, args }
    }

    pub fn cmd(&self) -> &str {
        self.cmd.as_ref()
    }

    pub fn args(&self) -> &Vec<serde_json::Value> {
        &self.args
    }
}

/// Commands handled by the server itself rather than the debug session
#[derive(Clone, Debug, PartialEq)]
pub enum ServerCmd {
    Ping,
    Pings,
    GetConfig(String),
    SetConfig(String, i64),
}

/// Contains command details of a request, either a `ServerCmd` or a `DebuggerCmd`
#[derive(Clone, Debug, PartialEq)]
pub enum RequestCmd {
    ServerCmd(ServerCmd),
    DebuggerCmd(DebuggerCmd),
}

/// A decoded editor request, the id is echoed back in the response
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    id: u64,
    cmd: RequestCmd,
}

impl Request {
    pub fn new(id: u64, cmd: RequestCmd) -> Self {
        Request { id, cmd }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cmd(&self) -> &RequestCmd {
        &self.cmd
    }
}

/// Reply to the request with the same id
///
/// `Response::new(1, json!({"status":"OK"}))` goes over the wire as `[1,{"status":"OK"}]`, only
/// to the connection the request came in on.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    id: u64,
    resp: serde_json::Value,
}

impl Response {
    pub fn new(id: u64, resp: serde_json::Value) -> Self {
        Response { id, resp }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn resp(&self) -> &serde_json::Value {
        &self.resp
    }
}

/// Data to be sent back to a connection, either a `Response` to a request or a `Notification`
/// of an event
#[derive(Clone, Debug, PartialEq)]
pub enum SendMsg {
    Response(Response),
    Notification(Notification),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DebugErrorKind {
    GenericError,
    RequestSyntaxError,
    /// The build collaborator failed to compile the sources
    BuildError,
    /// The remote process failed to start
    LaunchError,
    /// No code location exists for a breakpoint line
    UnresolvedLineError,
    /// Frames or variables were requested from a thread that isn't suspended
    ThreadStateError,
    /// The remote process died or the connection to it was lost
    ProtocolDisconnect,
    /// Any other failure reported by the remote protocol
    ProtocolError,
}

#[derive(Clone, Debug)]
pub struct DebugError {
    kind: DebugErrorKind,
    error_string: String,
    debug_string: String,
}

impl DebugError {
    pub fn new(kind: DebugErrorKind, error_string: String, debug_string: String) -> Self {
        DebugError {
            kind,
            error_string,
            debug_string,
        }
    }

    pub fn kind(&self) -> DebugErrorKind {
        self.kind
    }

    pub fn get_error_string(&self) -> &str {
        &self.error_string
    }

    pub fn get_debug_string(&self) -> &str {
        &self.debug_string
    }
}

impl fmt::Display for DebugError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.error_string)
    }
}

impl Error for DebugError {}

impl From<io::Error> for DebugError {
    fn from(err: io::Error) -> DebugError {
        DebugError::new(
            DebugErrorKind::GenericError,
            "Generic error".to_string(),
            format!("Generic error {}", err),
        )
    }
}
