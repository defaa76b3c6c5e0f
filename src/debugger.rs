//! Debugger value types
//!
//! Types shared between the session, the editor protocol and the remote process interfaces.

use std::fmt;

/// A line in a file, the line index is 0-based.
///
/// Used for both sketch space (a tab of the editor) and target space (the generated file).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePosition {
    file: String,
    line_index: usize,
}

impl SourcePosition {
    pub fn new(file: String, line_index: usize) -> Self {
        SourcePosition { file, line_index }
    }

    pub fn file(&self) -> &str {
        &self.file[..]
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    /// The 1-based line number, as shown to people
    pub fn line_num(&self) -> u64 {
        self.line_index as u64 + 1
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line_num())
    }
}

/// Step granularity for a single-shot step request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    Over,
    Into,
    Out,
}

/// Debug session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Launching,
    Running,
    Paused,
}

/// All debugger commands an editor can send
#[derive(Clone, Debug, PartialEq)]
pub enum DebuggerCmd {
    Start,
    Stop,
    Continue,
    Step(StepKind),
    Breakpoint(SourcePosition),
    Unbreakpoint(SourcePosition),
    // None means at the cursor
    ToggleBreakpoint(Option<SourcePosition>),
    ListBreakpoints,
    Cursor(SourcePosition),
    // File and text
    Open(String, String),
    // File, offset and text
    Insert(String, usize, String),
    // File, offset and length
    Remove(String, usize, usize),
}
