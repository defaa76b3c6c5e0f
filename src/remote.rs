//! Remote process interfaces
//!
//! Everything the session needs from the outside world: something that builds the tabs into a
//! generated program, something that launches it, and the debugging protocol handle for the
//! launched process. Code locations in here are always in target space (the generated file) with
//! 0-based line indices.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::debugger::{SourcePosition, StepKind};

/// Identifies a request registered with the remote process
pub type RequestId = u64;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadRef {
    id: u64,
    name: String,
}

impl ThreadRef {
    pub fn new(id: u64, name: String) -> Self {
        ThreadRef { id, name }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassRef {
    id: u64,
    name: String,
}

impl ClassRef {
    pub fn new(id: u64, name: String) -> Self {
        ClassRef { id, name }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An executable location in the remote process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeLocation {
    declaring_class: String,
    method: String,
    position: SourcePosition,
}

impl CodeLocation {
    pub fn new(declaring_class: String, method: String, position: SourcePosition) -> Self {
        CodeLocation {
            declaring_class,
            method,
            position,
        }
    }

    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn position(&self) -> &SourcePosition {
        &self.position
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    id: u64,
    type_name: String,
}

impl ObjectRef {
    pub fn new(id: u64, type_name: String) -> Self {
        ObjectRef { id, type_name }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RemoteValue {
    Null,
    /// A primitive or string value already rendered as text
    Primitive(String),
    Object(ObjectRef),
}

/// A local variable or field
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    name: String,
    type_name: String,
    value: RemoteValue,
}

impl Variable {
    pub fn new(name: String, type_name: String, value: RemoteValue) -> Self {
        Variable {
            name,
            type_name,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn value(&self) -> &RemoteValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RemoteEvent {
    VmStart {
        thread: ThreadRef,
    },
    ClassPrepare {
        class: ClassRef,
        thread: ThreadRef,
    },
    Breakpoint {
        thread: ThreadRef,
        location: CodeLocation,
        request: RequestId,
    },
    Step {
        thread: ThreadRef,
        location: CodeLocation,
        request: RequestId,
    },
    VmDisconnect,
    VmDeath,
    /// Any event type the session doesn't handle
    Unknown(String),
}

/// Events delivered together by the remote process
#[derive(Clone, Debug, PartialEq)]
pub struct EventSet {
    events: Vec<RemoteEvent>,
}

impl EventSet {
    pub fn new(events: Vec<RemoteEvent>) -> Self {
        EventSet { events }
    }

    pub fn events(&self) -> &Vec<RemoteEvent> {
        &self.events
    }

    pub fn into_events(self) -> Vec<RemoteEvent> {
        self.events
    }
}

pub trait EventQueue: Send {
    /// Block until the next event set arrives. An error means the connection is gone and no more
    /// events will come.
    fn remove(&mut self) -> crate::Result<EventSet>;
}

/// Debugging protocol handle for a launched process, calls are synchronous
pub trait RemoteProcess: Send + Sync {
    /// Hand over the event queue, can only be taken once
    fn take_event_queue(&self) -> crate::Result<Box<dyn EventQueue>>;
    fn resume(&self) -> crate::Result<()>;
    fn terminate(&self) -> crate::Result<()>;

    /// Ask for a class prepare event for every class matching the filter, a trailing `*` is a
    /// wildcard.
    fn create_class_prepare_request(&self, class_filter: &str) -> crate::Result<RequestId>;
    /// Executable locations for a target line inside a loaded class
    fn locations_of_line(
        &self,
        class: &ClassRef,
        line: &SourcePosition,
    ) -> crate::Result<Vec<CodeLocation>>;
    /// Create and enable a breakpoint that suspends the hitting thread only
    fn create_breakpoint_request(&self, location: &CodeLocation) -> crate::Result<RequestId>;
    /// Create and enable a single-shot step request for one thread
    fn create_step_request(&self, thread: &ThreadRef, kind: StepKind) -> crate::Result<RequestId>;
    fn delete_request(&self, request: RequestId) -> crate::Result<()>;

    fn all_threads(&self) -> crate::Result<Vec<ThreadRef>>;
    fn is_suspended(&self, thread: &ThreadRef) -> crate::Result<bool>;
    fn resume_thread(&self, thread: &ThreadRef) -> crate::Result<()>;

    /// Frame locations of a suspended thread, innermost first
    fn frames(&self, thread: &ThreadRef) -> crate::Result<Vec<CodeLocation>>;
    fn locals(&self, thread: &ThreadRef, frame: usize) -> crate::Result<Vec<Variable>>;
    fn this_object(&self, thread: &ThreadRef, frame: usize) -> crate::Result<Option<ObjectRef>>;
    fn fields(&self, object: &ObjectRef) -> crate::Result<Vec<Variable>>;
}

/// One tab handed to the build
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuildOutput {
    /// Directory holding the compiled program
    pub generated_root: PathBuf,
    /// Name of the generated file as reported in code locations
    pub generated_file: String,
    /// Text of the generated file, still carrying the line trailers
    pub generated_source: String,
    pub main_class: String,
}

pub trait Build: Send {
    fn build(&mut self, sources: &[SourceFile]) -> crate::Result<BuildOutput>;
}

pub trait Launch: Send {
    /// Start the program suspended
    fn launch(
        &mut self,
        main_class: &str,
        generated_root: &Path,
    ) -> crate::Result<Arc<dyn RemoteProcess>>;
}
