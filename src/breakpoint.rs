//! Line breakpoints
//!
//! A breakpoint is the user's intent to stop on a line of a tab. It outlives debug sessions, on
//! every launch it starts out pending again and is resolved against classes as they load. Once a
//! code location is found a remote breakpoint request is attached for it.

use std::collections::BTreeMap;

use crate::debugger::SourcePosition;
use crate::line_map::LineMap;
use crate::notifier::log_msg;
use crate::remote::{ClassRef, CodeLocation, RemoteProcess, RequestId};
use crate::server::{LogLevel, Notification};
use crate::tracked_position::TrackedPosition;

use tokio::sync::mpsc::UnboundedSender;

pub type BreakpointId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakpointState {
    /// No code location found yet
    Pending,
    /// Code location found but no remote request
    Resolved,
    /// Remote request active
    Attached,
    Removed,
}

/// Whether `candidate` is `declaring_class` itself or a class nested inside it
pub fn class_matches(declaring_class: &str, candidate: &str) -> bool {
    candidate == declaring_class
        || (candidate.starts_with(declaring_class)
            && candidate[declaring_class.len()..].starts_with('$'))
}

pub struct Breakpoint {
    id: BreakpointId,
    position: TrackedPosition,
    declaring_class: Option<String>,
    resolved: Option<CodeLocation>,
    request: Option<RequestId>,
    removed: bool,
}

impl Breakpoint {
    pub fn new(id: BreakpointId, position: TrackedPosition) -> Self {
        Breakpoint {
            id,
            position,
            declaring_class: None,
            resolved: None,
            request: None,
            removed: false,
        }
    }

    pub fn id(&self) -> BreakpointId {
        self.id
    }

    /// Current sketch position, following any edits
    pub fn position(&self) -> SourcePosition {
        self.position.position()
    }

    pub fn tracked_position(&self) -> &TrackedPosition {
        &self.position
    }

    pub fn resolved_location(&self) -> Option<&CodeLocation> {
        self.resolved.as_ref()
    }

    pub fn request(&self) -> Option<RequestId> {
        self.request
    }

    pub fn state(&self) -> BreakpointState {
        if self.removed {
            BreakpointState::Removed
        } else if self.request.is_some() {
            BreakpointState::Attached
        } else if self.resolved.is_some() {
            BreakpointState::Resolved
        } else {
            BreakpointState::Pending
        }
    }

    /// Start again as pending for a new launch of `main_class`
    pub fn reset(&mut self, main_class: &str) {
        self.declaring_class = Some(main_class.to_string());
        self.resolved = None;
        self.request = None;
    }

    /// Forget everything about the launch that just ended, the request must already be detached
    /// or gone with the process.
    pub fn end_launch(&mut self) {
        self.declaring_class = None;
        self.resolved = None;
        self.request = None;
    }

    /// Whether a loaded class could hold this breakpoint's line
    pub fn accepts(&self, class_name: &str) -> bool {
        match &self.declaring_class {
            Some(dc) => !self.removed && class_matches(dc, class_name),
            None => false,
        }
    }

    /// Try to resolve against a newly loaded class and attach a remote request. Returns true
    /// once attached, in which case the breakpoint doesn't need any more class loads.
    pub fn on_class_loaded(
        &mut self,
        candidate: &ClassRef,
        line_map: &LineMap,
        remote: &dyn RemoteProcess,
        notifier_tx: &UnboundedSender<Notification>,
    ) -> bool {
        if self.request.is_some() {
            return true;
        }

        if !self.accepts(candidate.name()) {
            return false;
        }

        let sketch = self.position();

        let target = match line_map.sketch_to_target(&sketch) {
            Ok(t) => t,
            Err(_) => {
                log_msg(
                    notifier_tx,
                    LogLevel::WARN,
                    &format!(
                        "Can't set breakpoint at {}, no code is generated for this line",
                        sketch
                    ),
                );
                return false;
            }
        };

        let location = match remote.locations_of_line(candidate, &target) {
            Ok(locations) => locations.into_iter().next(),
            Err(e) => {
                log_msg(
                    notifier_tx,
                    LogLevel::DEBUG,
                    &format!(
                        "Can't look up {} in {}: {}",
                        target,
                        candidate.name(),
                        e.get_debug_string()
                    ),
                );
                None
            }
        };

        let location = match location {
            Some(l) => l,
            None => {
                // Nested classes only hold some lines, only complain about the outer class
                let level = match self.declaring_class.as_deref() == Some(candidate.name()) {
                    true => LogLevel::WARN,
                    false => LogLevel::DEBUG,
                };
                log_msg(
                    notifier_tx,
                    level,
                    &format!(
                        "Can't resolve breakpoint at {} (line {}) in {}",
                        sketch,
                        target.line_num(),
                        candidate.name()
                    ),
                );
                return false;
            }
        };

        self.resolved = Some(location.clone());

        match remote.create_breakpoint_request(&location) {
            Ok(request) => {
                self.request = Some(request);
                log_msg(
                    notifier_tx,
                    LogLevel::DEBUG,
                    &format!(
                        "Breakpoint at {} attached in {}.{}",
                        sketch,
                        location.declaring_class(),
                        location.method()
                    ),
                );
                true
            }
            Err(e) => {
                log_msg(
                    notifier_tx,
                    LogLevel::ERROR,
                    &format!("Can't create breakpoint at {}: {}", sketch, e),
                );
                false
            }
        }
    }

    /// Delete the remote request if there is one
    pub fn detach(
        &mut self,
        remote: &dyn RemoteProcess,
        notifier_tx: &UnboundedSender<Notification>,
    ) {
        if let Some(request) = self.request.take() {
            if let Err(e) = remote.delete_request(request) {
                log_msg(
                    notifier_tx,
                    LogLevel::DEBUG,
                    &format!("Can't delete breakpoint request {}: {}", request, e),
                );
            }
        }
    }

    /// Remove for good: detach, stop following edits and stop listening for class loads
    pub fn remove(
        &mut self,
        remote: Option<&dyn RemoteProcess>,
        hub: &mut ClassLoadHub,
        notifier_tx: &UnboundedSender<Notification>,
    ) {
        if let Some(remote) = remote {
            self.detach(remote, notifier_tx);
        }
        self.request = None;
        self.resolved = None;
        self.position.stop_tracking();
        hub.unsubscribe(self.id);
        self.removed = true;
    }
}

/// Breakpoints waiting for their class to load, keyed by id with the class they belong to
#[derive(Debug, Default)]
pub struct ClassLoadHub {
    subscribers: BTreeMap<BreakpointId, String>,
}

impl ClassLoadHub {
    pub fn new() -> Self {
        ClassLoadHub {
            subscribers: BTreeMap::new(),
        }
    }

    pub fn subscribe(&mut self, id: BreakpointId, declaring_class: &str) {
        self.subscribers.insert(id, declaring_class.to_string());
    }

    pub fn unsubscribe(&mut self, id: BreakpointId) {
        self.subscribers.remove(&id);
    }

    pub fn is_subscribed(&self, id: BreakpointId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Subscribers interested in a class that just loaded, in id order
    pub fn matching(&self, class_name: &str) -> Vec<BreakpointId> {
        self.subscribers
            .iter()
            .filter(|(_, dc)| class_matches(dc, class_name))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}
