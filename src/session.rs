//! Debug session
//!
//! The controller tying everything together. It builds and launches the sketch, keeps the line
//! map for the launch, resolves breakpoints as classes load and reacts to events from the remote
//! process, driving the session through Stopped, Launching, Running and Paused.
//!
//! Everything that changes session state happens behind one lock, both the calls made on behalf
//! of the editor and the events coming in from the `EventDispatchThread`. Each launch gets a new
//! generation number and anything arriving from an older launch is dropped, so a disconnect
//! racing a stop can't leave stale state behind.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::JoinHandle;

use crate::breakpoint::{class_matches, Breakpoint, BreakpointId, BreakpointState, ClassLoadHub};
use crate::buffer::{SharedBuffer, TextBuffer};
use crate::config::Config;
use crate::debugger::{SessionState, SourcePosition, StepKind};
use crate::event_thread::{EventDispatchThread, EventHandler};
use crate::inspect::{location_to_string, Inspection};
use crate::line_map::{annotate, LineMap};
use crate::notifier::log_msg;
use crate::persist::{add_breakpoint_markers, strip_breakpoint_markers};
use crate::remote::{
    Build, ClassRef, CodeLocation, EventSet, Launch, RemoteEvent, RemoteProcess, RequestId,
    SourceFile, ThreadRef,
};
use crate::server::{DebugError, DebugErrorKind, LogLevel, Notification};
use crate::tracked_position::TrackedPosition;
use crate::util::log_error;
use crate::view::EditorView;

use tokio::sync::mpsc::UnboundedSender;

struct SessionInner {
    state: SessionState,
    build: Box<dyn Build>,
    launcher: Box<dyn Launch>,
    remote: Option<Arc<dyn RemoteProcess>>,
    main_class: Option<String>,
    line_map: Option<LineMap>,
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    next_breakpoint_id: BreakpointId,
    hub: ClassLoadHub,
    // Loaded classes belonging to the sketch in the current launch
    loaded_classes: Vec<ClassRef>,
    pending_step: Option<RequestId>,
    current_thread: Option<ThreadRef>,
    generation: u64,
    // Never joined, the thread finishes by itself once the process is gone
    event_thread: Option<JoinHandle<()>>,
    // Tabs in order
    buffers: Vec<(String, SharedBuffer)>,
    config: Config,
}

struct SessionShared {
    inner: Mutex<SessionInner>,
    view: Arc<dyn EditorView>,
    notifier_tx: UnboundedSender<Notification>,
}

/// One debug session per editor, cheap to clone and share
#[derive(Clone)]
pub struct DebugSession {
    shared: Arc<SessionShared>,
}

impl DebugSession {
    pub fn new(
        build: Box<dyn Build>,
        launcher: Box<dyn Launch>,
        view: Arc<dyn EditorView>,
        notifier_tx: UnboundedSender<Notification>,
    ) -> Self {
        let inner = SessionInner {
            state: SessionState::Stopped,
            build,
            launcher,
            remote: None,
            main_class: None,
            line_map: None,
            breakpoints: BTreeMap::new(),
            next_breakpoint_id: 1,
            hub: ClassLoadHub::new(),
            loaded_classes: vec![],
            pending_step: None,
            current_thread: None,
            generation: 0,
            event_thread: None,
            buffers: vec![],
            config: Config::new(),
        };

        DebugSession {
            shared: Arc::new(SessionShared {
                inner: Mutex::new(inner),
                view,
                notifier_tx,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().unwrap().state
    }

    /// The thread the remote process stopped on while paused
    pub fn current_thread(&self) -> Option<ThreadRef> {
        self.shared.inner.lock().unwrap().current_thread.clone()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.shared.inner.lock().unwrap().generation
    }

    /// Build and launch the sketch, stopping any running launch first. Build and launch failures
    /// are reported to the view and leave the session stopped.
    pub fn start(&self) {
        let shared = &self.shared;
        let mut guard = shared.inner.lock().unwrap();
        let inner = &mut *guard;

        shared.reset(inner, true);

        let mut sources = Vec::with_capacity(inner.buffers.len());
        for (name, buffer) in inner.buffers.iter() {
            match lock_buffer(buffer) {
                Ok(b) => sources.push(SourceFile {
                    name: name.clone(),
                    text: annotate(name, b.text()),
                }),
                Err(e) => {
                    shared.report_failure(&e);
                    return;
                }
            }
        }

        let output = match inner.build.build(&sources) {
            Ok(o) => o,
            Err(e) => {
                shared.report_failure(&e);
                return;
            }
        };

        let line_map = LineMap::build(&output.generated_file, &output.generated_source);
        log_msg(
            &shared.notifier_tx,
            LogLevel::DEBUG,
            &format!(
                "Mapped {} lines of {}",
                line_map.len(),
                line_map.generated_file()
            ),
        );

        let remote = match inner
            .launcher
            .launch(&output.main_class, &output.generated_root)
        {
            Ok(r) => r,
            Err(e) => {
                shared.report_failure(&e);
                return;
            }
        };

        let main_class = output.main_class;
        inner.generation += 1;
        let generation = inner.generation;

        for bp in inner.breakpoints.values_mut() {
            bp.reset(&main_class);
            inner.hub.subscribe(bp.id(), &main_class);
        }

        inner.state = SessionState::Launching;
        inner.remote = Some(remote.clone());
        inner.main_class = Some(main_class.clone());
        inner.line_map = Some(line_map);

        let queue = match remote.take_event_queue() {
            Ok(q) => q,
            Err(e) => {
                shared.reset(inner, true);
                shared.report_failure(&e);
                return;
            }
        };

        let handler: Weak<dyn EventHandler> = Arc::downgrade(&self.shared) as Weak<dyn EventHandler>;
        match EventDispatchThread::spawn(queue, handler, generation, shared.notifier_tx.clone()) {
            Ok(handle) => inner.event_thread = Some(handle),
            Err(e) => {
                shared.reset(inner, true);
                shared.report_failure(&e);
                return;
            }
        }

        if let Err(e) = remote.create_class_prepare_request(&format!("{}*", main_class)) {
            log_error(&shared.notifier_tx, &e);
        }

        if let Err(e) = remote.resume() {
            log_error(&shared.notifier_tx, &e);
        }

        log_msg(
            &shared.notifier_tx,
            LogLevel::INFO,
            &format!("Launched {}", main_class),
        );
    }

    /// Stop the launch if there is one, safe to call in any state
    pub fn stop(&self) {
        let mut guard = self.shared.inner.lock().unwrap();
        self.shared.reset(&mut guard, true);
    }

    /// Resume from a pause, or start if nothing's running
    pub fn continue_(&self) {
        if self.state() == SessionState::Stopped {
            self.start();
            return;
        }

        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;

        if inner.state != SessionState::Paused {
            log_msg(
                &self.shared.notifier_tx,
                LogLevel::INFO,
                "Can't continue, the sketch isn't paused",
            );
            return;
        }

        let remote = match &inner.remote {
            Some(r) => r.clone(),
            None => return,
        };

        inner.current_thread = None;
        inner.state = SessionState::Running;
        self.shared.view.clear_current_line();

        if let Err(e) = remote.resume() {
            log_error(&self.shared.notifier_tx, &e);
        }
    }

    /// Step the current thread, only possible while paused
    pub fn step(&self, kind: StepKind) {
        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;

        if inner.state != SessionState::Paused {
            log_msg(
                &self.shared.notifier_tx,
                LogLevel::INFO,
                "Can't step, the sketch isn't paused",
            );
            return;
        }

        let (remote, thread) = match (&inner.remote, &inner.current_thread) {
            (Some(r), Some(t)) => (r.clone(), t.clone()),
            _ => return,
        };

        match remote.create_step_request(&thread, kind) {
            Ok(request) => inner.pending_step = Some(request),
            Err(e) => {
                log_error(&self.shared.notifier_tx, &e);
                return;
            }
        }

        inner.current_thread = None;
        inner.state = SessionState::Running;
        self.shared.view.clear_current_line();

        if let Err(e) = remote.resume() {
            log_error(&self.shared.notifier_tx, &e);
        }
    }

    pub fn step_over(&self) {
        self.step(StepKind::Over);
    }

    pub fn step_into(&self) {
        self.step(StepKind::Into);
    }

    pub fn step_out(&self) {
        self.step(StepKind::Out);
    }

    /// Add a breakpoint, returns the existing one if the line already has a breakpoint
    pub fn set_breakpoint(&self, pos: SourcePosition) -> BreakpointId {
        let mut guard = self.shared.inner.lock().unwrap();
        self.shared.set_breakpoint(&mut guard, pos)
    }

    /// Remove the breakpoint on a line, returns false if there wasn't one
    pub fn remove_breakpoint(&self, pos: &SourcePosition) -> bool {
        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;
        match find_breakpoint(inner, pos) {
            Some(id) => {
                self.shared.remove_breakpoint(inner, id);
                true
            }
            None => false,
        }
    }

    /// Toggle the breakpoint on a line, returns true if the line now has a breakpoint
    pub fn toggle_breakpoint(&self, pos: SourcePosition) -> bool {
        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;
        match find_breakpoint(inner, &pos) {
            Some(id) => {
                self.shared.remove_breakpoint(inner, id);
                false
            }
            None => {
                self.shared.set_breakpoint(inner, pos);
                true
            }
        }
    }

    /// Toggle the breakpoint on the line the editor's cursor is on
    pub fn toggle_breakpoint_at_cursor(&self) -> Option<bool> {
        match self.shared.view.current_cursor_position() {
            Some(pos) => Some(self.toggle_breakpoint(pos)),
            None => {
                self.shared
                    .view
                    .status_message("No cursor position to toggle a breakpoint at");
                None
            }
        }
    }

    /// Every breakpoint position, sorted
    pub fn list_breakpoints(&self) -> Vec<SourcePosition> {
        let inner = self.shared.inner.lock().unwrap();
        let mut positions: Vec<SourcePosition> =
            inner.breakpoints.values().map(|bp| bp.position()).collect();
        positions.sort();
        positions
    }

    pub fn breakpoints_in(&self, file: &str) -> Vec<SourcePosition> {
        self.list_breakpoints()
            .into_iter()
            .filter(|pos| pos.file() == file)
            .collect()
    }

    pub fn breakpoint_state(&self, pos: &SourcePosition) -> Option<BreakpointState> {
        let inner = self.shared.inner.lock().unwrap();
        find_breakpoint(&inner, pos)
            .and_then(|id| inner.breakpoints.get(&id))
            .map(|bp| bp.state())
    }

    /// Remove every breakpoint in a file, for when a tab is closed or renamed
    pub fn clear_breakpoints(&self, file: &str) {
        let mut guard = self.shared.inner.lock().unwrap();
        self.shared.clear_breakpoints(&mut guard, Some(file));
    }

    pub fn clear_all_breakpoints(&self) {
        let mut guard = self.shared.inner.lock().unwrap();
        self.shared.clear_breakpoints(&mut guard, None);
    }

    /// Load a tab's saved text. Breakpoint markers are stripped out and turned back into
    /// breakpoints, replacing any the file had before.
    pub fn open_buffer(&self, name: &str, text: &str) -> SharedBuffer {
        let (clean, positions) = strip_breakpoint_markers(name, text);

        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;

        self.shared.clear_breakpoints(inner, Some(name));

        let buffer = TextBuffer::shared(name.to_string(), clean);
        match inner.buffers.iter().position(|(n, _)| n == name) {
            Some(i) => inner.buffers[i].1 = buffer.clone(),
            None => inner.buffers.push((name.to_string(), buffer.clone())),
        }

        for pos in positions {
            self.shared.set_breakpoint(inner, pos);
        }

        buffer
    }

    /// Close a tab along with its breakpoints
    pub fn close_buffer(&self, name: &str) {
        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;
        self.shared.clear_breakpoints(inner, Some(name));
        inner.buffers.retain(|(n, _)| n != name);
    }

    pub fn buffer(&self, file: &str) -> Option<SharedBuffer> {
        buffer_for(&self.shared.inner.lock().unwrap(), file)
    }

    /// Tab names in order
    pub fn buffer_names(&self) -> Vec<String> {
        self.shared
            .inner
            .lock()
            .unwrap()
            .buffers
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Insert text into a tab, breakpoints move with their lines
    pub fn insert(&self, file: &str, offset: usize, text: &str) -> crate::Result<()> {
        let buffer = self.existing_buffer(file)?;
        lock_buffer(&buffer)?.insert(offset, text)?;
        self.merge_breakpoints(file);
        Ok(())
    }

    /// Remove text from a tab, breakpoints move with their lines
    pub fn remove(&self, file: &str, offset: usize, len: usize) -> crate::Result<()> {
        let buffer = self.existing_buffer(file)?;
        lock_buffer(&buffer)?.remove(offset, len)?;
        self.merge_breakpoints(file);
        Ok(())
    }

    /// An edit can bring two breakpoints onto the same line, only the oldest of them is kept
    fn merge_breakpoints(&self, file: &str) {
        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;

        let mut seen = HashSet::new();
        let mut duplicates = vec![];
        for bp in inner.breakpoints.values() {
            let pos = bp.position();
            if pos.file() == file && !seen.insert(pos.clone()) {
                duplicates.push((bp.id(), pos));
            }
        }

        for (id, pos) in duplicates {
            self.shared.remove_breakpoint(inner, id);
            self.shared.view.add_breakpoint_mark(&pos);
            log_msg(
                &self.shared.notifier_tx,
                LogLevel::DEBUG,
                &format!("Merged breakpoints on {}", pos),
            );
        }
    }

    /// The text to save for a tab, with a marker on every breakpoint line
    pub fn saved_text(&self, file: &str) -> Option<String> {
        let buffer = self.buffer(file)?;
        let lines: Vec<usize> = self
            .breakpoints_in(file)
            .iter()
            .map(|pos| pos.line_index())
            .collect();
        let text = lock_buffer(&buffer).ok()?.text().to_string();
        Some(add_breakpoint_markers(&text, &lines))
    }

    /// Every remote thread and whether it's suspended
    pub fn threads(&self) -> Vec<(ThreadRef, bool)> {
        let remote = match &self.shared.inner.lock().unwrap().remote {
            Some(r) => r.clone(),
            None => return vec![],
        };

        let threads = match remote.all_threads() {
            Ok(t) => t,
            Err(e) => {
                log_error(&self.shared.notifier_tx, &e);
                return vec![];
            }
        };

        threads
            .into_iter()
            .map(|t| {
                let suspended = remote.is_suspended(&t).unwrap_or(false);
                (t, suspended)
            })
            .collect()
    }

    pub fn get_config(&self, key: &str) -> Option<i64> {
        self.shared.inner.lock().unwrap().config.get_config(key)
    }

    pub fn set_config(&self, key: &str, value: i64) -> bool {
        let set = self
            .shared
            .inner
            .lock()
            .unwrap()
            .config
            .set_config(key, value);
        if !set {
            log_msg(
                &self.shared.notifier_tx,
                LogLevel::WARN,
                &format!("Couldn't set unfound config item: {}", key),
            );
        }
        set
    }

    /// Stop and forget every breakpoint and tab, for when the editor closes
    pub fn dispose(&self) {
        let mut guard = self.shared.inner.lock().unwrap();
        let inner = &mut *guard;
        self.shared.reset(inner, true);
        self.shared.clear_breakpoints(inner, None);
        inner.buffers.clear();
    }

    fn existing_buffer(&self, file: &str) -> crate::Result<SharedBuffer> {
        match self.buffer(file) {
            Some(b) => Ok(b),
            None => Err(DebugError::new(
                DebugErrorKind::GenericError,
                "No such file".to_string(),
                format!("No open file called {}", file),
            )),
        }
    }
}

fn find_breakpoint(inner: &SessionInner, pos: &SourcePosition) -> Option<BreakpointId> {
    inner
        .breakpoints
        .values()
        .find(|bp| bp.position() == *pos)
        .map(|bp| bp.id())
}

fn lock_buffer(buffer: &SharedBuffer) -> crate::Result<MutexGuard<'_, TextBuffer>> {
    buffer.lock().map_err(|_| {
        DebugError::new(
            DebugErrorKind::GenericError,
            "File unavailable".to_string(),
            "Buffer lock poisoned by an earlier failure".to_string(),
        )
    })
}

fn buffer_for(inner: &SessionInner, file: &str) -> Option<SharedBuffer> {
    inner
        .buffers
        .iter()
        .find(|(n, _)| n == file)
        .map(|(_, b)| b.clone())
}

impl SessionShared {
    fn report_failure(&self, err: &DebugError) {
        self.view.status_error(err.get_error_string());
        log_error(&self.notifier_tx, err);
    }

    /// Get back to Stopped from any state. With `terminate` the breakpoint requests are removed
    /// and the process is killed, otherwise the process is assumed gone already.
    fn reset(&self, inner: &mut SessionInner, terminate: bool) {
        if let Some(remote) = inner.remote.take() {
            if terminate {
                if let Some(step) = inner.pending_step.take() {
                    if let Err(e) = remote.delete_request(step) {
                        log_msg(
                            &self.notifier_tx,
                            LogLevel::DEBUG,
                            &format!("Can't delete step request: {}", e),
                        );
                    }
                }

                for bp in inner.breakpoints.values_mut() {
                    bp.detach(remote.as_ref(), &self.notifier_tx);
                }

                if let Err(e) = remote.terminate() {
                    log_msg(
                        &self.notifier_tx,
                        LogLevel::DEBUG,
                        &format!("Can't terminate remote process: {}", e),
                    );
                }
            }

            log_msg(&self.notifier_tx, LogLevel::INFO, "Debugger stopped");
        }

        for bp in inner.breakpoints.values_mut() {
            bp.end_launch();
        }

        inner.pending_step = None;
        inner.current_thread = None;
        inner.line_map = None;
        inner.main_class = None;
        inner.loaded_classes.clear();
        inner.hub.clear();
        inner.event_thread = None;
        inner.generation += 1;
        inner.state = SessionState::Stopped;

        self.view.clear_current_line();
    }

    fn set_breakpoint(&self, inner: &mut SessionInner, pos: SourcePosition) -> BreakpointId {
        if let Some(id) = find_breakpoint(inner, &pos) {
            return id;
        }

        let mut position = TrackedPosition::new(pos.clone());
        if let Some(buffer) = buffer_for(inner, pos.file()) {
            let tracked = lock_buffer(&buffer).and_then(|mut b| position.start_tracking(&mut b));
            if let Err(e) = tracked {
                log_error(&self.notifier_tx, &e);
            }
        }

        let view = self.view.clone();
        let file = pos.file().to_string();
        position.add_listener(move |old, new| {
            view.remove_breakpoint_mark(&SourcePosition::new(file.clone(), old));
            view.add_breakpoint_mark(&SourcePosition::new(file.clone(), new));
        });

        let id = inner.next_breakpoint_id;
        inner.next_breakpoint_id += 1;
        let mut bp = Breakpoint::new(id, position);

        self.view.add_breakpoint_mark(&pos);
        log_msg(
            &self.notifier_tx,
            LogLevel::INFO,
            "Breakpoints on method declarations will not work, use the first line of the method instead",
        );

        if let (Some(remote), Some(main_class)) = (inner.remote.clone(), inner.main_class.clone())
        {
            bp.reset(&main_class);

            let mut attached = false;
            if let Some(line_map) = &inner.line_map {
                for class in inner.loaded_classes.iter() {
                    if bp.accepts(class.name())
                        && bp.on_class_loaded(class, line_map, remote.as_ref(), &self.notifier_tx)
                    {
                        attached = true;
                        break;
                    }
                }
            }

            if !attached {
                inner.hub.subscribe(id, &main_class);
            }
        }

        inner.breakpoints.insert(id, bp);

        id
    }

    fn remove_breakpoint(&self, inner: &mut SessionInner, id: BreakpointId) {
        if let Some(mut bp) = inner.breakpoints.remove(&id) {
            let pos = bp.position();
            bp.remove(inner.remote.as_deref(), &mut inner.hub, &self.notifier_tx);
            self.view.remove_breakpoint_mark(&pos);
        }
    }

    fn clear_breakpoints(&self, inner: &mut SessionInner, file: Option<&str>) {
        let ids: Vec<BreakpointId> = inner
            .breakpoints
            .values()
            .filter(|bp| match file {
                Some(f) => bp.tracked_position().file() == f,
                None => true,
            })
            .map(|bp| bp.id())
            .collect();

        for id in ids {
            self.remove_breakpoint(inner, id);
        }
    }

    /// Handle one event, returns false if the process has gone and the rest of the set should be
    /// dropped.
    fn handle_event(&self, inner: &mut SessionInner, event: RemoteEvent) -> bool {
        match event {
            RemoteEvent::VmStart { thread } => {
                log_msg(
                    &self.notifier_tx,
                    LogLevel::DEBUG,
                    &format!("Remote process started on thread {}", thread.name()),
                );
            }
            RemoteEvent::ClassPrepare { class, thread } => {
                self.on_class_prepare(inner, class, thread);
            }
            RemoteEvent::Breakpoint {
                thread, location, ..
            } => {
                self.on_stop(inner, thread, location, None);
            }
            RemoteEvent::Step {
                thread,
                location,
                request,
            } => {
                self.on_stop(inner, thread, location, Some(request));
            }
            RemoteEvent::VmDisconnect | RemoteEvent::VmDeath => {
                log_msg(
                    &self.notifier_tx,
                    LogLevel::INFO,
                    "Remote process exited",
                );
                self.reset(inner, false);
                return false;
            }
            RemoteEvent::Unknown(name) => {
                log_msg(
                    &self.notifier_tx,
                    LogLevel::DEBUG,
                    &format!("Unhandled event: {}", name),
                );
            }
        }

        true
    }

    fn on_class_prepare(&self, inner: &mut SessionInner, class: ClassRef, thread: ThreadRef) {
        let (remote, main_class) = match (&inner.remote, &inner.main_class) {
            (Some(r), Some(m)) => (r.clone(), m.clone()),
            _ => return,
        };

        if class_matches(&main_class, class.name()) {
            log_msg(
                &self.notifier_tx,
                LogLevel::DEBUG,
                &format!("Class loaded: {}", class.name()),
            );
            inner.loaded_classes.push(class.clone());

            if let Some(line_map) = &inner.line_map {
                for id in inner.hub.matching(class.name()) {
                    if let Some(bp) = inner.breakpoints.get_mut(&id) {
                        if bp.on_class_loaded(&class, line_map, remote.as_ref(), &self.notifier_tx)
                        {
                            inner.hub.unsubscribe(id);
                        }
                    }
                }
            }

            if inner.state == SessionState::Launching && class.name() == main_class {
                inner.state = SessionState::Running;
            }
        }

        // Keep the paused thread suspended, only let the loading thread carry on
        let resumed = match inner.state {
            SessionState::Paused => remote.resume_thread(&thread),
            _ => remote.resume(),
        };
        if let Err(e) = resumed {
            log_error(&self.notifier_tx, &e);
        }
    }

    /// A breakpoint was hit or a step finished
    fn on_stop(
        &self,
        inner: &mut SessionInner,
        thread: ThreadRef,
        location: CodeLocation,
        step_request: Option<RequestId>,
    ) {
        let remote = match &inner.remote {
            Some(r) => r.clone(),
            None => return,
        };

        if let Some(request) = step_request {
            if inner.pending_step != Some(request) {
                log_msg(
                    &self.notifier_tx,
                    LogLevel::DEBUG,
                    &format!("Ignoring stale step event for request {}", request),
                );
                return;
            }
        }

        inner.current_thread = Some(thread.clone());

        // Step requests are single shot, a breakpoint hit during a step cancels it
        if let Some(step) = inner.pending_step.take() {
            if let Err(e) = remote.delete_request(step) {
                log_error(&self.notifier_tx, &e);
            }
        }

        match inner
            .line_map
            .as_ref()
            .map(|m| m.target_to_sketch(location.position()))
        {
            Some(Ok(pos)) => self.view.show_current_line(&pos),
            _ => {
                log_msg(
                    &self.notifier_tx,
                    LogLevel::WARN,
                    &format!(
                        "Stopped at {} which isn't a line in the sketch",
                        location_to_string(&location, inner.line_map.as_ref())
                    ),
                );
                self.view.clear_current_line();
            }
        }

        if inner.config.get_config("ResumeOtherThreads") != Some(0) {
            self.resume_other_threads(remote.as_ref(), &thread);
        }

        inner.state = SessionState::Paused;

        let field_depth = inner.config.get_config("FieldDepth").unwrap_or(0).max(0) as usize;
        let max_frames = inner
            .config
            .get_config("MaxStackFrames")
            .unwrap_or(64)
            .max(0) as usize;
        let inspection = Inspection::capture(
            remote.as_ref(),
            &thread,
            inner.line_map.as_ref(),
            field_depth,
            max_frames,
            &self.notifier_tx,
        );
        self.view.update_inspection(&inspection);
    }

    fn resume_other_threads(&self, remote: &dyn RemoteProcess, thread: &ThreadRef) {
        let threads = match remote.all_threads() {
            Ok(t) => t,
            Err(e) => {
                log_error(&self.notifier_tx, &e);
                return;
            }
        };

        for other in threads.iter().filter(|t| *t != thread) {
            if let Ok(true) = remote.is_suspended(other) {
                if let Err(e) = remote.resume_thread(other) {
                    log_error(&self.notifier_tx, &e);
                }
            }
        }
    }
}

impl EventHandler for SessionShared {
    fn handle_event_set(&self, generation: u64, events: EventSet) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if inner.generation != generation {
            log_msg(
                &self.notifier_tx,
                LogLevel::DEBUG,
                "Ignoring events from a previous launch",
            );
            return;
        }

        for event in events.into_events() {
            if !self.handle_event(inner, event) {
                break;
            }
        }
    }

    fn on_disconnect_or_death(&self, generation: u64) {
        let mut guard = self.inner.lock().unwrap();
        if guard.generation != generation {
            return;
        }

        log_msg(
            &self.notifier_tx,
            LogLevel::INFO,
            "Remote process disconnected",
        );
        self.reset(&mut guard, false);
    }
}
