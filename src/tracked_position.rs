//! Tracked positions
//!
//! A line in a tab that follows the text around as it's edited. The position is anchored to the
//! first non-whitespace character of the line, so re-indenting doesn't move it but adding or
//! removing lines above it does.

use std::sync::{Arc, Mutex};

use crate::buffer::{Anchor, TextBuffer};
use crate::debugger::SourcePosition;
use crate::server::{DebugError, DebugErrorKind};

pub struct TrackedPosition {
    file: String,
    anchor: Arc<Mutex<Anchor>>,
    next_listener_id: u64,
}

impl TrackedPosition {
    pub fn new(pos: SourcePosition) -> Self {
        TrackedPosition {
            file: pos.file().to_string(),
            anchor: Arc::new(Mutex::new(Anchor::new(pos.line_index()))),
            next_listener_id: 1,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line_index(&self) -> usize {
        self.anchor.lock().unwrap().line_index
    }

    /// Current position, reflecting any edits made since tracking started
    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.file.clone(), self.line_index())
    }

    pub fn is_tracking(&self) -> bool {
        self.anchor.lock().unwrap().buffer_id.is_some()
    }

    /// Add a listener that's called with `(old, new)` line indices on the thread making the edit,
    /// returns an id for removing it again.
    pub fn add_listener<F>(&mut self, listener: F) -> u64
    where
        F: FnMut(usize, usize) + Send + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.anchor
            .lock()
            .unwrap()
            .listeners
            .push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: u64) {
        self.anchor
            .lock()
            .unwrap()
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Anchor this position in `buffer`, detaching it from any buffer it was tracking before.
    pub fn start_tracking(&mut self, buffer: &mut TextBuffer) -> crate::Result<()> {
        let mut anchor = self.anchor.lock().unwrap();

        let line_index = anchor.line_index;
        let (start, text) = match (buffer.line_start(line_index), buffer.line_text(line_index)) {
            (Some(start), Some(text)) => (start, text),
            _ => {
                return Err(DebugError::new(
                    DebugErrorKind::GenericError,
                    "Line out of range".to_string(),
                    format!(
                        "Can't track line {} of {}, it only has {} lines",
                        line_index + 1,
                        buffer.name(),
                        buffer.line_count()
                    ),
                ));
            }
        };

        let indent = match text.find(|c: char| !c.is_whitespace()) {
            Some(i) => i,
            None => text.len(),
        };

        anchor.offset = start + indent;
        anchor.buffer_id = Some(buffer.id());
        drop(anchor);

        buffer.register_anchor(&self.anchor);

        Ok(())
    }

    /// Stop following edits, the last known line index is kept.
    pub fn stop_tracking(&mut self) {
        self.anchor.lock().unwrap().buffer_id = None;
    }
}

impl Drop for TrackedPosition {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}
