//! Editor view
//!
//! What the session needs from the editor showing the code. `NotifierView` implements it by
//! sending notifications to every connected editor.

use std::sync::Mutex;

use crate::debugger::SourcePosition;
use crate::inspect::Inspection;
use crate::notifier;
use crate::server::{LogLevel, Notification};

use tokio::sync::mpsc::UnboundedSender;

pub trait EditorView: Send + Sync {
    fn show_current_line(&self, pos: &SourcePosition);
    fn clear_current_line(&self);
    fn add_breakpoint_mark(&self, pos: &SourcePosition);
    fn remove_breakpoint_mark(&self, pos: &SourcePosition);
    fn status_message(&self, msg: &str);
    fn status_error(&self, msg: &str);
    fn update_inspection(&self, inspection: &Inspection);
    /// Where the editor's cursor is, if it's in a tab
    fn current_cursor_position(&self) -> Option<SourcePosition>;
}

pub struct NotifierView {
    notifier_tx: UnboundedSender<Notification>,
    cursor: Mutex<Option<SourcePosition>>,
}

impl NotifierView {
    pub fn new(notifier_tx: UnboundedSender<Notification>) -> Self {
        NotifierView {
            notifier_tx,
            cursor: Mutex::new(None),
        }
    }

    /// Record the cursor position as reported by the editor
    pub fn set_cursor(&self, pos: SourcePosition) {
        *self.cursor.lock().unwrap() = Some(pos);
    }
}

impl EditorView for NotifierView {
    fn show_current_line(&self, pos: &SourcePosition) {
        notifier::jump_to_position(&self.notifier_tx, pos);
    }

    fn clear_current_line(&self) {
        notifier::clear_position(&self.notifier_tx);
    }

    fn add_breakpoint_mark(&self, pos: &SourcePosition) {
        notifier::breakpoint_set(&self.notifier_tx, pos);
    }

    fn remove_breakpoint_mark(&self, pos: &SourcePosition) {
        notifier::breakpoint_removed(&self.notifier_tx, pos);
    }

    fn status_message(&self, msg: &str) {
        notifier::log_msg(&self.notifier_tx, LogLevel::INFO, msg);
    }

    fn status_error(&self, msg: &str) {
        notifier::status_error(&self.notifier_tx, msg);
    }

    fn update_inspection(&self, inspection: &Inspection) {
        notifier::inspection(&self.notifier_tx, inspection.to_json());
    }

    fn current_cursor_position(&self) -> Option<SourcePosition> {
        self.cursor.lock().unwrap().clone()
    }
}
