//! Notifier
//!
//! This module contains tools for notifying every editor connection about an
//! event. Everything is sent over the notifier channel, the connection server
//! forwards it on to every listening socket.

use crate::debugger::SourcePosition;
use crate::server::{LogLevel, Notification};

use tokio::sync::mpsc::UnboundedSender;

/// Send the message, a closed channel just means nobody is listening any more
fn send_msg(notifier_tx: &UnboundedSender<Notification>, msg: Notification) {
    let _ = notifier_tx.send(msg);
}

/// Send a log message
pub fn log_msg(notifier_tx: &UnboundedSender<Notification>, level: LogLevel, msg: &str) {
    let msg = Notification::new(
        "sketchdbg#debugger#Log".to_string(),
        vec![serde_json::json!(level as u8), serde_json::json!(msg)],
    );
    send_msg(notifier_tx, msg);
}

/// Notify about a code position change
pub fn jump_to_position(notifier_tx: &UnboundedSender<Notification>, pos: &SourcePosition) {
    let msg = Notification::new(
        "sketchdbg#debugger#JumpToPosition".to_string(),
        vec![serde_json::json!(pos.file()), serde_json::json!(pos.line_num())],
    );
    send_msg(notifier_tx, msg);
}

/// Notify that there is no current position any more
pub fn clear_position(notifier_tx: &UnboundedSender<Notification>) {
    let msg = Notification::new("sketchdbg#debugger#ClearPosition".to_string(), vec![]);
    send_msg(notifier_tx, msg);
}

/// Notify that a breakpoint has been set
pub fn breakpoint_set(notifier_tx: &UnboundedSender<Notification>, pos: &SourcePosition) {
    let msg = Notification::new(
        "sketchdbg#debugger#BreakpointSet".to_string(),
        vec![serde_json::json!(pos.file()), serde_json::json!(pos.line_num())],
    );
    send_msg(notifier_tx, msg);
}

/// Notify that a breakpoint has been removed
pub fn breakpoint_removed(notifier_tx: &UnboundedSender<Notification>, pos: &SourcePosition) {
    let msg = Notification::new(
        "sketchdbg#debugger#BreakpointRemoved".to_string(),
        vec![serde_json::json!(pos.file()), serde_json::json!(pos.line_num())],
    );
    send_msg(notifier_tx, msg);
}

/// Report an error to show in the editor's status line
pub fn status_error(notifier_tx: &UnboundedSender<Notification>, msg: &str) {
    let msg = Notification::new(
        "sketchdbg#debugger#StatusError".to_string(),
        vec![serde_json::json!(msg)],
    );
    send_msg(notifier_tx, msg);
}

/// Send inspection data (call stack, locals, fields of `this`)
pub fn inspection(notifier_tx: &UnboundedSender<Notification>, data: serde_json::Value) {
    let msg = Notification::new("sketchdbg#debugger#Inspection".to_string(), vec![data]);
    send_msg(notifier_tx, msg);
}
