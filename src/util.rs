//! Utilities
//!
//! Various simple utilities used around the debugger

use std::net::TcpListener;

use crate::notifier::log_msg;
use crate::server::{DebugError, LogLevel, Notification};

use tokio::sync::mpsc::UnboundedSender;

/// Get an unused port on the local system and return it. This port
/// can subsequently be used.
pub fn get_unused_localhost_port() -> crate::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Log an error and a debug message, commonly used in the code base
pub fn send_error_and_debug(
    notifier_tx: &UnboundedSender<Notification>,
    err_msg: &str,
    debug_msg: &str,
) {
    log_msg(notifier_tx, LogLevel::ERROR, err_msg);
    log_msg(notifier_tx, LogLevel::DEBUG, debug_msg);
}

/// Log both halves of a `DebugError`
pub fn log_error(notifier_tx: &UnboundedSender<Notification>, err: &DebugError) {
    send_error_and_debug(notifier_tx, err.get_error_string(), err.get_debug_string());
}

/// Merge two JSON objects, keys in `b` take precedence. Anything that isn't an object is
/// simply replaced.
pub fn serde_json_merge(a: &mut serde_json::Value, b: serde_json::Value) {
    match (a, b) {
        (serde_json::Value::Object(a), serde_json::Value::Object(b)) => {
            for (k, v) in b {
                serde_json_merge(a.entry(k).or_insert(serde_json::Value::Null), v);
            }
        }
        (a, b) => *a = b,
    }
}
