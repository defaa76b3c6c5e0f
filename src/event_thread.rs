//! Event dispatch thread
//!
//! A dedicated thread per launched process that blocks on the remote event queue and hands each
//! event set to the session in the order they arrive. When the queue fails the thread tells the
//! session the process has gone and exits.

use std::sync::Weak;
use std::thread::{self, JoinHandle};

use crate::notifier::log_msg;
use crate::remote::{EventQueue, EventSet};
use crate::server::{LogLevel, Notification};

use tokio::sync::mpsc::UnboundedSender;

/// Receives events from an `EventDispatchThread`. The generation identifies the launch the
/// events belong to.
pub trait EventHandler: Send + Sync {
    fn handle_event_set(&self, generation: u64, events: EventSet);
    fn on_disconnect_or_death(&self, generation: u64);
}

pub struct EventDispatchThread;

impl EventDispatchThread {
    /// Start dispatching. The handler is held weakly so a dropped session lets the thread finish
    /// with the next event.
    pub fn spawn(
        mut queue: Box<dyn EventQueue>,
        handler: Weak<dyn EventHandler>,
        generation: u64,
        notifier_tx: UnboundedSender<Notification>,
    ) -> crate::Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name(format!("event-dispatch-{}", generation))
            .spawn(move || {
                loop {
                    match queue.remove() {
                        Ok(events) => match handler.upgrade() {
                            Some(h) => h.handle_event_set(generation, events),
                            None => return,
                        },
                        Err(e) => {
                            log_msg(
                                &notifier_tx,
                                LogLevel::DEBUG,
                                &format!("Event queue closed: {}", e.get_debug_string()),
                            );
                            break;
                        }
                    }
                }

                if let Some(h) = handler.upgrade() {
                    h.on_disconnect_or_death(generation);
                }
            })?;

        Ok(handle)
    }
}
