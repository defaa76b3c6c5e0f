//! Sketch debugger core
//!
//! Drives a remote process through a debugging protocol on behalf of an editor. Translates
//! between the editor's multi-file view of the code ("sketch space") and the single generated
//! file that is actually compiled and run ("target space").

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate lazy_static;

pub mod breakpoint;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod debugger;
pub mod event_thread;
pub mod inspect;
pub mod line_map;
pub mod notifier;
pub mod persist;
pub mod remote;
pub mod server;
pub mod session;
pub mod tracked_position;
pub mod util;
pub mod view;
pub mod vimcodec;

pub type Result<T> = std::result::Result<T, server::DebugError>;
