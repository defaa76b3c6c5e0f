//! Configuration
//!
//! Responsible for setting default config, reading configs and setting.
//!
//! The following config items can be set:
//!  - ResumeOtherThreads: Set to 1 to resume every other thread whenever a breakpoint or step
//!    suspends one thread, 0 to leave them all suspended. Defaults to 1.
//!  - FieldDepth: How many levels of object fields to expand when inspecting variables.
//!    Defaults to 0, only the top level is shown.
//!  - MaxStackFrames: Maximum number of call stack frames reported by an inspection.
//!    Defaults to 64.

use std::collections::HashMap;

lazy_static! {
    static ref DEFAULTS: Vec<(&'static str, i64)> = vec![
        ("ResumeOtherThreads", 1),
        ("FieldDepth", 0),
        ("MaxStackFrames", 64),
    ];
}

/// Config values for a debug session
#[derive(Clone, Debug)]
pub struct Config {
    config: HashMap<&'static str, i64>,
}

impl Config {
    /// Create a config with every item at its default
    pub fn new() -> Self {
        let mut config = HashMap::new();
        for (key, value) in DEFAULTS.iter() {
            config.insert(*key, *value);
        }
        Config { config }
    }

    /// Get a config items value
    pub fn get_config(&self, key: &str) -> Option<i64> {
        self.config.get(key).copied()
    }

    /// Set a config items value to an integer, returns false if the item isn't a known config
    /// item
    pub fn set_config(&mut self, key: &str, value: i64) -> bool {
        match self.config.get_mut(key) {
            Some(s) => {
                *s = value;
                true
            }
            None => false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
