//! Error stream for soft failures

use std::collections::VecDeque;
use std::fmt::Display;

use parking_lot::Mutex;

use crate::config::ReflectConfig;

/// Prefixed error stream with a bounded in-memory history
///
/// Every line goes to `tracing::error!`, optionally to stderr, and into
/// the history so callers can inspect what a soft failure reported.
#[derive(Default)]
pub struct Diagnostics {
    history: Mutex<VecDeque<String>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one diagnostic, honouring `show_errors`
    pub fn report(&self, config: &ReflectConfig, message: impl Display) {
        if !config.show_errors {
            return;
        }
        let line = format!("{}{}", config.error_prefix, message);
        tracing::error!("{}", line);
        if config.echo_stderr {
            eprintln!("{line}");
        }
        let mut history = self.history.lock();
        history.push_back(line);
        while history.len() > config.history_limit {
            history.pop_front();
        }
    }

    /// Oldest first
    pub fn recent(&self) -> Vec<String> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<String> {
        self.history.lock().back().cloned()
    }

    pub fn clear(&self) {
        self.history.lock().clear();
    }
}
