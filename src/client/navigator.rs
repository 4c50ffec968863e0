//! Redirect sink: where a client goes when its session ends.

use std::sync::{Arc, Mutex};
use tracing::info;

pub trait Navigator: Send + Sync {
    /// Replace the current location with `target`.
    fn redirect(&self, target: &str);
}

/// Logs the redirect; for headless callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, target: &str) {
        info!(target, "redirect");
    }
}

/// Remembers every redirect, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .map(|visits| visits.clone())
            .unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, target: &str) {
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(target.to_string());
        }
    }
}
