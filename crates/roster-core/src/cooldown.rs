//! Per-person cooldown gate in front of the visit reconciler.

use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashMap;

pub const DEFAULT_COOLDOWN_SECS: i64 = 60;

/// Suppresses repeated sightings of the same person within the cooldown window.
///
/// Holds the timestamp of the last *accepted* event per label for the
/// lifetime of one capture session.
#[derive(Debug)]
pub struct CooldownFilter {
    window: TimeDelta,
    last_accepted: HashMap<String, NaiveDateTime>,
}

impl Default for CooldownFilter {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_COOLDOWN_SECS))
    }
}

impl CooldownFilter {
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Accept the event when the label is new or more than the window has
    /// elapsed since its last accepted event. Rejections leave state unchanged.
    pub fn accept(&mut self, label: &str, timestamp: NaiveDateTime) -> bool {
        let accepted = match self.last_accepted.get(label) {
            None => true,
            Some(&last) => timestamp - last > self.window,
        };
        if accepted {
            self.last_accepted.insert(label.to_string(), timestamp);
        }
        accepted
    }

    pub fn last_accepted(&self, label: &str) -> Option<NaiveDateTime> {
        self.last_accepted.get(label).copied()
    }
}
