//! Event tracing for debugging key dispatch.
//!
//! Keeps a ring buffer of recent key presses and session transitions so the
//! CLI can show what a sequence of keys actually did.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::keys::Trigger;
use crate::state::{Effect, StateTransition};

/// Trace entries kept per session before the oldest are dropped
const TRACE_LIMIT: usize = 1000;

/// A single traced event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<u32>,
    pub details: String,
}

/// Bounded log of what a run of key presses did to a session
pub struct EventTracer {
    log: VecDeque<EventLogEntry>,
    limit: usize,
    next_seq: u64,
    epoch: Instant,
}

impl EventTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracer that keeps at most `limit` entries
    pub fn bounded(limit: usize) -> Self {
        Self {
            log: VecDeque::new(),
            limit,
            next_seq: 1,
            epoch: Instant::now(),
        }
    }

    /// Trace a key press and how many bindings it fired
    pub fn trace_key(&mut self, trigger: Trigger, fired: usize) {
        self.push("key_press", None, format!("{} fired={}", trigger, fired));
    }

    /// Trace a state transition
    pub fn trace_transition(&mut self, transition: &StateTransition) {
        let (event_type, window, details) = describe(transition);
        self.push(event_type, window, details);
    }

    fn push(&mut self, event_type: &str, window: Option<u32>, details: String) {
        let sequence = self.next_seq;
        self.next_seq += 1;
        let timestamp_ms = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.log.push_back(EventLogEntry {
            sequence,
            timestamp_ms,
            event_type: event_type.to_owned(),
            window,
            details,
        });
        while self.log.len() > self.limit {
            self.log.pop_front();
        }
    }

    /// The newest `n` entries, oldest first. `None` returns everything kept.
    pub fn recent(&self, n: Option<usize>) -> Vec<EventLogEntry> {
        let skip = n.map_or(0, |n| self.log.len().saturating_sub(n));
        self.log.range(skip..).cloned().collect()
    }
}

impl Default for EventTracer {
    fn default() -> Self {
        Self::bounded(TRACE_LIMIT)
    }
}

fn describe(transition: &StateTransition) -> (&'static str, Option<u32>, String) {
    match transition {
        StateTransition::TabManaged { window, index } => {
            ("tab_managed", Some(*window), format!("index={}", index))
        }
        StateTransition::TabUnmanaged { window, index } => {
            ("tab_unmanaged", Some(*window), format!("index={}", index))
        }
        StateTransition::TabFocused { from, to } => {
            ("tab_focused", None, format!("from={:?} to={}", from, to))
        }
        StateTransition::TabMoved { window, from, to } => {
            ("tab_moved", Some(*window), format!("from={} to={}", from, to))
        }
        StateTransition::UrgencyChanged { window, urgent } => {
            ("urgency_changed", Some(*window), format!("urgent={}", urgent))
        }
        StateTransition::FlagToggled { flag, value } => {
            ("flag_toggled", None, format!("{:?}={}", flag, value))
        }
        StateTransition::FullscreenToggled { fullscreen } => {
            ("fullscreen_toggled", None, format!("fullscreen={}", fullscreen))
        }
        StateTransition::EffectQueued { effect: Effect::Spawn { argv } } => {
            ("spawn_queued", None, argv.join(" "))
        }
        StateTransition::EffectQueued { effect: Effect::Close { window } } => {
            ("close_queued", Some(*window), String::new())
        }
        StateTransition::SessionStopped => ("session_stopped", None, String::new()),
    }
}
