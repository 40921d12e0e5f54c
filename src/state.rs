//! State transition types and session snapshots.
//!
//! The session reports every change as a `StateTransition`; the tracer keeps
//! them for inspection. `SessionSnapshot` is the serializable view printed
//! by the CLI.

use serde::{Deserialize, Serialize};

use crate::action::Flag;

/// Side effect requested by an action, carried out by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Execute a command line
    Spawn { argv: Vec<String> },
    /// Ask a client window to close
    Close { window: u32 },
}

/// State transition events that can be traced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum StateTransition {
    /// Window was added as a tab
    TabManaged { window: u32, index: usize },
    /// Window was removed from the tab list
    TabUnmanaged { window: u32, index: usize },
    /// Selection changed
    TabFocused { from: Option<usize>, to: usize },
    /// Tab moved to a new position
    TabMoved { window: u32, from: usize, to: usize },
    /// Urgency hint set or cleared
    UrgencyChanged { window: u32, urgent: bool },
    /// Session flag flipped
    FlagToggled { flag: Flag, value: bool },
    /// Host window fullscreen state flipped
    FullscreenToggled { fullscreen: bool },
    /// Side effect queued for the host
    EffectQueued { effect: Effect },
    /// Last tab closed and the session stopped
    SessionStopped,
}

/// Serializable view of one tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub window: u32,
    pub title: String,
    pub urgent: bool,
}

/// Serializable view of a whole session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tabs: Vec<TabSnapshot>,
    pub selected: Option<usize>,
    pub last_selected: Option<usize>,
    pub urgent_switch: bool,
    pub fullscreen: bool,
    pub next_focus: bool,
    pub running: bool,
    pub pending_effects: Vec<Effect>,
}
