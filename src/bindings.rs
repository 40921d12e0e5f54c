//! The key-binding table.
//!
//! The table is built once at startup and never changes afterwards. Rows may
//! share a trigger; every matching row fires, in table order.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::action::{setprop_command, Action, Actions, Flag, SELECT_TAB_PROPERTY, WINID_PLACEHOLDER};
use crate::keys::{xk_char, Trigger, CONTROL_MASK, MODKEY, SHIFT_MASK, XK_F11, XK_GRAVE, XK_RETURN, XK_TAB};

/// Compiled-in default table, built on first use.
pub static DEFAULT_BINDINGS: Lazy<BindingTable> = Lazy::new(BindingTable::defaults);

/// One row of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub trigger: Trigger,
    #[serde(flatten)]
    pub action: Action,
}

impl Binding {
    pub fn new(modifiers: u16, keysym: u32, action: Action) -> Self {
        Self {
            trigger: Trigger::new(modifiers, keysym).cleaned(),
            action,
        }
    }
}

/// Ordered, immutable list of bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// The stock tabbed bindings (Alt as the modifier)
    pub fn defaults() -> Self {
        let digits = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '0'];

        let mut bindings = vec![
            Binding::new(MODKEY | SHIFT_MASK, XK_RETURN, Action::FocusOnce),
            Binding::new(MODKEY | SHIFT_MASK, XK_RETURN, Action::Spawn(None)),
            Binding::new(MODKEY, XK_TAB, Action::Rotate(1)),
            Binding::new(MODKEY | SHIFT_MASK, XK_TAB, Action::Rotate(-1)),
            Binding::new(MODKEY | SHIFT_MASK, xk_char('j'), Action::MoveTab(-1)),
            Binding::new(MODKEY | SHIFT_MASK, xk_char('k'), Action::MoveTab(1)),
            Binding::new(MODKEY | CONTROL_MASK, XK_TAB, Action::Rotate(0)),
            Binding::new(
                MODKEY,
                XK_GRAVE,
                Action::Spawn(Some(setprop_command(SELECT_TAB_PROPERTY, WINID_PLACEHOLDER))),
            ),
        ];

        bindings.extend(
            digits
                .iter()
                .enumerate()
                .map(|(index, &digit)| Binding::new(MODKEY, xk_char(digit), Action::Move(index))),
        );

        bindings.extend([
            Binding::new(MODKEY, xk_char('q'), Action::KillClient),
            Binding::new(MODKEY, xk_char('u'), Action::FocusUrgent),
            Binding::new(MODKEY | SHIFT_MASK, xk_char('u'), Action::Toggle(Flag::UrgentSwitch)),
            Binding::new(0, XK_F11, Action::Fullscreen),
        ]);

        Self::new(bindings)
    }

    /// Rows whose trigger equals `trigger` exactly, in table order.
    /// Both sides are compared with Lock and NumLock cleared.
    pub fn matching(&self, trigger: Trigger) -> impl Iterator<Item = &Binding> {
        let trigger = trigger.cleaned();
        self.bindings.iter().filter(move |b| b.trigger.cleaned() == trigger)
    }

    /// Apply every matching row to `handler`. Returns how many fired.
    pub fn dispatch<A: Actions + ?Sized>(&self, trigger: Trigger, handler: &mut A) -> usize {
        let mut fired = 0;
        for binding in self.matching(trigger) {
            log::debug!("{} -> {}", trigger, binding.action);
            binding.action.apply(handler);
            fired += 1;
        }
        if fired == 0 {
            log::trace!("No binding for {}", trigger);
        }
        fired
    }

    /// Distinct triggers, in first-seen order (what a host would grab)
    pub fn triggers(&self) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = Vec::new();
        for binding in &self.bindings {
            if !triggers.contains(&binding.trigger) {
                triggers.push(binding.trigger);
            }
        }
        triggers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        DEFAULT_BINDINGS.clone()
    }
}
