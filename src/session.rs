//! In-memory tab session.
//!
//! Tracks the tab list, the selection and the session flags, and implements
//! the `Actions` entry points the binding table dispatches to. Side effects
//! that need the outside world (spawning, closing clients) are queued as
//! `Effect`s for the host to carry out.

use crate::action::{substitute_winid, Actions, Flag};
use crate::config::{ClientSettings, Placement, Settings};
use crate::state::{Effect, SessionSnapshot, StateTransition, TabSnapshot};

/// A single embedded client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub window: u32,
    pub title: String,
    pub urgent: bool,
}

/// Tab list and selection state for one host window
pub struct Session {
    /// Host window id, substituted into spawned commands
    winid: String,
    tabs: Vec<Tab>,
    sel: Option<usize>,
    last_sel: Option<usize>,
    /// Focus the next managed tab
    next_focus: bool,
    /// Whether new tabs take focus by default
    foreground: bool,
    urgent_switch: bool,
    fullscreen: bool,
    running: bool,
    placement: Placement,
    client: ClientSettings,
    effects: Vec<Effect>,
    transitions: Vec<StateTransition>,
}

impl Session {
    pub fn new(winid: impl Into<String>, settings: &Settings) -> Self {
        Self {
            winid: winid.into(),
            tabs: Vec::new(),
            sel: None,
            last_sel: None,
            next_focus: settings.foreground,
            foreground: settings.foreground,
            urgent_switch: settings.urgent_switch,
            fullscreen: false,
            running: true,
            placement: settings.placement,
            client: settings.client.clone(),
            effects: Vec::new(),
            transitions: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    #[cfg(test)]
    pub fn selected(&self) -> Option<usize> {
        self.sel
    }

    pub fn selected_window(&self) -> Option<u32> {
        self.sel.map(|i| self.tabs[i].window)
    }

    #[cfg(test)]
    pub fn last_selected(&self) -> Option<usize> {
        self.last_sel
    }

    #[cfg(test)]
    pub fn urgent_switch(&self) -> bool {
        self.urgent_switch
    }

    #[cfg(test)]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn index_of(&self, window: u32) -> Option<usize> {
        self.tabs.iter().position(|t| t.window == window)
    }

    /// Take queued side effects
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Take transitions recorded since the last call
    pub fn take_transitions(&mut self) -> Vec<StateTransition> {
        std::mem::take(&mut self.transitions)
    }

    fn record(&mut self, transition: StateTransition) {
        log::debug!("{:?}", transition);
        self.transitions.push(transition);
    }

    fn queue(&mut self, effect: Effect) {
        self.effects.push(effect.clone());
        self.record(StateTransition::EffectQueued { effect });
    }

    /// Position a new tab is inserted at, given the tab count after insertion
    fn insert_position(&self, count: usize) -> usize {
        let newposition = self.placement.position as i64;
        let pos = if self.placement.relative {
            self.sel.map_or(-1, |s| s as i64) + newposition
        } else if newposition < 0 {
            count as i64 - newposition
        } else {
            newposition
        };
        pos.clamp(0, count as i64 - 1) as usize
    }

    /// Add a client window as a new tab
    pub fn manage(&mut self, window: u32, title: impl Into<String>) {
        if self.index_of(window).is_some() {
            log::warn!("Window 0x{:x} is already managed", window);
            return;
        }

        let pos = self.insert_position(self.tabs.len() + 1);
        self.tabs.insert(
            pos,
            Tab {
                window,
                title: title.into(),
                urgent: false,
            },
        );
        self.record(StateTransition::TabManaged { window, index: pos });

        // Indices at or after the insertion point moved right
        if let Some(sel) = self.sel.filter(|&s| s >= pos) {
            self.sel = Some(sel + 1);
        }
        if let Some(last) = self.last_sel.filter(|&l| l >= pos) {
            self.last_sel = Some(last + 1);
        }

        let target = if self.next_focus { pos } else { self.sel.unwrap_or(0) };
        self.focus(target);
        self.next_focus = self.foreground;
    }

    /// Remove a client window's tab
    pub fn unmanage(&mut self, window: u32) {
        let Some(index) = self.index_of(window) else {
            return;
        };
        self.tabs.remove(index);
        self.record(StateTransition::TabUnmanaged { window, index });

        if self.tabs.is_empty() {
            self.sel = None;
            self.last_sel = None;
            if self.client.close_last {
                self.running = false;
                self.record(StateTransition::SessionStopped);
            } else if self.client.fill_again && self.running {
                self.spawn(None);
            }
            return;
        }

        let count = self.tabs.len();
        let removed_selected = self.sel == Some(index);

        self.last_sel = match self.last_sel {
            Some(l) if l == index => None,
            Some(l) if l > index => Some(l - 1),
            Some(l) => Some(l.min(count - 1)),
            None => None,
        };

        if removed_selected {
            self.sel = None;
            let target = self.last_sel.unwrap_or_else(|| index.min(count - 1));
            self.focus(target);
        } else if let Some(sel) = self.sel {
            let sel = if sel > index { sel - 1 } else { sel };
            self.sel = Some(sel.min(count - 1));
        }
    }

    /// Set or clear a tab's urgency hint
    pub fn set_urgent(&mut self, window: u32, urgent: bool) {
        let Some(index) = self.index_of(window) else {
            return;
        };
        // The selected tab never stays urgent
        let urgent = urgent && self.sel != Some(index);
        if self.tabs[index].urgent != urgent {
            self.tabs[index].urgent = urgent;
            self.record(StateTransition::UrgencyChanged { window, urgent });
        }
        if urgent && self.urgent_switch {
            self.focus(index);
        }
    }

    /// Select a tab and clear its urgency
    pub fn focus(&mut self, index: usize) {
        if index >= self.tabs.len() {
            return;
        }
        let from = self.sel;
        if from != Some(index) {
            self.last_sel = from;
        }
        self.sel = Some(index);
        self.record(StateTransition::TabFocused { from, to: index });

        let tab = &mut self.tabs[index];
        if tab.urgent {
            tab.urgent = false;
            let window = tab.window;
            self.record(StateTransition::UrgencyChanged { window, urgent: false });
        }
    }

    /// Client command line with the host window id filled in
    fn client_command(&self) -> Option<Vec<String>> {
        if self.client.command.is_empty() {
            return None;
        }
        let mut argv = self.client.command.clone();
        match self.client.replace_arg {
            Some(n) if n < argv.len() => argv[n] = self.winid.clone(),
            _ => argv.push(self.winid.clone()),
        }
        Some(argv)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tabs: self
                .tabs
                .iter()
                .map(|t| TabSnapshot {
                    window: t.window,
                    title: t.title.clone(),
                    urgent: t.urgent,
                })
                .collect(),
            selected: self.sel,
            last_selected: self.last_sel,
            urgent_switch: self.urgent_switch,
            fullscreen: self.fullscreen,
            next_focus: self.next_focus,
            running: self.running,
            pending_effects: self.effects.clone(),
        }
    }
}

impl Actions for Session {
    fn rotate(&mut self, step: i32) {
        let Some(sel) = self.sel else {
            return;
        };
        let count = self.tabs.len() as i64;
        let next = (sel as i64 + step as i64).rem_euclid(count);
        self.focus(next as usize);
    }

    fn movetab(&mut self, step: i32) {
        let Some(sel) = self.sel else {
            return;
        };
        let count = self.tabs.len() as i64;
        let to = (sel as i64 + step as i64).rem_euclid(count) as usize;
        if to == sel {
            return;
        }
        let tab = self.tabs.remove(sel);
        let window = tab.window;
        self.tabs.insert(to, tab);
        self.sel = Some(to);
        self.record(StateTransition::TabMoved { window, from: sel, to });
    }

    fn move_to(&mut self, index: usize) {
        if index < self.tabs.len() {
            self.focus(index);
        }
    }

    fn focusonce(&mut self) {
        self.next_focus = true;
    }

    fn spawn(&mut self, command: Option<&[String]>) {
        let argv = match command {
            Some(argv) => substitute_winid(argv, &self.winid),
            None => match self.client_command() {
                Some(argv) => argv,
                None => {
                    log::warn!("No client command configured, nothing to spawn");
                    return;
                }
            },
        };
        self.queue(Effect::Spawn { argv });
    }

    fn killclient(&mut self) {
        if let Some(window) = self.selected_window() {
            self.queue(Effect::Close { window });
        }
    }

    fn focusurgent(&mut self) {
        let Some(sel) = self.sel else {
            return;
        };
        let count = self.tabs.len();
        let urgent = (1..count)
            .map(|offset| (sel + offset) % count)
            .find(|&i| self.tabs[i].urgent);
        if let Some(index) = urgent {
            self.focus(index);
        }
    }

    fn toggle(&mut self, flag: Flag) {
        let value = match flag {
            Flag::UrgentSwitch => {
                self.urgent_switch = !self.urgent_switch;
                self.urgent_switch
            }
        };
        self.record(StateTransition::FlagToggled { flag, value });
    }

    fn fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        let fullscreen = self.fullscreen;
        self.record(StateTransition::FullscreenToggled { fullscreen });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, WINID_PLACEHOLDER};
    use crate::bindings::DEFAULT_BINDINGS;
    use crate::keys::{xk_char, Trigger, MOD1_MASK, SHIFT_MASK, XK_RETURN};

    fn session_with(count: u32) -> Session {
        let mut session = Session::new("0x400001", &Settings::default());
        for w in 1..=count {
            session.manage(w, format!("tab {}", w));
        }
        session
    }

    fn windows(session: &Session) -> Vec<u32> {
        session.tabs().iter().map(|t| t.window).collect()
    }

    #[test]
    fn test_new_tabs_append_and_take_focus() {
        let session = session_with(3);
        assert_eq!(windows(&session), vec![1, 2, 3]);
        assert_eq!(session.selected(), Some(2));
        assert_eq!(session.last_selected(), Some(1));
    }

    #[test]
    fn test_background_tabs_keep_selection() {
        let mut settings = Settings::default();
        settings.foreground = false;
        let mut session = Session::new("1", &settings);
        session.manage(1, "a");
        session.manage(2, "b");
        assert_eq!(session.selected(), Some(0));

        // focusonce overrides foreground for exactly one tab
        session.focusonce();
        session.manage(3, "c");
        assert_eq!(session.selected(), Some(2));
        session.manage(4, "d");
        assert_eq!(session.selected(), Some(2));
    }

    #[test]
    fn test_relative_placement() {
        let mut settings = Settings::default();
        settings.placement = Placement { position: 1, relative: true };
        let mut session = Session::new("1", &settings);
        session.manage(1, "a");
        session.manage(2, "b");
        session.move_to(0);
        session.manage(3, "c");
        assert_eq!(windows(&session), vec![1, 3, 2]);
        assert_eq!(session.selected(), Some(1));
    }

    #[test]
    fn test_absolute_placement_shifts_selection() {
        let mut settings = Settings::default();
        settings.placement = Placement { position: 0, relative: false };
        settings.foreground = false;
        let mut session = Session::new("1", &settings);
        session.manage(1, "a");
        session.manage(2, "b");
        assert_eq!(windows(&session), vec![2, 1]);
        // Selection still points at window 1
        assert_eq!(session.selected_window(), Some(1));
    }

    #[test]
    fn test_rotate_is_cyclic() {
        let mut session = session_with(3);
        session.rotate(1);
        assert_eq!(session.selected(), Some(0));
        session.rotate(-1);
        assert_eq!(session.selected(), Some(2));
        session.rotate(0);
        assert_eq!(session.selected(), Some(2));
        session.rotate(-4);
        assert_eq!(session.selected(), Some(1));
    }

    #[test]
    fn test_move_selects_absolute_index() {
        let mut session = session_with(4);
        session.move_to(1);
        assert_eq!(session.selected(), Some(1));
        // Out of range is a no-op
        session.move_to(9);
        assert_eq!(session.selected(), Some(1));
    }

    #[test]
    fn test_movetab_shifts_neighbours() {
        let mut session = session_with(4);
        session.move_to(0);
        session.movetab(-1);
        assert_eq!(windows(&session), vec![2, 3, 4, 1]);
        assert_eq!(session.selected(), Some(3));
        session.movetab(1);
        assert_eq!(windows(&session), vec![1, 2, 3, 4]);
        assert_eq!(session.selected(), Some(0));
        session.movetab(2);
        assert_eq!(windows(&session), vec![2, 3, 1, 4]);
        assert_eq!(session.selected_window(), Some(1));
    }

    #[test]
    fn test_actions_on_empty_session_are_noops() {
        let mut session = session_with(0);
        session.rotate(1);
        session.movetab(1);
        session.move_to(0);
        session.killclient();
        session.focusurgent();
        assert_eq!(session.selected(), None);
        assert!(session.take_effects().is_empty());
    }

    #[test]
    fn test_toggle_twice_restores_flag() {
        let mut session = session_with(1);
        let initial = session.urgent_switch();
        session.toggle(Flag::UrgentSwitch);
        assert_eq!(session.urgent_switch(), !initial);
        session.toggle(Flag::UrgentSwitch);
        assert_eq!(session.urgent_switch(), initial);
    }

    #[test]
    fn test_focusurgent_scans_after_selection() {
        let mut session = session_with(4);
        session.move_to(1);
        session.set_urgent(1, true);
        session.set_urgent(4, true);
        session.focusurgent();
        assert_eq!(session.selected_window(), Some(4));
        assert!(!session.tabs()[3].urgent);
        session.focusurgent();
        assert_eq!(session.selected_window(), Some(1));
        session.focusurgent();
        assert_eq!(session.selected_window(), Some(1));
    }

    #[test]
    fn test_urgent_switch_focuses_urgent_tab() {
        let mut session = session_with(3);
        session.set_urgent(1, true);
        assert_eq!(session.selected_window(), Some(3));

        session.toggle(Flag::UrgentSwitch);
        session.set_urgent(2, true);
        assert_eq!(session.selected_window(), Some(2));
        assert!(!session.tabs()[1].urgent);
    }

    #[test]
    fn test_selected_tab_never_urgent() {
        let mut session = session_with(2);
        session.set_urgent(2, true);
        assert!(!session.tabs()[1].urgent);
    }

    #[test]
    fn test_unmanage_selected_returns_to_last() {
        let mut session = session_with(3);
        session.move_to(0);
        session.move_to(2);
        session.unmanage(3);
        assert_eq!(session.selected_window(), Some(1));

        let mut session = session_with(3);
        session.unmanage(1);
        assert_eq!(session.selected_window(), Some(3));
        assert_eq!(session.selected(), Some(1));
    }

    #[test]
    fn test_unmanage_last_tab() {
        let mut settings = Settings::default();
        settings.client.close_last = true;
        let mut session = Session::new("1", &settings);
        session.manage(1, "a");
        session.unmanage(1);
        assert!(!session.is_running());
        assert_eq!(session.selected(), None);

        let mut settings = Settings::default();
        settings.client.fill_again = true;
        let mut session = Session::new("77", &settings);
        session.manage(1, "a");
        session.unmanage(1);
        assert!(session.is_running());
        assert_eq!(
            session.take_effects(),
            vec![Effect::Spawn { argv: vec!["st".into(), "-w".into(), "77".into()] }]
        );
    }

    #[test]
    fn test_spawn_client_command_replace_arg() {
        let mut settings = Settings::default();
        settings.client.command = vec!["surf".into(), "-e".into(), "WID".into(), "-x".into()];
        settings.client.replace_arg = Some(2);
        let mut session = Session::new("0x99", &settings);
        session.spawn(None);
        assert_eq!(
            session.take_effects(),
            vec![Effect::Spawn { argv: vec!["surf".into(), "-e".into(), "0x99".into(), "-x".into()] }]
        );
    }

    #[test]
    fn test_spawn_without_client_command() {
        let mut settings = Settings::default();
        settings.client.command.clear();
        let mut session = Session::new("1", &settings);
        session.spawn(None);
        assert!(session.take_effects().is_empty());
    }

    #[test]
    fn test_killclient_queues_close() {
        let mut session = session_with(2);
        session.killclient();
        assert_eq!(session.take_effects(), vec![Effect::Close { window: 2 }]);
        // The tab stays until the client goes away
        assert_eq!(session.tabs().len(), 2);
    }

    #[test]
    fn test_fullscreen_flips() {
        let mut session = session_with(1);
        session.fullscreen();
        assert!(session.is_fullscreen());
        session.fullscreen();
        assert!(!session.is_fullscreen());
    }

    #[test]
    fn test_default_table_end_to_end() {
        let mut settings = Settings::default();
        settings.foreground = false;
        let mut session = Session::new("0x400001", &settings);
        session.manage(1, "a");
        session.manage(2, "b");
        assert_eq!(session.selected(), Some(0));

        // Alt+Shift+Return: focusonce then spawn, both fire
        let fired = DEFAULT_BINDINGS.dispatch(Trigger::new(MOD1_MASK | SHIFT_MASK, XK_RETURN), &mut session);
        assert_eq!(fired, 2);
        assert_eq!(
            session.take_effects(),
            vec![Effect::Spawn { argv: vec!["st".into(), "-w".into(), "0x400001".into()] }]
        );
        // The spawned client shows up and takes focus once
        session.manage(3, "c");
        assert_eq!(session.selected_window(), Some(3));

        DEFAULT_BINDINGS.dispatch(Trigger::new(MOD1_MASK, xk_char('1')), &mut session);
        assert_eq!(session.selected(), Some(0));

        DEFAULT_BINDINGS.dispatch(Trigger::new(MOD1_MASK, xk_char('q')), &mut session);
        assert_eq!(session.take_effects(), vec![Effect::Close { window: 1 }]);
    }

    #[test]
    fn test_setprop_spawn_gets_window_id() {
        let mut session = session_with(1);
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), WINID_PLACEHOLDER.to_string()];
        Action::Spawn(Some(argv)).apply(&mut session);
        match session.take_effects().as_slice() {
            [Effect::Spawn { argv }] => assert_eq!(argv[2], "0x400001"),
            other => panic!("Expected one spawn, got {:?}", other),
        }
    }
}
