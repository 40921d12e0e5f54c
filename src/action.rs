//! Tab actions and the dispatch surface they are applied to.
//!
//! Each action carries its own argument, so a binding can't pair an action
//! with the wrong payload.

use std::fmt;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the host window id when a spawn fires.
pub const WINID_PLACEHOLDER: &str = "{winid}";

/// Property read by the host to select a tab by window id.
pub const SELECT_TAB_PROPERTY: &str = "_TABBED_SELECT_TAB";

/// Session flags that can be flipped by a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// Focus tabs as soon as they become urgent
    UrgentSwitch,
}

/// An action with its argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", content = "arg", rename_all = "lowercase")]
pub enum Action {
    /// Select a tab relative to the current one (0 reselects it)
    Rotate(i32),
    /// Move the selected tab by an offset
    MoveTab(i32),
    /// Select the tab at an absolute index
    Move(usize),
    /// Focus the next new tab regardless of the foreground setting
    FocusOnce,
    /// Run a command; `None` runs the client command
    Spawn(Option<Vec<String>>),
    /// Close the selected tab
    KillClient,
    /// Select the next urgent tab after the current one
    FocusUrgent,
    /// Flip a session flag
    Toggle(Flag),
    /// Toggle fullscreen on the host window
    Fullscreen,
}

/// Entry points an action is applied to.
pub trait Actions {
    fn rotate(&mut self, step: i32);
    fn movetab(&mut self, step: i32);
    fn move_to(&mut self, index: usize);
    fn focusonce(&mut self);
    fn spawn(&mut self, command: Option<&[String]>);
    fn killclient(&mut self);
    fn focusurgent(&mut self);
    fn toggle(&mut self, flag: Flag);
    fn fullscreen(&mut self);
}

impl Action {
    /// Apply this action to a handler
    pub fn apply<A: Actions + ?Sized>(&self, handler: &mut A) {
        match self {
            Action::Rotate(step) => handler.rotate(*step),
            Action::MoveTab(step) => handler.movetab(*step),
            Action::Move(index) => handler.move_to(*index),
            Action::FocusOnce => handler.focusonce(),
            Action::Spawn(command) => handler.spawn(command.as_deref()),
            Action::KillClient => handler.killclient(),
            Action::FocusUrgent => handler.focusurgent(),
            Action::Toggle(flag) => handler.toggle(*flag),
            Action::Fullscreen => handler.fullscreen(),
        }
    }

    /// Short name used in config files and logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::Rotate(_) => "rotate",
            Action::MoveTab(_) => "movetab",
            Action::Move(_) => "move",
            Action::FocusOnce => "focusonce",
            Action::Spawn(_) => "spawn",
            Action::KillClient => "killclient",
            Action::FocusUrgent => "focusurgent",
            Action::Toggle(_) => "toggle",
            Action::Fullscreen => "fullscreen",
        }
    }

    /// Build an action from its config name and optional argument
    pub fn from_config(name: &str, arg: Option<&ActionArg>) -> Result<Self> {
        let action = match (name.to_lowercase().as_str(), arg) {
            ("rotate", Some(ActionArg::Int(i))) => Action::Rotate(to_i32(*i)?),
            ("movetab", Some(ActionArg::Int(i))) => Action::MoveTab(to_i32(*i)?),
            ("move", Some(ActionArg::Int(i))) => Action::Move(
                usize::try_from(*i).with_context(|| format!("tab index {} is negative", i))?,
            ),
            ("focusonce", None) => Action::FocusOnce,
            ("spawn", None) => Action::Spawn(None),
            ("spawn", Some(ActionArg::Argv(argv))) => {
                if argv.is_empty() {
                    bail!("spawn command is empty");
                }
                Action::Spawn(Some(argv.clone()))
            }
            ("spawn", Some(ActionArg::SetProp { setprop })) => {
                Action::Spawn(Some(setprop_command(setprop, WINID_PLACEHOLDER)))
            }
            ("killclient", None) => Action::KillClient,
            ("focusurgent", None) => Action::FocusUrgent,
            ("toggle", None) => Action::Toggle(Flag::UrgentSwitch),
            ("toggle", Some(ActionArg::Flag(flag))) => Action::Toggle(*flag),
            ("fullscreen", None) => Action::Fullscreen,
            (
                "rotate" | "movetab" | "move" | "focusonce" | "spawn" | "killclient"
                | "focusurgent" | "toggle" | "fullscreen",
                _,
            ) => bail!("invalid argument for action '{}': {:?}", name, arg),
            _ => bail!("unknown action '{}'", name),
        };
        Ok(action)
    }
}

fn to_i32(value: i64) -> Result<i32> {
    i32::try_from(value).with_context(|| format!("argument {} out of range", value))
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Rotate(i) | Action::MoveTab(i) => write!(f, "{}({:+})", self.name(), i),
            Action::Move(i) => write!(f, "move({})", i),
            Action::Spawn(None) => f.write_str("spawn(client)"),
            Action::Spawn(Some(argv)) => write!(f, "spawn({})", argv.join(" ")),
            Action::Toggle(flag) => write!(f, "toggle({:?})", flag),
            _ => f.write_str(self.name()),
        }
    }
}

/// Action argument as written in the config file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ActionArg {
    Int(i64),
    Argv(Vec<String>),
    Flag(Flag),
    SetProp { setprop: String },
}

/// Command that lets the user pick a child window with dmenu and writes its
/// id into `property` on the host window `winid`.
///
/// `$0` is the property name and `$1` the host window id inside the script.
pub fn setprop_command(property: &str, winid: &str) -> Vec<String> {
    let script = concat!(
        "prop=\"`xwininfo -children -id $1 | grep '^     0x' |",
        "sed -e's@^ *\\(0x[0-9a-f]*\\) \"\\([^\"]*\\)\".*@\\1 \\2@' |",
        "xargs -0 printf %b | dmenu -l 10 -w $1`\" &&",
        "xprop -id $1 -f $0 8s -set $0 \"$prop\"",
    );
    vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        property.to_string(),
        winid.to_string(),
    ]
}

/// Replace the window id placeholder in a command line
pub fn substitute_winid(argv: &[String], winid: &str) -> Vec<String> {
    argv.iter()
        .map(|arg| arg.replace(WINID_PLACEHOLDER, winid))
        .collect()
}
