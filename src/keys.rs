//! Key triggers: X11 modifier masks and keysyms.
//!
//! A trigger is the (modifier mask, keysym) pair a binding matches against.
//! Triggers can be parsed from strings like "Mod1+Shift+Return" and are
//! rendered back into the same form for display.

use std::fmt;

use anyhow::{bail, Result};
use serde::{Serialize, Serializer};

// X11 modifier masks
pub const SHIFT_MASK: u16 = 1;
pub const LOCK_MASK: u16 = 2;
pub const CONTROL_MASK: u16 = 4;
pub const MOD1_MASK: u16 = 8; // Alt
pub const MOD2_MASK: u16 = 16; // NumLock on most keymaps
pub const MOD3_MASK: u16 = 32;
pub const MOD4_MASK: u16 = 64; // Super/Win
pub const MOD5_MASK: u16 = 128;

/// Modifier used by the default tab bindings.
pub const MODKEY: u16 = MOD1_MASK;

/// Modifier names in display order.
const MODIFIER_NAMES: &[(u16, &str)] = &[
    (MOD1_MASK, "Mod1"),
    (MOD2_MASK, "Mod2"),
    (MOD3_MASK, "Mod3"),
    (MOD4_MASK, "Mod4"),
    (MOD5_MASK, "Mod5"),
    (CONTROL_MASK, "Control"),
    (SHIFT_MASK, "Shift"),
    (LOCK_MASK, "Lock"),
];

// Keysyms used by the default table
pub const XK_RETURN: u32 = 0xff0d;
pub const XK_TAB: u32 = 0xff09;
pub const XK_GRAVE: u32 = 0x60;
pub const XK_F11: u32 = 0xffc8;

/// Keysym for an ASCII letter or digit.
pub const fn xk_char(c: char) -> u32 {
    c as u32
}

/// Named (non-ASCII-printable) keysyms. The first name is the canonical one.
const NAMED_KEYSYMS: &[(&str, u32)] = &[
    ("Return", XK_RETURN),
    ("enter", XK_RETURN),
    ("Tab", XK_TAB),
    ("Escape", 0xff1b),
    ("esc", 0xff1b),
    ("space", 0x20),
    ("BackSpace", 0xff08),
    ("Delete", 0xffff),
    ("grave", XK_GRAVE),
    ("`", XK_GRAVE),
    ("minus", 0x2d),
    ("equal", 0x3d),
    ("comma", 0x2c),
    ("period", 0x2e),
    ("slash", 0x2f),
    ("/", 0x2f),
    ("bracketleft", 0x5b),
    ("[", 0x5b),
    ("bracketright", 0x5d),
    ("]", 0x5d),
    ("Prior", 0xff55),
    ("page_up", 0xff55),
    ("Next", 0xff56),
    ("page_down", 0xff56),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Home", 0xff50),
    ("End", 0xff57),
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", XK_F11),
    ("F12", 0xffc9),
];

/// Strip Lock and NumLock from an event state so bindings match
/// regardless of CapsLock/NumLock.
pub fn clean_mask(state: u16) -> u16 {
    state & !(LOCK_MASK | MOD2_MASK)
}

/// Convert a key name to its X11 keysym
pub fn key_to_keysym(key: &str) -> Option<u32> {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(xk_char(c.to_ascii_lowercase()));
        }
    }

    NAMED_KEYSYMS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|&(_, keysym)| keysym)
}

/// Canonical name for a keysym, falling back to hex.
pub fn keysym_name(keysym: u32) -> String {
    if let Some(c) = char::from_u32(keysym).filter(|c| c.is_ascii_alphanumeric()) {
        return c.to_string();
    }
    NAMED_KEYSYMS
        .iter()
        .find(|&&(_, sym)| sym == keysym)
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| format!("0x{:x}", keysym))
}

fn modifier_from_name(name: &str) -> Option<u16> {
    match name.to_lowercase().as_str() {
        "shift" => Some(SHIFT_MASK),
        "lock" => Some(LOCK_MASK),
        "control" | "ctrl" => Some(CONTROL_MASK),
        "mod1" | "alt" => Some(MOD1_MASK),
        "mod2" => Some(MOD2_MASK),
        "mod3" => Some(MOD3_MASK),
        "mod4" | "super" | "win" => Some(MOD4_MASK),
        "mod5" => Some(MOD5_MASK),
        _ => None,
    }
}

/// A key press pattern: exact modifier mask plus keysym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub modifiers: u16,
    pub keysym: u32,
}

impl Trigger {
    pub const fn new(modifiers: u16, keysym: u32) -> Self {
        Self { modifiers, keysym }
    }

    /// Build a trigger from a raw key event, ignoring lock modifiers
    pub fn from_event(state: u16, keysym: u32) -> Self {
        Self::new(clean_mask(state), keysym)
    }

    /// The same trigger with Lock and NumLock dropped
    pub fn cleaned(self) -> Self {
        Self::from_event(self.modifiers, self.keysym)
    }

    /// Parse a trigger string like "Mod1+Shift+Return" or "F11"
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key_part, mod_parts)) = parts.split_last() else {
            bail!("empty key binding");
        };
        if key_part.is_empty() {
            bail!("missing key in binding '{}'", s);
        }

        let mut modifiers = 0;
        for part in mod_parts {
            match modifier_from_name(part) {
                Some(mask) => modifiers |= mask,
                None => bail!("unknown modifier '{}' in binding '{}'", part, s),
            }
        }

        match key_to_keysym(key_part) {
            Some(keysym) => Ok(Self::new(modifiers, keysym)),
            None => bail!("unknown key '{}' in binding '{}'", key_part, s),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(mask, name) in MODIFIER_NAMES {
            if self.modifiers & mask != 0 {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&keysym_name(self.keysym))
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
