//! Configuration file support for tabkeys.
//!
//! Loads settings from ~/.config/tabkeys/config.toml if it exists,
//! otherwise uses the compiled-in defaults.
//!
//! Also provides `Settings` - the runtime configuration struct with
//! resolved color values - built once at startup and never changed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, Serializer};

use crate::action::{Action, ActionArg};
use crate::bindings::{Binding, BindingTable, DEFAULT_BINDINGS};
use crate::keys::Trigger;

// =============================================================================
// Runtime Configuration (resolved values)
// =============================================================================

/// Where new tabs are inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Offset (relative) or index (absolute); negative absolute means the end
    pub position: i32,
    /// Whether `position` is relative to the selected tab
    pub relative: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: -1,
            relative: false,
        }
    }
}

/// The embedded client command and what happens when tabs run out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Command spawned by `spawn` with no argument
    pub command: Vec<String>,
    /// Argument index replaced by the window id (appended when unset)
    pub replace_arg: Option<usize>,
    /// Stop when the last tab closes
    pub close_last: bool,
    /// Spawn a new client when the last tab closes
    pub fill_again: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            command: vec!["st".to_string(), "-w".to_string()],
            replace_arg: None,
            close_last: false,
            fill_again: false,
        }
    }
}

/// Background/foreground pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorPair {
    #[serde(serialize_with = "hex_color")]
    pub bg: u32,
    #[serde(serialize_with = "hex_color")]
    pub fg: u32,
}

/// Tab colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Colors {
    pub normal: ColorPair,
    pub selected: ColorPair,
    pub urgent: ColorPair,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            normal: ColorPair { bg: 0x00141d, fg: 0xffffff },
            selected: ColorPair { bg: 0xb3e5fc, fg: 0x1a1a1a },
            urgent: ColorPair { bg: 0x4fc3f7, fg: 0x00141d },
        }
    }
}

/// Runtime settings with resolved values.
///
/// Read-only after startup; the session copies what it needs.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub font: String,
    pub colors: Colors,
    /// Text drawn before each tab title
    pub before: String,
    /// Text drawn after each tab title
    pub after: String,
    /// Marker for truncated titles
    pub title_trim: String,
    /// Tab width in pixels
    pub tab_width: u32,
    /// New tabs take focus
    pub foreground: bool,
    /// Initial value of the urgent-switch flag
    pub urgent_switch: bool,
    pub placement: Placement,
    pub client: ClientSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font: "JetBrainsMono Nerd Font:size=12".to_string(),
            colors: Colors::default(),
            before: String::new(),
            after: "│".to_string(),
            title_trim: "…".to_string(),
            tab_width: 200,
            foreground: true,
            urgent_switch: false,
            placement: Placement::default(),
            client: ClientSettings::default(),
        }
    }
}

fn hex_color<S: Serializer>(color: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("#{:06x}", color))
}

// =============================================================================
// File-based Configuration (TOML parsing)
// =============================================================================

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance: AppearanceConfig,
    pub colors: ColorConfig,
    pub placement: Placement,
    pub client: ClientSettings,
    /// Replaces the whole default table when present
    pub keys: Option<Vec<KeyConfig>>,
}

/// Appearance settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub font: String,
    pub before: String,
    pub after: String,
    pub title_trim: String,
    pub tab_width: u32,
    pub foreground: bool,
    pub urgent_switch: bool,
}

/// Color settings (hex strings like "#b3e5fc")
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub normal_bg: String,
    pub normal_fg: String,
    pub selected_bg: String,
    pub selected_fg: String,
    pub urgent_bg: String,
    pub urgent_fg: String,
}

/// One `[[keys]]` entry, e.g. `{ key = "Mod1+1", action = "move", arg = 0 }`
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    pub key: String,
    pub action: String,
    #[serde(default)]
    pub arg: Option<ActionArg>,
}

impl Config {
    /// Load config from default path (~/.config/tabkeys/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabkeys")
            .join("config.toml")
    }

    /// Load config from a specific path, falling back to defaults
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Load config from a path the user named explicitly; errors are fatal
    pub fn load_strict(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Resolve runtime settings
    pub fn settings(&self) -> Result<Settings> {
        let color = |name: &str, value: &str| {
            parse_color(value).with_context(|| format!("Invalid color for {}: '{}'", name, value))
        };
        let c = &self.colors;
        let colors = Colors {
            normal: ColorPair {
                bg: color("normal_bg", &c.normal_bg)?,
                fg: color("normal_fg", &c.normal_fg)?,
            },
            selected: ColorPair {
                bg: color("selected_bg", &c.selected_bg)?,
                fg: color("selected_fg", &c.selected_fg)?,
            },
            urgent: ColorPair {
                bg: color("urgent_bg", &c.urgent_bg)?,
                fg: color("urgent_fg", &c.urgent_fg)?,
            },
        };

        let a = &self.appearance;
        Ok(Settings {
            font: a.font.clone(),
            colors,
            before: a.before.clone(),
            after: a.after.clone(),
            title_trim: a.title_trim.clone(),
            tab_width: a.tab_width,
            foreground: a.foreground,
            urgent_switch: a.urgent_switch,
            placement: self.placement,
            client: self.client.clone(),
        })
    }

    /// Build the binding table: the configured keys, or the defaults
    pub fn bindings(&self) -> Result<BindingTable> {
        let Some(keys) = &self.keys else {
            return Ok(DEFAULT_BINDINGS.clone());
        };

        let bindings = keys
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                parse_key_config(entry)
                    .with_context(|| format!("Invalid key binding #{} ('{}')", i + 1, entry.key))
            })
            .collect::<Result<Vec<_>>>()?;

        if bindings.is_empty() {
            log::warn!("Config defines an empty key table; no keys are bound");
        }
        Ok(BindingTable::new(bindings))
    }
}

fn parse_key_config(entry: &KeyConfig) -> Result<Binding> {
    // Lock and NumLock never reach the table, so a binding naming them
    // still fires with or without them held
    let trigger = Trigger::parse(&entry.key)?.cleaned();
    let action = Action::from_config(&entry.action, entry.arg.as_ref())?;
    Ok(Binding { trigger, action })
}

/// Parse hex color string (e.g., "#b3e5fc" or "b3e5fc") to u32
pub fn parse_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            font: settings.font,
            before: settings.before,
            after: settings.after,
            title_trim: settings.title_trim,
            tab_width: settings.tab_width,
            foreground: settings.foreground,
            urgent_switch: settings.urgent_switch,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            normal_bg: "#00141d".to_string(),
            normal_fg: "#FFFFFF".to_string(),
            selected_bg: "#b3e5fc".to_string(),
            selected_fg: "#1a1a1a".to_string(),
            urgent_bg: "#4fc3f7".to_string(),
            urgent_fg: "#00141d".to_string(),
        }
    }
}
