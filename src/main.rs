//! tabkeys - key bindings for a tabbed XEmbed host
//!
//! Holds the binding table and tab actions of a tabbed host and lets you
//! inspect and exercise them from the command line.
//!
//! # Examples
//!
//! ```bash
//! # List the active key table
//! tabkeys keys
//!
//! # Press Alt+Tab twice in a session with three tabs
//! tabkeys press --tabs 3 Mod1+Tab Mod1+Tab
//!
//! # Print the window picker command for a host window
//! tabkeys setprop --winid 0x1400003
//! ```

mod action;
mod bindings;
mod config;
mod keys;
mod session;
mod spawn;
mod state;
mod tracing;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

use action::{setprop_command, Actions, SELECT_TAB_PROPERTY};
use bindings::{BindingTable, DEFAULT_BINDINGS};
use config::{Config, Settings};
use keys::Trigger;
use session::Session;
use state::{Effect, SessionSnapshot};
use tracing::{EventLogEntry, EventTracer};

/// tabkeys - inspect and exercise tabbed key bindings
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/tabkeys/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output raw JSON without pretty-printing
    #[arg(long, global = true)]
    raw: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the key binding table
    Keys {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// List distinct triggers only (what a host grabs)
        #[arg(long)]
        triggers: bool,
    },

    /// Simulate key presses against an in-memory tab session
    Press {
        /// Keys to press, e.g. Mod1+Shift+Return
        #[arg(required = true)]
        keys: Vec<String>,

        /// Number of tabs to start with (windows 1..=N)
        #[arg(long, default_value_t = 3)]
        tabs: u32,

        /// Tab index to select before pressing keys
        #[arg(long)]
        select: Option<usize>,

        /// Windows to mark urgent before pressing keys
        #[arg(long, value_parser = parse_window_id)]
        urgent: Vec<u32>,

        /// Host window id substituted into spawned commands
        #[arg(long, default_value = "0x1200001")]
        winid: String,

        /// Actually run spawned commands
        #[arg(long)]
        exec: bool,

        /// Only include the last N trace entries
        #[arg(long)]
        trace: Option<usize>,
    },

    /// Print the window picker command line
    Setprop {
        /// X property to set on the host window
        #[arg(default_value = SELECT_TAB_PROPERTY)]
        property: String,

        /// Host window id
        #[arg(long, default_value = action::WINID_PLACEHOLDER)]
        winid: String,
    },

    /// Print the effective settings
    Settings,
}

/// Output of the `press` command
#[derive(Serialize)]
struct PressReport {
    session: SessionSnapshot,
    effects: Vec<Effect>,
    trace: Vec<EventLogEntry>,
}

fn parse_window_id(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).map_err(|_| format!("Invalid hex window ID: {}", s))
    } else {
        s.parse().map_err(|_| format!("Invalid window ID: {}", s))
    }
}

/// Load settings and bindings; only an explicit config path is fatal
fn load_config(path: Option<&Path>) -> Result<(Settings, BindingTable)> {
    if let Some(path) = path {
        let config = Config::load_strict(path)?;
        return Ok((config.settings()?, config.bindings()?));
    }

    let config = Config::load();
    let settings = config.settings().unwrap_or_else(|e| {
        log::warn!("{:#}, using default settings", e);
        Settings::default()
    });
    let table = config.bindings().unwrap_or_else(|e| {
        log::warn!("{:#}, using default key bindings", e);
        DEFAULT_BINDINGS.clone()
    });
    Ok((settings, table))
}

fn print_json<T: Serialize>(value: &T, raw: bool) -> Result<()> {
    let json = if raw {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}

fn list_keys(table: &BindingTable, json: bool, triggers: bool, raw: bool) -> Result<()> {
    if triggers {
        let triggers = table.triggers();
        if json {
            return print_json(&triggers, raw);
        }
        for trigger in triggers {
            println!("{}", trigger);
        }
        return Ok(());
    }

    if json {
        return print_json(table, raw);
    }
    for binding in table.iter() {
        println!("{:<24} {}", binding.trigger.to_string(), binding.action);
    }
    Ok(())
}

/// Carry out queued effects. Close requests are honoured at once, the way a
/// well-behaved client would respond to WM_DELETE_WINDOW.
fn run_effects(session: &mut Session, exec: bool, done: &mut Vec<Effect>) {
    loop {
        let pending = session.take_effects();
        if pending.is_empty() {
            break;
        }
        for effect in pending {
            match &effect {
                Effect::Close { window } => session.unmanage(*window),
                Effect::Spawn { argv } if exec => {
                    if let Err(e) = spawn::launch(argv) {
                        log::error!("{:#}", e);
                    }
                }
                Effect::Spawn { argv } => log::info!("Would spawn {:?}", argv),
            }
            done.push(effect);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn press(
    table: &BindingTable,
    settings: &Settings,
    keys: &[String],
    tabs: u32,
    select: Option<usize>,
    urgent: &[u32],
    winid: &str,
    exec: bool,
    trace: Option<usize>,
) -> Result<PressReport> {
    // Parse everything up front so a typo doesn't leave a half-run session
    let triggers = keys
        .iter()
        .map(|k| Trigger::parse(k))
        .collect::<Result<Vec<_>>>()?;

    let mut session = Session::new(winid, settings);
    for window in 1..=tabs {
        session.manage(window, format!("tab {}", window));
    }
    if let Some(index) = select {
        session.move_to(index);
    }
    for &window in urgent {
        session.set_urgent(window, true);
    }
    // Setup is not part of the trace
    session.take_transitions();

    let mut tracer = EventTracer::new();
    let mut effects = Vec::new();
    for parsed in triggers {
        if !session.is_running() {
            log::info!("Session stopped, ignoring remaining keys");
            break;
        }
        // Presses go through the same lock-mask cleaning as real key events
        let trigger = Trigger::from_event(parsed.modifiers, parsed.keysym);
        let fired = table.dispatch(trigger, &mut session);
        tracer.trace_key(trigger, fired);
        run_effects(&mut session, exec, &mut effects);
        for transition in session.take_transitions() {
            tracer.trace_transition(&transition);
        }
    }

    let trace = tracer.recent(trace);
    Ok(PressReport {
        session: session.snapshot(),
        effects,
        trace,
    })
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let (settings, table) = load_config(cli.config.as_deref())?;
    if table.is_empty() {
        log::warn!("No key bindings configured");
    }
    log::debug!("Loaded {} key bindings", table.len());

    match cli.command {
        Commands::Keys { json, triggers } => list_keys(&table, json, triggers, cli.raw)?,
        Commands::Press {
            keys,
            tabs,
            select,
            urgent,
            winid,
            exec,
            trace,
        } => {
            let report = press(
                &table, &settings, &keys, tabs, select, &urgent, &winid, exec, trace,
            )?;
            print_json(&report, cli.raw)?;
        }
        Commands::Setprop { property, winid } => {
            print_json(&setprop_command(&property, &winid), cli.raw)?;
        }
        Commands::Settings => print_json(&settings, cli.raw)?,
    }

    Ok(())
}
