// src/config.rs

//! Defines the configuration structures consumed by the display pipeline.
//!
//! The configuration is resolved once at startup and is read-only afterwards.
//! Every struct derives `Deserialize` with `#[serde(default)]`, so a config
//! file only needs to mention the settings it changes. Defaults follow the
//! long-standing behaviour of classic desktop system monitors: one-second
//! refresh, top-right alignment, an undecorated normal window.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the config path when no CLI argument is given.
pub const CONFIG_PATH_ENV: &str = "SYSVIEW_CONFIG";

/// Shortest refresh interval accepted. Smaller values are clamped up.
const MIN_UPDATE_INTERVAL_SECS: f64 = 0.05;
/// One day. Keeps `Instant + interval` far from overflow.
const MAX_UPDATE_INTERVAL_SECS: f64 = 86_400.0;

/// NaN and anything below the minimum clamp to the minimum.
fn clamp_interval(secs: f64) -> f64 {
    if secs >= MIN_UPDATE_INTERVAL_SECS {
        secs.min(MAX_UPDATE_INTERVAL_SECS)
    } else {
        MIN_UPDATE_INTERVAL_SECS
    }
}

// --- Top-Level Configuration Structure ---

/// Root of the configuration tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Refresh cadence, content area and placement.
    pub display: DisplayConfig,
    /// Own-window properties for graphical backends.
    pub window: WindowConfig,
    /// Which backends are enabled.
    pub output: OutputConfig,
    /// Pointer input handling.
    pub input: InputConfig,
    /// Window-manager negotiation tunables.
    pub geometry: GeometryConfig,
}

impl Config {
    /// Loads a config file if `path` is given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str::<Config>(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => {
                info!("No configuration file given, using defaults.");
                Config::default()
            }
        };
        config.sanitize();
        Ok(config)
    }

    /// Resolves the config path from the first CLI argument, then from `SYSVIEW_CONFIG`.
    pub fn path_from_env(args: &[String]) -> Option<PathBuf> {
        args.get(1)
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
    }

    fn sanitize(&mut self) {
        let interval = clamp_interval(self.display.update_interval_secs);
        if interval != self.display.update_interval_secs {
            debug!(
                "Clamping update_interval_secs {} to {}",
                self.display.update_interval_secs, interval
            );
            self.display.update_interval_secs = interval;
        }
        if self.input.debounce_capacity == 0 {
            self.input.debounce_capacity = 1;
        }
    }
}

// --- Display Configuration ---

/// One of the nine screen anchor positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    TopLeft,
    TopMiddle,
    #[default]
    TopRight,
    MiddleLeft,
    MiddleMiddle,
    MiddleRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

/// Settings for the content area and its refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Seconds between content refreshes.
    pub update_interval_secs: f64,
    /// Maximum content width in pixels. 0 means unbounded.
    pub maximum_width: u32,
    /// Padding between the content and the border line.
    pub border_inner_margin: u32,
    /// Padding between the border line and the window edge.
    pub border_outer_margin: u32,
    /// Thickness of the border line.
    pub border_width: u32,
    /// Screen anchor of the window.
    pub alignment: Alignment,
    /// Horizontal distance from the anchored screen edge.
    pub gap_x: i32,
    /// Vertical distance from the anchored screen edge.
    pub gap_y: i32,
    /// Present through a back buffer. Forces whole-window repaints.
    pub double_buffer: bool,
}

impl DisplayConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f64(clamp_interval(self.update_interval_secs))
    }

    /// Total inset on each side of the content area.
    pub fn border_total(&self) -> u32 {
        self.border_inner_margin + self.border_outer_margin + self.border_width
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            update_interval_secs: 1.0,
            maximum_width: 0,
            border_inner_margin: 3,
            border_outer_margin: 1,
            border_width: 1,
            alignment: Alignment::TopRight,
            gap_x: 12,
            gap_y: 60,
            double_buffer: false,
        }
    }
}

// --- Window Configuration ---

/// Category of the own window. Drives focus capture and strut behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Normal,
    Dock,
    Panel,
    Desktop,
    Utility,
    Override,
}

impl WindowType {
    /// Whether a consumed button event may move input focus to our window.
    pub fn captures_input_focus(self) -> bool {
        matches!(self, WindowType::Normal | WindowType::Utility)
    }

    /// Whether the window reserves screen-edge space.
    pub fn reserves_struts(self) -> bool {
        self == WindowType::Panel
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub window_type: WindowType,
    /// Ask the window manager not to decorate the window.
    pub undecorated: bool,
    pub title: String,
    /// Size used when the window is first created, before any content exists.
    pub initial_width: u32,
    pub initial_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            window_type: WindowType::Normal,
            undecorated: true,
            title: "sysview".to_string(),
            initial_width: 1,
            initial_height: 1,
        }
    }
}

// --- Output Configuration ---

/// Enables individual backends. Detection consults these flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub out_to_x: bool,
    pub out_to_wayland: bool,
    pub out_to_ncurses: bool,
    pub out_to_console: bool,
    pub out_to_stderr: bool,
    /// File truncated and rewritten on every frame.
    pub overwrite_file: Option<PathBuf>,
    /// File appended to on every frame.
    pub append_file: Option<PathBuf>,
    /// Port for the HTTP text sink. 0 disables it.
    pub http_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            out_to_x: true,
            out_to_wayland: false,
            out_to_ncurses: false,
            out_to_console: false,
            out_to_stderr: false,
            overwrite_file: None,
            append_file: None,
            http_port: 0,
        }
    }
}

// --- Input Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Window in which a repeated (serial, kind, source) report is dropped.
    pub debounce_window_ms: u64,
    /// Number of recent reports remembered for duplicate suppression.
    pub debounce_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            debounce_window_ms: 1000,
            debounce_capacity: 32,
        }
    }
}

// --- Geometry Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometryConfig {
    /// Content refreshes that must have happened before a window-manager
    /// imposed move latches the position axis. Initial placement jitter
    /// arrives before this.
    pub position_latch_threshold: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        GeometryConfig {
            position_latch_threshold: 2,
        }
    }
}
