//! # Moodboard CLI
//!
//! Headless host for the moodboard core: manages boards on disk, imports
//! images from a directory and replays recorded touch traces.
//!
//! ## Usage
//!
//! ```bash
//! moodboard new-board "Kitchen"
//! moodboard --board board_... import ./photos
//! moodboard --board board_... replay trace.json
//! moodboard show
//! ```
//!
//! Without `--board`, commands act on the board used last.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use moodboard_core::settings::{Settings, SETTINGS_FILE};
use moodboard_core::InputEvent;

/// Command-line arguments for `moodboard`.
#[derive(Debug, Clone, Parser)]
#[command(name = "moodboard")]
#[command(about = "Pannable, zoomable image moodboards from the command line")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding boards and settings
    #[arg(long, env = "MOODBOARD_DATA_DIR", default_value = ".moodboard")]
    pub data_dir: PathBuf,

    /// Board to act on (defaults to the board used last)
    #[arg(long, env = "MOODBOARD_BOARD", global = true)]
    pub board: Option<String>,

    /// Viewport width in pixels
    #[arg(long, default_value = "800")]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value = "600")]
    pub height: u32,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List boards, most recently updated first
    Boards,
    /// Create a board and make it current
    NewBoard {
        /// Board name
        name: String,
    },
    /// Import every image in a directory onto the board
    Import {
        /// Directory to read images from
        dir: PathBuf,
    },
    /// Print the board's items in z order and its camera
    Show {
        /// Print the projected draw list instead
        #[arg(long)]
        draw: bool,
    },
    /// Feed a JSON array of input events through the board
    Replay {
        /// Trace file
        trace: PathBuf,
    },
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Data directory.
    pub data_dir: PathBuf,
    /// Explicitly requested board.
    pub board: Option<String>,
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from(".moodboard"),
            board: None,
            width: 800.0,
            height: 600.0,
        }
    }

    /// Directory with one JSON document per board.
    #[must_use]
    pub fn boards_dir(&self) -> PathBuf {
        self.data_dir.join("boards")
    }

    /// Path of the settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    /// The board to act on: the requested one, else the one used last.
    #[must_use]
    pub fn resolve_board(&self, settings: &Settings) -> Option<String> {
        self.board
            .clone()
            .or_else(|| settings.last_board_id.clone())
    }
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            data_dir: args.data_dir,
            board: args.board,
            width: f64::from(args.width),
            height: f64::from(args.height),
        }
    }
}

/// Parse a touch trace: a JSON array of [`InputEvent`]s.
///
/// # Errors
///
/// Returns an error if the text is not such an array.
pub fn parse_trace(json: &str) -> anyhow::Result<Vec<InputEvent>> {
    let events = serde_json::from_str(json)?;
    Ok(events)
}
