//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HotkeyMaster - multi-finger trackpad taps as shortcuts
#[derive(Parser, Debug)]
#[command(name = "hotkeymaster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Listen on the built-in trackpad until interrupted
    Listen,

    /// Classify a recorded trace of touch frames
    Replay {
        /// JSON array of touch frames
        trace: PathBuf,

        /// Playback speed factor (0 = as fast as possible)
        #[arg(long, default_value = "1.0")]
        speed: f64,
    },

    /// Print the default configuration as JSON
    DefaultConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Replay time scale for a playback speed factor
    pub fn time_scale(speed: f64) -> f64 {
        if speed.is_finite() && speed > 0.0 {
            1.0 / speed
        } else {
            0.0
        }
    }
}
