use clap::Parser;
use std::path::PathBuf;

/// Drops Miner - keeps a drops mining client alive and exposes its state
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "drops-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to `log.txt` in the data directory instead of stdout
    #[arg(long)]
    pub log: bool,

    /// Path to settings file (default: `settings.toml` in the data directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for app data (settings, journal, logs)
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// host:port binding for the JSON control API
    #[arg(long)]
    pub bind: Option<String>,
}
