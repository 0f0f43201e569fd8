mod script;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use stickyboard::config::{ConfigError, EngineConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::script::{Script, ScriptError, replay};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid script JSON: {0}")]
    ScriptJson(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

#[derive(Parser, Debug)]
#[command(name = "stickyboard", about = "Replay a gesture script through the sticky-board viewport engine")]
struct Cli {
    /// Path to the JSON gesture script.
    script: PathBuf,

    /// Engine tunables as JSON; missing fields take defaults.
    #[arg(long, env = "STICKYBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Frames to keep driving after the last step while momentum or auto-pan runs.
    #[arg(long, default_value_t = 1000)]
    settle_frames: u64,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json(&read(path)?)?,
        None => EngineConfig::default(),
    };
    let script: Script = serde_json::from_str(&read(&cli.script)?)?;
    info!(steps = script.steps.len(), "replaying script");

    let result = replay(&script, config, cli.settle_frames)?;
    let rendered =
        if cli.pretty { serde_json::to_string_pretty(&result)? } else { serde_json::to_string(&result)? };
    println!("{rendered}");
    Ok(())
}
