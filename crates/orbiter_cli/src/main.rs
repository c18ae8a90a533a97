//! Command-line entry point.
//!
//! # Responsibility
//! - Parse one note and one action, print the canonical result.
//! - Keep stdout limited to the resulting text.

use anyhow::{Context, Result};
use clap::Parser;
use orbiter_core::{Action, OrbitConfig, Orbiter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orbiter", about = "Schedule notes with inline metadata", version)]
struct Cli {
    /// Note text
    text: String,

    /// init | update | add-response | change-schedule | change-feed | change-feedback-type
    action: String,

    /// Feed, response index or handler name, depending on the action
    arg: Option<String>,

    /// JSON file with per-feed defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for log files; logging is off without it
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// trace | debug | info | warn | error
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Requested level, or the build's default.
    fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or(orbiter_core::default_log_level())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        orbiter_core::init_logging(cli.log_level(), log_dir)
            .context("failed to initialize logging")?;
    }

    let config = match cli.config.as_deref() {
        Some(path) => OrbitConfig::load(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => OrbitConfig::default(),
    };

    let action = Action::parse(&cli.action, cli.arg.as_deref())?;
    let today = chrono::Local::now().date_naive();
    let text = Orbiter::with_thread_rng(config, today).run(&cli.text, &action)?;

    log::debug!(
        "event=cli_done module=cli status=ok action={}",
        action.name()
    );
    println!("{text}");
    Ok(())
}
