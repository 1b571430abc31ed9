//! `wincfg-host`: a headless editor host for the window configuration plugin.
//!
//! Reads host events from stdin (one per line, see
//! [`wincfg_plugin::infrastructure::host::console`]) and prints prompts and
//! status lines to stdout.  Logs go to stderr.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load PluginConfig            -- config.toml + CLI overrides
//!  └─ TomlFileStore::open          -- persisted defaults file
//!  └─ SettingsRegistry + ConsoleHost
//!  └─ event loop (single thread)
//!       ├─ stdin line   ──► ConsoleHost::handle_line
//!       ├─ poll tick    ──► TomlFileStore::poll_external_change
//!       └─ Ctrl-C       ──► shutdown
//! ```
//!
//! Settings instances are `Rc`-based, so everything runs on a current-thread
//! runtime and nothing is spawned.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wincfg_core::{PersistedStore, SettingsRegistry};
use wincfg_plugin::infrastructure::host::{
    ConsoleHost, ConsoleInputPanel, ConsoleStatusSink, HostControl,
};
use wincfg_plugin::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, PluginConfig,
};
use wincfg_plugin::infrastructure::storage::TomlFileStore;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Headless editor host for per-window configuration.
#[derive(Debug, Parser)]
#[command(
    name = "wincfg-host",
    about = "Console editor host for the window configuration plugin",
    version
)]
struct Cli {
    /// Path to config.toml.  Defaults to the platform config directory.
    #[arg(long, env = "WINCFG_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the persisted defaults file; overrides the config file.
    #[arg(long, env = "WINCFG_DEFAULTS")]
    defaults: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "WINCFG_LOG_LEVEL")]
    log_level: Option<String>,

    /// How often the defaults file is checked for external edits.
    #[arg(long, env = "WINCFG_POLL_MS")]
    poll_ms: Option<u64>,

    /// Write the effective config (file plus flags) back to the config file
    /// and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Resolves the config file path from `--config` or the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if no `--config` is given and the platform config
    /// directory cannot be determined.
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("failed to locate the config directory"),
        }
    }

    /// Applies command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut PluginConfig) {
        if let Some(defaults) = &self.defaults {
            config.settings.defaults_path = Some(defaults.clone());
        }
        if let Some(level) = &self.log_level {
            config.host.log_level = level.clone();
        }
        if let Some(poll_ms) = self.poll_ms {
            config.host.poll_interval_ms = poll_ms;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    cli.apply(&mut config);

    if cli.write_config {
        save_config_to(&config, &config_path)
            .with_context(|| format!("failed to write config to {}", config_path.display()))?;
        println!("wrote {}", config_path.display());
        return Ok(());
    }

    // Logs go to stderr so stdout carries only prompts and status lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.host.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let defaults_path = config.defaults_path(&config_path);
    let store = Rc::new(TomlFileStore::open(&defaults_path).with_context(|| {
        format!(
            "failed to open settings resource {}",
            defaults_path.display()
        )
    })?);
    let registry = Rc::new(SettingsRegistry::new(
        Rc::clone(&store) as Rc<dyn PersistedStore>
    ));
    let mut host = ConsoleHost::new(
        registry,
        Rc::new(ConsoleInputPanel::stdout()),
        Rc::new(ConsoleStatusSink::stdout()),
    );

    info!(
        "wincfg-host ready (defaults: {}, poll every {:?})",
        defaults_path.display(),
        config.poll_interval()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(config.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => {
                        if host.handle_line(&line) == HostControl::Quit {
                            break;
                        }
                    }
                    None => {
                        info!("end of input");
                        break;
                    }
                }
            }
            _ = poll.tick() => {
                if let Err(e) = store.poll_external_change() {
                    warn!("failed to check settings resource for changes: {e}");
                }
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!("failed to listen for Ctrl-C: {e}");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }

    host.shutdown();
    info!("wincfg-host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
