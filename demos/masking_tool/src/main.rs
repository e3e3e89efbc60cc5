// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless masking tool on the simulated runtime.
//!
//! Loads presets and the saved state the same way an interactive tool would,
//! replays keyboard shortcuts given on the command line, then runs the frame
//! loop until Ctrl+C or the frame limit.
//!
//! ```text
//! RUST_LOG=debug cargo run -p masking_tool -- --presets demos/masking_tool/maskingtool-presets.json \
//!     --keys tm --frames 180
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use maskcomp_app::config::AppConfig;
use maskcomp_app::controller::{Action, Controller};
use maskcomp_core::session::Session;
use maskcomp_harness::SimulatedRuntime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Masking tool driving a simulated headset.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file naming the presets and state files
    #[arg(long)]
    config: Option<PathBuf>,

    /// Presets document (overrides the config file)
    #[arg(long)]
    presets: Option<PathBuf>,

    /// Alternate presets document for the test presets toggle
    #[arg(long)]
    test_presets: Option<PathBuf>,

    /// Saved state file
    #[arg(long)]
    state: Option<PathBuf>,

    /// Preset index (document order, from 0) to apply after startup
    #[arg(long)]
    preset: Option<usize>,

    /// Shortcut keys to replay after startup, one action per character
    #[arg(long, default_value = "")]
    keys: String,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Save the state when the loop ends
    #[arg(long)]
    save_on_exit: bool,
}

impl Args {
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AppConfig::default(),
        };
        if let Some(path) = &self.presets {
            config.presets_path.clone_from(path);
        }
        if let Some(path) = &self.test_presets {
            config.test_presets_path.clone_from(path);
        }
        if let Some(path) = &self.state {
            config.state_path.clone_from(path);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.app_config()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = Arc::clone(&shutdown);
    if let Err(err) = ctrlc::set_handler(move || handler_shutdown.store(true, Ordering::SeqCst)) {
        warn!("failed to install Ctrl+C handler: {err}");
    }

    let session = Session::init(Box::new(SimulatedRuntime::default()))
        .context("initializing compositor session")?;
    let mut controller = Controller::init(&session, config);

    if let Some(index) = args.preset {
        controller.on_action(Action::ApplyPreset(index));
    }
    for key in args.keys.chars() {
        match Action::from_key(key) {
            Some(action) => {
                controller.on_action(action);
            }
            None => warn!(%key, "no action for key"),
        }
    }

    let mut frames = 0_u64;
    let mut submitted = 0_u64;
    while !shutdown.load(Ordering::SeqCst) && args.frames.is_none_or(|limit| frames < limit) {
        if controller.update() {
            submitted += 1;
        }
        frames += 1;
    }
    info!(frames, submitted, "frame loop finished");

    if args.save_on_exit {
        controller.on_action(Action::SaveState);
    }
    Ok(())
}
