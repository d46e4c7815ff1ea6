//! # Sonority Probe
//!
//! Loads sound files through the backend and prints what the engine
//! reports for each of them.
//!
//! ```text
//! sonority-probe [--async] [--mono] <file>...
//! ```
//!
//! Paths are resolved against the working directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{bail, Context, Result};
use sonority_backend::{BackendConfig, BackendSystem, CONFIG_FILE};
use sonority_common::{SoundBuffer, SoundSystem, StdVfs};
use sonority_engine::{EngineSettings, HeadlessEngine};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Upper bound on update ticks spent waiting for asynchronous loads.
const MAX_WAIT_TICKS: usize = 1_000;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("sonority=info".parse()?))
        .init();

    let mut load_async = false;
    let mut convert_to_mono = false;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--async" => load_async = true,
            "--mono" => convert_to_mono = true,
            _ => paths.push(arg),
        }
    }
    if paths.is_empty() {
        bail!("usage: sonority-probe [--async] [--mono] <file>...");
    }

    let config = BackendConfig::load_from(CONFIG_FILE);
    let mut system = BackendSystem::create(
        HeadlessEngine::new(EngineSettings::default()),
        Arc::new(StdVfs::default()),
        "",
        1.0,
        config,
    )
    .context("failed to start the sound system")?;
    info!("Probing {} files", paths.len());

    let mut buffers = Vec::with_capacity(paths.len());
    for path in &paths {
        match system.load_sound(path, convert_to_mono, load_async) {
            Ok(buffer) => buffers.push((path, buffer)),
            Err(e) => warn!("{e}"),
        }
    }

    for _ in 0..MAX_WAIT_TICKS {
        if buffers.iter().all(|(_, b)| b.is_ready()) {
            break;
        }
        system.update();
    }

    for (path, buffer) in &buffers {
        if !buffer.is_ready() {
            println!("{path}: not loaded");
            continue;
        }
        let sample_type = match buffer.sample_type() {
            Ok(ty) => format!("{ty:?}"),
            Err(e) => e.to_string(),
        };
        println!("{path}");
        println!("  name:        {}", buffer.name());
        println!(
            "  channels:    {:?} (target {:?})",
            buffer.channel_config(),
            buffer.target_channel_config()
        );
        println!("  sample type: {sample_type}");
        println!("  frequency:   {} Hz", buffer.frequency());
        println!("  length:      {} frames", buffer.length());
        println!("  duration:    {:.3} s", buffer.duration());
        println!("  size:        {} bytes", buffer.size());
    }

    Ok(())
}
