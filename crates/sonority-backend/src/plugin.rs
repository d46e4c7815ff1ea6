//! Plugin entry points.
//!
//! Hosts load the backend as a dynamic library and call
//! [`initialize_audio_api`], or link it and call [`create_sound_system`].

use crate::config::BackendConfig;
use crate::system::BackendSystem;
use parking_lot::Mutex;
use sonority_common::{PSoundSystem, SoundResult, StdVfs};
use sonority_engine::{ClockMode, EngineSettings, HeadlessEngine, OutputMode};
use std::sync::Arc;
use tracing::{error, info};

/// Configuration file read from the working directory.
pub const CONFIG_FILE: &str = "sonority.toml";

/// Engine settings for a backend configuration.
pub fn engine_settings(config: &BackendConfig) -> EngineSettings {
    EngineSettings {
        clock: ClockMode::Realtime,
        output: if config.output_device {
            OutputMode::Device
        } else {
            OutputMode::Silent
        },
    }
}

/// Creates a session with an explicit configuration, loading files from the
/// working directory.
pub fn create_sound_system_with(
    meters_per_unit: f32,
    config: BackendConfig,
) -> SoundResult<PSoundSystem> {
    let engine = HeadlessEngine::new(engine_settings(&config));
    let system = BackendSystem::create(
        engine,
        Arc::new(StdVfs::default()),
        "",
        meters_per_unit,
        config,
    )?;
    Ok(Arc::new(Mutex::new(system)))
}

/// Creates a session configured from [`CONFIG_FILE`].
pub fn create_sound_system(meters_per_unit: f32) -> SoundResult<PSoundSystem> {
    create_sound_system_with(meters_per_unit, BackendConfig::load_from(CONFIG_FILE))
}

/// Dynamic library entry point.
///
/// Stores the session in `out` and returns `true`, or writes the failure
/// reason to `err` and returns `false`.
#[allow(unsafe_code)]
#[no_mangle]
pub fn initialize_audio_api(
    meters_per_unit: f32,
    out: &mut Option<PSoundSystem>,
    err: &mut String,
) -> bool {
    match create_sound_system(meters_per_unit) {
        Ok(system) => {
            info!("Audio API initialized");
            *out = Some(system);
            true
        },
        Err(e) => {
            error!("Audio API initialization failed: {e}");
            *err = e.to_string();
            false
        },
    }
}
