//! Sessions over an in-memory filesystem with a manual clock.

use crate::config::BackendConfig;
use crate::system::BackendSystem;
use sonority_common::{MemoryVfs, SoundSystem};
use sonority_engine::{EngineSettings, HeadlessEngine};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn session_with(
    files: &[(&str, Vec<u8>)],
    config: BackendConfig,
) -> BackendSystem<HeadlessEngine> {
    let vfs = MemoryVfs::new();
    for (path, bytes) in files {
        vfs.insert(*path, bytes.clone());
    }
    BackendSystem::create(
        HeadlessEngine::new(EngineSettings::manual()),
        Arc::new(vfs),
        "",
        1.0,
        config,
    )
    .expect("headless session")
}

pub(crate) fn session(files: &[(&str, Vec<u8>)]) -> BackendSystem<HeadlessEngine> {
    session_with(files, BackendConfig::default())
}

/// Advances the engine clock and runs one session update.
pub(crate) fn tick(system: &mut BackendSystem<HeadlessEngine>, dt: Duration) {
    system.engine().lock().advance(dt);
    system.update();
}
