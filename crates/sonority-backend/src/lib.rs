//! # Sonority Backend
//!
//! Sound-system backend implementing the `sonority-common` interface on top
//! of a native audio engine.
//!
//! This crate provides:
//! - Session setup, buffer caching and per-tick updates (`BackendSystem`)
//! - Listener, buffer, channel and effect adapters
//! - Configuration loaded from `sonority.toml`
//! - The plugin entry point `initialize_audio_api`
//!
//! ## Voices
//!
//! The engine owns playback voices and may steal or end them at any time.
//! Channels cache every parameter the host sets and replay the cache when
//! they acquire a new voice, so the host never observes a failure from a
//! lost voice. See [`channel`].
//!
//! ## Errors
//!
//! Engine call failures are logged. Whether they also reach the host is
//! decided by the configured [`ErrorPolicy`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod buffer;
pub mod channel;
pub mod config;
pub mod effect;
pub mod file_bridge;
pub mod listener;
pub mod plugin;
pub mod policy;
pub mod system;

#[cfg(test)]
mod test_support;

pub use buffer::BackendBuffer;
pub use channel::BackendChannel;
pub use config::{BackendConfig, SpeakerLayout};
pub use effect::BackendEffect;
pub use file_bridge::VfsBridge;
pub use listener::BackendListener;
pub use plugin::{create_sound_system, initialize_audio_api, CONFIG_FILE};
pub use policy::ErrorPolicy;
pub use system::BackendSystem;
