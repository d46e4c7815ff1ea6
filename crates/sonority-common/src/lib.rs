//! # Sonority Common
//!
//! Host-side sound interface shared by every Sonority backend.
//!
//! This crate provides the abstractions a host application programs against:
//! - Capability traits (`SoundSystem`, `Listener`, `SoundBuffer`, `SoundChannel`, `Effect`)
//! - Sample formats, channel layouts and distance models
//! - Effect property sets
//! - Game-space to audio-space unit conversion
//! - The virtual filesystem sounds are loaded through
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod buffer;
pub mod channel;
pub mod coords;
pub mod effects;
pub mod error;
pub mod format;
pub mod listener;
pub mod paths;
pub mod system;
pub mod vfs;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::buffer::*;
    pub use crate::channel::*;
    pub use crate::coords::*;
    pub use crate::effects::*;
    pub use crate::error::*;
    pub use crate::format::*;
    pub use crate::listener::*;
    pub use crate::paths::*;
    pub use crate::system::*;
    pub use crate::vfs::*;
}

pub use glam::Vec3;
pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_scale_round_trip() {
        let units = UnitScale::new(0.025);
        let game = Vec3::new(40.0, -80.0, 120.0);
        let audio = units.to_audio_position(game);

        assert!((audio - Vec3::new(1.0, -2.0, 3.0)).length() < 1e-5);
        assert!((units.to_game_position(audio) - game).length() < 1e-3);
    }

    #[test]
    fn test_path_normalization_dedups_keys() {
        assert_eq!(
            normalize_path("Sounds\\Weapons//Rifle.WAV"),
            normalize_path("./sounds/weapons/rifle.wav")
        );
    }

    #[test]
    fn test_sample_type_sizes() {
        assert_eq!(SampleType::UInt8.bytes_per_sample(), 1);
        assert_eq!(SampleType::Int16.bytes_per_sample(), 2);
        assert_eq!(SampleType::Float32.bytes_per_sample(), 4);
    }
}
