//! The sound-system session.

use crate::buffer::PSoundBuffer;
use crate::channel::PSoundChannel;
use crate::effects::PEffect;
use crate::error::SoundResult;
use crate::format::{ChannelConfig, DistanceModel, SampleType};
use crate::listener::Listener;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Host features a backend may not provide.
///
/// Unsupported features keep their methods but answer with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedFeature {
    /// Head related transfer functions
    Hrtf,
    /// Auxiliary effect slots and sends
    AuxiliaryEffectSlots,
    /// Selectable distance attenuation model
    DistanceModel,
    /// Global doppler factor
    DopplerFactor,
    /// Global speed of sound
    SpeedOfSound,
    /// Device naming and enumeration
    DeviceSelection,
    /// Pausing device-level processing
    DeviceDsp,
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hrtf => "hrtf",
            Self::AuxiliaryEffectSlots => "auxiliary effect slots",
            Self::DistanceModel => "distance model",
            Self::DopplerFactor => "doppler factor",
            Self::SpeedOfSound => "speed of sound",
            Self::DeviceSelection => "device selection",
            Self::DeviceDsp => "device dsp control",
        };
        f.write_str(name)
    }
}

/// Routing target for effects shared between channels.
pub trait AuxiliaryEffectSlot: Send {
    /// Attaches an effect to the slot.
    fn set_effect(&mut self, effect: PEffect);
    /// Gain applied to the slot output.
    fn set_gain(&mut self, gain: f32);
}

/// Shared auxiliary slot handle.
pub type PAuxiliaryEffectSlot = Arc<Mutex<dyn AuxiliaryEffectSlot>>;

/// An audio session: owns loading, playback and global settings.
pub trait SoundSystem: Send {
    /// Advances the session by one host tick.
    fn update(&mut self);

    // === Resources ===

    /// Loads a sound, reusing a cached buffer when possible.
    fn load_sound(&mut self, path: &str, convert_to_mono: bool, load_async: bool)
        -> SoundResult<PSoundBuffer>;
    /// Creates a channel for a buffer produced by this session.
    ///
    /// Returns `None` for buffers from another backend.
    fn create_channel(&mut self, buffer: &PSoundBuffer) -> Option<PSoundChannel>;
    /// Creates an effect with no properties applied.
    fn create_effect(&mut self) -> Option<PEffect>;
    /// Drops cached buffers nothing else holds.
    fn clear_unused_buffers(&mut self) -> usize;
    /// The session's listener.
    fn listener(&mut self) -> &mut dyn Listener;

    // === Units and formats ===

    /// Changes the game-unit scale for the listener and every channel.
    fn set_meters_per_unit(&mut self, meters_per_unit: f32);
    /// Current unit scale.
    fn meters_per_unit(&self) -> f32;
    /// Whether buffers with this layout and sample type can be played.
    fn is_supported(&self, channels: ChannelConfig, sample_type: SampleType) -> bool;

    // === Global acoustics (stored only) ===

    /// Stores the doppler factor.
    fn set_doppler_factor(&mut self, factor: f32);
    /// Stored doppler factor.
    fn doppler_factor(&self) -> f32;
    /// Stores the speed of sound.
    fn set_speed_of_sound(&mut self, speed: f32);
    /// Stored speed of sound.
    fn speed_of_sound(&self) -> f32;
    /// Stores the distance model.
    fn set_distance_model(&mut self, model: DistanceModel);
    /// Stored distance model.
    fn distance_model(&self) -> DistanceModel;

    // === Devices ===

    /// Name of the open device.
    fn device_name(&self) -> String;
    /// Available device names.
    fn devices(&self) -> Vec<String>;
    /// Name of the default device.
    fn default_device_name(&self) -> String;
    /// Pauses device-level processing.
    fn pause_device_dsp(&mut self);
    /// Resumes device-level processing.
    fn resume_device_dsp(&mut self);

    // === Effects routing ===

    /// Maximum auxiliary sends per channel.
    fn max_auxiliary_effects_per_source(&self) -> u32;
    /// Creates an auxiliary slot.
    fn create_auxiliary_effect_slot(&mut self) -> Option<PAuxiliaryEffectSlot>;

    // === HRTF ===

    /// Available HRTF profiles.
    fn hrtf_names(&self) -> Vec<String>;
    /// Active HRTF profile.
    fn current_hrtf(&self) -> String;
    /// Whether HRTF rendering is on.
    fn is_hrtf_enabled(&self) -> bool;
    /// Selects an HRTF profile.
    fn set_hrtf(&mut self, id: u32);
    /// Turns HRTF rendering off.
    fn disable_hrtf(&mut self);

    /// Features this backend answers with defaults.
    fn unsupported_features(&self) -> &[UnsupportedFeature];
}

/// Shared session handle.
pub type PSoundSystem = Arc<Mutex<dyn SoundSystem>>;
