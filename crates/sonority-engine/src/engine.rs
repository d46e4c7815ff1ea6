//! The engine interface backends bind to.
//!
//! Every call returns an [`EngineResult`]. Voice calls may fail with
//! [`EngineError::InvalidHandle`](crate::EngineError::InvalidHandle) or
//! [`EngineError::ChannelStolen`](crate::EngineError::ChannelStolen) at any
//! time: voices are owned by the engine and can be reclaimed between calls.
//! Distances and positions are in meters.

use crate::error::EngineResult;
use crate::file::FileSystem;
use crate::handle::{DspId, SoundId, VoiceId};
use crate::mode::{InitFlags, Mode};
use crate::types::{Attributes3D, ConeSettings, DspType, OpenState, SoundFormatInfo, SpeakerMode};
use glam::Vec3;
use std::sync::Arc;

/// A native audio engine session.
pub trait Engine: Send + 'static {
    /// Engine or output driver name.
    fn name(&self) -> &str;

    // === Session ===

    /// Sets the mixer format. Only valid before [`Engine::initialize`].
    fn set_software_format(
        &mut self,
        sample_rate: u32,
        speaker_mode: SpeakerMode,
        raw_speakers: u32,
    ) -> EngineResult<()>;

    /// Opens the output and allocates `max_voices` voice slots.
    fn initialize(&mut self, max_voices: u32, flags: InitFlags) -> EngineResult<()>;

    /// Installs the file system sounds are opened through.
    fn set_file_system(&mut self, file_system: Arc<dyn FileSystem>) -> EngineResult<()>;

    /// Global 3D scales.
    fn set_3d_settings(
        &mut self,
        doppler_scale: f32,
        distance_factor: f32,
        rolloff_scale: f32,
    ) -> EngineResult<()>;

    /// Advances asynchronous opening, voice positions and virtualization.
    fn update(&mut self) -> EngineResult<()>;

    // === Sounds ===

    /// Opens a sound. With [`Mode::NONBLOCKING`] the sound starts in
    /// [`OpenState::Loading`] and finishes during later updates.
    fn create_sound(&mut self, name: &str, mode: Mode) -> EngineResult<SoundId>;

    /// Releases a sound and stops voices playing it.
    fn release_sound(&mut self, sound: SoundId) -> EngineResult<()>;

    /// Current open state.
    fn sound_open_state(&self, sound: SoundId) -> EngineResult<OpenState>;

    /// Length in PCM frames.
    fn sound_length(&self, sound: SoundId) -> EngineResult<u32>;

    /// Default frequency in Hz and default priority.
    fn sound_defaults(&self, sound: SoundId) -> EngineResult<(f32, i32)>;

    /// Decoded format.
    fn sound_format(&self, sound: SoundId) -> EngineResult<SoundFormatInfo>;

    /// Loop region in PCM frames, inclusive.
    fn set_sound_loop_points(&mut self, sound: SoundId, start: u32, end: u32) -> EngineResult<()>;

    /// Loop region in PCM frames.
    fn sound_loop_points(&self, sound: SoundId) -> EngineResult<(u32, u32)>;

    // === Voices ===

    /// Starts a voice for a ready sound.
    fn play_sound(&mut self, sound: SoundId, paused: bool) -> EngineResult<VoiceId>;

    /// Stops a voice and frees its slot.
    fn stop(&mut self, voice: VoiceId) -> EngineResult<()>;

    /// Pauses or unpauses.
    fn set_paused(&mut self, voice: VoiceId, paused: bool) -> EngineResult<()>;

    /// Whether the voice is paused.
    fn paused(&self, voice: VoiceId) -> EngineResult<bool>;

    /// Whether the voice is still alive. Paused voices count as playing.
    fn is_playing(&self, voice: VoiceId) -> EngineResult<bool>;

    /// Seeks to a PCM frame.
    fn set_position(&mut self, voice: VoiceId, frame: u32) -> EngineResult<()>;

    /// Current PCM frame.
    fn position(&self, voice: VoiceId) -> EngineResult<u32>;

    /// Priority in `0..=256`, lower is more important.
    fn set_priority(&mut self, voice: VoiceId, priority: i32) -> EngineResult<()>;

    /// Current priority.
    fn priority(&self, voice: VoiceId) -> EngineResult<i32>;

    /// Merges mode bits into the voice.
    fn set_mode(&mut self, voice: VoiceId, mode: Mode) -> EngineResult<()>;

    /// Current mode.
    fn mode(&self, voice: VoiceId) -> EngineResult<Mode>;

    /// Playback rate multiplier.
    fn set_pitch(&mut self, voice: VoiceId, pitch: f32) -> EngineResult<()>;

    /// Current pitch.
    fn pitch(&self, voice: VoiceId) -> EngineResult<f32>;

    /// Linear volume.
    fn set_volume(&mut self, voice: VoiceId, volume: f32) -> EngineResult<()>;

    /// Current volume.
    fn volume(&self, voice: VoiceId) -> EngineResult<f32>;

    // === 3D voice parameters ===

    /// Minimum and maximum attenuation distance.
    fn set_3d_min_max_distance(&mut self, voice: VoiceId, min: f32, max: f32)
        -> EngineResult<()>;

    /// Attenuation distances as `(min, max)`.
    fn min_max_distance_3d(&self, voice: VoiceId) -> EngineResult<(f32, f32)>;

    /// Position and velocity. `None` leaves a value untouched.
    fn set_3d_attributes(
        &mut self,
        voice: VoiceId,
        position: Option<Vec3>,
        velocity: Option<Vec3>,
    ) -> EngineResult<()>;

    /// Position and velocity.
    fn attributes_3d(&self, voice: VoiceId) -> EngineResult<(Vec3, Vec3)>;

    /// Directional cone.
    fn set_3d_cone_settings(&mut self, voice: VoiceId, cone: ConeSettings) -> EngineResult<()>;

    /// Current cone.
    fn cone_settings_3d(&self, voice: VoiceId) -> EngineResult<ConeSettings>;

    /// Doppler scale for this voice.
    fn set_3d_doppler_level(&mut self, voice: VoiceId, level: f32) -> EngineResult<()>;

    /// Current doppler scale.
    fn doppler_level_3d(&self, voice: VoiceId) -> EngineResult<f32>;

    // === Listeners ===

    /// Replaces a listener's attributes.
    fn set_listener_attributes(&mut self, listener: usize, attrs: &Attributes3D)
        -> EngineResult<()>;

    /// A listener's attributes.
    fn listener_attributes(&self, listener: usize) -> EngineResult<Attributes3D>;

    // === DSP units ===

    /// Creates a DSP unit with default parameters.
    fn create_dsp(&mut self, ty: DspType) -> EngineResult<DspId>;

    /// Sets a float parameter. Out of range values are rejected.
    fn set_dsp_parameter_float(&mut self, dsp: DspId, index: usize, value: f32)
        -> EngineResult<()>;

    /// Reads a float parameter.
    fn dsp_parameter_float(&self, dsp: DspId, index: usize) -> EngineResult<f32>;

    /// Type of a DSP unit.
    fn dsp_type(&self, dsp: DspId) -> EngineResult<DspType>;

    /// Releases a DSP unit.
    fn release_dsp(&mut self, dsp: DspId) -> EngineResult<()>;
}
