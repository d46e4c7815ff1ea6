//! Playback channels.
//!
//! A channel plays one buffer. Its parameters persist across the life of
//! the underlying engine voice, which may be stolen or virtualized at any
//! time; in that case the channel keeps answering from its cached values.

use crate::buffer::PSoundBuffer;
use crate::error::SoundResult;
use glam::Vec3;
use parking_lot::Mutex;
use std::sync::Arc;

/// Observable channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Never played
    Uninitialized,
    /// Audible or scheduled to start
    Playing,
    /// Paused by the host
    Paused,
    /// Stopped by the host or finished
    Stopped,
    /// The engine revoked the voice. Parameters come from the cache.
    Invalidated,
}

/// Notifications a channel emits to registered callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelEvent {
    /// The listener-relative flag changed to the carried value.
    RelativeChanged(bool),
}

/// Callback invoked for each [`ChannelEvent`].
pub type ChannelEventCallback = Box<dyn FnMut(&ChannelEvent) + Send>;

/// A playback channel bound to one buffer.
///
/// Mutators return `Err` only when the owning session propagates engine
/// failures. Getters never fail and degrade to cached values.
pub trait SoundChannel: Send {
    // === Lifecycle ===

    /// Starts playback from the beginning.
    fn play(&mut self) -> SoundResult<()>;
    /// Stops playback and cancels a scheduled start.
    fn stop(&mut self) -> SoundResult<()>;
    /// Pauses a live voice.
    fn pause(&mut self) -> SoundResult<()>;
    /// Resumes from the tracked offset.
    fn resume(&mut self) -> SoundResult<()>;
    /// Whether the channel is audible or scheduled to start.
    fn is_playing(&self) -> bool;
    /// Negation of [`SoundChannel::is_playing`].
    fn is_paused(&self) -> bool {
        !self.is_playing()
    }
    /// Current state.
    fn state(&self) -> ChannelState;
    /// Per-tick bookkeeping.
    fn update(&mut self);
    /// The buffer being played.
    fn buffer(&self) -> PSoundBuffer;

    // === Position in the buffer ===

    /// Seeks to a sample frame.
    fn set_frame_offset(&mut self, frame: u32) -> SoundResult<()>;
    /// Current sample frame.
    fn frame_offset(&self) -> u32;
    /// Seeks to a fraction of the buffer length.
    fn set_offset(&mut self, offset: f32) -> SoundResult<()>;
    /// Current position as a fraction of the buffer length.
    fn offset(&self) -> f32;
    /// Buffer duration in seconds.
    fn duration(&self) -> f32;

    // === Playback parameters ===

    /// Voice priority. Lower is more important.
    fn set_priority(&mut self, priority: u32) -> SoundResult<()>;
    /// Current priority.
    fn priority(&self) -> u32;
    /// Enables or disables looping.
    fn set_looping(&mut self, looping: bool) -> SoundResult<()>;
    /// Whether the channel loops.
    fn is_looping(&self) -> bool;
    /// Playback rate multiplier.
    fn set_pitch(&mut self, pitch: f32) -> SoundResult<()>;
    /// Current pitch.
    fn pitch(&self) -> f32;
    /// Linear gain, clamped to the gain range.
    fn set_gain(&mut self, gain: f32) -> SoundResult<()>;
    /// Current gain.
    fn gain(&self) -> f32;
    /// Bounds the gain.
    fn set_gain_range(&mut self, min: f32, max: f32) -> SoundResult<()>;
    /// Gain bounds as `(min, max)`.
    fn gain_range(&self) -> (f32, f32);
    /// Lower gain bound.
    fn min_gain(&self) -> f32 {
        self.gain_range().0
    }
    /// Upper gain bound.
    fn max_gain(&self) -> f32 {
        self.gain_range().1
    }

    // === Spatialization ===

    /// Reference and maximum distance in game units.
    fn set_distance_range(&mut self, reference: f32, max: f32) -> SoundResult<()>;
    /// Distance range as `(reference, max)`.
    fn distance_range(&self) -> (f32, f32);
    /// World or listener-relative position.
    fn set_position(&mut self, pos: Vec3) -> SoundResult<()>;
    /// Current position.
    fn position(&self) -> Vec3;
    /// Velocity in game units per second.
    fn set_velocity(&mut self, vel: Vec3) -> SoundResult<()>;
    /// Current velocity.
    fn velocity(&self) -> Vec3;
    /// Inner and outer cone angles in degrees.
    fn set_cone_angles(&mut self, inner: f32, outer: f32) -> SoundResult<()>;
    /// Cone angles as `(inner, outer)`.
    fn cone_angles(&self) -> (f32, f32);
    /// Doppler scale for this channel.
    fn set_doppler_factor(&mut self, factor: f32) -> SoundResult<()>;
    /// Current doppler factor.
    fn doppler_factor(&self) -> f32;
    /// Positions relative to the listener.
    fn set_relative(&mut self, relative: bool) -> SoundResult<()>;
    /// Whether positions are listener-relative.
    fn is_relative(&self) -> bool;
    /// Audible radius, alias of the maximum distance.
    fn set_radius(&mut self, radius: f32) -> SoundResult<()>;
    /// Audible radius.
    fn radius(&self) -> f32;
    /// Allows or forbids spatialization.
    fn set_3d_attributes_effective(&mut self, effective: bool) -> SoundResult<()>;
    /// Whether spatialization is allowed.
    fn are_3d_attributes_effective(&self) -> bool;
    /// Whether the channel is currently spatialized.
    fn is_3d(&self) -> bool;
    /// Negation of [`SoundChannel::is_3d`].
    fn is_2d(&self) -> bool {
        !self.is_3d()
    }

    // === Unsupported properties (no-op setters, default getters) ===

    /// Unsupported.
    fn set_direction(&mut self, dir: Vec3);
    /// Always zero.
    fn direction(&self) -> Vec3;
    /// Unsupported.
    fn set_orientation(&mut self, at: Vec3, up: Vec3);
    /// Always zero vectors.
    fn orientation(&self) -> (Vec3, Vec3);
    /// Unsupported.
    fn set_outer_cone_gains(&mut self, gain: f32, gain_hf: f32);
    /// Always zero.
    fn outer_cone_gains(&self) -> (f32, f32);
    /// Unsupported.
    fn set_rolloff_factors(&mut self, factor: f32, room_factor: f32);
    /// Always zero.
    fn rolloff_factors(&self) -> (f32, f32);
    /// Unsupported.
    fn set_stereo_angles(&mut self, left: f32, right: f32);
    /// Always zero.
    fn stereo_angles(&self) -> (f32, f32);
    /// Unsupported.
    fn set_air_absorption_factor(&mut self, factor: f32);
    /// Always zero.
    fn air_absorption_factor(&self) -> f32;
    /// Unsupported.
    fn set_gain_auto(&mut self, direct_hf: bool, send: bool, send_hf: bool);
    /// Always all false.
    fn gain_auto(&self) -> (bool, bool, bool);

    // === Events ===

    /// Registers a callback for channel events.
    fn add_event_listener(&mut self, callback: ChannelEventCallback);
}

/// Shared channel handle.
pub type PSoundChannel = Arc<Mutex<dyn SoundChannel>>;
