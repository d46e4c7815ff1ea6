//! The listener the mix is rendered for.

use crate::error::SoundResult;
use glam::Vec3;

/// Listener pose and gain, expressed in game units.
pub trait Listener: Send {
    /// Master gain of the listener.
    fn set_gain(&mut self, gain: f32) -> SoundResult<()>;
    /// Current gain.
    fn gain(&self) -> f32;

    /// World position.
    fn set_position(&mut self, pos: Vec3) -> SoundResult<()>;
    /// Current position.
    fn position(&self) -> Vec3;

    /// Velocity in game units per second.
    fn set_velocity(&mut self, vel: Vec3) -> SoundResult<()>;
    /// Current velocity.
    fn velocity(&self) -> Vec3;

    /// Forward (`at`) and up vectors.
    fn set_orientation(&mut self, at: Vec3, up: Vec3) -> SoundResult<()>;
    /// Orientation as `(at, up)`.
    fn orientation(&self) -> (Vec3, Vec3);

    /// Changes the unit scale used for subsequent conversions.
    fn set_meters_per_unit(&mut self, meters_per_unit: f32);
    /// Current unit scale.
    fn meters_per_unit(&self) -> f32;
}
