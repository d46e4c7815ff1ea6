//! Conversion between game units and audio-space meters.
//!
//! Hosts measure the world in their own units. Engines expect meters.
//! Positions, velocities and distances are scaled, directions are only
//! normalized. Both spaces use the same axes.

use glam::Vec3;

/// Default game units per meter scale (1 unit = 1 meter).
pub const DEFAULT_METERS_PER_UNIT: f32 = 1.0;

/// Scale factor between game units and meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    meters_per_unit: f32,
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(DEFAULT_METERS_PER_UNIT)
    }
}

impl UnitScale {
    /// Creates a scale. Non-positive or non-finite values fall back to 1.
    #[must_use]
    pub fn new(meters_per_unit: f32) -> Self {
        let meters_per_unit = if meters_per_unit.is_finite() && meters_per_unit > 0.0 {
            meters_per_unit
        } else {
            DEFAULT_METERS_PER_UNIT
        };
        Self { meters_per_unit }
    }

    /// Meters covered by one game unit.
    #[must_use]
    pub fn meters_per_unit(&self) -> f32 {
        self.meters_per_unit
    }

    /// Game position or velocity to meters.
    #[must_use]
    pub fn to_audio_position(&self, game: Vec3) -> Vec3 {
        game * self.meters_per_unit
    }

    /// Meters back to game units.
    #[must_use]
    pub fn to_game_position(&self, audio: Vec3) -> Vec3 {
        audio / self.meters_per_unit
    }

    /// Direction vectors are unit length in both spaces.
    #[must_use]
    pub fn to_audio_direction(&self, game: Vec3) -> Vec3 {
        game.normalize_or_zero()
    }

    /// Engine direction back to game space.
    #[must_use]
    pub fn to_game_direction(&self, audio: Vec3) -> Vec3 {
        audio.normalize_or_zero()
    }

    /// Scalar distance to meters. Infinity stays infinite.
    #[must_use]
    pub fn to_audio_distance(&self, game: f32) -> f32 {
        game * self.meters_per_unit
    }

    /// Scalar distance back to game units.
    #[must_use]
    pub fn to_game_distance(&self, audio: f32) -> f32 {
        audio / self.meters_per_unit
    }
}
