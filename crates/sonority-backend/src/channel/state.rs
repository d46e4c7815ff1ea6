//! Desired channel state and its replay onto engine voices.
//!
//! The cached state is what the host asked for, in game units. Whenever a
//! voice is (re)acquired the cache is turned into a list of [`VoiceOp`]s in
//! engine units and applied in order.

use glam::Vec3;
use sonority_common::UnitScale;
use sonority_engine::{ConeSettings, Engine, EngineResult, Mode, VoiceId};

/// Priority of a fresh channel.
pub const DEFAULT_PRIORITY: u32 = 128;

/// Highest priority value the engine accepts.
pub const MAX_PRIORITY: u32 = 256;

/// Full circle cone angle in degrees.
pub const FULL_CONE: f32 = 360.0;

/// Engine doppler level ceiling.
const MAX_DOPPLER_LEVEL: f32 = 5.0;

/// Host-requested channel parameters, in game units.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// Play cursor in sample frames
    pub frame_offset: u32,
    /// Voice priority, lower is more important
    pub priority: u32,
    /// Loop flag
    pub looping: bool,
    /// Playback rate multiplier
    pub pitch: f32,
    /// Linear gain
    pub gain: f32,
    /// Lower gain bound
    pub min_gain: f32,
    /// Upper gain bound
    pub max_gain: f32,
    /// Distance where attenuation starts
    pub reference_distance: f32,
    /// Distance where attenuation stops
    pub max_distance: f32,
    /// World or listener-relative position
    pub position: Vec3,
    /// Velocity
    pub velocity: Vec3,
    /// Inner cone angle in degrees
    pub cone_inner: f32,
    /// Outer cone angle in degrees
    pub cone_outer: f32,
    /// Doppler scale
    pub doppler_factor: f32,
    /// Positions relative to the listener
    pub relative: bool,
    /// Spatialization allowed
    pub effective_3d: bool,
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            frame_offset: 0,
            priority: DEFAULT_PRIORITY,
            looping: false,
            pitch: 1.0,
            gain: 1.0,
            min_gain: 0.0,
            max_gain: 1.0,
            reference_distance: 1.0,
            max_distance: 10_000.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            cone_inner: FULL_CONE,
            cone_outer: FULL_CONE,
            doppler_factor: 1.0,
            relative: false,
            effective_3d: true,
        }
    }
}

/// How a voice is spatialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialMode {
    /// 2D, no spatialization
    Flat,
    /// 3D in world space
    World,
    /// 3D relative to the listener
    HeadRelative,
}

impl SpatialMode {
    /// Whether the mode spatializes.
    pub fn is_3d(self) -> bool {
        !matches!(self, Self::Flat)
    }

    /// Engine mode bits for the dimension and reference frame groups.
    pub fn mode_bits(self) -> Mode {
        match self {
            Self::Flat => Mode::MODE_2D,
            Self::World => Mode::MODE_3D | Mode::WORLD_RELATIVE_3D,
            Self::HeadRelative => Mode::MODE_3D | Mode::HEAD_RELATIVE_3D,
        }
    }
}

/// Spatialization a cached state calls for.
///
/// A listener-relative channel at the origin with no motion and a full
/// cone sounds the same in 2D, so it stays flat.
pub fn derive_spatial_mode(state: &DesiredState) -> SpatialMode {
    if !state.effective_3d {
        return SpatialMode::Flat;
    }
    if !state.relative {
        return SpatialMode::World;
    }
    let directional = state.cone_inner < FULL_CONE || state.cone_outer < FULL_CONE;
    if state.position != Vec3::ZERO || state.velocity != Vec3::ZERO || directional {
        SpatialMode::HeadRelative
    } else {
        SpatialMode::Flat
    }
}

/// One engine call on a voice, in engine units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceOp {
    /// Seek to a frame
    Position(u32),
    /// Set priority
    Priority(i32),
    /// Toggle the loop bits
    Looping(bool),
    /// Set pitch
    Pitch(f32),
    /// Set volume
    Volume(f32),
    /// Set the spatial mode
    Mode(SpatialMode),
    /// Set min and max distance in meters
    MinMaxDistance(f32, f32),
    /// Set position and velocity in meters
    Attributes {
        /// Position
        position: Vec3,
        /// Velocity
        velocity: Vec3,
    },
    /// Set cone angles, keeping the engine's outside volume
    Cone {
        /// Inner angle
        inside: f32,
        /// Outer angle
        outside: f32,
    },
    /// Set the doppler level
    DopplerLevel(f32),
}

impl VoiceOp {
    /// Engine call name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position(_) => "set_position",
            Self::Priority(_) => "set_priority",
            Self::Looping(_) => "set_looping",
            Self::Pitch(_) => "set_pitch",
            Self::Volume(_) => "set_volume",
            Self::Mode(_) => "set_mode",
            Self::MinMaxDistance(..) => "set_3d_min_max_distance",
            Self::Attributes { .. } => "set_3d_attributes",
            Self::Cone { .. } => "set_3d_cone_settings",
            Self::DopplerLevel(_) => "set_3d_doppler_level",
        }
    }

    /// Whether the op only applies to 3D voices.
    pub fn needs_3d(&self) -> bool {
        matches!(
            self,
            Self::MinMaxDistance(..)
                | Self::Attributes { .. }
                | Self::Cone { .. }
                | Self::DopplerLevel(_)
        )
    }
}

impl DesiredState {
    /// Distance range in engine units. Infinite maximum becomes `f32::MAX`.
    pub fn engine_distance_range(&self, units: &UnitScale) -> (f32, f32) {
        let max = if self.max_distance.is_infinite() {
            f32::MAX
        } else {
            units.to_audio_distance(self.max_distance.max(0.0))
        };
        let min = units.to_audio_distance(self.reference_distance.max(0.0)).min(max);
        (min, max)
    }

    /// Ops restoring everything the engine resets when 3D is enabled.
    pub fn spatial_ops(&self, units: &UnitScale) -> Vec<VoiceOp> {
        let (min, max) = self.engine_distance_range(units);
        let outside = self.cone_outer.clamp(0.0, FULL_CONE);
        vec![
            VoiceOp::MinMaxDistance(min, max),
            VoiceOp::Attributes {
                position: units.to_audio_position(self.position),
                velocity: units.to_audio_position(self.velocity),
            },
            VoiceOp::Cone {
                inside: self.cone_inner.clamp(0.0, outside),
                outside,
            },
            VoiceOp::DopplerLevel(self.doppler_factor.clamp(0.0, MAX_DOPPLER_LEVEL)),
        ]
    }

    /// Ops replaying the whole cache onto a fresh voice.
    pub fn replay_ops(&self, units: &UnitScale) -> Vec<VoiceOp> {
        let mode = derive_spatial_mode(self);
        let mut ops = vec![
            VoiceOp::Position(self.frame_offset),
            VoiceOp::Priority(self.priority.min(MAX_PRIORITY) as i32),
            VoiceOp::Looping(self.looping),
            VoiceOp::Pitch(self.pitch.max(0.0)),
            VoiceOp::Volume(self.gain),
            VoiceOp::Mode(mode),
        ];
        if mode.is_3d() {
            ops.extend(self.spatial_ops(units));
        }
        ops
    }
}

/// Performs one op against the engine.
pub fn apply_op<E: Engine>(engine: &mut E, voice: VoiceId, op: &VoiceOp) -> EngineResult<()> {
    match *op {
        VoiceOp::Position(frame) => engine.set_position(voice, frame),
        VoiceOp::Priority(priority) => engine.set_priority(voice, priority),
        VoiceOp::Looping(looping) => {
            let mode = engine.mode(voice)?;
            engine.set_mode(voice, mode.with_looping(looping))
        },
        VoiceOp::Pitch(pitch) => engine.set_pitch(voice, pitch),
        VoiceOp::Volume(volume) => engine.set_volume(voice, volume),
        VoiceOp::Mode(mode) => engine.set_mode(voice, mode.mode_bits()),
        VoiceOp::MinMaxDistance(min, max) => engine.set_3d_min_max_distance(voice, min, max),
        VoiceOp::Attributes { position, velocity } => {
            engine.set_3d_attributes(voice, Some(position), Some(velocity))
        },
        VoiceOp::Cone { inside, outside } => {
            let current = engine.cone_settings_3d(voice)?;
            engine.set_3d_cone_settings(
                voice,
                ConeSettings {
                    inside_angle: inside,
                    outside_angle: outside,
                    outside_volume: current.outside_volume,
                },
            )
        },
        VoiceOp::DopplerLevel(level) => engine.set_3d_doppler_level(voice, level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn relative_state() -> DesiredState {
        DesiredState {
            relative: true,
            ..DesiredState::default()
        }
    }

    #[test]
    fn test_relative_at_origin_is_flat() {
        assert_eq!(derive_spatial_mode(&relative_state()), SpatialMode::Flat);
    }

    #[test]
    fn test_relative_with_narrow_cone_is_3d() {
        let state = DesiredState {
            cone_inner: 90.0,
            ..relative_state()
        };
        assert_eq!(derive_spatial_mode(&state), SpatialMode::HeadRelative);
    }

    #[test]
    fn test_relative_with_offset_or_motion_is_3d() {
        let moved = DesiredState {
            position: Vec3::new(0.0, 0.0, 1.0),
            ..relative_state()
        };
        assert_eq!(derive_spatial_mode(&moved), SpatialMode::HeadRelative);

        let moving = DesiredState {
            velocity: Vec3::X,
            ..relative_state()
        };
        assert_eq!(derive_spatial_mode(&moving), SpatialMode::HeadRelative);
    }

    #[test]
    fn test_world_and_disabled() {
        assert_eq!(derive_spatial_mode(&DesiredState::default()), SpatialMode::World);
        let flat = DesiredState {
            effective_3d: false,
            ..DesiredState::default()
        };
        assert_eq!(derive_spatial_mode(&flat), SpatialMode::Flat);
    }

    #[test]
    fn test_replay_order() {
        let units = UnitScale::default();
        let names: Vec<_> = DesiredState::default()
            .replay_ops(&units)
            .iter()
            .map(VoiceOp::name)
            .collect();
        assert_eq!(
            names,
            [
                "set_position",
                "set_priority",
                "set_looping",
                "set_pitch",
                "set_volume",
                "set_mode",
                "set_3d_min_max_distance",
                "set_3d_attributes",
                "set_3d_cone_settings",
                "set_3d_doppler_level",
            ]
        );

        let flat = relative_state().replay_ops(&units);
        assert_eq!(flat.len(), 6);
        assert!(flat.iter().all(|op| !op.needs_3d()));
    }

    #[test]
    fn test_distance_range_conversion() {
        let units = UnitScale::new(0.5);
        let state = DesiredState {
            reference_distance: 4.0,
            max_distance: 10.0,
            ..DesiredState::default()
        };
        assert_eq!(state.engine_distance_range(&units), (2.0, 5.0));

        let unbounded = DesiredState {
            max_distance: f32::INFINITY,
            ..DesiredState::default()
        };
        assert_eq!(unbounded.engine_distance_range(&units).1, f32::MAX);
    }

    #[test]
    fn test_cone_inner_clamped_to_outer() {
        let state = DesiredState {
            cone_inner: 200.0,
            cone_outer: 90.0,
            ..DesiredState::default()
        };
        let cone = state
            .spatial_ops(&UnitScale::default())
            .into_iter()
            .find(|op| matches!(op, VoiceOp::Cone { .. }));
        assert_eq!(
            cone,
            Some(VoiceOp::Cone {
                inside: 90.0,
                outside: 90.0
            })
        );
    }

    proptest! {
        #[test]
        fn test_non_relative_effective_is_always_world(
            x in -100.0f32..100.0,
            inner in 0.0f32..360.0,
            outer in 0.0f32..360.0,
        ) {
            let state = DesiredState {
                position: Vec3::new(x, 0.0, 0.0),
                cone_inner: inner,
                cone_outer: outer,
                ..DesiredState::default()
            };
            prop_assert_eq!(derive_spatial_mode(&state), SpatialMode::World);
        }

        #[test]
        fn test_spatial_ops_only_when_3d(relative: bool, effective: bool, z in -5.0f32..5.0) {
            let state = DesiredState {
                relative,
                effective_3d: effective,
                position: Vec3::new(0.0, 0.0, z),
                ..DesiredState::default()
            };
            let ops = state.replay_ops(&UnitScale::default());
            let has_spatial = ops.iter().any(VoiceOp::needs_3d);
            prop_assert_eq!(has_spatial, derive_spatial_mode(&state).is_3d());
        }
    }
}
