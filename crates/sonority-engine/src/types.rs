//! Engine value types.

use glam::Vec3;

/// Open state of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenState {
    /// Fully opened
    Ready,
    /// Still opening asynchronously
    Loading,
    /// Opening failed
    Error,
    /// Connecting to a remote source
    Connecting,
    /// Buffering streamed data
    Buffering,
    /// Seeking
    Seeking,
    /// Streaming while playing
    Playing,
    /// Repositioning a stream
    SetPosition,
}

/// Decoded sample format of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundFormat {
    /// Unknown or not yet opened
    None,
    /// 8-bit integer PCM
    Pcm8,
    /// 16-bit integer PCM
    Pcm16,
    /// 24-bit integer PCM
    Pcm24,
    /// 32-bit integer PCM
    Pcm32,
    /// 32-bit float PCM
    PcmFloat,
    /// Compressed bitstream
    Bitstream,
}

/// Format details reported for an opened sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundFormatInfo {
    /// Sample format
    pub format: SoundFormat,
    /// Interleaved channel count
    pub channels: u32,
    /// Bits per sample
    pub bits: u32,
}

/// Output speaker layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpeakerMode {
    /// Whatever the device reports
    #[default]
    Default,
    /// Single speaker
    Mono,
    /// Two speakers
    Stereo,
    /// Four speakers
    Quad,
    /// Five speakers
    Surround,
    /// Five speakers and a subwoofer
    Surround51,
    /// Seven speakers and a subwoofer
    Surround71,
}

impl SpeakerMode {
    /// Number of output channels for the layout, 2 for `Default`.
    #[must_use]
    pub fn channels(self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Default | Self::Stereo => 2,
            Self::Quad => 4,
            Self::Surround => 5,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
        }
    }
}

/// Position, velocity and orientation of a listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes3D {
    /// Position in meters
    pub position: Vec3,
    /// Velocity in meters per second
    pub velocity: Vec3,
    /// Unit forward vector
    pub forward: Vec3,
    /// Unit up vector
    pub up: Vec3,
}

impl Default for Attributes3D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
        }
    }
}

/// Directional cone of a 3D voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeSettings {
    /// Full-volume cone in degrees
    pub inside_angle: f32,
    /// Attenuated cone in degrees
    pub outside_angle: f32,
    /// Volume outside the outer cone
    pub outside_volume: f32,
}

impl Default for ConeSettings {
    fn default() -> Self {
        Self {
            inside_angle: 360.0,
            outside_angle: 360.0,
            outside_volume: 1.0,
        }
    }
}

/// Chorus rate parameter index (Hz).
pub const CHORUS_RATE: usize = 1;
/// Chorus depth parameter index (percent).
pub const CHORUS_DEPTH: usize = 2;

/// Distortion level parameter index (0..1).
pub const DISTORTION_LEVEL: usize = 0;

/// Echo delay parameter index (milliseconds).
pub const ECHO_DELAY: usize = 0;
/// Echo feedback parameter index (percent).
pub const ECHO_FEEDBACK: usize = 1;

/// Flange depth parameter index.
pub const FLANGE_DEPTH: usize = 1;
/// Flange rate parameter index (Hz).
pub const FLANGE_RATE: usize = 2;

/// Range and default of one DSP parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DspParameter {
    /// Parameter name
    pub name: &'static str,
    /// Minimum value
    pub min: f32,
    /// Maximum value
    pub max: f32,
    /// Initial value
    pub default: f32,
}

const fn param(name: &'static str, min: f32, max: f32, default: f32) -> DspParameter {
    DspParameter {
        name,
        min,
        max,
        default,
    }
}

const CHORUS_PARAMS: [DspParameter; 3] = [
    param("mix", 0.0, 100.0, 50.0),
    param("rate", 0.0, 20.0, 0.8),
    param("depth", 0.0, 100.0, 3.0),
];

const DISTORTION_PARAMS: [DspParameter; 1] = [param("level", 0.0, 1.0, 0.5)];

const ECHO_PARAMS: [DspParameter; 4] = [
    param("delay", 1.0, 5000.0, 500.0),
    param("feedback", 0.0, 100.0, 50.0),
    param("dry level", -80.0, 10.0, 0.0),
    param("wet level", -80.0, 10.0, 0.0),
];

const FLANGE_PARAMS: [DspParameter; 3] = [
    param("mix", 0.0, 100.0, 50.0),
    param("depth", 0.01, 1.0, 1.0),
    param("rate", 0.0, 20.0, 0.1),
];

/// Built-in DSP unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DspType {
    /// Chorus
    Chorus,
    /// Distortion
    Distortion,
    /// Echo
    Echo,
    /// Flange
    Flange,
}

impl DspType {
    /// Parameter table of the unit.
    #[must_use]
    pub fn parameters(self) -> &'static [DspParameter] {
        match self {
            Self::Chorus => &CHORUS_PARAMS,
            Self::Distortion => &DISTORTION_PARAMS,
            Self::Echo => &ECHO_PARAMS,
            Self::Flange => &FLANGE_PARAMS,
        }
    }
}
