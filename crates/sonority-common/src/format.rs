//! Sample formats, channel layouts and distance models.

use serde::{Deserialize, Serialize};

/// Channel layout of a buffer as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelConfig {
    /// Single channel
    Mono,
    /// Two or more channels
    Stereo,
}

impl ChannelConfig {
    /// Layout for a raw channel count. Anything with two or more channels is stereo.
    #[must_use]
    pub fn from_channel_count(channels: u32) -> Self {
        if channels >= 2 {
            Self::Stereo
        } else {
            Self::Mono
        }
    }

    /// Number of interleaved channels the layout carries.
    #[must_use]
    pub fn channel_count(self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Sample representation exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    /// Unsigned 8-bit
    UInt8,
    /// Signed 16-bit
    Int16,
    /// 32-bit float
    Float32,
}

impl SampleType {
    /// Size of a single sample in bytes.
    #[must_use]
    pub fn bytes_per_sample(self) -> u32 {
        match self {
            Self::UInt8 => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
        }
    }
}

/// Distance attenuation models. Stored by sessions, not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistanceModel {
    /// No attenuation
    None,
    /// Inverse distance
    Inverse,
    /// Inverse distance clamped to the reference range
    #[default]
    InverseClamped,
    /// Linear falloff
    Linear,
    /// Linear falloff clamped to the reference range
    LinearClamped,
    /// Exponential falloff
    Exponent,
    /// Exponential falloff clamped to the reference range
    ExponentClamped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_from_count() {
        assert_eq!(ChannelConfig::from_channel_count(0), ChannelConfig::Mono);
        assert_eq!(ChannelConfig::from_channel_count(1), ChannelConfig::Mono);
        assert_eq!(ChannelConfig::from_channel_count(2), ChannelConfig::Stereo);
        assert_eq!(ChannelConfig::from_channel_count(6), ChannelConfig::Stereo);
    }

    #[test]
    fn test_default_distance_model() {
        assert_eq!(DistanceModel::default(), DistanceModel::InverseClamped);
    }
}
