//! Effect property sets.
//!
//! Each struct carries the standard EFX parameter set for one effect type
//! with EFX default values. Backends map the subset they support onto
//! their own DSP units.

use crate::error::SoundResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Low frequency oscillator waveform shared by modulation effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Waveform {
    /// Sinusoid
    Sine,
    /// Triangle
    #[default]
    Triangle,
    /// Sawtooth
    Sawtooth,
    /// Square
    Square,
}

/// Frequency shifter direction per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShiftDirection {
    /// Shift down
    #[default]
    Down,
    /// Shift up
    Up,
    /// Pass through
    Off,
}

/// Extended reverb parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ReverbProperties {
    pub density: f32,
    pub diffusion: f32,
    pub gain: f32,
    pub gain_hf: f32,
    pub gain_lf: f32,
    pub decay_time: f32,
    pub decay_hf_ratio: f32,
    pub decay_lf_ratio: f32,
    pub reflections_gain: f32,
    pub reflections_delay: f32,
    pub reflections_pan: [f32; 3],
    pub late_reverb_gain: f32,
    pub late_reverb_delay: f32,
    pub late_reverb_pan: [f32; 3],
    pub echo_time: f32,
    pub echo_depth: f32,
    pub modulation_time: f32,
    pub modulation_depth: f32,
    pub air_absorption_gain_hf: f32,
    pub hf_reference: f32,
    pub lf_reference: f32,
    pub room_rolloff_factor: f32,
    pub decay_hf_limit: bool,
}

impl Default for ReverbProperties {
    fn default() -> Self {
        Self {
            density: 1.0,
            diffusion: 1.0,
            gain: 0.32,
            gain_hf: 0.89,
            gain_lf: 1.0,
            decay_time: 1.49,
            decay_hf_ratio: 0.83,
            decay_lf_ratio: 1.0,
            reflections_gain: 0.05,
            reflections_delay: 0.007,
            reflections_pan: [0.0; 3],
            late_reverb_gain: 1.26,
            late_reverb_delay: 0.011,
            late_reverb_pan: [0.0; 3],
            echo_time: 0.25,
            echo_depth: 0.0,
            modulation_time: 0.25,
            modulation_depth: 0.0,
            air_absorption_gain_hf: 0.994,
            hf_reference: 5000.0,
            lf_reference: 250.0,
            room_rolloff_factor: 0.0,
            decay_hf_limit: true,
        }
    }
}

/// Chorus parameters. Rate in Hz, depth 0..1, delay in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ChorusProperties {
    pub waveform: Waveform,
    pub phase: i32,
    pub rate: f32,
    pub depth: f32,
    pub feedback: f32,
    pub delay: f32,
}

impl Default for ChorusProperties {
    fn default() -> Self {
        Self {
            waveform: Waveform::Triangle,
            phase: 90,
            rate: 1.1,
            depth: 0.1,
            feedback: 0.25,
            delay: 0.016,
        }
    }
}

/// Distortion parameters. Gain 0.01..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DistortionProperties {
    pub edge: f32,
    pub gain: f32,
    pub lowpass_cutoff: f32,
    pub eq_center: f32,
    pub eq_bandwidth: f32,
}

impl Default for DistortionProperties {
    fn default() -> Self {
        Self {
            edge: 0.2,
            gain: 0.05,
            lowpass_cutoff: 8000.0,
            eq_center: 3600.0,
            eq_bandwidth: 3600.0,
        }
    }
}

/// Echo parameters. Delays in seconds, feedback 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct EchoProperties {
    pub delay: f32,
    pub lr_delay: f32,
    pub damping: f32,
    pub feedback: f32,
    pub spread: f32,
}

impl Default for EchoProperties {
    fn default() -> Self {
        Self {
            delay: 0.1,
            lr_delay: 0.1,
            damping: 0.5,
            feedback: 0.5,
            spread: -1.0,
        }
    }
}

/// Flanger parameters. Rate in Hz, depth 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct FlangerProperties {
    pub waveform: Waveform,
    pub phase: i32,
    pub rate: f32,
    pub depth: f32,
    pub feedback: f32,
    pub delay: f32,
}

impl Default for FlangerProperties {
    fn default() -> Self {
        Self {
            waveform: Waveform::Triangle,
            phase: 0,
            rate: 0.27,
            depth: 1.0,
            feedback: -0.5,
            delay: 0.002,
        }
    }
}

/// Frequency shifter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct FrequencyShifterProperties {
    pub frequency: f32,
    pub left_direction: ShiftDirection,
    pub right_direction: ShiftDirection,
}

/// Vocal morpher parameters. Phonemes are indices into the EFX phoneme table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct VocalMorpherProperties {
    pub phoneme_a: i32,
    pub phoneme_a_coarse_tuning: i32,
    pub phoneme_b: i32,
    pub phoneme_b_coarse_tuning: i32,
    pub waveform: Waveform,
    pub rate: f32,
}

impl Default for VocalMorpherProperties {
    fn default() -> Self {
        Self {
            phoneme_a: 0,
            phoneme_a_coarse_tuning: 0,
            phoneme_b: 10,
            phoneme_b_coarse_tuning: 0,
            waveform: Waveform::Sine,
            rate: 1.41,
        }
    }
}

/// Pitch shifter parameters in semitones and cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct PitchShifterProperties {
    pub coarse_tune: i32,
    pub fine_tune: i32,
}

impl Default for PitchShifterProperties {
    fn default() -> Self {
        Self {
            coarse_tune: 12,
            fine_tune: 0,
        }
    }
}

/// Ring modulator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct RingModulatorProperties {
    pub frequency: f32,
    pub highpass_cutoff: f32,
    pub waveform: Waveform,
}

impl Default for RingModulatorProperties {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            highpass_cutoff: 800.0,
            waveform: Waveform::Sine,
        }
    }
}

/// Auto-wah parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AutoWahProperties {
    pub attack_time: f32,
    pub release_time: f32,
    pub resonance: f32,
    pub peak_gain: f32,
}

impl Default for AutoWahProperties {
    fn default() -> Self {
        Self {
            attack_time: 0.06,
            release_time: 0.06,
            resonance: 1000.0,
            peak_gain: 11.22,
        }
    }
}

/// Compressor on/off switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CompressorProperties {
    pub enabled: bool,
}

impl Default for CompressorProperties {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Four band equalizer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct EqualizerProperties {
    pub low_gain: f32,
    pub low_cutoff: f32,
    pub mid1_gain: f32,
    pub mid1_center: f32,
    pub mid1_width: f32,
    pub mid2_gain: f32,
    pub mid2_center: f32,
    pub mid2_width: f32,
    pub high_gain: f32,
    pub high_cutoff: f32,
}

impl Default for EqualizerProperties {
    fn default() -> Self {
        Self {
            low_gain: 1.0,
            low_cutoff: 200.0,
            mid1_gain: 1.0,
            mid1_center: 500.0,
            mid1_width: 1.0,
            mid2_gain: 1.0,
            mid2_center: 3000.0,
            mid2_width: 1.0,
            high_gain: 1.0,
            high_cutoff: 6000.0,
        }
    }
}

/// Closed set of effect parameter variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum EffectProperties {
    Reverb(ReverbProperties),
    Chorus(ChorusProperties),
    Distortion(DistortionProperties),
    Echo(EchoProperties),
    Flanger(FlangerProperties),
    FrequencyShifter(FrequencyShifterProperties),
    VocalMorpher(VocalMorpherProperties),
    PitchShifter(PitchShifterProperties),
    RingModulator(RingModulatorProperties),
    AutoWah(AutoWahProperties),
    Compressor(CompressorProperties),
    Equalizer(EqualizerProperties),
}

impl EffectProperties {
    /// Variant name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reverb(_) => "reverb",
            Self::Chorus(_) => "chorus",
            Self::Distortion(_) => "distortion",
            Self::Echo(_) => "echo",
            Self::Flanger(_) => "flanger",
            Self::FrequencyShifter(_) => "frequency_shifter",
            Self::VocalMorpher(_) => "vocal_morpher",
            Self::PitchShifter(_) => "pitch_shifter",
            Self::RingModulator(_) => "ring_modulator",
            Self::AutoWah(_) => "auto_wah",
            Self::Compressor(_) => "compressor",
            Self::Equalizer(_) => "equalizer",
        }
    }
}

/// An effect whose parameters are supplied as one of [`EffectProperties`].
pub trait Effect: Send {
    /// Applies a property set.
    ///
    /// Returns `Ok(true)` when the backend realized the effect and `Ok(false)`
    /// when the variant is reserved and nothing was applied.
    fn set_properties(&mut self, props: EffectProperties) -> SoundResult<bool>;

    /// Last property set that was applied.
    fn properties(&self) -> Option<&EffectProperties>;

    /// Whether a DSP unit currently backs this effect.
    fn is_active(&self) -> bool;
}

/// Shared effect handle.
pub type PEffect = Arc<Mutex<dyn Effect>>;
