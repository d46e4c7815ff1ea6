//! Backend configuration.
//!
//! Engine session parameters and the error policy, loaded from a TOML file.
//! Missing or malformed files fall back to defaults.

use crate::policy::ErrorPolicy;
use serde::{Deserialize, Serialize};
use sonority_engine::SpeakerMode;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Speaker layout names accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerLayout {
    /// Stereo
    Stereo,
    /// Quad
    Quad,
    /// 5.1 surround
    #[default]
    Surround51,
    /// 7.1 surround
    Surround71,
}

impl From<SpeakerLayout> for SpeakerMode {
    fn from(layout: SpeakerLayout) -> Self {
        match layout {
            SpeakerLayout::Stereo => Self::Stereo,
            SpeakerLayout::Quad => Self::Quad,
            SpeakerLayout::Surround51 => Self::Surround51,
            SpeakerLayout::Surround71 => Self::Surround71,
        }
    }
}

/// Backend configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    // === Engine Session ===
    /// Maximum simultaneous voices
    pub max_channels: u32,
    /// Mixer sample rate in Hz (0 = engine default)
    pub sample_rate: u32,
    /// Output speaker layout
    pub speaker_mode: SpeakerLayout,

    // === 3D ===
    /// Global doppler scale
    pub doppler_scale: f32,
    /// Engine units per meter
    pub distance_factor: f32,
    /// Global rolloff scale
    pub rolloff_scale: f32,

    // === Behavior ===
    /// How engine call failures reach the host
    pub error_policy: ErrorPolicy,
    /// Open sounds asynchronously unless the host asks otherwise
    pub async_loading: bool,
    /// Render to the default output device
    pub output_device: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_channels: 1024,
            sample_rate: 0,
            speaker_mode: SpeakerLayout::Surround51,

            doppler_scale: 1.0,
            distance_factor: 1.0,
            rolloff_scale: 1.0,

            error_policy: ErrorPolicy::LogOnly,
            async_loading: false,
            output_device: false,
        }
    }
}

impl BackendConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Backend config not found at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read backend config: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        config.validate();
                        info!("Loaded backend config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse backend config: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open backend config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved backend config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.max_channels = self.max_channels.clamp(1, 4095);
        if self.sample_rate != 0 {
            self.sample_rate = self.sample_rate.clamp(8_000, 192_000);
        }

        self.doppler_scale = self.doppler_scale.clamp(0.0, 10.0);
        self.distance_factor = self.distance_factor.clamp(0.001, 1000.0);
        self.rolloff_scale = self.rolloff_scale.clamp(0.0, 10.0);
    }
}
