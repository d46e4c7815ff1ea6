//! # Sonority Engine
//!
//! The native audio-engine surface Sonority backends bind to.
//!
//! This crate provides:
//! - Generation-checked handle types for sounds, voices and DSP units
//! - Engine result codes
//! - Mode and initialization flags
//! - Open states, sample formats, 3D attribute and cone value types
//! - The `Engine` trait and the file-system callback traits
//! - `HeadlessEngine`, an in-process engine with virtual voices
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    HeadlessEngine                     │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │ Sound slots │──│ Voice slots  │──│  DSP slots  │  │
//! │  │ (probe)     │  │ (stealing)   │  │ (params)    │  │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  │
//! │         │                 │                          │
//! │         ▼                 ▼                          │
//! │    FileSystem      Output thread (rodio-output)      │
//! └──────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod engine;
pub mod error;
pub mod file;
pub mod handle;
pub mod headless;
pub mod mode;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use file::{FileStream, FileSystem, NativeFileSystem};
pub use handle::{DspId, SoundId, VoiceId};
pub use headless::{ClockMode, EngineSettings, HeadlessEngine, OutputMode};
pub use mode::{InitFlags, Mode};
pub use types::{
    Attributes3D, ConeSettings, DspType, OpenState, SoundFormat, SoundFormatInfo, SpeakerMode,
};
