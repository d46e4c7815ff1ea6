//! Buffer adapter over engine sounds.

use crate::policy::ErrorPolicy;
use parking_lot::Mutex;
use sonority_common::{
    loop_frames_for_times, ChannelConfig, SampleType, SoundBuffer, SoundError, SoundResult,
};
use sonority_engine::{Engine, EngineResult, OpenState, SoundFormat, SoundId};
use std::any::Any;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Whether a sound in this open state can be queried and played.
pub fn is_ready_state(state: OpenState) -> bool {
    !matches!(
        state,
        OpenState::Loading | OpenState::Error | OpenState::Connecting
    )
}

/// A loaded engine sound shared by the session cache, channels and the host.
///
/// The engine sound is released when the last owner drops.
pub struct BackendBuffer<E: Engine> {
    engine: Arc<Mutex<E>>,
    sound: SoundId,
    name: String,
    convert_to_mono: bool,
    policy: ErrorPolicy,
    this: Weak<Self>,
}

impl<E: Engine> BackendBuffer<E> {
    pub(crate) fn new(
        engine: Arc<Mutex<E>>,
        sound: SoundId,
        name: String,
        convert_to_mono: bool,
        policy: ErrorPolicy,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            engine,
            sound,
            name,
            convert_to_mono,
            policy,
            this: this.clone(),
        })
    }

    /// The engine sound handle.
    pub fn sound_id(&self) -> SoundId {
        self.sound
    }

    /// Current open state as the engine reports it.
    pub fn open_state(&self) -> EngineResult<OpenState> {
        self.engine.lock().sound_open_state(self.sound)
    }

    /// Whether the sound is still opening.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.open_state(),
            Ok(OpenState::Loading | OpenState::Connecting)
        )
    }

    /// Layout of the decoded data, ignoring mono conversion.
    pub fn native_channel_config(&self) -> Option<ChannelConfig> {
        self.query(|e, s| e.sound_format(s))
            .map(|info| ChannelConfig::from_channel_count(info.channels))
    }

    fn query<T>(&self, call: impl FnOnce(&E, SoundId) -> EngineResult<T>) -> Option<T> {
        call(&self.engine.lock(), self.sound).ok()
    }
}

impl<E: Engine> SoundBuffer for BackendBuffer<E> {
    fn is_ready(&self) -> bool {
        self.open_state().map_or(false, is_ready_state)
    }

    fn length(&self) -> u32 {
        if !self.is_ready() {
            return 0;
        }
        self.query(|e, s| e.sound_length(s)).unwrap_or(0)
    }

    fn frequency(&self) -> u32 {
        self.query(|e, s| e.sound_defaults(s))
            .map_or(0, |(frequency, _)| frequency.max(0.0).round() as u32)
    }

    fn channel_config(&self) -> ChannelConfig {
        self.native_channel_config().unwrap_or(ChannelConfig::Mono)
    }

    fn target_channel_config(&self) -> ChannelConfig {
        if self.convert_to_mono {
            ChannelConfig::Mono
        } else {
            self.channel_config()
        }
    }

    fn sample_type(&self) -> SoundResult<SampleType> {
        let format = self.engine.lock().sound_format(self.sound);
        let info = format.map_err(|e| SoundError::engine("sound_format", e))?;
        match info.format {
            SoundFormat::Pcm8 => Ok(SampleType::UInt8),
            SoundFormat::Pcm16 => Ok(SampleType::Int16),
            SoundFormat::PcmFloat => Ok(SampleType::Float32),
            other => Err(SoundError::UnsupportedSampleFormat(format!(
                "{other:?} ({} bits) in '{}'",
                info.bits, self.name
            ))),
        }
    }

    fn size(&self) -> u64 {
        if !self.is_ready() {
            return 0;
        }
        let Some(info) = self.query(|e, s| e.sound_format(s)) else {
            return 0;
        };
        u64::from(self.length()) * u64::from(info.channels) * u64::from(info.bits / 8)
    }

    fn set_loop_frame_points(&self, start: u32, end: u32) -> SoundResult<()> {
        let result = self
            .engine
            .lock()
            .set_sound_loop_points(self.sound, start, end);
        match result {
            Ok(()) => {
                debug!("Loop points of '{}' set to {start}..={end}", self.name);
                Ok(())
            },
            Err(e) => self.policy.settle("set_sound_loop_points", &e),
        }
    }

    fn set_loop_time_points(&self, start: f32, end: f32) -> SoundResult<()> {
        let (start, end) = loop_frames_for_times(start, end, self.duration(), self.length());
        self.set_loop_frame_points(start, end)
    }

    fn loop_frame_points(&self) -> (u32, u32) {
        self.query(|e, s| e.sound_loop_points(s)).unwrap_or((0, 0))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_in_use(&self) -> bool {
        self.this.strong_count() > 1
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<E: Engine> Drop for BackendBuffer<E> {
    fn drop(&mut self) {
        let result = self.engine.lock().release_sound(self.sound);
        match result {
            Ok(()) => debug!("Released sound '{}'", self.name),
            Err(e) => warn!("Failed to release sound '{}': {e}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session, session_with};
    use crate::BackendConfig;
    use sonority_common::SoundSystem;
    use sonority_engine::testing::wav_bytes;

    #[test]
    fn test_ready_states() {
        assert!(!is_ready_state(OpenState::Loading));
        assert!(!is_ready_state(OpenState::Connecting));
        assert!(!is_ready_state(OpenState::Error));
        for state in [
            OpenState::Ready,
            OpenState::Buffering,
            OpenState::Seeking,
            OpenState::Playing,
            OpenState::SetPosition,
        ] {
            assert!(is_ready_state(state), "{state:?}");
        }
    }

    #[test]
    fn test_blocking_load_queries() {
        let mut system = session(&[("sfx/beep.wav", wav_bytes(2, 22_050, 16, false, 11_025))]);
        let buffer = system.load_sound("SFX/Beep.wav", false, false).expect("load");

        assert!(buffer.is_ready());
        assert_eq!(buffer.name(), "sfx/beep.wav");
        assert_eq!(buffer.length(), 11_025);
        assert_eq!(buffer.frequency(), 22_050);
        assert_eq!(buffer.channel_config(), ChannelConfig::Stereo);
        assert_eq!(buffer.target_channel_config(), ChannelConfig::Stereo);
        assert_eq!(buffer.sample_type().expect("sample type"), SampleType::Int16);
        assert_eq!(buffer.size(), 11_025 * 2 * 2);
        assert!((buffer.duration() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_sample_types() {
        let mut system = session(&[
            ("u8.wav", wav_bytes(1, 8_000, 8, false, 100)),
            ("f32.wav", wav_bytes(1, 8_000, 32, true, 100)),
            ("s24.wav", wav_bytes(1, 8_000, 24, false, 100)),
        ]);

        let u8_buffer = system.load_sound("u8.wav", false, false).expect("load");
        assert_eq!(u8_buffer.sample_type().expect("u8"), SampleType::UInt8);

        let float_buffer = system.load_sound("f32.wav", false, false).expect("load");
        assert_eq!(float_buffer.sample_type().expect("f32"), SampleType::Float32);

        let wide = system.load_sound("s24.wav", false, false).expect("load");
        assert!(matches!(
            wide.sample_type(),
            Err(SoundError::UnsupportedSampleFormat(_))
        ));
    }

    #[test]
    fn test_loading_buffer_is_neutral() {
        let mut system = session(&[("late.wav", wav_bytes(1, 44_100, 16, false, 4_410))]);
        let buffer = system.load_sound("late.wav", false, true).expect("load");

        assert!(!buffer.is_ready());
        assert_eq!(buffer.length(), 0);
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.duration(), 0.0);
        // default frequency is known before the data is
        assert_eq!(buffer.frequency(), 48_000);

        buffer.set_loop_time_points(0.0, 0.0).expect("log only");
        assert_eq!(buffer.loop_frame_points(), (0, 0));

        system.update();
        assert!(buffer.is_ready());
        assert_eq!(buffer.length(), 4_410);
    }

    #[test]
    fn test_loop_points() {
        let mut system = session(&[("loop.wav", wav_bytes(1, 1_000, 16, false, 1_000))]);
        let buffer = system.load_sound("loop.wav", false, false).expect("load");

        assert_eq!(buffer.loop_frame_points(), (0, 999));
        buffer.set_loop_time_points(0.25, 0.5).expect("time points");
        assert_eq!(buffer.loop_frame_points(), (250, 500));

        buffer.set_loop_frame_points(10, 20).expect("frame points");
        assert_eq!(buffer.loop_frame_points(), (10, 20));
    }

    #[test]
    fn test_bad_loop_points_follow_policy() {
        let files = [("loop.wav", wav_bytes(1, 1_000, 16, false, 1_000))];

        let mut lenient = session(&files);
        let buffer = lenient.load_sound("loop.wav", false, false).expect("load");
        assert!(buffer.set_loop_frame_points(500, 100).is_ok());
        assert_eq!(buffer.loop_frame_points(), (0, 999));

        let config = BackendConfig {
            error_policy: ErrorPolicy::Propagate,
            ..BackendConfig::default()
        };
        let mut strict = session_with(&files, config);
        let buffer = strict.load_sound("loop.wav", false, false).expect("load");
        assert!(matches!(
            buffer.set_loop_frame_points(500, 100),
            Err(SoundError::Engine { .. })
        ));
    }

    #[test]
    fn test_release_on_last_drop() {
        let mut system = session(&[("a.wav", wav_bytes(1, 8_000, 16, false, 10))]);
        let buffer = system.load_sound("a.wav", false, false).expect("load");
        assert!(buffer.is_in_use());
        assert_eq!(system.engine().lock().sound_count(), 1);

        drop(buffer);
        assert_eq!(system.clear_unused_buffers(), 1);
        assert_eq!(system.engine().lock().sound_count(), 0);
    }
}
