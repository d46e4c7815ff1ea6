//! Sound-system session.
//!
//! Owns the engine session and caches buffers by normalized path. Every
//! buffer path has a mono slot and a stereo slot: a buffer goes to the mono
//! slot when its data is mono or mono conversion was requested.

use crate::buffer::BackendBuffer;
use crate::channel::BackendChannel;
use crate::config::BackendConfig;
use crate::effect::BackendEffect;
use crate::file_bridge::VfsBridge;
use crate::listener::BackendListener;
use ahash::AHashMap;
use parking_lot::Mutex;
use sonority_common::{
    normalize_path, ChannelConfig, DistanceModel, Listener, PAuxiliaryEffectSlot, PEffect,
    PSoundBuffer, PSoundChannel, SampleType, SoundChannel, SoundError, SoundResult, SoundSystem,
    UnitScale, UnsupportedFeature, Vfs,
};
use sonority_engine::{Engine, InitFlags, Mode, OpenState};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Default speed of sound in meters per second.
pub const DEFAULT_SPEED_OF_SOUND: f32 = 343.3;

/// Host features this backend answers with defaults.
pub const UNSUPPORTED: &[UnsupportedFeature] = &[
    UnsupportedFeature::Hrtf,
    UnsupportedFeature::AuxiliaryEffectSlots,
    UnsupportedFeature::DistanceModel,
    UnsupportedFeature::DopplerFactor,
    UnsupportedFeature::SpeedOfSound,
    UnsupportedFeature::DeviceSelection,
    UnsupportedFeature::DeviceDsp,
];

type BufferRef<E> = Arc<BackendBuffer<E>>;

struct BufferSlots<E: Engine> {
    mono: Option<BufferRef<E>>,
    stereo: Option<BufferRef<E>>,
}

impl<E: Engine> Default for BufferSlots<E> {
    fn default() -> Self {
        Self {
            mono: None,
            stereo: None,
        }
    }
}

/// Whether a cached buffer may be handed out again. Failed opens are
/// retried instead.
fn is_reusable<E: Engine>(buffer: &BufferRef<E>) -> bool {
    !matches!(buffer.open_state(), Ok(OpenState::Error) | Err(_))
}

impl<E: Engine> BufferSlots<E> {
    fn lookup(&self, convert_to_mono: bool) -> Option<&BufferRef<E>> {
        let found = if convert_to_mono {
            self.mono.as_ref()
        } else {
            self.stereo.as_ref().or_else(|| {
                self.mono.as_ref().filter(|buffer| {
                    buffer.native_channel_config() == Some(ChannelConfig::Mono)
                })
            })
        };
        found.filter(|buffer| is_reusable(buffer))
    }

    fn store(&mut self, buffer: BufferRef<E>, convert_to_mono: bool) {
        let mono = convert_to_mono || buffer.native_channel_config() == Some(ChannelConfig::Mono);
        if mono {
            self.mono = Some(buffer);
        } else {
            self.stereo = Some(buffer);
        }
    }

    /// Drops buffers only the cache holds. Returns the dropped buffers so
    /// the caller controls when they are released.
    fn take_unused(&mut self) -> Vec<BufferRef<E>> {
        let mut unused = Vec::new();
        for slot in [&mut self.mono, &mut self.stereo] {
            if slot.as_ref().is_some_and(|b| Arc::strong_count(b) == 1) {
                unused.extend(slot.take());
            }
        }
        unused
    }

    fn is_empty(&self) -> bool {
        self.mono.is_none() && self.stereo.is_none()
    }
}

/// Session over one engine instance.
pub struct BackendSystem<E: Engine> {
    engine: Arc<Mutex<E>>,
    config: BackendConfig,
    units: UnitScale,
    buffers: AHashMap<String, BufferSlots<E>>,
    channels: Vec<Weak<Mutex<BackendChannel<E>>>>,
    listener: Option<BackendListener<E>>,
    doppler_factor: f32,
    speed_of_sound: f32,
    distance_model: DistanceModel,
}

impl<E: Engine> BackendSystem<E> {
    /// Brings up an engine session.
    ///
    /// The engine must be fresh: the mixer format can only be set before
    /// initialization.
    pub fn create(
        mut engine: E,
        vfs: Arc<dyn Vfs>,
        device_name: &str,
        meters_per_unit: f32,
        mut config: BackendConfig,
    ) -> SoundResult<Self> {
        config.validate();
        let init = |step: &str, e: sonority_engine::EngineError| {
            SoundError::Initialization(format!("{step}: {e}"))
        };

        engine
            .set_software_format(config.sample_rate, config.speaker_mode.into(), 0)
            .map_err(|e| init("set_software_format", e))?;
        engine
            .initialize(
                config.max_channels,
                InitFlags::RIGHT_HANDED_3D | InitFlags::VOL0_BECOMES_VIRTUAL,
            )
            .map_err(|e| init("initialize", e))?;
        engine
            .set_file_system(Arc::new(VfsBridge::new(vfs)))
            .map_err(|e| init("set_file_system", e))?;
        engine
            .set_3d_settings(
                config.doppler_scale,
                config.distance_factor,
                config.rolloff_scale,
            )
            .map_err(|e| init("set_3d_settings", e))?;

        info!(
            "Sound system up on {} ({} channels, {:?})",
            engine.name(),
            config.max_channels,
            config.speaker_mode
        );
        if !device_name.is_empty() {
            debug!("Device selection is not supported, ignoring '{device_name}'");
        }

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            config,
            units: UnitScale::new(meters_per_unit),
            buffers: AHashMap::new(),
            channels: Vec::new(),
            listener: None,
            doppler_factor: 1.0,
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
            distance_model: DistanceModel::default(),
        })
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<Mutex<E>> {
        &self.engine
    }

    /// Active configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Number of cached buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .values()
            .map(|slots| usize::from(slots.mono.is_some()) + usize::from(slots.stereo.is_some()))
            .sum()
    }

    /// Number of channels still registered for updates.
    pub fn channel_count(&self) -> usize {
        self.channels.iter().filter(|c| c.strong_count() > 0).count()
    }

    /// Builds an unregistered channel for a buffer of this session.
    ///
    /// Returns `None` for buffers from another backend.
    pub fn backend_channel(&self, buffer: &PSoundBuffer) -> Option<BackendChannel<E>> {
        let buffer = Arc::clone(buffer)
            .into_any()
            .downcast::<BackendBuffer<E>>()
            .ok()?;
        Some(BackendChannel::new(
            Arc::clone(&self.engine),
            buffer,
            self.units,
            self.config.error_policy,
        ))
    }

    fn open(
        &self,
        path: &str,
        convert_to_mono: bool,
        load_async: bool,
    ) -> SoundResult<BufferRef<E>> {
        let mut mode = Mode::DEFAULT;
        if load_async || self.config.async_loading {
            mode |= Mode::NONBLOCKING;
        }

        let created = self.engine.lock().create_sound(path, mode);
        let sound = created.map_err(|e| SoundError::LoadFailed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        debug!("Loaded '{path}' as {sound}");

        Ok(BackendBuffer::new(
            Arc::clone(&self.engine),
            sound,
            path.to_string(),
            convert_to_mono,
            self.config.error_policy,
        ))
    }
}

impl<E: Engine> SoundSystem for BackendSystem<E> {
    fn update(&mut self) {
        let result = self.engine.lock().update();
        if let Err(e) = result {
            warn!("Engine update failed: {e}");
        }

        self.channels.retain(|channel| {
            let Some(channel) = channel.upgrade() else {
                return false;
            };
            // a channel locked by the host is skipped this tick
            if let Some(mut channel) = channel.try_lock() {
                channel.update();
            }
            true
        });
    }

    fn load_sound(
        &mut self,
        path: &str,
        convert_to_mono: bool,
        load_async: bool,
    ) -> SoundResult<PSoundBuffer> {
        let key = normalize_path(path);
        if let Some(buffer) = self
            .buffers
            .get(&key)
            .and_then(|slots| slots.lookup(convert_to_mono))
        {
            return Ok(Arc::clone(buffer) as PSoundBuffer);
        }

        let buffer = self.open(&key, convert_to_mono, load_async)?;
        self.buffers
            .entry(key)
            .or_insert_with(BufferSlots::default)
            .store(Arc::clone(&buffer), convert_to_mono);
        Ok(buffer)
    }

    fn create_channel(&mut self, buffer: &PSoundBuffer) -> Option<PSoundChannel> {
        let Some(channel) = self.backend_channel(buffer) else {
            warn!("Buffer '{}' belongs to another backend", buffer.name());
            return None;
        };
        let channel = Arc::new(Mutex::new(channel));
        self.channels.push(Arc::downgrade(&channel));
        Some(channel)
    }

    fn create_effect(&mut self) -> Option<PEffect> {
        let effect = BackendEffect::new(Arc::clone(&self.engine), self.config.error_policy);
        Some(Arc::new(Mutex::new(effect)))
    }

    fn clear_unused_buffers(&mut self) -> usize {
        let mut released = Vec::new();
        self.buffers.retain(|_, slots| {
            released.extend(slots.take_unused());
            !slots.is_empty()
        });
        let count = released.len();
        drop(released);
        if count > 0 {
            debug!("Cleared {count} unused buffers");
        }
        count
    }

    fn listener(&mut self) -> &mut dyn Listener {
        let engine = &self.engine;
        let units = self.units;
        let policy = self.config.error_policy;
        self.listener
            .get_or_insert_with(|| BackendListener::new(Arc::clone(engine), units, policy))
    }

    fn set_meters_per_unit(&mut self, meters_per_unit: f32) {
        self.units = UnitScale::new(meters_per_unit);
        if let Some(listener) = &mut self.listener {
            listener.set_meters_per_unit(meters_per_unit);
        }
        for channel in self.channels.iter().filter_map(Weak::upgrade) {
            if let Err(e) = channel.lock().set_units(self.units) {
                warn!("Failed to rescale channel: {e}");
            }
        }
    }

    fn meters_per_unit(&self) -> f32 {
        self.units.meters_per_unit()
    }

    fn is_supported(&self, _channels: ChannelConfig, _sample_type: SampleType) -> bool {
        true
    }

    fn set_doppler_factor(&mut self, factor: f32) {
        debug!("Global doppler factor is stored only");
        self.doppler_factor = factor;
    }

    fn doppler_factor(&self) -> f32 {
        self.doppler_factor
    }

    fn set_speed_of_sound(&mut self, speed: f32) {
        debug!("Speed of sound is stored only");
        self.speed_of_sound = speed;
    }

    fn speed_of_sound(&self) -> f32 {
        self.speed_of_sound
    }

    fn set_distance_model(&mut self, model: DistanceModel) {
        debug!("Distance model is stored only");
        self.distance_model = model;
    }

    fn distance_model(&self) -> DistanceModel {
        self.distance_model
    }

    fn device_name(&self) -> String {
        String::new()
    }

    fn devices(&self) -> Vec<String> {
        vec![self.engine.lock().name().to_string()]
    }

    fn default_device_name(&self) -> String {
        self.engine.lock().name().to_string()
    }

    fn pause_device_dsp(&mut self) {
        debug!("Device DSP control is not supported");
    }

    fn resume_device_dsp(&mut self) {
        debug!("Device DSP control is not supported");
    }

    fn max_auxiliary_effects_per_source(&self) -> u32 {
        0
    }

    fn create_auxiliary_effect_slot(&mut self) -> Option<PAuxiliaryEffectSlot> {
        debug!("Auxiliary effect slots are not supported");
        None
    }

    fn hrtf_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn current_hrtf(&self) -> String {
        String::new()
    }

    fn is_hrtf_enabled(&self) -> bool {
        false
    }

    fn set_hrtf(&mut self, id: u32) {
        debug!("HRTF is not supported, ignoring profile {id}");
    }

    fn disable_hrtf(&mut self) {
        debug!("HRTF is not supported");
    }

    fn unsupported_features(&self) -> &[UnsupportedFeature] {
        UNSUPPORTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session, session_with, tick};
    use sonority_common::{ChannelState, MemoryVfs, SoundBuffer};
    use sonority_engine::testing::wav_bytes;
    use sonority_engine::{EngineSettings, HeadlessEngine, SpeakerMode};
    use std::time::Duration;

    fn mono() -> Vec<u8> {
        wav_bytes(1, 8_000, 16, false, 800)
    }

    fn stereo() -> Vec<u8> {
        wav_bytes(2, 8_000, 16, false, 800)
    }

    #[test]
    fn test_create_configures_engine() {
        let config = BackendConfig {
            max_channels: 32,
            sample_rate: 44_100,
            doppler_scale: 2.0,
            ..BackendConfig::default()
        };
        let system = session_with(&[], config);
        let engine = system.engine().lock();

        assert_eq!(engine.software_format(), (44_100, SpeakerMode::Surround51));
        assert_eq!(
            engine.init_flags(),
            InitFlags::RIGHT_HANDED_3D | InitFlags::VOL0_BECOMES_VIRTUAL
        );
        assert_eq!(engine.settings_3d(), (2.0, 1.0, 1.0));
    }

    #[test]
    fn test_create_failure_is_initialization_error() {
        let mut engine = HeadlessEngine::new(EngineSettings::manual());
        engine
            .initialize(4, InitFlags::empty())
            .expect("pre-initialized");

        let result = BackendSystem::create(
            engine,
            Arc::new(MemoryVfs::new()),
            "",
            1.0,
            BackendConfig::default(),
        );
        assert!(matches!(result, Err(SoundError::Initialization(_))));
    }

    #[test]
    fn test_cache_dedups_normalized_paths() {
        let mut system = session(&[("sounds/step.wav", mono())]);
        let a = system.load_sound("Sounds\\Step.wav", false, false).expect("load");
        let b = system.load_sound("./sounds//step.wav", false, false).expect("load");

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(system.buffer_count(), 1);
        assert_eq!(system.engine().lock().sound_count(), 1);
    }

    #[test]
    fn test_mono_buffer_serves_both_requests() {
        let mut system = session(&[("m.wav", mono())]);
        let stereo_request = system.load_sound("m.wav", false, false).expect("load");
        let mono_request = system.load_sound("m.wav", true, false).expect("load");
        assert!(Arc::ptr_eq(&stereo_request, &mono_request));
    }

    #[test]
    fn test_stereo_and_converted_buffers_are_separate() {
        let mut system = session(&[("s.wav", stereo())]);
        let converted = system.load_sound("s.wav", true, false).expect("load");
        assert_eq!(converted.target_channel_config(), ChannelConfig::Mono);

        // a converted buffer never serves a stereo request
        let native = system.load_sound("s.wav", false, false).expect("load");
        assert!(!Arc::ptr_eq(&converted, &native));
        assert_eq!(native.target_channel_config(), ChannelConfig::Stereo);

        let again = system.load_sound("s.wav", false, false).expect("load");
        assert!(Arc::ptr_eq(&native, &again));
        assert_eq!(system.buffer_count(), 2);
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let mut system = session(&[]);
        let result = system.load_sound("nope.wav", false, false);
        assert!(matches!(result, Err(SoundError::LoadFailed { .. })));
        assert_eq!(system.buffer_count(), 0);
    }

    #[test]
    fn test_async_config_forces_nonblocking() {
        let config = BackendConfig {
            async_loading: true,
            ..BackendConfig::default()
        };
        let mut system = session_with(&[("m.wav", mono())], config);
        let buffer = system.load_sound("m.wav", false, false).expect("load");
        assert!(!buffer.is_ready());

        system.update();
        assert!(buffer.is_ready());
    }

    #[test]
    fn test_async_missing_file_errors_later() {
        let mut system = session(&[]);
        let buffer = system.load_sound("late.wav", false, true).expect("deferred");
        system.update();
        assert!(!buffer.is_ready());
        assert_eq!(buffer.length(), 0);
    }

    #[test]
    fn test_failed_load_is_not_served_from_cache() {
        let mut system = session(&[]);
        let failed = system.load_sound("late.wav", false, true).expect("deferred");
        system.update();
        assert!(!failed.is_ready());

        // a blocking retry opens the file again and reports the failure
        let err = system.load_sound("late.wav", false, false).err().expect("still missing");
        assert!(matches!(err, SoundError::LoadFailed { .. }));

        let retried = system.load_sound("late.wav", false, true).expect("deferred again");
        assert_eq!(system.buffer_count(), 1);
        drop(failed);
        system.update();
        assert!(!retried.is_ready());
    }

    #[test]
    fn test_create_channel_rejects_foreign_buffers() {
        struct Foreign;
        impl SoundBuffer for Foreign {
            fn is_ready(&self) -> bool {
                true
            }
            fn length(&self) -> u32 {
                0
            }
            fn frequency(&self) -> u32 {
                0
            }
            fn channel_config(&self) -> ChannelConfig {
                ChannelConfig::Mono
            }
            fn target_channel_config(&self) -> ChannelConfig {
                ChannelConfig::Mono
            }
            fn sample_type(&self) -> SoundResult<SampleType> {
                Ok(SampleType::Int16)
            }
            fn size(&self) -> u64 {
                0
            }
            fn set_loop_frame_points(&self, _start: u32, _end: u32) -> SoundResult<()> {
                Ok(())
            }
            fn set_loop_time_points(&self, _start: f32, _end: f32) -> SoundResult<()> {
                Ok(())
            }
            fn loop_frame_points(&self) -> (u32, u32) {
                (0, 0)
            }
            fn name(&self) -> &str {
                "foreign"
            }
            fn is_in_use(&self) -> bool {
                true
            }
            fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
                self
            }
        }

        let mut system = session(&[]);
        let foreign: PSoundBuffer = Arc::new(Foreign);
        assert!(system.create_channel(&foreign).is_none());
    }

    #[test]
    fn test_update_drives_registered_channels() {
        let mut system = session(&[("m.wav", mono())]);
        let buffer = system.load_sound("m.wav", false, true).expect("load");
        let channel = system.create_channel(&buffer).expect("channel");

        channel.lock().play().expect("scheduled");
        assert_eq!(system.channel_count(), 1);

        system.update();
        assert_eq!(channel.lock().state(), ChannelState::Playing);
        assert_eq!(system.engine().lock().active_voices(), 1);

        tick(&mut system, Duration::from_millis(50));
        assert_eq!(channel.lock().frame_offset(), 400);

        drop(channel);
        system.update();
        assert_eq!(system.channel_count(), 0);
        assert_eq!(system.engine().lock().active_voices(), 0);
    }

    #[test]
    fn test_clear_unused_buffers_keeps_held_ones() {
        let mut system = session(&[("a.wav", mono()), ("b.wav", stereo())]);
        let held = system.load_sound("a.wav", false, false).expect("load");
        let _ = system.load_sound("b.wav", false, false).expect("load");

        assert_eq!(system.clear_unused_buffers(), 1);
        assert_eq!(system.buffer_count(), 1);
        assert!(held.is_ready());
        assert_eq!(system.clear_unused_buffers(), 0);
    }

    #[test]
    fn test_channel_keeps_buffer_alive() {
        let mut system = session(&[("a.wav", mono())]);
        let buffer = system.load_sound("a.wav", false, false).expect("load");
        let channel = system.create_channel(&buffer).expect("channel");
        drop(buffer);

        assert_eq!(system.clear_unused_buffers(), 0);
        drop(channel);
        assert_eq!(system.clear_unused_buffers(), 1);
    }

    #[test]
    fn test_unsupported_contract() {
        let mut system = session(&[]);

        assert!(system.hrtf_names().is_empty());
        assert_eq!(system.current_hrtf(), "");
        system.set_hrtf(1);
        assert!(!system.is_hrtf_enabled());
        system.disable_hrtf();
        assert!(system.create_auxiliary_effect_slot().is_none());
        assert_eq!(system.max_auxiliary_effects_per_source(), 0);
        assert_eq!(system.device_name(), "");
        assert_eq!(system.devices(), vec!["Headless".to_string()]);
        assert_eq!(system.default_device_name(), "Headless");
        system.pause_device_dsp();
        system.resume_device_dsp();
        assert!(system.is_supported(ChannelConfig::Stereo, SampleType::UInt8));

        system.set_doppler_factor(3.0);
        system.set_speed_of_sound(300.0);
        system.set_distance_model(DistanceModel::Linear);
        assert_eq!(system.doppler_factor(), 3.0);
        assert_eq!(system.speed_of_sound(), 300.0);
        assert_eq!(system.distance_model(), DistanceModel::Linear);

        assert!(system.unsupported_features().contains(&UnsupportedFeature::Hrtf));
    }

    #[test]
    fn test_meters_per_unit_reaches_channels() {
        let mut system = session(&[("m.wav", mono())]);
        let buffer = system.load_sound("m.wav", false, false).expect("load");
        let channel = system.create_channel(&buffer).expect("channel");
        {
            let mut channel = channel.lock();
            channel.set_position(sonority_common::Vec3::new(10.0, 0.0, 0.0)).expect("position");
            channel.play().expect("play");
        }

        system.set_meters_per_unit(0.1);
        assert!((system.meters_per_unit() - 0.1).abs() < f32::EPSILON);

        // the engine now holds 1 m, which reads back as the same 10 units
        let position = channel.lock().position();
        assert!((position.x - 10.0).abs() < 1e-3);
    }
}
