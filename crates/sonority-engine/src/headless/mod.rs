//! In-process engine with virtual voices.
//!
//! `HeadlessEngine` keeps the bookkeeping a real engine exposes through its
//! API: sound open states, voice slots with priority-based stealing, play
//! positions advanced by elapsed time, mode flags, 3D attribute storage and
//! DSP parameter storage. It does not mix. With the `rodio-output` feature
//! and [`OutputMode::Device`] voices are also rendered to the default
//! output device.

mod probe;
mod slots;

#[cfg(feature = "rodio-output")]
mod output;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::file::{read_all, FileSystem, NativeFileSystem};
use crate::handle::{DspId, SoundId, VoiceId};
use crate::mode::{InitFlags, Mode};
use crate::types::{
    Attributes3D, ConeSettings, DspType, OpenState, SoundFormatInfo, SpeakerMode,
};
use glam::Vec3;
use probe::ProbeInfo;
use slots::Slots;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Number of listener slots.
pub const MAX_LISTENERS: usize = 8;

/// Priority given to new sounds.
pub const DEFAULT_PRIORITY: i32 = 128;

/// Lowest priority value accepted (most important).
pub const MIN_PRIORITY: i32 = 0;

/// Highest priority value accepted (least important).
pub const MAX_PRIORITY: i32 = 256;

/// Default 3D minimum distance in meters.
pub const DEFAULT_MIN_DISTANCE: f32 = 1.0;

/// Default 3D maximum distance in meters.
pub const DEFAULT_MAX_DISTANCE: f32 = 10_000.0;

/// Mixer rate used when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// How elapsed time is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// Wall clock time between updates
    #[default]
    Realtime,
    /// Only time passed to [`HeadlessEngine::advance`]
    Manual,
}

/// Where voices are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Nowhere
    #[default]
    Silent,
    /// The default output device. Needs the `rodio-output` feature.
    Device,
}

/// Construction settings for [`HeadlessEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineSettings {
    /// Time source
    pub clock: ClockMode,
    /// Output target
    pub output: OutputMode,
}

impl EngineSettings {
    /// Settings for deterministic tests.
    #[must_use]
    pub const fn manual() -> Self {
        Self {
            clock: ClockMode::Manual,
            output: OutputMode::Silent,
        }
    }
}

enum Clock {
    Realtime(Option<Instant>),
    Manual(Duration),
}

impl Clock {
    fn new(mode: ClockMode) -> Self {
        match mode {
            ClockMode::Realtime => Self::Realtime(None),
            ClockMode::Manual => Self::Manual(Duration::ZERO),
        }
    }

    /// Time since the previous tick.
    fn tick(&mut self) -> Duration {
        match self {
            Self::Realtime(last) => {
                let now = Instant::now();
                let dt = last.map_or(Duration::ZERO, |prev| now.duration_since(prev));
                *last = Some(now);
                dt
            },
            Self::Manual(pending) => std::mem::take(pending),
        }
    }
}

struct SoundData {
    name: String,
    mode: Mode,
    state: OpenState,
    info: Option<ProbeInfo>,
    error: Option<EngineError>,
    bytes: Option<Arc<[u8]>>,
    loop_points: (u32, u32),
    frequency: f32,
    priority: i32,
}

impl SoundData {
    fn info(&self) -> EngineResult<&ProbeInfo> {
        match (&self.info, &self.error) {
            (Some(info), _) => Ok(info),
            (None, Some(err)) => Err(err.clone()),
            (None, None) => Err(EngineError::NotReady),
        }
    }
}

struct Voice {
    sound: SoundId,
    serial: u64,
    paused: bool,
    position: f64,
    length: u32,
    loop_points: (u32, u32),
    frequency: f32,
    priority: i32,
    mode: Mode,
    pitch: f32,
    volume: f32,
    min_distance: f32,
    max_distance: f32,
    position_3d: Vec3,
    velocity_3d: Vec3,
    cone: ConeSettings,
    doppler_level: f32,
}

impl Voice {
    fn reset_3d(&mut self) {
        self.min_distance = DEFAULT_MIN_DISTANCE;
        self.max_distance = DEFAULT_MAX_DISTANCE;
        self.position_3d = Vec3::ZERO;
        self.velocity_3d = Vec3::ZERO;
        self.cone = ConeSettings::default();
        self.doppler_level = 1.0;
    }

    fn require_3d(&self) -> EngineResult<()> {
        if self.mode.is_3d() {
            Ok(())
        } else {
            Err(EngineError::Needs3D)
        }
    }

    /// Moves the play cursor. Returns `false` once a one-shot voice ends.
    fn advance(&mut self, dt: Duration) -> bool {
        if self.paused || dt.is_zero() {
            return true;
        }
        let frames = dt.as_secs_f64() * f64::from(self.frequency) * f64::from(self.pitch.max(0.0));
        self.position += frames;

        let length = f64::from(self.length);
        if !self.mode.is_looping() {
            return self.position < length;
        }
        if self.length == 0 {
            self.position = 0.0;
            return true;
        }

        let start = f64::from(self.loop_points.0);
        let end = f64::from(self.loop_points.1);
        if self.position > end {
            let span = (end - start + 1.0).max(1.0);
            self.position = start + (self.position - start) % span;
        }
        true
    }
}

struct DspUnit {
    ty: DspType,
    params: Vec<f32>,
}

/// In-process engine with virtual voices.
pub struct HeadlessEngine {
    settings: EngineSettings,
    initialized: bool,
    init_flags: InitFlags,
    max_voices: usize,
    sample_rate: u32,
    speaker_mode: SpeakerMode,
    settings_3d: (f32, f32, f32),
    file_system: Arc<dyn FileSystem>,
    sounds: Slots<SoundData>,
    voices: Slots<Voice>,
    dsps: Slots<DspUnit>,
    listeners: [Attributes3D; MAX_LISTENERS],
    clock: Clock,
    next_serial: u64,
    #[cfg(feature = "rodio-output")]
    output: Option<output::OutputThread>,
}

impl std::fmt::Debug for HeadlessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessEngine")
            .field("initialized", &self.initialized)
            .field("max_voices", &self.max_voices)
            .field("sounds", &self.sounds.len())
            .field("voices", &self.voices.len())
            .field("dsps", &self.dsps.len())
            .finish_non_exhaustive()
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

#[cfg(feature = "rodio-output")]
fn voice_key(voice: VoiceId) -> output::VoiceKey {
    (u64::from(voice.index()) << 32) | u64::from(voice.generation())
}

impl HeadlessEngine {
    /// Creates an uninitialized engine.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            initialized: false,
            init_flags: InitFlags::empty(),
            max_voices: 0,
            sample_rate: 0,
            speaker_mode: SpeakerMode::Default,
            settings_3d: (1.0, 1.0, 1.0),
            file_system: Arc::new(NativeFileSystem::default()),
            sounds: Slots::default(),
            voices: Slots::default(),
            dsps: Slots::default(),
            listeners: [Attributes3D::default(); MAX_LISTENERS],
            clock: Clock::new(settings.clock),
            next_serial: 0,
            #[cfg(feature = "rodio-output")]
            output: None,
        }
    }

    /// Queues time for the next [`Engine::update`] under the manual clock.
    pub fn advance(&mut self, dt: Duration) {
        if let Clock::Manual(pending) = &mut self.clock {
            *pending += dt;
        }
    }

    /// Number of live voices.
    #[must_use]
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Number of sounds held, loading or not.
    #[must_use]
    pub fn sound_count(&self) -> usize {
        self.sounds.len()
    }

    /// Number of DSP units held.
    #[must_use]
    pub fn dsp_count(&self) -> usize {
        self.dsps.len()
    }

    /// Initialization flags in effect.
    #[must_use]
    pub fn init_flags(&self) -> InitFlags {
        self.init_flags
    }

    /// Mixer format as `(sample_rate, speaker_mode)`.
    #[must_use]
    pub fn software_format(&self) -> (u32, SpeakerMode) {
        (self.sample_rate, self.speaker_mode)
    }

    /// Global 3D scales as `(doppler, distance, rolloff)`.
    #[must_use]
    pub fn settings_3d(&self) -> (f32, f32, f32) {
        self.settings_3d
    }

    fn ensure_initialized(&self) -> EngineResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::Uninitialized)
        }
    }

    fn mix_rate(&self) -> u32 {
        if self.sample_rate == 0 {
            DEFAULT_SAMPLE_RATE
        } else {
            self.sample_rate
        }
    }

    fn sound(&self, sound: SoundId) -> EngineResult<&SoundData> {
        self.sounds
            .get(sound.index(), sound.generation())
            .map_err(|_| EngineError::InvalidHandle)
    }

    fn sound_mut(&mut self, sound: SoundId) -> EngineResult<&mut SoundData> {
        self.sounds
            .get_mut(sound.index(), sound.generation())
            .map_err(|_| EngineError::InvalidHandle)
    }

    fn voice(&self, voice: VoiceId) -> EngineResult<&Voice> {
        self.voices.get(voice.index(), voice.generation())
    }

    fn voice_mut(&mut self, voice: VoiceId) -> EngineResult<&mut Voice> {
        self.voices.get_mut(voice.index(), voice.generation())
    }

    fn dsp(&self, dsp: DspId) -> EngineResult<&DspUnit> {
        self.dsps
            .get(dsp.index(), dsp.generation())
            .map_err(|_| EngineError::InvalidHandle)
    }

    /// Reads and probes a file through the installed file system.
    fn open_file(&self, name: &str) -> EngineResult<(ProbeInfo, Vec<u8>)> {
        let stream = self.file_system.open(name)?;
        let bytes = read_all(stream)?;
        let info = probe::probe(name, bytes.clone())?;
        Ok((info, bytes))
    }

    fn finish_open(sound: &mut SoundData, opened: EngineResult<(ProbeInfo, Vec<u8>)>) {
        match opened {
            Ok((info, bytes)) => {
                sound.frequency = info.frequency as f32;
                sound.loop_points = (0, info.length.saturating_sub(1));
                sound.info = Some(info);
                sound.bytes = Some(bytes.into());
                sound.state = OpenState::Ready;
            },
            Err(e) => {
                warn!("Failed to open sound '{}': {e}", sound.name);
                sound.error = Some(e);
                sound.state = OpenState::Error;
            },
        }
    }

    /// Completes every sound still opening.
    fn pump_loading(&mut self) {
        let pending: Vec<(SoundId, String)> = self
            .sounds
            .iter()
            .filter(|(_, _, s)| s.state == OpenState::Loading)
            .map(|(i, g, s)| (SoundId::new(i, g), s.name.clone()))
            .collect();

        for (id, name) in pending {
            let opened = self.open_file(&name);
            if let Ok(sound) = self.sound_mut(id) {
                Self::finish_open(sound, opened);
                debug!("Async open of '{}' finished: {:?}", sound.name, sound.state);
            }
        }
    }

    /// Picks a voice slot, stealing the least important voice if needed.
    fn allocate_voice(&mut self, priority: i32) -> EngineResult<()> {
        if self.voices.len() < self.max_voices {
            return Ok(());
        }

        let victim = self
            .voices
            .iter()
            .max_by(|(_, _, a), (_, _, b)| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.serial.cmp(&a.serial))
            })
            .filter(|(_, _, v)| v.priority >= priority)
            .map(|(index, generation, _)| (index, generation));

        match victim {
            Some((index, generation)) => {
                self.voices.steal(index);
                debug!("Stole voice {index}.{generation} for priority {priority}");
                #[cfg(feature = "rodio-output")]
                self.output_send(output::OutputCommand::Stop(voice_key(VoiceId::new(
                    index, generation,
                ))));
                Ok(())
            },
            None => Err(EngineError::ChannelAlloc),
        }
    }

    #[cfg(feature = "rodio-output")]
    fn output_send(&self, command: output::OutputCommand) {
        if let Some(output) = &self.output {
            output.send(command);
        }
    }
}

impl Engine for HeadlessEngine {
    fn name(&self) -> &str {
        match self.settings.output {
            OutputMode::Silent => "Headless",
            OutputMode::Device => "Headless (device output)",
        }
    }

    fn set_software_format(
        &mut self,
        sample_rate: u32,
        speaker_mode: SpeakerMode,
        _raw_speakers: u32,
    ) -> EngineResult<()> {
        if self.initialized {
            return Err(EngineError::Initialized);
        }
        if sample_rate != 0 && !(8_000..=192_000).contains(&sample_rate) {
            return Err(EngineError::InvalidParam("sample rate"));
        }
        self.sample_rate = sample_rate;
        self.speaker_mode = speaker_mode;
        Ok(())
    }

    fn initialize(&mut self, max_voices: u32, flags: InitFlags) -> EngineResult<()> {
        if self.initialized {
            return Err(EngineError::Initialized);
        }
        if max_voices == 0 {
            return Err(EngineError::InvalidParam("max voices"));
        }

        #[cfg(feature = "rodio-output")]
        if self.settings.output == OutputMode::Device {
            self.output = Some(output::OutputThread::spawn()?);
        }
        #[cfg(not(feature = "rodio-output"))]
        if self.settings.output == OutputMode::Device {
            return Err(EngineError::Output(
                "device output needs the rodio-output feature".into(),
            ));
        }

        self.max_voices = max_voices as usize;
        self.init_flags = flags;
        self.initialized = true;
        info!(
            "Headless engine initialized: {} voices, {} Hz, {:?}",
            max_voices,
            self.mix_rate(),
            self.speaker_mode
        );
        Ok(())
    }

    fn set_file_system(&mut self, file_system: Arc<dyn FileSystem>) -> EngineResult<()> {
        self.file_system = file_system;
        Ok(())
    }

    fn set_3d_settings(
        &mut self,
        doppler_scale: f32,
        distance_factor: f32,
        rolloff_scale: f32,
    ) -> EngineResult<()> {
        if doppler_scale < 0.0 || distance_factor <= 0.0 || rolloff_scale < 0.0 {
            return Err(EngineError::InvalidParam("3d settings"));
        }
        self.settings_3d = (doppler_scale, distance_factor, rolloff_scale);
        Ok(())
    }

    fn update(&mut self) -> EngineResult<()> {
        self.ensure_initialized()?;
        self.pump_loading();

        let dt = self.clock.tick();
        let finished = {
            let mut done = Vec::new();
            for (index, generation, voice) in self.voices.iter_mut() {
                if !voice.advance(dt) {
                    done.push((index, generation));
                }
            }
            done
        };

        for (index, generation) in finished {
            if self.voices.remove(index, generation).is_ok() {
                trace!("Voice {index}.{generation} finished");
                #[cfg(feature = "rodio-output")]
                self.output_send(output::OutputCommand::Stop(voice_key(VoiceId::new(
                    index, generation,
                ))));
            }
        }
        Ok(())
    }

    fn create_sound(&mut self, name: &str, mode: Mode) -> EngineResult<SoundId> {
        self.ensure_initialized()?;
        if mode.contains(Mode::MODE_2D | Mode::MODE_3D) {
            return Err(EngineError::InvalidParam("mode"));
        }

        let mut sound = SoundData {
            name: name.to_string(),
            mode: Mode::DEFAULT.merged(mode),
            state: OpenState::Loading,
            info: None,
            error: None,
            bytes: None,
            loop_points: (0, 0),
            frequency: self.mix_rate() as f32,
            priority: DEFAULT_PRIORITY,
        };

        if !mode.contains(Mode::NONBLOCKING) {
            let (info, bytes) = self.open_file(name)?;
            Self::finish_open(&mut sound, Ok((info, bytes)));
        }

        let (index, generation) = self.sounds.insert(sound);
        debug!(
            "Created sound '{name}' as {index}.{generation} ({})",
            if mode.contains(Mode::NONBLOCKING) {
                "async"
            } else {
                "blocking"
            }
        );
        Ok(SoundId::new(index, generation))
    }

    fn release_sound(&mut self, sound: SoundId) -> EngineResult<()> {
        self.sounds
            .remove(sound.index(), sound.generation())
            .map_err(|_| EngineError::InvalidHandle)?;

        let orphaned = self.voices.drain_where(|v| v.sound == sound);
        #[cfg(feature = "rodio-output")]
        for (index, generation, _) in &orphaned {
            self.output_send(output::OutputCommand::Stop(voice_key(VoiceId::new(
                *index,
                *generation,
            ))));
        }
        if !orphaned.is_empty() {
            debug!("Releasing sound stopped {} voices", orphaned.len());
        }
        Ok(())
    }

    fn sound_open_state(&self, sound: SoundId) -> EngineResult<OpenState> {
        Ok(self.sound(sound)?.state)
    }

    fn sound_length(&self, sound: SoundId) -> EngineResult<u32> {
        Ok(self.sound(sound)?.info()?.length)
    }

    fn sound_defaults(&self, sound: SoundId) -> EngineResult<(f32, i32)> {
        let sound = self.sound(sound)?;
        Ok((sound.frequency, sound.priority))
    }

    fn sound_format(&self, sound: SoundId) -> EngineResult<SoundFormatInfo> {
        let info = self.sound(sound)?.info()?;
        Ok(SoundFormatInfo {
            format: info.format,
            channels: info.channels,
            bits: info.bits,
        })
    }

    fn set_sound_loop_points(&mut self, sound: SoundId, start: u32, end: u32) -> EngineResult<()> {
        let sound = self.sound_mut(sound)?;
        let length = sound.info()?.length;
        if start > end || (length > 0 && end >= length) {
            return Err(EngineError::InvalidParam("loop points"));
        }
        sound.loop_points = (start, end);
        Ok(())
    }

    fn sound_loop_points(&self, sound: SoundId) -> EngineResult<(u32, u32)> {
        Ok(self.sound(sound)?.loop_points)
    }

    fn play_sound(&mut self, sound: SoundId, paused: bool) -> EngineResult<VoiceId> {
        self.ensure_initialized()?;
        let (mode, length, loop_points, frequency, priority) = {
            let data = self.sound(sound)?;
            let info = data.info()?;
            (
                data.mode.difference(Mode::NONBLOCKING),
                info.length,
                data.loop_points,
                data.frequency,
                data.priority,
            )
        };

        self.allocate_voice(priority)?;

        let voice = Voice {
            sound,
            serial: self.next_serial,
            paused,
            position: 0.0,
            length,
            loop_points,
            frequency,
            priority,
            mode,
            pitch: 1.0,
            volume: 1.0,
            min_distance: DEFAULT_MIN_DISTANCE,
            max_distance: DEFAULT_MAX_DISTANCE,
            position_3d: Vec3::ZERO,
            velocity_3d: Vec3::ZERO,
            cone: ConeSettings::default(),
            doppler_level: 1.0,
        };
        self.next_serial += 1;

        let (index, generation) = self.voices.insert(voice);
        let id = VoiceId::new(index, generation);

        #[cfg(feature = "rodio-output")]
        if let Some(bytes) = self.sound(sound).ok().and_then(|s| s.bytes.clone()) {
            self.output_send(output::OutputCommand::Start(output::StartVoice {
                key: voice_key(id),
                bytes,
                looping: mode.is_looping(),
                paused,
                volume: 1.0,
                speed: 1.0,
                offset: Duration::ZERO,
            }));
        }

        trace!("Playing sound {sound} on {id}");
        Ok(id)
    }

    fn stop(&mut self, voice: VoiceId) -> EngineResult<()> {
        self.voices.remove(voice.index(), voice.generation())?;
        #[cfg(feature = "rodio-output")]
        self.output_send(output::OutputCommand::Stop(voice_key(voice)));
        Ok(())
    }

    fn set_paused(&mut self, voice: VoiceId, paused: bool) -> EngineResult<()> {
        self.voice_mut(voice)?.paused = paused;
        #[cfg(feature = "rodio-output")]
        self.output_send(output::OutputCommand::SetPaused(voice_key(voice), paused));
        Ok(())
    }

    fn paused(&self, voice: VoiceId) -> EngineResult<bool> {
        Ok(self.voice(voice)?.paused)
    }

    fn is_playing(&self, voice: VoiceId) -> EngineResult<bool> {
        self.voice(voice).map(|_| true)
    }

    fn set_position(&mut self, voice: VoiceId, frame: u32) -> EngineResult<()> {
        let voice = self.voice_mut(voice)?;
        if frame > voice.length {
            return Err(EngineError::InvalidParam("position"));
        }
        voice.position = f64::from(frame);
        Ok(())
    }

    fn position(&self, voice: VoiceId) -> EngineResult<u32> {
        Ok(self.voice(voice)?.position as u32)
    }

    fn set_priority(&mut self, voice: VoiceId, priority: i32) -> EngineResult<()> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(EngineError::InvalidParam("priority"));
        }
        self.voice_mut(voice)?.priority = priority;
        Ok(())
    }

    fn priority(&self, voice: VoiceId) -> EngineResult<i32> {
        Ok(self.voice(voice)?.priority)
    }

    fn set_mode(&mut self, voice: VoiceId, mode: Mode) -> EngineResult<()> {
        if mode.contains(Mode::MODE_2D | Mode::MODE_3D) {
            return Err(EngineError::InvalidParam("mode"));
        }
        let voice = self.voice_mut(voice)?;
        let was_3d = voice.mode.is_3d();
        voice.mode = voice.mode.merged(mode.difference(Mode::NONBLOCKING));
        if !was_3d && voice.mode.is_3d() {
            voice.reset_3d();
        }
        Ok(())
    }

    fn mode(&self, voice: VoiceId) -> EngineResult<Mode> {
        Ok(self.voice(voice)?.mode)
    }

    fn set_pitch(&mut self, voice: VoiceId, pitch: f32) -> EngineResult<()> {
        if !pitch.is_finite() || pitch < 0.0 {
            return Err(EngineError::InvalidParam("pitch"));
        }
        self.voice_mut(voice)?.pitch = pitch;
        #[cfg(feature = "rodio-output")]
        self.output_send(output::OutputCommand::SetSpeed(voice_key(voice), pitch));
        Ok(())
    }

    fn pitch(&self, voice: VoiceId) -> EngineResult<f32> {
        Ok(self.voice(voice)?.pitch)
    }

    fn set_volume(&mut self, voice: VoiceId, volume: f32) -> EngineResult<()> {
        if !volume.is_finite() {
            return Err(EngineError::InvalidParam("volume"));
        }
        self.voice_mut(voice)?.volume = volume;
        #[cfg(feature = "rodio-output")]
        self.output_send(output::OutputCommand::SetVolume(voice_key(voice), volume));
        Ok(())
    }

    fn volume(&self, voice: VoiceId) -> EngineResult<f32> {
        Ok(self.voice(voice)?.volume)
    }

    fn set_3d_min_max_distance(&mut self, voice: VoiceId, min: f32, max: f32) -> EngineResult<()> {
        let voice = self.voice_mut(voice)?;
        voice.require_3d()?;
        if min < 0.0 || max < min || min.is_nan() || max.is_nan() {
            return Err(EngineError::InvalidParam("3d min/max distance"));
        }
        voice.min_distance = min;
        voice.max_distance = max;
        Ok(())
    }

    fn min_max_distance_3d(&self, voice: VoiceId) -> EngineResult<(f32, f32)> {
        let voice = self.voice(voice)?;
        voice.require_3d()?;
        Ok((voice.min_distance, voice.max_distance))
    }

    fn set_3d_attributes(
        &mut self,
        voice: VoiceId,
        position: Option<Vec3>,
        velocity: Option<Vec3>,
    ) -> EngineResult<()> {
        let voice = self.voice_mut(voice)?;
        voice.require_3d()?;
        if let Some(position) = position {
            voice.position_3d = position;
        }
        if let Some(velocity) = velocity {
            voice.velocity_3d = velocity;
        }
        Ok(())
    }

    fn attributes_3d(&self, voice: VoiceId) -> EngineResult<(Vec3, Vec3)> {
        let voice = self.voice(voice)?;
        voice.require_3d()?;
        Ok((voice.position_3d, voice.velocity_3d))
    }

    fn set_3d_cone_settings(&mut self, voice: VoiceId, cone: ConeSettings) -> EngineResult<()> {
        let voice = self.voice_mut(voice)?;
        voice.require_3d()?;
        if cone.inside_angle > cone.outside_angle
            || cone.inside_angle < 0.0
            || cone.outside_angle > 360.0
            || !(0.0..=1.0).contains(&cone.outside_volume)
        {
            return Err(EngineError::InvalidParam("cone settings"));
        }
        voice.cone = cone;
        Ok(())
    }

    fn cone_settings_3d(&self, voice: VoiceId) -> EngineResult<ConeSettings> {
        let voice = self.voice(voice)?;
        voice.require_3d()?;
        Ok(voice.cone)
    }

    fn set_3d_doppler_level(&mut self, voice: VoiceId, level: f32) -> EngineResult<()> {
        let voice = self.voice_mut(voice)?;
        voice.require_3d()?;
        if !(0.0..=5.0).contains(&level) {
            return Err(EngineError::InvalidParam("doppler level"));
        }
        voice.doppler_level = level;
        Ok(())
    }

    fn doppler_level_3d(&self, voice: VoiceId) -> EngineResult<f32> {
        let voice = self.voice(voice)?;
        voice.require_3d()?;
        Ok(voice.doppler_level)
    }

    fn set_listener_attributes(&mut self, listener: usize, attrs: &Attributes3D) -> EngineResult<()> {
        let slot = self
            .listeners
            .get_mut(listener)
            .ok_or(EngineError::InvalidParam("listener"))?;
        *slot = *attrs;
        Ok(())
    }

    fn listener_attributes(&self, listener: usize) -> EngineResult<Attributes3D> {
        self.listeners
            .get(listener)
            .copied()
            .ok_or(EngineError::InvalidParam("listener"))
    }

    fn create_dsp(&mut self, ty: DspType) -> EngineResult<DspId> {
        self.ensure_initialized()?;
        let params = ty.parameters().iter().map(|p| p.default).collect();
        let (index, generation) = self.dsps.insert(DspUnit { ty, params });
        debug!("Created {ty:?} DSP {index}.{generation}");
        Ok(DspId::new(index, generation))
    }

    fn set_dsp_parameter_float(&mut self, dsp: DspId, index: usize, value: f32) -> EngineResult<()> {
        let unit = self
            .dsps
            .get_mut(dsp.index(), dsp.generation())
            .map_err(|_| EngineError::InvalidHandle)?;
        let desc = unit
            .ty
            .parameters()
            .get(index)
            .ok_or(EngineError::InvalidParam("dsp parameter index"))?;
        if !(desc.min..=desc.max).contains(&value) {
            return Err(EngineError::InvalidParam(desc.name));
        }
        unit.params[index] = value;
        Ok(())
    }

    fn dsp_parameter_float(&self, dsp: DspId, index: usize) -> EngineResult<f32> {
        self.dsp(dsp)?
            .params
            .get(index)
            .copied()
            .ok_or(EngineError::InvalidParam("dsp parameter index"))
    }

    fn dsp_type(&self, dsp: DspId) -> EngineResult<DspType> {
        Ok(self.dsp(dsp)?.ty)
    }

    fn release_dsp(&mut self, dsp: DspId) -> EngineResult<()> {
        self.dsps
            .remove(dsp.index(), dsp.generation())
            .map(|_| ())
            .map_err(|_| EngineError::InvalidHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mono_pcm16_second, wav_bytes, MemoryFileSystem};
    use crate::types::{DISTORTION_LEVEL, ECHO_DELAY};

    fn engine_with(files: &[(&str, Vec<u8>)], max_voices: u32) -> HeadlessEngine {
        let fs = MemoryFileSystem::new();
        for (name, bytes) in files {
            fs.insert(*name, bytes.clone());
        }
        let mut engine = HeadlessEngine::new(EngineSettings::manual());
        engine.set_file_system(Arc::new(fs)).expect("fs");
        engine
            .initialize(max_voices, InitFlags::RIGHT_HANDED_3D)
            .expect("init");
        engine
    }

    #[test]
    fn test_uninitialized_calls_fail() {
        let mut engine = HeadlessEngine::new(EngineSettings::manual());
        assert_eq!(
            engine.create_sound("a.wav", Mode::DEFAULT).err(),
            Some(EngineError::Uninitialized)
        );
        assert_eq!(engine.update().err(), Some(EngineError::Uninitialized));
    }

    #[test]
    fn test_software_format_only_before_init() {
        let mut engine = engine_with(&[], 4);
        assert_eq!(
            engine.set_software_format(44_100, SpeakerMode::Stereo, 0).err(),
            Some(EngineError::Initialized)
        );
    }

    #[test]
    fn test_blocking_open_reports_format() {
        let mut engine = engine_with(&[("a.wav", wav_bytes(2, 44_100, 16, false, 4_410))], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");

        assert_eq!(engine.sound_open_state(sound), Ok(OpenState::Ready));
        assert_eq!(engine.sound_length(sound), Ok(4_410));
        let format = engine.sound_format(sound).expect("format");
        assert_eq!(format.channels, 2);
        assert_eq!(engine.sound_defaults(sound), Ok((44_100.0, DEFAULT_PRIORITY)));
        assert_eq!(engine.sound_loop_points(sound), Ok((0, 4_409)));
    }

    #[test]
    fn test_blocking_open_missing_file() {
        let mut engine = engine_with(&[], 4);
        assert_eq!(
            engine.create_sound("missing.wav", Mode::DEFAULT).err(),
            Some(EngineError::FileNotFound("missing.wav".into()))
        );
        assert_eq!(engine.sound_count(), 0);
    }

    #[test]
    fn test_nonblocking_open_completes_on_update() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine
            .create_sound("a.wav", Mode::DEFAULT | Mode::NONBLOCKING)
            .expect("sound");

        assert_eq!(engine.sound_open_state(sound), Ok(OpenState::Loading));
        assert_eq!(engine.sound_length(sound), Err(EngineError::NotReady));
        assert_eq!(engine.play_sound(sound, false).err(), Some(EngineError::NotReady));

        engine.update().expect("update");
        assert_eq!(engine.sound_open_state(sound), Ok(OpenState::Ready));
        assert_eq!(engine.sound_length(sound), Ok(44_100));
    }

    #[test]
    fn test_nonblocking_open_failure_sets_error_state() {
        let mut engine = engine_with(&[], 4);
        let sound = engine
            .create_sound("gone.wav", Mode::NONBLOCKING)
            .expect("sound");
        engine.update().expect("update");
        assert_eq!(engine.sound_open_state(sound), Ok(OpenState::Error));
        assert!(engine.sound_length(sound).is_err());
    }

    #[test]
    fn test_voice_advances_and_one_shot_ends() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");

        engine.advance(Duration::from_millis(500));
        engine.update().expect("update");
        let pos = engine.position(voice).expect("position");
        assert!((22_000..=22_100).contains(&pos), "position {pos}");

        engine.advance(Duration::from_secs(1));
        engine.update().expect("update");
        assert_eq!(engine.is_playing(voice), Err(EngineError::InvalidHandle));
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn test_looping_voice_wraps() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine
            .create_sound("a.wav", Mode::LOOP_NORMAL)
            .expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");

        engine.advance(Duration::from_millis(1_250));
        engine.update().expect("update");
        let pos = engine.position(voice).expect("position");
        assert!(pos < 44_100);
        assert!((10_900..=11_200).contains(&pos), "position {pos}");
    }

    #[test]
    fn test_paused_voice_holds_position() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let voice = engine.play_sound(sound, true).expect("voice");

        engine.advance(Duration::from_millis(300));
        engine.update().expect("update");
        assert_eq!(engine.position(voice), Ok(0));
        assert_eq!(engine.is_playing(voice), Ok(true));
        assert_eq!(engine.paused(voice), Ok(true));
    }

    #[test]
    fn test_stealing_prefers_least_important_voice() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 2);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");

        let important = engine.play_sound(sound, false).expect("voice");
        engine.set_priority(important, 10).expect("priority");
        let unimportant = engine.play_sound(sound, false).expect("voice");
        engine.set_priority(unimportant, 200).expect("priority");

        let newcomer = engine.play_sound(sound, false).expect("voice");
        assert_eq!(engine.is_playing(newcomer), Ok(true));
        assert_eq!(engine.is_playing(important), Ok(true));
        assert_eq!(engine.is_playing(unimportant), Err(EngineError::ChannelStolen));
        assert_eq!(engine.active_voices(), 2);
    }

    #[test]
    fn test_stealing_refused_when_all_voices_more_important() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 1);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");
        engine.set_priority(voice, 0).expect("priority");

        assert_eq!(engine.play_sound(sound, false).err(), Some(EngineError::ChannelAlloc));
        assert_eq!(engine.is_playing(voice), Ok(true));
    }

    #[test]
    fn test_equal_priority_steals_oldest() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 2);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let first = engine.play_sound(sound, false).expect("voice");
        let second = engine.play_sound(sound, false).expect("voice");

        engine.play_sound(sound, false).expect("voice");
        assert_eq!(engine.is_playing(first), Err(EngineError::ChannelStolen));
        assert_eq!(engine.is_playing(second), Ok(true));
    }

    #[test]
    fn test_3d_calls_need_3d_mode() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");

        assert_eq!(
            engine.set_3d_attributes(voice, Some(Vec3::X), None).err(),
            Some(EngineError::Needs3D)
        );
        assert_eq!(engine.attributes_3d(voice).err(), Some(EngineError::Needs3D));

        engine.set_mode(voice, Mode::MODE_3D).expect("mode");
        engine
            .set_3d_attributes(voice, Some(Vec3::X), None)
            .expect("attributes");
        assert_eq!(engine.attributes_3d(voice), Ok((Vec3::X, Vec3::ZERO)));
    }

    #[test]
    fn test_enabling_3d_resets_3d_parameters() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::MODE_3D).expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");

        engine.set_3d_min_max_distance(voice, 5.0, 50.0).expect("distance");
        engine.set_mode(voice, Mode::MODE_2D).expect("mode");
        engine.set_mode(voice, Mode::MODE_3D).expect("mode");
        assert_eq!(
            engine.min_max_distance_3d(voice),
            Ok((DEFAULT_MIN_DISTANCE, DEFAULT_MAX_DISTANCE))
        );
    }

    #[test]
    fn test_conflicting_dimension_bits_rejected() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");
        assert_eq!(
            engine.set_mode(voice, Mode::MODE_2D | Mode::MODE_3D).err(),
            Some(EngineError::InvalidParam("mode"))
        );
    }

    #[test]
    fn test_loop_point_validation() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        assert!(engine.set_sound_loop_points(sound, 10, 5).is_err());
        assert!(engine.set_sound_loop_points(sound, 0, 44_100).is_err());
        engine.set_sound_loop_points(sound, 100, 200).expect("loop points");
        assert_eq!(engine.sound_loop_points(sound), Ok((100, 200)));
    }

    #[test]
    fn test_release_sound_stops_voices() {
        let mut engine = engine_with(&[("a.wav", mono_pcm16_second())], 4);
        let sound = engine.create_sound("a.wav", Mode::DEFAULT).expect("sound");
        let voice = engine.play_sound(sound, false).expect("voice");

        engine.release_sound(sound).expect("release");
        assert_eq!(engine.is_playing(voice), Err(EngineError::InvalidHandle));
        assert_eq!(engine.release_sound(sound).err(), Some(EngineError::InvalidHandle));
    }

    #[test]
    fn test_dsp_parameters() {
        let mut engine = engine_with(&[], 4);
        let echo = engine.create_dsp(DspType::Echo).expect("dsp");
        assert_eq!(engine.dsp_parameter_float(echo, ECHO_DELAY), Ok(500.0));

        engine
            .set_dsp_parameter_float(echo, ECHO_DELAY, 250.0)
            .expect("param");
        assert_eq!(engine.dsp_parameter_float(echo, ECHO_DELAY), Ok(250.0));
        assert!(engine.set_dsp_parameter_float(echo, ECHO_DELAY, 0.0).is_err());

        let dist = engine.create_dsp(DspType::Distortion).expect("dsp");
        assert!(engine.set_dsp_parameter_float(dist, DISTORTION_LEVEL, 2.0).is_err());
        assert!(engine.set_dsp_parameter_float(dist, 5, 0.1).is_err());

        engine.release_dsp(echo).expect("release");
        assert_eq!(engine.dsp_type(echo).err(), Some(EngineError::InvalidHandle));
        assert_eq!(engine.dsp_count(), 1);
    }

    #[test]
    fn test_listener_slots() {
        let mut engine = engine_with(&[], 4);
        let attrs = Attributes3D {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Attributes3D::default()
        };
        engine.set_listener_attributes(0, &attrs).expect("listener");
        assert_eq!(engine.listener_attributes(0), Ok(attrs));
        assert!(engine.listener_attributes(MAX_LISTENERS).is_err());
    }
}
