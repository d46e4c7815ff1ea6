//! Channel adapter.
//!
//! A channel keeps the host's requested parameters in a [`DesiredState`]
//! and mirrors them onto an engine voice while one is bound. The engine may
//! reclaim the voice at any time. When that happens the channel answers
//! from its cache and replays the cache onto the next voice it acquires.

pub mod stale;
pub mod state;

use crate::buffer::BackendBuffer;
use crate::policy::ErrorPolicy;
use glam::Vec3;
use parking_lot::Mutex;
use sonority_common::{
    ChannelEvent, ChannelEventCallback, ChannelState, PSoundBuffer, SoundBuffer, SoundChannel,
    SoundResult, UnitScale,
};
use sonority_engine::{Engine, EngineResult, VoiceId};
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub use stale::{Access, Revocation, StaleHandle};
pub use state::{apply_op, derive_spatial_mode, DesiredState, SpatialMode, VoiceOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Started,
    Stopped,
}

/// Playback channel backed by engine voices.
pub struct BackendChannel<E: Engine> {
    engine: Arc<Mutex<E>>,
    buffer: Arc<BackendBuffer<E>>,
    voice: StaleHandle<VoiceId>,
    desired: DesiredState,
    units: UnitScale,
    policy: ErrorPolicy,
    lifecycle: Lifecycle,
    /// Start offset of a play waiting for the buffer to load
    scheduled: Option<u32>,
    /// Mode applied to the bound voice
    spatial: SpatialMode,
    listeners: Vec<ChannelEventCallback>,
}

impl<E: Engine> BackendChannel<E> {
    pub(crate) fn new(
        engine: Arc<Mutex<E>>,
        buffer: Arc<BackendBuffer<E>>,
        units: UnitScale,
        policy: ErrorPolicy,
    ) -> Self {
        Self {
            engine,
            buffer,
            voice: StaleHandle::unbound(),
            desired: DesiredState::default(),
            units,
            policy,
            lifecycle: Lifecycle::Uninitialized,
            scheduled: None,
            spatial: SpatialMode::Flat,
            listeners: Vec::new(),
        }
    }

    /// Cached parameters.
    pub fn desired(&self) -> &DesiredState {
        &self.desired
    }

    /// The bound voice, if any.
    pub fn voice(&self) -> Option<VoiceId> {
        self.voice.get()
    }

    /// How the last voice was lost.
    pub fn revocation(&self) -> Option<Revocation> {
        self.voice.revocation()
    }

    /// Changes the unit scale and re-sends spatial parameters.
    pub fn set_units(&mut self, units: UnitScale) -> SoundResult<()> {
        self.units = units;
        if self.spatial.is_3d() {
            let ops = self.desired.spatial_ops(&self.units);
            return self.apply(&ops);
        }
        Ok(())
    }

    fn write(
        &self,
        operation: &'static str,
        call: impl FnOnce(&mut E, VoiceId) -> EngineResult<()>,
    ) -> SoundResult<()> {
        let access = self.voice.access(|voice| call(&mut self.engine.lock(), voice));
        match access {
            Access::Live(()) | Access::Unbound => Ok(()),
            Access::Revoked(reason) => {
                debug!("Voice lost ({reason:?}) during {operation}, keeping cached state");
                Ok(())
            },
            Access::Failed(e) => self.policy.settle(operation, &e),
        }
    }

    fn read<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&E, VoiceId) -> EngineResult<T>,
    ) -> Option<T> {
        match self.voice.access(|voice| call(&self.engine.lock(), voice)) {
            Access::Live(value) => Some(value),
            Access::Failed(e) => {
                warn!("Engine call {operation} failed: {e}");
                None
            },
            Access::Revoked(_) | Access::Unbound => None,
        }
    }

    fn read_3d<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&E, VoiceId) -> EngineResult<T>,
    ) -> Option<T> {
        if self.spatial.is_3d() {
            self.read(operation, call)
        } else {
            None
        }
    }

    /// Applies ops in order. Every op is attempted; the first propagated
    /// failure is returned. Spatial ops are skipped while the voice is 2D.
    fn apply(&self, ops: &[VoiceOp]) -> SoundResult<()> {
        let mut outcome = Ok(());
        for op in ops {
            if op.needs_3d() && !self.spatial.is_3d() {
                continue;
            }
            let result = self.write(op.name(), |engine, voice| apply_op(engine, voice, op));
            if outcome.is_ok() {
                outcome = result;
            }
        }
        outcome
    }

    fn spatial_op(&self, pick: fn(&VoiceOp) -> bool) -> Option<VoiceOp> {
        self.desired
            .spatial_ops(&self.units)
            .into_iter()
            .find(|op| pick(op))
    }

    /// Re-derives the spatial mode. Entering 3D re-sends every spatial
    /// parameter because the engine resets them. Returns whether it did.
    fn update_mode(&mut self) -> SoundResult<bool> {
        let target = derive_spatial_mode(&self.desired);
        if target == self.spatial {
            return Ok(false);
        }
        let entering_3d = !self.spatial.is_3d() && target.is_3d();
        self.spatial = target;
        trace!("Channel mode now {target:?}");

        let mut ops = vec![VoiceOp::Mode(target)];
        if entering_3d {
            ops.extend(self.desired.spatial_ops(&self.units));
        }
        self.apply(&ops)?;
        Ok(entering_3d)
    }

    fn start(&mut self, offset: u32) -> SoundResult<()> {
        self.lifecycle = Lifecycle::Started;
        self.desired.frame_offset = offset;

        if self.buffer.is_pending() {
            debug!("Buffer '{}' still loading, play scheduled", self.buffer.name());
            self.scheduled = Some(offset);
            return Ok(());
        }
        self.scheduled = None;

        if self.voice.is_bound() {
            self.apply(&[VoiceOp::Position(offset)])?;
        }
        if !self.voice.is_bound() {
            let acquired = self.engine.lock().play_sound(self.buffer.sound_id(), true);
            let voice = match acquired {
                Ok(voice) => voice,
                Err(e) => return self.policy.settle("play_sound", &e),
            };
            self.voice.bind(voice);
            trace!("Acquired {voice} for '{}'", self.buffer.name());

            // fresh voices start 2D
            self.spatial = derive_spatial_mode(&self.desired);
            let ops = self.desired.replay_ops(&self.units);
            self.apply(&ops)?;
        }

        self.write("set_paused", |engine, voice| engine.set_paused(voice, false))
    }

    /// A one-shot voice that ran to its end.
    fn finished(&self) -> bool {
        self.voice.revocation() == Some(Revocation::Invalid) && !self.desired.looping
    }

    fn emit(&mut self, event: ChannelEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl<E: Engine> SoundChannel for BackendChannel<E> {
    fn play(&mut self) -> SoundResult<()> {
        self.start(0)
    }

    fn stop(&mut self) -> SoundResult<()> {
        self.scheduled = None;
        self.lifecycle = Lifecycle::Stopped;
        let result = self.write("stop", |engine, voice| engine.stop(voice));
        self.voice.clear();
        self.desired.frame_offset = 0;
        result
    }

    fn pause(&mut self) -> SoundResult<()> {
        self.scheduled = None;
        if let Some(frame) = self.read("position", |engine, voice| engine.position(voice)) {
            self.desired.frame_offset = frame;
        }
        self.write("set_paused", |engine, voice| engine.set_paused(voice, true))
    }

    fn resume(&mut self) -> SoundResult<()> {
        let access = self
            .voice
            .access(|voice| self.engine.lock().set_paused(voice, false));
        match access {
            Access::Live(()) => {
                self.lifecycle = Lifecycle::Started;
                Ok(())
            },
            Access::Failed(e) => self.policy.settle("set_paused", &e),
            Access::Revoked(_) | Access::Unbound => self.start(self.desired.frame_offset),
        }
    }

    fn is_playing(&self) -> bool {
        if self.scheduled.is_some() {
            return true;
        }
        self.read("paused", |engine, voice| {
            Ok(engine.is_playing(voice)? && !engine.paused(voice)?)
        })
        .unwrap_or(false)
    }

    fn state(&self) -> ChannelState {
        if self.scheduled.is_some() {
            return ChannelState::Playing;
        }
        match self.lifecycle {
            Lifecycle::Uninitialized => ChannelState::Uninitialized,
            Lifecycle::Stopped => ChannelState::Stopped,
            Lifecycle::Started => match self.read("paused", |engine, voice| engine.paused(voice)) {
                Some(true) => ChannelState::Paused,
                Some(false) => ChannelState::Playing,
                None if self.finished() => ChannelState::Stopped,
                None if self.voice.revocation().is_some() => ChannelState::Invalidated,
                None => ChannelState::Stopped,
            },
        }
    }

    fn update(&mut self) {
        if let Some(offset) = self.scheduled {
            if !self.buffer.is_pending() {
                if let Err(e) = self.start(offset) {
                    warn!("Scheduled play of '{}' failed: {e}", self.buffer.name());
                }
            }
            return;
        }

        if let Some(frame) = self.read("position", |engine, voice| engine.position(voice)) {
            self.desired.frame_offset = frame;
        } else if self.lifecycle == Lifecycle::Started && self.finished() {
            trace!("'{}' finished", self.buffer.name());
            self.lifecycle = Lifecycle::Stopped;
            self.desired.frame_offset = 0;
        }
    }

    fn buffer(&self) -> PSoundBuffer {
        self.buffer.clone()
    }

    fn set_frame_offset(&mut self, frame: u32) -> SoundResult<()> {
        self.desired.frame_offset = frame;
        if self.scheduled.is_some() {
            self.scheduled = Some(frame);
        }
        self.apply(&[VoiceOp::Position(frame)])
    }

    fn frame_offset(&self) -> u32 {
        self.read("position", |engine, voice| engine.position(voice))
            .unwrap_or(self.desired.frame_offset)
    }

    fn set_offset(&mut self, offset: f32) -> SoundResult<()> {
        let length = self.buffer.length();
        let frame = (offset.clamp(0.0, 1.0) * length as f32).round() as u32;
        self.set_frame_offset(frame)
    }

    fn offset(&self) -> f32 {
        let length = self.buffer.length();
        if length == 0 {
            return 0.0;
        }
        self.frame_offset() as f32 / length as f32
    }

    fn duration(&self) -> f32 {
        self.buffer.duration()
    }

    fn set_priority(&mut self, priority: u32) -> SoundResult<()> {
        self.desired.priority = priority;
        let priority = priority.min(state::MAX_PRIORITY) as i32;
        self.apply(&[VoiceOp::Priority(priority)])
    }

    fn priority(&self) -> u32 {
        self.read("priority", |engine, voice| engine.priority(voice))
            .map_or(self.desired.priority, |p| p.max(0) as u32)
    }

    fn set_looping(&mut self, looping: bool) -> SoundResult<()> {
        self.desired.looping = looping;
        self.apply(&[VoiceOp::Looping(looping)])
    }

    fn is_looping(&self) -> bool {
        self.read("mode", |engine, voice| engine.mode(voice))
            .map_or(self.desired.looping, |mode| mode.is_looping())
    }

    fn set_pitch(&mut self, pitch: f32) -> SoundResult<()> {
        self.desired.pitch = pitch;
        self.apply(&[VoiceOp::Pitch(pitch.max(0.0))])
    }

    fn pitch(&self) -> f32 {
        self.read("pitch", |engine, voice| engine.pitch(voice))
            .unwrap_or(self.desired.pitch)
    }

    fn set_gain(&mut self, gain: f32) -> SoundResult<()> {
        self.desired.gain = gain;
        self.apply(&[VoiceOp::Volume(gain)])
    }

    fn gain(&self) -> f32 {
        self.read("volume", |engine, voice| engine.volume(voice))
            .unwrap_or(self.desired.gain)
    }

    fn set_gain_range(&mut self, min: f32, max: f32) -> SoundResult<()> {
        self.desired.min_gain = min;
        self.desired.max_gain = max.max(min);
        // the current gain is only clamped when the range changes
        let gain = self.desired.gain.max(self.desired.min_gain).min(self.desired.max_gain);
        self.set_gain(gain)
    }

    fn gain_range(&self) -> (f32, f32) {
        (self.desired.min_gain, self.desired.max_gain)
    }

    fn set_distance_range(&mut self, reference: f32, max: f32) -> SoundResult<()> {
        self.desired.reference_distance = reference.min(max);
        self.desired.max_distance = max;
        let (min, max) = self.desired.engine_distance_range(&self.units);
        self.apply(&[VoiceOp::MinMaxDistance(min, max)])
    }

    fn distance_range(&self) -> (f32, f32) {
        let units = self.units;
        self.read_3d("min_max_distance_3d", |engine, voice| {
            engine.min_max_distance_3d(voice)
        })
        .map_or(
            (self.desired.reference_distance, self.desired.max_distance),
            |(min, max)| {
                let max = if max == f32::MAX {
                    f32::INFINITY
                } else {
                    units.to_game_distance(max)
                };
                (units.to_game_distance(min), max)
            },
        )
    }

    fn set_position(&mut self, pos: Vec3) -> SoundResult<()> {
        self.desired.position = pos;
        if self.update_mode()? {
            return Ok(());
        }
        match self.spatial_op(|op| matches!(op, VoiceOp::Attributes { .. })) {
            Some(op) => self.apply(&[op]),
            None => Ok(()),
        }
    }

    fn position(&self) -> Vec3 {
        self.read_3d("attributes_3d", |engine, voice| engine.attributes_3d(voice))
            .map_or(self.desired.position, |(pos, _)| {
                self.units.to_game_position(pos)
            })
    }

    fn set_velocity(&mut self, vel: Vec3) -> SoundResult<()> {
        self.desired.velocity = vel;
        if self.update_mode()? {
            return Ok(());
        }
        match self.spatial_op(|op| matches!(op, VoiceOp::Attributes { .. })) {
            Some(op) => self.apply(&[op]),
            None => Ok(()),
        }
    }

    fn velocity(&self) -> Vec3 {
        self.read_3d("attributes_3d", |engine, voice| engine.attributes_3d(voice))
            .map_or(self.desired.velocity, |(_, vel)| {
                self.units.to_game_position(vel)
            })
    }

    fn set_cone_angles(&mut self, inner: f32, outer: f32) -> SoundResult<()> {
        self.desired.cone_inner = inner;
        self.desired.cone_outer = outer;
        if self.update_mode()? {
            return Ok(());
        }
        match self.spatial_op(|op| matches!(op, VoiceOp::Cone { .. })) {
            Some(op) => self.apply(&[op]),
            None => Ok(()),
        }
    }

    fn cone_angles(&self) -> (f32, f32) {
        self.read_3d("cone_settings_3d", |engine, voice| {
            engine.cone_settings_3d(voice)
        })
        .map_or(
            (self.desired.cone_inner, self.desired.cone_outer),
            |cone| (cone.inside_angle, cone.outside_angle),
        )
    }

    fn set_doppler_factor(&mut self, factor: f32) -> SoundResult<()> {
        self.desired.doppler_factor = factor;
        match self.spatial_op(|op| matches!(op, VoiceOp::DopplerLevel(_))) {
            Some(op) => self.apply(&[op]),
            None => Ok(()),
        }
    }

    fn doppler_factor(&self) -> f32 {
        self.read_3d("doppler_level_3d", |engine, voice| {
            engine.doppler_level_3d(voice)
        })
        .unwrap_or(self.desired.doppler_factor)
    }

    fn set_relative(&mut self, relative: bool) -> SoundResult<()> {
        let changed = self.desired.relative != relative;
        self.desired.relative = relative;
        let result = self.update_mode().map(|_| ());
        if changed {
            self.emit(ChannelEvent::RelativeChanged(relative));
        }
        result
    }

    fn is_relative(&self) -> bool {
        self.desired.relative
    }

    fn set_radius(&mut self, radius: f32) -> SoundResult<()> {
        self.set_distance_range(self.desired.reference_distance.min(radius), radius)
    }

    fn radius(&self) -> f32 {
        self.desired.max_distance
    }

    fn set_3d_attributes_effective(&mut self, effective: bool) -> SoundResult<()> {
        self.desired.effective_3d = effective;
        self.update_mode().map(|_| ())
    }

    fn are_3d_attributes_effective(&self) -> bool {
        self.desired.effective_3d
    }

    fn is_3d(&self) -> bool {
        derive_spatial_mode(&self.desired).is_3d()
    }

    fn set_direction(&mut self, _dir: Vec3) {
        debug!("Channel direction is not supported");
    }

    fn direction(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn set_orientation(&mut self, _at: Vec3, _up: Vec3) {
        debug!("Channel orientation is not supported");
    }

    fn orientation(&self) -> (Vec3, Vec3) {
        (Vec3::ZERO, Vec3::ZERO)
    }

    fn set_outer_cone_gains(&mut self, _gain: f32, _gain_hf: f32) {
        debug!("Outer cone gains are not supported");
    }

    fn outer_cone_gains(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn set_rolloff_factors(&mut self, _factor: f32, _room_factor: f32) {
        debug!("Rolloff factors are not supported");
    }

    fn rolloff_factors(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn set_stereo_angles(&mut self, _left: f32, _right: f32) {
        debug!("Stereo angles are not supported");
    }

    fn stereo_angles(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn set_air_absorption_factor(&mut self, _factor: f32) {
        debug!("Air absorption is not supported");
    }

    fn air_absorption_factor(&self) -> f32 {
        0.0
    }

    fn set_gain_auto(&mut self, _direct_hf: bool, _send: bool, _send_hf: bool) {
        debug!("Automatic send gains are not supported");
    }

    fn gain_auto(&self) -> (bool, bool, bool) {
        (false, false, false)
    }

    fn add_event_listener(&mut self, callback: ChannelEventCallback) {
        self.listeners.push(callback);
    }
}

impl<E: Engine> Drop for BackendChannel<E> {
    fn drop(&mut self) {
        if let Some(voice) = self.voice.clear() {
            let result = self.engine.lock().stop(voice);
            if let Err(e) = result {
                trace!("Stopping {voice} on drop: {e}");
            }
        }
    }
}
