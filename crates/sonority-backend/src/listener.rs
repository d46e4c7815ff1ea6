//! Listener adapter over engine listener 0.

use crate::policy::ErrorPolicy;
use glam::Vec3;
use parking_lot::Mutex;
use sonority_common::{Listener, SoundResult, UnitScale};
use sonority_engine::{Attributes3D, Engine};
use std::sync::Arc;
use tracing::trace;

const LISTENER: usize = 0;

/// The session's single listener.
///
/// Every change reads the engine attributes, modifies the touched fields and
/// writes them back. The last written attributes are cached for getters.
pub struct BackendListener<E: Engine> {
    engine: Arc<Mutex<E>>,
    units: UnitScale,
    gain: f32,
    cached: Attributes3D,
    policy: ErrorPolicy,
}

impl<E: Engine> BackendListener<E> {
    pub(crate) fn new(engine: Arc<Mutex<E>>, units: UnitScale, policy: ErrorPolicy) -> Self {
        Self {
            engine,
            units,
            gain: 1.0,
            cached: Attributes3D::default(),
            policy,
        }
    }

    fn modify(&mut self, change: impl Fn(&mut Attributes3D)) -> SoundResult<()> {
        let result = {
            let mut engine = self.engine.lock();
            engine.listener_attributes(LISTENER).and_then(|mut attrs| {
                change(&mut attrs);
                engine.set_listener_attributes(LISTENER, &attrs)?;
                Ok(attrs)
            })
        };
        match result {
            Ok(attrs) => {
                trace!("Listener attributes now {attrs:?}");
                self.cached = attrs;
                Ok(())
            },
            Err(e) => {
                change(&mut self.cached);
                self.policy.settle("set_listener_attributes", &e)
            },
        }
    }

    fn attributes(&self) -> Attributes3D {
        let attrs = self.engine.lock().listener_attributes(LISTENER);
        attrs.unwrap_or(self.cached)
    }
}

impl<E: Engine> Listener for BackendListener<E> {
    fn set_gain(&mut self, gain: f32) -> SoundResult<()> {
        self.gain = gain;
        Ok(())
    }

    fn gain(&self) -> f32 {
        self.gain
    }

    fn set_position(&mut self, pos: Vec3) -> SoundResult<()> {
        let position = self.units.to_audio_position(pos);
        self.modify(|attrs| attrs.position = position)
    }

    fn position(&self) -> Vec3 {
        self.units.to_game_position(self.attributes().position)
    }

    fn set_velocity(&mut self, vel: Vec3) -> SoundResult<()> {
        let velocity = self.units.to_audio_position(vel);
        self.modify(|attrs| attrs.velocity = velocity)
    }

    fn velocity(&self) -> Vec3 {
        self.units.to_game_position(self.attributes().velocity)
    }

    fn set_orientation(&mut self, at: Vec3, up: Vec3) -> SoundResult<()> {
        let forward = self.units.to_audio_direction(at);
        let up = self.units.to_audio_direction(up);
        self.modify(|attrs| {
            attrs.forward = forward;
            attrs.up = up;
        })
    }

    fn orientation(&self) -> (Vec3, Vec3) {
        let attrs = self.attributes();
        (
            self.units.to_game_direction(attrs.forward),
            self.units.to_game_direction(attrs.up),
        )
    }

    fn set_meters_per_unit(&mut self, meters_per_unit: f32) {
        self.units = UnitScale::new(meters_per_unit);
    }

    fn meters_per_unit(&self) -> f32 {
        self.units.meters_per_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::session;
    use sonority_common::SoundSystem;

    #[test]
    fn test_fields_are_written_independently() {
        let mut system = session(&[]);
        let listener = system.listener();

        listener.set_position(Vec3::new(1.0, 2.0, 3.0)).expect("position");
        listener.set_velocity(Vec3::new(0.0, 0.0, -4.0)).expect("velocity");
        listener
            .set_orientation(Vec3::new(0.0, 0.0, -2.0), Vec3::Y)
            .expect("orientation");

        assert_eq!(listener.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(listener.velocity(), Vec3::new(0.0, 0.0, -4.0));
        assert_eq!(listener.orientation(), (Vec3::NEG_Z, Vec3::Y));
    }

    #[test]
    fn test_unit_conversion() {
        let mut system = session(&[]);
        system.set_meters_per_unit(0.01);
        system
            .listener()
            .set_position(Vec3::new(100.0, 0.0, 0.0))
            .expect("position");

        let attrs = system
            .engine()
            .lock()
            .listener_attributes(LISTENER)
            .expect("listener 0");
        assert!((attrs.position - Vec3::X).length() < 1e-6);
        assert!((system.listener().position() - Vec3::new(100.0, 0.0, 0.0)).length() < 1e-3);
        assert_eq!(system.listener().meters_per_unit(), 0.01);
    }

    #[test]
    fn test_gain_is_cache_only() {
        let mut system = session(&[]);
        let listener = system.listener();
        listener.set_gain(0.25).expect("gain");
        assert_eq!(listener.gain(), 0.25);
    }
}
