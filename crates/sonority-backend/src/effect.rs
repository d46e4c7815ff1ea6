//! Effect adapter over engine DSP units.

use crate::policy::ErrorPolicy;
use parking_lot::Mutex;
use sonority_common::{Effect, EffectProperties, SoundError, SoundResult};
use sonority_engine::types::{
    CHORUS_DEPTH, CHORUS_RATE, DISTORTION_LEVEL, ECHO_DELAY, ECHO_FEEDBACK, FLANGE_DEPTH,
    FLANGE_RATE,
};
use sonority_engine::{DspId, DspType, Engine};
use std::sync::Arc;
use tracing::{debug, warn};

/// Engine DSP type and `(parameter index, value)` pairs realizing a property
/// set, or `None` for variants the engine has no unit for.
///
/// Values are converted to engine units and clamped to the parameter ranges.
pub fn dsp_plan(props: &EffectProperties) -> Option<(DspType, Vec<(usize, f32)>)> {
    match props {
        EffectProperties::Chorus(chorus) => Some((
            DspType::Chorus,
            vec![
                (CHORUS_RATE, chorus.rate.clamp(0.0, 20.0)),
                (CHORUS_DEPTH, (chorus.depth * 100.0).clamp(0.0, 100.0)),
            ],
        )),
        EffectProperties::Distortion(distortion) => Some((
            DspType::Distortion,
            vec![(DISTORTION_LEVEL, distortion.gain.clamp(0.0, 1.0))],
        )),
        EffectProperties::Echo(echo) => Some((
            DspType::Echo,
            vec![
                // seconds to milliseconds
                (ECHO_DELAY, (echo.delay * 1000.0).clamp(1.0, 5000.0)),
                (ECHO_FEEDBACK, (echo.feedback * 100.0).clamp(0.0, 100.0)),
            ],
        )),
        EffectProperties::Flanger(flanger) => Some((
            DspType::Flange,
            vec![
                (FLANGE_DEPTH, flanger.depth.clamp(0.01, 1.0)),
                (FLANGE_RATE, flanger.rate.clamp(0.0, 20.0)),
            ],
        )),
        EffectProperties::Reverb(_)
        | EffectProperties::FrequencyShifter(_)
        | EffectProperties::VocalMorpher(_)
        | EffectProperties::PitchShifter(_)
        | EffectProperties::RingModulator(_)
        | EffectProperties::AutoWah(_)
        | EffectProperties::Compressor(_)
        | EffectProperties::Equalizer(_) => None,
    }
}

/// A DSP unit released when dropped.
struct OwnedDsp<E: Engine> {
    engine: Arc<Mutex<E>>,
    id: DspId,
}

impl<E: Engine> Drop for OwnedDsp<E> {
    fn drop(&mut self) {
        let result = self.engine.lock().release_dsp(self.id);
        match result {
            Ok(()) => debug!("Released DSP {}", self.id),
            Err(e) => warn!("Failed to release DSP {}: {e}", self.id),
        }
    }
}

/// Effect backed by at most one engine DSP unit.
pub struct BackendEffect<E: Engine> {
    engine: Arc<Mutex<E>>,
    dsp: Option<OwnedDsp<E>>,
    props: Option<EffectProperties>,
    policy: ErrorPolicy,
}

impl<E: Engine> BackendEffect<E> {
    pub(crate) fn new(engine: Arc<Mutex<E>>, policy: ErrorPolicy) -> Self {
        Self {
            engine,
            dsp: None,
            props: None,
            policy,
        }
    }

    /// The DSP unit currently held.
    pub fn dsp_id(&self) -> Option<DspId> {
        self.dsp.as_ref().map(|dsp| dsp.id)
    }

    fn build(&self, ty: DspType, params: &[(usize, f32)]) -> Result<DspId, SoundError> {
        let mut engine = self.engine.lock();
        let id = engine
            .create_dsp(ty)
            .map_err(|e| SoundError::engine("create_dsp", e))?;
        for &(index, value) in params {
            if let Err(e) = engine.set_dsp_parameter_float(id, index, value) {
                // the unit is unusable with a parameter missing
                if let Err(release_err) = engine.release_dsp(id) {
                    warn!("Failed to release DSP {id}: {release_err}");
                }
                return Err(SoundError::engine("set_dsp_parameter_float", e));
            }
        }
        Ok(id)
    }
}

impl<E: Engine> Effect for BackendEffect<E> {
    fn set_properties(&mut self, props: EffectProperties) -> SoundResult<bool> {
        let Some((ty, params)) = dsp_plan(&props) else {
            debug!("Effect {} has no engine DSP, ignoring", props.kind());
            return Ok(false);
        };

        match self.build(ty, &params) {
            Ok(id) => {
                debug!("Effect {} realized as {ty:?} DSP {id}", props.kind());
                let replaced = self.dsp.replace(OwnedDsp {
                    engine: Arc::clone(&self.engine),
                    id,
                });
                // released outside the engine lock
                drop(replaced);
                self.props = Some(props);
                Ok(true)
            },
            Err(SoundError::Engine { operation, message }) => {
                warn!("Engine call {operation} failed: {message}");
                match self.policy {
                    ErrorPolicy::LogOnly => Ok(false),
                    ErrorPolicy::Propagate => Err(SoundError::Engine { operation, message }),
                }
            },
            Err(e) => Err(e),
        }
    }

    fn properties(&self) -> Option<&EffectProperties> {
        self.props.as_ref()
    }

    fn is_active(&self) -> bool {
        self.dsp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::session;
    use sonority_common::{
        ChorusProperties, CompressorProperties, EchoProperties, FlangerProperties,
        ReverbProperties, SoundSystem,
    };

    #[test]
    fn test_plan_converts_units() {
        let (ty, params) = dsp_plan(&EffectProperties::Echo(EchoProperties::default()))
            .expect("echo is mapped");
        assert_eq!(ty, DspType::Echo);
        assert_eq!(params, vec![(ECHO_DELAY, 100.0), (ECHO_FEEDBACK, 50.0)]);

        let (ty, params) = dsp_plan(&EffectProperties::Chorus(ChorusProperties::default()))
            .expect("chorus is mapped");
        assert_eq!(ty, DspType::Chorus);
        assert_eq!(params[0], (CHORUS_RATE, 1.1));
        assert!((params[1].1 - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_plan_clamps_to_engine_ranges() {
        let flanger = FlangerProperties {
            depth: 0.0,
            rate: 50.0,
            ..FlangerProperties::default()
        };
        let (_, params) = dsp_plan(&EffectProperties::Flanger(flanger)).expect("mapped");
        assert_eq!(params, vec![(FLANGE_DEPTH, 0.01), (FLANGE_RATE, 20.0)]);
    }

    #[test]
    fn test_reserved_variants_have_no_plan() {
        assert!(dsp_plan(&EffectProperties::Reverb(ReverbProperties::default())).is_none());
        assert!(dsp_plan(&EffectProperties::Compressor(CompressorProperties::default())).is_none());
    }

    #[test]
    fn test_apply_and_replace() {
        let mut system = session(&[]);
        let effect = system.create_effect().expect("effect");
        let mut effect = effect.lock();
        assert!(!effect.is_active());

        let echo = EffectProperties::Echo(EchoProperties::default());
        assert!(effect.set_properties(echo).expect("echo"));
        assert!(effect.is_active());
        assert_eq!(effect.properties(), Some(&echo));
        assert_eq!(system.engine().lock().dsp_count(), 1);

        let chorus = EffectProperties::Chorus(ChorusProperties::default());
        assert!(effect.set_properties(chorus).expect("chorus"));
        assert_eq!(system.engine().lock().dsp_count(), 1);

        let reverb = EffectProperties::Reverb(ReverbProperties::default());
        assert!(!effect.set_properties(reverb).expect("reverb"));
        assert_eq!(effect.properties(), Some(&chorus));
        assert!(effect.is_active());
    }

    #[test]
    fn test_parameters_reach_engine() {
        let system = session(&[]);
        let mut effect = BackendEffect::new(Arc::clone(system.engine()), ErrorPolicy::LogOnly);

        let echo = EchoProperties {
            delay: 0.25,
            feedback: 0.2,
            ..EchoProperties::default()
        };
        assert!(effect.set_properties(EffectProperties::Echo(echo)).expect("echo"));

        let id = effect.dsp_id().expect("dsp");
        let engine = system.engine().lock();
        assert_eq!(engine.dsp_type(id), Ok(DspType::Echo));
        assert_eq!(engine.dsp_parameter_float(id, ECHO_DELAY), Ok(250.0));
        assert!((engine.dsp_parameter_float(id, ECHO_FEEDBACK).expect("feedback") - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejected_parameter_releases_unit() {
        let system = session(&[]);
        let effect = BackendEffect::new(Arc::clone(system.engine()), ErrorPolicy::LogOnly);

        let err = effect
            .build(DspType::Distortion, &[(DISTORTION_LEVEL, 0.5), (7, 1.0)])
            .err()
            .expect("index out of range");
        assert!(matches!(err, SoundError::Engine { operation: "set_dsp_parameter_float", .. }));
        assert_eq!(system.engine().lock().dsp_count(), 0);
        assert!(effect.dsp_id().is_none());
    }

    #[test]
    fn test_drop_releases_dsp() {
        let system = session(&[]);
        let mut effect = BackendEffect::new(Arc::clone(system.engine()), ErrorPolicy::LogOnly);
        effect
            .set_properties(EffectProperties::Flanger(FlangerProperties::default()))
            .expect("flanger");
        assert_eq!(system.engine().lock().dsp_count(), 1);

        drop(effect);
        assert_eq!(system.engine().lock().dsp_count(), 0);
    }
}
