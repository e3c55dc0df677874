use anyhow::Result;

use crate::effect::lifecycle::validate_sample_rate;
use crate::effect::{BlockContext, EffectFamily, EffectGraph, Lifecycle, LifecycleState};
use crate::params::{Descriptor, ParamState, ParameterStore};

/// One effect: its parameters plus the block graph that owns every piece of
/// DSP state. Nothing here is shared with any other instance.
pub struct EffectInstance {
    family: EffectFamily,
    params: ParameterStore,
    graph: EffectGraph,
    state: LifecycleState,
}

impl EffectInstance {
    pub fn new(family: EffectFamily) -> Self {
        Self {
            family,
            params: ParameterStore::new(family.params()),
            graph: EffectGraph::for_family(family),
            state: LifecycleState::Unprepared,
        }
    }

    pub const fn family(&self) -> EffectFamily {
        self.family
    }

    pub const fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor::for_family(self.family)
    }

    pub const fn sample_rate(&self) -> Option<f32> {
        match self.state {
            LifecycleState::Prepared { sample_rate } => Some(sample_rate),
            LifecycleState::Unprepared => None,
        }
    }

    /// Clamp and store; takes effect at the next block.
    #[inline]
    pub fn set_parameter(&mut self, index: usize, value: f32) -> f32 {
        self.params.set(index, value)
    }

    #[inline]
    pub fn get_parameter(&self, index: usize) -> f32 {
        self.params.get(index)
    }

    pub fn set_parameter_by_id(&mut self, id: &str, value: f32) -> Option<f32> {
        self.params.set_by_id(id, value)
    }

    pub fn get_parameter_by_id(&self, id: &str) -> Option<f32> {
        self.params.get_by_id(id)
    }

    pub fn export_state(&self) -> ParamState {
        ParamState::capture(self.family, &self.params)
    }

    /// Restore exported values. Returns how many parameters were applied.
    pub fn restore_state(&mut self, state: &ParamState) -> Result<usize> {
        if state.family != self.family {
            anyhow::bail!(
                "parameter state for {} cannot be restored into {}",
                state.family,
                self.family
            );
        }
        Ok(state.restore(&mut self.params))
    }

    /// Process one stereo block in place. Before `prepare` the audio passes
    /// through untouched.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let LifecycleState::Prepared { sample_rate } = self.state else {
            return;
        };

        let n = left.len().min(right.len());
        let ctx = BlockContext { sample_rate };
        let changes = self.params.take_changes();
        self.graph.process(
            self.params.values(),
            changes,
            &mut left[..n],
            &mut right[..n],
            &ctx,
        );
    }
}

impl Lifecycle for EffectInstance {
    fn prepare(&mut self, sample_rate: f32) -> Result<()> {
        validate_sample_rate(sample_rate)?;

        self.graph.prepare(&BlockContext { sample_rate });
        self.graph.reset();
        self.params.mark_all_changed();
        self.state = LifecycleState::Prepared { sample_rate };
        Ok(())
    }

    fn reset(&mut self) {
        self.graph.reset();
    }

    fn destroy(&mut self) {
        self.graph.reset();
        self.params.restore_defaults();
        self.state = LifecycleState::Unprepared;
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::schema::{gain, mod_delay};

    fn noise(len: usize) -> Vec<f32> {
        let mut seed = 0x1234_5678u32;
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn process_before_prepare_passes_through() {
        let mut fx = EffectInstance::new(EffectFamily::Flanger);
        let input = noise(128);
        let mut left = input.clone();
        let mut right = input.clone();
        fx.process(&mut left, &mut right);
        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn prepare_rejects_bad_sample_rate() {
        let mut fx = EffectInstance::new(EffectFamily::Gain);
        assert!(fx.prepare(-1.0).is_err());
        assert!(!fx.is_prepared());
        assert!(fx.prepare(48_000.0).is_ok());
        assert_eq!(fx.sample_rate(), Some(48_000.0));
    }

    #[test]
    fn destroy_restores_defaults_and_unprepares() {
        let mut fx = EffectInstance::new(EffectFamily::Chorus);
        fx.prepare(48_000.0).unwrap();
        fx.set_parameter(mod_delay::MIX, 1.0);
        fx.destroy();
        assert!(!fx.is_prepared());
        let spec = EffectFamily::Chorus.params()[mod_delay::MIX];
        assert_eq!(fx.get_parameter(mod_delay::MIX), spec.default);
    }

    #[test]
    fn prepare_again_drops_smoother_history() {
        let mut fx = EffectInstance::new(EffectFamily::Gain);
        fx.prepare(48_000.0).unwrap();
        fx.set_parameter(gain::GAIN, -24.0);
        let mut left = vec![0.5; 128];
        let mut right = vec![0.5; 128];
        fx.process(&mut left, &mut right);

        fx.set_parameter(gain::GAIN, 0.0);
        fx.prepare(48_000.0).unwrap();
        let mut left = vec![0.5; 128];
        let mut right = vec![0.5; 128];
        fx.process(&mut left, &mut right);

        assert!((left[0] - 0.5).abs() < 1e-6, "first sample {}", left[0]);
    }

    #[test]
    fn restore_state_checks_family() {
        let fx = EffectInstance::new(EffectFamily::Phaser);
        let state = fx.export_state();
        let mut other = EffectInstance::new(EffectFamily::Flanger);
        assert!(other.restore_state(&state).is_err());

        let mut same = EffectInstance::new(EffectFamily::Phaser);
        assert_eq!(
            same.restore_state(&state).unwrap(),
            EffectFamily::Phaser.params().len()
        );
    }

    #[test]
    fn every_family_output_is_finite_and_bounded() {
        let input: Vec<f32> = noise(4096).into_iter().map(|s| s * 4.0).collect();
        for family in EffectFamily::ALL {
            let mut fx = EffectInstance::new(family);
            fx.prepare(44_100.0).unwrap();
            for (index, spec) in family.params().iter().enumerate() {
                fx.set_parameter(index, spec.max);
            }
            let mut left = input.clone();
            let mut right = input.clone();
            for (l, r) in left.chunks_mut(128).zip(right.chunks_mut(128)) {
                fx.process(l, r);
            }
            assert!(
                left.iter()
                    .chain(&right)
                    .all(|s| s.is_finite() && s.abs() <= 1.0),
                "{family} produced an out-of-range sample"
            );
        }
    }
}
