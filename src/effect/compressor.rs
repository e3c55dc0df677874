use crate::dsp::common::db_to_lin;
use crate::dsp::dynamics::{EnvelopeFollower, compression_gain};
use crate::effect::schema::compressor as slot;
use crate::effect::{Block, BlockContext};
use crate::params::ChangeSet;

/// Fixed detector threshold, -20 dBFS.
const THRESHOLD: f32 = 0.1;
const MAX_RATIO: f32 = 10.0;
const MAX_MAKEUP_DB: f32 = 24.0;
const MIN_ATTACK_MS: f32 = 1.0;
const MAX_ATTACK_MS: f32 = 100.0;

/// Two-knob compressor.
///
/// `sustain` raises ratio (1:1 to 10:1) and makeup gain (0 to 24 dB)
/// together; `sensitivity` sets attack from 1 to 100 ms with release at twice
/// the attack. The detector is stereo-linked.
pub struct Compressor {
    envelope: EnvelopeFollower,
    ratio: f32,
    makeup: f32,
    attack_ms: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            envelope: EnvelopeFollower::default(),
            ratio: 1.0,
            makeup: 1.0,
            attack_ms: MIN_ATTACK_MS,
        }
    }

    pub const fn ratio(&self) -> f32 {
        self.ratio
    }

    pub const fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    pub const fn release_ms(&self) -> f32 {
        self.attack_ms * 2.0
    }
}

impl Block for Compressor {
    fn prepare(&mut self, _ctx: &BlockContext) {
        self.reset();
    }

    fn reset(&mut self) {
        self.envelope.reset();
    }

    fn update(&mut self, params: &[f32], changes: ChangeSet, ctx: &BlockContext) {
        if changes.contains(slot::SUSTAIN) {
            let sustain = params[slot::SUSTAIN];
            self.ratio = (MAX_RATIO - 1.0).mul_add(sustain, 1.0);
            self.makeup = db_to_lin(MAX_MAKEUP_DB * sustain);
        }

        if changes.contains(slot::SENSITIVITY) {
            let sensitivity = params[slot::SENSITIVITY];
            self.attack_ms = (MAX_ATTACK_MS - MIN_ATTACK_MS).mul_add(sensitivity, MIN_ATTACK_MS);
            self.envelope
                .set_times(self.attack_ms, self.release_ms(), ctx.sample_rate);
        }
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &BlockContext) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let env = self.envelope.process(l.abs().max(r.abs()));
            let gain = compression_gain(env, THRESHOLD, self.ratio) * self.makeup;
            *l *= gain;
            *r *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::common::lin_to_db;

    const CTX: BlockContext = BlockContext {
        sample_rate: 48_000.0,
    };

    fn configured(sustain: f32, sensitivity: f32) -> Compressor {
        let mut comp = Compressor::new();
        comp.prepare(&CTX);
        comp.update(&[sustain, sensitivity], ChangeSet::ALL, &CTX);
        comp
    }

    #[test]
    fn knob_mapping() {
        let comp = configured(0.0, 0.0);
        assert_eq!(comp.ratio(), 1.0);
        assert_eq!(comp.attack_ms(), 1.0);
        assert_eq!(comp.release_ms(), 2.0);

        let comp = configured(1.0, 1.0);
        assert_eq!(comp.ratio(), 10.0);
        assert_eq!(comp.attack_ms(), 100.0);
        assert_eq!(comp.release_ms(), 200.0);
        assert!((lin_to_db(comp.makeup) - 24.0).abs() < 1e-3);
    }

    #[test]
    fn zero_sustain_is_transparent() {
        let mut comp = configured(0.0, 0.5);
        let mut left = vec![0.8; 1024];
        let mut right = vec![-0.8; 1024];
        comp.process(&mut left, &mut right, &CTX);
        assert!(left.iter().all(|&s| (s - 0.8).abs() < 1e-6));
        assert!(right.iter().all(|&s| (s + 0.8).abs() < 1e-6));
    }

    #[test]
    fn loud_signal_is_reduced_before_makeup() {
        // Sustain small enough that makeup stays modest while ratio bites.
        let mut comp = configured(0.5, 0.0);
        let mut left = vec![1.0; 4800];
        let mut right = vec![1.0; 4800];
        comp.process(&mut left, &mut right, &CTX);

        let settled = left[4799];
        let makeup = db_to_lin(12.0);
        assert!(settled < makeup * 0.5, "expected gain reduction, got {settled}");
    }

    #[test]
    fn quiet_signal_only_gets_makeup() {
        let mut comp = configured(0.25, 0.5);
        let mut left = vec![0.01; 256];
        let mut right = vec![0.01; 256];
        comp.process(&mut left, &mut right, &CTX);
        let expected = 0.01 * db_to_lin(6.0);
        assert!((left[255] - expected).abs() < 1e-5);
    }
}
