use crate::dsp::common::{calculate_coefficient, db_to_lin};
use crate::effect::{Block, BlockContext};
use crate::params::ChangeSet;

const SMOOTH_TIME_MS: f32 = 20.0;

/// Linear gain that glides toward its target with a one-pole smoother.
///
/// After a reset the first block jumps straight to the target so a freshly
/// prepared instance never fades in.
#[derive(Debug, Clone)]
pub struct SmoothedGain {
    current: f32,
    target: f32,
    coeff: f32,
    settled: bool,
}

impl Default for SmoothedGain {
    fn default() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            coeff: 0.0,
            settled: false,
        }
    }
}

impl SmoothedGain {
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = calculate_coefficient(SMOOTH_TIME_MS, sample_rate);
    }

    pub fn set_target_db(&mut self, gain_db: f32) {
        self.target = db_to_lin(gain_db);
    }

    pub const fn target(&self) -> f32 {
        self.target
    }

    pub const fn reset(&mut self) {
        self.settled = false;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if !self.settled {
            self.current = self.target;
            self.settled = true;
        }
        self.current = self
            .coeff
            .mul_add(self.current - self.target, self.target);
        self.current
    }
}

/// Output level stage driven by one dB parameter slot of the owning family.
#[derive(Debug, Clone)]
pub struct GainStage {
    param: usize,
    gain: SmoothedGain,
}

impl GainStage {
    pub fn new(param: usize) -> Self {
        Self {
            param,
            gain: SmoothedGain::default(),
        }
    }
}

impl Block for GainStage {
    fn prepare(&mut self, ctx: &BlockContext) {
        self.gain.set_sample_rate(ctx.sample_rate);
    }

    fn reset(&mut self) {
        self.gain.reset();
    }

    fn update(&mut self, params: &[f32], changes: ChangeSet, _ctx: &BlockContext) {
        if changes.contains(self.param)
            && let Some(&gain_db) = params.get(self.param)
        {
            self.gain.set_target_db(gain_db);
        }
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &BlockContext) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let g = self.gain.next();
            *l *= g;
            *r *= g;
        }
    }
}
