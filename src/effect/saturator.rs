use crate::dsp::common::mix;
use crate::dsp::filter::{OnePole, OnePoleMode};
use crate::dsp::shaper::{ShaperCurve, shape};
use crate::effect::schema::saturator as slot;
use crate::effect::{Block, BlockContext};
use crate::params::ChangeSet;

/// Drive at 1.0 multiplies the input by this much before the curve.
const MAX_PRE_GAIN: f32 = 10.0;
/// Level compensation applied to the shaped signal.
const COMPENSATION: f32 = 0.7;
const DC_BLOCK_HZ: f32 = 10.0;

/// Waveshaping saturator. Asymmetric curves push DC into the wet path, which
/// a 10 Hz highpass takes back out.
pub struct Saturator {
    curve: ShaperCurve,
    pre_gain: f32,
    asymmetry: f32,
    mix: f32,
    dc_block: [OnePole; 2],
}

impl Default for Saturator {
    fn default() -> Self {
        Self::new()
    }
}

impl Saturator {
    pub fn new() -> Self {
        Self {
            curve: ShaperCurve::Tanh,
            pre_gain: 1.0,
            asymmetry: 0.0,
            mix: 1.0,
            dc_block: std::array::from_fn(|_| {
                OnePole::new(OnePoleMode::Highpass, DC_BLOCK_HZ, 48_000.0)
            }),
        }
    }
}

impl Block for Saturator {
    fn prepare(&mut self, ctx: &BlockContext) {
        self.dc_block = std::array::from_fn(|_| {
            OnePole::new(OnePoleMode::Highpass, DC_BLOCK_HZ, ctx.sample_rate)
        });
    }

    fn reset(&mut self) {
        for filter in &mut self.dc_block {
            filter.reset();
        }
    }

    fn update(&mut self, params: &[f32], _changes: ChangeSet, _ctx: &BlockContext) {
        self.pre_gain = (MAX_PRE_GAIN - 1.0).mul_add(params[slot::DRIVE], 1.0);
        self.curve = ShaperCurve::from_selector(params[slot::SHAPE]);
        self.asymmetry = params[slot::ASYMMETRY];
        self.mix = params[slot::MIX];
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &BlockContext) {
        for (ch, buf) in [left, right].into_iter().enumerate() {
            let dc = &mut self.dc_block[ch];
            for sample in buf.iter_mut() {
                let dry = *sample;
                let shaped = shape(self.curve, dry, self.pre_gain, self.asymmetry) * COMPENSATION;
                *sample = mix(dry, dc.process(shaped), self.mix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::schema::SATURATOR;
    use crate::params::ParameterStore;

    const CTX: BlockContext = BlockContext {
        sample_rate: 48_000.0,
    };

    fn run(store: &mut ParameterStore, input: &[f32]) -> Vec<f32> {
        let mut block = Saturator::new();
        block.prepare(&CTX);
        let changes = store.take_changes();
        block.update(store.values(), changes, &CTX);
        let mut left = input.to_vec();
        let mut right = input.to_vec();
        block.process(&mut left, &mut right, &CTX);
        left
    }

    #[test]
    fn output_is_bounded_for_hot_input() {
        let mut store = ParameterStore::new(&SATURATOR);
        store.set(slot::DRIVE, 1.0);
        let input: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.05).sin() * 4.0).collect();
        for shape_index in 0..ShaperCurve::COUNT {
            store.set(slot::SHAPE, shape_index as f32);
            let output = run(&mut store, &input);
            let peak = output.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak <= 1.5, "shape {shape_index} peaked at {peak}");
        }
    }

    #[test]
    fn asymmetry_dc_is_removed() {
        let mut store = ParameterStore::new(&SATURATOR);
        store.set(slot::DRIVE, 1.0);
        store.set(slot::ASYMMETRY, 1.0);
        let input: Vec<f32> = (0..96_000)
            .map(|i| (std::f32::consts::TAU * 220.0 * i as f32 / 48_000.0).sin() * 0.8)
            .collect();
        let output = run(&mut store, &input);
        let tail = &output[48_000..];
        let mean = tail.iter().sum::<f32>() / tail.len() as f32;
        assert!(mean.abs() < 0.01, "DC offset left in output: {mean}");
    }

    #[test]
    fn zero_mix_is_dry() {
        let mut store = ParameterStore::new(&SATURATOR);
        store.set(slot::MIX, 0.0);
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).cos() * 0.3).collect();
        assert_eq!(run(&mut store, &input), input);
    }
}
