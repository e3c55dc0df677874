use crate::dsp::common::{flush_denormal, limit_feedback, mix};
use crate::dsp::filter::Allpass;
use crate::dsp::lfo::{Lfo, Waveform};
use crate::effect::schema::phaser as slot;
use crate::effect::{Block, BlockContext};
use crate::params::ChangeSet;

const MAX_STAGES: usize = 12;
/// Sweep range at full depth, in octaves either side of the centre.
const SWEEP_OCTAVES: f32 = 2.0;

/// Allpass-chain phaser swept by the shared LFO.
///
/// The allpass coefficient is derived once per block from the LFO and ramped
/// linearly across the block, the same way the modulated delay ramps its time.
pub struct Phaser {
    sections: [[Allpass; MAX_STAGES]; 2],
    lfo: Lfo,
    last: [f32; 2],
    current_coeff: [f32; 2],
    primed: bool,

    rate: f32,
    depth: f32,
    centre: f32,
    feedback: f32,
    waveform: Waveform,
    phase_offset: f32,
    stages: usize,
    mix: f32,
}

impl Default for Phaser {
    fn default() -> Self {
        Self::new()
    }
}

impl Phaser {
    pub fn new() -> Self {
        Self {
            sections: [[Allpass::default(); MAX_STAGES]; 2],
            lfo: Lfo::new(),
            last: [0.0; 2],
            current_coeff: [0.0; 2],
            primed: false,
            rate: 0.0,
            depth: 0.0,
            centre: 1000.0,
            feedback: 0.0,
            waveform: Waveform::Sine,
            phase_offset: 0.0,
            stages: 4,
            mix: 0.0,
        }
    }

    fn target_coeff(&self, offset: f32, sample_rate: f32) -> f32 {
        let octaves = self.depth * SWEEP_OCTAVES * self.lfo.value(self.waveform, offset);
        Allpass::coefficient(self.centre * octaves.exp2(), sample_rate)
    }
}

impl Block for Phaser {
    fn prepare(&mut self, _ctx: &BlockContext) {
        self.reset();
    }

    fn reset(&mut self) {
        for section in self.sections.iter_mut().flatten() {
            section.reset();
        }
        self.last = [0.0; 2];
        self.lfo.reset();
        self.primed = false;
    }

    fn update(&mut self, params: &[f32], _changes: ChangeSet, _ctx: &BlockContext) {
        self.rate = params[slot::RATE];
        self.depth = params[slot::DEPTH];
        self.centre = params[slot::MANUAL];
        self.feedback = limit_feedback(params[slot::FEEDBACK]);
        self.waveform = Waveform::from_selector(params[slot::WAVEFORM]);
        self.phase_offset = params[slot::STEREO_PHASE] / 360.0;
        self.stages = (params[slot::STAGES].round() as usize).clamp(1, MAX_STAGES);
        self.mix = params[slot::MIX];
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &BlockContext) {
        let n = left.len().min(right.len());
        if n == 0 {
            return;
        }

        self.lfo.advance(self.rate, n as f32 / ctx.sample_rate);
        let targets = [
            self.target_coeff(0.0, ctx.sample_rate),
            self.target_coeff(self.phase_offset, ctx.sample_rate),
        ];
        if !self.primed {
            self.current_coeff = targets;
            self.primed = true;
        }

        let stages = self.stages;
        let feedback = self.feedback;
        let amount = self.mix;

        for (ch, buf) in [&mut left[..n], &mut right[..n]].into_iter().enumerate() {
            let start = self.current_coeff[ch];
            let step = (targets[ch] - start) / n as f32;
            let chain = &mut self.sections[ch][..stages];
            let mut last = self.last[ch];

            for (i, sample) in buf.iter_mut().enumerate() {
                let coeff = step.mul_add((i + 1) as f32, start);
                let dry = *sample;
                let mut x = feedback.mul_add(last, dry);
                for section in chain.iter_mut() {
                    x = section.process(coeff, x);
                }
                last = flush_denormal(x);
                *sample = mix(dry, x, amount);
            }

            self.last[ch] = last;
            self.current_coeff[ch] = targets[ch];
        }
    }
}
