use crate::dsp::common::{flush_denormal, limit_feedback, mix, ms_to_samples};
use crate::dsp::delay_line::DelayLine;
use crate::dsp::filter::{OnePole, OnePoleMode};
use crate::dsp::lfo::{Lfo, Waveform};
use crate::effect::schema::{FLANGER, MOD_DELAY_MAX_MS, mod_delay as slot};
use crate::effect::{Block, BlockContext};
use crate::params::ChangeSet;

/// Room for both interpolation taps beyond the longest modulated delay.
const CAPACITY_PADDING: usize = 4;

/// LFO-modulated delay with feedback, shared by the flanger and chorus.
///
/// The delay target is computed once per block from the LFO and ramped
/// linearly across the block from where the previous block ended. Both
/// channels share one LFO; the right channel reads it `stereo_phase` degrees
/// ahead.
pub struct ModDelay {
    lines: [DelayLine; 2],
    lfo: Lfo,
    highpass: [OnePole; 2],
    lowpass: [OnePole; 2],
    highpass_active: bool,
    lowpass_active: bool,

    rate: f32,
    depth: f32,
    manual: f32,
    feedback: f32,
    waveform: Waveform,
    phase_offset: f32,
    mix: f32,

    current_delay: [f32; 2],
    primed: bool,
}

impl Default for ModDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ModDelay {
    pub fn new() -> Self {
        Self {
            lines: [DelayLine::default(), DelayLine::default()],
            lfo: Lfo::new(),
            highpass: std::array::from_fn(|_| OnePole::new(OnePoleMode::Highpass, 20.0, 48_000.0)),
            lowpass: std::array::from_fn(|_| {
                OnePole::new(OnePoleMode::Lowpass, 20_000.0, 48_000.0)
            }),
            highpass_active: false,
            lowpass_active: false,
            rate: 0.0,
            depth: 0.0,
            manual: 1.0,
            feedback: 0.0,
            waveform: Waveform::Sine,
            phase_offset: 0.0,
            mix: 0.0,
            current_delay: [1.0; 2],
            primed: false,
        }
    }

    /// Delay capacity in samples for a sample rate.
    pub fn capacity_for(sample_rate: f32) -> usize {
        ms_to_samples(MOD_DELAY_MAX_MS, sample_rate).ceil() as usize + CAPACITY_PADDING
    }

    pub fn capacity(&self) -> usize {
        self.lines[0].capacity()
    }

    fn target_delay(&self, offset: f32) -> f32 {
        let modulated = self
            .depth
            .mul_add(self.lfo.value(self.waveform, offset), self.manual);
        modulated.clamp(1.0, self.lines[0].max_delay().max(1.0))
    }
}

impl Block for ModDelay {
    fn prepare(&mut self, ctx: &BlockContext) {
        let capacity = Self::capacity_for(ctx.sample_rate);
        for line in &mut self.lines {
            line.resize(capacity);
        }
        for hp in &mut self.highpass {
            *hp = OnePole::new(OnePoleMode::Highpass, hp.cutoff(), ctx.sample_rate);
        }
        for lp in &mut self.lowpass {
            *lp = OnePole::new(OnePoleMode::Lowpass, lp.cutoff(), ctx.sample_rate);
        }
        self.reset();
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for filter in self.highpass.iter_mut().chain(self.lowpass.iter_mut()) {
            filter.reset();
        }
        self.lfo.reset();
        self.primed = false;
    }

    fn update(&mut self, params: &[f32], changes: ChangeSet, ctx: &BlockContext) {
        let sr = ctx.sample_rate;

        self.rate = params[slot::RATE];
        self.depth = ms_to_samples(params[slot::DEPTH], sr);
        self.manual = ms_to_samples(params[slot::MANUAL], sr);
        self.feedback = limit_feedback(params[slot::FEEDBACK]);
        self.waveform = Waveform::from_selector(params[slot::WAVEFORM]);
        self.phase_offset = params[slot::STEREO_PHASE] / 360.0;
        self.mix = params[slot::MIX];

        if changes.contains(slot::HIGHPASS) {
            let cutoff = params[slot::HIGHPASS];
            let active = cutoff > FLANGER[slot::HIGHPASS].min;
            for hp in &mut self.highpass {
                hp.set_cutoff(cutoff, sr);
                if active && !self.highpass_active {
                    hp.reset();
                }
            }
            self.highpass_active = active;
        }

        if changes.contains(slot::LOWPASS) {
            let cutoff = params[slot::LOWPASS];
            let active = cutoff < FLANGER[slot::LOWPASS].max;
            for lp in &mut self.lowpass {
                lp.set_cutoff(cutoff, sr);
                if active && !self.lowpass_active {
                    lp.reset();
                }
            }
            self.lowpass_active = active;
        }
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &BlockContext) {
        let n = left.len().min(right.len());
        if n == 0 || self.lines[0].capacity() == 0 {
            return;
        }

        self.lfo.advance(self.rate, n as f32 / ctx.sample_rate);
        let targets = [self.target_delay(0.0), self.target_delay(self.phase_offset)];
        if !self.primed {
            self.current_delay = targets;
            self.primed = true;
        }

        let feedback = self.feedback;
        let amount = self.mix;

        for (ch, buf) in [&mut left[..n], &mut right[..n]].into_iter().enumerate() {
            let start = self.current_delay[ch];
            let step = (targets[ch] - start) / n as f32;
            let line = &mut self.lines[ch];
            let hp = &mut self.highpass[ch];
            let lp = &mut self.lowpass[ch];

            for (i, sample) in buf.iter_mut().enumerate() {
                let delay = step.mul_add((i + 1) as f32, start);
                let dry = *sample;
                let delayed = line.read(delay);
                line.write(flush_denormal(feedback.mul_add(delayed, dry)));

                let mut wet = delayed;
                if self.highpass_active {
                    wet = hp.process(wet);
                }
                if self.lowpass_active {
                    wet = lp.process(wet);
                }
                *sample = mix(dry, wet, amount);
            }

            self.current_delay[ch] = targets[ch];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterStore;

    const CTX: BlockContext = BlockContext {
        sample_rate: 48_000.0,
    };

    fn prepared(setup: impl FnOnce(&mut ParameterStore)) -> (ModDelay, ParameterStore) {
        let mut store = ParameterStore::new(&FLANGER);
        setup(&mut store);
        let mut block = ModDelay::new();
        block.prepare(&CTX);
        let changes = store.take_changes();
        block.update(store.values(), changes, &CTX);
        (block, store)
    }

    fn static_delay(store: &mut ParameterStore) {
        store.set(slot::RATE, 0.0);
        store.set(slot::DEPTH, 0.0);
        store.set(slot::MANUAL, 10.0);
        store.set(slot::FEEDBACK, 0.0);
        store.set(slot::MIX, 1.0);
    }

    #[test]
    fn capacity_covers_longest_delay() {
        let capacity = ModDelay::capacity_for(48_000.0);
        assert!(capacity as f32 >= ms_to_samples(MOD_DELAY_MAX_MS, 48_000.0) + 2.0);
    }

    #[test]
    fn static_delay_places_impulse_exactly() {
        let (mut block, _) = prepared(static_delay);
        let mut left = vec![0.0; 1024];
        let mut right = vec![0.0; 1024];
        left[0] = 1.0;
        right[0] = 1.0;
        block.process(&mut left, &mut right, &CTX);

        for (i, (&l, &r)) in left.iter().zip(&right).enumerate() {
            let expected = if i == 480 { 1.0 } else { 0.0 };
            assert_eq!(l, expected, "left sample {i}");
            assert_eq!(r, expected, "right sample {i}");
        }
    }

    #[test]
    fn dry_mix_is_transparent() {
        let (mut block, _) = prepared(|s| {
            s.set(slot::MIX, 0.0);
        });
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        block.process(&mut left, &mut right, &CTX);
        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn block_size_does_not_change_static_output() {
        let render = |block_size: usize| {
            let (mut block, _) = prepared(|s| {
                static_delay(s);
                s.set(slot::FEEDBACK, 0.5);
            });
            let mut left = vec![0.0; 2048];
            left[3] = 1.0;
            let mut right = left.clone();
            for (l, r) in left.chunks_mut(block_size).zip(right.chunks_mut(block_size)) {
                block.process(l, r, &CTX);
            }
            left
        };
        assert_eq!(render(128), render(37));
    }

    #[test]
    fn feedback_is_limited_below_unity() {
        let (mut block, _) = prepared(|s| {
            static_delay(s);
            s.set(slot::MANUAL, 1.0);
            s.set(slot::FEEDBACK, 0.95);
        });
        let mut left = vec![0.0; 48_000];
        left[0] = 1.0;
        let mut right = left.clone();
        for (l, r) in left.chunks_mut(128).zip(right.chunks_mut(128)) {
            block.process(l, r, &CTX);
        }
        let tail = left[47_000..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(tail < 1e-3, "feedback should decay, tail peak {tail}");
    }

    #[test]
    fn modulation_stays_finite() {
        let (mut block, _) = prepared(|s| {
            s.set(slot::RATE, 10.0);
            s.set(slot::DEPTH, 10.0);
            s.set(slot::MANUAL, 0.1);
            s.set(slot::FEEDBACK, -0.95);
            s.set(slot::WAVEFORM, 3.0);
            s.set(slot::HIGHPASS, 500.0);
            s.set(slot::LOWPASS, 3000.0);
        });
        let mut left: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut right = left.clone();
        for (l, r) in left.chunks_mut(128).zip(right.chunks_mut(128)) {
            block.process(l, r, &CTX);
        }
        assert!(left.iter().chain(&right).all(|s| s.is_finite()));
    }

    #[test]
    fn reset_clears_the_lines() {
        let (mut block, _) = prepared(static_delay);
        let mut left = vec![0.7; 128];
        let mut right = vec![0.7; 128];
        block.process(&mut left, &mut right, &CTX);
        assert!(!block.lines[0].is_silent());

        block.reset();
        assert!(block.lines.iter().all(DelayLine::is_silent));
        assert_eq!(block.lfo.phase(), 0.0);
    }
}
