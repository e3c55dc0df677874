use crate::dsp::common::calculate_coefficient;

/// One-pole envelope follower with separate attack and release coefficients.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl EnvelopeFollower {
    /// Create from pre-computed coefficients.
    pub const fn new(attack_coeff: f32, release_coeff: f32) -> Self {
        Self {
            envelope: 0.0,
            attack_coeff,
            release_coeff,
        }
    }

    /// Create from attack/release times in milliseconds.
    pub fn from_ms(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self::new(
            calculate_coefficient(attack_ms, sample_rate),
            calculate_coefficient(release_ms, sample_rate),
        )
    }

    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32, sample_rate: f32) {
        self.attack_coeff = calculate_coefficient(attack_ms, sample_rate);
        self.release_coeff = calculate_coefficient(release_ms, sample_rate);
    }

    pub const fn value(&self) -> f32 {
        self.envelope
    }

    pub const fn reset(&mut self) {
        self.envelope = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let abs_input = input.abs();
        let coeff = if abs_input > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff.mul_add(self.envelope, (1.0 - coeff) * abs_input);
        self.envelope
    }
}

/// Static compression curve: linear gain factor for an envelope level against
/// a linear threshold. Unity below the threshold.
#[inline]
pub fn compression_gain(envelope: f32, threshold: f32, ratio: f32) -> f32 {
    let over_threshold = (envelope / threshold).max(1.0);
    if over_threshold > 1.0 {
        over_threshold.powf(ratio.max(1.0).recip() - 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn envelope_rises_faster_than_it_falls() {
        let mut env = EnvelopeFollower::from_ms(1.0, 100.0, SR);
        for _ in 0..480 {
            env.process(1.0);
        }
        let peak = env.value();
        assert!(peak > 0.99, "attack should settle in 10 attack constants, got {peak}");

        for _ in 0..480 {
            env.process(0.0);
        }
        assert!(env.value() > 0.85, "release should be slow, got {}", env.value());
    }

    #[test]
    fn reset_clears_envelope() {
        let mut env = EnvelopeFollower::from_ms(1.0, 2.0, SR);
        env.process(0.8);
        env.reset();
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn compression_curve() {
        assert_eq!(compression_gain(0.05, 0.1, 4.0), 1.0);
        // 20 dB over threshold at 10:1 keeps 2 dB, so 18 dB of reduction.
        let g = compression_gain(1.0, 0.1, 10.0);
        assert!((crate::dsp::common::lin_to_db(g) + 18.0).abs() < 1e-3);
        // 1:1 never reduces.
        assert!((compression_gain(1.0, 0.1, 1.0) - 1.0).abs() < 1e-6);
    }
}
