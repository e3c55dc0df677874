use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

const MIN_FREQ_HZ: f32 = 10.0;
const MIN_Q: f32 = 0.1;
const MAX_Q: f32 = 30.0;

/// Highest usable centre/cutoff frequency for a sample rate.
#[inline]
pub fn max_frequency(sample_rate: f32) -> f32 {
    sample_rate * 0.49
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OnePoleMode {
    Highpass,
    Lowpass,
}

/// First-order RC filter.
#[derive(Debug, Clone)]
pub struct OnePole {
    mode: OnePoleMode,
    cutoff: f32,
    alpha: f32,
    prev_input: f32,
    prev_output: f32,
}

impl OnePole {
    /// Minimum cutoff to avoid division-by-zero in the RC calculation.
    const MIN_CUTOFF_HZ: f32 = 0.1;

    fn compute_alpha(mode: OnePoleMode, cutoff: f32, sample_rate: f32) -> f32 {
        let rc = 1.0 / (2.0 * PI * cutoff.max(Self::MIN_CUTOFF_HZ));
        let dt = 1.0 / sample_rate;
        match mode {
            OnePoleMode::Highpass => rc / (rc + dt),
            OnePoleMode::Lowpass => dt / (rc + dt),
        }
    }

    pub fn new(mode: OnePoleMode, cutoff: f32, sample_rate: f32) -> Self {
        Self {
            mode,
            cutoff,
            alpha: Self::compute_alpha(mode, cutoff, sample_rate),
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    /// Recompute alpha only when the cutoff actually moved. State is kept.
    pub fn set_cutoff(&mut self, cutoff: f32, sample_rate: f32) {
        if cutoff != self.cutoff {
            self.cutoff = cutoff;
            self.alpha = Self::compute_alpha(self.mode, cutoff, sample_rate);
        }
    }

    pub const fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub const fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_output = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self.mode {
            OnePoleMode::Highpass => {
                let output = self.alpha * (self.prev_output + input - self.prev_input);
                self.prev_input = input;
                self.prev_output = output;
                output
            }
            OnePoleMode::Lowpass => {
                let output = self
                    .alpha
                    .mul_add(input - self.prev_output, self.prev_output);
                self.prev_output = output;
                output
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BiquadKind {
    Peak,
    LowShelf,
    HighShelf,
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

impl BiquadKind {
    /// Whether the gain parameter has any effect on this design.
    pub const fn uses_gain(self) -> bool {
        matches!(self, Self::Peak | Self::LowShelf | Self::HighShelf)
    }
}

/// Normalised biquad coefficients (a0 == 1).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Audio EQ Cookbook designs. Frequency and Q are clamped into a range that
    /// keeps the poles inside the unit circle for every kind.
    pub fn design(kind: BiquadKind, freq: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let freq = f64::from(freq.clamp(MIN_FREQ_HZ, max_frequency(sample_rate)));
        let q = f64::from(q.clamp(MIN_Q, MAX_Q));
        let gain_db = f64::from(gain_db);
        let sample_rate = f64::from(sample_rate);

        let w0 = 2.0 * std::f64::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a = 10f64.powf(gain_db / 40.0);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let (b0, b1, b2, a0, a1, a2) = match kind {
            BiquadKind::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            BiquadKind::LowShelf => (
                a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            ),
            BiquadKind::HighShelf => (
                a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            ),
            BiquadKind::Lowpass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadKind::Highpass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadKind::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha),
            BiquadKind::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
        };

        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }
}

/// Direct Form II Transposed registers for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    z1: f32,
    z2: f32,
}

impl BiquadState {
    #[inline]
    pub fn process(&mut self, c: &BiquadCoefficients, input: f32) -> f32 {
        let output = c.b0.mul_add(input, self.z1);
        self.z1 = c.b1.mul_add(input, -c.a1 * output) + self.z2;
        self.z2 = c.b2.mul_add(input, -c.a2 * output);
        output
    }

    pub const fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    pub const fn is_clear(&self) -> bool {
        self.z1 == 0.0 && self.z2 == 0.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct BiquadDesign {
    kind: BiquadKind,
    freq: f32,
    q: f32,
    gain_db: f32,
}

/// Stereo biquad section that recomputes coefficients lazily.
///
/// `configure` is cheap when nothing changed. State registers survive a
/// coefficient change and are only cleared by `reset`.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoefficients,
    state: [BiquadState; 2],
    design: Option<BiquadDesign>,
}

impl Biquad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the coefficients were recomputed.
    pub fn configure(
        &mut self,
        kind: BiquadKind,
        freq: f32,
        q: f32,
        gain_db: f32,
        sample_rate: f32,
    ) -> bool {
        let design = BiquadDesign {
            kind,
            freq,
            q,
            gain_db,
        };
        if self.design == Some(design) {
            return false;
        }
        self.coeffs = BiquadCoefficients::design(kind, freq, q, gain_db, sample_rate);
        self.design = Some(design);
        true
    }

    /// Forget the cached design so the next `configure` recomputes, e.g. after
    /// a sample-rate change.
    pub const fn invalidate(&mut self) {
        self.design = None;
    }

    pub const fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }

    #[inline]
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        self.state[channel & 1].process(&self.coeffs, input)
    }

    pub fn reset(&mut self) {
        for s in &mut self.state {
            s.reset();
        }
    }

    pub fn is_clear(&self) -> bool {
        self.state.iter().all(BiquadState::is_clear)
    }
}

/// First-order allpass section, the building block of a phaser sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct Allpass {
    x1: f32,
    y1: f32,
}

impl Allpass {
    /// Coefficient placing the 90 degree phase point at `freq`.
    #[inline]
    pub fn coefficient(freq: f32, sample_rate: f32) -> f32 {
        let freq = freq.clamp(MIN_FREQ_HZ, max_frequency(sample_rate));
        let t = (PI * freq / sample_rate).tan();
        (t - 1.0) / (t + 1.0)
    }

    #[inline]
    pub fn process(&mut self, coeff: f32, input: f32) -> f32 {
        let output = coeff.mul_add(input, self.x1) - coeff * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }

    pub const fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}
