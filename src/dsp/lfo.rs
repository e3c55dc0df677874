use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// LFO shapes, selected by a continuous parameter rounded to the nearest index.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Saw,
}

impl Waveform {
    pub const COUNT: usize = 4;

    pub fn from_selector(value: f32) -> Self {
        match value.round() as i32 {
            i32::MIN..=0 => Self::Sine,
            1 => Self::Triangle,
            2 => Self::Square,
            _ => Self::Saw,
        }
    }

    /// Bipolar output in [-1, 1] for a phase in [0, 1).
    #[inline]
    pub fn value(self, phase: f32) -> f32 {
        match self {
            Self::Sine => (TAU * phase).sin(),
            Self::Triangle => 4.0f32.mul_add(-(phase - 0.5).abs(), 1.0),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Saw => 2.0f32.mul_add(phase, -1.0),
        }
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sine => write!(f, "sine"),
            Self::Triangle => write!(f, "triangle"),
            Self::Square => write!(f, "square"),
            Self::Saw => write!(f, "saw"),
        }
    }
}

/// Phase accumulator in [0, 1).
///
/// The accumulator only ever moves forward by `rate * elapsed`, so a rate
/// change alters the slope of the phase but never its position.
#[derive(Debug, Clone, Default)]
pub struct Lfo {
    phase: f32,
}

impl Lfo {
    pub const fn new() -> Self {
        Self { phase: 0.0 }
    }

    pub const fn phase(&self) -> f32 {
        self.phase
    }

    pub const fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Advance by `rate_hz * seconds` cycles. A zero rate freezes the phase.
    #[inline]
    pub fn advance(&mut self, rate_hz: f32, seconds: f32) {
        let step = rate_hz * seconds;
        if step.is_finite() {
            self.phase = (self.phase + step).rem_euclid(1.0);
        }
    }

    /// Waveform value at the current phase shifted by `offset` cycles.
    #[inline]
    pub fn value(&self, waveform: Waveform, offset: f32) -> f32 {
        waveform.value((self.phase + offset).rem_euclid(1.0))
    }
}
