use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShaperCurve {
    Tanh,      // Smooth, tube-like saturation
    Atan,      // Slightly harder knee than tanh, normalised to +-1
    SoftClip,  // Cubic soft clip, flat above |x| = 1
    HardClip,  // Brick-wall clamp
    SineFold,  // Wavefolder
    Cubic,     // Gentle cubic bend
}

impl ShaperCurve {
    pub const COUNT: usize = 6;

    pub fn from_selector(value: f32) -> Self {
        match value.round() as i32 {
            i32::MIN..=0 => Self::Tanh,
            1 => Self::Atan,
            2 => Self::SoftClip,
            3 => Self::HardClip,
            4 => Self::SineFold,
            _ => Self::Cubic,
        }
    }

    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Tanh => x.tanh(),
            Self::Atan => x.atan() * (2.0 / PI),
            Self::SoftClip => {
                if x > 1.0 {
                    2.0 / 3.0
                } else if x < -1.0 {
                    -2.0 / 3.0
                } else {
                    x - (x * x * x) / 3.0
                }
            }
            Self::HardClip => x.clamp(-1.0, 1.0),
            Self::SineFold => (x * PI).sin(),
            Self::Cubic => {
                let x = x.clamp(-1.5, 1.5);
                1.5f32.mul_add(x, -0.5 * x * x * x)
            }
        }
    }
}

impl std::fmt::Display for ShaperCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tanh => write!(f, "tanh"),
            Self::Atan => write!(f, "atan"),
            Self::SoftClip => write!(f, "soft clip"),
            Self::HardClip => write!(f, "hard clip"),
            Self::SineFold => write!(f, "sine fold"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// Drive the input into the curve. Asymmetry biases the negative half so it
/// clips earlier, modelling even harmonics.
#[inline]
pub fn shape(curve: ShaperCurve, input: f32, drive: f32, asymmetry: f32) -> f32 {
    let driven = input * drive;
    if driven >= 0.0 {
        curve.apply(driven)
    } else {
        curve.apply(driven * (1.0 + asymmetry.clamp(-1.0, 1.0) * 0.5))
    }
}
