use crate::dsp::common::mix;
use crate::dsp::dynamics::EnvelopeFollower;
use crate::dsp::filter::{Biquad, BiquadKind};
use crate::effect::gain::SmoothedGain;
use crate::effect::schema::equalizer::{self as slot, BANDS, slot as band_slot};
use crate::effect::{Block, BlockContext};
use crate::params::ChangeSet;

/// Input level at which a dynamic band reaches its full gain.
const DYNAMIC_REFERENCE: f32 = 0.5;
const DETECTOR_ATTACK_MS: f32 = 5.0;
const DETECTOR_RELEASE_MS: f32 = 120.0;

/// Which part of the stereo image the bands act on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StereoMode {
    Stereo,
    Mid,
    Side,
}

impl StereoMode {
    pub fn from_selector(value: f32) -> Self {
        match value.round() as i32 {
            i32::MIN..=0 => Self::Stereo,
            1 => Self::Mid,
            _ => Self::Side,
        }
    }
}

/// Band type selector: 0 disables the band.
pub fn band_kind(value: f32) -> Option<BiquadKind> {
    match value.round() as i32 {
        1 => Some(BiquadKind::Peak),
        2 => Some(BiquadKind::LowShelf),
        3 => Some(BiquadKind::HighShelf),
        4 => Some(BiquadKind::Lowpass),
        5 => Some(BiquadKind::Highpass),
        6 => Some(BiquadKind::Bandpass),
        7 => Some(BiquadKind::Notch),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
struct Band {
    filter: Biquad,
    kind: Option<BiquadKind>,
    freq: f32,
    q: f32,
    gain_db: f32,
    dynamic: bool,
}

/// Four-band parametric equaliser with optional level-dependent bands and
/// mid/side operation.
pub struct Equalizer {
    bands: [Band; BANDS],
    detector: EnvelopeFollower,
    master: SmoothedGain,
    wet: f32,
    mode: StereoMode,
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Equalizer {
    pub fn new() -> Self {
        Self {
            bands: std::array::from_fn(|_| Band::default()),
            detector: EnvelopeFollower::default(),
            master: SmoothedGain::default(),
            wet: 1.0,
            mode: StereoMode::Stereo,
        }
    }

    #[inline]
    fn run_bands(bands: &mut [Band; BANDS], channel: usize, input: f32) -> f32 {
        let mut x = input;
        for band in bands.iter_mut().filter(|b| b.kind.is_some()) {
            x = band.filter.process(channel, x);
        }
        x
    }

    /// Recompute band coefficients for this block. Only bands whose design
    /// actually moved pay for a redesign.
    fn configure_bands(&mut self, sample_rate: f32) {
        let level = (self.detector.value() / DYNAMIC_REFERENCE).min(1.0);
        for band in &mut self.bands {
            let Some(kind) = band.kind else {
                continue;
            };
            let gain_db = if band.dynamic {
                band.gain_db * level
            } else {
                band.gain_db
            };
            band.filter
                .configure(kind, band.freq, band.q, gain_db, sample_rate);
        }
    }

    pub fn is_clear(&self) -> bool {
        self.bands.iter().all(|b| b.filter.is_clear()) && self.detector.value() == 0.0
    }
}

impl Block for Equalizer {
    fn prepare(&mut self, ctx: &BlockContext) {
        for band in &mut self.bands {
            band.filter.invalidate();
        }
        self.detector
            .set_times(DETECTOR_ATTACK_MS, DETECTOR_RELEASE_MS, ctx.sample_rate);
        self.master.set_sample_rate(ctx.sample_rate);
        self.reset();
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            band.filter.reset();
        }
        self.detector.reset();
        self.master.reset();
    }

    fn update(&mut self, params: &[f32], changes: ChangeSet, _ctx: &BlockContext) {
        for (index, band) in self.bands.iter_mut().enumerate() {
            let slots = [
                band_slot(index, slot::FREQ),
                band_slot(index, slot::GAIN),
                band_slot(index, slot::Q),
                band_slot(index, slot::DYNAMIC),
                band_slot(index, slot::TYPE),
            ];
            if !changes.any_of(&slots) {
                continue;
            }
            band.freq = params[slots[0]];
            band.gain_db = params[slots[1]];
            band.q = params[slots[2]];
            band.dynamic = params[slots[3]] >= 0.5;
            band.kind = band_kind(params[slots[4]]);
        }

        if changes.contains(slot::MASTER) {
            self.master.set_target_db(params[slot::MASTER]);
        }
        self.wet = params[slot::WET];
        self.mode = StereoMode::from_selector(params[slot::MODE]);
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &BlockContext) {
        self.configure_bands(ctx.sample_rate);

        let bands = &mut self.bands;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (dry_l, dry_r) = (*l, *r);
            self.detector.process(dry_l.abs().max(dry_r.abs()));

            let (wet_l, wet_r) = match self.mode {
                StereoMode::Stereo => (
                    Self::run_bands(bands, 0, dry_l),
                    Self::run_bands(bands, 1, dry_r),
                ),
                StereoMode::Mid => {
                    let mid = Self::run_bands(bands, 0, 0.5 * (dry_l + dry_r));
                    let side = 0.5 * (dry_l - dry_r);
                    (mid + side, mid - side)
                }
                StereoMode::Side => {
                    let mid = 0.5 * (dry_l + dry_r);
                    let side = Self::run_bands(bands, 0, 0.5 * (dry_l - dry_r));
                    (mid + side, mid - side)
                }
            };

            let g = self.master.next();
            *l = mix(dry_l, wet_l * g, self.wet);
            *r = mix(dry_r, wet_r * g, self.wet);
        }
    }
}
