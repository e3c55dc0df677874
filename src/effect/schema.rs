//! Per-family parameter tables.
//!
//! Table order is the slot order everywhere else: the change bitmask, the
//! descriptor handed to the control side and the shared parameter buffer.

use crate::params::{ParamSpec, Unit};

/// Longest centre delay plus full modulation depth of the modulation-delay
/// tables, in milliseconds.
pub const MOD_DELAY_MAX_MS: f32 = 40.0;

/// Slot indices shared by the flanger and chorus tables.
pub mod mod_delay {
    pub const RATE: usize = 0;
    pub const DEPTH: usize = 1;
    pub const MANUAL: usize = 2;
    pub const FEEDBACK: usize = 3;
    pub const WAVEFORM: usize = 4;
    pub const STEREO_PHASE: usize = 5;
    pub const MIX: usize = 6;
    pub const HIGHPASS: usize = 7;
    pub const LOWPASS: usize = 8;
    pub const OUTPUT: usize = 9;
}

pub static FLANGER: [ParamSpec; 10] = [
    ParamSpec::new("rate", "Rate", Unit::Hertz, 0.0, 10.0, 0.25),
    ParamSpec::new("depth", "Depth", Unit::Milliseconds, 0.0, 10.0, 2.0),
    ParamSpec::new("manual", "Manual", Unit::Milliseconds, 0.1, 30.0, 3.0),
    ParamSpec::new("feedback", "Feedback", Unit::None, -0.95, 0.95, 0.5),
    ParamSpec::new("waveform", "Waveform", Unit::None, 0.0, 3.0, 1.0),
    ParamSpec::new("stereo_phase", "Stereo Phase", Unit::Degrees, 0.0, 180.0, 90.0),
    ParamSpec::new("mix", "Mix", Unit::Percent, 0.0, 1.0, 0.5),
    ParamSpec::new("highpass", "Wet Highpass", Unit::Hertz, 20.0, 2000.0, 20.0),
    ParamSpec::new("lowpass", "Wet Lowpass", Unit::Hertz, 1000.0, 20000.0, 20000.0),
    ParamSpec::new("output", "Output", Unit::Decibels, -24.0, 12.0, 0.0),
];

pub static CHORUS: [ParamSpec; 10] = [
    ParamSpec::new("rate", "Rate", Unit::Hertz, 0.0, 10.0, 0.8),
    ParamSpec::new("depth", "Depth", Unit::Milliseconds, 0.0, 10.0, 3.0),
    ParamSpec::new("manual", "Manual", Unit::Milliseconds, 0.1, 30.0, 15.0),
    ParamSpec::new("feedback", "Feedback", Unit::None, -0.95, 0.95, 0.0),
    ParamSpec::new("waveform", "Waveform", Unit::None, 0.0, 3.0, 0.0),
    ParamSpec::new("stereo_phase", "Stereo Phase", Unit::Degrees, 0.0, 180.0, 120.0),
    ParamSpec::new("mix", "Mix", Unit::Percent, 0.0, 1.0, 0.5),
    ParamSpec::new("highpass", "Wet Highpass", Unit::Hertz, 20.0, 2000.0, 20.0),
    ParamSpec::new("lowpass", "Wet Lowpass", Unit::Hertz, 1000.0, 20000.0, 20000.0),
    ParamSpec::new("output", "Output", Unit::Decibels, -24.0, 12.0, 0.0),
];

pub mod phaser {
    pub const RATE: usize = 0;
    pub const DEPTH: usize = 1;
    pub const MANUAL: usize = 2;
    pub const FEEDBACK: usize = 3;
    pub const WAVEFORM: usize = 4;
    pub const STEREO_PHASE: usize = 5;
    pub const STAGES: usize = 6;
    pub const MIX: usize = 7;
    pub const OUTPUT: usize = 8;
}

pub static PHASER: [ParamSpec; 9] = [
    ParamSpec::new("rate", "Rate", Unit::Hertz, 0.0, 10.0, 0.5),
    ParamSpec::new("depth", "Depth", Unit::Percent, 0.0, 1.0, 0.7),
    ParamSpec::new("manual", "Centre", Unit::Hertz, 100.0, 4000.0, 800.0),
    ParamSpec::new("feedback", "Feedback", Unit::None, -0.95, 0.95, 0.3),
    ParamSpec::new("waveform", "Waveform", Unit::None, 0.0, 3.0, 0.0),
    ParamSpec::new("stereo_phase", "Stereo Phase", Unit::Degrees, 0.0, 180.0, 90.0),
    ParamSpec::new("stages", "Stages", Unit::None, 2.0, 12.0, 4.0),
    ParamSpec::new("mix", "Mix", Unit::Percent, 0.0, 1.0, 0.5),
    ParamSpec::new("output", "Output", Unit::Decibels, -24.0, 12.0, 0.0),
];

pub mod compressor {
    pub const SUSTAIN: usize = 0;
    pub const SENSITIVITY: usize = 1;
}

pub static COMPRESSOR: [ParamSpec; 2] = [
    ParamSpec::new("sustain", "Sustain", Unit::Percent, 0.0, 1.0, 0.5),
    ParamSpec::new("sensitivity", "Sensitivity", Unit::Percent, 0.0, 1.0, 0.5),
];

pub mod equalizer {
    pub const BANDS: usize = 4;
    pub const PER_BAND: usize = 5;

    pub const FREQ: usize = 0;
    pub const GAIN: usize = 1;
    pub const Q: usize = 2;
    pub const DYNAMIC: usize = 3;
    pub const TYPE: usize = 4;

    pub const MASTER: usize = BANDS * PER_BAND;
    pub const WET: usize = MASTER + 1;
    pub const MODE: usize = MASTER + 2;

    /// Slot of `field` for band `band`.
    pub const fn slot(band: usize, field: usize) -> usize {
        band * PER_BAND + field
    }
}

macro_rules! eq_band {
    ($n:literal, $freq:expr, $kind:expr) => {
        [
            ParamSpec::new(
                concat!("band", $n, "_freq"),
                concat!("Band ", $n, " Frequency"),
                Unit::Hertz,
                20.0,
                20000.0,
                $freq,
            ),
            ParamSpec::new(
                concat!("band", $n, "_gain"),
                concat!("Band ", $n, " Gain"),
                Unit::Decibels,
                -24.0,
                24.0,
                0.0,
            ),
            ParamSpec::new(
                concat!("band", $n, "_q"),
                concat!("Band ", $n, " Q"),
                Unit::None,
                0.1,
                10.0,
                0.707,
            ),
            ParamSpec::new(
                concat!("band", $n, "_dynamic"),
                concat!("Band ", $n, " Dynamic"),
                Unit::None,
                0.0,
                1.0,
                0.0,
            ),
            ParamSpec::new(
                concat!("band", $n, "_type"),
                concat!("Band ", $n, " Type"),
                Unit::None,
                0.0,
                7.0,
                $kind,
            ),
        ]
    };
}

const EQ_BAND_1: [ParamSpec; 5] = eq_band!("1", 100.0, 2.0);
const EQ_BAND_2: [ParamSpec; 5] = eq_band!("2", 500.0, 1.0);
const EQ_BAND_3: [ParamSpec; 5] = eq_band!("3", 2000.0, 1.0);
const EQ_BAND_4: [ParamSpec; 5] = eq_band!("4", 8000.0, 3.0);

pub static EQUALIZER: [ParamSpec; 23] = [
    EQ_BAND_1[0],
    EQ_BAND_1[1],
    EQ_BAND_1[2],
    EQ_BAND_1[3],
    EQ_BAND_1[4],
    EQ_BAND_2[0],
    EQ_BAND_2[1],
    EQ_BAND_2[2],
    EQ_BAND_2[3],
    EQ_BAND_2[4],
    EQ_BAND_3[0],
    EQ_BAND_3[1],
    EQ_BAND_3[2],
    EQ_BAND_3[3],
    EQ_BAND_3[4],
    EQ_BAND_4[0],
    EQ_BAND_4[1],
    EQ_BAND_4[2],
    EQ_BAND_4[3],
    EQ_BAND_4[4],
    ParamSpec::new("master", "Master", Unit::Decibels, -24.0, 12.0, 0.0),
    ParamSpec::new("wet", "Wet", Unit::Percent, 0.0, 1.0, 1.0),
    ParamSpec::new("mode", "Mode", Unit::None, 0.0, 2.0, 0.0),
];

pub mod saturator {
    pub const DRIVE: usize = 0;
    pub const SHAPE: usize = 1;
    pub const ASYMMETRY: usize = 2;
    pub const MIX: usize = 3;
    pub const OUTPUT: usize = 4;
}

pub static SATURATOR: [ParamSpec; 5] = [
    ParamSpec::new("drive", "Drive", Unit::Percent, 0.0, 1.0, 0.5),
    ParamSpec::new("shape", "Shape", Unit::None, 0.0, 5.0, 0.0),
    ParamSpec::new("asymmetry", "Asymmetry", Unit::None, -1.0, 1.0, 0.0),
    ParamSpec::new("mix", "Mix", Unit::Percent, 0.0, 1.0, 1.0),
    ParamSpec::new("output", "Output", Unit::Decibels, -24.0, 12.0, 0.0),
];

pub mod gain {
    pub const GAIN: usize = 0;
}

pub static GAIN: [ParamSpec; 1] = [ParamSpec::new(
    "gain",
    "Gain",
    Unit::Decibels,
    -24.0,
    24.0,
    0.0,
)];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MAX_PARAMS;

    fn all_tables() -> [&'static [ParamSpec]; 7] {
        [
            &FLANGER,
            &CHORUS,
            &PHASER,
            &COMPRESSOR,
            &EQUALIZER,
            &SATURATOR,
            &GAIN,
        ]
    }

    #[test]
    fn defaults_sit_inside_ranges() {
        for table in all_tables() {
            assert!(table.len() <= MAX_PARAMS);
            for spec in table {
                assert!(spec.min < spec.max, "{} has an empty range", spec.id);
                assert!(
                    (spec.min..=spec.max).contains(&spec.default),
                    "{} default out of range",
                    spec.id
                );
            }
        }
    }

    #[test]
    fn ids_are_unique_per_table() {
        for table in all_tables() {
            for (i, a) in table.iter().enumerate() {
                for b in &table[i + 1..] {
                    assert_ne!(a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn slot_constants_match_ids() {
        assert_eq!(FLANGER[mod_delay::MANUAL].id, "manual");
        assert_eq!(CHORUS[mod_delay::OUTPUT].id, "output");
        assert_eq!(PHASER[phaser::STAGES].id, "stages");
        assert_eq!(EQUALIZER[equalizer::slot(2, equalizer::Q)].id, "band3_q");
        assert_eq!(EQUALIZER[equalizer::MODE].id, "mode");
        assert_eq!(SATURATOR[saturator::OUTPUT].id, "output");
    }

    #[test]
    fn modulation_range_fits_delay_budget() {
        let longest = FLANGER[mod_delay::MANUAL].max + FLANGER[mod_delay::DEPTH].max;
        assert!(longest <= MOD_DELAY_MAX_MS);
    }
}
