//! Effect families and the blocks they are built from.

pub mod compressor;
pub mod equalizer;
pub mod gain;
pub mod graph;
pub mod instance;
pub mod lifecycle;
pub mod mod_delay;
pub mod phaser;
pub mod saturator;
pub mod schema;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::params::{ChangeSet, ParamSpec};

pub use graph::EffectGraph;
pub use instance::EffectInstance;
pub use lifecycle::{Lifecycle, LifecycleState};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EffectFamily {
    Flanger,
    Chorus,
    Phaser,
    Compressor,
    Equalizer,
    Saturator,
    Gain,
}

impl EffectFamily {
    pub const ALL: [Self; 7] = [
        Self::Flanger,
        Self::Chorus,
        Self::Phaser,
        Self::Compressor,
        Self::Equalizer,
        Self::Saturator,
        Self::Gain,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Flanger => "flanger",
            Self::Chorus => "chorus",
            Self::Phaser => "phaser",
            Self::Compressor => "compressor",
            Self::Equalizer => "equalizer",
            Self::Saturator => "saturator",
            Self::Gain => "gain",
        }
    }

    /// The family's parameter table, in slot order.
    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::Flanger => &schema::FLANGER,
            Self::Chorus => &schema::CHORUS,
            Self::Phaser => &schema::PHASER,
            Self::Compressor => &schema::COMPRESSOR,
            Self::Equalizer => &schema::EQUALIZER,
            Self::Saturator => &schema::SATURATOR,
            Self::Gain => &schema::GAIN,
        }
    }
}

impl std::fmt::Display for EffectFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|family| family.name() == wanted)
            .ok_or_else(|| format!("unknown effect family '{s}'"))
    }
}

/// Per-block information every block needs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockContext {
    pub sample_rate: f32,
}

// The contract every DSP block in a graph implements
pub trait Block: Send {
    // Size internal buffers for the sample rate. The only call allowed to allocate.
    fn prepare(&mut self, ctx: &BlockContext);

    // Zero all signal state without touching allocation
    fn reset(&mut self);

    // Pick up parameter changes, once per block, before `process`
    fn update(&mut self, params: &[f32], changes: ChangeSet, ctx: &BlockContext);

    // Process one stereo block in place
    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &BlockContext);
}

/// Tagged union of every block kind a graph can hold.
pub enum Node {
    ModDelay(mod_delay::ModDelay),
    Phaser(phaser::Phaser),
    Compressor(compressor::Compressor),
    Equalizer(equalizer::Equalizer),
    Saturator(saturator::Saturator),
    Gain(gain::GainStage),
}

impl Node {
    fn block(&mut self) -> &mut dyn Block {
        match self {
            Self::ModDelay(b) => b,
            Self::Phaser(b) => b,
            Self::Compressor(b) => b,
            Self::Equalizer(b) => b,
            Self::Saturator(b) => b,
            Self::Gain(b) => b,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ModDelay(_) => "mod_delay",
            Self::Phaser(_) => "phaser",
            Self::Compressor(_) => "compressor",
            Self::Equalizer(_) => "equalizer",
            Self::Saturator(_) => "saturator",
            Self::Gain(_) => "gain",
        }
    }
}

impl Block for Node {
    fn prepare(&mut self, ctx: &BlockContext) {
        self.block().prepare(ctx);
    }

    fn reset(&mut self) {
        self.block().reset();
    }

    #[inline]
    fn update(&mut self, params: &[f32], changes: ChangeSet, ctx: &BlockContext) {
        self.block().update(params, changes, ctx);
    }

    #[inline]
    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &BlockContext) {
        self.block().process(left, right, ctx);
    }
}
