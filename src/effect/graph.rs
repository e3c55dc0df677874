use crate::dsp::common::sanitize_block;
use crate::effect::compressor::Compressor;
use crate::effect::equalizer::Equalizer;
use crate::effect::gain::GainStage;
use crate::effect::mod_delay::ModDelay;
use crate::effect::phaser::Phaser;
use crate::effect::saturator::Saturator;
use crate::effect::schema;
use crate::effect::{Block, BlockContext, EffectFamily, Node};
use crate::params::ChangeSet;

/// Fixed pipeline of blocks for one family, ending in the output sanitizer.
pub struct EffectGraph {
    nodes: Vec<Node>,
}

impl EffectGraph {
    pub fn for_family(family: EffectFamily) -> Self {
        let nodes = match family {
            EffectFamily::Flanger | EffectFamily::Chorus => vec![
                Node::ModDelay(ModDelay::new()),
                Node::Gain(GainStage::new(schema::mod_delay::OUTPUT)),
            ],
            EffectFamily::Phaser => vec![
                Node::Phaser(Phaser::new()),
                Node::Gain(GainStage::new(schema::phaser::OUTPUT)),
            ],
            EffectFamily::Compressor => vec![Node::Compressor(Compressor::new())],
            EffectFamily::Equalizer => vec![Node::Equalizer(Equalizer::new())],
            EffectFamily::Saturator => vec![
                Node::Saturator(Saturator::new()),
                Node::Gain(GainStage::new(schema::saturator::OUTPUT)),
            ],
            EffectFamily::Gain => vec![Node::Gain(GainStage::new(schema::gain::GAIN))],
        };

        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn prepare(&mut self, ctx: &BlockContext) {
        for node in &mut self.nodes {
            node.prepare(ctx);
        }
    }

    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }

    /// Run one block: every node picks up the pending parameter changes, then
    /// the signal flows through the nodes in order and is sanitized.
    pub fn process(
        &mut self,
        params: &[f32],
        changes: ChangeSet,
        left: &mut [f32],
        right: &mut [f32],
        ctx: &BlockContext,
    ) {
        for node in &mut self.nodes {
            node.update(params, changes, ctx);
        }

        for node in &mut self.nodes {
            node.process(left, right, ctx);
        }

        sanitize_block(left);
        sanitize_block(right);
    }
}
