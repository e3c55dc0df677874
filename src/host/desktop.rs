use anyhow::{Context, Result};
use std::sync::Arc;

use crate::bridge::channel::{ParameterChannel, SharedChannel, SharedParameterBuffer};
use crate::effect::{EffectFamily, EffectInstance, Lifecycle};
use crate::params::{Descriptor, ParamSpec, ParamState};

/// Named, ranged parameters of a [`DesktopProcessor`]. Cheap to clone and
/// usable from any thread; writes land at the processor's next block.
#[derive(Clone)]
pub struct HostParameters {
    family: EffectFamily,
    buffer: Arc<SharedParameterBuffer>,
}

impl HostParameters {
    pub const fn family(&self) -> EffectFamily {
        self.family
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor::for_family(self.family)
    }

    fn spec(&self, id: &str) -> Result<(usize, &'static ParamSpec)> {
        self.family
            .params()
            .iter()
            .enumerate()
            .find(|(_, spec)| spec.id == id)
            .with_context(|| format!("unknown parameter '{id}' for {}", self.family))
    }

    /// Store a clamped value and return it.
    pub fn set(&self, id: &str, value: f32) -> Result<f32> {
        let (slot, spec) = self.spec(id)?;
        let clamped = spec.clamp(value);
        self.buffer.store(slot, clamped);
        Ok(clamped)
    }

    pub fn get(&self, id: &str) -> Result<f32> {
        let (slot, _) = self.spec(id)?;
        self.buffer
            .load(slot)
            .with_context(|| format!("parameter '{id}' has no slot"))
    }

    pub fn export_state(&self) -> ParamState {
        let values = self
            .family
            .params()
            .iter()
            .enumerate()
            .filter_map(|(slot, spec)| Some((spec.id.to_string(), self.buffer.load(slot)?)))
            .collect();
        ParamState {
            family: self.family,
            values,
        }
    }

    /// Apply every known id in `state`. Returns how many were applied.
    pub fn restore_state(&self, state: &ParamState) -> Result<usize> {
        if state.family != self.family {
            anyhow::bail!(
                "parameter state for {} cannot be restored into {}",
                state.family,
                self.family
            );
        }
        Ok(state
            .values
            .iter()
            .filter(|(id, v)| self.set(id, **v).is_ok())
            .count())
    }

    fn restore_defaults(&self) {
        for (slot, spec) in self.family.params().iter().enumerate() {
            self.buffer.store(slot, spec.default);
        }
    }
}

/// Block-callback host adapter. The host picks the block size on every call;
/// blocks longer than `max_block` are split so the effect never sees more
/// than it was prepared for.
pub struct DesktopProcessor {
    instance: EffectInstance,
    params: HostParameters,
    channel: SharedChannel,
    max_block: usize,
    /// Stand-in right channel for mono hosts.
    scratch: Vec<f32>,
}

impl DesktopProcessor {
    pub fn new(family: EffectFamily) -> Result<Self> {
        let defaults: Vec<f32> = family.params().iter().map(|p| p.default).collect();
        let buffer = Arc::new(SharedParameterBuffer::new(&defaults));
        let channel = SharedChannel::new(Arc::clone(&buffer), (0..defaults.len()).collect())?;

        Ok(Self {
            instance: EffectInstance::new(family),
            params: HostParameters { family, buffer },
            channel,
            max_block: 0,
            scratch: Vec::new(),
        })
    }

    pub const fn family(&self) -> EffectFamily {
        self.instance.family()
    }

    pub fn parameters(&self) -> HostParameters {
        self.params.clone()
    }

    pub const fn max_block(&self) -> usize {
        self.max_block
    }

    pub fn is_prepared(&self) -> bool {
        self.instance.is_prepared()
    }

    /// Parameter values the effect is currently running with.
    pub fn applied(&self, id: &str) -> Option<f32> {
        self.instance.get_parameter_by_id(id)
    }

    pub fn prepare(&mut self, sample_rate: f32, max_block: usize) -> Result<()> {
        if max_block == 0 {
            anyhow::bail!("maximum block size must be at least one sample");
        }
        self.instance
            .prepare(sample_rate)
            .context("Failed to prepare effect")?;
        self.max_block = max_block;
        self.scratch = vec![0.0; max_block];
        self.channel.resync();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.instance.reset();
    }

    /// Release everything `prepare` built and return parameters to defaults.
    pub fn release(&mut self) {
        self.instance.destroy();
        self.params.restore_defaults();
        self.channel.resync();
        self.max_block = 0;
        self.scratch = Vec::new();
    }

    /// Process one host block in place. Mono hosts get the left output;
    /// channels past the second pass through untouched. Before `prepare`
    /// the block is left as is.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        if self.max_block == 0 {
            return;
        }

        let instance = &mut self.instance;
        self.channel.drain(&mut |index, value| {
            instance.set_parameter(index, value);
        });

        let max_block = self.max_block;
        match channels {
            [] => {}
            [mono] => {
                for chunk in mono.chunks_mut(max_block) {
                    let right = &mut self.scratch[..chunk.len()];
                    right.copy_from_slice(chunk);
                    self.instance.process(chunk, right);
                }
            }
            [left, right, ..] => {
                for (l, r) in left.chunks_mut(max_block).zip(right.chunks_mut(max_block)) {
                    self.instance.process(l, r);
                }
            }
        }
    }
}
