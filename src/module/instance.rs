use anyhow::{Context, Result};
use log::debug;

use crate::effect::{EffectFamily, EffectInstance, Lifecycle, LifecycleState};
use crate::module::image::ModuleImage;
use crate::module::memory::{LinearMemory, QuantumLayout};
use crate::params::{Descriptor, ParamState};

/// A named entry point of the export surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Export {
    Prepare,
    Reset,
    Destroy,
    Process,
    Set(usize),
    Get(usize),
}

/// One instantiated module: an effect instance plus the fixed linear memory
/// that audio is exchanged through.
///
/// Everything is allocated in [`ModuleInstance::instantiate`]; the export
/// calls after that never allocate.
pub struct ModuleInstance {
    image: ModuleImage,
    memory: LinearMemory,
    layout: QuantumLayout,
    effect: EffectInstance,
    scratch: [Box<[f32]>; 2],
}

impl ModuleInstance {
    pub fn instantiate(bytes: &[u8], descriptor: &Descriptor) -> Result<Self> {
        let image = ModuleImage::decode(bytes).context("Failed to decode module image")?;

        if descriptor.family != image.family {
            anyhow::bail!(
                "descriptor is for {} but the module image holds {}",
                descriptor.family,
                image.family
            );
        }
        descriptor
            .validate()
            .context("Descriptor does not match the module's parameter table")?;

        debug!(
            "Instantiating {} module: {} bytes of memory, quantum {}",
            image.family, image.memory_bytes, image.quantum
        );

        Ok(Self {
            memory: LinearMemory::new(image.memory_bytes),
            layout: QuantumLayout::for_quantum(image.quantum),
            effect: EffectInstance::new(image.family),
            scratch: [
                vec![0.0; image.quantum].into_boxed_slice(),
                vec![0.0; image.quantum].into_boxed_slice(),
            ],
            image,
        })
    }

    pub const fn family(&self) -> EffectFamily {
        self.image.family
    }

    pub const fn image(&self) -> &ModuleImage {
        &self.image
    }

    pub const fn layout(&self) -> QuantumLayout {
        self.layout
    }

    pub const fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    pub const fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    /// Names of every export, in the order a host would list them.
    pub fn export_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["prepare", "reset", "destroy", "process"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for spec in self.effect.params().specs() {
            names.push(format!("set_{}", spec.id));
            names.push(format!("get_{}", spec.id));
        }
        names
    }

    pub fn resolve_export(&self, name: &str) -> Option<Export> {
        match name {
            "prepare" => Some(Export::Prepare),
            "reset" => Some(Export::Reset),
            "destroy" => Some(Export::Destroy),
            "process" => Some(Export::Process),
            _ => {
                if let Some(id) = name.strip_prefix("set_") {
                    self.effect.params().index_of(id).map(Export::Set)
                } else if let Some(id) = name.strip_prefix("get_") {
                    self.effect.params().index_of(id).map(Export::Get)
                } else {
                    None
                }
            }
        }
    }

    /// `set_<param>` by resolved index.
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) -> f32 {
        self.effect.set_parameter(index, value)
    }

    /// `get_<param>` by resolved index.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.effect.get_parameter(index)
    }

    /// Call a `set_<param>` export by name.
    pub fn call_set(&mut self, name: &str, value: f32) -> Result<f32> {
        match self.resolve_export(name) {
            Some(Export::Set(index)) => Ok(self.set(index, value)),
            _ => anyhow::bail!("module has no setter export '{name}'"),
        }
    }

    /// Call a `get_<param>` export by name.
    pub fn call_get(&self, name: &str) -> Result<f32> {
        match self.resolve_export(name) {
            Some(Export::Get(index)) => Ok(self.get(index)),
            _ => anyhow::bail!("module has no getter export '{name}'"),
        }
    }

    pub fn export_state(&self) -> ParamState {
        self.effect.export_state()
    }

    /// The `process` export. Offsets are byte offsets into linear memory.
    /// An invalid region or a sample count above the quantum makes the call a
    /// no-op.
    pub fn process(
        &mut self,
        input_left: u32,
        input_right: u32,
        output_left: u32,
        output_right: u32,
        num_samples: u32,
    ) {
        let n = num_samples as usize;
        if n == 0 || n > self.image.quantum {
            return;
        }

        let [left, right] = &mut self.scratch;
        let (left, right) = (&mut left[..n], &mut right[..n]);
        if !self.memory.read(input_left, left) || !self.memory.read(input_right, right) {
            return;
        }
        if self.memory.slice(output_left, n).is_none()
            || self.memory.slice(output_right, n).is_none()
        {
            return;
        }

        self.effect.process(left, right);

        self.memory.write(output_left, left);
        self.memory.write(output_right, right);
    }
}

impl Lifecycle for ModuleInstance {
    fn prepare(&mut self, sample_rate: f32) -> Result<()> {
        self.effect.prepare(sample_rate)
    }

    fn reset(&mut self) {
        self.effect.reset();
    }

    fn destroy(&mut self) {
        self.effect.destroy();
        self.memory.clear();
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.effect.lifecycle_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(family: EffectFamily) -> ModuleInstance {
        let bytes = ModuleImage::new(family, 128).encode().unwrap();
        ModuleInstance::instantiate(&bytes, &Descriptor::for_family(family)).unwrap()
    }

    #[test]
    fn descriptor_must_match_image() {
        let bytes = ModuleImage::new(EffectFamily::Gain, 128).encode().unwrap();
        let err = ModuleInstance::instantiate(&bytes, &Descriptor::for_family(EffectFamily::Phaser));
        assert!(err.is_err());
    }

    #[test]
    fn exports_cover_every_parameter() {
        let m = module(EffectFamily::Compressor);
        let names = m.export_names();
        assert!(names.contains(&"set_sustain".to_string()));
        assert!(names.contains(&"get_sensitivity".to_string()));
        assert_eq!(m.resolve_export("set_sustain"), Some(Export::Set(0)));
        assert_eq!(m.resolve_export("get_sensitivity"), Some(Export::Get(1)));
        assert_eq!(m.resolve_export("set_nothing"), None);
    }

    #[test]
    fn setter_clamps_through_export() {
        let mut m = module(EffectFamily::Gain);
        assert_eq!(m.call_set("set_gain", 100.0).unwrap(), 24.0);
        assert_eq!(m.call_get("get_gain").unwrap(), 24.0);
        assert!(m.call_set("get_gain", 1.0).is_err());
    }

    #[test]
    fn process_moves_audio_through_memory() {
        let mut m = module(EffectFamily::Gain);
        m.prepare(48_000.0).unwrap();
        let layout = m.layout();
        let input: Vec<f32> = (0..128).map(|i| i as f32 / 256.0).collect();
        m.memory_mut().write(layout.input_left, &input);
        m.memory_mut().write(layout.input_right, &input);

        m.process(
            layout.input_left,
            layout.input_right,
            layout.output_left,
            layout.output_right,
            128,
        );

        let out = m.memory().slice(layout.output_left, 128).unwrap();
        assert_eq!(out, &input[..]);
    }

    #[test]
    fn invalid_offsets_are_a_no_op() {
        let mut m = module(EffectFamily::Gain);
        m.prepare(48_000.0).unwrap();
        let layout = m.layout();
        m.memory_mut().write(layout.input_left, &[0.5; 128]);

        m.process(3, layout.input_right, layout.output_left, layout.output_right, 128);
        m.process(layout.input_left, layout.input_right, 1 << 30, layout.output_right, 128);
        m.process(layout.input_left, layout.input_right, layout.output_left, layout.output_right, 129);

        assert!(m.memory().slice(layout.output_left, 128).unwrap().iter().all(|&s| s == 0.0));
    }
}
