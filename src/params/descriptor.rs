use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::effect::EffectFamily;
use crate::params::{ParamSpec, ParameterStore, Unit};

/// One row of the descriptor handed to the control side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamDescriptor {
    pub id: String,
    pub label: String,
    pub unit: Unit,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamDescriptor {
    /// Same clamping rule the parameter store applies on write.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

impl From<&ParamSpec> for ParamDescriptor {
    fn from(spec: &ParamSpec) -> Self {
        Self {
            id: spec.id.to_string(),
            label: spec.label.to_string(),
            unit: spec.unit,
            min: spec.min,
            max: spec.max,
            default: spec.default,
        }
    }
}

/// Ordered parameter list for one family. The order is the shared-memory
/// slot order used by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Descriptor {
    pub family: EffectFamily,
    pub params: Vec<ParamDescriptor>,
}

impl Descriptor {
    pub fn for_family(family: EffectFamily) -> Self {
        Self {
            family,
            params: family.params().iter().map(ParamDescriptor::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize descriptor")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse descriptor JSON")
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.params.iter().position(|p| p.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.id.as_str())
    }

    pub fn defaults(&self) -> Vec<f32> {
        self.params.iter().map(|p| p.default).collect()
    }

    /// Check that this descriptor describes exactly the family's table.
    pub fn validate(&self) -> Result<()> {
        let specs = self.family.params();
        if specs.len() != self.params.len() {
            anyhow::bail!(
                "descriptor for {} lists {} parameters, expected {}",
                self.family,
                self.params.len(),
                specs.len()
            );
        }

        for (index, (row, spec)) in self.params.iter().zip(specs).enumerate() {
            if row.id != spec.id {
                anyhow::bail!(
                    "descriptor slot {index} is '{}', expected '{}'",
                    row.id,
                    spec.id
                );
            }
            if row.min != spec.min || row.max != spec.max {
                anyhow::bail!(
                    "descriptor range for '{}' is [{}, {}], expected [{}, {}]",
                    row.id,
                    row.min,
                    row.max,
                    spec.min,
                    spec.max
                );
            }
        }

        Ok(())
    }
}

/// Exported parameter values of one instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamState {
    pub family: EffectFamily,
    pub values: BTreeMap<String, f32>,
}

impl ParamState {
    pub fn capture(family: EffectFamily, store: &ParameterStore) -> Self {
        let values = store
            .specs()
            .iter()
            .zip(store.values())
            .map(|(spec, &v)| (spec.id.to_string(), v))
            .collect();
        Self { family, values }
    }

    /// Write the captured values into `store`, clamping each. Ids the store
    /// doesn't know are skipped. Returns how many values were applied.
    pub fn restore(&self, store: &mut ParameterStore) -> usize {
        self.values
            .iter()
            .filter_map(|(id, &v)| store.set_by_id(id, v))
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize parameter state")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse parameter state JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_json_round_trip_keeps_order() -> Result<()> {
        let descriptor = Descriptor::for_family(EffectFamily::Flanger);
        let json = descriptor.to_json()?;
        let parsed = Descriptor::from_json(&json)?;
        assert_eq!(parsed, descriptor);
        assert_eq!(parsed.index_of("rate"), Some(0));
        parsed.validate()?;
        Ok(())
    }

    #[test]
    fn descriptor_serializes_unit_symbols() -> Result<()> {
        let json = Descriptor::for_family(EffectFamily::Compressor).to_json()?;
        assert!(json.contains("\"unit\": \"%\""), "{json}");
        Ok(())
    }

    #[test]
    fn mismatched_descriptor_is_rejected() {
        let mut descriptor = Descriptor::for_family(EffectFamily::Chorus);
        descriptor.params.swap(0, 1);
        assert!(descriptor.validate().is_err());

        let mut descriptor = Descriptor::for_family(EffectFamily::Chorus);
        descriptor.params.pop();
        assert!(descriptor.validate().is_err());

        let mut descriptor = Descriptor::for_family(EffectFamily::Chorus);
        descriptor.params[2].max += 1.0;
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn state_restore_clamps_and_skips_unknown() -> Result<()> {
        let family = EffectFamily::Gain;
        let mut store = ParameterStore::new(family.params());
        let mut state = ParamState::capture(family, &store);
        state.values.insert("gain".to_string(), 1_000.0);
        state.values.insert("bogus".to_string(), 1.0);

        let restored = ParamState::from_json(&state.to_json()?)?;
        assert_eq!(restored.restore(&mut store), 1);
        let spec = family.params()[0];
        assert_eq!(store.get(0), spec.max);
        Ok(())
    }
}
