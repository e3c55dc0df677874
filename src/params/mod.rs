//! Clamped parameter storage.
//!
//! Every effect family declares a static table of [`ParamSpec`]s; an effect
//! instance owns one [`ParameterStore`] built from that table. Setters clamp
//! and flag the slot as changed; nothing else happens until the next block
//! picks the change up.

pub mod descriptor;

use serde::{Deserialize, Serialize};

pub use descriptor::{Descriptor, ParamDescriptor, ParamState};

/// Parameter tables are limited to one change bit per slot.
pub const MAX_PARAMS: usize = 64;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Unit {
    #[serde(rename = "")]
    None,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "dB")]
    Decibels,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "Hz")]
    Hertz,
    #[serde(rename = ":1")]
    Ratio,
    #[serde(rename = "deg")]
    Degrees,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffix = match self {
            Self::None => "",
            Self::Percent => "%",
            Self::Decibels => "dB",
            Self::Milliseconds => "ms",
            Self::Hertz => "Hz",
            Self::Ratio => ":1",
            Self::Degrees => "deg",
        };
        f.write_str(suffix)
    }
}

/// Static description of one parameter slot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: Unit,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamSpec {
    pub const fn new(
        id: &'static str,
        label: &'static str,
        unit: Unit,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            label,
            unit,
            min,
            max,
            default,
        }
    }

    /// Clamp into range. NaN falls back to the default, infinities pin to the
    /// nearest bound.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Bit set of parameter slots written since the last block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet(u64);

impl ChangeSet {
    pub const ALL: Self = Self(u64::MAX);

    #[inline]
    pub const fn contains(self, index: usize) -> bool {
        index < MAX_PARAMS && self.0 & (1 << index) != 0
    }

    #[inline]
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    /// True when any of the listed slots changed.
    #[inline]
    pub fn any_of(self, indices: &[usize]) -> bool {
        indices.iter().any(|&i| self.contains(i))
    }
}

#[derive(Debug, Clone)]
pub struct ParameterStore {
    specs: &'static [ParamSpec],
    values: Vec<f32>,
    changed: u64,
}

impl ParameterStore {
    pub fn new(specs: &'static [ParamSpec]) -> Self {
        debug_assert!(specs.len() <= MAX_PARAMS, "parameter table too large");
        Self {
            specs,
            values: specs.iter().map(|s| s.default).collect(),
            changed: u64::MAX,
        }
    }

    pub const fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    pub const fn len(&self) -> usize {
        self.specs.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.id == id)
    }

    /// Clamp and store. Unknown slots are ignored. Returns the stored value.
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) -> f32 {
        let Some(spec) = self.specs.get(index) else {
            return 0.0;
        };
        let clamped = spec.clamp(value);
        if self.values[index].to_bits() != clamped.to_bits() {
            self.values[index] = clamped;
            self.changed |= 1 << index;
        }
        clamped
    }

    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    pub fn set_by_id(&mut self, id: &str, value: f32) -> Option<f32> {
        self.index_of(id).map(|i| self.set(i, value))
    }

    pub fn get_by_id(&self, id: &str) -> Option<f32> {
        self.index_of(id).map(|i| self.values[i])
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Hand the pending change bits to the block and clear them.
    #[inline]
    pub const fn take_changes(&mut self) -> ChangeSet {
        let changes = ChangeSet(self.changed);
        self.changed = 0;
        changes
    }

    /// Force every slot to be treated as changed on the next block.
    pub const fn mark_all_changed(&mut self) {
        self.changed = u64::MAX;
    }

    pub fn restore_defaults(&mut self) {
        for (value, spec) in self.values.iter_mut().zip(self.specs) {
            *value = spec.default;
        }
        self.changed = u64::MAX;
    }
}
