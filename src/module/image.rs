use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::effect::EffectFamily;
use crate::module::memory::QuantumLayout;

pub const MAGIC: [u8; 4] = *b"VFX\0";
pub const FORMAT_VERSION: u16 = 1;
/// magic + version + body length
pub const HEADER_LEN: usize = 4 + 2 + 4;

pub const MAX_QUANTUM: usize = 4096;
pub const MAX_MEMORY_BYTES: usize = 16 * 1024 * 1024;

/// Body of a module image: which family to instantiate and how much linear
/// memory it gets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleImage {
    pub family: EffectFamily,
    pub memory_bytes: usize,
    pub quantum: usize,
}

impl ModuleImage {
    /// Image with the smallest memory that holds the four quantum regions.
    pub fn new(family: EffectFamily, quantum: usize) -> Self {
        Self {
            family,
            memory_bytes: QuantumLayout::for_quantum(quantum).required_bytes(),
            quantum,
        }
    }

    pub fn with_memory(mut self, memory_bytes: usize) -> Self {
        self.memory_bytes = memory_bytes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantum == 0 || self.quantum > MAX_QUANTUM {
            anyhow::bail!(
                "quantum of {} samples outside 1..={MAX_QUANTUM}",
                self.quantum
            );
        }
        if self.memory_bytes % 4 != 0 {
            anyhow::bail!(
                "memory size {} is not a whole number of f32 words",
                self.memory_bytes
            );
        }
        if self.memory_bytes > MAX_MEMORY_BYTES {
            anyhow::bail!(
                "memory size {} exceeds the {MAX_MEMORY_BYTES} byte limit",
                self.memory_bytes
            );
        }

        let required = QuantumLayout::for_quantum(self.quantum).required_bytes();
        if self.memory_bytes < required {
            anyhow::bail!(
                "memory size {} too small for four {}-sample regions ({required} bytes needed)",
                self.memory_bytes,
                self.quantum
            );
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let body = serde_json::to_vec(self).context("Failed to serialize module image")?;
        let body_len = u32::try_from(body.len()).context("Module image body too large")?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body_len.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            anyhow::bail!(
                "module image truncated: {} bytes, header needs {HEADER_LEN}",
                bytes.len()
            );
        }
        if bytes[..4] != MAGIC {
            anyhow::bail!("not a module image (bad magic {:02x?})", &bytes[..4]);
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            anyhow::bail!("unsupported module image version {version}");
        }

        let body_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let body = bytes
            .get(HEADER_LEN..HEADER_LEN + body_len)
            .with_context(|| {
                format!(
                    "module image truncated: body declares {body_len} bytes, {} present",
                    bytes.len() - HEADER_LEN
                )
            })?;

        let image: Self =
            serde_json::from_slice(body).context("Failed to parse module image body")?;
        image.validate()?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_image_decodes() -> Result<()> {
        let image = ModuleImage::new(EffectFamily::Phaser, 128);
        let bytes = image.encode()?;
        assert_eq!(&bytes[..4], b"VFX\0");
        assert_eq!(ModuleImage::decode(&bytes)?, image);
        Ok(())
    }

    #[test]
    fn bad_magic_is_rejected() -> Result<()> {
        let mut bytes = ModuleImage::new(EffectFamily::Gain, 128).encode()?;
        bytes[0] = b'X';
        let err = ModuleImage::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("magic"), "{err}");
        Ok(())
    }

    #[test]
    fn wrong_version_is_rejected() -> Result<()> {
        let mut bytes = ModuleImage::new(EffectFamily::Gain, 128).encode()?;
        bytes[4] = 9;
        assert!(ModuleImage::decode(&bytes).is_err());
        Ok(())
    }

    #[test]
    fn truncation_is_rejected() -> Result<()> {
        let bytes = ModuleImage::new(EffectFamily::Gain, 128).encode()?;
        assert!(ModuleImage::decode(&bytes[..HEADER_LEN - 1]).is_err());
        assert!(ModuleImage::decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(ModuleImage::decode(&[]).is_err());
        Ok(())
    }

    #[test]
    fn unknown_family_is_rejected() {
        let body = br#"{"family":"reverb","memory_bytes":4096,"quantum":128}"#;
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(body);
        assert!(ModuleImage::decode(&bytes).is_err());
    }

    #[test]
    fn undersized_memory_is_rejected() {
        let image = ModuleImage::new(EffectFamily::Flanger, 128).with_memory(1024);
        assert!(image.validate().is_err());
        assert!(image.encode().is_err());
    }
}
