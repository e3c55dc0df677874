use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::bridge::{BridgeConfig, DeliveryMode};
use crate::effect::EffectFamily;
use crate::module::{DEFAULT_QUANTUM, ModuleImage};

impl std::fmt::Display for EngineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sample Rate: {}", self.sample_rate)?;
        writeln!(f, "Quantum: {}", self.quantum)?;
        writeln!(f, "Max Host Block: {}", self.max_block)?;
        writeln!(
            f,
            "Module Memory: {}",
            self.module_memory_bytes
                .map_or_else(|| "minimum".to_string(), |b| format!("{b} bytes"))
        )?;
        writeln!(f, "Parameter Delivery: {}", self.delivery)?;
        writeln!(f, "Parameter Queue Capacity: {}", self.parameter_queue_capacity)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub sample_rate: u32,
    pub quantum: usize,
    /// Largest block the desktop host adapter processes in one go.
    pub max_block: usize,
    /// Linear memory for built module images. `None` uses the smallest
    /// size that fits the quantum layout.
    pub module_memory_bytes: Option<usize>,
    pub delivery: DeliveryMode,
    pub parameter_queue_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            quantum: DEFAULT_QUANTUM,
            max_block: 1024,
            module_memory_bytes: None,
            delivery: DeliveryMode::Queued,
            parameter_queue_capacity: 1024,
        }
    }
}

impl EngineSettings {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            sample_rate: self.sample_rate as f32,
            quantum: self.quantum,
            delivery: self.delivery,
            parameter_queue_capacity: self.parameter_queue_capacity,
        }
    }

    /// Module image for `family` sized by these settings.
    pub fn module_image(&self, family: EffectFamily) -> ModuleImage {
        let image = ModuleImage::new(family, self.quantum);
        match self.module_memory_bytes {
            Some(bytes) => image.with_memory(bytes),
            None => image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub engine: EngineSettings,
    pub render_dir: String,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;

        writeln!(f, "Engine Settings:")?;
        writeln!(f, "{}", self.engine)?;

        writeln!(f, "Settings:")?;
        writeln!(f, "Render Directory: {}", self.render_dir)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            render_dir: "./renders".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path();

        if settings_path.exists() {
            Self::load_from(&settings_path)
        } else {
            info!("No settings file found, using defaults");
            let settings = Self::default();
            // Try to save defaults, but don't fail if we can't
            let _ = settings.save();
            Ok(settings)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read settings file")?;
        let settings: Self = serde_json::from_str(&contents).context("Failed to parse settings")?;
        settings.validate()?;
        debug!("Loaded settings from {path:?}");
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure the config directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, json).context("Failed to write settings file")?;

        debug!("Saved settings to {path:?}");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.quantum == 0 || engine.max_block == 0 {
            anyhow::bail!("quantum and max host block must be non-zero");
        }
        if engine.parameter_queue_capacity == 0 {
            anyhow::bail!("parameter queue capacity must be non-zero");
        }
        crate::effect::lifecycle::validate_sample_rate(engine.sample_rate as f32)
            .context("Invalid engine sample rate")?;
        engine
            .module_image(EffectFamily::Gain)
            .validate()
            .context("Invalid module memory settings")
    }

    pub fn get_settings_path() -> PathBuf {
        const SETTINGS_FILENAME: &str = "settings.json";

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join("vaist")
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("vaist")
                .join(SETTINGS_FILENAME)
        } else {
            // Fallback to current directory
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }
}
