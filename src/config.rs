// Tue Jan 13 2026 - Alex

use crate::builder::BuildOptions;
use crate::catalog::{LayoutConvention, SlotPosition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatch_slot: SlotPosition,
    pub pointer_width: u8,
    /// Bytes added to every dispatch symbol address. Unset means 0 for MSVC
    /// images and `2 * pointer_width` for Itanium ones, whose `_ZTV` symbols
    /// mark the table start rather than the address point objects store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_symbol_bias: Option<u64>,
    pub skip_secondary_tables: bool,
    pub threads: usize,
    pub table_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatch_slot: SlotPosition::Front,
            pointer_width: 8,
            dispatch_symbol_bias: None,
            skip_secondary_tables: true,
            threads: num_cpus::get(),
            table_dir: PathBuf::from("tables"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_dispatch_slot(mut self, slot: SlotPosition) -> Self {
        self.dispatch_slot = slot;
        self
    }

    pub fn with_pointer_width(mut self, width: u8) -> Self {
        self.pointer_width = width;
        self
    }

    pub fn with_dispatch_symbol_bias(mut self, bias: u64) -> Self {
        self.dispatch_symbol_bias = Some(bias);
        self
    }

    pub fn with_table_dir(mut self, dir: PathBuf) -> Self {
        self.table_dir = dir;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.pointer_width, 4 | 8) {
            return Err(ConfigError::Invalid(format!("pointer_width must be 4 or 8, got {}", self.pointer_width)));
        }
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn convention(&self) -> LayoutConvention {
        LayoutConvention::new(self.dispatch_slot, self.pointer_width)
    }

    /// The configured bias, or the default for the image's ABI.
    pub fn symbol_bias(&self, itanium: bool) -> u64 {
        match self.dispatch_symbol_bias {
            Some(bias) => bias,
            None if itanium => 2 * u64::from(self.pointer_width),
            None => 0,
        }
    }

    pub fn build_options(&self, itanium: bool) -> BuildOptions {
        BuildOptions {
            dispatch_symbol_bias: self.symbol_bias(itanium),
            skip_secondary_tables: self.skip_secondary_tables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.convention(), LayoutConvention::default());
        assert_eq!(config.build_options(false), BuildOptions::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"dispatch_slot":"back","pointer_width":4}"#).unwrap();
        assert_eq!(config.dispatch_slot, SlotPosition::Back);
        assert_eq!(config.pointer_width, 4);
        assert!(config.skip_secondary_tables);
        assert_eq!(config.convention().slot_range(16), (12, 4));
    }

    #[test]
    fn test_validate() {
        assert!(Config::new().with_pointer_width(6).validate().is_err());
        assert!(Config::new().with_threads(0).validate().is_err());
        assert!(Config::new().with_dispatch_symbol_bias(16).validate().is_ok());
    }

    #[test]
    fn test_itanium_images_default_to_address_point() {
        let config = Config::default();
        assert_eq!(config.build_options(true).dispatch_symbol_bias, 16);
        assert_eq!(config.clone().with_pointer_width(4).symbol_bias(true), 8);
        assert_eq!(config.symbol_bias(false), 0);

        let explicit = Config::new().with_dispatch_symbol_bias(0);
        assert_eq!(explicit.symbol_bias(true), 0);
        assert_eq!(Config::new().with_dispatch_symbol_bias(24).symbol_bias(false), 24);
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("vtable-baker-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"dispatch_symbol_bias":16,"table_dir":"out"}"#).unwrap();
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.dispatch_symbol_bias, Some(16));
        assert_eq!(config.table_dir, PathBuf::from("out"));
        assert!(Config::load(std::env::temp_dir().join("vtable-baker-no-such-config.json")).is_err());
    }
}
