//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a ready-to-wire `CuratorConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("uncurated bus: {}", config.bus.uncurated.host);
//! ```

mod parser;
mod validator;

pub use contracts::CuratorConfig;
pub use parser::ConfigFormat;

use contracts::CurationError;
use std::path::Path;

/// Configuration loader
///
/// Stateless; all methods are associated functions.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path, detecting the format from the
    /// extension (.toml / .json).
    ///
    /// # Errors
    /// File read failure, unsupported extension, parse failure or
    /// validation failure.
    pub fn load_from_path(path: &Path) -> Result<CuratorConfig, CurationError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string in the given format.
    ///
    /// # Errors
    /// Parse failure or validation failure.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CuratorConfig, CurationError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize a CuratorConfig back to TOML
    pub fn to_toml(config: &CuratorConfig) -> Result<String, CurationError> {
        toml::to_string_pretty(config)
            .map_err(|e| CurationError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a CuratorConfig back to JSON
    pub fn to_json(config: &CuratorConfig) -> Result<String, CurationError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| CurationError::config_parse(format!("JSON serialize error: {e}")))
    }
}

/// Infer the configuration format from a path's extension
fn detect_format(path: &Path) -> Result<ConfigFormat, CurationError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| CurationError::config_parse("cannot determine file format from extension"))?;

    ConfigFormat::from_extension(ext)
        .ok_or_else(|| CurationError::config_parse(format!("unsupported config format: .{ext}")))
}
