//! Configuration management for texslim

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, TexSlimError};

pub mod profiles;
pub use profiles::*;

/// Smallest accepted longest-edge limit
pub const MIN_MAX_EDGE: u32 = 4;
/// Largest accepted longest-edge limit
pub const MAX_MAX_EDGE: u32 = 16384;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size limits applied to every bitmap
    pub optimize: OptimizeConfig,

    /// External converter settings
    pub converter: ConverterConfig,

    /// Global processing settings
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Named size profiles
    pub profiles: HashMap<String, TextureProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimize: OptimizeConfig::default(),
            converter: ConverterConfig::default(),
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
            profiles: Profiles::all(),
        }
    }
}

/// Size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    /// Longest permitted bitmap edge in pixels
    pub max_edge: u32,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self { max_edge: 512 }
    }
}

/// Converter tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Executable path (None = search the usual locations)
    pub path: Option<PathBuf>,

    /// Wall-clock budget per invocation (in seconds)
    pub timeout_seconds: u64,

    /// Extra arguments placed before the input path
    pub extra_args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            path: None,
            timeout_seconds: 60,
            extra_args: Vec::new(),
        }
    }
}

/// Global processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Files processed concurrently
    pub workers: usize,

    /// Converter processes per file
    pub bitmap_workers: usize,

    /// Enable recursive directory processing
    pub recursive: bool,

    /// Parent directory for work areas (None = system temp dir)
    pub work_dir: Option<PathBuf>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, 16),
            bitmap_workers: 4,
            recursive: false,
            work_dir: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| TexSlimError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(TexSlimError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => self.to_toml()?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| TexSlimError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(TexSlimError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| TexSlimError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TexSlimError::config(format!("TOML serialization failed: {}", e)))
    }

    /// Get a size profile by name
    pub fn get_profile(&self, name: &str) -> Result<&TextureProfile> {
        self.profiles.get(name)
            .ok_or_else(|| {
                let mut available: Vec<_> = self.profiles.keys().collect();
                available.sort();
                TexSlimError::config(
                    format!("Profile '{}' not found. Available profiles: {:?}", name, available)
                )
            })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_max_edge(self.optimize.max_edge)?;

        for (name, profile) in &self.profiles {
            profile.validate()
                .map_err(|e| TexSlimError::config(
                    format!("Invalid profile '{}': {}", name, e)
                ))?;
        }

        if self.converter.timeout_seconds == 0 {
            return Err(TexSlimError::config(
                "Converter timeout must be greater than 0"
            ));
        }

        if self.processing.workers == 0 {
            return Err(TexSlimError::config(
                "Worker count must be greater than 0"
            ));
        }

        if self.processing.bitmap_workers == 0 {
            return Err(TexSlimError::config(
                "Bitmap worker count must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Config) -> Self {
        self.profiles.extend(other.profiles);
        self.optimize = other.optimize;

        if other.converter.path.is_some() {
            self.converter.path = other.converter.path;
        }
        self.converter.timeout_seconds = other.converter.timeout_seconds;
        self.converter.extra_args.extend(other.converter.extra_args);

        self.processing.workers = other.processing.workers;
        self.processing.bitmap_workers = other.processing.bitmap_workers;
        self.processing.recursive |= other.processing.recursive;
        if other.processing.work_dir.is_some() {
            self.processing.work_dir = other.processing.work_dir;
        }

        self.logging = other.logging;
        self
    }
}

/// Check a longest-edge limit against the accepted range
pub fn validate_max_edge(max_edge: u32) -> Result<()> {
    if !(MIN_MAX_EDGE..=MAX_MAX_EDGE).contains(&max_edge) {
        return Err(TexSlimError::invalid_parameters(
            format!("Max edge must be between {}-{}, got {}", MIN_MAX_EDGE, MAX_MAX_EDGE, max_edge)
        ));
    }
    Ok(())
}
