// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.
// GPU_BRIDGE_CONFIG points at another file, GPU_BRIDGE_BACKEND overrides the
// backend kind.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "GPU_BRIDGE_CONFIG";
pub const BACKEND_ENV: &str = "GPU_BRIDGE_BACKEND";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub queue: QueueConfig,
    pub debug: DebugConfig,
}

/// Which native backend devices are opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Vulkan when available, host emulation otherwise
    #[default]
    Auto,
    Vulkan,
    Host,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "auto" => Some(BackendKind::Auto),
            "vulkan" => Some(BackendKind::Vulkan),
            "host" => Some(BackendKind::Host),
            _ => None,
        }
    }
}

/// Backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub app_name: String,
    pub validation_layers: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Auto,
            app_name: "gpu-bridge".to_string(),
            validation_layers: false,
        }
    }
}

/// Queue limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_command_buffer_limit: u32,
    pub default_command_buffer_count: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_command_buffer_limit: 64,
            default_command_buffer_count: 3,
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
            log_file: "gpu_bridge.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
        let mut config = Self::load_from_path(&path).unwrap_or_else(|e| {
            log::warn!("Failed to load {}: {:#}. Using defaults.", path, e);
            Config::default()
        });
        config.apply_env_overrides();
        config
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults with the host backend, for headless use
    pub fn host() -> Self {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Host;
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(BACKEND_ENV) {
            match BackendKind::parse(&value) {
                Some(kind) => self.backend.kind = kind,
                None => log::warn!("Ignoring unknown {}={:?}", BACKEND_ENV, value),
            }
        }
    }

    /// Get log level as a filter
    pub fn log_level(&self) -> log::LevelFilter {
        match self.debug.log_level.to_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => {
                log::warn!(
                    "Unknown log level '{}', defaulting to info",
                    self.debug.log_level
                );
                log::LevelFilter::Info
            }
        }
    }
}
