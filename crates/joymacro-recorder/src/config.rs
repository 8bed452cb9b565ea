//! Recorder configuration, stored as TOML

use joymacro_core::{DeviceId, Error, Result, DEFAULT_DEADBAND};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// Directory holding the numbered macro files
    pub macro_dir: PathBuf,
    /// Devices polled each tick, and recorded from
    pub devices: Vec<DeviceId>,
    /// Device carrying the record toggle button
    pub trigger_device: DeviceId,
    /// Button whose press starts and stops recording
    pub trigger_button: u32,
    /// Minimum axis movement reported as an event
    pub deadband: f64,
    /// Period of the control loop, used by standalone replay
    pub tick_ms: u64,
    /// Log full error detail alongside the short message
    pub debug: bool,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            macro_dir: default_macro_dir(),
            devices: vec![0, 1],
            trigger_device: 0,
            trigger_button: 5,
            deadband: DEFAULT_DEADBAND,
            tick_ms: 20,
            debug: false,
        }
    }
}

fn default_macro_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".joymacro").join("macros"),
        None => PathBuf::from("macros"),
    }
}

impl MacroConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(&path.display().to_string(), e))?;
        toml::from_str(&text).map_err(|e| {
            Error::config(format!("Invalid config {}: {}", path.display(), e.message()))
                .with_context(serde_json::json!({ "path": path.display().to_string() }))
        })
    }

    /// Load, or fall back to defaults with a warning when the file is
    /// missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Could not read config at {}, using defaults: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Could not serialize config: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(&parent.display().to_string(), e))?;
        }
        fs::write(path, text).map_err(|e| Error::io(&path.display().to_string(), e))
    }

    /// All devices that must be polled: the configured ones plus the trigger device
    pub fn polled_devices(&self) -> Vec<DeviceId> {
        let mut ids = self.devices.clone();
        if !ids.contains(&self.trigger_device) {
            ids.push(self.trigger_device);
        }
        ids
    }
}
