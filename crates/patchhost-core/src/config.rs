//! Adapter configuration.
//!
//! [`AdapterConfig`] is a `const` builder so an embedding plugin can keep its
//! configuration in a `static`. [`AdapterConfigFile`] is the optional TOML
//! form of the same settings.
//!
//! # Example
//!
//! ```ignore
//! use patchhost_core::AdapterConfig;
//!
//! pub static CONFIG: AdapterConfig = AdapterConfig::new()
//!     .with_loader("My Patch Loader", "My Company")
//!     .with_initial_pool_size(64);
//! ```

use serde::Deserialize;

use crate::types::{Size, MAX_MIDI_EVENTS};

/// Settings shared by every adapter instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdapterConfig {
    /// Number of `P{n}` slots the reusable pool starts with.
    pub initial_pool_size: usize,
    /// Sample rate used until the host calls `prepare_to_play`.
    pub default_sample_rate: f64,
    /// Block size used until the host calls `prepare_to_play`.
    pub default_block_size: u32,
    /// Editor size when neither the state nor the manifest provide one.
    pub default_view_size: Size,
    /// Prefix that marks a plugin identifier as a patch identifier.
    pub identifier_prefix: &'static str,
    /// Plugin name reported while no patch is loaded.
    pub loader_name: &'static str,
    /// Manufacturer reported while no patch is loaded.
    pub loader_manufacturer: &'static str,
    /// Format name reported in plugin descriptions.
    pub format_name: &'static str,
    /// File extension of patch manifests, including the leading dot.
    pub patch_file_extension: &'static str,
    /// Capacity of the per-block MIDI buffers.
    pub max_midi_events: usize,
}

impl AdapterConfig {
    /// Create a configuration with default settings.
    pub const fn new() -> Self {
        Self {
            initial_pool_size: 100,
            default_sample_rate: 44100.0,
            default_block_size: 128,
            default_view_size: Size::new(500, 400),
            identifier_prefix: "Patch:",
            loader_name: "Patch Loader",
            loader_manufacturer: "patchhost",
            format_name: "Patch",
            patch_file_extension: ".patchmanifest",
            max_midi_events: MAX_MIDI_EVENTS,
        }
    }

    /// Set the initial size of the reusable parameter pool.
    pub const fn with_initial_pool_size(mut self, size: usize) -> Self {
        self.initial_pool_size = size;
        self
    }

    /// Set the playback defaults used before the host prepares the adapter.
    pub const fn with_default_playback(mut self, sample_rate: f64, block_size: u32) -> Self {
        self.default_sample_rate = sample_rate;
        self.default_block_size = block_size;
        self
    }

    /// Set the fallback editor size.
    pub const fn with_default_view_size(mut self, width: u32, height: u32) -> Self {
        self.default_view_size = Size::new(width, height);
        self
    }

    /// Set the identifier prefix.
    pub const fn with_identifier_prefix(mut self, prefix: &'static str) -> Self {
        self.identifier_prefix = prefix;
        self
    }

    /// Set the name and manufacturer reported while no patch is loaded.
    pub const fn with_loader(mut self, name: &'static str, manufacturer: &'static str) -> Self {
        self.loader_name = name;
        self.loader_manufacturer = manufacturer;
        self
    }

    /// Set the format name.
    pub const fn with_format_name(mut self, name: &'static str) -> Self {
        self.format_name = name;
        self
    }

    /// Set the manifest file extension.
    pub const fn with_patch_file_extension(mut self, extension: &'static str) -> Self {
        self.patch_file_extension = extension;
        self
    }

    /// Set the per-block MIDI capacity.
    pub const fn with_max_midi_events(mut self, capacity: usize) -> Self {
        self.max_midi_events = capacity;
        self
    }

    /// Returns true if `path` has the configured manifest extension.
    pub fn is_patch_file(&self, path: &std::path::Path) -> bool {
        path.to_str().is_some_and(|p| {
            p.to_ascii_lowercase()
                .ends_with(&self.patch_file_extension.to_ascii_lowercase())
        })
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Config file
// =========================================================================

/// Adapter settings read from a TOML file.
///
/// Every field is optional; missing fields keep the [`AdapterConfig`]
/// defaults. String settings are leaked into `'static` storage when converted,
/// which is fine for values read once per process.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfigFile {
    /// Initial reusable pool size.
    pub initial_pool_size: Option<usize>,
    /// Default sample rate in Hz.
    pub sample_rate: Option<f64>,
    /// Default block size in frames.
    pub block_size: Option<u32>,
    /// Default editor width in pixels.
    pub view_width: Option<u32>,
    /// Default editor height in pixels.
    pub view_height: Option<u32>,
    /// Identifier prefix (e.g. "Patch:").
    pub identifier_prefix: Option<String>,
    /// Loader display name.
    pub loader_name: Option<String>,
    /// Loader manufacturer.
    pub loader_manufacturer: Option<String>,
    /// Per-block MIDI capacity.
    pub max_midi_events: Option<usize>,
}

impl AdapterConfigFile {
    /// Parse a config file from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid adapter config: {e}"))
    }

    /// Validate the config file contents.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(rate) = self.sample_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(format!("sample_rate must be positive, got {rate}"));
            }
        }
        if self.block_size == Some(0) {
            return Err("block_size must be greater than zero".to_string());
        }
        if self.max_midi_events == Some(0) {
            return Err("max_midi_events must be greater than zero".to_string());
        }
        if let Some(prefix) = &self.identifier_prefix {
            if prefix.is_empty() {
                return Err("identifier_prefix must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Validate and merge onto the defaults.
    pub fn into_config(self) -> Result<AdapterConfig, String> {
        self.validate()?;

        let defaults = AdapterConfig::new();
        let leak = |s: Option<String>, fallback: &'static str| -> &'static str {
            s.map(|s| &*Box::leak(s.into_boxed_str())).unwrap_or(fallback)
        };

        Ok(AdapterConfig {
            initial_pool_size: self.initial_pool_size.unwrap_or(defaults.initial_pool_size),
            default_sample_rate: self.sample_rate.unwrap_or(defaults.default_sample_rate),
            default_block_size: self.block_size.unwrap_or(defaults.default_block_size),
            default_view_size: Size::new(
                self.view_width.unwrap_or(defaults.default_view_size.width),
                self.view_height.unwrap_or(defaults.default_view_size.height),
            ),
            identifier_prefix: leak(self.identifier_prefix, defaults.identifier_prefix),
            loader_name: leak(self.loader_name, defaults.loader_name),
            loader_manufacturer: leak(self.loader_manufacturer, defaults.loader_manufacturer),
            max_midi_events: self.max_midi_events.unwrap_or(defaults.max_midi_events),
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        const CONFIG: AdapterConfig = AdapterConfig::new();
        assert_eq!(CONFIG.initial_pool_size, 100);
        assert_eq!(CONFIG.default_view_size, Size::new(500, 400));
        assert_eq!(CONFIG.default_block_size, 128);
    }

    #[test]
    fn test_builder() {
        let config = AdapterConfig::new()
            .with_initial_pool_size(8)
            .with_loader("Loader", "Acme")
            .with_default_playback(48000.0, 256);
        assert_eq!(config.initial_pool_size, 8);
        assert_eq!(config.loader_manufacturer, "Acme");
        assert_eq!(config.default_sample_rate, 48000.0);
    }

    #[test]
    fn test_is_patch_file() {
        let config = AdapterConfig::new();
        assert!(config.is_patch_file(std::path::Path::new("/a/Synth.PatchManifest")));
        assert!(!config.is_patch_file(std::path::Path::new("/a/synth.json")));
    }

    #[test]
    fn test_config_file_merges_onto_defaults() {
        let file = AdapterConfigFile::from_toml_str(
            r#"
            initial_pool_size = 16
            sample_rate = 96000.0
            loader_name = "Loader"
            "#,
        )
        .unwrap();
        let config = file.into_config().unwrap();
        assert_eq!(config.initial_pool_size, 16);
        assert_eq!(config.default_sample_rate, 96000.0);
        assert_eq!(config.loader_name, "Loader");
        assert_eq!(config.default_block_size, 128);
    }

    #[test]
    fn test_config_file_rejects_zero_block_size() {
        let file = AdapterConfigFile::from_toml_str("block_size = 0").unwrap();
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        assert!(AdapterConfigFile::from_toml_str("bogus = 1").is_err());
    }
}
