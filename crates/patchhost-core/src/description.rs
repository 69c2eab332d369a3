//! Descriptive metadata reported to the plugin runtime.
//!
//! A patch is identified by a textual plugin id: the configured prefix
//! followed by a small JSON object with the patch's `ID`, `name` and
//! `location`. The numeric unique id hosts store in sessions is the FNV-1a
//! hash of that string, so it stays stable for as long as the patch keeps
//! its ID, name and location.

use std::path::PathBuf;

use crate::config::AdapterConfig;
use crate::manifest::PatchManifest;

/// Metadata describing the plugin the adapter currently presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescription {
    pub name: String,
    pub descriptive_name: String,
    pub category: String,
    pub manufacturer: String,
    pub version: String,
    pub is_instrument: bool,
    pub unique_id: i32,
    /// Textual plugin id (see [`create_patch_id`]).
    pub identifier: String,
    pub format_name: String,
}

impl PluginDescription {
    /// Describe a loaded patch.
    pub fn for_manifest(config: &AdapterConfig, manifest: &PatchManifest) -> Self {
        let identifier = create_patch_id(config, manifest);
        let descriptive_name = if manifest.description.is_empty() {
            manifest.name.clone()
        } else {
            manifest.description.clone()
        };

        Self {
            name: manifest.name.clone(),
            descriptive_name,
            category: manifest.category.clone(),
            manufacturer: manifest.manufacturer.clone(),
            version: manifest.version.clone(),
            is_instrument: manifest.is_instrument,
            unique_id: patchhost_utils::fnv1a_32(&identifier) as i32,
            identifier,
            format_name: config.format_name.to_string(),
        }
    }

    /// Describe the empty loader shown while no patch is loaded.
    pub fn for_loader(config: &AdapterConfig) -> Self {
        Self {
            name: config.loader_name.to_string(),
            descriptive_name: config.loader_name.to_string(),
            category: String::new(),
            manufacturer: config.loader_manufacturer.to_string(),
            version: String::new(),
            is_instrument: true,
            unique_id: patchhost_utils::fnv1a_32(config.loader_name) as i32,
            identifier: config.loader_name.to_string(),
            format_name: config.format_name.to_string(),
        }
    }
}

/// Build the textual plugin id for a patch.
pub fn create_patch_id(config: &AdapterConfig, manifest: &PatchManifest) -> String {
    let json = serde_json::json!({
        "ID": manifest.id,
        "name": manifest.name,
        "location": manifest.location(),
    });
    format!("{}{}", config.identifier_prefix, json)
}

/// Returns true if `id` was produced by [`create_patch_id`].
pub fn is_patch_identifier(config: &AdapterConfig, id: &str) -> bool {
    id.starts_with(config.identifier_prefix)
}

/// Look up one property of a patch identifier.
pub fn property_from_plugin_id(
    config: &AdapterConfig,
    id: &str,
    property: &str,
) -> Option<serde_json::Value> {
    let json = id.strip_prefix(config.identifier_prefix)?;
    let mut object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json).ok()?;
    object.remove(property)
}

fn string_property(config: &AdapterConfig, id: &str, property: &str) -> Option<String> {
    match property_from_plugin_id(config, id, property)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }
}

/// Manifest location encoded in a patch identifier.
pub fn file_from_plugin_id(config: &AdapterConfig, id: &str) -> Option<PathBuf> {
    string_property(config, id, "location").map(PathBuf::from)
}

/// Patch `ID` encoded in a patch identifier.
pub fn id_from_plugin_id(config: &AdapterConfig, id: &str) -> Option<String> {
    string_property(config, id, "ID")
}

/// Patch name encoded in a patch identifier.
pub fn name_from_plugin_id(config: &AdapterConfig, id: &str) -> Option<String> {
    string_property(config, id, "name")
}
