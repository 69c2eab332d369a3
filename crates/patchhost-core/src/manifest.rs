//! Patch manifests.
//!
//! A manifest is the JSON file that identifies a patch: its metadata, its
//! source files and the views it offers. The adapter only needs the metadata
//! and the view sizes; the engine interprets everything else.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AdapterError, Result};
use crate::types::Size;

/// A view declared by a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// Source of the view, relative to the manifest.
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

fn default_resizable() -> bool {
    true
}

/// Parsed patch manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchManifest {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub is_instrument: bool,
    /// Source file list, kept as raw JSON (a string or an array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    #[serde(default, alias = "view", deserialize_with = "one_or_many")]
    pub views: Vec<ViewDescriptor>,
    /// File this manifest was read from. Empty for in-memory manifests.
    #[serde(skip)]
    pub manifest_file: PathBuf,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<ViewDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ViewDescriptor>),
        One(ViewDescriptor),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(views) => views,
        OneOrMany::One(view) => vec![view],
    })
}

impl PatchManifest {
    /// Read and parse a manifest file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::ManifestInvalid(format!("Could not read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text, path)
    }

    /// Parse manifest JSON, recording `path` as its location.
    pub fn from_json_str(text: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: PatchManifest = serde_json::from_str(text)
            .map_err(|e| AdapterError::ManifestInvalid(format!("Error parsing manifest: {e}")))?;
        manifest.manifest_file = path.into();
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the required properties.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AdapterError::ManifestInvalid(
                "The manifest must contain a valid and non-empty 'ID' property".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(AdapterError::ManifestInvalid(
                "The manifest must contain a valid and non-empty 'name' property".to_string(),
            ));
        }
        Ok(())
    }

    /// Location string stored in persisted state.
    pub fn location(&self) -> String {
        self.manifest_file.to_string_lossy().into_owned()
    }

    /// Returns true if every declared view can be resized.
    ///
    /// A patch without views counts as resizable.
    pub fn are_all_views_resizable(&self) -> bool {
        self.views.iter().all(|v| v.resizable)
    }

    /// First declared view size with both dimensions set.
    pub fn preferred_view_size(&self) -> Option<Size> {
        self.views
            .iter()
            .map(|v| Size::new(v.width, v.height))
            .find(|s| !s.is_empty())
    }
}
