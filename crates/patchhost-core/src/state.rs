//! Persisted state codec.
//!
//! The host stores an opaque blob per plugin instance. Ours is a small JSON
//! document:
//!
//! ```json
//! {
//!   "type": "PatchState",
//!   "location": "/patches/synth.patchmanifest",
//!   "viewWidth": 640,
//!   "viewHeight": 300,
//!   "parameters": [ { "id": "cutoff", "value": 0.25 } ]
//! }
//! ```
//!
//! Records are built on demand from the live patch and never cached.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};
use crate::types::Size;

/// Value of the `type` field that marks our blobs.
pub const STATE_TYPE: &str = "PatchState";

/// One persisted parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub id: String,
    pub value: f32,
}

impl ParameterValue {
    pub fn new(id: impl Into<String>, value: f32) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Everything needed to restore an adapter instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Manifest location of the patch. Empty means "no patch".
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_height: Option<u32>,
    /// Parameter values in the patch's parameter order.
    #[serde(default)]
    pub parameters: Vec<ParameterValue>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    state: &'a PersistedState,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    state: PersistedState,
}

impl PersistedState {
    /// A record that only names a patch location.
    pub fn for_location(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Persisted view size, if both dimensions are present and non-zero.
    pub fn view_size(&self) -> Option<Size> {
        match (self.view_width, self.view_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Size::new(w, h)),
            _ => None,
        }
    }

    pub fn set_view_size(&mut self, size: Option<Size>) {
        self.view_width = size.map(|s| s.width);
        self.view_height = size.map(|s| s.height);
    }

    /// Parameter values keyed by id. Entries with an empty id are skipped;
    /// for duplicate ids the last one wins.
    pub fn parameter_map(&self) -> HashMap<String, f32> {
        self.parameters
            .iter()
            .filter(|p| !p.id.is_empty())
            .map(|p| (p.id.clone(), p.value))
            .collect()
    }
}

/// Serialize a record into a blob.
pub fn encode(state: &PersistedState) -> Result<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        kind: STATE_TYPE,
        state,
    })
    .map_err(|e| AdapterError::StateMalformed(e.to_string()))
}

/// Parse a blob back into a record.
///
/// An empty blob is an empty record (applying it unloads). Anything that is
/// not one of our documents is [`AdapterError::StateMalformed`].
pub fn decode(data: &[u8]) -> Result<PersistedState> {
    if data.is_empty() {
        return Ok(PersistedState::default());
    }

    let envelope: Envelope =
        serde_json::from_slice(data).map_err(|e| AdapterError::StateMalformed(e.to_string()))?;

    if envelope.kind != STATE_TYPE {
        return Err(AdapterError::StateMalformed(format!(
            "unexpected state type {:?}",
            envelope.kind
        )));
    }

    Ok(envelope.state)
}

/// Content hash of a raw blob, used to skip redelivered state.
#[inline]
pub fn content_hash(data: &[u8]) -> u64 {
    patchhost_utils::fnv1a_64(data)
}
