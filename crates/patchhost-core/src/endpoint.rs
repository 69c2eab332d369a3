//! Endpoints declared by a patch.
//!
//! Endpoints are the patch's named ports. The adapter derives buses from the
//! audio endpoints, MIDI capability flags from the MIDI endpoints and decides
//! whether to forward transport information from the timeline endpoints.

use serde::{Deserialize, Serialize};

/// Endpoint id that carries console output from the patch.
pub const CONSOLE_ENDPOINT_ID: &str = "console";

/// Direction of an endpoint, seen from the patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndpointDirection {
    Input,
    Output,
}

/// What an endpoint carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EndpointKind {
    /// Audio stream with a fixed channel count.
    Audio { channels: u32 },
    /// MIDI messages.
    Midi,
    /// Discrete events (parameters, console output, ...).
    Event,
    /// Continuous values.
    Value,
    /// Transport and timeline information (tempo, position, ...).
    Timeline,
}

/// A single declared endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDetails {
    pub id: String,
    pub direction: EndpointDirection,
    #[serde(flatten)]
    pub kind: EndpointKind,
    /// Free-form annotation from the patch source.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub annotation: serde_json::Value,
}

impl EndpointDetails {
    /// Create an endpoint without annotation.
    pub fn new(id: impl Into<String>, direction: EndpointDirection, kind: EndpointKind) -> Self {
        Self {
            id: id.into(),
            direction,
            kind,
            annotation: serde_json::Value::Null,
        }
    }

    /// Audio input with `channels` channels.
    pub fn audio_input(id: impl Into<String>, channels: u32) -> Self {
        Self::new(id, EndpointDirection::Input, EndpointKind::Audio { channels })
    }

    /// Audio output with `channels` channels.
    pub fn audio_output(id: impl Into<String>, channels: u32) -> Self {
        Self::new(id, EndpointDirection::Output, EndpointKind::Audio { channels })
    }

    /// Parse an endpoint list from JSON, as emitted by precompiled patches.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Number of audio channels, zero for non-audio endpoints.
    pub fn audio_channels(&self) -> u32 {
        match self.kind {
            EndpointKind::Audio { channels } => channels,
            _ => 0,
        }
    }

    pub fn is_midi(&self) -> bool {
        self.kind == EndpointKind::Midi
    }

    pub fn is_timeline(&self) -> bool {
        self.kind == EndpointKind::Timeline
    }

    pub fn is_console(&self) -> bool {
        self.id == CONSOLE_ENDPOINT_ID
    }
}
