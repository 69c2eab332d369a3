//! Lifecycle state machine of the adapter.
//!
//! ```text
//!            load request
//! Unloaded ───────────────▶ Loading ──▶ Loaded (playable)
//!    ▲                         │   └──▶ Loaded (not playable) / Failed
//!    │       unload /          │
//!    └──── empty state ◀───────┘ (any loaded state, or a new load request)
//! ```
//!
//! The handle itself lives in the shared slot so the audio thread can reach
//! it; this enum tracks what the control context knows about it.

use std::sync::Arc;

use crate::bus_config::BusLayout;
use crate::engine::PatchHandle;
use crate::manifest::PatchManifest;
use crate::patch_parameter::PatchParameter;
use crate::status::PatchState;

/// Facts about a loaded handle, captured on the control context so that
/// queries never need to lock the slot the audio thread renders from.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatchSnapshot {
    pub parameters: Vec<Arc<PatchParameter>>,
    pub latency_frames: u32,
    pub has_midi_input: bool,
    pub has_midi_output: bool,
    pub has_audio_output: bool,
    pub layout: BusLayout,
}

impl PatchSnapshot {
    pub fn capture(handle: &dyn PatchHandle) -> Self {
        Self {
            parameters: handle.parameters().to_vec(),
            latency_frames: handle.latency_frames(),
            has_midi_input: handle.has_midi_input(),
            has_midi_output: handle.has_midi_output(),
            has_audio_output: handle.has_audio_output(),
            layout: BusLayout::from_endpoints(handle.input_endpoints(), handle.output_endpoints()),
        }
    }
}

/// Adapter lifecycle states.
pub(crate) enum Lifecycle {
    /// No patch.
    Unloaded,

    /// Temporary state while a load is in progress.
    ///
    /// The previous handle is already gone and the next one is not yet in
    /// the slot.
    Loading,

    /// A handle is in the slot.
    Loaded {
        manifest: PatchManifest,
        snapshot: PatchSnapshot,
        playable: bool,
    },

    /// The manifest could not be read or the engine could not build the
    /// patch. Nothing is in the slot, but the location is kept so it survives
    /// in saved state.
    Failed {
        location: String,
        manifest: Option<PatchManifest>,
    },
}

impl Lifecycle {
    pub fn state(&self) -> PatchState {
        match self {
            Self::Unloaded => PatchState::Unloaded,
            Self::Loading => PatchState::Loading,
            Self::Loaded { playable: true, .. } => PatchState::LoadedPlayable,
            Self::Loaded { playable: false, .. } | Self::Failed { .. } => PatchState::LoadedError,
        }
    }

    /// Manifest of the current patch, or of a failed one if it was readable.
    pub fn manifest(&self) -> Option<&PatchManifest> {
        match self {
            Self::Loaded { manifest, .. } => Some(manifest),
            Self::Failed { manifest, .. } => manifest.as_ref(),
            Self::Unloaded | Self::Loading => None,
        }
    }

    /// Location of the current or failed patch.
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Loaded { manifest, .. } => Some(manifest.location()),
            Self::Failed { location, .. } => Some(location.clone()),
            Self::Unloaded | Self::Loading => None,
        }
    }

    pub fn snapshot(&self) -> Option<&PatchSnapshot> {
        match self {
            Self::Loaded { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }
}
