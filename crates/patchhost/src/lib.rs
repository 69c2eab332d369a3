//! # Patchhost
//!
//! Host dynamically reloadable DSP patches inside an audio plugin runtime.
//!
//! A patch is described by a manifest file and built by a [`PatchEngine`].
//! The adapter keeps the host-facing side stable while the patch behind it is
//! loaded, replaced or rebuilt: parameters keep their host indices, bus
//! layouts are renegotiated, and the saved state round-trips.
//!
//! ## Architecture
//!
//! ```text
//! Plugin runtime (implements HostListener)
//!        ↓
//! PatchAdapter / AdapterHandle / AudioProcessor
//!        ↓
//! PatchEngine → PatchHandle (your engine)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use patchhost::prelude::*;
//!
//! static CONFIG: AdapterConfig = AdapterConfig::new()
//!     .with_loader("My Loader", "Me")
//!     .with_initial_pool_size(64);
//!
//! let mut adapter = PatchAdapter::new(
//!     CONFIG,
//!     Box::new(MyEngine::default()),
//!     PatchSource::Dynamic,
//!     Arc::new(NullHostListener),
//! );
//!
//! // Audio thread
//! let mut processor = adapter.audio_processor();
//!
//! // Any thread
//! adapter.handle().load_patch_file("/patches/Reverb.patchmanifest");
//!
//! // Control context, e.g. from a UI timer
//! adapter.dispatch_pending();
//! ```
//!
//! [`PatchEngine`]: patchhost_core::PatchEngine

// Re-export sub-crates
pub use patchhost_core as core;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use patchhost::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use patchhost_core::{
        // Adapter
        AdapterHandle, AudioProcessor, PatchAdapter, PatchSource, ProcessStatus,
        // Configuration
        AdapterConfig, AdapterConfigFile,
        // Engine contract
        EndpointDetails, EndpointDirection, EndpointKind, EngineLibrary, LoadParams,
        PatchEngine, PatchHandle, PatchListener, PatchManifest,
        // Host notifications
        ChangeDetails, HostListener, NullHostListener, PatchState, Status,
        // Parameters
        HostParameter, ParameterGroup, ParameterRange, ParameterStrategy, PatchParameter,
        // Buses and playback
        BusInfo, BusLayout, BusType, PlaybackParams, ProposedLayout,
        // Blocks
        MidiBuffer, MidiEvent, MidiMessage, Transport,
        // State
        ParameterValue, PersistedState,
        // Errors
        AdapterError, Result,
        // Geometry
        Size,
    };
}
