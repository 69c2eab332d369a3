//! Core of the patchhost adapter.
//!
//! Hosts one dynamically reloadable DSP patch inside a plugin runtime. The
//! patch can be swapped while the host is running, so this crate keeps the
//! host-facing surface (parameters, buses, state) stable across reloads.
//!
//! ## Threads
//!
//! ```text
//! host UI / state calls ──▶ PatchAdapter (control context)
//!                               │  ▲
//!            AdapterHandle ─────┘  │ ControlMessage queue
//!            (any thread)          │
//!                               EngineEvents ◀── patch callbacks
//!
//! host audio thread ──────▶ AudioProcessor ──▶ PatchHandle::process
//! ```
//!
//! - [`PatchAdapter`] owns the lifecycle and must stay on the control context.
//! - [`AdapterHandle`] posts state restores, file drops and unloads from any
//!   thread. They run on the next [`PatchAdapter::dispatch_pending`].
//! - [`AudioProcessor`] renders the live patch and never blocks; it renders
//!   silence while a reload is in flight.
//!
//! ## Modules
//!
//! - [`adapter`] - lifecycle orchestration
//! - [`parameter_strategy`] - fixed and pooled parameter virtualization
//! - [`bus_config`] - bus layout negotiation
//! - [`translator`] - audio/MIDI block translation
//! - [`state`] - persisted state codec
//! - [`engine`] - the contract a patch engine implements

pub mod adapter;
pub mod bus_config;
pub mod config;
pub mod control;
pub mod description;
pub mod endpoint;
pub mod engine;
pub mod error;
pub(crate) mod events;
pub mod host_parameter;
pub(crate) mod lifecycle;
pub mod manifest;
pub mod midi;
pub mod parameter_groups;
pub mod parameter_range;
pub mod parameter_strategy;
pub mod patch_parameter;
pub mod state;
pub mod status;
pub mod transport;
pub mod translator;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use adapter::{PatchAdapter, PatchSource};
pub use bus_config::{BusInfo, BusLayout, BusNegotiator, BusType, PlaybackParams, ProposedLayout};
pub use config::{AdapterConfig, AdapterConfigFile};
pub use control::{AdapterHandle, INVALID_STATE_MESSAGE};
pub use description::PluginDescription;
pub use endpoint::{EndpointDetails, EndpointDirection, EndpointKind, CONSOLE_ENDPOINT_ID};
pub use engine::{
    EngineLibrary, LoadParams, PatchEngine, PatchHandle, PatchListener,
    ENGINE_UNAVAILABLE_MESSAGE,
};
pub use error::{AdapterError, Result};
pub use host_parameter::HostParameter;
pub use manifest::{PatchManifest, ViewDescriptor};
pub use midi::{MidiBuffer, MidiEvent, MidiMessage};
pub use parameter_groups::{GroupId, GroupInfo, ParameterGroup, ParameterNode, ROOT_GROUP_ID};
pub use parameter_range::ParameterRange;
pub use parameter_strategy::{FixedParameterStrategy, ParameterStrategy, ReusablePoolStrategy};
pub use patch_parameter::{ParameterObserver, PatchParameter};
pub use state::{ParameterValue, PersistedState};
pub use status::{ChangeDetails, HostListener, NullHostListener, PatchState, Status};
pub use translator::{AudioProcessor, ProcessStatus};
pub use transport::Transport;
pub use types::{Size, MAX_BUSES, MAX_CHANNELS, MAX_MIDI_EVENTS};
