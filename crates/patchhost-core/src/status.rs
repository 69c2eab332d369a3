//! Status reporting and host notifications.
//!
//! Every error and lifecycle change surfaces through a single
//! message/is-error pair and the [`HostListener`] callbacks.

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::RwLock;

/// Status message shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub is_error: bool,
}

impl Status {
    pub fn new(message: impl Into<String>, is_error: bool) -> Self {
        Self {
            message: message.into(),
            is_error,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, true)
    }
}

/// Lifecycle state of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PatchState {
    Unloaded = 0,
    Loading = 1,
    LoadedPlayable = 2,
    LoadedError = 3,
}

impl PatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loading,
            2 => Self::LoadedPlayable,
            3 => Self::LoadedError,
            _ => Self::Unloaded,
        }
    }

    /// Returns true for both loaded states.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::LoadedPlayable | Self::LoadedError)
    }
}

/// What changed after one or more lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeDetails {
    pub latency_frames: u32,
    pub latency_changed: bool,
    pub parameter_info_changed: bool,
    pub non_parameter_state_changed: bool,
}

/// Callbacks from the adapter to the plugin runtime.
///
/// Parameter callbacks may arrive on any thread (patch-side value changes are
/// reported from wherever the engine produces them). The remaining callbacks
/// are only invoked on the control context.
pub trait HostListener: Send + Sync {
    /// A host parameter's value changed from the patch side, or its slot was
    /// rebound to a different descriptor.
    fn parameter_value_changed(&self, _index: usize, _id: &str, _normalized: f32) {}
    fn parameter_gesture_begin(&self, _index: usize, _id: &str) {}
    fn parameter_gesture_end(&self, _index: usize, _id: &str) {}
    /// Coalesced notification after lifecycle transitions.
    fn patch_changed(&self, _details: &ChangeDetails) {}
    fn status_changed(&self, _status: &Status) {}
    /// Text written by the patch to its console endpoint.
    fn console_message(&self, text: &str) {
        log::info!("{text}");
    }
}

/// Listener that ignores everything except console output.
#[derive(Debug, Default)]
pub struct NullHostListener;

impl HostListener for NullHostListener {}

/// Status and lifecycle state readable from any thread.
///
/// Written only by the control context; the lock exists so readers on other
/// threads never see a torn message.
#[derive(Debug, Default)]
pub struct SharedStatus {
    status: RwLock<Status>,
    state: AtomicU8,
}

impl SharedStatus {
    pub fn status(&self) -> Status {
        self.status.read().clone()
    }

    pub fn state(&self) -> PatchState {
        PatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: PatchState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Replace the status. Returns false if it was unchanged.
    pub(crate) fn replace(&self, status: &Status) -> bool {
        let mut current = self.status.write();
        if *current == *status {
            return false;
        }
        *current = status.clone();
        true
    }
}
