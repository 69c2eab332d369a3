//! Common types used throughout the adapter.

// =============================================================================
// Limits
// =============================================================================
//
// Upper bounds for what a patch may declare. A patch exceeding them fails
// bus validation with a clear message instead of being handed to the host.
// =============================================================================

/// Maximum number of audio channels per bus.
pub const MAX_CHANNELS: usize = 32;

/// Maximum number of audio buses per direction.
pub const MAX_BUSES: usize = 16;

/// Default capacity of a [`MidiBuffer`](crate::midi::MidiBuffer).
pub const MAX_MIDI_EVENTS: usize = 1024;

/// Step count reported for continuous parameters.
///
/// Hosts treat this as "effectively continuous".
pub const DEFAULT_NUM_STEPS: i32 = 0x7fff_ffff;

/// Size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
