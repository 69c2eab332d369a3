//! MIDI events exchanged with the host.
//!
//! Only short (up to three byte) channel messages pass through the block
//! translator. Buffers are allocated once with a fixed capacity and never
//! grow, so filling and draining them on the audio thread never allocates.

use crate::types::MAX_MIDI_EVENTS;

/// A short MIDI message (status byte plus up to two data bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiMessage {
    data: [u8; 3],
    len: u8,
}

impl MidiMessage {
    /// Build from raw bytes. Returns `None` for empty or oversized input.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 3 {
            return None;
        }
        let mut data = [0; 3];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            data,
            len: bytes.len() as u8,
        })
    }

    /// Note-on on `channel` (0-15).
    pub const fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            data: [0x90 | (channel & 0x0f), note & 0x7f, velocity & 0x7f],
            len: 3,
        }
    }

    /// Note-off on `channel` (0-15).
    pub const fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            data: [0x80 | (channel & 0x0f), note & 0x7f, velocity & 0x7f],
            len: 3,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.data[0]
    }
}

/// A MIDI message at a sample offset within the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiEvent {
    pub sample_offset: u32,
    pub message: MidiMessage,
}

impl MidiEvent {
    pub const fn new(sample_offset: u32, message: MidiMessage) -> Self {
        Self {
            sample_offset,
            message,
        }
    }
}

/// Fixed-capacity MIDI event buffer for one processing block.
#[derive(Debug, Clone)]
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
    capacity: usize,
    /// Set to true when a push fails due to buffer exhaustion
    overflowed: bool,
}

impl MidiBuffer {
    /// Create a buffer holding [`MAX_MIDI_EVENTS`] events.
    pub fn new() -> Self {
        Self::with_capacity(MAX_MIDI_EVENTS)
    }

    /// Create a buffer holding `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            overflowed: false,
        }
    }

    /// Clear all events from the buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
        self.overflowed = false;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if any push failed since the last clear.
    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Push an event to the buffer.
    ///
    /// Returns `true` if the event was added, `false` if the buffer is full.
    /// Sets the overflow flag when the buffer is exhausted.
    #[inline]
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.events.len() < self.capacity {
            self.events.push(event);
            true
        } else {
            self.overflowed = true;
            false
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[MidiEvent] {
        &self.events
    }
}

impl Default for MidiBuffer {
    fn default() -> Self {
        Self::new()
    }
}
