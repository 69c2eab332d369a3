//! Bus layout derivation and negotiation.
//!
//! A patch's buses are derived from its audio endpoints, one bus per endpoint
//! in declaration order. The host proposes layouts as per-bus channel counts
//! and [`BusNegotiator`] accepts or rejects them. Accepting a layout
//! re-derives the [`PlaybackParams`] that get pushed to the live patch.

use crate::endpoint::EndpointDetails;
use crate::error::{AdapterError, Result};
use crate::types::{MAX_BUSES, MAX_CHANNELS};

/// Whether a bus is the main bus (index 0) or an auxiliary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusType {
    #[default]
    Main,
    Aux,
}

impl BusType {
    fn for_index(index: usize) -> Self {
        if index == 0 {
            Self::Main
        } else {
            Self::Aux
        }
    }
}

/// One bus derived from an audio endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusInfo {
    /// Endpoint id the bus was derived from.
    pub name: String,
    pub channel_count: u32,
    pub bus_type: BusType,
}

/// Buses declared by a patch.
///
/// Fixed for the lifetime of a loaded patch; a new one is derived on reload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BusLayout {
    pub inputs: Vec<BusInfo>,
    pub outputs: Vec<BusInfo>,
}

fn buses_from(endpoints: &[EndpointDetails]) -> Vec<BusInfo> {
    endpoints
        .iter()
        .filter(|e| e.audio_channels() > 0)
        .enumerate()
        .map(|(index, e)| BusInfo {
            name: e.id.clone(),
            channel_count: e.audio_channels(),
            bus_type: BusType::for_index(index),
        })
        .collect()
}

impl BusLayout {
    /// Derive buses from a patch's endpoints.
    pub fn from_endpoints(inputs: &[EndpointDetails], outputs: &[EndpointDetails]) -> Self {
        Self {
            inputs: buses_from(inputs),
            outputs: buses_from(outputs),
        }
    }

    /// Stereo in, stereo out. Used by dynamic adapters before a patch exists.
    pub fn stereo() -> Self {
        let bus = |name: &str| BusInfo {
            name: name.to_string(),
            channel_count: 2,
            bus_type: BusType::Main,
        };
        Self {
            inputs: vec![bus("in")],
            outputs: vec![bus("out")],
        }
    }

    pub fn total_input_channels(&self) -> u32 {
        self.inputs.iter().map(|b| b.channel_count).sum()
    }

    pub fn total_output_channels(&self) -> u32 {
        self.outputs.iter().map(|b| b.channel_count).sum()
    }

    /// Returns true if `proposal` is compatible with these buses.
    pub fn accepts(&self, proposal: &ProposedLayout) -> bool {
        is_layout_ok(&self.inputs, &proposal.inputs) && is_layout_ok(&self.outputs, &proposal.outputs)
    }

    /// The proposal that matches this layout exactly.
    pub fn to_proposal(&self) -> ProposedLayout {
        ProposedLayout {
            inputs: self.inputs.iter().map(|b| b.channel_count).collect(),
            outputs: self.outputs.iter().map(|b| b.channel_count).collect(),
        }
    }

    /// Validate that the layout doesn't exceed system limits.
    ///
    /// Returns `Ok(())` if valid, or `Err` with a descriptive message.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (direction, buses) in [("input", &self.inputs), ("output", &self.outputs)] {
            if buses.len() > MAX_BUSES {
                return Err(format!(
                    "Patch declares {} {direction} buses, but MAX_BUSES is {MAX_BUSES}",
                    buses.len()
                ));
            }
            for (i, bus) in buses.iter().enumerate() {
                if bus.channel_count as usize > MAX_CHANNELS {
                    return Err(format!(
                        "{direction} bus {i} ({}) declares {} channels, but MAX_CHANNELS is {MAX_CHANNELS}",
                        bus.name, bus.channel_count
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Per-direction check of a proposed layout against the patch's buses.
///
/// - A patch with no buses only accepts a proposal with no channels at all.
/// - Otherwise every index present in both must match exactly. Extra
///   proposed buses beyond the patch's count are ignored.
pub fn is_layout_ok(patch: &[BusInfo], proposed: &[u32]) -> bool {
    if patch.is_empty() {
        return proposed.iter().all(|&channels| channels == 0);
    }

    patch
        .iter()
        .zip(proposed)
        .all(|(bus, &channels)| bus.channel_count == channels)
}

/// A host-proposed layout: channel count per bus, per direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProposedLayout {
    pub inputs: Vec<u32>,
    pub outputs: Vec<u32>,
}

impl ProposedLayout {
    pub fn new(inputs: Vec<u32>, outputs: Vec<u32>) -> Self {
        Self { inputs, outputs }
    }

    pub fn main_input_channels(&self) -> u32 {
        self.inputs.first().copied().unwrap_or(0)
    }

    pub fn main_output_channels(&self) -> u32 {
        self.outputs.first().copied().unwrap_or(0)
    }
}

/// Playback settings pushed to the patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    pub sample_rate: f64,
    pub block_size: u32,
    pub input_channels: u32,
    pub output_channels: u32,
}

/// Tracks the accepted layout and the current playback settings.
#[derive(Debug, Clone)]
pub struct BusNegotiator {
    patch: Option<BusLayout>,
    accepted: ProposedLayout,
    sample_rate: f64,
    block_size: u32,
}

impl BusNegotiator {
    /// Start from `default_layout`, accepted as-is.
    pub fn new(default_layout: &BusLayout, sample_rate: f64, block_size: u32) -> Self {
        Self {
            patch: None,
            accepted: default_layout.to_proposal(),
            sample_rate,
            block_size,
        }
    }

    /// Set the buses of the loaded patch (`None` when unloaded).
    pub fn set_patch_layout(&mut self, layout: Option<BusLayout>) {
        if let Some(layout) = &layout {
            if !layout.accepts(&self.accepted) {
                log::debug!(
                    "Accepted layout {:?} no longer matches patch buses; host must renegotiate",
                    self.accepted
                );
            }
        }
        self.patch = layout;
    }

    pub fn patch_layout(&self) -> Option<&BusLayout> {
        self.patch.as_ref()
    }

    pub fn accepted(&self) -> &ProposedLayout {
        &self.accepted
    }

    /// Returns true if `proposal` can be applied. Anything goes while no
    /// patch is loaded.
    pub fn is_supported(&self, proposal: &ProposedLayout) -> bool {
        self.patch
            .as_ref()
            .map_or(true, |layout| layout.accepts(proposal))
    }

    /// Accept `proposal`, or keep the previous layout and fail.
    pub fn apply(&mut self, proposal: ProposedLayout) -> Result<PlaybackParams> {
        if !self.is_supported(&proposal) {
            return Err(AdapterError::LayoutRejected {
                inputs: proposal.inputs,
                outputs: proposal.outputs,
            });
        }
        self.accepted = proposal;
        Ok(self.playback_params())
    }

    /// Make `layout` the accepted one without negotiation.
    pub fn reset(&mut self, layout: &BusLayout) {
        self.accepted = layout.to_proposal();
    }

    /// Update sample rate and block size.
    pub fn prepare(&mut self, sample_rate: f64, block_size: u32) -> PlaybackParams {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.playback_params()
    }

    /// Playback settings for the accepted layout.
    pub fn playback_params(&self) -> PlaybackParams {
        PlaybackParams {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            input_channels: self.accepted.main_input_channels(),
            output_channels: self.accepted.main_output_channels(),
        }
    }
}
