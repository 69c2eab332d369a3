//! Contract between the adapter and the patch engine.
//!
//! The engine (compiler, JIT, precompiled code, ...) lives outside this
//! crate. It plugs in through three traits:
//!
//! - [`PatchEngine`] creates patch instances.
//! - [`PatchHandle`] is one live, loaded patch. A handle is never reused
//!   across reloads; the adapter drops it and asks for a new one.
//! - [`PatchListener`] is how a handle reports back. The adapter supplies it.
//!
//! Process-wide engine initialisation goes through [`EngineLibrary`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::bus_config::PlaybackParams;
use crate::endpoint::EndpointDetails;
use crate::error::{AdapterError, Result};
use crate::manifest::PatchManifest;
use crate::midi::MidiMessage;
use crate::patch_parameter::PatchParameter;

/// Status message reported when the engine library cannot be initialised.
pub const ENGINE_UNAVAILABLE_MESSAGE: &str = "Could not load the required engine library";

/// Parameters for one patch load.
#[derive(Debug, Clone, Default)]
pub struct LoadParams {
    pub manifest: PatchManifest,
    /// Initial values by endpoint id. Unknown ids are ignored by the engine.
    pub parameter_values: HashMap<String, f32>,
}

/// Creates patch instances.
pub trait PatchEngine: Send {
    /// One-time, process-wide initialisation. Called through
    /// [`EngineLibrary::ensure_initialized`], never directly.
    fn initialise(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Build a patch for `params`.
    ///
    /// `listener` receives the patch's callbacks for as long as the returned
    /// handle lives. Runs on the control context and may take a long time.
    fn load(
        &self,
        params: &LoadParams,
        listener: Arc<dyn PatchListener>,
    ) -> std::result::Result<Box<dyn PatchHandle>, String>;
}

/// A loaded patch.
///
/// Control-context methods and the audio-context methods (`process`,
/// `add_midi_message`, `send_*`) are never called concurrently: the adapter
/// serializes them through the handle slot.
pub trait PatchHandle: Send {
    fn manifest(&self) -> &PatchManifest;

    /// Whether the patch can render audio. A handle can load but still not
    /// be playable (e.g. its program failed to build).
    fn is_playable(&self) -> bool;

    /// Parameter descriptors, in declaration order.
    fn parameters(&self) -> &[Arc<PatchParameter>];

    fn input_endpoints(&self) -> &[EndpointDetails];

    fn output_endpoints(&self) -> &[EndpointDetails];

    /// Processing latency in frames.
    fn latency_frames(&self) -> u32 {
        0
    }

    fn set_playback_params(&mut self, params: PlaybackParams);

    /// Render one block in place.
    ///
    /// `channels` holds one slice per channel, each at least `frames` long.
    /// MIDI produced by the patch is handed to `midi_out` with its frame
    /// offset, in emission order.
    fn process(
        &mut self,
        channels: &mut [&mut [f32]],
        frames: usize,
        midi_out: &mut dyn FnMut(u32, MidiMessage),
    );

    /// Queue an incoming MIDI message for the next `process` call.
    fn add_midi_message(&mut self, frame: u32, data: &[u8]);

    fn send_time_signature(&mut self, _numerator: i32, _denominator: i32) {}

    fn send_bpm(&mut self, _bpm: f32) {}

    fn send_transport_state(&mut self, _recording: bool, _playing: bool) {}

    fn send_position(&mut self, _frame: i64, _quarter_note: f64, _bar_start_quarter_note: f64) {}

    /// Release engine resources. Called once before the handle is dropped.
    fn unload(&mut self) {}

    fn has_midi_input(&self) -> bool {
        self.input_endpoints().iter().any(EndpointDetails::is_midi)
    }

    fn has_midi_output(&self) -> bool {
        self.output_endpoints().iter().any(EndpointDetails::is_midi)
    }

    fn has_audio_output(&self) -> bool {
        self.output_endpoints().iter().any(|e| e.audio_channels() > 0)
    }

    /// Whether the patch wants transport/timeline information.
    fn wants_timecode_events(&self) -> bool {
        self.input_endpoints().iter().any(EndpointDetails::is_timeline)
    }
}

/// Callbacks from a patch to the adapter.
///
/// May be invoked from any thread, including the audio thread; the adapter's
/// implementation never blocks.
pub trait PatchListener: Send + Sync {
    fn playback_started(&self);
    fn playback_stopped(&self);
    /// The patch changed itself (e.g. rebuilt after its source changed).
    fn patch_changed(&self);
    fn status_message(&self, message: &str, is_error: bool);
    /// An event on an output endpoint that the host has no native route for.
    fn output_event(&self, frame: u64, endpoint_id: &str, value: &serde_json::Value);
}

// =============================================================================
// Engine library
// =============================================================================

/// One-time engine initialisation.
///
/// The first [`ensure_initialized`](Self::ensure_initialized) call runs the
/// initialiser and caches its outcome. Later calls return the cached outcome
/// without retrying, so a failure is terminal for the process.
#[derive(Debug, Default)]
pub struct EngineLibrary {
    state: OnceLock<std::result::Result<(), String>>,
}

static GLOBAL_LIBRARY: EngineLibrary = EngineLibrary::new();

impl EngineLibrary {
    pub const fn new() -> Self {
        Self {
            state: OnceLock::new(),
        }
    }

    /// The process-wide instance.
    pub fn global() -> &'static EngineLibrary {
        &GLOBAL_LIBRARY
    }

    /// Run `init` unless it already ran, and return the (cached) outcome.
    pub fn ensure_initialized<F>(&self, init: F) -> Result<()>
    where
        F: FnOnce() -> std::result::Result<(), String>,
    {
        let outcome = self.state.get_or_init(|| {
            let outcome = init();
            match &outcome {
                Ok(()) => log::debug!("Engine library initialised"),
                Err(e) => log::error!("{ENGINE_UNAVAILABLE_MESSAGE}: {e}"),
            }
            outcome
        });

        outcome
            .clone()
            .map_err(AdapterError::EngineUnavailable)
    }

    /// Returns true once initialisation has succeeded.
    pub fn is_initialized(&self) -> bool {
        matches!(self.state.get(), Some(Ok(())))
    }
}
