//! The adapter: lifecycle orchestration on the control context.
//!
//! A [`PatchAdapter`] owns the engine, the parameter strategy, the bus
//! negotiator and the lifecycle state machine. It must stay on the control
//! context (the thread that services host UI and state calls). Work that
//! arrives from other threads goes through an [`AdapterHandle`] and is run by
//! [`PatchAdapter::dispatch_pending`]; audio goes through the
//! [`AudioProcessor`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::bus_config::{BusLayout, BusNegotiator, PlaybackParams, ProposedLayout};
use crate::config::AdapterConfig;
use crate::control::{AdapterHandle, ControlMessage, Shared};
use crate::description::PluginDescription;
use crate::engine::{EngineLibrary, LoadParams, PatchEngine, ENGINE_UNAVAILABLE_MESSAGE};
use crate::error::{AdapterError, Result};
use crate::events::EngineEvents;
use crate::host_parameter::HostParameter;
use crate::lifecycle::{Lifecycle, PatchSnapshot};
use crate::manifest::PatchManifest;
use crate::midi::MidiBuffer;
use crate::parameter_groups::ParameterGroup;
use crate::parameter_strategy::{FixedParameterStrategy, ParameterStrategy, ReusablePoolStrategy};
use crate::state::{self, ParameterValue, PersistedState};
use crate::status::{ChangeDetails, HostListener, PatchState, Status};
use crate::translator::AudioProcessor;
use crate::types::Size;

/// Where an adapter's patches come from.
#[derive(Debug, Clone)]
pub enum PatchSource {
    /// A generic loader. Patches are chosen at run time (state restore, file
    /// drop) and parameters are exposed through a reusable pool of slots.
    Dynamic,

    /// A plugin built around one patch, loaded at construction. Parameters
    /// are exposed with their own ids.
    Fixed(PatchManifest),
}

impl PatchSource {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

/// Hosts one patch at a time inside a plugin runtime.
pub struct PatchAdapter {
    config: AdapterConfig,
    engine: Box<dyn PatchEngine>,
    source: PatchSource,
    engine_available: bool,
    shared: Arc<Shared>,
    receiver: Receiver<ControlMessage>,
    host: Arc<dyn HostListener>,
    events: Arc<EngineEvents>,
    strategy: Box<dyn ParameterStrategy>,
    buses: BusNegotiator,
    lifecycle: Lifecycle,
    /// Latency last reported to the host.
    latency_frames: u32,
    view_size: Option<Size>,
}

impl PatchAdapter {
    /// Create an adapter, initialising the engine library once per process.
    pub fn new(
        config: AdapterConfig,
        engine: Box<dyn PatchEngine>,
        source: PatchSource,
        host: Arc<dyn HostListener>,
    ) -> Self {
        Self::with_library(EngineLibrary::global(), config, engine, source, host)
    }

    /// Create an adapter against a specific engine library instance.
    ///
    /// If the library cannot be initialised the adapter still works, but it
    /// reports [`ENGINE_UNAVAILABLE_MESSAGE`] as an error status and every
    /// load is a no-op.
    pub fn with_library(
        library: &EngineLibrary,
        config: AdapterConfig,
        engine: Box<dyn PatchEngine>,
        source: PatchSource,
        host: Arc<dyn HostListener>,
    ) -> Self {
        let (shared, receiver) = Shared::new();
        let events = Arc::new(EngineEvents::new(shared.clone(), host.clone()));

        let strategy: Box<dyn ParameterStrategy> = match &source {
            PatchSource::Fixed(_) => Box::new(FixedParameterStrategy::new(host.clone())),
            PatchSource::Dynamic => Box::new(ReusablePoolStrategy::new(
                config.initial_pool_size,
                host.clone(),
            )),
        };

        let buses = BusNegotiator::new(
            &BusLayout::stereo(),
            config.default_sample_rate,
            config.default_block_size,
        );

        let engine_available = library
            .ensure_initialized(|| engine.initialise())
            .is_ok();

        let mut adapter = Self {
            config,
            engine,
            source,
            engine_available,
            shared,
            receiver,
            host,
            events,
            strategy,
            buses,
            lifecycle: Lifecycle::Unloaded,
            latency_frames: 0,
            view_size: None,
        };

        if !adapter.engine_available {
            let status = Status::error(ENGINE_UNAVAILABLE_MESSAGE);
            if adapter.shared.status.replace(&status) {
                adapter.host.status_changed(&status);
            }
        } else if let PatchSource::Fixed(manifest) = adapter.source.clone() {
            let name = manifest.name.clone();
            let params = LoadParams {
                manifest,
                parameter_values: HashMap::new(),
            };
            if let Err(e) = adapter.load_inner(params) {
                log::warn!("Could not load '{name}': {e}");
            }
            if let Some(layout) = adapter.buses.patch_layout().cloned() {
                adapter.buses.reset(&layout);
                adapter.push_playback_params();
            }
        }

        adapter.flush_patch_change();
        adapter
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn source(&self) -> &PatchSource {
        &self.source
    }

    pub fn is_engine_available(&self) -> bool {
        self.engine_available
    }

    /// Handle for posting requests from any thread.
    pub fn handle(&self) -> AdapterHandle {
        AdapterHandle::new(self.shared.clone())
    }

    /// Audio-thread entry point. May be called more than once; every
    /// processor renders the same patch.
    pub fn audio_processor(&self) -> AudioProcessor {
        AudioProcessor::new(self.shared.clone())
    }

    pub fn state(&self) -> PatchState {
        self.lifecycle.state()
    }

    pub fn status(&self) -> Status {
        self.shared.status.status()
    }

    pub fn is_loaded(&self) -> bool {
        self.lifecycle.is_loaded()
    }

    pub fn is_playable(&self) -> bool {
        self.lifecycle.state() == PatchState::LoadedPlayable
    }

    /// Manifest of the current patch, including one the engine failed to
    /// build. `None` if the manifest itself could not be read.
    pub fn manifest(&self) -> Option<&PatchManifest> {
        self.lifecycle.manifest()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load the patch whose manifest is at `path`, replacing the current one.
    pub fn load_patch_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let location = path.as_ref().to_string_lossy().into_owned();
        self.apply_state(&PersistedState::for_location(location))
    }

    /// Load an already parsed manifest, with optional initial parameter
    /// values keyed by endpoint id.
    pub fn load_manifest(
        &mut self,
        manifest: PatchManifest,
        parameter_values: HashMap<String, f32>,
    ) -> Result<()> {
        self.shared.forget_state_hash();
        let result = self.load_inner(LoadParams {
            manifest,
            parameter_values,
        });
        self.flush_patch_change();
        result
    }

    /// Apply a decoded state record immediately.
    ///
    /// An empty location unloads. Saved parameter values are only replayed
    /// when nothing is loaded or the record names the patch that is already
    /// loaded; a record for a different (or moved) manifest loads it with its
    /// defaults. Fixed adapters always reload their own patch and replay.
    pub fn apply_state(&mut self, state: &PersistedState) -> Result<()> {
        self.shared.forget_state_hash();
        let result = self.apply_state_inner(state.clone());
        self.flush_patch_change();
        result
    }

    /// Unload the current patch and clear the status.
    pub fn unload(&mut self) {
        self.shared.forget_state_hash();
        self.unload_inner();
        self.flush_patch_change();
    }

    /// Queue a state blob from the host. See [`AdapterHandle::set_state`].
    pub fn set_state(&self, data: &[u8]) -> Result<bool> {
        self.handle().set_state(data)
    }

    /// Serialize the current patch location, view size and parameter values.
    pub fn get_state(&self) -> Result<Vec<u8>> {
        state::encode(&self.persisted_state())
    }

    /// The record [`get_state`](Self::get_state) encodes.
    pub fn persisted_state(&self) -> PersistedState {
        let Some(location) = self.lifecycle.location() else {
            return PersistedState::default();
        };

        let mut record = PersistedState::for_location(location);
        if self
            .lifecycle
            .manifest()
            .map_or(true, PatchManifest::are_all_views_resizable)
        {
            record.set_view_size(self.view_size);
        }
        if let Some(snapshot) = self.lifecycle.snapshot() {
            record.parameters = snapshot
                .parameters
                .iter()
                .map(|p| ParameterValue::new(p.endpoint_id(), p.current_value()))
                .collect();
        }
        record
    }

    // =========================================================================
    // Control queue
    // =========================================================================

    /// Run the oldest queued request, if any. Returns false if the queue was
    /// empty.
    pub fn dispatch_one(&mut self) -> bool {
        let Ok(message) = self.receiver.try_recv() else {
            return false;
        };
        self.handle_message(message);
        self.finish_dispatch();
        true
    }

    /// Run every queued request in order, then send at most one
    /// patch-changed notification. Returns the number of requests run.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        self.finish_dispatch();
        handled
    }

    /// Send the owed patch-changed notification, if any.
    ///
    /// Rebinds the parameter strategy to the current patch first, so the host
    /// sees the new parameter set when it reacts.
    pub fn flush_patch_change(&mut self) -> Option<ChangeDetails> {
        if !self.shared.change_pending.swap(false, Ordering::AcqRel) {
            return None;
        }

        let (latency, parameters) = self
            .lifecycle
            .snapshot()
            .map(|s| (s.latency_frames, s.parameters.clone()))
            .unwrap_or_default();

        let details = ChangeDetails {
            latency_frames: latency,
            latency_changed: latency != self.latency_frames,
            parameter_info_changed: self.strategy.update(&parameters),
            non_parameter_state_changed: true,
        };
        self.latency_frames = latency;

        log::debug!("Patch changed: {details:?}");
        self.host.patch_changed(&details);
        Some(details)
    }

    fn handle_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::ApplyState(pending) => {
                // Failures are already mirrored into the status.
                if let Err(e) = self.apply_state_inner(pending.state) {
                    log::debug!("Queued state not applied: {e}");
                }
            }
            ControlMessage::Unload => self.unload_inner(),
            ControlMessage::Status(status) => self.set_status(status),
            ControlMessage::PatchChanged => {
                self.shared.refresh_queued.store(false, Ordering::Release);
                self.refresh_snapshot();
                self.mark_changed();
            }
        }
    }

    fn finish_dispatch(&mut self) {
        if self.shared.midi_overflow.swap(false, Ordering::AcqRel) {
            log::warn!(
                "MIDI output buffer overflowed (capacity {}), events were dropped",
                self.config.max_midi_events
            );
        }
        self.flush_patch_change();
    }

    // =========================================================================
    // Lifecycle transitions
    // =========================================================================

    fn apply_state_inner(&mut self, state: PersistedState) -> Result<()> {
        if !self.engine_available {
            return Err(AdapterError::EngineUnavailable(
                ENGINE_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }

        let fixed = match &self.source {
            PatchSource::Fixed(manifest) => Some(manifest.clone()),
            PatchSource::Dynamic => None,
        };
        let manifest = match fixed {
            Some(manifest) => manifest,
            None if state.location.is_empty() => {
                self.unload_inner();
                return Ok(());
            }
            None => match PatchManifest::from_file(&state.location) {
                Ok(manifest) => manifest,
                Err(e) => {
                    self.fail(state.location, None, &manifest_error_message(&e));
                    return Err(e);
                }
            },
        };

        // Values saved for one patch must not leak into another.
        let replay = self.source.is_fixed()
            || self
                .lifecycle
                .location()
                .map_or(true, |current| current == manifest.location());
        let parameter_values = if replay {
            state.parameter_map()
        } else {
            log::debug!(
                "Not replaying {} parameter values saved for another patch",
                state.parameters.len()
            );
            HashMap::new()
        };

        if manifest.are_all_views_resizable() {
            if let Some(size) = state.view_size() {
                self.view_size = Some(size);
            }
        }

        self.load_inner(LoadParams {
            manifest,
            parameter_values,
        })
    }

    fn load_inner(&mut self, params: LoadParams) -> Result<()> {
        if !self.engine_available {
            return Err(AdapterError::EngineUnavailable(
                ENGINE_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }

        // A fixed-size view always opens at the size its manifest declares.
        if !params.manifest.are_all_views_resizable() {
            self.view_size = None;
        }

        let previous = std::mem::replace(&mut self.lifecycle, Lifecycle::Loading);
        self.shared.status.set_state(PatchState::Loading);
        self.teardown_handle();
        if let Some(manifest) = previous.manifest() {
            log::debug!("Replacing patch '{}'", manifest.name);
        }
        drop(previous);

        log::debug!(
            "Loading patch '{}' from {}",
            params.manifest.name,
            params.manifest.location()
        );

        let result = match self.engine.load(&params, self.events.clone()) {
            Ok(mut handle) => {
                let snapshot = PatchSnapshot::capture(&*handle);
                match snapshot.layout.validate() {
                    Ok(()) => {
                        self.buses.set_patch_layout(Some(snapshot.layout.clone()));
                        handle.set_playback_params(self.buses.playback_params());

                        let playable = handle.is_playable();
                        *self.shared.slot.lock() = Some(handle);
                        self.shared.playable.store(playable, Ordering::Release);

                        let status = if playable {
                            Status::default()
                        } else {
                            Status::error(format!("{} is not playable", params.manifest.name))
                        };
                        self.lifecycle = Lifecycle::Loaded {
                            manifest: params.manifest,
                            snapshot,
                            playable,
                        };
                        self.set_status(status);
                        Ok(())
                    }
                    Err(message) => {
                        handle.unload();
                        self.fail(params.manifest.location(), Some(params.manifest), &message);
                        Err(AdapterError::Engine(message))
                    }
                }
            }
            Err(message) => {
                self.fail(params.manifest.location(), Some(params.manifest), &message);
                Err(AdapterError::Engine(message))
            }
        };

        self.shared.status.set_state(self.lifecycle.state());
        self.mark_changed();
        result
    }

    /// Drop whatever was loaded and record a failed load of `location`.
    fn fail(&mut self, location: String, manifest: Option<PatchManifest>, message: &str) {
        log::warn!("Failed to load {location}: {message}");
        self.teardown_handle();
        self.buses.set_patch_layout(None);
        self.lifecycle = Lifecycle::Failed { location, manifest };
        self.shared.status.set_state(PatchState::LoadedError);
        self.set_status(Status::error(message));
        self.mark_changed();
    }

    fn unload_inner(&mut self) {
        let previous = std::mem::replace(&mut self.lifecycle, Lifecycle::Unloaded);
        self.teardown_handle();
        if let Some(manifest) = previous.manifest() {
            log::debug!("Unloaded patch '{}'", manifest.name);
        }

        self.buses.set_patch_layout(None);
        self.view_size = None;
        self.shared.status.set_state(PatchState::Unloaded);
        self.set_status(Status::default());
        self.mark_changed();
    }

    /// Stop the audio thread from rendering, then release the handle.
    fn teardown_handle(&mut self) {
        self.shared.playable.store(false, Ordering::Release);
        let previous = self.shared.slot.lock().take();
        if let Some(mut handle) = previous {
            handle.unload();
        }
    }

    /// Re-read a patch that reported a change of its own.
    fn refresh_snapshot(&mut self) {
        let captured = {
            let slot = self.shared.slot.lock();
            slot.as_ref()
                .map(|handle| (PatchSnapshot::capture(&**handle), handle.is_playable()))
        };
        let Some((fresh, now_playable)) = captured else {
            return;
        };

        if let Lifecycle::Loaded {
            snapshot, playable, ..
        } = &mut self.lifecycle
        {
            self.buses.set_patch_layout(Some(fresh.layout.clone()));
            *snapshot = fresh;
            *playable = now_playable;
            self.shared.playable.store(now_playable, Ordering::Release);
            self.shared.status.set_state(self.lifecycle.state());
        }
    }

    fn mark_changed(&self) {
        self.shared.change_pending.store(true, Ordering::Release);
    }

    /// Publish `status`, notifying the host only if it changed.
    ///
    /// Once the engine is known to be unavailable that status is final.
    fn set_status(&mut self, status: Status) {
        if !self.engine_available {
            return;
        }
        if self.shared.status.replace(&status) {
            log::debug!("Status: {:?} (error: {})", status.message, status.is_error);
            self.host.status_changed(&status);
        }
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Host-facing parameters, in host index order.
    pub fn parameters(&self) -> &[Arc<HostParameter>] {
        self.strategy.parameters()
    }

    pub fn parameter_strategy(&self) -> &dyn ParameterStrategy {
        self.strategy.as_ref()
    }

    /// Group tree of a fixed adapter. Pooled parameters are flat.
    pub fn group_tree(&self) -> Option<&ParameterGroup> {
        self.strategy.group_tree()
    }

    // =========================================================================
    // Buses and playback
    // =========================================================================

    /// Layout to offer a host before negotiation.
    pub fn default_layout(&self) -> BusLayout {
        match (&self.source, self.buses.patch_layout()) {
            (PatchSource::Fixed(_), Some(layout)) => layout.clone(),
            _ => BusLayout::stereo(),
        }
    }

    /// Buses of the loaded patch.
    pub fn patch_layout(&self) -> Option<&BusLayout> {
        self.buses.patch_layout()
    }

    pub fn accepted_layout(&self) -> &ProposedLayout {
        self.buses.accepted()
    }

    pub fn is_layout_supported(&self, proposal: &ProposedLayout) -> bool {
        self.buses.is_supported(proposal)
    }

    /// Accept a host layout and pass the new channel counts to the patch.
    /// A rejected layout leaves the previous one in place.
    pub fn apply_bus_layout(&mut self, proposal: ProposedLayout) -> Result<()> {
        match self.buses.apply(proposal) {
            Ok(_) => {
                self.push_playback_params();
                Ok(())
            }
            Err(e) => {
                self.set_status(Status::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Update sample rate and block size before playback.
    pub fn prepare_to_play(&mut self, sample_rate: f64, block_size: u32) {
        let params = self.buses.prepare(sample_rate, block_size);
        log::debug!("Prepare to play: {params:?}");
        self.push_playback_params();
    }

    pub fn playback_params(&self) -> PlaybackParams {
        self.buses.playback_params()
    }

    /// A MIDI buffer sized for this adapter's blocks.
    pub fn midi_buffer(&self) -> MidiBuffer {
        MidiBuffer::with_capacity(self.config.max_midi_events)
    }

    fn push_playback_params(&self) {
        let params = self.buses.playback_params();
        if let Some(handle) = self.shared.slot.lock().as_mut() {
            handle.set_playback_params(params);
        }
    }

    // =========================================================================
    // Description and capabilities
    // =========================================================================

    pub fn description(&self) -> PluginDescription {
        match (&self.source, self.lifecycle.manifest()) {
            (PatchSource::Fixed(manifest), _) | (PatchSource::Dynamic, Some(manifest)) => {
                PluginDescription::for_manifest(&self.config, manifest)
            }
            (PatchSource::Dynamic, None) => PluginDescription::for_loader(&self.config),
        }
    }

    fn snapshot_flag(&self, flag: impl Fn(&PatchSnapshot) -> bool) -> bool {
        self.lifecycle.snapshot().is_some_and(flag)
    }

    /// An empty loader accepts MIDI so a host keeps routing it.
    pub fn accepts_midi(&self) -> bool {
        self.snapshot_flag(|s| s.has_midi_input) || !self.is_loaded()
    }

    pub fn produces_midi(&self) -> bool {
        self.snapshot_flag(|s| s.has_midi_output)
    }

    pub fn is_midi_effect(&self) -> bool {
        self.snapshot_flag(|s| s.has_midi_input && !s.has_audio_output)
    }

    pub fn supports_mpe(&self) -> bool {
        self.accepts_midi()
    }

    /// Latency last reported to the host.
    pub fn latency_frames(&self) -> u32 {
        self.latency_frames
    }

    // =========================================================================
    // View
    // =========================================================================

    /// Remember the editor size so it is persisted with the state.
    pub fn set_view_size(&mut self, width: u32, height: u32) {
        let size = Size::new(width, height);
        self.view_size = (!size.is_empty()).then_some(size);
    }

    /// Editor size: the remembered one, else the patch's preferred one, else
    /// the configured default.
    pub fn view_size(&self) -> Size {
        self.view_size
            .or_else(|| self.manifest().and_then(PatchManifest::preferred_view_size))
            .unwrap_or(self.config.default_view_size)
    }
}

impl Drop for PatchAdapter {
    fn drop(&mut self) {
        self.teardown_handle();
    }
}

impl std::fmt::Debug for PatchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchAdapter")
            .field("state", &self.state())
            .field("status", &self.status())
            .field("source", &self.source)
            .field("parameters", &self.parameters().len())
            .finish()
    }
}

fn manifest_error_message(error: &AdapterError) -> String {
    match error {
        AdapterError::ManifestInvalid(message) => message.clone(),
        other => other.to_string(),
    }
}
