//! Scripted engine, patch and host listener for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bus_config::PlaybackParams;
use crate::endpoint::{EndpointDetails, EndpointDirection, EndpointKind};
use crate::engine::{LoadParams, PatchEngine, PatchHandle, PatchListener};
use crate::manifest::PatchManifest;
use crate::midi::MidiMessage;
use crate::patch_parameter::PatchParameter;
use crate::status::{ChangeDetails, HostListener, Status};

// =============================================================================
// Host listener
// =============================================================================

/// Host listener that records every callback.
#[derive(Default)]
pub struct RecordingListener {
    values: Mutex<Vec<(usize, String, f32)>>,
    gestures: Mutex<Vec<(usize, bool)>>,
    changes: Mutex<Vec<ChangeDetails>>,
    statuses: Mutex<Vec<Status>>,
    console: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn value_changes(&self) -> Vec<(usize, String, f32)> {
        self.values.lock().clone()
    }

    pub fn gestures(&self) -> Vec<(usize, bool)> {
        self.gestures.lock().clone()
    }

    pub fn patch_changes(&self) -> Vec<ChangeDetails> {
        self.changes.lock().clone()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().clone()
    }

    pub fn console(&self) -> Vec<String> {
        self.console.lock().clone()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
        self.gestures.lock().clear();
        self.changes.lock().clear();
        self.statuses.lock().clear();
        self.console.lock().clear();
    }
}

impl HostListener for RecordingListener {
    fn parameter_value_changed(&self, index: usize, id: &str, normalized: f32) {
        self.values.lock().push((index, id.to_string(), normalized));
    }

    fn parameter_gesture_begin(&self, index: usize, _id: &str) {
        self.gestures.lock().push((index, true));
    }

    fn parameter_gesture_end(&self, index: usize, _id: &str) {
        self.gestures.lock().push((index, false));
    }

    fn patch_changed(&self, details: &ChangeDetails) {
        self.changes.lock().push(*details);
    }

    fn status_changed(&self, status: &Status) {
        self.statuses.lock().push(status.clone());
    }

    fn console_message(&self, text: &str) {
        self.console.lock().push(text.to_string());
    }
}

// =============================================================================
// Fake patch
// =============================================================================

type ParameterFactory = Arc<dyn Fn() -> Vec<PatchParameter> + Send + Sync>;

/// Description of a fake patch.
#[derive(Clone)]
pub struct FakePatchSpec {
    parameters: ParameterFactory,
    inputs: Vec<EndpointDetails>,
    outputs: Vec<EndpointDetails>,
    playable: bool,
    latency: u32,
    echo_midi: bool,
    extra_midi_out: usize,
    fail_with: Option<String>,
}

impl FakePatchSpec {
    pub fn new(
        inputs: Vec<EndpointDetails>,
        outputs: Vec<EndpointDetails>,
        parameters: impl Fn() -> Vec<PatchParameter> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parameters: Arc::new(parameters),
            inputs,
            outputs,
            playable: true,
            latency: 0,
            echo_midi: false,
            extra_midi_out: 0,
            fail_with: None,
        }
    }

    /// Stereo in/out with one gain parameter `[0, 1]`, default 0.5, that
    /// scales the audio.
    pub fn stereo_gain(gain_id: &'static str) -> Self {
        Self::new(
            vec![EndpointDetails::audio_input("in", 2)],
            vec![EndpointDetails::audio_output("out", 2)],
            move || vec![PatchParameter::new(gain_id, "Gain", 0.0, 1.0, 0.5)],
        )
    }

    /// Mono in/out with one boolean parameter, default off.
    pub fn mono_switch() -> Self {
        Self::new(
            vec![EndpointDetails::audio_input("in", 1)],
            vec![EndpointDetails::audio_output("out", 1)],
            || vec![PatchParameter::boolean("enabled", "Enabled", false)],
        )
    }

    /// Stereo output with one frequency parameter `[20, 20000]`, default 440.
    pub fn stereo_freq() -> Self {
        Self::new(
            vec![],
            vec![EndpointDetails::audio_output("out", 2)],
            || vec![PatchParameter::new("freq", "Frequency", 20.0, 20000.0, 440.0).with_unit("Hz")],
        )
    }

    /// Add MIDI in/out endpoints and echo incoming MIDI.
    pub fn with_midi(mut self) -> Self {
        self.inputs.push(EndpointDetails::new(
            "midiIn",
            EndpointDirection::Input,
            EndpointKind::Midi,
        ));
        self.outputs.push(EndpointDetails::new(
            "midiOut",
            EndpointDirection::Output,
            EndpointKind::Midi,
        ));
        self.echo_midi = true;
        self
    }

    pub fn with_timeline(mut self) -> Self {
        self.inputs.push(EndpointDetails::new(
            "timeline",
            EndpointDirection::Input,
            EndpointKind::Timeline,
        ));
        self
    }

    pub fn with_latency(mut self, frames: u32) -> Self {
        self.latency = frames;
        self
    }

    pub fn with_extra_midi_out(mut self, count: usize) -> Self {
        self.extra_midi_out = count;
        self
    }

    pub fn unplayable(mut self) -> Self {
        self.playable = false;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }
}

#[derive(Default)]
struct RecordedInner {
    process_calls: usize,
    midi_in: Vec<(u32, Vec<u8>)>,
    timeline: Vec<String>,
    playback: Vec<PlaybackParams>,
    unloaded: bool,
}

/// What a fake patch observed, shared with the test.
#[derive(Clone, Default)]
pub struct Recorded {
    inner: Arc<Mutex<RecordedInner>>,
}

impl Recorded {
    pub fn process_calls(&self) -> usize {
        self.inner.lock().process_calls
    }

    pub fn midi_in(&self) -> Vec<(u32, Vec<u8>)> {
        self.inner.lock().midi_in.clone()
    }

    pub fn timeline(&self) -> Vec<String> {
        self.inner.lock().timeline.clone()
    }

    pub fn playback(&self) -> Vec<PlaybackParams> {
        self.inner.lock().playback.clone()
    }

    pub fn is_unloaded(&self) -> bool {
        self.inner.lock().unloaded
    }
}

pub struct FakePatch {
    manifest: PatchManifest,
    spec: FakePatchSpec,
    parameters: Vec<Arc<PatchParameter>>,
    pending_midi: Vec<(u32, MidiMessage)>,
    recorded: Recorded,
}

impl FakePatch {
    pub fn new(spec: FakePatchSpec) -> (Self, Recorded) {
        let manifest = PatchManifest {
            id: "fake".to_string(),
            name: "Fake".to_string(),
            ..Default::default()
        };
        Self::with_manifest(spec, manifest)
    }

    pub fn with_manifest(spec: FakePatchSpec, manifest: PatchManifest) -> (Self, Recorded) {
        let recorded = Recorded::default();
        let parameters = (spec.parameters)().into_iter().map(Arc::new).collect();
        let patch = Self {
            manifest,
            spec,
            parameters,
            pending_midi: Vec::new(),
            recorded: recorded.clone(),
        };
        (patch, recorded)
    }
}

impl PatchHandle for FakePatch {
    fn manifest(&self) -> &PatchManifest {
        &self.manifest
    }

    fn is_playable(&self) -> bool {
        self.spec.playable
    }

    fn parameters(&self) -> &[Arc<PatchParameter>] {
        &self.parameters
    }

    fn input_endpoints(&self) -> &[EndpointDetails] {
        &self.spec.inputs
    }

    fn output_endpoints(&self) -> &[EndpointDetails] {
        &self.spec.outputs
    }

    fn latency_frames(&self) -> u32 {
        self.spec.latency
    }

    fn set_playback_params(&mut self, params: PlaybackParams) {
        self.recorded.inner.lock().playback.push(params);
    }

    fn process(
        &mut self,
        channels: &mut [&mut [f32]],
        frames: usize,
        midi_out: &mut dyn FnMut(u32, MidiMessage),
    ) {
        let gain = self
            .parameters
            .iter()
            .find(|p| !p.is_boolean())
            .map(|p| p.current_value())
            .unwrap_or(1.0);
        for channel in channels.iter_mut() {
            for sample in channel.iter_mut().take(frames) {
                *sample *= gain;
            }
        }

        for (frame, message) in self.pending_midi.drain(..) {
            if self.spec.echo_midi {
                midi_out(frame, message);
            }
        }
        for i in 0..self.spec.extra_midi_out {
            midi_out(i as u32, MidiMessage::note_on(0, 1, 1));
        }

        self.recorded.inner.lock().process_calls += 1;
    }

    fn add_midi_message(&mut self, frame: u32, data: &[u8]) {
        if let Some(message) = MidiMessage::from_bytes(data) {
            self.pending_midi.push((frame, message));
        }
        self.recorded.inner.lock().midi_in.push((frame, data.to_vec()));
    }

    fn send_time_signature(&mut self, numerator: i32, denominator: i32) {
        self.recorded
            .inner
            .lock()
            .timeline
            .push(format!("timesig {numerator}/{denominator}"));
    }

    fn send_bpm(&mut self, bpm: f32) {
        self.recorded.inner.lock().timeline.push(format!("bpm {bpm}"));
    }

    fn send_transport_state(&mut self, recording: bool, playing: bool) {
        self.recorded
            .inner
            .lock()
            .timeline
            .push(format!("transport rec={recording} play={playing}"));
    }

    fn send_position(&mut self, frame: i64, quarter_note: f64, bar_start_quarter_note: f64) {
        self.recorded
            .inner
            .lock()
            .timeline
            .push(format!("position {frame} {quarter_note} {bar_start_quarter_note}"));
    }

    fn unload(&mut self) {
        self.recorded.inner.lock().unloaded = true;
    }
}

// =============================================================================
// Fake engine
// =============================================================================

#[derive(Default)]
struct EngineInner {
    specs: HashMap<String, FakePatchSpec>,
    loads: Vec<LoadParams>,
    recorded: Vec<Recorded>,
    listener: Option<Arc<dyn PatchListener>>,
    init_error: Option<String>,
}

/// Engine that builds [`FakePatch`]es from specs registered by manifest ID.
#[derive(Clone, Default)]
pub struct FakeEngine {
    inner: Arc<Mutex<EngineInner>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, manifest_id: &str, spec: FakePatchSpec) {
        self.inner.lock().specs.insert(manifest_id.to_string(), spec);
    }

    pub fn fail_initialisation(&self, message: &str) {
        self.inner.lock().init_error = Some(message.to_string());
    }

    /// Every load request, in order.
    pub fn loads(&self) -> Vec<LoadParams> {
        self.inner.lock().loads.clone()
    }

    /// Recorder of the most recently built patch.
    pub fn last_patch(&self) -> Option<Recorded> {
        self.inner.lock().recorded.last().cloned()
    }

    pub fn patches(&self) -> Vec<Recorded> {
        self.inner.lock().recorded.clone()
    }

    /// Listener handed to the most recent load.
    pub fn listener(&self) -> Option<Arc<dyn PatchListener>> {
        self.inner.lock().listener.clone()
    }
}

impl PatchEngine for FakeEngine {
    fn initialise(&self) -> Result<(), String> {
        match &self.inner.lock().init_error {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }

    fn load(
        &self,
        params: &LoadParams,
        listener: Arc<dyn PatchListener>,
    ) -> Result<Box<dyn PatchHandle>, String> {
        let mut inner = self.inner.lock();
        inner.loads.push(params.clone());
        inner.listener = Some(listener);

        let spec = inner
            .specs
            .get(&params.manifest.id)
            .cloned()
            .ok_or_else(|| format!("Unknown patch '{}'", params.manifest.id))?;
        if let Some(message) = &spec.fail_with {
            return Err(message.clone());
        }

        let (patch, recorded) = FakePatch::with_manifest(spec, params.manifest.clone());
        for parameter in patch.parameters() {
            if let Some(&value) = params.parameter_values.get(parameter.endpoint_id()) {
                parameter.set_value(value, false);
            }
        }
        inner.recorded.push(recorded);
        Ok(Box::new(patch))
    }
}

// =============================================================================
// Manifests on disk
// =============================================================================

/// Write a minimal manifest for `id` into `dir` and return its path.
pub fn write_manifest(dir: &Path, file_name: &str, id: &str, extra: &str) -> PathBuf {
    let path = dir.join(file_name);
    let separator = if extra.is_empty() { "" } else { "," };
    let text = format!(r#"{{ "ID": "{id}", "name": "{id}"{separator} {extra} }}"#);
    std::fs::write(&path, text).expect("write manifest");
    path
}
