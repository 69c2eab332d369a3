//! Audio/MIDI block translation on the audio thread.
//!
//! [`AudioProcessor`] turns one host processing callback into one patch
//! render call. It never allocates and never waits: if the patch is not
//! playable, processing is suspended, or the control context currently holds
//! the patch (mid-reload), the block is silenced instead.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::control::Shared;
use crate::engine::PatchHandle;
use crate::midi::{MidiBuffer, MidiEvent};
use crate::transport::Transport;

/// Outcome of one processing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The patch rendered the block.
    Rendered,
    /// The block was cleared without rendering.
    Silenced,
}

/// Audio-thread entry point of an adapter.
///
/// Obtained from [`PatchAdapter::audio_processor`](crate::PatchAdapter::audio_processor)
/// and moved to the audio thread.
pub struct AudioProcessor {
    shared: Arc<Shared>,
}

impl AudioProcessor {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Process one block in place.
    ///
    /// `audio` holds one slice per channel (inputs on entry, outputs on
    /// return). `midi` holds the incoming events on entry and the patch's
    /// outgoing events on return, at the offsets the patch gave them.
    pub fn process(
        &mut self,
        audio: &mut [&mut [f32]],
        frames: usize,
        midi: &mut MidiBuffer,
        transport: Option<&Transport>,
    ) -> ProcessStatus {
        if self.shared.suspended.load(Ordering::Acquire)
            || !self.shared.playable.load(Ordering::Acquire)
        {
            return silence(audio, midi);
        }

        let Some(mut slot) = self.shared.slot.try_lock() else {
            return silence(audio, midi);
        };
        let Some(patch) = slot.as_mut() else {
            return silence(audio, midi);
        };

        if let Some(transport) = transport {
            if patch.wants_timecode_events() {
                forward_transport(patch.as_mut(), transport);
            }
        }

        for event in midi.iter() {
            patch.add_midi_message(event.sample_offset, event.message.bytes());
        }
        midi.clear();

        patch.process(audio, frames, &mut |frame, message| {
            midi.push(MidiEvent::new(frame, message));
        });
        drop(slot);

        if midi.has_overflowed() {
            self.shared.midi_overflow.store(true, Ordering::Release);
        }

        ProcessStatus::Rendered
    }
}

/// Clear every channel and the MIDI buffer.
fn silence(audio: &mut [&mut [f32]], midi: &mut MidiBuffer) -> ProcessStatus {
    for channel in audio.iter_mut() {
        channel.fill(0.0);
    }
    midi.clear();
    ProcessStatus::Silenced
}

/// Forward whatever transport facts the host reported.
fn forward_transport(patch: &mut dyn PatchHandle, transport: &Transport) {
    if let Some((numerator, denominator)) = transport.time_signature() {
        patch.send_time_signature(numerator, denominator);
    }

    if let Some(tempo) = transport.tempo {
        patch.send_bpm(tempo as f32);
    }

    patch.send_transport_state(transport.is_recording, transport.is_playing);

    if let Some(position) = transport.project_time_samples {
        patch.send_position(
            position,
            transport.project_time_beats.unwrap_or(0.0),
            transport.bar_position_beats.unwrap_or(0.0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiMessage;
    use crate::test_support::{FakePatch, FakePatchSpec, Recorded};

    fn processor_with(spec: FakePatchSpec) -> (AudioProcessor, Arc<Shared>, Recorded) {
        let (shared, _receiver) = Shared::new();
        let (patch, recorded) = FakePatch::new(spec);
        *shared.slot.lock() = Some(Box::new(patch));
        shared.playable.store(true, Ordering::Release);
        (AudioProcessor::new(shared.clone()), shared, recorded)
    }

    fn block(value: f32) -> Vec<Vec<f32>> {
        vec![vec![value; 8], vec![value; 8]]
    }

    fn run(
        processor: &mut AudioProcessor,
        channels: &mut [Vec<f32>],
        midi: &mut MidiBuffer,
        transport: Option<&Transport>,
    ) -> ProcessStatus {
        let mut slices: Vec<&mut [f32]> = channels.iter_mut().map(|c| c.as_mut_slice()).collect();
        processor.process(&mut slices, 8, midi, transport)
    }

    #[test]
    fn test_silence_when_suspended() {
        let (mut processor, shared, recorded) = processor_with(FakePatchSpec::stereo_gain("g"));
        shared.suspended.store(true, Ordering::Release);

        let mut channels = block(1.0);
        let mut midi = MidiBuffer::new();
        midi.push(MidiEvent::new(0, MidiMessage::note_on(0, 60, 100)));

        assert_eq!(run(&mut processor, &mut channels, &mut midi, None), ProcessStatus::Silenced);
        assert!(channels.iter().flatten().all(|&s| s == 0.0));
        assert!(midi.is_empty());
        assert_eq!(recorded.process_calls(), 0);
    }

    #[test]
    fn test_silence_when_unplayable_or_empty() {
        let (mut processor, shared, _recorded) = processor_with(FakePatchSpec::stereo_gain("g"));
        shared.playable.store(false, Ordering::Release);
        let mut channels = block(0.5);
        let mut midi = MidiBuffer::new();
        assert_eq!(run(&mut processor, &mut channels, &mut midi, None), ProcessStatus::Silenced);
        assert!(channels.iter().flatten().all(|&s| s == 0.0));

        // Playable flag without a handle still degrades to silence.
        shared.slot.lock().take();
        shared.playable.store(true, Ordering::Release);
        let mut channels = block(0.5);
        assert_eq!(run(&mut processor, &mut channels, &mut midi, None), ProcessStatus::Silenced);
        assert!(channels.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_silence_while_control_holds_patch() {
        let (mut processor, shared, _recorded) = processor_with(FakePatchSpec::stereo_gain("g"));
        let guard = shared.slot.lock();
        let mut channels = block(0.5);
        let mut midi = MidiBuffer::new();
        assert_eq!(run(&mut processor, &mut channels, &mut midi, None), ProcessStatus::Silenced);
        drop(guard);
        assert_eq!(run(&mut processor, &mut channels, &mut midi, None), ProcessStatus::Rendered);
    }

    #[test]
    fn test_renders_and_reinjects_midi_in_order() {
        let (mut processor, _shared, recorded) = processor_with(FakePatchSpec::stereo_gain("g").with_midi());
        let mut channels = block(1.0);
        let mut midi = MidiBuffer::new();
        midi.push(MidiEvent::new(2, MidiMessage::note_on(0, 60, 100)));
        midi.push(MidiEvent::new(5, MidiMessage::note_off(0, 60, 0)));

        assert_eq!(run(&mut processor, &mut channels, &mut midi, None), ProcessStatus::Rendered);

        // Gain default 0.5 applied in place.
        assert!(channels.iter().flatten().all(|&s| (s - 0.5).abs() < 1e-6));
        assert_eq!(recorded.midi_in(), vec![(2, vec![0x90, 60, 100]), (5, vec![0x80, 60, 0])]);

        // The fake echoes incoming MIDI at the same offsets.
        let out: Vec<(u32, Vec<u8>)> = midi
            .iter()
            .map(|e| (e.sample_offset, e.message.bytes().to_vec()))
            .collect();
        assert_eq!(out, vec![(2, vec![0x90, 60, 100]), (5, vec![0x80, 60, 0])]);
    }

    #[test]
    fn test_transport_forwarded_only_when_wanted() {
        let transport = Transport {
            tempo: Some(120.0),
            time_sig_numerator: Some(3),
            time_sig_denominator: Some(4),
            project_time_samples: Some(48000),
            project_time_beats: Some(2.0),
            bar_position_beats: Some(0.0),
            is_playing: true,
            is_recording: false,
        };

        let (mut processor, _shared, recorded) = processor_with(FakePatchSpec::stereo_gain("g"));
        let mut channels = block(0.0);
        let mut midi = MidiBuffer::new();
        run(&mut processor, &mut channels, &mut midi, Some(&transport));
        assert!(recorded.timeline().is_empty());

        let (mut processor, _shared, recorded) =
            processor_with(FakePatchSpec::stereo_gain("g").with_timeline());
        run(&mut processor, &mut channels, &mut midi, Some(&transport));
        assert_eq!(
            recorded.timeline(),
            vec![
                "timesig 3/4".to_string(),
                "bpm 120".to_string(),
                "transport rec=false play=true".to_string(),
                "position 48000 2 0".to_string(),
            ]
        );
    }

    #[test]
    fn test_midi_overflow_flagged() {
        let (mut processor, shared, _recorded) = processor_with(FakePatchSpec::stereo_gain("g").with_midi());
        let mut channels = block(0.0);
        let mut midi = MidiBuffer::with_capacity(1);
        midi.push(MidiEvent::new(0, MidiMessage::note_on(0, 60, 1)));
        // Echo of one event fits; push a second through the fake's extra output.
        run(&mut processor, &mut channels, &mut midi, None);
        assert!(!shared.midi_overflow.load(Ordering::Acquire));

        let (mut processor, shared, _recorded) =
            processor_with(FakePatchSpec::stereo_gain("g").with_midi().with_extra_midi_out(2));
        let mut midi = MidiBuffer::with_capacity(1);
        run(&mut processor, &mut channels, &mut midi, None);
        assert_eq!(midi.len(), 1);
        assert!(shared.midi_overflow.load(Ordering::Acquire));
    }
}
