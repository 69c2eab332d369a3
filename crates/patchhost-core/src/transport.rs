//! Host transport information for one processing block.
//!
//! Every field is optional because hosts differ in what they report. Only
//! the facts that are present get forwarded to the patch.

/// Transport and timeline state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transport {
    /// Tempo in beats per minute.
    pub tempo: Option<f64>,
    /// Time signature numerator (e.g. 3 in 3/4).
    pub time_sig_numerator: Option<i32>,
    /// Time signature denominator (e.g. 4 in 3/4).
    pub time_sig_denominator: Option<i32>,
    /// Position of the block start in samples.
    pub project_time_samples: Option<i64>,
    /// Position of the block start in quarter notes.
    pub project_time_beats: Option<f64>,
    /// Position of the current bar start in quarter notes.
    pub bar_position_beats: Option<f64>,
    pub is_playing: bool,
    pub is_recording: bool,
}

impl Transport {
    /// Time signature if the host reported both halves.
    #[inline]
    pub fn time_signature(&self) -> Option<(i32, i32)> {
        match (self.time_sig_numerator, self.time_sig_denominator) {
            (Some(num), Some(den)) => Some((num, den)),
            _ => None,
        }
    }
}
