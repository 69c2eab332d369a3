//! Parameter descriptors owned by a patch.
//!
//! A [`PatchParameter`] describes one parameter endpoint of a loaded patch and
//! stores its current native value. Descriptors are created by the engine,
//! owned by the patch handle and die with it on every reload. Host-facing
//! objects only ever hold a `Weak` reference to them.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Weak;

use parking_lot::RwLock;

use crate::parameter_range::ParameterRange;

/// Receives changes that originate on the patch side of a descriptor.
///
/// The host parameter currently bound to a descriptor registers itself as
/// its observer.
pub trait ParameterObserver: Send + Sync {
    /// The native value changed from inside the patch or its view.
    fn value_changed(&self, native: f32);
    /// A user gesture (e.g. a drag in the patch view) started.
    fn gesture_begin(&self);
    /// The gesture ended.
    fn gesture_end(&self);
}

/// Metadata and live value of one patch parameter.
pub struct PatchParameter {
    endpoint_id: String,
    name: String,
    unit: String,
    range: ParameterRange,
    default_value: f32,
    step: f32,
    num_steps: u32,
    boolean: bool,
    automatable: bool,
    hidden: bool,
    value_strings: Vec<String>,
    group: String,

    // Native value stored as f32 bits.
    value: AtomicU32,
    // Set whenever the value changes until the engine picks it up.
    pending: AtomicBool,
    observer: RwLock<Option<Weak<dyn ParameterObserver>>>,
}

impl PatchParameter {
    /// Create a continuous parameter. The current value starts at `default`.
    pub fn new(
        endpoint_id: impl Into<String>,
        name: impl Into<String>,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        let range = ParameterRange::new(min, max);
        let default_value = range.clamp(default);
        Self {
            endpoint_id: endpoint_id.into(),
            name: name.into(),
            unit: String::new(),
            range,
            default_value,
            step: 0.0,
            num_steps: 0,
            boolean: false,
            automatable: true,
            hidden: false,
            value_strings: Vec::new(),
            group: String::new(),
            value: AtomicU32::new(default_value.to_bits()),
            pending: AtomicBool::new(false),
            observer: RwLock::new(None),
        }
    }

    /// Create a boolean (on/off) parameter.
    pub fn boolean(endpoint_id: impl Into<String>, name: impl Into<String>, default: bool) -> Self {
        let mut param = Self::new(endpoint_id, name, 0.0, 1.0, if default { 1.0 } else { 0.0 });
        param.boolean = true;
        param.step = 1.0;
        param.num_steps = 2;
        param
    }

    /// Set the unit label (e.g. "dB", "Hz").
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the step size. The number of steps is derived from the range.
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self.num_steps = if step > 0.0 && !self.range.is_degenerate() {
            ((self.range.max - self.range.min).abs() / step).round() as u32 + 1
        } else {
            0
        };
        self
    }

    /// Set enumerated value strings. The step becomes one value per string.
    pub fn with_value_strings<I, S>(mut self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_strings = strings.into_iter().map(Into::into).collect();
        if !self.value_strings.is_empty() {
            self.num_steps = self.value_strings.len() as u32;
            self.step = if self.value_strings.len() > 1 {
                (self.range.max - self.range.min) / (self.value_strings.len() - 1) as f32
            } else {
                0.0
            };
        }
        self
    }

    /// Set the slash-separated group path (e.g. "Filter/Envelope").
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Mark the parameter as hidden from host parameter lists.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set whether the host may automate the parameter.
    pub fn with_automatable(mut self, automatable: bool) -> Self {
        self.automatable = automatable;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn range(&self) -> ParameterRange {
        self.range
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Number of discrete steps, 0 for continuous parameters.
    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    pub fn is_automatable(&self) -> bool {
        self.automatable
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn value_strings(&self) -> &[String] {
        &self.value_strings
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    // =========================================================================
    // Value
    // =========================================================================

    /// Current native value.
    #[inline]
    pub fn current_value(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Current value mapped to `0.0..=1.0`.
    #[inline]
    pub fn normalized_value(&self) -> f32 {
        self.range.normalize(self.current_value())
    }

    /// Store a new native value and mark it pending for the engine.
    ///
    /// With `notify_host` set, the bound observer is told about the change.
    /// Host-originated writes pass `false` so the host never hears its own
    /// change echoed back.
    pub fn set_value(&self, native: f32, notify_host: bool) {
        let native = self.range.clamp(native);
        self.value.store(native.to_bits(), Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);

        if notify_host {
            if let Some(observer) = self.observer() {
                observer.value_changed(native);
            }
        }
    }

    /// Take the value if it changed since the last call.
    ///
    /// Called by the engine once per block; never blocks.
    #[inline]
    pub fn take_pending(&self) -> Option<f32> {
        if self.pending.swap(false, Ordering::AcqRel) {
            Some(self.current_value())
        } else {
            None
        }
    }

    /// Report the start of a patch-side gesture to the host.
    pub fn begin_gesture(&self) {
        if let Some(observer) = self.observer() {
            observer.gesture_begin();
        }
    }

    /// Report the end of a patch-side gesture to the host.
    pub fn end_gesture(&self) {
        if let Some(observer) = self.observer() {
            observer.gesture_end();
        }
    }

    // =========================================================================
    // Observer
    // =========================================================================

    pub(crate) fn set_observer(&self, observer: Weak<dyn ParameterObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Drop the observer if it is `observer`.
    pub(crate) fn clear_observer(&self, observer: &Weak<dyn ParameterObserver>) {
        let mut slot = self.observer.write();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(observer)) {
            *slot = None;
        }
    }

    fn observer(&self) -> Option<std::sync::Arc<dyn ParameterObserver>> {
        self.observer.read().as_ref().and_then(Weak::upgrade)
    }

    // =========================================================================
    // Text conversion
    // =========================================================================

    /// Index into the value strings for a native value.
    fn value_string_index(&self, native: f32) -> usize {
        let last = self.value_strings.len().saturating_sub(1);
        let index = (self.range.normalize(native) * last as f32).round() as usize;
        index.min(last)
    }

    /// Format a native value for display.
    pub fn value_to_string(&self, native: f32) -> String {
        if !self.value_strings.is_empty() {
            return self.value_strings[self.value_string_index(native)].clone();
        }

        if self.boolean {
            let on = native >= (self.range.min + self.range.max) * 0.5;
            return if on { "On" } else { "Off" }.to_string();
        }

        let text = if self.step >= 1.0 && self.step.fract() == 0.0 {
            format!("{native:.0}")
        } else {
            format!("{native:.2}")
        };

        if self.unit.is_empty() {
            text
        } else {
            format!("{text} {}", self.unit)
        }
    }

    /// Parse display text back into a native value.
    ///
    /// Accepts value strings (case-insensitive), on/off words for booleans, and
    /// numbers optionally followed by the unit.
    pub fn string_to_value(&self, text: &str) -> Option<f32> {
        let text = text.trim();

        if let Some(index) = self
            .value_strings
            .iter()
            .position(|s| s.eq_ignore_ascii_case(text))
        {
            let last = self.value_strings.len().saturating_sub(1);
            if last == 0 {
                return Some(self.range.min);
            }
            return Some(self.range.denormalize(index as f32 / last as f32));
        }

        if self.boolean {
            match text.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" => return Some(self.range.max),
                "off" | "false" | "no" => return Some(self.range.min),
                _ => {}
            }
        }

        let numeric = text
            .strip_suffix(self.unit.as_str())
            .filter(|_| !self.unit.is_empty())
            .unwrap_or(text)
            .trim();
        numeric.parse::<f32>().ok().map(|v| self.range.clamp(v))
    }
}

impl std::fmt::Debug for PatchParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchParameter")
            .field("endpoint_id", &self.endpoint_id)
            .field("name", &self.name)
            .field("range", &self.range)
            .field("value", &self.current_value())
            .finish_non_exhaustive()
    }
}
