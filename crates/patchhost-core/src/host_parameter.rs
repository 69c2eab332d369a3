//! Host-facing parameter objects.
//!
//! A [`HostParameter`] is what the plugin runtime sees. Its id and index are
//! fixed at creation; what it represents is a weak binding to a
//! [`PatchParameter`] that is swapped on every reload. While unbound it
//! reports neutral values so hosts can keep querying it safely.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::patch_parameter::{ParameterObserver, PatchParameter};
use crate::status::HostListener;
use crate::types::DEFAULT_NUM_STEPS;

/// Name reported by a slot with no descriptor.
pub const UNBOUND_NAME: &str = "unknown";

/// A stable parameter exposed to the host.
pub struct HostParameter {
    index: usize,
    id: String,
    binding: RwLock<Weak<PatchParameter>>,
    listener: Arc<dyn HostListener>,
    this: Weak<HostParameter>,
}

impl HostParameter {
    /// Create an unbound parameter.
    pub fn new(index: usize, id: impl Into<String>, listener: Arc<dyn HostListener>) -> Arc<Self> {
        let id = id.into();
        Arc::new_cyclic(|this| Self {
            index,
            id,
            binding: RwLock::new(Weak::new()),
            listener,
            this: this.clone(),
        })
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stable index in the host's parameter list.
    pub fn index(&self) -> usize {
        self.index
    }

    fn as_observer(&self) -> Weak<dyn ParameterObserver> {
        self.this.clone()
    }

    /// Point this parameter at `param`.
    ///
    /// Returns false if it was already bound to the same descriptor.
    /// Otherwise the host is told about the new descriptor's current value so
    /// its controls refresh.
    pub fn bind(&self, param: &Arc<PatchParameter>) -> bool {
        let observer = self.as_observer();
        {
            let mut binding = self.binding.write();
            let new_binding = Arc::downgrade(param);
            if binding.ptr_eq(&new_binding) {
                return false;
            }
            if let Some(old) = binding.upgrade() {
                old.clear_observer(&observer);
            }
            *binding = new_binding;
        }

        param.set_observer(observer);
        self.value_changed(param.current_value());
        true
    }

    /// Drop the binding. Returns false if there was none.
    pub fn unbind(&self) -> bool {
        let mut binding = self.binding.write();
        if binding.ptr_eq(&Weak::new()) {
            return false;
        }
        if let Some(old) = binding.upgrade() {
            old.clear_observer(&self.as_observer());
        }
        *binding = Weak::new();
        true
    }

    /// The descriptor currently represented, if it is still alive.
    pub fn descriptor(&self) -> Option<Arc<PatchParameter>> {
        self.binding.read().upgrade()
    }

    pub fn is_bound(&self) -> bool {
        self.descriptor().is_some()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Display name truncated to `max_len` characters.
    pub fn name(&self, max_len: usize) -> String {
        let name = self
            .descriptor()
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| UNBOUND_NAME.to_string());
        name.chars().take(max_len).collect()
    }

    /// Unit label.
    pub fn label(&self) -> String {
        self.descriptor()
            .map(|p| p.unit().to_string())
            .unwrap_or_default()
    }

    pub fn is_discrete(&self) -> bool {
        self.descriptor().is_some_and(|p| p.step() != 0.0)
    }

    pub fn is_boolean(&self) -> bool {
        self.descriptor().is_some_and(|p| p.is_boolean())
    }

    pub fn is_automatable(&self) -> bool {
        self.descriptor().map_or(true, |p| p.is_automatable())
    }

    /// Hidden parameters are reported as meta parameters.
    pub fn is_meta(&self) -> bool {
        self.descriptor().is_some_and(|p| p.is_hidden())
    }

    pub fn value_strings(&self) -> Vec<String> {
        self.descriptor()
            .map(|p| p.value_strings().to_vec())
            .unwrap_or_default()
    }

    /// Step count for host UIs. Continuous parameters report
    /// [`DEFAULT_NUM_STEPS`].
    pub fn num_steps(&self) -> i32 {
        match self.descriptor() {
            Some(p) if p.num_steps() > 0 => p.num_steps().min(i32::MAX as u32) as i32,
            _ => DEFAULT_NUM_STEPS,
        }
    }

    // =========================================================================
    // Values (normalized)
    // =========================================================================

    pub fn to_normalized(&self, native: f32) -> f32 {
        self.descriptor()
            .map(|p| p.range().normalize(native))
            .unwrap_or(0.0)
    }

    pub fn to_native(&self, normalized: f32) -> f32 {
        self.descriptor()
            .map(|p| p.range().denormalize(normalized))
            .unwrap_or(0.0)
    }

    pub fn default_value(&self) -> f32 {
        self.descriptor()
            .map(|p| p.range().normalize(p.default_value()))
            .unwrap_or(0.0)
    }

    pub fn value(&self) -> f32 {
        self.descriptor()
            .map(|p| p.normalized_value())
            .unwrap_or(0.0)
    }

    /// Host-originated write. Not echoed back to the listener.
    pub fn set_value(&self, normalized: f32) {
        if let Some(p) = self.descriptor() {
            p.set_value(p.range().denormalize(normalized), false);
        }
    }

    /// Display text for a normalized value.
    pub fn text(&self, normalized: f32, max_len: usize) -> String {
        self.descriptor()
            .map(|p| p.value_to_string(p.range().denormalize(normalized)))
            .unwrap_or_default()
            .chars()
            .take(max_len)
            .collect()
    }

    /// Parse display text into a normalized value.
    pub fn value_for_text(&self, text: &str) -> Option<f32> {
        let p = self.descriptor()?;
        p.string_to_value(text).map(|v| p.range().normalize(v))
    }
}

impl ParameterObserver for HostParameter {
    fn value_changed(&self, native: f32) {
        let normalized = self.to_normalized(native);
        self.listener
            .parameter_value_changed(self.index, &self.id, normalized);
    }

    fn gesture_begin(&self) {
        self.listener.parameter_gesture_begin(self.index, &self.id);
    }

    fn gesture_end(&self) {
        self.listener.parameter_gesture_end(self.index, &self.id);
    }
}

impl std::fmt::Debug for HostParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostParameter")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("bound", &self.descriptor().map(|p| p.endpoint_id().to_string()))
            .finish()
    }
}
