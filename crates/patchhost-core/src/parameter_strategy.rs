//! Mapping a patch's parameter list onto the host's parameter model.
//!
//! Hosts expect a parameter list that never changes shape, while a patch can
//! be reloaded with a completely different set. Two strategies bridge this:
//!
//! - [`FixedParameterStrategy`] for patches whose parameter set is known not
//!   to change: one host parameter per descriptor, arranged in a group tree.
//! - [`ReusablePoolStrategy`] for dynamically loaded patches: a pool of
//!   generic `P0`, `P1`, ... slots that are rebound by position on every
//!   reload.

use std::sync::Arc;

use crate::host_parameter::HostParameter;
use crate::parameter_groups::{GroupTreeBuilder, ParameterGroup};
use crate::patch_parameter::PatchParameter;
use crate::status::HostListener;

/// How host parameters follow the patch's parameter list.
pub trait ParameterStrategy: Send + Sync {
    /// Bring the host parameters in line with `params`.
    ///
    /// Returns true if anything the host can observe changed (a slot was
    /// rebound, unbound, added or the tree was rebuilt).
    fn update(&mut self, params: &[Arc<PatchParameter>]) -> bool;

    /// Every host parameter, in host index order.
    fn parameters(&self) -> &[Arc<HostParameter>];

    /// Number of host parameters currently bound to a descriptor.
    fn bound_count(&self) -> usize;

    /// Group tree, for strategies that build one.
    fn group_tree(&self) -> Option<&ParameterGroup> {
        None
    }

    /// Find a host parameter by its stable id.
    fn find(&self, id: &str) -> Option<&Arc<HostParameter>> {
        self.parameters().iter().find(|p| p.id() == id)
    }

    /// Find the host parameter currently bound to a patch endpoint.
    fn find_by_endpoint(&self, endpoint_id: &str) -> Option<&Arc<HostParameter>> {
        self.parameters().iter().find(|p| {
            p.descriptor()
                .is_some_and(|d| d.endpoint_id() == endpoint_id)
        })
    }
}

// =============================================================================
// Fixed
// =============================================================================

/// One permanent host parameter per descriptor, arranged by group path.
///
/// Host parameter ids are the descriptors' endpoint ids. A reload that keeps
/// the same id sequence rebinds in place; anything else rebuilds the list and
/// the tree.
pub struct FixedParameterStrategy {
    listener: Arc<dyn HostListener>,
    parameters: Vec<Arc<HostParameter>>,
    tree: ParameterGroup,
}

impl FixedParameterStrategy {
    pub fn new(listener: Arc<dyn HostListener>) -> Self {
        Self {
            listener,
            parameters: Vec::new(),
            tree: ParameterGroup::root(),
        }
    }

    fn has_same_shape(&self, params: &[Arc<PatchParameter>]) -> bool {
        self.parameters.len() == params.len()
            && self
                .parameters
                .iter()
                .zip(params)
                .all(|(host, patch)| host.id() == patch.endpoint_id())
    }

    fn rebuild(&mut self, params: &[Arc<PatchParameter>]) {
        let mut builder = GroupTreeBuilder::new();
        self.parameters = params
            .iter()
            .enumerate()
            .map(|(index, patch)| {
                let host = HostParameter::new(index, patch.endpoint_id(), self.listener.clone());
                host.bind(patch);
                builder.add_parameter(patch.group(), host.clone());
                host
            })
            .collect();
        self.tree = builder.build();
    }
}

impl ParameterStrategy for FixedParameterStrategy {
    fn update(&mut self, params: &[Arc<PatchParameter>]) -> bool {
        if self.has_same_shape(params) {
            let mut changed = false;
            for (host, patch) in self.parameters.iter().zip(params) {
                changed |= host.bind(patch);
            }
            return changed;
        }

        log::debug!(
            "Rebuilding fixed parameter tree ({} -> {} parameters)",
            self.parameters.len(),
            params.len()
        );
        self.rebuild(params);
        true
    }

    fn parameters(&self) -> &[Arc<HostParameter>] {
        &self.parameters
    }

    fn bound_count(&self) -> usize {
        self.parameters.iter().filter(|p| p.is_bound()).count()
    }

    fn group_tree(&self) -> Option<&ParameterGroup> {
        Some(&self.tree)
    }
}

// =============================================================================
// Reusable pool
// =============================================================================

/// Flat pool of generic host parameters rebound by position.
///
/// The pool grows to the largest parameter count seen and never shrinks, so a
/// host that already enumerated `P0..Pn` keeps valid references forever.
pub struct ReusablePoolStrategy {
    listener: Arc<dyn HostListener>,
    slots: Vec<Arc<HostParameter>>,
    bound: usize,
}

impl ReusablePoolStrategy {
    /// Create a pool with `initial_size` unbound slots.
    pub fn new(initial_size: usize, listener: Arc<dyn HostListener>) -> Self {
        let mut pool = Self {
            listener,
            slots: Vec::with_capacity(initial_size),
            bound: 0,
        };
        pool.ensure_num_parameters(initial_size);
        pool
    }

    /// Stable id of pool slot `index`.
    pub fn slot_id(index: usize) -> String {
        format!("P{index}")
    }

    /// Grow the pool to at least `count` slots. Returns true if it grew.
    pub fn ensure_num_parameters(&mut self, count: usize) -> bool {
        let grew = count > self.slots.len();
        while self.slots.len() < count {
            let index = self.slots.len();
            self.slots.push(HostParameter::new(
                index,
                Self::slot_id(index),
                self.listener.clone(),
            ));
        }
        grew
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl ParameterStrategy for ReusablePoolStrategy {
    fn update(&mut self, params: &[Arc<PatchParameter>]) -> bool {
        let mut changed = self.ensure_num_parameters(params.len());

        for (slot, patch) in self.slots.iter().zip(params) {
            changed |= slot.bind(patch);
        }
        for slot in self.slots.iter().skip(params.len()) {
            changed |= slot.unbind();
        }

        self.bound = params.len();
        changed
    }

    fn parameters(&self) -> &[Arc<HostParameter>] {
        &self.slots
    }

    fn bound_count(&self) -> usize {
        self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingListener;

    fn gain() -> Arc<PatchParameter> {
        Arc::new(PatchParameter::new("gain", "Gain", 0.0, 1.0, 0.5))
    }

    fn freq() -> Arc<PatchParameter> {
        Arc::new(PatchParameter::new("freq", "Frequency", 20.0, 20000.0, 440.0).with_unit("Hz"))
    }

    #[test]
    fn test_pool_rebinds_slot_to_new_descriptor() {
        let listener = Arc::new(RecordingListener::default());
        let mut pool = ReusablePoolStrategy::new(4, listener.clone());

        let a = vec![gain()];
        assert!(pool.update(&a));
        let slot = pool.parameters()[0].clone();
        assert_eq!(slot.id(), "P0");
        assert_eq!(slot.name(32), "Gain");
        assert_eq!(slot.default_value(), 0.5);

        let b = vec![freq()];
        assert!(pool.update(&b));
        let slot_after = &pool.parameters()[0];
        assert!(Arc::ptr_eq(&slot, slot_after));
        assert_eq!(slot_after.id(), "P0");
        assert_eq!(slot_after.name(32), "Frequency");
        assert_eq!(slot_after.to_native(0.0), 20.0);
        assert_eq!(slot_after.to_native(1.0), 20000.0);
        let expected = (440.0 - 20.0) / (20000.0 - 20.0);
        assert!((slot_after.default_value() - expected).abs() < 1e-6);

        // Rebinding refreshed the host control with the new value.
        let last = listener.value_changes().last().cloned().unwrap();
        assert_eq!(last.1, "P0");
        assert!((last.2 - expected).abs() < 1e-6);
    }

    #[test]
    fn test_pool_grows_but_never_shrinks() {
        let listener = Arc::new(RecordingListener::default());
        let mut pool = ReusablePoolStrategy::new(2, listener);

        let params: Vec<_> = (0..5)
            .map(|i| Arc::new(PatchParameter::new(format!("p{i}"), format!("Param {i}"), 0.0, 1.0, 0.0)))
            .collect();
        assert!(pool.update(&params));
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.bound_count(), 5);
        assert_eq!(pool.parameters()[4].id(), "P4");

        assert!(pool.update(&params[..1]));
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.bound_count(), 1);
        assert!(!pool.parameters()[3].is_bound());
        assert_eq!(pool.parameters()[3].name(32), "unknown");

        // Same descriptors again: nothing to report.
        assert!(!pool.update(&params[..1]));
    }

    #[test]
    fn test_pool_empty_update_unbinds_everything() {
        let mut pool = ReusablePoolStrategy::new(3, Arc::new(RecordingListener::default()));
        let params = vec![gain(), freq()];
        pool.update(&params);
        assert!(pool.update(&[]));
        assert_eq!(pool.bound_count(), 0);
        assert!(pool.parameters().iter().all(|p| !p.is_bound()));
        assert!(pool.find_by_endpoint("gain").is_none());
    }

    #[test]
    fn test_fixed_builds_tree_and_rebinds_in_place() {
        let listener = Arc::new(RecordingListener::default());
        let mut fixed = FixedParameterStrategy::new(listener);

        let first = vec![
            Arc::new(PatchParameter::new("cutoff", "Cutoff", 0.0, 1.0, 0.5).with_group("Filter")),
            Arc::new(PatchParameter::new("attack", "Attack", 0.0, 1.0, 0.1).with_group("Filter/Env")),
            gain(),
        ];
        assert!(fixed.update(&first));
        assert_eq!(fixed.parameters().len(), 3);
        let tree = fixed.group_tree().unwrap();
        assert!(tree.find_group("Filter/Env").is_some());
        assert_eq!(fixed.find("attack").map(|p| p.index()), Some(1));

        let cutoff_host = fixed.parameters()[0].clone();
        let second = vec![
            Arc::new(PatchParameter::new("cutoff", "Cutoff", 0.0, 1.0, 0.9).with_group("Filter")),
            Arc::new(PatchParameter::new("attack", "Attack", 0.0, 1.0, 0.1).with_group("Filter/Env")),
            gain(),
        ];
        assert!(fixed.update(&second));
        assert!(Arc::ptr_eq(&cutoff_host, &fixed.parameters()[0]));
        assert!((cutoff_host.value() - 0.9).abs() < 1e-6);
        assert!(!fixed.update(&second));
    }

    #[test]
    fn test_fixed_unload_rebuilds_empty_tree() {
        let mut fixed = FixedParameterStrategy::new(Arc::new(RecordingListener::default()));
        fixed.update(&[gain()]);
        assert!(fixed.update(&[]));
        assert!(fixed.parameters().is_empty());
        assert!(fixed.group_tree().unwrap().is_empty());
        assert_eq!(fixed.bound_count(), 0);
    }
}
