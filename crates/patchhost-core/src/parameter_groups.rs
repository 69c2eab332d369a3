//! Hierarchical parameter groups.
//!
//! Fixed patches present their parameters as a tree built from each
//! descriptor's slash-separated group path. Intermediate groups are created on
//! demand and cached by their full path, so `"Filter/Env"` and `"Filter"`
//! share the same `Filter` node while `"Amp/Env"` gets its own `Env`.
//!
//! ```text
//! Root
//! ├── Filter            id "Filter"
//! │   ├── cutoff
//! │   └── Env           id "Filter/Env"
//! │       └── attack
//! └── gain
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::host_parameter::HostParameter;

/// Group ID used when flattening the tree for hosts with numeric groups.
pub type GroupId = i32;

/// Root group ID. Always present, holds ungrouped parameters.
pub const ROOT_GROUP_ID: GroupId = 0;

/// A node in the parameter tree.
#[derive(Debug, Clone)]
pub enum ParameterNode {
    Group(ParameterGroup),
    Parameter(Arc<HostParameter>),
}

/// A named group of parameters and sub-groups.
#[derive(Debug, Clone, Default)]
pub struct ParameterGroup {
    /// Full path from the root (empty for the root itself).
    pub id: String,
    /// Last path segment.
    pub name: String,
    pub children: Vec<ParameterNode>,
}

/// Flattened group description (id, name, parent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
    pub parent_id: GroupId,
}

impl ParameterGroup {
    /// An empty root group.
    pub fn root() -> Self {
        Self::default()
    }

    fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            children: Vec::new(),
        }
    }

    /// Direct sub-groups.
    pub fn groups(&self) -> impl Iterator<Item = &ParameterGroup> {
        self.children.iter().filter_map(|node| match node {
            ParameterNode::Group(group) => Some(group),
            ParameterNode::Parameter(_) => None,
        })
    }

    /// Find a group by its full path.
    pub fn find_group(&self, path: &str) -> Option<&ParameterGroup> {
        if self.id == path {
            return Some(self);
        }
        self.groups().find_map(|g| g.find_group(path))
    }

    /// All parameters in depth-first order.
    pub fn parameters(&self) -> Vec<Arc<HostParameter>> {
        let mut out = Vec::new();
        self.collect_parameters(&mut out);
        out
    }

    fn collect_parameters(&self, out: &mut Vec<Arc<HostParameter>>) {
        for node in &self.children {
            match node {
                ParameterNode::Group(group) => group.collect_parameters(out),
                ParameterNode::Parameter(param) => out.push(param.clone()),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Flatten sub-groups into numbered [`GroupInfo`]s, depth-first.
    ///
    /// IDs start at 1; the root is [`ROOT_GROUP_ID`] and is not listed.
    pub fn group_infos(&self) -> Vec<GroupInfo> {
        let mut out = Vec::new();
        self.collect_group_infos(ROOT_GROUP_ID, &mut out);
        out
    }

    fn collect_group_infos(&self, parent_id: GroupId, out: &mut Vec<GroupInfo>) {
        for group in self.groups() {
            let id = out.len() as GroupId + 1;
            out.push(GroupInfo {
                id,
                name: group.name.clone(),
                parent_id,
            });
            group.collect_group_infos(id, out);
        }
    }
}

/// Builds a [`ParameterGroup`] tree, caching groups by full path.
#[derive(Debug, Default)]
pub struct GroupTreeBuilder {
    root: ParameterGroup,
    // Full path -> child indices from the root.
    cache: HashMap<String, Vec<usize>>,
}

impl GroupTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // Cached indices only ever point at groups.
    fn group_mut(&mut self, indices: &[usize]) -> Option<&mut ParameterGroup> {
        let mut group = &mut self.root;
        for &index in indices {
            group = match group.children.get_mut(index)? {
                ParameterNode::Group(child) => child,
                ParameterNode::Parameter(_) => return None,
            };
        }
        Some(group)
    }

    /// Resolve `path` to a group, creating missing groups along the way.
    ///
    /// Returns the child-index path from the root. Empty segments are
    /// ignored, so `"/a//b/"` is the same group as `"a/b"`.
    pub fn get_or_create_group(&mut self, path: &str) -> Vec<usize> {
        let mut indices = Vec::new();
        let mut full_path = String::new();

        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            if !full_path.is_empty() {
                full_path.push('/');
            }
            full_path.push_str(segment);

            if let Some(cached) = self.cache.get(&full_path) {
                indices = cached.clone();
                continue;
            }

            let Some(parent) = self.group_mut(&indices) else {
                break;
            };
            parent.children.push(ParameterNode::Group(ParameterGroup::new(
                full_path.clone(),
                segment.to_string(),
            )));
            indices.push(parent.children.len() - 1);
            self.cache.insert(full_path.clone(), indices.clone());
        }

        indices
    }

    /// Add a parameter under `group_path` (root if empty).
    pub fn add_parameter(&mut self, group_path: &str, param: Arc<HostParameter>) {
        let mut indices = self.get_or_create_group(group_path);
        if self.group_mut(&indices).is_none() {
            indices.clear();
        }
        if let Some(group) = self.group_mut(&indices) {
            group.children.push(ParameterNode::Parameter(param));
        }
    }

    /// Number of distinct groups created.
    pub fn group_count(&self) -> usize {
        self.cache.len()
    }

    pub fn build(self) -> ParameterGroup {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::NullHostListener;

    fn param(id: &str) -> Arc<HostParameter> {
        HostParameter::new(0, id, Arc::new(NullHostListener))
    }

    #[test]
    fn test_repeated_prefixes_share_groups() {
        let mut builder = GroupTreeBuilder::new();
        builder.add_parameter("Filter", param("cutoff"));
        builder.add_parameter("Filter/Env", param("attack"));
        builder.add_parameter("Filter/Env", param("release"));
        builder.add_parameter("Amp/Env", param("amp_attack"));
        builder.add_parameter("", param("gain"));
        assert_eq!(builder.group_count(), 4);

        let tree = builder.build();
        assert_eq!(tree.groups().count(), 2);

        let filter = tree.find_group("Filter").unwrap();
        assert_eq!(filter.name, "Filter");
        assert_eq!(filter.children.len(), 2);

        let env = tree.find_group("Filter/Env").unwrap();
        assert_eq!(env.name, "Env");
        assert_eq!(env.children.len(), 2);
        assert!(tree.find_group("Amp/Env").is_some());

        let ids: Vec<String> = tree.parameters().iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, ["cutoff", "attack", "release", "amp_attack", "gain"]);
    }

    #[test]
    fn test_empty_segments_ignored() {
        let mut builder = GroupTreeBuilder::new();
        let a = builder.get_or_create_group("/a//b/");
        let b = builder.get_or_create_group("a/b");
        assert_eq!(a, b);
        assert_eq!(builder.group_count(), 2);
    }

    #[test]
    fn test_group_infos() {
        let mut builder = GroupTreeBuilder::new();
        builder.add_parameter("A/B", param("x"));
        builder.add_parameter("C", param("y"));
        let infos = builder.build().group_infos();
        assert_eq!(
            infos,
            vec![
                GroupInfo { id: 1, name: "A".into(), parent_id: ROOT_GROUP_ID },
                GroupInfo { id: 2, name: "B".into(), parent_id: 1 },
                GroupInfo { id: 3, name: "C".into(), parent_id: ROOT_GROUP_ID },
            ]
        );
    }
}
