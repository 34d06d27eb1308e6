//! Dependency Graph.
//!
//! `(source entity, property) → dependents`. Cycles are not detected; they
//! cost extra renders one checkpoint apart, never a loop within one.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::entity::EntityId;

#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    edges: HashMap<(EntityId, String), IndexSet<EntityId>>,
}

impl DependencyGraph {
    pub(crate) fn declare(&mut self, dependent: EntityId, source: EntityId, properties: &[&str]) {
        for property in properties {
            self.edges
                .entry((source, (*property).to_string()))
                .or_default()
                .insert(dependent);
        }
    }

    pub(crate) fn dependents(&self, source: EntityId, property: &str) -> Vec<EntityId> {
        self.edges
            .get(&(source, property.to_string()))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every edge into or out of `id`.
    pub(crate) fn forget(&mut self, id: EntityId) {
        self.edges.retain(|(source, _), dependents| {
            dependents.shift_remove(&id);
            *source != id && !dependents.is_empty()
        });
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut graph = DependencyGraph::default();
        graph.declare(EntityId(2), EntityId(1), &["a", "b"]);
        graph.declare(EntityId(3), EntityId(1), &["a"]);
        graph.declare(EntityId(2), EntityId(1), &["a"]);

        assert_eq!(graph.dependents(EntityId(1), "a"), vec![EntityId(2), EntityId(3)]);
        assert_eq!(graph.dependents(EntityId(1), "b"), vec![EntityId(2)]);
        assert!(graph.dependents(EntityId(1), "c").is_empty());
        assert_eq!(graph.edge_count(), 3, "redeclaring is idempotent");
    }

    #[test]
    fn test_forget_removes_both_directions() {
        let mut graph = DependencyGraph::default();
        graph.declare(EntityId(2), EntityId(1), &["a"]);
        graph.declare(EntityId(1), EntityId(3), &["x"]);

        graph.forget(EntityId(1));
        assert_eq!(graph.edge_count(), 0);
    }
}
