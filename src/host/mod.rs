//! Host tree interface.
//!
//! The engine never owns UI nodes. It drives a [`HostTree`] through a small
//! set of primitive operations and refers to nodes by [`NodeId`].
//!
//! [`MemoryHost`] is a complete in-memory implementation with mutation
//! counters for tests and one-shot string rendering. It never frees nodes.

mod memory;

pub use memory::{dispatch_event, MemoryHost, MutationStats};

use crate::template::StaticNode;
use crate::types::{Listener, NodeId, Value};

/// Primitive operations the engine needs from a UI node tree.
///
/// Fragments behave like DOM document fragments: inserting one moves its
/// children and leaves it empty.
pub trait HostTree {
    /// Clone a template's static structure into a new detached fragment.
    fn clone_static(&mut self, nodes: &[StaticNode]) -> NodeId;

    /// Locate a node by child-index path from `root`.
    fn resolve(&self, root: NodeId, path: &[usize]) -> Option<NodeId>;

    fn create_fragment(&mut self) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    /// Empty placeholder node used to bound ranges.
    fn create_marker(&mut self) -> NodeId;
    fn set_text(&mut self, node: NodeId, text: &str);

    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Insert `node` into `parent` before `reference` (append when `None`).
    /// An attached node is moved.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Remove siblings from `first` up to, not including, `end`
    /// (to the last sibling when `end` is `None`).
    fn remove_range(&mut self, first: NodeId, end: Option<NodeId>);

    /// Move the sibling run `first..=last` before `reference` in `parent`.
    fn move_range(&mut self, first: NodeId, last: NodeId, parent: NodeId, reference: Option<NodeId>) {
        let mut run = vec![first];
        let mut cursor = first;
        while cursor != last {
            match self.next_sibling(cursor) {
                Some(next) => {
                    run.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        for node in run {
            self.insert_before(parent, node, reference);
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Add or remove one class token in the `class` attribute.
    fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        let current = self.get_attribute(node, "class").unwrap_or_default();
        let mut tokens: Vec<&str> = current.split_whitespace().collect();
        let present = tokens.contains(&class);
        if on == present {
            return;
        }
        if on {
            tokens.push(class);
        } else {
            tokens.retain(|t| *t != class);
        }
        if tokens.is_empty() {
            self.remove_attribute(node, "class");
        } else {
            let joined = tokens.join(" ");
            self.set_attribute(node, "class", &joined);
        }
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &Value);

    fn add_event_listener(&mut self, node: NodeId, event: &str, listener: &Listener);
    fn remove_event_listener(&mut self, node: NodeId, event: &str, listener: &Listener);
}
