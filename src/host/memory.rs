//! In-memory host tree.
//!
//! An arena of nodes addressed by [`NodeId`], with a [`MutationStats`]
//! counter set so tests can assert exactly how many writes a render caused.
//!
//! This is a test and inspection host. The arena only grows: removed nodes
//! are detached, not freed, so a `NodeId` stays valid for the life of the
//! host and a detached node can be inserted again. Long-running embedders
//! should implement [`HostTree`] over their own tree instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::HostTree;
use crate::template::StaticNode;
use crate::types::{Event, Listener, ListenerOptions, NodeId, Value};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

// =============================================================================
// Mutation counters
// =============================================================================

/// Counts of every host operation performed since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    pub templates_cloned: usize,
    pub texts_created: usize,
    pub text_writes: usize,
    /// Nodes placed by `insert_before` (fragment children count one each).
    pub inserts: usize,
    /// Nodes detached by `remove_range`.
    pub removals: usize,
    /// `move_range` calls.
    pub range_moves: usize,
    pub attribute_writes: usize,
    pub attribute_removals: usize,
    pub property_writes: usize,
    pub listener_adds: usize,
    pub listener_removes: usize,
}

impl MutationStats {
    /// Sum of all counters. Zero means the tree was not touched.
    pub fn total(&self) -> usize {
        self.templates_cloned
            + self.texts_created
            + self.text_writes
            + self.inserts
            + self.removals
            + self.range_moves
            + self.attribute_writes
            + self.attribute_removals
            + self.property_writes
            + self.listener_adds
            + self.listener_removes
    }
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug)]
enum NodeKind {
    Fragment,
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        properties: HashMap<String, Value>,
        listeners: Vec<(String, Listener)>,
    },
    Text(String),
    Comment(String),
    Marker,
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed [`HostTree`]. Never reclaims nodes.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<NodeData>,
    stats: MutationStats,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0)
    }

    fn data_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.0)
    }

    /// Create a detached element (used for containers and entity hosts).
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            properties: HashMap::new(),
            listeners: Vec::new(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Nodes ever allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stats(&self) -> MutationStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MutationStats::default();
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node).map(|d| d.children.clone()).unwrap_or_default()
    }

    /// Children that are not range markers.
    pub fn content_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|c| !self.is_marker(*c))
            .collect()
    }

    pub fn is_marker(&self, node: NodeId) -> bool {
        matches!(self.data(node).map(|d| &d.kind), Some(NodeKind::Marker))
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node).map(|d| &d.kind) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.data(node).map(|d| &d.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<&Value> {
        match self.data(node).map(|d| &d.kind) {
            Some(NodeKind::Element { properties, .. }) => properties.get(name),
            _ => None,
        }
    }

    pub fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener> {
        match self.data(node).map(|d| &d.kind) {
            Some(NodeKind::Element { listeners, .. }) => listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, l)| l.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Serialize the children of `node` (markers are invisible).
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(data) = self.data(node) {
            for child in &data.children {
                self.write_html(*child, &mut out);
            }
        }
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.data(node) else { return };
        match &data.kind {
            NodeKind::Fragment => {
                for child in &data.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Element {
                tag, attributes, ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{}\"", escape(value, true));
                    }
                }
                out.push('>');
                if VOID_TAGS.iter().any(|v| v.eq_ignore_ascii_case(tag)) {
                    return;
                }
                for child in &data.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
            NodeKind::Text(text) => out.push_str(&escape(text, false)),
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::Marker => {}
        }
    }

    // =========================================================================
    // Internal tree surgery
    // =========================================================================

    fn build(&mut self, node: &StaticNode) -> NodeId {
        match node {
            StaticNode::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element(tag);
                if let Some(NodeData {
                    kind: NodeKind::Element { attributes: attrs, .. },
                    ..
                }) = self.data_mut(id)
                {
                    attrs.extend(attributes.iter().cloned());
                }
                for child in children {
                    let child_id = self.build(child);
                    self.place(id, child_id, None);
                }
                id
            }
            StaticNode::Text(text) => self.alloc(NodeKind::Text(text.clone())),
            StaticNode::Comment(text) => self.alloc(NodeKind::Comment(text.clone())),
            StaticNode::Marker => self.alloc(NodeKind::Marker),
        }
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.data(node).and_then(|d| d.parent) else {
            return;
        };
        if let Some(data) = self.data_mut(parent) {
            data.children.retain(|c| *c != node);
        }
        if let Some(data) = self.data_mut(node) {
            data.parent = None;
        }
    }

    /// Insert without touching the counters. Fragments are expanded.
    fn place(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) -> usize {
        if matches!(self.data(node).map(|d| &d.kind), Some(NodeKind::Fragment)) {
            let children = self
                .data_mut(node)
                .map(|d| std::mem::take(&mut d.children))
                .unwrap_or_default();
            let count = children.len();
            for child in children {
                if let Some(data) = self.data_mut(child) {
                    data.parent = None;
                }
                self.place(parent, child, reference);
            }
            return count;
        }

        self.detach(node);
        let Some(data) = self.data_mut(parent) else { return 0 };
        let index = reference
            .and_then(|r| data.children.iter().position(|c| *c == r))
            .unwrap_or(data.children.len());
        data.children.insert(index, node);
        if let Some(data) = self.data_mut(node) {
            data.parent = Some(parent);
        }
        1
    }

    fn remove_listener_entry(&mut self, node: NodeId, event: &str, listener: &Listener) -> bool {
        if let Some(NodeData {
            kind: NodeKind::Element { listeners, .. },
            ..
        }) = self.data_mut(node)
        {
            if let Some(pos) = listeners
                .iter()
                .position(|(name, l)| name == event && l.same_as(listener))
            {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// HostTree
// =============================================================================

impl HostTree for MemoryHost {
    fn clone_static(&mut self, nodes: &[StaticNode]) -> NodeId {
        self.stats.templates_cloned += 1;
        let fragment = self.alloc(NodeKind::Fragment);
        for node in nodes {
            let id = self.build(node);
            self.place(fragment, id, None);
        }
        fragment
    }

    fn resolve(&self, root: NodeId, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(root, |node, index| {
            self.data(node).and_then(|d| d.children.get(*index).copied())
        })
    }

    fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.stats.texts_created += 1;
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn create_marker(&mut self) -> NodeId {
        self.alloc(NodeKind::Marker)
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(NodeData {
            kind: NodeKind::Text(current),
            ..
        }) = self.data_mut(node)
        {
            *current = text.to_string();
            self.stats.text_writes += 1;
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).and_then(|d| d.parent)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = &self.data(parent)?.children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        let placed = self.place(parent, node, reference);
        self.stats.inserts += placed;
    }

    fn remove_range(&mut self, first: NodeId, end: Option<NodeId>) {
        let Some(parent) = self.parent(first) else { return };
        let Some(data) = self.data_mut(parent) else { return };
        let Some(start) = data.children.iter().position(|c| *c == first) else {
            return;
        };
        let stop = end
            .and_then(|e| data.children.iter().position(|c| *c == e))
            .unwrap_or(data.children.len())
            .max(start);
        let removed: Vec<NodeId> = data.children.drain(start..stop).collect();
        self.stats.removals += removed.len();
        for node in removed {
            if let Some(data) = self.data_mut(node) {
                data.parent = None;
            }
        }
    }

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
            self.place(parent, node, reference);
        }
        self.stats.range_moves += 1;
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match self.data(node).map(|d| &d.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes.get(name).cloned(),
            _ => None,
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.data_mut(node)
        {
            attributes.insert(name.to_string(), value.to_string());
            self.stats.attribute_writes += 1;
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.data_mut(node)
        {
            attributes.shift_remove(name);
            self.stats.attribute_removals += 1;
        }
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &Value) {
        if let Some(NodeData {
            kind: NodeKind::Element { properties, .. },
            ..
        }) = self.data_mut(node)
        {
            properties.insert(name.to_string(), value.clone());
            self.stats.property_writes += 1;
        }
    }

    fn add_event_listener(&mut self, node: NodeId, event: &str, listener: &Listener) {
        if let Some(NodeData {
            kind: NodeKind::Element { listeners, .. },
            ..
        }) = self.data_mut(node)
        {
            listeners.push((event.to_string(), listener.clone()));
            self.stats.listener_adds += 1;
        }
    }

    fn remove_event_listener(&mut self, node: NodeId, event: &str, listener: &Listener) {
        if self.remove_listener_entry(node, event, listener) {
            self.stats.listener_removes += 1;
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Deliver `event` to every matching listener on its target.
///
/// The host borrow is released before handlers run, so handlers may write
/// reactive properties or render. `ONCE` listeners are removed before they
/// are called. Returns the number of listeners invoked.
pub fn dispatch_event(host: &RefCell<MemoryHost>, event: &Event) -> usize {
    let listeners = host.borrow().listeners(event.target, &event.name);
    for listener in &listeners {
        if listener.options.contains(ListenerOptions::ONCE) {
            host.borrow_mut()
                .remove_listener_entry(event.target, &event.name, listener);
        }
        listener.call(event);
    }
    listeners.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_clone_static_and_resolve() {
        let mut host = MemoryHost::new();
        let nodes = vec![StaticNode::Element {
            tag: "p".into(),
            attributes: vec![("id".into(), "x".into())],
            children: vec![StaticNode::Text("hi".into()), StaticNode::Marker],
        }];
        let fragment = host.clone_static(&nodes);

        let p = host.resolve(fragment, &[0]).unwrap();
        assert_eq!(host.tag(p), Some("p"));
        let text = host.resolve(fragment, &[0, 0]).unwrap();
        assert_eq!(host.text(text), Some("hi"));
        assert!(host.resolve(fragment, &[0, 5]).is_none());
        assert_eq!(host.outer_html(fragment), "<p id=\"x\">hi</p>");
    }

    #[test]
    fn test_fragment_insert_moves_children() {
        let mut host = MemoryHost::new();
        let root = host.create_element("div");
        let fragment = host.clone_static(&[StaticNode::Text("a".into()), StaticNode::Text("b".into())]);

        host.insert_before(root, fragment, None);

        assert_eq!(host.to_html(root), "ab");
        assert!(host.children(fragment).is_empty());
        assert_eq!(host.stats().inserts, 2);
    }

    #[test]
    fn test_remove_range_is_end_exclusive() {
        let mut host = MemoryHost::new();
        let root = host.create_element("div");
        let nodes: Vec<NodeId> = ["a", "b", "c", "d"]
            .iter()
            .map(|t| {
                let n = host.create_text(t);
                host.append_child(root, n);
                n
            })
            .collect();
        host.reset_stats();

        host.remove_range(nodes[1], Some(nodes[3]));

        assert_eq!(host.to_html(root), "ad");
        assert_eq!(host.stats().removals, 2);
        assert_eq!(host.parent(nodes[1]), None);
    }

    #[test]
    fn test_removed_nodes_stay_addressable() {
        let mut host = MemoryHost::new();
        let root = host.create_element("div");
        let text = host.create_text("kept");
        host.append_child(root, text);
        let allocated = host.node_count();

        host.remove_range(text, None);
        assert_eq!(host.node_count(), allocated, "arena never shrinks");
        assert_eq!(host.text(text), Some("kept"));

        host.insert_before(root, text, None);
        assert_eq!(host.to_html(root), "kept", "detached nodes can come back");
    }

    #[test]
    fn test_move_range_counts_once() {
        let mut host = MemoryHost::new();
        let root = host.create_element("div");
        let nodes: Vec<NodeId> = ["a", "b", "c"]
            .iter()
            .map(|t| {
                let n = host.create_text(t);
                host.append_child(root, n);
                n
            })
            .collect();
        host.reset_stats();

        host.move_range(nodes[1], nodes[2], root, Some(nodes[0]));

        assert_eq!(host.to_html(root), "bca");
        assert_eq!(host.stats().range_moves, 1);
        assert_eq!(host.stats().inserts, 0);
    }

    #[test]
    fn test_toggle_class() {
        let mut host = MemoryHost::new();
        let el = host.create_element("div");
        host.toggle_class(el, "active", true);
        host.toggle_class(el, "big", true);
        assert_eq!(host.get_attribute(el, "class").as_deref(), Some("active big"));
        host.toggle_class(el, "active", false);
        assert_eq!(host.get_attribute(el, "class").as_deref(), Some("big"));
        host.toggle_class(el, "big", false);
        assert_eq!(host.get_attribute(el, "class"), None);
    }

    #[test]
    fn test_dispatch_once_listener() {
        let host = RefCell::new(MemoryHost::new());
        let el = host.borrow_mut().create_element("button");
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let listener = Listener::new(move |_| hits_clone.set(hits_clone.get() + 1))
            .with_options(ListenerOptions::ONCE);
        host.borrow_mut().add_event_listener(el, "click", &listener);

        let event = Event::new("click", el);
        assert_eq!(dispatch_event(&host, &event), 1);
        assert_eq!(dispatch_event(&host, &event), 0);
        assert_eq!(hits.get(), 1);
    }
}
