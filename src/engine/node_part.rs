//! Node part state machine.
//!
//! A [`NodePart`] owns the range between two marker nodes and holds exactly
//! one kind of content at a time:
//!
//! ```text
//! Empty ─┬─ Primitive  (one text node, mutated in place)
//!        ├─ Instance   (nested template, reused while the descriptor matches)
//!        ├─ Node       (a caller-supplied live node)
//!        └─ Sequence   (child parts, reconciled by key)
//! ```
//!
//! Leaving a state clears the range first. The `Cached` policy replaces that
//! clear with a detach: the outgoing instance is parked in a per-part LRU
//! keyed by descriptor so toggling back reuses it.

use std::collections::HashSet;

use lru::LruCache;

use super::instance::TemplateInstance;
use super::reconcile::{self, ReconcileOutcome, SequenceState};
use super::RenderContext;
use crate::config::Config;
use crate::error::Result;
use crate::host::HostTree;
use crate::template::{DescriptorId, TemplateCache};
use crate::types::{Key, NodeId, Primitive, TemplateResult, Value};
use crate::BindingError;

enum NodeState {
    Empty,
    Primitive { value: Primitive, text: NodeId },
    Instance(TemplateInstance),
    Node(NodeId),
    Sequence(SequenceState),
}

/// An instance parked outside the tree, with its nodes held in a fragment.
struct Detached {
    instance: TemplateInstance,
    fragment: NodeId,
}

/// Which state a node part is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStateKind {
    Empty,
    Primitive,
    Instance,
    Node,
    Sequence,
}

/// Child-content binding bounded by a start and an end marker.
pub struct NodePart {
    start: NodeId,
    end: NodeId,
    pending: Option<Value>,
    state: NodeState,
    alternates: Option<LruCache<DescriptorId, Detached>>,
}

impl NodePart {
    pub(crate) fn new(start: NodeId, end: NodeId) -> Self {
        Self {
            start,
            end,
            pending: None,
            state: NodeState::Empty,
            alternates: None,
        }
    }

    /// Create both markers and insert them before `reference` in `parent`.
    pub(crate) fn insert_new(host: &mut dyn HostTree, parent: NodeId, reference: Option<NodeId>) -> Self {
        let start = host.create_marker();
        let end = host.create_marker();
        host.insert_before(parent, start, reference);
        host.insert_before(parent, end, reference);
        Self::new(start, end)
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn state_kind(&self) -> NodeStateKind {
        match self.state {
            NodeState::Empty => NodeStateKind::Empty,
            NodeState::Primitive { .. } => NodeStateKind::Primitive,
            NodeState::Instance(_) => NodeStateKind::Instance,
            NodeState::Node(_) => NodeStateKind::Node,
            NodeState::Sequence(_) => NodeStateKind::Sequence,
        }
    }

    pub fn instance(&self) -> Option<&TemplateInstance> {
        match &self.state {
            NodeState::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// The text node holding a committed primitive.
    pub fn text_node(&self) -> Option<NodeId> {
        match self.state {
            NodeState::Primitive { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Child parts of a committed sequence, in order.
    pub fn children(&self) -> &[NodePart] {
        match &self.state {
            NodeState::Sequence(sequence) => sequence.parts(),
            _ => &[],
        }
    }

    /// Counters from the most recent reconciliation.
    pub fn last_reconcile(&self) -> Option<ReconcileOutcome> {
        match &self.state {
            NodeState::Sequence(sequence) => Some(sequence.outcome()),
            _ => None,
        }
    }

    /// Number of parked alternate instances.
    pub fn cached_alternates(&self) -> usize {
        self.alternates.as_ref().map_or(0, LruCache::len)
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.pending = Some(value);
    }

    /// Reject a value whose commit is bound to fail, before anything commits.
    ///
    /// Nested template results are compiled and their value counts checked,
    /// down through cached values, sequences and their items' own values.
    pub(crate) fn validate(value: &Value, templates: &TemplateCache) -> Result<()> {
        match value {
            Value::Template(result) => {
                let descriptor = templates.compile(result.strings())?;
                descriptor.check_value_count(result.values().len())?;
                result
                    .values()
                    .iter()
                    .try_for_each(|nested| Self::validate(nested, templates))
            }
            Value::Cached(inner) => Self::validate(inner, templates),
            Value::List(items) => items.iter().try_for_each(|item| Self::validate(item, templates)),
            Value::Keyed(items) => {
                check_unique_keys(items)?;
                items.iter().try_for_each(|(_, item)| Self::validate(item, templates))
            }
            Value::Nothing | Value::Primitive(_) | Value::Node(_) | Value::Listener(_) => Ok(()),
        }
    }

    pub(crate) fn commit(&mut self, cx: &mut RenderContext<'_>) -> Result<()> {
        match self.pending.take() {
            Some(value) => self.commit_value(value, cx, false),
            None => Ok(()),
        }
    }

    fn commit_value(&mut self, value: Value, cx: &mut RenderContext<'_>, cached: bool) -> Result<()> {
        match value {
            Value::Nothing => self.clear(cx.host),
            Value::Primitive(value) => self.commit_primitive(value, cx.host),
            Value::Template(result) => self.commit_template(result, cx, cached),
            Value::Cached(inner) => self.commit_value(*inner, cx, true),
            Value::Node(node) => self.commit_node(node, cx.host),
            Value::List(items) => self.commit_sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (Key::Index(i), v))
                    .collect(),
                cx,
            ),
            Value::Keyed(items) => self.commit_sequence(items, cx),
            Value::Listener(_) => Err(BindingError::UnsupportedValue {
                slot: "node",
                value: "listener",
            }
            .into()),
        }
    }

    // =========================================================================
    // Range helpers
    // =========================================================================

    fn parent(&self, host: &dyn HostTree) -> std::result::Result<NodeId, BindingError> {
        host.parent(self.end).ok_or(BindingError::DetachedRange)
    }

    /// Insert `node` (or a fragment's children) just before the end marker.
    fn insert(&self, host: &mut dyn HostTree, node: NodeId) -> std::result::Result<(), BindingError> {
        let parent = self.parent(host)?;
        host.insert_before(parent, node, Some(self.end));
        Ok(())
    }

    /// Nodes strictly between the markers.
    fn content(&self, host: &dyn HostTree) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut cursor = host.next_sibling(self.start);
        while let Some(node) = cursor {
            if node == self.end {
                break;
            }
            nodes.push(node);
            cursor = host.next_sibling(node);
        }
        nodes
    }

    /// Remove everything between the markers and forget the current state.
    fn clear(&mut self, host: &mut dyn HostTree) -> Result<()> {
        if let Some(first) = host.next_sibling(self.start) {
            if first != self.end {
                host.remove_range(first, Some(self.end));
            }
        }
        self.state = NodeState::Empty;
        Ok(())
    }

    /// Detach this part's markers and content from the tree.
    pub(crate) fn remove(&mut self, host: &mut dyn HostTree) {
        let after = host.next_sibling(self.end);
        host.remove_range(self.start, after);
        self.state = NodeState::Empty;
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn commit_primitive(&mut self, value: Primitive, host: &mut dyn HostTree) -> Result<()> {
        if let NodeState::Primitive { value: current, text } = &mut self.state {
            if *current != value {
                tracing::trace!(node = %text, "update text");
                host.set_text(*text, &value.to_string());
                *current = value;
            }
            return Ok(());
        }

        self.clear(host)?;
        let text = host.create_text(&value.to_string());
        self.insert(host, text)?;
        self.state = NodeState::Primitive { value, text };
        Ok(())
    }

    fn commit_node(&mut self, node: NodeId, host: &mut dyn HostTree) -> Result<()> {
        if matches!(self.state, NodeState::Node(current) if current == node) {
            return Ok(());
        }
        self.clear(host)?;
        self.insert(host, node)?;
        self.state = NodeState::Node(node);
        Ok(())
    }

    fn commit_template(
        &mut self,
        result: TemplateResult,
        cx: &mut RenderContext<'_>,
        cached: bool,
    ) -> Result<()> {
        let (strings, values) = result.into_parts();
        let descriptor = cx.templates.compile(&strings)?;
        descriptor.check_value_count(values.len())?;

        if let NodeState::Instance(instance) = &mut self.state {
            if instance.descriptor().id() == descriptor.id() {
                return instance.update(values, cx);
            }
        }

        if cached {
            self.park_current(cx.host, cx.config)?;
            let parked = self
                .alternates
                .as_mut()
                .and_then(|alternates| alternates.pop(&descriptor.id()));
            if let Some(Detached { mut instance, fragment }) = parked {
                tracing::trace!(descriptor = %descriptor.id(), "reuse cached instance");
                instance.update(values, cx)?;
                self.insert(cx.host, fragment)?;
                self.state = NodeState::Instance(instance);
                return Ok(());
            }
        } else {
            self.clear(cx.host)?;
        }

        let (mut instance, fragment) = TemplateInstance::materialize(descriptor, cx.host)?;
        instance.update(values, cx)?;
        self.insert(cx.host, fragment)?;
        self.state = NodeState::Instance(instance);
        Ok(())
    }

    /// Move the current instance out of the tree into the alternate cache.
    /// Any other state is cleared as usual.
    fn park_current(&mut self, host: &mut dyn HostTree, config: &Config) -> Result<()> {
        let instance = match std::mem::replace(&mut self.state, NodeState::Empty) {
            NodeState::Instance(instance) => instance,
            other => {
                self.state = other;
                return self.clear(host);
            }
        };

        let fragment = host.create_fragment();
        let nodes = self.content(host);
        if let (Some(first), Some(last)) = (nodes.first(), nodes.last()) {
            host.move_range(*first, *last, fragment, None);
        }

        let id = instance.descriptor().id();
        let alternates = self.alternates.get_or_insert_with(|| match config.alternate_cache_limit {
            Some(limit) => LruCache::new(limit),
            None => LruCache::unbounded(),
        });
        if let Some((evicted, _)) = alternates.push(id, Detached { instance, fragment }) {
            if evicted != id {
                tracing::debug!(descriptor = %evicted, "evicted cached instance");
            }
        }
        Ok(())
    }

    fn commit_sequence(&mut self, items: Vec<(Key, Value)>, cx: &mut RenderContext<'_>) -> Result<()> {
        check_unique_keys(&items)?;

        let mut sequence = match std::mem::replace(&mut self.state, NodeState::Empty) {
            NodeState::Sequence(sequence) => sequence,
            other => {
                self.state = other;
                self.clear(cx.host)?;
                SequenceState::default()
            }
        };

        let parent = self.parent(cx.host)?;
        match reconcile::reconcile(&mut sequence, items, parent, self.end, cx) {
            Ok(()) => {
                self.state = NodeState::Sequence(sequence);
                Ok(())
            }
            Err(err) => {
                // The working set no longer matches the tree.
                drop(sequence);
                self.clear(cx.host)?;
                Err(err)
            }
        }
    }
}

fn check_unique_keys(items: &[(Key, Value)]) -> std::result::Result<(), BindingError> {
    let mut seen = HashSet::with_capacity(items.len());
    match items.iter().find(|(key, _)| !seen.insert(key)) {
        Some((key, _)) => Err(BindingError::DuplicateKey {
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;
    use crate::host::MemoryHost;
    use crate::types::cache;

    struct Fixture {
        host: MemoryHost,
        templates: TemplateCache,
        config: Config,
        root: NodeId,
        part: NodePart,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(Config::default())
        }

        fn with_config(config: Config) -> Self {
            let mut host = MemoryHost::new();
            let root = host.create_element("div");
            let part = NodePart::insert_new(&mut host, root, None);
            host.reset_stats();
            Self {
                host,
                templates: TemplateCache::new(),
                config,
                root,
                part,
            }
        }

        fn commit(&mut self, value: impl Into<Value>) -> Result<()> {
            let mut cx = RenderContext {
                host: &mut self.host,
                templates: &self.templates,
                config: &self.config,
            };
            self.part.set_value(value.into());
            self.part.commit(&mut cx)
        }

        fn html(&self) -> String {
            self.host.to_html(self.root)
        }
    }

    fn greeting(name: &str) -> TemplateResult {
        html!("<b>", name, "</b>")
    }

    fn farewell(name: &str) -> TemplateResult {
        html!("<i>", name, "</i>")
    }

    #[test]
    fn test_primitive_written_once() {
        let mut f = Fixture::new();
        f.commit("hello").unwrap();
        f.commit("hello").unwrap();
        assert_eq!(f.host.stats().texts_created, 1);
        assert_eq!(f.host.stats().text_writes, 0, "same primitive is a no-op");

        f.commit("world").unwrap();
        assert_eq!(f.host.stats().texts_created, 1, "text mutated in place");
        assert_eq!(f.host.stats().text_writes, 1);
        assert_eq!(f.html(), "world");
    }

    #[test]
    fn test_same_descriptor_reuses_instance() {
        let mut f = Fixture::new();
        f.commit(greeting("a")).unwrap();
        f.commit(greeting("b")).unwrap();
        assert_eq!(f.host.stats().templates_cloned, 1);
        assert_eq!(f.html(), "<b>b</b>");
        assert_eq!(f.part.state_kind(), NodeStateKind::Instance);
    }

    #[test]
    fn test_switching_state_clears_range() {
        let mut f = Fixture::new();
        f.commit(greeting("a")).unwrap();
        f.commit(farewell("b")).unwrap();
        assert_eq!(f.html(), "<i>b</i>");

        f.commit(vec![Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(f.html(), "12");
        assert_eq!(f.part.state_kind(), NodeStateKind::Sequence);

        f.commit(Value::Nothing).unwrap();
        assert_eq!(f.html(), "");
        assert_eq!(f.part.state_kind(), NodeStateKind::Empty);
        assert_eq!(f.host.children(f.root).len(), 2, "only the markers remain");
    }

    #[test]
    fn test_live_node_identity() {
        let mut f = Fixture::new();
        let span = f.host.create_element("span");
        f.commit(span).unwrap();
        let inserts = f.host.stats().inserts;
        f.commit(span).unwrap();
        assert_eq!(f.host.stats().inserts, inserts, "same node is a no-op");
        assert_eq!(f.html(), "<span></span>");
    }

    #[test]
    fn test_listener_in_node_slot_is_rejected() {
        let mut f = Fixture::new();
        let err = f.commit(crate::Listener::new(|_| {})).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Binding(BindingError::UnsupportedValue { slot: "node", .. })
        ));
    }

    #[test]
    fn test_cached_alternates_are_reused() {
        let mut f = Fixture::new();
        f.commit(cache(greeting("a"))).unwrap();
        f.commit(cache(farewell("b"))).unwrap();
        f.commit(cache(greeting("c"))).unwrap();
        f.commit(cache(farewell("d"))).unwrap();

        assert_eq!(f.host.stats().templates_cloned, 2, "each template cloned once");
        assert_eq!(f.html(), "<i>d</i>");
        assert_eq!(f.part.cached_alternates(), 1);
    }

    #[test]
    fn test_alternate_cache_respects_limit() {
        let limit = std::num::NonZeroUsize::new(1).unwrap();
        let mut f = Fixture::with_config(Config::default().with_alternate_cache_limit(limit));
        fn third(x: &str) -> TemplateResult {
            html!("<u>", x, "</u>")
        }

        f.commit(cache(greeting("a"))).unwrap();
        f.commit(cache(farewell("b"))).unwrap();
        f.commit(cache(third("c"))).unwrap();
        assert_eq!(f.part.cached_alternates(), 1);

        f.commit(cache(greeting("d"))).unwrap();
        assert_eq!(f.host.stats().templates_cloned, 4, "evicted instance is rebuilt");
        assert_eq!(f.html(), "<b>d</b>");
    }

    #[test]
    fn test_duplicate_keys_rejected_before_mutation() {
        let mut f = Fixture::new();
        f.commit(Value::Keyed(vec![(Key::from(1), Value::from("a"))])).unwrap();
        f.host.reset_stats();

        let err = f
            .commit(Value::Keyed(vec![
                (Key::from(1), Value::from("a")),
                (Key::from(1), Value::from("b")),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Binding(BindingError::DuplicateKey { .. })
        ));
        assert_eq!(f.host.stats().total(), 0);
        assert_eq!(f.html(), "a");
    }
}
