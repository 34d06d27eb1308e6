//! Attribute-like parts.
//!
//! Every part follows the same two-phase contract: `set_value` stages a
//! value, `commit` decides whether the staged value reaches the host tree.
//!
//! Attribute and property slots that belong to the same attribute share one
//! [`AttributeCommitter`], so `class="a {x} b {y}"` is written once per
//! commit no matter how many of its fragments changed.

use std::cell::RefCell;
use std::rc::Rc;

use super::node_part::NodePart;
use super::RenderContext;
use crate::error::Result;
use crate::host::HostTree;
use crate::template::TemplateCache;
use crate::types::{Listener, ListenerOptions, NodeId, Value};
use crate::BindingError;

// =============================================================================
// Part
// =============================================================================

/// The diffing unit bound to one slot.
pub(crate) enum Part {
    Node(NodePart),
    Attribute(AttributePart),
    Boolean(BooleanAttributePart),
    Event(EventPart),
}

impl Part {
    /// Stage a value. Values the slot can never accept are rejected here,
    /// before any part of the update commits.
    pub(crate) fn set_value(&mut self, value: Value, templates: &TemplateCache) -> Result<()> {
        match self {
            Part::Node(part) => {
                NodePart::validate(&value, templates)?;
                part.set_value(value);
            }
            Part::Attribute(part) => part.set_value(value)?,
            Part::Boolean(part) => part.set_value(&value),
            Part::Event(part) => part.set_value(value)?,
        }
        Ok(())
    }

    pub(crate) fn commit(&mut self, cx: &mut RenderContext<'_>) -> Result<()> {
        match self {
            Part::Node(part) => part.commit(cx),
            Part::Attribute(part) => Ok(part.commit(cx.host)?),
            Part::Boolean(part) => {
                part.commit(cx.host);
                Ok(())
            }
            Part::Event(part) => Ok(part.commit(cx.host)?),
        }
    }

    pub(crate) fn as_node(&self) -> Option<&NodePart> {
        match self {
            Part::Node(part) => Some(part),
            _ => None,
        }
    }
}

// =============================================================================
// Attribute committer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitMode {
    Attribute,
    Property,
}

/// Writes one attribute (or property) from all of its dynamic fragments.
pub(crate) struct AttributeCommitter {
    element: NodeId,
    name: String,
    /// Static text around the fragments; `values.len() + 1` entries.
    strings: Rc<[String]>,
    values: Vec<Value>,
    mode: CommitMode,
    dirty: bool,
    /// Last attribute text written. `None` while the attribute is absent.
    last_text: Option<String>,
    /// Last value handed to `set_property`.
    last_value: Option<Value>,
}

impl AttributeCommitter {
    pub(crate) fn new(element: NodeId, name: &str, strings: Rc<[String]>, mode: CommitMode) -> Self {
        let fragments = strings.len().saturating_sub(1).max(1);
        Self {
            element,
            name: name.to_string(),
            strings,
            values: vec![Value::Nothing; fragments],
            mode,
            dirty: false,
            last_text: None,
            last_value: None,
        }
    }

    /// `name=${x}` with no static text: the value passes through untouched.
    fn is_single(&self) -> bool {
        self.values.len() == 1 && self.strings.iter().all(String::is_empty)
    }

    fn slot_name(&self) -> &'static str {
        match self.mode {
            CommitMode::Attribute => "attribute",
            CommitMode::Property => "property",
        }
    }

    fn set(&mut self, index: usize, value: Value) -> std::result::Result<(), BindingError> {
        let passes_through = self.mode == CommitMode::Property && self.is_single();
        if !passes_through {
            value.attribute_text(self.slot_name())?;
        }
        if let Some(current) = self.values.get_mut(index) {
            if !current.same_as(&value) {
                *current = value;
                self.dirty = true;
            }
        }
        Ok(())
    }

    fn interpolate(&self) -> std::result::Result<String, BindingError> {
        let mut out = String::new();
        for (i, value) in self.values.iter().enumerate() {
            if let Some(s) = self.strings.get(i) {
                out.push_str(s);
            }
            out.push_str(&value.attribute_text(self.slot_name())?);
        }
        if let Some(tail) = self.strings.get(self.values.len()) {
            out.push_str(tail);
        }
        Ok(out)
    }

    fn commit(&mut self, host: &mut dyn HostTree) -> std::result::Result<(), BindingError> {
        if !self.dirty {
            return Ok(());
        }
        match self.mode {
            CommitMode::Attribute => {
                if self.is_single() && self.values[0].is_nothing() {
                    if self.last_text.take().is_some() {
                        tracing::trace!(node = %self.element, attribute = %self.name, "remove attribute");
                        host.remove_attribute(self.element, &self.name);
                    }
                } else {
                    let text = self.interpolate()?;
                    if self.last_text.as_deref() != Some(text.as_str()) {
                        tracing::trace!(node = %self.element, attribute = %self.name, "set attribute");
                        host.set_attribute(self.element, &self.name, &text);
                        self.last_text = Some(text);
                    }
                }
            }
            CommitMode::Property => {
                let value = if self.is_single() {
                    self.values[0].clone()
                } else {
                    Value::from(self.interpolate()?)
                };
                let unchanged = self.last_value.as_ref().is_some_and(|last| last.same_as(&value));
                if !unchanged {
                    tracing::trace!(node = %self.element, property = %self.name, "set property");
                    host.set_property(self.element, &self.name, &value);
                    self.last_value = Some(value);
                }
            }
        }
        self.dirty = false;
        Ok(())
    }
}

/// One dynamic fragment of an attribute or property binding.
pub(crate) struct AttributePart {
    committer: Rc<RefCell<AttributeCommitter>>,
    index: usize,
}

impl AttributePart {
    pub(crate) fn new(committer: Rc<RefCell<AttributeCommitter>>, index: usize) -> Self {
        Self { committer, index }
    }

    fn set_value(&mut self, value: Value) -> std::result::Result<(), BindingError> {
        self.committer.borrow_mut().set(self.index, value)
    }

    fn commit(&mut self, host: &mut dyn HostTree) -> std::result::Result<(), BindingError> {
        self.committer.borrow_mut().commit(host)
    }
}

// =============================================================================
// Boolean attribute
// =============================================================================

/// `?name=${x}`: a valueless attribute present while `x` is truthy.
pub(crate) struct BooleanAttributePart {
    element: NodeId,
    name: String,
    pending: Option<bool>,
    last: Option<bool>,
}

impl BooleanAttributePart {
    pub(crate) fn new(element: NodeId, name: &str) -> Self {
        Self {
            element,
            name: name.to_string(),
            pending: None,
            last: None,
        }
    }

    fn set_value(&mut self, value: &Value) {
        self.pending = Some(value.is_truthy());
    }

    fn commit(&mut self, host: &mut dyn HostTree) {
        let Some(on) = self.pending.take() else { return };
        match (self.last, on) {
            (Some(true), true) | (Some(false), false) => return,
            (_, true) => host.set_attribute(self.element, &self.name, ""),
            (Some(true), false) => host.remove_attribute(self.element, &self.name),
            // Never written, nothing to remove.
            (None, false) => {}
        }
        self.last = Some(on);
    }
}

// =============================================================================
// Event
// =============================================================================

/// `@name=${listener}`.
///
/// The host sees one stable forwarding listener per registration; swapping
/// handlers only swaps the forwarder's target. The host registration changes
/// only when the options change or the binding is cleared.
pub(crate) struct EventPart {
    element: NodeId,
    event: String,
    pending: Option<Value>,
    current: Rc<RefCell<Option<Listener>>>,
    registered: Option<Listener>,
}

impl EventPart {
    pub(crate) fn new(element: NodeId, event: &str) -> Self {
        Self {
            element,
            event: event.to_string(),
            pending: None,
            current: Rc::new(RefCell::new(None)),
            registered: None,
        }
    }

    fn set_value(&mut self, value: Value) -> std::result::Result<(), BindingError> {
        match value {
            Value::Nothing | Value::Listener(_) => {
                self.pending = Some(value);
                Ok(())
            }
            other => Err(BindingError::UnsupportedValue {
                slot: "event",
                value: other.kind_name(),
            }),
        }
    }

    fn forwarder(&self, options: ListenerOptions) -> Listener {
        let current = self.current.clone();
        Listener::new(move |event| {
            // Clone out so the handler may rebind this part while running.
            let target = current.borrow().clone();
            if let Some(listener) = target {
                listener.call(event);
            }
        })
        .with_options(options)
    }

    fn commit(&mut self, host: &mut dyn HostTree) -> std::result::Result<(), BindingError> {
        let Some(value) = self.pending.take() else {
            return Ok(());
        };
        match value {
            Value::Listener(listener) => {
                let unchanged = self
                    .current
                    .borrow()
                    .as_ref()
                    .is_some_and(|current| current.same_as(&listener));
                if unchanged {
                    return Ok(());
                }
                let options = listener.options;
                *self.current.borrow_mut() = Some(listener);
                match &self.registered {
                    Some(registered) if registered.options == options => {}
                    _ => {
                        if let Some(old) = self.registered.take() {
                            host.remove_event_listener(self.element, &self.event, &old);
                        }
                        let forwarder = self.forwarder(options);
                        tracing::trace!(node = %self.element, event = %self.event, "add listener");
                        host.add_event_listener(self.element, &self.event, &forwarder);
                        self.registered = Some(forwarder);
                    }
                }
                Ok(())
            }
            Value::Nothing => {
                *self.current.borrow_mut() = None;
                if let Some(old) = self.registered.take() {
                    tracing::trace!(node = %self.element, event = %self.event, "remove listener");
                    host.remove_event_listener(self.element, &self.event, &old);
                }
                Ok(())
            }
            other => Err(BindingError::UnsupportedValue {
                slot: "event",
                value: other.kind_name(),
            }),
        }
    }
}
