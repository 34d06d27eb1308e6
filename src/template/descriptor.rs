//! Compiled template descriptors.
//!
//! A [`Descriptor`] is the cloneable static structure of a template plus one
//! [`Slot`] per gap, in the order dynamic values are supplied.

use std::fmt;
use std::rc::Rc;

use crate::BindingError;

// =============================================================================
// Static structure
// =============================================================================

/// One node of a template's static structure.
///
/// Dynamic attributes are stripped from elements at compile time; only
/// fully static attributes survive here. Each node slot contributes a pair of
/// [`StaticNode::Marker`]s that bound the slot's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<StaticNode>,
    },
    Text(String),
    Comment(String),
    Marker,
}

// =============================================================================
// Slots
// =============================================================================

/// What kind of write a slot performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// Child content between two markers.
    Node,
    /// String-interpolated attribute. `strings` holds the static text around
    /// every dynamic fragment of the attribute; `index` is this fragment.
    Attribute {
        name: String,
        strings: Rc<[String]>,
        index: usize,
    },
    /// `?name`: present when the value is truthy.
    BooleanAttribute { name: String },
    /// `.name`: passes the value through to a node property.
    Property {
        name: String,
        strings: Rc<[String]>,
        index: usize,
    },
    /// `@name`: event listener.
    Event { name: String },
    /// Gap inside a comment. Consumes a value, owns no part.
    Inactive,
}

impl SlotKind {
    pub fn name(&self) -> &'static str {
        match self {
            SlotKind::Node => "node",
            SlotKind::Attribute { .. } => "attribute",
            SlotKind::BooleanAttribute { .. } => "boolean attribute",
            SlotKind::Property { .. } => "property",
            SlotKind::Event { .. } => "event",
            SlotKind::Inactive => "inactive",
        }
    }
}

/// A compile-time-identified position where a dynamic value is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub kind: SlotKind,
    /// Child-index path from the cloned fragment root. For node slots this
    /// points at the start marker; the end marker is its next sibling.
    pub path: Vec<usize>,
}

impl Slot {
    /// Attribute, property or event name, if the slot has one.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            SlotKind::Attribute { name, .. }
            | SlotKind::BooleanAttribute { name }
            | SlotKind::Property { name, .. }
            | SlotKind::Event { name } => Some(name),
            SlotKind::Node | SlotKind::Inactive => None,
        }
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Identity of a compiled descriptor, unique within one template cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub(crate) u64);

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tpl{}", self.0)
    }
}

/// Compiled, cacheable structural plan for one template shape.
#[derive(Debug)]
pub struct Descriptor {
    id: DescriptorId,
    nodes: Vec<StaticNode>,
    slots: Vec<Slot>,
}

impl Descriptor {
    pub(crate) fn new(id: DescriptorId, nodes: Vec<StaticNode>, slots: Vec<Slot>) -> Self {
        Self { id, nodes, slots }
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    /// Static structure cloned for every instance.
    pub fn nodes(&self) -> &[StaticNode] {
        &self.nodes
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of dynamic values one evaluation must supply.
    pub fn value_count(&self) -> usize {
        self.slots.len()
    }

    /// Reject a value set of the wrong size before anything is applied.
    pub fn check_value_count(&self, found: usize) -> Result<(), BindingError> {
        if found == self.slots.len() {
            Ok(())
        } else {
            Err(BindingError::ValueCount {
                expected: self.slots.len(),
                found,
            })
        }
    }
}
