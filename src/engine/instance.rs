//! Instance Materializer.
//!
//! A [`TemplateInstance`] is one live materialization of a [`Descriptor`]:
//! the cloned static structure plus one part per slot, in slot order.

use std::cell::RefCell;
use std::rc::Rc;

use super::node_part::NodePart;
use super::parts::{
    AttributeCommitter, AttributePart, BooleanAttributePart, CommitMode, EventPart, Part,
};
use super::RenderContext;
use crate::error::Result;
use crate::host::HostTree;
use crate::template::{Descriptor, SlotKind};
use crate::types::{NodeId, Value};
use crate::BindingError;

/// Live instance of a compiled template.
pub struct TemplateInstance {
    descriptor: Rc<Descriptor>,
    /// `None` for inactive slots.
    parts: Vec<Option<Part>>,
}

impl TemplateInstance {
    /// Clone the descriptor's static structure into a detached fragment and
    /// bind one part per slot. No values are written.
    ///
    /// Every slot path is resolved before anything else happens, so later
    /// insertions never shift a path that has not been followed yet.
    pub(crate) fn materialize(
        descriptor: Rc<Descriptor>,
        host: &mut dyn HostTree,
    ) -> std::result::Result<(Self, NodeId), BindingError> {
        let fragment = host.clone_static(descriptor.nodes());

        let mut targets = Vec::with_capacity(descriptor.slots().len());
        for (index, slot) in descriptor.slots().iter().enumerate() {
            let target = match slot.kind {
                SlotKind::Inactive => None,
                _ => Some(
                    host.resolve(fragment, &slot.path)
                        .ok_or(BindingError::MissingNode { slot: index })?,
                ),
            };
            targets.push(target);
        }

        let mut parts = Vec::with_capacity(targets.len());
        let mut committer: Option<Rc<RefCell<AttributeCommitter>>> = None;
        for (index, (slot, target)) in descriptor.slots().iter().zip(targets).enumerate() {
            let Some(node) = target else {
                parts.push(None);
                continue;
            };
            let part = match &slot.kind {
                SlotKind::Inactive => None,
                SlotKind::Node => {
                    let end = host
                        .next_sibling(node)
                        .ok_or(BindingError::MissingNode { slot: index })?;
                    Some(Part::Node(NodePart::new(node, end)))
                }
                SlotKind::Attribute { name, strings, index: fragment_index } => {
                    let shared = shared_committer(
                        &mut committer,
                        node,
                        name,
                        strings,
                        *fragment_index,
                        CommitMode::Attribute,
                    )
                    .ok_or(BindingError::MissingNode { slot: index })?;
                    Some(Part::Attribute(AttributePart::new(shared, *fragment_index)))
                }
                SlotKind::Property { name, strings, index: fragment_index } => {
                    let shared = shared_committer(
                        &mut committer,
                        node,
                        name,
                        strings,
                        *fragment_index,
                        CommitMode::Property,
                    )
                    .ok_or(BindingError::MissingNode { slot: index })?;
                    Some(Part::Attribute(AttributePart::new(shared, *fragment_index)))
                }
                SlotKind::BooleanAttribute { name } => {
                    Some(Part::Boolean(BooleanAttributePart::new(node, name)))
                }
                SlotKind::Event { name } => Some(Part::Event(EventPart::new(node, name))),
            };
            parts.push(part);
        }

        tracing::trace!(descriptor = %descriptor.id(), parts = parts.len(), "materialized instance");
        Ok((Self { descriptor, parts }, fragment))
    }

    /// Apply one evaluation's values.
    ///
    /// The count is checked before anything is staged. Every part receives
    /// its value first, then every part commits in slot order.
    pub(crate) fn update(&mut self, values: Vec<Value>, cx: &mut RenderContext<'_>) -> Result<()> {
        self.descriptor.check_value_count(values.len())?;

        for (part, value) in self.parts.iter_mut().zip(values) {
            if let Some(part) = part {
                part.set_value(value, cx.templates)?;
            }
        }
        for part in self.parts.iter_mut().flatten() {
            part.commit(cx)?;
        }
        Ok(())
    }

    pub fn descriptor(&self) -> &Rc<Descriptor> {
        &self.descriptor
    }

    /// Number of slots, including inactive ones.
    pub fn slot_count(&self) -> usize {
        self.parts.len()
    }

    /// The node part bound to slot `index`, if that slot is a node slot.
    pub fn node_part(&self, index: usize) -> Option<&NodePart> {
        self.parts.get(index)?.as_ref()?.as_node()
    }
}

/// The first fragment of an attribute creates its committer; later
/// fragments of the same attribute share it.
fn shared_committer(
    current: &mut Option<Rc<RefCell<AttributeCommitter>>>,
    element: NodeId,
    name: &str,
    strings: &Rc<[String]>,
    fragment_index: usize,
    mode: CommitMode,
) -> Option<Rc<RefCell<AttributeCommitter>>> {
    if fragment_index == 0 {
        let committer = Rc::new(RefCell::new(AttributeCommitter::new(
            element,
            name,
            strings.clone(),
            mode,
        )));
        *current = Some(committer.clone());
        Some(committer)
    } else {
        current.clone()
    }
}
