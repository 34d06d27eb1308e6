//! Keyed Sequence Reconciler.
//!
//! Matches the previous ordered parts against a new ordered list of
//! `(key, value)` pairs with four cursors (old head/tail, new head/tail),
//! falling back to key maps only when none of the four ends match.
//!
//! ```text
//! old:  [A B C D]        new:  [D A B C]
//!        ^     ^                ^     ^
//!      head  tail             head  tail
//!
//! old tail (D) == new head (D): move D before A, one range move.
//! ```
//!
//! A key present in both sequences always keeps its part: the part's markers
//! and content move, they are never rebuilt.

use std::collections::HashMap;

use super::node_part::NodePart;
use super::RenderContext;
use crate::error::Result;
use crate::types::{Key, NodeId, Value};

/// What one reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Parts kept in place or moved (their value was re-committed).
    pub reused: usize,
    /// Range moves performed.
    pub moved: usize,
    pub created: usize,
    pub removed: usize,
}

/// The ordered keys and parts from the previous reconciliation.
#[derive(Default)]
pub(crate) struct SequenceState {
    keys: Vec<Key>,
    parts: Vec<NodePart>,
    outcome: ReconcileOutcome,
}

impl SequenceState {
    pub(crate) fn parts(&self) -> &[NodePart] {
        &self.parts
    }

    pub(crate) fn outcome(&self) -> ReconcileOutcome {
        self.outcome
    }
}

fn commit_into(part: &mut NodePart, value: Value, cx: &mut RenderContext<'_>) -> Result<()> {
    part.set_value(value);
    part.commit(cx)
}

fn move_before(part: &NodePart, parent: NodeId, reference: NodeId, cx: &mut RenderContext<'_>) {
    tracing::trace!(start = %part.start(), before = %reference, "move sequence item");
    cx.host.move_range(part.start(), part.end(), parent, Some(reference));
}

/// Reconcile `sequence` against `items`, inside `parent`, ending at
/// `container_end`. Keys must already be unique.
pub(crate) fn reconcile(
    sequence: &mut SequenceState,
    items: Vec<(Key, Value)>,
    parent: NodeId,
    container_end: NodeId,
    cx: &mut RenderContext<'_>,
) -> Result<()> {
    let (new_keys, new_values): (Vec<Key>, Vec<Value>) = items.into_iter().unzip();
    let mut new_values: Vec<Option<Value>> = new_values.into_iter().map(Some).collect();
    let old_keys = std::mem::take(&mut sequence.keys);
    let mut old_parts: Vec<Option<NodePart>> =
        std::mem::take(&mut sequence.parts).into_iter().map(Some).collect();
    let mut new_parts: Vec<Option<NodePart>> = (0..new_keys.len()).map(|_| None).collect();
    let mut outcome = ReconcileOutcome::default();

    // Half-open windows: old_head..old_end, new_head..new_end.
    let (mut old_head, mut old_end) = (0, old_parts.len());
    let (mut new_head, mut new_end) = (0, new_keys.len());

    let mut new_key_index: Option<HashMap<&Key, usize>> = None;
    let mut old_key_index: Option<HashMap<&Key, usize>> = None;

    // Start marker of the part placed right after the new window, or the
    // container end when the window reaches the end.
    let boundary = |new_parts: &[Option<NodePart>], new_end: usize| {
        new_parts
            .get(new_end)
            .and_then(Option::as_ref)
            .map_or(container_end, NodePart::start)
    };

    while old_head < old_end && new_head < new_end {
        if old_parts[old_head].is_none() {
            old_head += 1;
        } else if old_parts[old_end - 1].is_none() {
            old_end -= 1;
        } else if old_keys[old_head] == new_keys[new_head] {
            let Some(mut part) = old_parts[old_head].take() else { continue };
            commit_into(&mut part, take_value(&mut new_values, new_head), cx)?;
            new_parts[new_head] = Some(part);
            outcome.reused += 1;
            old_head += 1;
            new_head += 1;
        } else if old_keys[old_end - 1] == new_keys[new_end - 1] {
            let Some(mut part) = old_parts[old_end - 1].take() else { continue };
            commit_into(&mut part, take_value(&mut new_values, new_end - 1), cx)?;
            new_parts[new_end - 1] = Some(part);
            outcome.reused += 1;
            old_end -= 1;
            new_end -= 1;
        } else if old_keys[old_head] == new_keys[new_end - 1] {
            // Old head moves to the new tail.
            let Some(mut part) = old_parts[old_head].take() else { continue };
            commit_into(&mut part, take_value(&mut new_values, new_end - 1), cx)?;
            let reference = boundary(&new_parts, new_end);
            move_before(&part, parent, reference, cx);
            new_parts[new_end - 1] = Some(part);
            outcome.reused += 1;
            outcome.moved += 1;
            old_head += 1;
            new_end -= 1;
        } else if old_keys[old_end - 1] == new_keys[new_head] {
            // Old tail moves to the new head.
            let reference = start_of(&old_parts, old_head, container_end);
            let Some(mut part) = old_parts[old_end - 1].take() else { continue };
            commit_into(&mut part, take_value(&mut new_values, new_head), cx)?;
            move_before(&part, parent, reference, cx);
            new_parts[new_head] = Some(part);
            outcome.reused += 1;
            outcome.moved += 1;
            old_end -= 1;
            new_head += 1;
        } else {
            let new_index = new_key_index.get_or_insert_with(|| {
                (new_head..new_end).map(|i| (&new_keys[i], i)).collect()
            });
            if !new_index.contains_key(&old_keys[old_head]) {
                if let Some(mut part) = old_parts[old_head].take() {
                    part.remove(cx.host);
                    outcome.removed += 1;
                }
                old_head += 1;
            } else if !new_index.contains_key(&old_keys[old_end - 1]) {
                if let Some(mut part) = old_parts[old_end - 1].take() {
                    part.remove(cx.host);
                    outcome.removed += 1;
                }
                old_end -= 1;
            } else {
                let old_index = old_key_index.get_or_insert_with(|| {
                    (old_head..old_end).map(|i| (&old_keys[i], i)).collect()
                });
                let reference = start_of(&old_parts, old_head, container_end);
                let existing = old_index
                    .get(&new_keys[new_head])
                    .and_then(|i| old_parts[*i].take());
                let value = take_value(&mut new_values, new_head);
                let part = match existing {
                    Some(mut part) => {
                        commit_into(&mut part, value, cx)?;
                        move_before(&part, parent, reference, cx);
                        outcome.reused += 1;
                        outcome.moved += 1;
                        part
                    }
                    None => {
                        let mut part = NodePart::insert_new(cx.host, parent, Some(reference));
                        commit_into(&mut part, value, cx)?;
                        outcome.created += 1;
                        part
                    }
                };
                new_parts[new_head] = Some(part);
                new_head += 1;
            }
        }
    }

    while new_head < new_end {
        let reference = boundary(&new_parts, new_end);
        let mut part = NodePart::insert_new(cx.host, parent, Some(reference));
        commit_into(&mut part, take_value(&mut new_values, new_head), cx)?;
        new_parts[new_head] = Some(part);
        outcome.created += 1;
        new_head += 1;
    }

    for slot in &mut old_parts[old_head..old_end] {
        if let Some(mut part) = slot.take() {
            part.remove(cx.host);
            outcome.removed += 1;
        }
    }

    tracing::trace!(
        reused = outcome.reused,
        moved = outcome.moved,
        created = outcome.created,
        removed = outcome.removed,
        "reconciled sequence"
    );
    drop(new_key_index);
    drop(old_key_index);
    sequence.keys = new_keys;
    sequence.parts = new_parts.into_iter().flatten().collect();
    sequence.outcome = outcome;
    Ok(())
}

fn take_value(values: &mut [Option<Value>], index: usize) -> Value {
    values[index].take().unwrap_or_default()
}

fn start_of(parts: &[Option<NodePart>], index: usize, fallback: NodeId) -> NodeId {
    parts
        .get(index)
        .and_then(Option::as_ref)
        .map_or(fallback, NodePart::start)
}
