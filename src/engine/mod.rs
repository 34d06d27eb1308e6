//! Template Engine - materialization, part commits and reconciliation.
//!
//! The engine turns compiled [`Descriptor`](crate::template::Descriptor)s into
//! live subtrees and keeps them current:
//!
//! - [`TemplateInstance`]: cloned structure plus one part per slot
//! - Parts: attribute, boolean attribute, property, event and node parts
//! - [`NodePart`]: the node-slot state machine (text, nested instance, live
//!   node, keyed sequence)
//! - Reconciler: four-cursor keyed matching for sequences
//! - [`Engine`]: the `compile` / `materialize_into` / `update` / `render`
//!   surface, one root part per host container
//!
//! # Update Protocol
//!
//! ```text
//! values ─► set_value (every part) ─► commit (every part, slot order)
//! ```
//!
//! A part writes to the host only when its committed value differs from the
//! last one it wrote.

mod instance;
mod node_part;
mod parts;
mod reconcile;
mod render;

pub use instance::TemplateInstance;
pub use node_part::{NodePart, NodeStateKind};
pub use reconcile::ReconcileOutcome;
pub use render::Engine;

use crate::config::Config;
use crate::host::HostTree;
use crate::template::TemplateCache;

/// Everything a commit needs besides the part itself.
pub(crate) struct RenderContext<'a> {
    pub(crate) host: &'a mut dyn HostTree,
    pub(crate) templates: &'a TemplateCache,
    pub(crate) config: &'a Config,
}
