//! Template Compiler.
//!
//! Turns a template's static fragments into a [`Descriptor`]: the cloneable
//! static structure plus one [`Slot`] per dynamic value.
//!
//! # Pipeline
//!
//! ```text
//! Strings → parser (gap classification) → Descriptor → TemplateCache
//! ```
//!
//! Only the shape of a template is compiled; values never reach this module.

mod cache;
mod descriptor;
mod parser;

pub use cache::TemplateCache;
pub use descriptor::{Descriptor, DescriptorId, Slot, SlotKind, StaticNode};
