//! Error taxonomy.
//!
//! Compile and binding errors abort the operation that hit them and surface
//! to the caller. Property errors reject the write. Side-effect errors abort
//! the remaining steps of the write that raised them.

use thiserror::Error;

/// Boxed error returned by user callbacks (side effects, storage backends).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A template shape that cannot be compiled.
///
/// Reported on first compilation and cached, so the same shape fails the
/// same way every time without being re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("slot {slot} appears inside a tag name")]
    SlotInTagName { slot: usize },

    #[error("slot {slot} appears in an attribute-name position")]
    SlotInAttributeName { slot: usize },

    #[error("slot {slot} appears inside a closing tag")]
    SlotInClosingTag { slot: usize },

    #[error("binding `{name}` (slot {slot}) must be exactly one dynamic value with no static text")]
    InvalidBinding { name: String, slot: usize },

    #[error("closing tag </{found}> does not match <{expected}> at byte {offset}")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("closing tag </{found}> has no open element at byte {offset}")]
    StrayClose { found: String, offset: usize },

    #[error("element <{tag}> is never closed")]
    Unclosed { tag: String },

    #[error("malformed markup at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
}

/// A value set that cannot be applied to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("template expects {expected} values but {found} were supplied")]
    ValueCount { expected: usize, found: usize },

    #[error("duplicate key `{key}` in keyed sequence")]
    DuplicateKey { key: String },

    #[error("{value} values cannot be bound to a {slot} slot")]
    UnsupportedValue {
        slot: &'static str,
        value: &'static str,
    },

    #[error("slot {slot} could not be located in the cloned structure")]
    MissingNode { slot: usize },

    #[error("node part markers are not attached to a parent")]
    DetachedRange,
}

/// A reactive property access that does not match any declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property `{name}` is not declared on `{class}`")]
    Undeclared { class: String, name: String },
}

/// Every failure the engine and runtime can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("side effect for `{property}` failed")]
    SideEffect {
        property: String,
        #[source]
        source: BoxError,
    },

    #[error("persistent storage failed")]
    Storage(#[source] BoxError),

    #[error("render queue still busy after {ticks} checkpoints")]
    TickLimit { ticks: usize },

    #[error("host tree is already borrowed")]
    HostBusy,

    #[error("entity {0} is not mounted")]
    UnknownEntity(u64),
}
