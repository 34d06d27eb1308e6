//! State Module - Reactive properties and their persistence.
//!
//! - **Property** - Definitions, per-entity signal store, the `Property` handle
//! - **Persistence** - Storage backends and per-checkpoint write staging

mod persistence;
mod property;

pub use persistence::{storage_key, MemoryStorage, Storage};
pub use property::{
    AttributeMap, AttributeMirror, Property, PropertyDefinition, PropertyValue, ReadTransform,
    SetOutcome, SideEffect, WriteOutcome, WriteTransform,
};

pub(crate) use persistence::{decode, PersistenceQueue};
pub(crate) use property::PropertyStore;
