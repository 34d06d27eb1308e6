//! # spark-template
//!
//! Declarative UI templates with part-level diffing and reactive entities.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! observable property state.
//!
//! ## Architecture
//!
//! A template is static markup with dynamic gaps. It is compiled once into a
//! descriptor, cloned once into the host tree, and afterwards only the parts
//! bound to changed values are written:
//! ```text
//! html!(..) → TemplateCache → TemplateInstance → Parts → HostTree
//!                                                  └─ keyed sequences: Reconciler
//! ```
//!
//! On top sits a reactive entity layer: property writes run a fixed pipeline
//! (transform, store, side effect, persistence, scheduling) and coalesce into
//! one render per entity per checkpoint.
//!
//! ## Modules
//!
//! - [`types`] - Template results, values, keys, listeners
//! - [`template`] - Template compiler and descriptor cache
//! - [`host`] - Host tree interface and the in-memory host
//! - [`engine`] - Instances, parts, node-part state machine, reconciler
//! - [`state`] - Reactive property definitions and persistence
//! - [`pipeline`] - Entities, scheduler, dependency graph, runtime
//!
//! ## Example
//!
//! ```ignore
//! use std::{cell::RefCell, rc::Rc};
//! use spark_template::{html, EntityClass, MemoryHost, PropertyDefinition, Runtime};
//!
//! let host = Rc::new(RefCell::new(MemoryHost::new()));
//! let element = host.borrow_mut().create_element("x-counter");
//! let runtime = Runtime::new(host.clone());
//!
//! let counter = EntityClass::builder("counter")
//!     .declare_property("count", PropertyDefinition::new(0))
//!     .template(|entity| Ok(html!("<p>Count: ", entity.get("count")?, "</p>")))
//!     .build();
//!
//! let entity = runtime.mount(&counter, element)?;
//! runtime.flush()?;
//! entity.set("count", 1)?;
//! runtime.flush()?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod state;
pub mod template;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::Config;

pub use error::{BindingError, BoxError, CompileError, Error, PropertyError, Result};

pub use template::{Descriptor, DescriptorId, Slot, SlotKind, StaticNode, TemplateCache};

pub use host::{dispatch_event, HostTree, MemoryHost, MutationStats};

pub use engine::{Engine, NodePart, NodeStateKind, ReconcileOutcome, TemplateInstance};

pub use state::{
    storage_key, AttributeMirror, MemoryStorage, Property, PropertyDefinition, PropertyValue,
    SetOutcome, Storage, WriteOutcome,
};

pub use pipeline::{Entity, EntityClass, EntityClassBuilder, EntityId, Runtime, TickReport};
