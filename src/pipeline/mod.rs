//! Reactive Pipeline
//!
//! Connects reactive property writes to template renders.
//!
//! # Pipeline Architecture
//!
//! ```text
//! property write → Scheduler (coalesce) → checkpoint → template fn → Engine::render
//!                     ↑
//!          DependencyGraph (dependents deferred one checkpoint)
//! ```
//!
//! ## Key Design Principles
//!
//! - **Explicit checkpoints**: nothing renders until `Runtime::tick` or
//!   `Runtime::flush` runs
//! - **Coalescing**: any number of writes to one entity within a checkpoint
//!   window produce exactly one render
//! - **Owned state**: every registry lives in a `Runtime`, never in globals

mod dependency;
mod entity;
mod runtime;
mod scheduler;

pub use entity::{Entity, EntityClass, EntityClassBuilder, EntityId, RenderHook, TemplateFn};
pub use runtime::Runtime;
pub use scheduler::TickReport;
