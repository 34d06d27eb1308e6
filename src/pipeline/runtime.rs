//! Entity runtime.
//!
//! The [`Runtime`] owns everything the reactive layer shares: the engine, the
//! host tree, mounted entities, the scheduler, the dependency graph and
//! persistence. It is an explicit object, so independent runtimes never
//! share state.
//!
//! Callbacks (transforms, side effects, hooks, templates) always run with no
//! runtime borrow held, so they may read and write properties freely. The
//! host is borrowed only while a render or a mirror write is applied.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use spark_signals::Signal;

use super::dependency::DependencyGraph;
use super::entity::{Entity, EntityClass, EntityId};
use super::scheduler::{Scheduler, TickReport};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::host::HostTree;
use crate::state::{
    decode, storage_key, MemoryStorage, PersistenceQueue, PropertyDefinition, PropertyStore,
    PropertyValue, SetOutcome, Storage, WriteOutcome,
};
use crate::types::NodeId;
use crate::{Error, PropertyError};

struct EntityRecord {
    class: Rc<EntityClass>,
    element: NodeId,
    store: PropertyStore,
}

impl EntityRecord {
    fn lookup(&self, name: &str) -> Result<(Rc<PropertyDefinition>, Signal<PropertyValue>)> {
        let undeclared = || PropertyError::Undeclared {
            class: self.class.name().to_string(),
            name: name.to_string(),
        };
        let definition = self.class.property(name).cloned().ok_or_else(undeclared)?;
        let signal = self.store.signal(name).ok_or_else(undeclared)?;
        Ok((definition, signal))
    }
}

pub(crate) struct RuntimeInner {
    engine: Engine,
    host: Rc<RefCell<dyn HostTree>>,
    entities: RefCell<IndexMap<EntityId, Rc<EntityRecord>>>,
    scheduler: RefCell<Scheduler>,
    dependencies: RefCell<DependencyGraph>,
    persistence: RefCell<PersistenceQueue>,
    storage: RefCell<Rc<dyn Storage>>,
    next_id: Cell<u64>,
}

/// Shared handle to one reactive runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(host: Rc<RefCell<dyn HostTree>>) -> Self {
        Self::with_config(host, Config::default())
    }

    pub fn with_config(host: Rc<RefCell<dyn HostTree>>, config: Config) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                engine: Engine::with_config(config),
                host,
                entities: RefCell::new(IndexMap::new()),
                scheduler: RefCell::new(Scheduler::default()),
                dependencies: RefCell::new(DependencyGraph::default()),
                persistence: RefCell::new(PersistenceQueue::default()),
                storage: RefCell::new(Rc::new(MemoryStorage::new())),
                next_id: Cell::new(1),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RuntimeInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &Config {
        self.inner.engine.config()
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn host(&self) -> Rc<RefCell<dyn HostTree>> {
        self.inner.host.clone()
    }

    /// Replace the persistence backend. Values already loaded are kept.
    pub fn set_storage(&self, storage: Rc<dyn Storage>) {
        *self.inner.storage.borrow_mut() = storage;
    }

    fn record(&self, id: EntityId) -> Result<Rc<EntityRecord>> {
        self.inner
            .entities
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownEntity(id.0))
    }

    fn handle(&self, id: EntityId, element: NodeId) -> Entity {
        Entity::new(id, element, Rc::downgrade(&self.inner))
    }

    fn storage_key_for(&self, class: &EntityClass, name: &str, definition: &PropertyDefinition) -> String {
        storage_key(
            &self.config().storage_prefix,
            class.name(),
            name,
            definition.storage_key.as_deref(),
        )
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    /// Mount `class` on `element`: create its property store (loading
    /// persisted values), apply mirrors and request the first render.
    pub fn mount(&self, class: &Rc<EntityClass>, element: NodeId) -> Result<Entity> {
        let id = EntityId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        let storage = self.inner.storage.borrow().clone();
        let values: Vec<(String, PropertyValue)> = class
            .properties()
            .map(|(name, definition)| {
                let value = if definition.persistent {
                    let key = self.storage_key_for(class, name, definition);
                    storage
                        .load(&key)
                        .map(|raw| decode(&key, &raw, &definition.initial))
                        .unwrap_or_else(|| definition.initial.clone())
                } else {
                    definition.initial.clone()
                };
                (name.to_string(), value)
            })
            .collect();

        let record = Rc::new(EntityRecord {
            class: class.clone(),
            element,
            store: PropertyStore::new(values),
        });
        self.inner.entities.borrow_mut().insert(id, record.clone());

        for (name, definition) in class.properties() {
            if definition.has_mirror() {
                let (_, signal) = record.lookup(name)?;
                self.apply_mirrors(element, definition, &signal.get())?;
            }
        }

        self.inner.scheduler.borrow_mut().request(id);
        tracing::debug!(entity = %id, class = class.name(), element = %element, "mounted entity");
        Ok(self.handle(id, element))
    }

    /// Clear the entity's element and drop its pending work and dependencies.
    pub fn unmount(&self, entity: &Entity) -> Result<()> {
        let mut host = self.inner.host.try_borrow_mut().map_err(|_| Error::HostBusy)?;
        let record = self
            .inner
            .entities
            .borrow_mut()
            .shift_remove(&entity.id())
            .ok_or(Error::UnknownEntity(entity.id().0))?;
        self.inner.scheduler.borrow_mut().forget(entity.id());
        self.inner.dependencies.borrow_mut().forget(entity.id());
        self.inner.engine.clear(&mut *host, record.element);
        tracing::debug!(entity = %entity.id(), "unmounted entity");
        Ok(())
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        let element = self.inner.entities.borrow().get(&id)?.element;
        Some(self.handle(id, element))
    }

    pub fn entity_count(&self) -> usize {
        self.inner.entities.borrow().len()
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub(crate) fn check_declared(&self, id: EntityId, name: &str) -> Result<()> {
        self.record(id)?.lookup(name).map(|_| ())
    }

    pub(crate) fn property_signal(&self, id: EntityId, name: &str) -> Result<Signal<PropertyValue>> {
        Ok(self.record(id)?.lookup(name)?.1)
    }

    pub(crate) fn read_property(&self, entity: &Entity, name: &str) -> Result<PropertyValue> {
        let (definition, signal) = self.record(entity.id())?.lookup(name)?;
        let stored = signal.get();
        Ok(match &definition.read_transform {
            Some(transform) => transform(entity, &stored),
            None => stored,
        })
    }

    pub(crate) fn write_property(
        &self,
        entity: &Entity,
        name: &str,
        value: PropertyValue,
    ) -> Result<SetOutcome> {
        let record = self.record(entity.id())?;
        let (definition, signal) = record.lookup(name)?;
        let previous = signal.get();

        let value = match &definition.write_transform {
            Some(transform) => match transform(entity, value, &previous) {
                WriteOutcome::Accept(value) => value,
                WriteOutcome::Suppress => {
                    tracing::trace!(entity = %entity.id(), property = name, "write suppressed");
                    return Ok(SetOutcome::Suppressed);
                }
            },
            None => value,
        };

        let changed = value != previous;
        if changed {
            signal.set(value.clone());
            if definition.has_mirror() {
                self.apply_mirrors(record.element, &definition, &value)?;
            }
        }

        if let Some(side_effect) = &definition.side_effect {
            side_effect(entity, &value, &previous).map_err(|source| Error::SideEffect {
                property: name.to_string(),
                source,
            })?;
        }

        if changed && definition.persistent {
            let key = self.storage_key_for(&record.class, name, &definition);
            self.inner
                .persistence
                .borrow_mut()
                .stage(key, &value)
                .map_err(|err| Error::Storage(Box::new(err)))?;
        }

        let scheduled = definition.reactive && (changed || definition.always_render);
        if scheduled {
            let dependents = self.inner.dependencies.borrow().dependents(entity.id(), name);
            let mut scheduler = self.inner.scheduler.borrow_mut();
            scheduler.request(entity.id());
            for dependent in dependents {
                if dependent != entity.id() {
                    scheduler.defer(dependent);
                }
            }
        }
        tracing::trace!(entity = %entity.id(), property = name, changed, scheduled, "property written");
        Ok(SetOutcome::Committed { changed, scheduled })
    }

    fn apply_mirrors(&self, element: NodeId, definition: &PropertyDefinition, value: &PropertyValue) -> Result<()> {
        let mut host = self.inner.host.try_borrow_mut().map_err(|_| Error::HostBusy)?;
        if let Some(class) = &definition.mirror_class {
            host.toggle_class(element, class, value.is_truthy());
        }
        if let Some(mirror) = &definition.mirror_attribute {
            match mirror.text_for(value) {
                Some(text) => host.set_attribute(element, &mirror.name, &text),
                None => {
                    if host.get_attribute(element, &mirror.name).is_some() {
                        host.remove_attribute(element, &mirror.name);
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Ask for a render at the next checkpoint. Coalesces with writes.
    pub fn request_render(&self, entity: &Entity) -> Result<()> {
        self.record(entity.id())?;
        if self.inner.scheduler.borrow_mut().request(entity.id()) {
            tracing::trace!(entity = %entity.id(), "render requested");
        }
        Ok(())
    }

    /// Re-render `dependent` one checkpoint after `source` writes any of
    /// `properties`.
    pub fn declare_dependency(&self, dependent: &Entity, source: &Entity, properties: &[&str]) -> Result<()> {
        self.record(dependent.id())?;
        let record = self.record(source.id())?;
        for property in properties {
            record.lookup(property)?;
        }
        self.inner
            .dependencies
            .borrow_mut()
            .declare(dependent.id(), source.id(), properties);
        Ok(())
    }

    pub fn is_idle(&self) -> bool {
        self.inner.scheduler.borrow().is_idle() && self.inner.persistence.borrow().is_empty()
    }

    /// Number of checkpoints run so far.
    pub fn checkpoint(&self) -> u64 {
        self.inner.scheduler.borrow().checkpoint()
    }

    /// Run one checkpoint: render every pending entity in request order,
    /// then write staged persistent values in one batch.
    ///
    /// A failed render is logged and reported; it does not stop the others.
    pub fn tick(&self) -> TickReport {
        let (checkpoint, batch) = self.inner.scheduler.borrow_mut().begin_checkpoint();
        let mut report = TickReport {
            checkpoint,
            ..TickReport::default()
        };

        for id in batch {
            match self.render_entity(id) {
                Ok(true) => report.rendered.push(id),
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(entity = %id, error = %err, "render failed");
                    report.failures.push((id, err));
                }
            }
        }

        match self.flush_storage() {
            Ok(persisted) => report.persisted = persisted,
            Err(err) => {
                tracing::warn!(error = %err, "persisting properties failed");
                report.storage_error = Some(err);
            }
        }

        tracing::debug!(checkpoint, rendered = report.rendered.len(), "checkpoint complete");
        report
    }

    /// Run checkpoints until nothing is pending.
    pub fn flush(&self) -> Result<Vec<TickReport>> {
        let limit = self.config().max_flush_ticks;
        let mut reports = Vec::new();
        while !self.is_idle() {
            if reports.len() >= limit {
                tracing::warn!(ticks = limit, "render queue did not settle");
                return Err(Error::TickLimit { ticks: limit });
            }
            reports.push(self.tick());
        }
        Ok(reports)
    }

    /// Render one entity. `Ok(false)` when it was unmounted meanwhile.
    fn render_entity(&self, id: EntityId) -> Result<bool> {
        let Ok(record) = self.record(id) else {
            return Ok(false);
        };
        let entity = self.handle(id, record.element);

        if let Some(hook) = record.class.will_render() {
            hook(&entity);
        }
        let result = record.class.render(&entity)?;
        {
            let mut host = self.inner.host.try_borrow_mut().map_err(|_| Error::HostBusy)?;
            self.inner.engine.render(&mut *host, result, record.element)?;
        }
        if let Some(hook) = record.class.did_render() {
            hook(&entity);
        }
        Ok(true)
    }

    fn flush_storage(&self) -> Result<usize> {
        let entries = self.inner.persistence.borrow_mut().take();
        if entries.is_empty() {
            return Ok(0);
        }
        let storage = self.inner.storage.borrow().clone();
        if let Err(err) = storage.store_batch(&entries) {
            // Retried at the next checkpoint.
            self.inner.persistence.borrow_mut().restore(entries);
            return Err(Error::Storage(err));
        }
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::html;

    struct Setup {
        host: Rc<RefCell<MemoryHost>>,
        runtime: Runtime,
        element: NodeId,
    }

    fn setup() -> Setup {
        setup_with(Config::default())
    }

    fn setup_with(config: Config) -> Setup {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let element = host.borrow_mut().create_element("x-counter");
        let runtime = Runtime::with_config(host.clone(), config);
        Setup {
            host,
            runtime,
            element,
        }
    }

    fn counter_class(log: Rc<RefCell<Vec<String>>>) -> Rc<EntityClass> {
        let effect_log = log.clone();
        EntityClass::builder("counter")
            .declare_property(
                "count",
                PropertyDefinition::new(0).side_effect(move |_, new, prev| {
                    effect_log.borrow_mut().push(format!("effect {prev}->{new}"));
                    Ok(())
                }),
            )
            .declare_property("label", PropertyDefinition::new("n"))
            .template(move |entity| {
                log.borrow_mut().push("render".to_string());
                let count = entity.get("count")?;
                let label = entity.get("label")?;
                Ok(html!("<p>", label, ": ", count, "</p>"))
            })
            .build()
    }

    #[test]
    fn test_mount_renders_on_first_tick() {
        let s = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let entity = s.runtime.mount(&counter_class(log.clone()), s.element).unwrap();

        assert!(log.borrow().is_empty(), "render waits for a checkpoint");
        let report = s.runtime.tick();
        assert_eq!(report.rendered, vec![entity.id()]);
        assert_eq!(s.host.borrow().to_html(s.element), "<p>n: 0</p>");
        assert!(s.runtime.is_idle());
    }

    #[test]
    fn test_side_effect_runs_before_render() {
        let s = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let entity = s.runtime.mount(&counter_class(log.clone()), s.element).unwrap();
        s.runtime.tick();
        log.borrow_mut().clear();

        entity.set("count", 1).unwrap();
        s.runtime.tick();
        assert_eq!(*log.borrow(), vec!["effect 0->1".to_string(), "render".to_string()]);
    }

    #[test]
    fn test_unchanged_write_runs_effect_without_render() {
        let s = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let entity = s.runtime.mount(&counter_class(log.clone()), s.element).unwrap();
        s.runtime.tick();
        log.borrow_mut().clear();

        let outcome = entity.set("count", 0).unwrap();
        assert_eq!(outcome, SetOutcome::Committed { changed: false, scheduled: false });
        assert!(s.runtime.is_idle());
        assert_eq!(*log.borrow(), vec!["effect 0->0".to_string()]);
    }

    #[test]
    fn test_undeclared_property_is_reported() {
        let s = setup();
        let entity = s
            .runtime
            .mount(&counter_class(Rc::new(RefCell::new(Vec::new()))), s.element)
            .unwrap();
        let err = entity.set("cuont", 1).unwrap_err();
        assert!(matches!(err, Error::Property(PropertyError::Undeclared { .. })));
        assert!(entity.property("cuont").is_err());
    }

    #[test]
    fn test_side_effect_error_aborts_scheduling() {
        let s = setup();
        let class = EntityClass::builder("strict")
            .declare_property(
                "value",
                PropertyDefinition::new(0).side_effect(|_, new, _| {
                    if new.as_int() == Some(13) {
                        Err("unlucky".into())
                    } else {
                        Ok(())
                    }
                }),
            )
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        s.runtime.tick();

        let err = entity.set("value", 13).unwrap_err();
        assert!(matches!(err, Error::SideEffect { ref property, .. } if property == "value"));
        assert!(s.runtime.is_idle(), "no render after a failed side effect");
        assert_eq!(entity.get("value").unwrap(), PropertyValue::from(13), "state was already stored");
    }

    #[test]
    fn test_read_transform_recomputes() {
        let s = setup();
        let class = EntityClass::builder("doubler")
            .declare_property(
                "n",
                PropertyDefinition::new(2)
                    .read_transform(|_, v| PropertyValue::from(v.as_int().unwrap_or(0) * 2)),
            )
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        assert_eq!(entity.get("n").unwrap(), PropertyValue::from(4));
        entity.set("n", 5).unwrap();
        assert_eq!(entity.get("n").unwrap(), PropertyValue::from(10));
    }

    #[test]
    fn test_non_reactive_and_always_render() {
        let s = setup();
        let class = EntityClass::builder("flags")
            .declare_property("quiet", PropertyDefinition::new(0).non_reactive())
            .declare_property("loud", PropertyDefinition::new(0).always_render())
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        s.runtime.tick();

        entity.set("quiet", 1).unwrap();
        assert!(s.runtime.is_idle());

        let outcome = entity.set("loud", 0).unwrap();
        assert_eq!(outcome, SetOutcome::Committed { changed: false, scheduled: true });
        assert_eq!(s.runtime.tick().rendered, vec![entity.id()]);
    }

    #[test]
    fn test_mirrors_follow_writes() {
        let s = setup();
        let class = EntityClass::builder("toggle")
            .declare_property("active", PropertyDefinition::new(true).mirror_class("active"))
            .declare_property("level", PropertyDefinition::new(0).mirror_attribute("level"))
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        {
            let host = s.host.borrow();
            assert_eq!(host.get_attribute(s.element, "class").as_deref(), Some("active"));
            assert_eq!(host.get_attribute(s.element, "level"), None);
        }

        entity.set("active", false).unwrap();
        entity.set("level", 3).unwrap();
        let host = s.host.borrow();
        assert_eq!(host.get_attribute(s.element, "class"), None);
        assert_eq!(host.get_attribute(s.element, "level").as_deref(), Some("3"));
    }

    #[test]
    fn test_persistence_loads_and_batches() {
        let s = setup_with(Config::default().with_storage_prefix("app."));
        let storage = MemoryStorage::new();
        storage.insert("app.prefs.volume", "7");
        storage.insert("app.prefs.theme", "{broken");
        s.runtime.set_storage(Rc::new(storage.clone()));

        let class = EntityClass::builder("prefs")
            .declare_property("volume", PropertyDefinition::new(5).persistent())
            .declare_property("theme", PropertyDefinition::new("light").persistent())
            .declare_property("muted", PropertyDefinition::new(false).storage_key("mute"))
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        assert_eq!(entity.get("volume").unwrap(), PropertyValue::from(7));
        assert_eq!(entity.get("theme").unwrap(), PropertyValue::from("light"), "bad data falls back");

        entity.set("volume", 8).unwrap();
        entity.set("volume", 9).unwrap();
        entity.set("muted", true).unwrap();
        assert_eq!(storage.batch_count(), 0, "nothing written before the checkpoint");

        let report = s.runtime.tick();
        assert_eq!(report.persisted, 2);
        assert_eq!(storage.batch_count(), 1, "one batch per checkpoint");
        assert_eq!(storage.get("app.prefs.volume").as_deref(), Some("9"));
        assert_eq!(storage.get("app.mute").as_deref(), Some("true"));
    }

    /// Rejects its first batch, then delegates.
    struct FlakyStorage {
        failures_left: Cell<usize>,
        inner: MemoryStorage,
    }

    impl Storage for FlakyStorage {
        fn load(&self, key: &str) -> Option<String> {
            self.inner.load(key)
        }

        fn store_batch(&self, entries: &[(String, String)]) -> std::result::Result<(), crate::BoxError> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("disk full".into());
            }
            self.inner.store_batch(entries)
        }
    }

    #[test]
    fn test_failed_storage_batch_is_retried() {
        let s = setup();
        let backing = MemoryStorage::new();
        s.runtime.set_storage(Rc::new(FlakyStorage {
            failures_left: Cell::new(1),
            inner: backing.clone(),
        }));
        let class = EntityClass::builder("prefs")
            .declare_property("volume", PropertyDefinition::new(5).persistent())
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        s.runtime.flush().unwrap();

        entity.set("volume", 8).unwrap();
        let failed = s.runtime.tick();
        assert!(matches!(failed.storage_error, Some(Error::Storage(_))));
        assert!(!s.runtime.is_idle(), "rejected values stay staged");

        let reports = s.runtime.flush().unwrap();
        assert_eq!(reports.iter().map(|r| r.persisted).sum::<usize>(), 1);
        assert_eq!(backing.get("prefs.volume").as_deref(), Some("8"));
    }

    #[test]
    fn test_hook_write_schedules_next_checkpoint() {
        let s = setup();
        let class = EntityClass::builder("settling")
            .declare_property("passes", PropertyDefinition::new(0))
            .did_render(|entity| {
                let passes = entity.get("passes").ok().and_then(|v| v.as_int()).unwrap_or(0);
                if passes < 2 {
                    let _ = entity.set("passes", passes + 1);
                }
            })
            .build();
        s.runtime.mount(&class, s.element).unwrap();

        let reports = s.runtime.flush().unwrap();
        assert_eq!(reports.len(), 3, "each hook write lands in a new checkpoint");
        assert!(reports.iter().all(|r| r.rendered.len() == 1));
    }

    #[test]
    fn test_flush_gives_up_after_limit() {
        let s = setup_with(Config::default().with_max_flush_ticks(4));
        let class = EntityClass::builder("restless")
            .did_render(|entity| {
                let _ = entity.request_render();
            })
            .build();
        s.runtime.mount(&class, s.element).unwrap();

        let err = s.runtime.flush().unwrap_err();
        assert!(matches!(err, Error::TickLimit { ticks: 4 }));
    }

    #[test]
    fn test_render_failure_is_reported() {
        let s = setup();
        let class = EntityClass::builder("broken")
            .template(|_| Ok(crate::TemplateResult::new(crate::Strings::owned(["<p>", "</p>"]), vec![])))
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        let report = s.runtime.tick();
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].0, entity.id());
        assert!(matches!(
            report.failures[0].1,
            Error::Binding(crate::BindingError::ValueCount { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_unmount_clears_and_invalidates() {
        let s = setup();
        let entity = s
            .runtime
            .mount(&counter_class(Rc::new(RefCell::new(Vec::new()))), s.element)
            .unwrap();
        s.runtime.tick();
        entity.set("count", 4).unwrap();

        s.runtime.unmount(&entity).unwrap();
        assert_eq!(s.host.borrow().to_html(s.element), "");
        assert!(s.runtime.is_idle(), "pending render dropped");
        assert!(matches!(entity.get("count"), Err(Error::UnknownEntity(_))));
        assert_eq!(s.runtime.entity_count(), 0);
    }

    #[test]
    fn test_property_signal_drives_effects() {
        let s = setup();
        let class = EntityClass::builder("observed")
            .declare_property("x", PropertyDefinition::new(1))
            .build();
        let entity = s.runtime.mount(&class, s.element).unwrap();
        let property = entity.property("x").unwrap();
        let signal = property.signal().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _stop = spark_signals::effect(move || {
            seen_clone.borrow_mut().push(signal.get());
        });

        property.set(2).unwrap();
        assert_eq!(*seen.borrow(), vec![PropertyValue::from(1), PropertyValue::from(2)]);
    }
}
