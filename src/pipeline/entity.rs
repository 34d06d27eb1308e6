//! Entity classes and entity handles.
//!
//! An [`EntityClass`] is declared once: its reactive properties, its template
//! function and optional render hooks. Mounting a class on a host element
//! with [`Runtime::mount`](super::Runtime::mount) yields an [`Entity`].

use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use spark_signals::Signal;

use super::runtime::{Runtime, RuntimeInner};
use crate::error::Result;
use crate::state::{Property, PropertyDefinition, PropertyValue, SetOutcome};
use crate::types::{NodeId, Strings, TemplateResult};
use crate::Error;

/// Identity of a mounted entity, unique within one runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity{}", self.0)
    }
}

pub type TemplateFn = Rc<dyn Fn(&Entity) -> Result<TemplateResult>>;
pub type RenderHook = Rc<dyn Fn(&Entity)>;

// =============================================================================
// EntityClass
// =============================================================================

/// A component type: declared properties plus a template function.
pub struct EntityClass {
    name: String,
    properties: IndexMap<String, Rc<PropertyDefinition>>,
    template: TemplateFn,
    will_render: Option<RenderHook>,
    did_render: Option<RenderHook>,
}

impl EntityClass {
    pub fn builder(name: impl Into<String>) -> EntityClassBuilder {
        EntityClassBuilder {
            name: name.into(),
            properties: IndexMap::new(),
            template: None,
            will_render: None,
            did_render: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self, name: &str) -> Option<&Rc<PropertyDefinition>> {
        self.properties.get(name)
    }

    /// Declared properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Rc<PropertyDefinition>)> {
        self.properties.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub(crate) fn render(&self, entity: &Entity) -> Result<TemplateResult> {
        (self.template)(entity)
    }

    pub(crate) fn will_render(&self) -> Option<&RenderHook> {
        self.will_render.as_ref()
    }

    pub(crate) fn did_render(&self) -> Option<&RenderHook> {
        self.did_render.as_ref()
    }
}

impl fmt::Debug for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityClass")
            .field("name", &self.name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`EntityClass`].
pub struct EntityClassBuilder {
    name: String,
    properties: IndexMap<String, Rc<PropertyDefinition>>,
    template: Option<TemplateFn>,
    will_render: Option<RenderHook>,
    did_render: Option<RenderHook>,
}

impl EntityClassBuilder {
    /// Declare a reactive property. Redeclaring a name replaces it.
    pub fn declare_property(mut self, name: impl Into<String>, definition: PropertyDefinition) -> Self {
        self.properties.insert(name.into(), Rc::new(definition));
        self
    }

    pub fn template(mut self, f: impl Fn(&Entity) -> Result<TemplateResult> + 'static) -> Self {
        self.template = Some(Rc::new(f));
        self
    }

    /// Runs before the template function on every render.
    pub fn will_render(mut self, f: impl Fn(&Entity) + 'static) -> Self {
        self.will_render = Some(Rc::new(f));
        self
    }

    /// Runs after the render has been committed to the host.
    pub fn did_render(mut self, f: impl Fn(&Entity) + 'static) -> Self {
        self.did_render = Some(Rc::new(f));
        self
    }

    /// A class without a template renders nothing.
    pub fn build(self) -> Rc<EntityClass> {
        let template = match self.template {
            Some(template) => template,
            None => {
                let empty: TemplateFn = Rc::new(|_: &Entity| {
                    static EMPTY: &[&str] = &[""];
                    Ok(TemplateResult::new(Strings::from_static(EMPTY), Vec::new()))
                });
                empty
            }
        };
        Rc::new(EntityClass {
            name: self.name,
            properties: self.properties,
            template,
            will_render: self.will_render,
            did_render: self.did_render,
        })
    }
}

// =============================================================================
// Entity
// =============================================================================

/// Handle to a mounted entity.
///
/// Handles hold the runtime weakly, so listeners that capture an entity do
/// not keep the runtime alive. Every operation on an entity whose runtime is
/// gone, or that has been unmounted, fails with [`Error::UnknownEntity`].
#[derive(Clone)]
pub struct Entity {
    id: EntityId,
    element: NodeId,
    runtime: Weak<RuntimeInner>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, element: NodeId, runtime: Weak<RuntimeInner>) -> Self {
        Self { id, element, runtime }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Host element the entity renders into.
    pub fn element(&self) -> NodeId {
        self.element
    }

    fn runtime(&self) -> Result<Runtime> {
        self.runtime
            .upgrade()
            .map(Runtime::from_inner)
            .ok_or(Error::UnknownEntity(self.id.0))
    }

    /// Read a property, applying its read transform.
    pub fn get(&self, name: &str) -> Result<PropertyValue> {
        self.runtime()?.read_property(self, name)
    }

    /// Write a property through the full write pipeline.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) -> Result<SetOutcome> {
        self.runtime()?.write_property(self, name, value.into())
    }

    pub fn property(&self, name: &str) -> Result<Property> {
        self.runtime()?.check_declared(self.id, name)?;
        Ok(Property::new(self.clone(), name))
    }

    pub(crate) fn signal(&self, name: &str) -> Result<Signal<PropertyValue>> {
        self.runtime()?.property_signal(self.id, name)
    }

    pub fn request_render(&self) -> Result<()> {
        self.runtime()?.request_render(self)
    }

    /// Re-render this entity whenever `source` writes one of `properties`.
    pub fn depends_on(&self, source: &Entity, properties: &[&str]) -> Result<()> {
        self.runtime()?.declare_dependency(self, source, properties)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.runtime.ptr_eq(&other.runtime)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("element", &self.element)
            .finish()
    }
}
