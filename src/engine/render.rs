//! Engine entry points.
//!
//! An [`Engine`] owns its template cache and one root [`NodePart`] per host
//! container, so separate engines never share state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::instance::TemplateInstance;
use super::node_part::NodePart;
use super::RenderContext;
use crate::config::Config;
use crate::error::Result;
use crate::host::HostTree;
use crate::template::{Descriptor, TemplateCache};
use crate::types::{NodeId, TemplateResult, Value};
use crate::CompileError;

/// Compiles, materializes and renders templates into a host tree.
#[derive(Default)]
pub struct Engine {
    templates: TemplateCache,
    roots: RefCell<HashMap<NodeId, NodePart>>,
    config: Config,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            templates: TemplateCache::new(),
            roots: RefCell::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    fn context<'a>(&'a self, host: &'a mut dyn HostTree) -> RenderContext<'a> {
        RenderContext {
            host,
            templates: &self.templates,
            config: &self.config,
        }
    }

    /// Compile (or fetch) the descriptor for a result's static fragments.
    pub fn compile(&self, result: &TemplateResult) -> std::result::Result<Rc<Descriptor>, CompileError> {
        self.templates.compile(result.strings())
    }

    /// Clone `descriptor` into `container` before `before` (appending when
    /// `None`). The instance holds no values until the first [`update`].
    ///
    /// [`update`]: Engine::update
    pub fn materialize_into(
        &self,
        host: &mut dyn HostTree,
        descriptor: &Rc<Descriptor>,
        container: NodeId,
        before: Option<NodeId>,
    ) -> Result<TemplateInstance> {
        let (instance, fragment) = TemplateInstance::materialize(descriptor.clone(), host)?;
        host.insert_before(container, fragment, before);
        Ok(instance)
    }

    /// Apply one evaluation's values to an instance.
    pub fn update(
        &self,
        host: &mut dyn HostTree,
        instance: &mut TemplateInstance,
        values: Vec<Value>,
    ) -> Result<()> {
        let mut cx = self.context(host);
        instance.update(values, &mut cx)
    }

    /// Render `value` into `container`.
    ///
    /// The first render appends a marker pair to the container; later renders
    /// reuse the same root part, so an unchanged template only updates its
    /// changed parts.
    pub fn render(&self, host: &mut dyn HostTree, value: impl Into<Value>, container: NodeId) -> Result<()> {
        let existing = self.roots.borrow_mut().remove(&container);
        let mut part = match existing {
            Some(part) => part,
            None => {
                tracing::debug!(container = %container, "new render root");
                NodePart::insert_new(host, container, None)
            }
        };

        part.set_value(value.into());
        let result = {
            let mut cx = self.context(host);
            part.commit(&mut cx)
        };
        self.roots.borrow_mut().insert(container, part);
        result
    }

    /// Remove everything rendered into `container`, markers included.
    pub fn clear(&self, host: &mut dyn HostTree, container: NodeId) -> bool {
        match self.roots.borrow_mut().remove(&container) {
            Some(mut part) => {
                part.remove(host);
                true
            }
            None => false,
        }
    }

    pub fn has_root(&self, container: NodeId) -> bool {
        self.roots.borrow().contains_key(&container)
    }

    /// Inspect the root part of `container`.
    pub fn with_root<R>(&self, container: NodeId, f: impl FnOnce(&NodePart) -> R) -> Option<R> {
        self.roots.borrow().get(&container).map(f)
    }
}
