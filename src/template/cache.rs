//! Memoized template compilation.
//!
//! Lookup order:
//! 1. Fragment-list identity (one `'static` list per `html!` call site, or a
//!    weakly-held owned list).
//! 2. Fragment content, so identical text from different lists shares one
//!    [`Descriptor`].
//!
//! Failures are cached too: a shape that failed to compile fails again with
//! the same error without being re-parsed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::descriptor::{Descriptor, DescriptorId};
use super::parser;
use crate::CompileError;
use crate::types::{Strings, StringsId, StringsRef};

type Compiled = Result<Rc<Descriptor>, CompileError>;

struct IdentityEntry {
    strings: StringsRef,
    compiled: Compiled,
}

/// Per-engine descriptor cache.
///
/// Owned by an [`Engine`](crate::engine::Engine) rather than living in global
/// state, so independent engines never share compiled templates.
#[derive(Default)]
pub struct TemplateCache {
    by_identity: RefCell<HashMap<StringsId, IdentityEntry>>,
    by_content: RefCell<HashMap<Box<[String]>, Compiled>>,
    next_id: Cell<u64>,
    parses: Cell<usize>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a fragment list, reusing a cached descriptor when possible.
    pub fn compile(&self, strings: &Strings) -> Result<Rc<Descriptor>, CompileError> {
        let identity = strings.identity();
        if let Some(entry) = self.by_identity.borrow().get(&identity) {
            if entry.strings.refers_to(strings) {
                return entry.compiled.clone();
            }
        }

        let key = strings.content_key();
        let cached = self.by_content.borrow().get(&key).cloned();
        let compiled = match cached {
            Some(compiled) => compiled,
            None => {
                let compiled = self.parse(strings);
                self.by_content.borrow_mut().insert(key, compiled.clone());
                compiled
            }
        };

        let mut by_identity = self.by_identity.borrow_mut();
        by_identity.retain(|_, entry| entry.strings.is_alive());
        by_identity.insert(
            identity,
            IdentityEntry {
                strings: strings.downgrade(),
                compiled: compiled.clone(),
            },
        );
        compiled
    }

    fn parse(&self, strings: &Strings) -> Compiled {
        self.parses.set(self.parses.get() + 1);
        let id = DescriptorId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        match parser::parse(strings) {
            Ok((nodes, slots)) => {
                tracing::debug!(descriptor = %id, slots = slots.len(), "compiled template");
                Ok(Rc::new(Descriptor::new(id, nodes, slots)))
            }
            Err(err) => {
                tracing::debug!(error = %err, "template failed to compile");
                Err(err)
            }
        }
    }

    /// Number of distinct template shapes seen (compiled or failed).
    pub fn len(&self) -> usize {
        self.by_content.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times the parser actually ran.
    pub fn parse_count(&self) -> usize {
        self.parses.get()
    }

    /// Drop every cached descriptor.
    pub fn clear(&self) {
        self.by_identity.borrow_mut().clear();
        self.by_content.borrow_mut().clear();
    }
}
