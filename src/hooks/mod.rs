//! Hook registry.
//!
//! Ordered registration and scoped lookup of pre-hooks, post-hooks and
//! context processors. A hook is registered under an explicit scope:
//! `Scope::Global` applies to every request, `Scope::Module(name)` only
//! to requests whose matched route carries that module.
//!
//! Invocation order (documented and tested, not inferred): pre-hooks and
//! context processors run global entries first, then module entries;
//! post-hooks run module entries first, then global entries. Within a
//! scope, registration order is invocation order. There is no removal.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::HttpError;
use crate::http::{Payload, Response};

/// Where a hook applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Module(String),
}

impl Scope {
    fn applies_to(&self, module: Option<&str>) -> bool {
        match self {
            Self::Global => true,
            Self::Module(name) => module == Some(name.as_str()),
        }
    }

    fn is_global(&self) -> bool {
        *self == Self::Global
    }
}

/// Runs before routing/handler execution. A `Some` payload short-circuits
/// the rest of the pipeline and becomes the response.
pub type BeforeHook = Box<dyn Fn() -> Result<Option<Payload>, HttpError> + Send + Sync>;

/// Runs after the response is built; receives and returns the (possibly
/// replaced) response.
pub type AfterHook = Box<dyn Fn(Response) -> Response + Send + Sync>;

/// Produces extra template variables for rendering.
pub type ContextProcessor = Box<dyn Fn() -> HashMap<String, Value> + Send + Sync>;

/// Ordered, scope-keyed hook storage. Built during setup, read-only
/// while serving.
#[derive(Default)]
pub struct HookRegistry {
    before: Vec<(Scope, BeforeHook)>,
    after: Vec<(Scope, AfterHook)>,
    processors: Vec<(Scope, ContextProcessor)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_before(&mut self, scope: Scope, hook: BeforeHook) {
        self.before.push((scope, hook));
    }

    pub fn add_after(&mut self, scope: Scope, hook: AfterHook) {
        self.after.push((scope, hook));
    }

    pub fn add_processor(&mut self, scope: Scope, processor: ContextProcessor) {
        self.processors.push((scope, processor));
    }

    /// Pre-hooks for a request in `module`: global first, then module.
    pub fn before_for<'a>(
        &'a self,
        module: Option<&'a str>,
    ) -> impl Iterator<Item = &'a BeforeHook> + 'a {
        Self::global_then_module(&self.before, module)
    }

    /// Post-hooks for a request in `module`: module first, then global.
    pub fn after_for<'a>(
        &'a self,
        module: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AfterHook> + 'a {
        let module_entries = self
            .after
            .iter()
            .filter(move |(scope, _)| !scope.is_global() && scope.applies_to(module));
        let global_entries = self.after.iter().filter(|(scope, _)| scope.is_global());
        module_entries.chain(global_entries).map(|(_, hook)| hook)
    }

    /// Context processors for a request in `module`: global first, then
    /// module.
    pub fn processors_for<'a>(
        &'a self,
        module: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ContextProcessor> + 'a {
        Self::global_then_module(&self.processors, module)
    }

    fn global_then_module<'a, T>(
        entries: &'a [(Scope, T)],
        module: Option<&'a str>,
    ) -> impl Iterator<Item = &'a T> + 'a {
        let global_entries = entries.iter().filter(|(scope, _)| scope.is_global());
        let module_entries = entries
            .iter()
            .filter(move |(scope, _)| !scope.is_global() && scope.applies_to(module));
        global_entries.chain(module_entries).map(|(_, hook)| hook)
    }
}
