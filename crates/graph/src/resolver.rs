//! Name resolution for one file against the project index.
//!
//! Lookups follow Python's LEGB rule over the outline's scope chain:
//! class bodies are only visible to code directly inside them, `global` and
//! `nonlocal` declarations redirect the search, and builtins resolve to
//! nothing. Misses are `None`, never errors.

use crate::index::{ProjectIndex, Symbol};
use crate::outline::{
    Binding, BindingTarget, CallSite, Callee, Position, RawDefinition, Reference, ScopeId,
    ScopeKind, SourceOutline, MODULE_SCOPE,
};
use crate::types::{Call, SelfDispatch};

/// Knobs for call and base resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Receiver names treated as the enclosing class instance
    pub self_receivers: Vec<String>,

    /// Follow `module.attr` chains through project modules
    pub follow_module_attributes: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            self_receivers: vec!["self".to_string(), "cls".to_string()],
            follow_module_attributes: true,
        }
    }
}

pub struct Resolver<'a> {
    index: &'a ProjectIndex,
    outline: &'a SourceOutline,
    options: &'a ResolveOptions,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub const fn new(
        index: &'a ProjectIndex,
        outline: &'a SourceOutline,
        options: &'a ResolveOptions,
    ) -> Self {
        Self {
            index,
            outline,
            options,
        }
    }

    /// Resolve `name` as seen from `position` inside `scope`
    #[must_use]
    pub fn lookup(&self, name: &str, scope: ScopeId, position: Position) -> Option<Symbol> {
        let start = self.outline.scope(scope);

        if start.globals.contains(name) {
            return self.lookup_module_scope(name);
        }

        let (mut current, mut innermost) = if start.nonlocals.contains(name) {
            (start.parent, false)
        } else {
            (Some(scope), true)
        };

        while let Some(id) = current {
            let candidate = self.outline.scope(id);
            if id == MODULE_SCOPE {
                let binding = if innermost {
                    last_binding_at(&candidate.bindings, name, position)
                } else {
                    last_binding(&candidate.bindings, name)
                };
                return match binding {
                    Some(binding) => self.binding_symbol(binding),
                    None => self.lookup_wildcards(name),
                };
            }

            // Class bodies do not form an enclosing scope for nested code
            if innermost || candidate.kind != ScopeKind::Class {
                let binding = if innermost {
                    last_binding_at(&candidate.bindings, name, position)
                } else {
                    last_binding(&candidate.bindings, name)
                };
                if let Some(binding) = binding {
                    return self.binding_symbol(binding);
                }
            }

            innermost = false;
            current = candidate.parent;
        }

        None
    }

    fn lookup_module_scope(&self, name: &str) -> Option<Symbol> {
        match last_binding(&self.outline.module_scope().bindings, name) {
            Some(binding) => self.binding_symbol(binding),
            None => self.lookup_wildcards(name),
        }
    }

    fn lookup_wildcards(&self, name: &str) -> Option<Symbol> {
        self.outline
            .module_scope()
            .wildcard_imports
            .iter()
            .find_map(|module| self.index.resolve_member(module, name))
    }

    fn binding_symbol(&self, binding: &Binding) -> Option<Symbol> {
        match &binding.target {
            BindingTarget::Definition(idx) => Some(Symbol::Definition(
                self.outline.definitions[*idx].qualified_name.clone(),
            )),
            BindingTarget::Module(module) => self.index.module_symbol(module),
            BindingTarget::ImportedName { module, name } => self.index.resolve_member(module, name),
            BindingTarget::Unresolvable | BindingTarget::Local => None,
        }
    }

    /// Resolve a dotted reference. Resolution stops at the first symbol that
    /// is not a module.
    #[must_use]
    pub fn resolve_reference(
        &self,
        reference: &Reference,
        scope: ScopeId,
        position: Position,
    ) -> Option<Symbol> {
        let mut symbol = self.lookup(&reference.head, scope, position)?;
        if !self.options.follow_module_attributes {
            return Some(symbol);
        }

        for attribute in &reference.attributes {
            match symbol {
                Symbol::Module(module) => {
                    symbol = self.index.resolve_member(&module, attribute)?;
                }
                Symbol::Definition(_) => break,
            }
        }
        Some(symbol)
    }

    /// Class scope that lexically owns `scope`
    fn enclosing_class(&self, scope: ScopeId) -> Option<&'a str> {
        let outline = self.outline;
        outline
            .scope_chain(scope)
            .map(|id| outline.scope(id))
            .find(|scope| scope.kind == ScopeKind::Class)
            .map(|scope| scope.qualified_name.as_str())
    }

    fn self_dispatch(&self, reference: &Reference, scope: ScopeId) -> Option<SelfDispatch> {
        let [method] = reference.attributes.as_slice() else {
            return None;
        };
        if !self.options.self_receivers.iter().any(|r| *r == reference.head) {
            return None;
        }
        let class_id = self.enclosing_class(scope)?;
        Some(SelfDispatch {
            class_id: class_id.to_string(),
            method: method.clone(),
        })
    }

    /// Call relationship candidate for a call site. `None` for module-level
    /// calls, which have no caller definition.
    #[must_use]
    pub fn resolve_call(&self, call: &CallSite) -> Option<Call> {
        let caller = self.outline.scope_definition(call.scope)?;

        let (candidate_id, dispatch) = match &call.callee {
            Callee::Path(reference) => match self.self_dispatch(reference, call.scope) {
                Some(dispatch) => (
                    Some(format!("{}.{}", dispatch.class_id, dispatch.method)),
                    Some(dispatch),
                ),
                None => (
                    definition_id(self.resolve_reference(reference, call.scope, call.position)),
                    None,
                ),
            },
            Callee::Head(head) => (
                definition_id(self.lookup(head, call.scope, call.position)),
                None,
            ),
            Callee::Opaque => (None, None),
        };

        Some(Call {
            caller_id: caller.qualified_name.clone(),
            candidate_id,
            dispatch,
        })
    }

    /// Resolved base-class ids in declaration order; misses are omitted
    #[must_use]
    pub fn resolve_bases(&self, definition: &RawDefinition) -> Vec<String> {
        definition
            .bases
            .iter()
            .filter_map(|base| {
                let symbol = self.resolve_reference(&base.reference, definition.scope, base.position);
                if symbol.is_none() {
                    log::debug!(
                        "Unresolved base {} of {}",
                        base.name,
                        definition.qualified_name
                    );
                }
                definition_id(symbol)
            })
            .collect()
    }
}

fn definition_id(symbol: Option<Symbol>) -> Option<String> {
    match symbol? {
        Symbol::Definition(id) => Some(id),
        Symbol::Module(_) => None,
    }
}

fn last_binding<'b>(bindings: &'b [Binding], name: &str) -> Option<&'b Binding> {
    bindings
        .iter()
        .filter(|binding| binding.name == name)
        .max_by_key(|binding| binding.position)
}

/// Latest binding in effect at `position`, else the latest one overall
fn last_binding_at<'b>(bindings: &'b [Binding], name: &str, position: Position) -> Option<&'b Binding> {
    bindings
        .iter()
        .filter(|binding| binding.name == name && binding.position <= position)
        .max_by_key(|binding| binding.position)
        .or_else(|| last_binding(bindings, name))
}
