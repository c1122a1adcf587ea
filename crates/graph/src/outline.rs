//! Per-file lexical outline.
//!
//! One pass over the syntax tree collects everything later stages need, so
//! the tree can be dropped before cross-file resolution starts:
//!
//! - a scope arena (module → class/function → nested function)
//! - raw definitions with code span, docstring and base-class references
//! - name bindings per scope (definitions, imports, assignments, parameters)
//! - call sites with the scope they are evaluated in
//!
//! Decorators, default argument values, annotations and base-class lists are
//! evaluated by Python in the enclosing scope and are recorded there.

use crate::module::ModuleName;
use coderag_parser::{docstring, ParsedSource};
use std::collections::HashSet;
use tree_sitter::Node;

pub type ScopeId = usize;

/// The module scope is always the first scope of an outline
pub const MODULE_SCOPE: ScopeId = 0;

/// Source position: 1-indexed line, 0-indexed byte column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    fn start(node: Node<'_>) -> Self {
        let point = node.start_position();
        Self::new(point.row + 1, point.column)
    }

    fn end(node: Node<'_>) -> Self {
        let point = node.end_position();
        Self::new(point.row + 1, point.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

/// What a bound name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// Index into [`SourceOutline::definitions`]
    Definition(usize),

    /// `import a.b as c` binds `c` to module `a.b`; `import a.b` binds `a`
    Module(String),

    /// `from m import n [as k]`, with relative module paths already made absolute
    ImportedName { module: String, name: String },

    /// Relative import that climbs above the top-level package
    Unresolvable,

    /// Parameter, assignment, loop variable and similar value bindings
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Where the binding takes effect
    pub position: Position,
    pub target: BindingTarget,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Module name for the module scope, definition id otherwise
    pub qualified_name: String,
    /// Definition that opens this scope
    pub definition: Option<usize>,
    pub bindings: Vec<Binding>,
    /// Names declared `global`
    pub globals: HashSet<String>,
    /// Names declared `nonlocal`
    pub nonlocals: HashSet<String>,
    /// Modules imported with `from m import *`
    pub wildcard_imports: Vec<String>,
}

impl Scope {
    fn new(
        kind: ScopeKind,
        parent: Option<ScopeId>,
        qualified_name: String,
        definition: Option<usize>,
    ) -> Self {
        Self {
            kind,
            parent,
            qualified_name,
            definition,
            bindings: Vec::new(),
            globals: HashSet::new(),
            nonlocals: HashSet::new(),
            wildcard_imports: Vec::new(),
        }
    }
}

/// Dotted reference made only of names and attribute accesses (`a.b.c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub head: String,
    pub attributes: Vec<String>,
}

impl Reference {
    /// Terminal identifier (`attr` in `module.attr`)
    #[must_use]
    pub fn terminal(&self) -> &str {
        self.attributes.last().unwrap_or(&self.head)
    }
}

/// Base-class expression of a class statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    pub name: String,
    pub reference: Reference,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// `f()`, `mod.f()`, `self.m()`
    Path(Reference),

    /// Complex callee (`f()()`, `xs[0].run()`) reduced to its head identifier
    Head(String),

    /// Nothing nameable (`(lambda: 0)()`, `"".join()`)
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Innermost scope the call is evaluated in
    pub scope: ScopeId,
    pub position: Position,
    pub callee: Callee,
}

/// Function or class declaration as found in the syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDefinition {
    pub name: String,
    pub qualified_name: String,
    /// `Class` or `Function`
    pub kind: ScopeKind,
    /// Scope the definition is declared in
    pub scope: ScopeId,
    /// Scope the definition opens
    pub body: ScopeId,
    pub line: usize,
    pub column: usize,
    pub code: String,
    pub docstring: String,
    pub bases: Vec<BaseRef>,
}

/// Lexical outline of one source file
#[derive(Debug, Clone)]
pub struct SourceOutline {
    /// Path relative to the project root
    pub file: String,
    pub module: ModuleName,
    pub scopes: Vec<Scope>,
    pub definitions: Vec<RawDefinition>,
    pub calls: Vec<CallSite>,
}

impl SourceOutline {
    /// Walk `parsed` once and collect its outline
    #[must_use]
    pub fn collect(parsed: &ParsedSource, file: impl Into<String>, module: ModuleName) -> Self {
        let module_scope = Scope::new(ScopeKind::Module, None, module.as_str().to_string(), None);
        let mut collector = Collector {
            parsed,
            outline: Self {
                file: file.into(),
                module,
                scopes: vec![module_scope],
                definitions: Vec::new(),
                calls: Vec::new(),
            },
            stack: Vec::new(),
        };

        collector.push_children(parsed.root(), MODULE_SCOPE);
        collector.run();
        collector.outline
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    #[must_use]
    pub fn module_scope(&self) -> &Scope {
        &self.scopes[MODULE_SCOPE]
    }

    /// Definition that opens `scope`, if any
    #[must_use]
    pub fn scope_definition(&self, scope: ScopeId) -> Option<&RawDefinition> {
        self.scopes[scope]
            .definition
            .map(|idx| &self.definitions[idx])
    }

    /// Scopes from `scope` outward to the module root
    pub fn scope_chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |&id| self.scopes[id].parent)
    }
}

struct Collector<'a> {
    parsed: &'a ParsedSource,
    outline: SourceOutline,
    stack: Vec<(Node<'a>, ScopeId)>,
}

impl<'a> Collector<'a> {
    fn run(&mut self) {
        while let Some((node, scope)) = self.stack.pop() {
            self.visit(node, scope);
        }
    }

    fn text(&self, node: Node<'a>) -> &'a str {
        self.parsed.text(node)
    }

    fn push(&mut self, node: Node<'a>, scope: ScopeId) {
        self.stack.push((node, scope));
    }

    /// Queue named children so they are visited in source order
    fn push_children(&mut self, node: Node<'a>, scope: ScopeId) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            self.push(child, scope);
        }
    }

    fn bind(&mut self, scope: ScopeId, name: &str, position: Position, target: BindingTarget) {
        self.outline.scopes[scope].bindings.push(Binding {
            name: name.to_string(),
            position,
            target,
        });
    }

    fn visit(&mut self, node: Node<'a>, scope: ScopeId) {
        match node.kind() {
            "function_definition" | "class_definition" => self.visit_definition(node, scope),
            "call" => {
                self.record_call(node, scope);
                self.push_children(node, scope);
            }
            "import_statement" => self.bind_import(node, scope),
            "import_from_statement" => self.bind_import_from(node, scope),
            "global_statement" | "nonlocal_statement" => {
                let names: Vec<String> = {
                    let mut cursor = node.walk();
                    node.named_children(&mut cursor)
                        .filter(|child| child.kind() == "identifier")
                        .map(|child| self.text(child).to_string())
                        .collect()
                };
                let target = &mut self.outline.scopes[scope];
                if node.kind() == "global_statement" {
                    target.globals.extend(names);
                } else {
                    target.nonlocals.extend(names);
                }
            }
            "assignment" | "augmented_assignment" | "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    let position = if node.kind() == "for_statement" {
                        Position::end(left)
                    } else {
                        Position::end(node)
                    };
                    self.bind_targets(left, scope, position);
                }
                self.push_children(node, scope);
            }
            "as_pattern" => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    self.bind_targets(alias, scope, Position::end(node));
                }
                self.push_children(node, scope);
            }
            "named_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind_targets(name, scope, Position::end(node));
                }
                self.push_children(node, scope);
            }
            "except_clause" => {
                self.bind_exception_alias(node, scope);
                self.push_children(node, scope);
            }
            _ => self.push_children(node, scope),
        }
    }

    fn visit_definition(&mut self, node: Node<'a>, scope: ScopeId) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.push_children(node, scope);
            return;
        };
        let name = self.text(name_node).to_string();
        let kind = if node.kind() == "class_definition" {
            ScopeKind::Class
        } else {
            ScopeKind::Function
        };

        let qualified_name = format!("{}.{}", self.outline.scopes[scope].qualified_name, name);
        let def_idx = self.outline.definitions.len();
        let body_scope = self.outline.scopes.len();
        self.outline.scopes.push(Scope::new(
            kind,
            Some(scope),
            qualified_name.clone(),
            Some(def_idx),
        ));

        let superclasses = node.child_by_field_name("superclasses");
        let bases = superclasses
            .map(|args| self.base_refs(args))
            .unwrap_or_default();

        let start = node.start_position();
        self.outline.definitions.push(RawDefinition {
            name: name.clone(),
            qualified_name,
            kind,
            scope,
            body: body_scope,
            line: start.row + 1,
            column: start.column,
            code: self.text(node).to_string(),
            docstring: docstring(node, self.parsed.source()).unwrap_or_default(),
            bases,
        });

        // The name is bound once the statement has executed
        self.bind(scope, &name, Position::end(node), BindingTarget::Definition(def_idx));

        if let Some(body) = node.child_by_field_name("body") {
            self.push_children(body, body_scope);
        }
        if let Some(parameters) = node.child_by_field_name("parameters") {
            self.visit_parameters(parameters, scope, body_scope);
        }
        for field in ["return_type", "type_parameters"] {
            if let Some(child) = node.child_by_field_name(field) {
                self.push(child, scope);
            }
        }
        if let Some(superclasses) = superclasses {
            self.push(superclasses, scope);
        }
    }

    /// Bind parameter names in the function scope; defaults and annotations
    /// belong to the enclosing scope.
    fn visit_parameters(&mut self, parameters: Node<'a>, outer: ScopeId, inner: ScopeId) {
        let mut cursor = parameters.walk();
        let params: Vec<_> = parameters.named_children(&mut cursor).collect();

        for param in params.into_iter().rev() {
            let position = Position::start(param);
            match param.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" | "tuple_pattern" => {
                    self.bind_targets(param, inner, position);
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        self.bind_targets(name, inner, position);
                    }
                    for field in ["value", "type"] {
                        if let Some(child) = param.child_by_field_name(field) {
                            self.push(child, outer);
                        }
                    }
                }
                "typed_parameter" => {
                    let annotation = param.child_by_field_name("type");
                    let mut param_cursor = param.walk();
                    let names: Vec<_> = param
                        .named_children(&mut param_cursor)
                        .filter(|child| Some(child.id()) != annotation.map(|a| a.id()))
                        .collect();
                    for name in names {
                        self.bind_targets(name, inner, position);
                    }
                    if let Some(annotation) = annotation {
                        self.push(annotation, outer);
                    }
                }
                _ => {}
            }
        }
    }

    /// Bind every plain name inside an assignment target
    fn bind_targets(&mut self, target: Node<'a>, scope: ScopeId, position: Position) {
        match target.kind() {
            "identifier" => {
                let name = self.text(target);
                self.bind(scope, name, position, BindingTarget::Local);
            }
            "as_pattern_target" if target.named_child_count() == 0 => {
                let name = self.text(target);
                self.bind(scope, name, position, BindingTarget::Local);
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
            | "expression_list" | "parenthesized_expression" | "as_pattern_target"
            | "list_splat_pattern" | "dictionary_splat_pattern" | "list_splat" => {
                let mut cursor = target.walk();
                let children: Vec<_> = target.named_children(&mut cursor).collect();
                for child in children {
                    self.bind_targets(child, scope, position);
                }
            }
            // attribute and subscript targets bind nothing
            _ => {}
        }
    }

    /// `except E as name:`
    fn bind_exception_alias(&mut self, node: Node<'a>, scope: ScopeId) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        let mut after_as = false;
        for child in children {
            if child.kind() == "as" {
                after_as = true;
            } else if after_as && child.is_named() {
                self.bind_targets(child, scope, Position::end(child));
                after_as = false;
            }
        }
    }

    fn bind_import(&mut self, node: Node<'a>, scope: ScopeId) {
        let position = Position::end(node);
        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();

        for name in names {
            match name.kind() {
                "dotted_name" => {
                    let dotted = self.dotted(name);
                    let head = dotted.split('.').next().unwrap_or_default().to_string();
                    self.bind(scope, &head, position, BindingTarget::Module(head.clone()));
                }
                "aliased_import" => {
                    let (Some(module), Some(alias)) = (
                        name.child_by_field_name("name"),
                        name.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    let module = self.dotted(module);
                    let alias = self.text(alias);
                    self.bind(scope, alias, position, BindingTarget::Module(module));
                }
                _ => {}
            }
        }
    }

    fn bind_import_from(&mut self, node: Node<'a>, scope: ScopeId) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let module = if module_node.kind() == "relative_import" {
            let mut cursor = module_node.walk();
            let mut level = 0;
            let mut tail = None;
            for child in module_node.named_children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => level = self.text(child).matches('.').count(),
                    "dotted_name" => tail = Some(self.dotted(child)),
                    _ => {}
                }
            }
            self.outline.module.resolve_relative(level, tail.as_deref())
        } else {
            Some(self.dotted(module_node))
        };

        let mut cursor = node.walk();
        let is_wildcard = node
            .named_children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import");
        if is_wildcard {
            if let Some(module) = module {
                self.outline.scopes[scope].wildcard_imports.push(module);
            }
            return;
        }

        let position = Position::end(node);
        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let (imported, local) = match name.kind() {
                "dotted_name" => {
                    let imported = self.dotted(name);
                    (imported.clone(), imported)
                }
                "aliased_import" => {
                    let (Some(imported), Some(alias)) = (
                        name.child_by_field_name("name"),
                        name.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    (self.dotted(imported), self.text(alias).to_string())
                }
                _ => continue,
            };

            let target = match &module {
                Some(module) => BindingTarget::ImportedName {
                    module: module.clone(),
                    name: imported,
                },
                None => BindingTarget::Unresolvable,
            };
            self.bind(scope, &local, position, target);
        }
    }

    /// `a . b . c` -> "a.b.c"
    fn dotted(&self, node: Node<'a>) -> String {
        if node.kind() == "identifier" {
            return self.text(node).to_string();
        }
        let mut cursor = node.walk();
        let parts: Vec<&str> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "identifier")
            .map(|child| self.text(child))
            .collect();
        parts.join(".")
    }

    fn base_refs(&self, arguments: Node<'a>) -> Vec<BaseRef> {
        let mut cursor = arguments.walk();
        arguments
            .named_children(&mut cursor)
            .filter(|arg| matches!(arg.kind(), "identifier" | "attribute"))
            .filter_map(|arg| {
                let reference = self.reference(arg)?;
                Some(BaseRef {
                    name: reference.terminal().to_string(),
                    reference,
                    position: Position::start(arg),
                })
            })
            .collect()
    }

    fn record_call(&mut self, node: Node<'a>, scope: ScopeId) {
        let callee = match node.child_by_field_name("function") {
            Some(function) => match self.reference(function) {
                Some(reference) => Callee::Path(reference),
                None => self
                    .head_identifier(function)
                    .map_or(Callee::Opaque, Callee::Head),
            },
            None => Callee::Opaque,
        };

        self.outline.calls.push(CallSite {
            scope,
            position: Position::start(node),
            callee,
        });
    }

    fn reference(&self, node: Node<'a>) -> Option<Reference> {
        match node.kind() {
            "identifier" => Some(Reference {
                head: self.text(node).to_string(),
                attributes: Vec::new(),
            }),
            "attribute" => {
                let mut reference = self.reference(node.child_by_field_name("object")?)?;
                let attribute = node.child_by_field_name("attribute")?;
                reference.attributes.push(self.text(attribute).to_string());
                Some(reference)
            }
            _ => None,
        }
    }

    fn head_identifier(&self, node: Node<'a>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(self.text(node).to_string()),
            "attribute" => self.head_identifier(node.child_by_field_name("object")?),
            "call" => self.head_identifier(node.child_by_field_name("function")?),
            "subscript" => self.head_identifier(node.child_by_field_name("value")?),
            _ => None,
        }
    }
}
