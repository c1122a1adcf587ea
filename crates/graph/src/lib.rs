//! # coderag graph
//!
//! Definition graph of a Python code base: functions, methods and classes
//! as nodes, `nested_in`, `call` and `inherits_from` as edges.
//!
//! ## Architecture
//!
//! ```text
//! ParsedSource (per file)
//!     │
//!     ├──> SourceOutline::collect
//!     │      └─ scopes, bindings, definitions, call sites
//!     │
//!     ├──> ProjectIndex::build (all outlines, package inits included)
//!     │      └─ module exports, re-exports, wildcards, submodules
//!     │
//!     ├──> analyze (per file, read-only index)
//!     │      ├─ Resolver: LEGB lookup, imports, self-calls, bases
//!     │      └─ FileGraph { definitions, calls }
//!     │
//!     └──> derive (merged FileGraphs)
//!            ├─ nodes, kind reconciliation
//!            ├─ nested_in / inherits_from / call edges
//!            └─ inherited self-call dispatch (C3 MRO)
//! ```
//!
//! The resulting [`CodeGraph`] answers caller/callee/base/subclass queries and
//! can be published to any [`GraphSink`].

mod deriver;
mod error;
mod export;
mod extractor;
mod graph;
mod index;
mod module;
mod mro;
mod outline;
mod resolver;
mod types;

pub use deriver::{derive, DeriveOptions};
pub use error::{GraphError, Result};
pub use export::{
    embedding_plan, publish, CypherSink, EdgeRecord, GraphSink, GraphSnapshot, JsonSink,
    COMMON_LABEL, EMBEDDING_PROPERTY, VECTOR_DIMENSIONS, VECTOR_INDEX_NAME,
};
pub use extractor::{analyze, FileGraph};
pub use graph::Neighbor;
pub use index::{ProjectIndex, Symbol};
pub use module::ModuleName;
pub use mro::{c3_linearization, depth_first_order, method_resolution_order, Hierarchy, MroError};
pub use outline::{
    BaseRef, Binding, BindingTarget, CallSite, Callee, Position, RawDefinition, Reference, Scope,
    ScopeId, ScopeKind, SourceOutline, MODULE_SCOPE,
};
pub use resolver::{ResolveOptions, Resolver};
pub use types::{Call, CodeGraph, Definition, DefinitionKind, Relation, SelfDispatch};
