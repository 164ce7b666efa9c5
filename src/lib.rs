//! OpenAPI to Effect Schema
//!
//! Compiles the schema definitions of an OpenAPI 3.1 document into TypeScript
//! modules built on `@effect/schema`.
//!
//! ## Features
//!
//! - **Reference Graph**: dependency trees, topological order, cycle detection
//! - **Code Generation**: one generator per schema shape, with caller hooks
//! - **Module Assembly**: one-to-one, bundled and custom module layouts
//! - **Generation Specs**: JSON or TOML files mapping modules to definitions
//!
//! ## Architecture
//!
//! ```text
//! OpenApiDocument ──► DefinitionTable ──► graph (order, cycles)
//!                                            │
//! GenerationSpec ──► assembly (strategy) ────┤
//!                         │                  ▼
//!                         └──────────► codegen (GenResult)
//!                                            │
//!                  Formatter ◄── compiler ◄──┘
//!                      │
//!                 ModuleWriter
//! ```

pub mod assembly;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod output;
pub mod pointer;
pub mod schema;

pub use assembly::{Directive, GeneratedModule, GenerationMethod, GenerationSpec, ModuleAssembler};
pub use codegen::{generate, GenResult, GenerationContext, GenerationHooks};
pub use compiler::{Compiler, GenerationReport, ModuleFailure};
pub use config::GeneratorConfig;
pub use document::OpenApiDocument;
pub use error::{Result, SchemaError};
pub use graph::{dependency_tree, topological_order, ReferenceGraph, TopologicalOrder};
pub use output::{BasicFormatter, CommandFormatter, Formatter, FsWriter, MemoryWriter, ModuleWriter};
pub use schema::{DefinitionId, DefinitionTable, SchemaNode, SchemaShape};
