//! Generation Strategies
//!
//! Derive the effective module layout from the generation method:
//! - one-to-one: a module per definition, spec modules override by path
//! - bundled: a module per definition in topological order, concatenated into one file
//! - custom: the generation spec's modules as written

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use super::spec::{Directive, GenerationMethod, GenerationSpec, ModulePath, ModuleSpec};
use super::{GeneratedModule, LIBRARY_IMPORTS};
use crate::graph::TopologicalOrder;
use crate::schema::DefinitionTable;

/// Default module path of a definition
pub fn module_path_for(id: &str) -> ModulePath {
    format!("./{id}.ts")
}

/// The generation spec with modules filled in for its generation method
pub fn resolve_modules(spec: &GenerationSpec, table: &DefinitionTable, order: &TopologicalOrder) -> GenerationSpec {
    let modules = match &spec.generation_method {
        GenerationMethod::OneToOne { .. } => {
            let mut modules: IndexMap<ModulePath, ModuleSpec> = table
                .keys()
                .map(|id| {
                    let module = ModuleSpec { definitions: vec![Directive::generate(id.clone())] };
                    (module_path_for(id), module)
                })
                .collect();
            for (path, module) in &spec.modules {
                modules.insert(path.clone(), module.clone());
            }
            modules
        }
        GenerationMethod::Bundled { .. } => order
            .entries()
            .iter()
            .map(|entry| {
                let path = module_path_for(&entry.id);
                let mut directive = spec
                    .modules
                    .get(&path)
                    .and_then(|module| {
                        module.definitions.iter().find(|d| {
                            matches!(d, Directive::GenerateFromSource { .. }) && d.target_id() == entry.id
                        })
                    })
                    .cloned()
                    .unwrap_or_else(|| Directive::generate(entry.id.clone()));
                if let Directive::GenerateFromSource { lazy, .. } = &mut directive {
                    *lazy = entry.circular;
                }
                (path, ModuleSpec { definitions: vec![directive] })
            })
            .collect(),
        GenerationMethod::Custom => spec.modules.clone(),
    };

    GenerationSpec {
        modules,
        ..spec.clone()
    }
}

/// `index.ts` re-exporting every module
pub fn barrel_file(spec: &GenerationSpec) -> String {
    let mut out = String::new();
    for path in spec.all_modules().keys() {
        out.push_str(&format!("export * from '{path}';\n"));
    }
    out
}

pub fn bundle_header(title: &str, version: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "/* Generated on {} from {title} version {version} */",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Concatenate modules into a single source file
pub fn assemble_bundle(header: Option<&str>, modules: &[GeneratedModule]) -> String {
    let mut out = String::new();
    if let Some(header) = header {
        out.push_str(header);
        out.push_str("\n\n");
    }
    out.push_str(LIBRARY_IMPORTS);
    for module in modules {
        let part = module.render_bundled();
        if !part.trim().is_empty() {
            out.push_str("\n\n");
            out.push_str(&part);
        }
    }
    out.push('\n');
    out
}
