//! Run Orchestration
//!
//! Drives one generation run: module layout, generation, formatting and
//! writing. One-to-one and custom runs are best-effort per module; bundled
//! runs are all-or-nothing.

use chrono::{DateTime, Utc};

use crate::assembly::{
    assemble_bundle, barrel_file, bundle_header, module_path_for, resolve_modules, GenerationMethod, GenerationSpec,
    ModuleAssembler, ModulePath,
};
use crate::codegen::GenerationHooks;
use crate::document::OpenApiDocument;
use crate::error::Result;
use crate::graph::{topological_order, TopologicalOrder};
use crate::output::{Formatter, ModuleWriter};

/// Module path of the barrel file
pub const BARREL_MODULE: &str = "./index.ts";

/// A module that could not be generated, formatted or written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    pub module: ModulePath,
    pub error: String,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub written: Vec<ModulePath>,
    pub failed: Vec<ModuleFailure>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Compiler {
    /// Replaces the hooks described by the generation spec file
    hooks: Option<GenerationHooks>,
    bundle_header: bool,
    /// Fixed bundle timestamp; the current time when unset
    generated_at: Option<DateTime<Utc>>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            hooks: None,
            bundle_header: true,
            generated_at: None,
        }
    }

    pub fn with_hooks(mut self, hooks: GenerationHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_bundle_header(mut self, enabled: bool) -> Self {
        self.bundle_header = enabled;
        self
    }

    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Generate, format and write every module of `spec` for `document`
    pub fn run(
        &self,
        document: &OpenApiDocument,
        spec: &GenerationSpec,
        formatter: &dyn Formatter,
        writer: &mut dyn ModuleWriter,
    ) -> Result<GenerationReport> {
        let table = &document.definitions;
        tracing::info!(
            "Generating {} definitions from {} version {}",
            table.len(),
            document.title,
            document.version
        );

        let hooks = self.hooks.clone().unwrap_or_else(|| spec.build_hooks());

        let report = match &spec.generation_method {
            GenerationMethod::Bundled { bundle_name } => {
                let order = topological_order(table)?;
                let circular = order.entries().iter().filter(|e| e.circular).count();
                tracing::debug!("Topological order: {} definitions, {} circular", order.len(), circular);

                let resolved = resolve_modules(spec, table, &order);
                self.run_bundled(document, &resolved, &hooks, &order, bundle_name, formatter, writer)?
            }
            GenerationMethod::OneToOne { generate_barrel_file } => {
                let resolved = resolve_modules(spec, table, &TopologicalOrder::default());
                self.run_modules(document, &resolved, &hooks, *generate_barrel_file, formatter, writer)
            }
            GenerationMethod::Custom => self.run_modules(document, spec, &hooks, false, formatter, writer),
        };

        tracing::info!(
            "Generation finished: {} written, {} failed",
            report.written.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn run_modules(
        &self,
        document: &OpenApiDocument,
        spec: &GenerationSpec,
        hooks: &GenerationHooks,
        generate_barrel: bool,
        formatter: &dyn Formatter,
        writer: &mut dyn ModuleWriter,
    ) -> GenerationReport {
        let assembler = ModuleAssembler::new(&document.definitions, spec, hooks);
        let mut report = GenerationReport::default();

        for path in spec.all_modules().keys() {
            let outcome = assembler
                .generate_module(path)
                .and_then(|module| emit(path, &module.render(), formatter, writer));
            record(&mut report, path, outcome);
        }

        if generate_barrel {
            let outcome = emit(BARREL_MODULE, &barrel_file(spec), formatter, writer);
            record(&mut report, BARREL_MODULE, outcome);
        }

        report
    }

    #[allow(clippy::too_many_arguments)]
    fn run_bundled(
        &self,
        document: &OpenApiDocument,
        spec: &GenerationSpec,
        hooks: &GenerationHooks,
        order: &TopologicalOrder,
        bundle_name: &str,
        formatter: &dyn Formatter,
        writer: &mut dyn ModuleWriter,
    ) -> Result<GenerationReport> {
        let assembler = ModuleAssembler::new(&document.definitions, spec, hooks).with_order(order);

        // Every module must generate before anything is written
        let modules = spec
            .all_modules()
            .keys()
            .map(|path| assembler.generate_module(path))
            .collect::<Result<Vec<_>>>()?;

        let header = self.bundle_header.then(|| {
            bundle_header(
                &document.title,
                &document.version,
                self.generated_at.unwrap_or_else(Utc::now),
            )
        });
        let bundle = assemble_bundle(header.as_deref(), &modules);

        let path = module_path_for(bundle_name);
        emit(&path, &bundle, formatter, writer)?;
        tracing::info!("Generated bundle {} ({} modules)", path, modules.len());

        Ok(GenerationReport { written: vec![path], failed: Vec::new() })
    }
}

fn emit(path: &str, code: &str, formatter: &dyn Formatter, writer: &mut dyn ModuleWriter) -> Result<()> {
    let formatted = formatter.format(code).map_err(|e| e.in_module(path))?;
    writer.write(path, &formatted).map_err(|e| e.in_module(path))
}

fn record(report: &mut GenerationReport, path: &str, outcome: Result<()>) {
    match outcome {
        Ok(()) => {
            tracing::debug!("Generated {}", path);
            report.written.push(path.to_string());
        }
        Err(e) => {
            tracing::error!("{}", e);
            report.failed.push(ModuleFailure { module: path.to_string(), error: e.to_string() });
        }
    }
}
