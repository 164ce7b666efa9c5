//! Module Assembly
//!
//! Turns a generation spec into TypeScript module sources.
//!
//! Architecture:
//! - GenerationSpec (`spec`): which module exports which definitions
//! - ExportIndex: reverse lookup definition → exporting module, built once per run
//! - ModuleAssembler: generates one module at a time from its directives
//! - Strategies (`strategy`): derive the effective module layout per generation method

pub mod fields;
pub mod imports;
pub mod spec;
pub mod strategy;

pub use fields::reorder_fields;
pub use imports::{compare_imports, relative_module_path, render_imports, ImportKind, ImportSpec};
pub use spec::{
    Directive, FieldGroup, FieldGroups, FieldSpec, GenerationMethod, GenerationSpec, HooksSpec, ModulePath,
    ModuleSpec,
};
pub use strategy::{assemble_bundle, barrel_file, bundle_header, module_path_for, resolve_modules};

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::codegen::{encode_identifier, generate, GenResult, GenerationContext, GenerationHooks, ReferenceOrdering};
use crate::error::{Result, SchemaError};
use crate::graph::TopologicalOrder;
use crate::schema::{DefinitionId, DefinitionTable};

/// Library imports every module starts with
pub const LIBRARY_IMPORTS: &str = "import { pipe, Option } from 'effect';\nimport { Schema as S } from '@effect/schema';";

/// Trailing comment that keeps a literal import line in bundled output
pub const RUNTIME_IMPORT_MARKER: &str = "// <runtime>";

// =============================================================================
// Export Index
// =============================================================================

/// Where a definition is exported
#[derive(Debug, Clone, Copy)]
pub struct ExportLocator<'s> {
    pub module: &'s str,
    pub directive: &'s Directive,
    pub runtime: bool,
}

/// Source definition id → first directive exporting it, across all modules
#[derive(Debug, Default)]
pub struct ExportIndex<'s> {
    exports: HashMap<&'s str, ExportLocator<'s>>,
}

impl<'s> ExportIndex<'s> {
    pub fn build(spec: &'s GenerationSpec) -> Self {
        let mut exports = HashMap::new();
        for (path, module) in spec.all_modules() {
            let runtime = spec.is_runtime_module(path);
            for directive in &module.definitions {
                exports.entry(directive.source_id()).or_insert(ExportLocator {
                    module: path.as_str(),
                    directive,
                    runtime,
                });
            }
        }
        Self { exports }
    }

    pub fn locate(&self, source_id: &str) -> Option<&ExportLocator<'s>> {
        self.exports.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

// =============================================================================
// Generated Module
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub path: ModulePath,
    /// Sorted: runtime, definitions, missing markers
    pub imports: Vec<ImportSpec>,
    /// Exports in directive order
    pub body: String,
}

impl GeneratedModule {
    /// Complete module source (unformatted)
    pub fn render(&self) -> String {
        let mut out = String::from(LIBRARY_IMPORTS);
        out.push_str("\n\n");
        if !self.imports.is_empty() {
            out.push_str(&render_imports(&self.imports));
            out.push_str("\n\n");
        }
        out.push_str(&self.body);
        out.push('\n');
        out
    }

    /// Module source for inclusion in a bundle: imports are dropped except
    /// missing markers and literal lines tagged with [`RUNTIME_IMPORT_MARKER`].
    pub fn render_bundled(&self) -> String {
        let missing: Vec<ImportSpec> = self.imports.iter().filter(|i| i.is_missing()).cloned().collect();
        let body = strip_imports(&self.body);
        if missing.is_empty() {
            body
        } else {
            format!("{}\n{body}", render_imports(&missing))
        }
    }
}

fn import_statement() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^[ \t]*import [^;]+;([^\n]*)(\n?)").expect("import statement pattern"))
}

/// Remove import statements unless tagged as runtime imports.
///
/// Statements may span several lines and use either quote style. Code following
/// the `;` on the same line is kept.
pub fn strip_imports(code: &str) -> String {
    import_statement()
        .replace_all(code, |caps: &Captures| {
            let tail = caps[1].trim();
            if tail == RUNTIME_IMPORT_MARKER {
                caps[0].to_string()
            } else if tail.is_empty() {
                String::new()
            } else {
                format!("{tail}{}", &caps[2])
            }
        })
        .into_owned()
}

// =============================================================================
// Module Assembler
// =============================================================================

/// Generates module sources for one run
pub struct ModuleAssembler<'a> {
    table: &'a DefinitionTable,
    spec: &'a GenerationSpec,
    hooks: &'a GenerationHooks,
    exports: ExportIndex<'a>,
    /// Set in bundled mode; references to later definitions are deferred
    order: Option<&'a TopologicalOrder>,
}

impl<'a> ModuleAssembler<'a> {
    pub fn new(table: &'a DefinitionTable, spec: &'a GenerationSpec, hooks: &'a GenerationHooks) -> Self {
        Self {
            table,
            spec,
            hooks,
            exports: ExportIndex::build(spec),
            order: None,
        }
    }

    pub fn with_order(mut self, order: &'a TopologicalOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn exports(&self) -> &ExportIndex<'a> {
        &self.exports
    }

    /// Generate the module at `module_path`
    pub fn generate_module(&self, module_path: &str) -> Result<GeneratedModule> {
        let spec: &'a GenerationSpec = self.spec;
        let module = spec
            .module(module_path)
            .ok_or_else(|| SchemaError::ModuleNotFound(module_path.to_string()))?;

        let local: HashSet<&str> = module.definitions.iter().map(Directive::source_id).collect();

        let mut refs: IndexSet<DefinitionId> = IndexSet::new();
        let mut sections = Vec::with_capacity(module.definitions.len());
        for directive in &module.definitions {
            let (code, directive_refs) = self
                .generate_directive(directive)
                .map_err(|e| e.in_module(module_path))?;
            refs.extend(directive_refs);
            sections.push(code);
        }

        let mut imports: Vec<ImportSpec> = refs
            .iter()
            .filter(|id| !local.contains(id.as_str()))
            .filter_map(|id| self.import_for(module_path, id))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        imports.sort_by(compare_imports);

        Ok(GeneratedModule {
            path: module_path.to_string(),
            imports,
            body: sections.join("\n\n"),
        })
    }

    fn import_for(&self, module_path: &str, id: &str) -> Option<ImportSpec> {
        match self.exports.locate(id) {
            None => Some(ImportSpec::missing(id)),
            Some(export) if export.module == module_path => None,
            Some(export) => {
                let kind = if export.runtime { ImportKind::Runtime } else { ImportKind::Definition };
                Some(ImportSpec::new(
                    kind,
                    encode_identifier(export.directive.target_id()),
                    encode_identifier(id),
                    relative_module_path(module_path, export.module),
                ))
            }
        }
    }

    fn context(&self, current: &'a str) -> GenerationContext<'a> {
        let ctx = GenerationContext::new(self.table, self.hooks);
        match self.order {
            Some(order) => ctx.with_ordering(ReferenceOrdering::Topological { order, current }),
            None => ctx,
        }
    }

    fn generate_directive(&self, directive: &'a Directive) -> Result<(String, IndexSet<DefinitionId>)> {
        match directive {
            Directive::Literal { code, .. } => Ok((code.clone(), IndexSet::new())),

            Directive::CustomSchema {
                schema_id,
                schema,
                lazy,
                type_declaration,
                type_declaration_encoded,
            } => {
                let result = generate(&self.context(directive.source_id()), schema)?;
                warn_if_undeclared(schema_id, *lazy, type_declaration.as_deref());
                let code = render_custom_schema(
                    schema_id,
                    &result,
                    type_declaration.as_deref(),
                    type_declaration_encoded.as_deref(),
                );
                Ok((code, result.refs))
            }

            Directive::GenerateFromSource {
                schema_id,
                lazy,
                type_declaration,
                type_declaration_encoded,
                fields,
                ..
            } => {
                let source_id = directive.source_id();
                let node = self.table.get(source_id).ok_or_else(|| SchemaError::missing(source_id))?;
                let node = match fields {
                    Some(groups) => Cow::Owned(reorder_fields(groups, node)?),
                    None => Cow::Borrowed(node),
                };

                let result = generate(&self.context(source_id), &node)?;
                warn_if_undeclared(schema_id, *lazy, type_declaration.as_deref());
                let code = render_generated_schema(
                    source_id,
                    schema_id,
                    &result,
                    type_declaration.as_deref(),
                    type_declaration_encoded.as_deref(),
                );
                Ok((code, result.refs))
            }
        }
    }
}

fn warn_if_undeclared(schema_id: &str, lazy: bool, type_declaration: Option<&str>) {
    if lazy && type_declaration.is_none() {
        tracing::warn!(
            "Circular definition {} has no type declaration; deferred references to it will not type-check",
            schema_id
        );
    }
}

// =============================================================================
// Export Rendering
// =============================================================================

fn push_with_inline(lines: &mut Vec<String>, line: String, inline: &str) {
    if inline.is_empty() {
        lines.push(line);
    } else {
        lines.push(format!("{line} {inline}"));
    }
}

fn render_generated_schema(
    source_id: &str,
    target_id: &str,
    result: &GenResult,
    type_declaration: Option<&str>,
    type_declaration_encoded: Option<&str>,
) -> String {
    let name = encode_identifier(target_id);
    let (block, inline) = result.docs.to_comments();

    let mut lines = vec![format!("/* {name} */")];
    if !block.is_empty() {
        lines.push(block);
    }
    if source_id != target_id {
        lines.push(format!("// Generated from OpenAPI `{source_id}` schema"));
    }

    // Declared types back the `_Name`/`_NameEncoded` aliases used by deferred references
    let annotation = match (type_declaration, type_declaration_encoded) {
        (Some(decl), Some(encoded)) => {
            lines.push(format!("type _{name} = {decl};"));
            lines.push(format!("type _{name}Encoded = {encoded};"));
            format!(": S.Schema<_{name}, _{name}Encoded>")
        }
        (Some(decl), None) => {
            lines.push(format!("type _{name} = {decl};"));
            format!(": S.Schema<_{name}>")
        }
        (None, _) => String::new(),
    };

    let identifier = Value::String(target_id.to_string());
    push_with_inline(
        &mut lines,
        format!(
            "export const {name}{annotation} = {}.annotations({{ identifier: {identifier} }});",
            result.code
        ),
        &inline,
    );

    match type_declaration {
        Some(_) => lines.push(format!("export type {name} = _{name};")),
        None => lines.push(format!("export type {name} = S.Schema.Type<typeof {name}>;")),
    }
    match (type_declaration, type_declaration_encoded) {
        (Some(_), Some(_)) => lines.push(format!("export type {name}Encoded = _{name}Encoded;")),
        _ => lines.push(format!("export type {name}Encoded = S.Schema.Encoded<typeof {name}>;")),
    }

    lines.join("\n")
}

fn render_custom_schema(
    target_id: &str,
    result: &GenResult,
    type_declaration: Option<&str>,
    type_declaration_encoded: Option<&str>,
) -> String {
    let name = encode_identifier(target_id);
    let (block, inline) = result.docs.to_comments();

    let mut lines = Vec::new();
    if !block.is_empty() {
        lines.push(block);
    }
    push_with_inline(&mut lines, format!("export const {name} = {};", result.code), &inline);

    match type_declaration {
        Some(decl) => lines.push(format!("export type {name} = {decl};")),
        None => lines.push(format!("export type {name} = S.Schema.Type<typeof {name}>;")),
    }
    match type_declaration_encoded {
        Some(encoded) => lines.push(format!("export type {name}Encoded = {encoded};")),
        None => lines.push(format!("export type {name}Encoded = S.Schema.Encoded<typeof {name}>;")),
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::topological_order;
    use crate::schema::{PrimitiveKind, SchemaNode};
    use serde_json::json;

    fn table() -> DefinitionTable {
        let mut table = DefinitionTable::new();
        table.insert(
            "Category".into(),
            SchemaNode::object([("name", SchemaNode::primitive(PrimitiveKind::String))], &["name"]),
        );
        table.insert(
            "Pet".into(),
            SchemaNode::object(
                [
                    ("name", SchemaNode::primitive(PrimitiveKind::String)),
                    ("category", SchemaNode::reference("Category")),
                    ("owner", SchemaNode::reference("Owner")),
                ],
                &["name"],
            )
            .with_description("A pet"),
        );
        table
    }

    fn spec(value: serde_json::Value) -> GenerationSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_module_with_imports_and_missing_marker() {
        let table = table();
        let spec = spec(json!({
            "generation_method": { "method": "custom" },
            "modules": {
                "./Category.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Category" }] },
                "./models/Pet.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Pet" }] },
            }
        }));
        let hooks = GenerationHooks::new();
        let assembler = ModuleAssembler::new(&table, &spec, &hooks);

        let module = assembler.generate_module("./models/Pet.ts").unwrap();
        let imports: Vec<String> = module.imports.iter().map(ImportSpec::render).collect();
        assert_eq!(imports, vec!["import { Category } from '../Category.ts';", "// MISSING Owner"]);

        assert_eq!(
            module.body,
            "/* Pet */\n\
             /** A pet */\n\
             export const Pet = S.Struct({\n\
             name: S.String,\n\
             category: S.optional(Category),\n\
             owner: S.optional(Owner),\n\
             }).annotations({ identifier: \"Pet\" });\n\
             export type Pet = S.Schema.Type<typeof Pet>;\n\
             export type PetEncoded = S.Schema.Encoded<typeof Pet>;"
        );

        let rendered = module.render();
        assert!(rendered.starts_with(LIBRARY_IMPORTS));
        assert!(rendered.contains("import { Category } from '../Category.ts';\n// MISSING Owner\n\n/* Pet */"));
    }

    #[test]
    fn test_unknown_module() {
        let table = table();
        let spec = GenerationSpec::default();
        let hooks = GenerationHooks::new();
        let err = ModuleAssembler::new(&table, &spec, &hooks).generate_module("./Nope.ts").unwrap_err();
        assert!(matches!(err, SchemaError::ModuleNotFound(ref m) if m == "./Nope.ts"));
    }

    #[test]
    fn test_renamed_export_and_aliased_import() {
        let table = table();
        let spec = spec(json!({
            "modules": {
                "./Category.ts": { "definitions": [
                    { "action": "generate-schema", "schema_id": "CategorySchema", "source_schema_id": "Category" }
                ] },
                "./Pet.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Pet" }] },
            }
        }));
        let hooks = GenerationHooks::new();
        let assembler = ModuleAssembler::new(&table, &spec, &hooks);

        let category = assembler.generate_module("./Category.ts").unwrap();
        assert!(category.body.contains("// Generated from OpenAPI `Category` schema"));
        assert!(category.body.contains("export const CategorySchema = S.Struct"));

        let pet = assembler.generate_module("./Pet.ts").unwrap();
        assert_eq!(pet.imports[0].render(), "import { CategorySchema as Category } from './Category.ts';");
    }

    #[test]
    fn test_runtime_imports_first_and_literal_code() {
        let mut table = table();
        let mut when = crate::schema::PrimitiveShape::new(PrimitiveKind::String);
        when.format = Some("date".into());
        table.insert(
            "Visit".into(),
            SchemaNode::object(
                [
                    ("pet", SchemaNode::reference("Pet")),
                    ("when", SchemaNode::new(crate::schema::SchemaShape::Primitive(when))),
                ],
                &["pet", "when"],
            ),
        );

        let spec = spec(json!({
            "hooks": { "rules": [{ "kind": "string", "format": "date", "code": "DateOnly", "refs": ["DateOnly"] }] },
            "runtime": {
                "./util/date.ts": { "definitions": [
                    { "action": "custom-code", "schema_id": "DateOnly", "code": "export const DateOnly = S.String;" }
                ] }
            },
            "modules": {
                "./Pet.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Pet" }] },
                "./Visit.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Visit" }] },
            }
        }));
        let hooks = spec.build_hooks();
        let assembler = ModuleAssembler::new(&table, &spec, &hooks);

        let visit = assembler.generate_module("./Visit.ts").unwrap();
        let imports: Vec<String> = visit.imports.iter().map(ImportSpec::render).collect();
        assert_eq!(
            imports,
            vec!["import { DateOnly } from './util/date.ts';", "import { Pet } from './Pet.ts';"]
        );
        assert!(visit.body.contains("when: DateOnly,"));

        let util = assembler.generate_module("./util/date.ts").unwrap();
        assert_eq!(util.body, "export const DateOnly = S.String;");
        assert!(util.imports.is_empty());
    }

    #[test]
    fn test_field_ordering_applied() {
        let table = table();
        let spec = spec(json!({
            "modules": { "./Pet.ts": { "definitions": [{
                "action": "generate-schema", "schema_id": "Pet",
                "fields": { "// Main": { "category, name": {} } }
            }] } }
        }));
        let hooks = GenerationHooks::new();
        let module = ModuleAssembler::new(&table, &spec, &hooks).generate_module("./Pet.ts").unwrap();
        assert!(module.body.contains("S.Struct({\n// Main\ncategory: S.optional(Category),\nname: S.String,\n})"));
        // `owner` dropped; `Category` is exported by no module here
        assert_eq!(module.imports, vec![ImportSpec::missing("Category")]);
    }

    #[test]
    fn test_type_declaration_annotates_export() {
        let mut table = DefinitionTable::new();
        table.insert(
            "Node".into(),
            SchemaNode::object([("next", SchemaNode::reference("Node"))], &[]),
        );
        let spec = spec(json!({
            "modules": { "./Node.ts": { "definitions": [{
                "action": "generate-schema", "schema_id": "Node", "lazy": true,
                "type_declaration": "{ readonly next?: _Node }",
                "type_declaration_encoded": "{ readonly next?: _NodeEncoded }",
            }] } }
        }));
        let hooks = GenerationHooks::new();
        let order = topological_order(&table).unwrap();
        let assembler = ModuleAssembler::new(&table, &spec, &hooks).with_order(&order);

        let module = assembler.generate_module("./Node.ts").unwrap();
        assert!(module.body.contains("type _Node = { readonly next?: _Node };"));
        assert!(module.body.contains("type _NodeEncoded = { readonly next?: _NodeEncoded };"));
        assert!(module.body.contains("export const Node: S.Schema<_Node, _NodeEncoded> = S.Struct({"));
        assert!(module.body.contains("next: S.optional(S.suspend((): S.Schema<_Node, _NodeEncoded> => Node)),"));
        assert!(module.body.contains("export type Node = _Node;"));
        assert!(module.body.contains("export type NodeEncoded = _NodeEncoded;"));
        assert!(module.imports.is_empty());
    }

    #[test]
    fn test_custom_schema_directive() {
        let table = table();
        let spec = spec(json!({
            "modules": { "./Extra.ts": { "definitions": [{
                "action": "custom-schema", "schema_id": "Tags",
                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Category" }, "title": "Tags" },
                "type_declaration": "ReadonlyArray<Category>",
            }] }, "./Category.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Category" }] } }
        }));
        let hooks = GenerationHooks::new();
        let module = ModuleAssembler::new(&table, &spec, &hooks).generate_module("./Extra.ts").unwrap();
        assert_eq!(
            module.body,
            "export const Tags = S.Array(Category); // Tags\n\
             export type Tags = ReadonlyArray<Category>;\n\
             export type TagsEncoded = S.Schema.Encoded<typeof Tags>;"
        );
        assert_eq!(module.imports.len(), 1);
    }

    #[test]
    fn test_generation_error_names_module() {
        let mut table = table();
        table.insert("Bad".into(), SchemaNode::one_of(vec![]));
        let spec = spec(json!({
            "modules": { "./Bad.ts": { "definitions": [{ "action": "generate-schema", "schema_id": "Bad" }] } }
        }));
        let hooks = GenerationHooks::new();
        let err = ModuleAssembler::new(&table, &spec, &hooks).generate_module("./Bad.ts").unwrap_err();
        assert!(err.to_string().starts_with("Failed to generate module ./Bad.ts"));
    }

    #[test]
    fn test_strip_imports_keeps_runtime_lines() {
        let code = "import { A } from './A.ts';\nimport * as F from 'fast-check'; // <runtime>\nexport const B = A;";
        assert_eq!(strip_imports(code), "import * as F from 'fast-check'; // <runtime>\nexport const B = A;");
    }

    #[test]
    fn test_strip_imports_multiline_and_double_quoted() {
        let code = "import {\n  A,\n  B,\n} from './A.ts';\nimport { C } from \"./C.ts\";\nexport const X = A;";
        assert_eq!(strip_imports(code), "export const X = A;");
    }

    #[test]
    fn test_strip_imports_keeps_code_after_statement() {
        let code = "  import { A } from './A.ts'; export const B = A;\nconst important = 1;";
        assert_eq!(strip_imports(code), "export const B = A;\nconst important = 1;");
    }

    #[test]
    fn test_render_bundled_keeps_missing_markers() {
        let module = GeneratedModule {
            path: "./A.ts".into(),
            imports: vec![
                ImportSpec::new(ImportKind::Definition, "B", "B", "./B.ts"),
                ImportSpec::missing("Ghost"),
            ],
            body: "export const A = B;".into(),
        };
        assert_eq!(module.render_bundled(), "// MISSING Ghost\nexport const A = B;");
    }
}
