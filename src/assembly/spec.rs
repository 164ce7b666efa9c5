//! Generation Spec
//!
//! Maps output modules to the definitions they export. Loaded from JSON or
//! TOML (by file extension); read-only once generation starts.
//!
//! ```toml
//! [generation_method]
//! method = "bundled"
//! bundle_name = "api"
//!
//! [[modules."./Pet.ts".definitions]]
//! action = "generate-schema"
//! schema_id = "Pet"
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codegen::{GenerationHooks, HookRule, OptionalFieldRepresentation};
use crate::error::Result;
use crate::schema::{DefinitionId, SchemaNode};

/// Output module path, relative to the output directory (e.g. `./Pet.ts`)
pub type ModulePath = String;

/// Comma-separated field names (`"id, name"`) → options for those fields
pub type FieldGroup = IndexMap<String, FieldSpec>;

/// Group heading → group, in output order
pub type FieldGroups = IndexMap<String, FieldGroup>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Replaces the default value of every named field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

// =============================================================================
// Directives
// =============================================================================

/// One exported definition of a module
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Directive {
    /// Verbatim code
    #[serde(rename = "custom-code")]
    Literal { schema_id: String, code: String },

    /// A schema given inline instead of taken from the document
    #[serde(rename = "custom-schema")]
    CustomSchema {
        schema_id: String,
        schema: SchemaNode,
        #[serde(default)]
        lazy: bool,
        #[serde(default)]
        type_declaration: Option<String>,
        #[serde(default)]
        type_declaration_encoded: Option<String>,
    },

    /// Generate from a document definition (`source_schema_id`, or `schema_id`)
    #[serde(rename = "generate-schema")]
    GenerateFromSource {
        schema_id: String,
        #[serde(default)]
        source_schema_id: Option<DefinitionId>,
        /// Participates in a reference cycle
        #[serde(default)]
        lazy: bool,
        #[serde(default)]
        type_declaration: Option<String>,
        #[serde(default)]
        type_declaration_encoded: Option<String>,
        #[serde(default)]
        fields: Option<FieldGroups>,
    },
}

impl Directive {
    pub fn generate(schema_id: impl Into<String>) -> Self {
        Directive::GenerateFromSource {
            schema_id: schema_id.into(),
            source_schema_id: None,
            lazy: false,
            type_declaration: None,
            type_declaration_encoded: None,
            fields: None,
        }
    }

    /// The document definition this directive stands for
    pub fn source_id(&self) -> &str {
        match self {
            Directive::Literal { schema_id, .. } | Directive::CustomSchema { schema_id, .. } => schema_id,
            Directive::GenerateFromSource { schema_id, source_schema_id, .. } => {
                source_schema_id.as_deref().unwrap_or(schema_id)
            }
        }
    }

    /// The exported name
    pub fn target_id(&self) -> &str {
        match self {
            Directive::Literal { schema_id, .. }
            | Directive::CustomSchema { schema_id, .. }
            | Directive::GenerateFromSource { schema_id, .. } => schema_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModuleSpec {
    #[serde(default)]
    pub definitions: Vec<Directive>,
}

// =============================================================================
// Spec
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum GenerationMethod {
    /// One module per definition, unless a module is listed explicitly
    OneToOne {
        #[serde(default)]
        generate_barrel_file: bool,
    },
    /// Every definition in one file, `<bundle_name>.ts`
    Bundled { bundle_name: String },
    /// Modules exactly as listed
    Custom,
}

impl Default for GenerationMethod {
    fn default() -> Self {
        GenerationMethod::OneToOne { generate_barrel_file: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HooksSpec {
    #[serde(default)]
    pub optional_field_representation: OptionalFieldRepresentation,
    #[serde(default)]
    pub rules: Vec<HookRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationSpec {
    #[serde(default)]
    pub generation_method: GenerationMethod,
    #[serde(default)]
    pub hooks: HooksSpec,
    /// Support modules; merged ahead of `modules`, their imports sort first
    #[serde(default)]
    pub runtime: IndexMap<ModulePath, ModuleSpec>,
    #[serde(default)]
    pub modules: IndexMap<ModulePath, ModuleSpec>,
}

impl GenerationSpec {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a spec file; `.toml` is read as TOML, anything else as JSON
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Runtime modules followed by regular modules; a regular module with the
    /// same path replaces the runtime one in place.
    pub fn all_modules(&self) -> IndexMap<&ModulePath, &ModuleSpec> {
        let mut all = IndexMap::with_capacity(self.runtime.len() + self.modules.len());
        for (path, module) in self.runtime.iter().chain(self.modules.iter()) {
            all.insert(path, module);
        }
        all
    }

    pub fn module(&self, path: &str) -> Option<&ModuleSpec> {
        self.modules.get(path).or_else(|| self.runtime.get(path))
    }

    pub fn is_runtime_module(&self, path: &str) -> bool {
        self.runtime.contains_key(path) && !self.modules.contains_key(path)
    }

    /// Hooks described by the generation spec file
    pub fn build_hooks(&self) -> GenerationHooks {
        GenerationHooks::from_rules(&self.hooks.rules, self.hooks.optional_field_representation)
    }
}
