//! OpenAPI Document Loading
//!
//! Reads an OpenAPI 3.1 JSON document and converts `components.schemas` into a
//! [`DefinitionTable`]. Only the parts the compiler needs are read.

use std::path::Path;

use indexmap::IndexMap;
use semver::Version;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::schema::{DefinitionTable, SchemaNode, SchemaShape};

#[derive(Debug, Deserialize)]
struct RawDocument {
    openapi: String,
    info: RawInfo,
    #[serde(default)]
    components: RawComponents,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: String,
    version: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(default)]
    schemas: IndexMap<String, Value>,
}

/// A loaded document: metadata plus its definitions in document order
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument {
    pub openapi: Version,
    pub title: String,
    pub version: String,
    pub definitions: DefinitionTable,
}

impl OpenApiDocument {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::from_json_str(&content)?;
        tracing::debug!(
            "Loaded {} definitions from {}",
            document.definitions.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(content)?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawDocument = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDocument) -> Result<Self> {
        let openapi = Version::parse(&raw.openapi)?;
        if openapi.major != 3 || openapi.minor != 1 {
            return Err(SchemaError::InvalidDocument(format!(
                "expected OpenAPI 3.1, found {openapi}"
            )));
        }

        let mut definitions = DefinitionTable::with_capacity(raw.components.schemas.len());
        for (id, value) in raw.components.schemas {
            let node = SchemaNode::from_value(&value)?;
            if let SchemaShape::Malformed(message) = &node.shape {
                tracing::warn!("Definition '{}' will fail to generate: {}", id, message);
            }
            definitions.insert(id, node);
        }

        Ok(Self {
            openapi,
            title: raw.info.title,
            version: raw.info.version,
            definitions,
        })
    }
}
