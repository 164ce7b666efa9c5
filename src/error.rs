//! Error types for the schema compiler

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema compiler errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Malformed reference or JSON pointer
    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Currently unsupported: {0}")]
    UnsupportedConstruct(String),

    #[error("Missing definition: {0}")]
    MissingDefinition(String),

    /// Object-shape classification revisited a reference chain
    #[error("Infinite recursion at {0}")]
    InfiniteRecursion(String),

    #[error("Unable to determine dependents for '{id}': {source}")]
    DependencyAnalysis {
        id: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Cannot find definition for module {0}")]
    ModuleNotFound(String),

    #[error("Failed to generate module {module}: {source}")]
    Module {
        module: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Unable to format code: {0}")]
    Formatter(String),

    #[error("Invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::UnsupportedConstruct(construct.into())
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self::MissingDefinition(id.into())
    }

    /// Wrap this error with the module it occurred in
    pub fn in_module(self, module: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            source: Box::new(self),
        }
    }
}
