//! Schema model
//!
//! The closed set of node shapes the analyzer and generator walk. Nodes are
//! immutable once built: transforms (field reordering, hooks) produce new nodes.
//!
//! Conversion from raw JSON never fails: constructs the compiler cannot
//! represent are kept as [`SchemaShape::Unsupported`] and malformed `$ref`
//! values as [`SchemaShape::Malformed`], so that only the affected definition
//! fails when it is analyzed or generated.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Result, SchemaError};
use crate::pointer;

/// Canonical definition identifier (the key under `components.schemas`)
pub type DefinitionId = String;

/// All named definitions of a document, in document order
pub type DefinitionTable = IndexMap<DefinitionId, SchemaNode>;

// =============================================================================
// Node Types
// =============================================================================

/// Documentation and authoring annotations carried by any node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    /// `default` value, rendered into optional fields
    pub default: Option<Value>,
    /// `x-heading` group marker (set by field ordering)
    pub heading: Option<String>,
}

/// A schema node: one shape plus its annotations
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct SchemaNode {
    pub shape: SchemaShape,
    pub annotations: Annotations,
}

/// The shape of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaShape {
    /// `{"$ref": "#/components/schemas/<id>"}`
    Reference(DefinitionId),
    Array(ArrayShape),
    Object(ObjectShape),
    Primitive(PrimitiveShape),
    Combinator(CombinatorShape),
    /// A construct that cannot be compiled (mixed `type`, missing `type`, ...)
    Unsupported(String),
    /// A `$ref` that is not a string or not a definition reference
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShape {
    pub items: Box<SchemaNode>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: IndexSet<String>,
    pub additional_properties: AdditionalProperties,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum AdditionalProperties {
    #[default]
    Absent,
    Allowed,
    Forbidden,
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Null,
    String,
    Number,
    Integer,
    Boolean,
}

impl PrimitiveKind {
    pub fn from_json_type(type_str: &str) -> Option<Self> {
        match type_str {
            "null" => Some(Self::Null),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveShape {
    pub kind: PrimitiveKind,
    pub enum_values: Option<Vec<Value>>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
}

impl PrimitiveShape {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            enum_values: None,
            format: None,
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    AllOf,
    OneOf,
    AnyOf,
}

impl CombinatorKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::AllOf => "allOf",
            Self::OneOf => "oneOf",
            Self::AnyOf => "anyOf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorShape {
    pub kind: CombinatorKind,
    pub members: Vec<SchemaNode>,
}

// =============================================================================
// Constructors
// =============================================================================

impl SchemaNode {
    pub fn new(shape: SchemaShape) -> Self {
        Self { shape, annotations: Annotations::default() }
    }

    pub fn reference(target: impl Into<DefinitionId>) -> Self {
        Self::new(SchemaShape::Reference(target.into()))
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(SchemaShape::Primitive(PrimitiveShape::new(kind)))
    }

    pub fn array(items: SchemaNode) -> Self {
        Self::new(SchemaShape::Array(ArrayShape {
            items: Box::new(items),
            min_length: None,
            max_length: None,
        }))
    }

    /// Object with the given properties; `required` names must be among them
    pub fn object<I, S>(properties: I, required: &[&str]) -> Self
    where
        I: IntoIterator<Item = (S, SchemaNode)>,
        S: Into<String>,
    {
        Self::new(SchemaShape::Object(ObjectShape {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            required: required.iter().map(|r| r.to_string()).collect(),
            additional_properties: AdditionalProperties::Absent,
        }))
    }

    pub fn combinator(kind: CombinatorKind, members: Vec<SchemaNode>) -> Self {
        Self::new(SchemaShape::Combinator(CombinatorShape { kind, members }))
    }

    pub fn all_of(members: Vec<SchemaNode>) -> Self {
        Self::combinator(CombinatorKind::AllOf, members)
    }

    pub fn one_of(members: Vec<SchemaNode>) -> Self {
        Self::combinator(CombinatorKind::OneOf, members)
    }

    pub fn any_of(members: Vec<SchemaNode>) -> Self {
        Self::combinator(CombinatorKind::AnyOf, members)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.annotations.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.annotations.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.annotations.default = Some(default);
        self
    }

    /// The `format` keyword, where the shape carries one
    pub fn format(&self) -> Option<&str> {
        match &self.shape {
            SchemaShape::Primitive(primitive) => primitive.format.as_deref(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match &self.shape {
            SchemaShape::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Object schema with no properties that accepts nothing extra
    pub fn is_vacuous_object(&self) -> bool {
        matches!(
            &self.shape,
            SchemaShape::Object(object)
                if object.properties.is_empty()
                    && matches!(
                        object.additional_properties,
                        AdditionalProperties::Absent | AdditionalProperties::Forbidden
                    )
        )
    }
}

// =============================================================================
// JSON Conversion
// =============================================================================

impl TryFrom<Value> for SchemaNode {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self> {
        SchemaNode::from_value(&value)
    }
}

impl SchemaNode {
    /// Convert a raw JSON schema object into a node.
    ///
    /// Malformed `$ref` values become [`SchemaShape::Malformed`]; other
    /// unrepresentable constructs become [`SchemaShape::Unsupported`].
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(schema) = value.as_object() else {
            return Ok(Self::new(SchemaShape::Unsupported(format!(
                "non-object schema {value}"
            ))));
        };

        let annotations = extract_annotations(schema);
        let shape = detect_shape(schema).unwrap_or_else(|e| match e {
            SchemaError::Format(message) => SchemaShape::Malformed(message),
            other => SchemaShape::Malformed(other.to_string()),
        });
        Ok(Self { shape, annotations })
    }
}

fn detect_shape(schema: &Map<String, Value>) -> Result<SchemaShape> {
    if let Some(reference) = schema.get("$ref") {
        let reference = reference
            .as_str()
            .ok_or_else(|| SchemaError::Format(format!("$ref must be a string: {reference}")))?;
        return Ok(SchemaShape::Reference(pointer::reference_to_definition_id(reference)?));
    }

    let type_value = schema.get("type");
    let json_type = match type_value {
        None => None,
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => match types.as_slice() {
            [Value::String(t)] => Some(t.as_str()),
            _ => {
                return Ok(SchemaShape::Unsupported(format!(
                    "MixedSchemaObject (type: {})",
                    Value::Array(types.clone())
                )))
            }
        },
        Some(other) => return Ok(SchemaShape::Unsupported(format!("type {other}"))),
    };

    if let Some(items) = schema.get("items") {
        if matches!(json_type, None | Some("array")) {
            return Ok(SchemaShape::Array(ArrayShape {
                items: Box::new(SchemaNode::from_value(items)?),
                min_length: get_u64(schema, "minItems").or_else(|| get_u64(schema, "minLength")),
                max_length: get_u64(schema, "maxItems").or_else(|| get_u64(schema, "maxLength")),
            }));
        }
    }

    for kind in [CombinatorKind::AllOf, CombinatorKind::OneOf, CombinatorKind::AnyOf] {
        let Some(members) = schema.get(kind.keyword()) else {
            continue;
        };
        let Some(members) = members.as_array() else {
            return Ok(SchemaShape::Unsupported(format!("{} must be an array", kind.keyword())));
        };
        let members = members
            .iter()
            .map(SchemaNode::from_value)
            .collect::<Result<Vec<_>>>()?;
        return Ok(SchemaShape::Combinator(CombinatorShape { kind, members }));
    }

    let Some(json_type) = json_type else {
        return Ok(SchemaShape::Unsupported("missing 'type' in schema".to_string()));
    };

    match json_type {
        "array" => Ok(SchemaShape::Unsupported("array schema without 'items'".to_string())),
        "object" => detect_object(schema),
        other => match PrimitiveKind::from_json_type(other) {
            Some(kind) => Ok(SchemaShape::Primitive(detect_primitive(kind, schema))),
            None => Ok(SchemaShape::Unsupported(format!("type \"{other}\""))),
        },
    }
}

fn detect_object(schema: &Map<String, Value>) -> Result<SchemaShape> {
    let mut properties = IndexMap::new();
    if let Some(props) = schema.get("properties").and_then(|v| v.as_object()) {
        for (name, prop) in props {
            properties.insert(name.clone(), SchemaNode::from_value(prop)?);
        }
    }

    let required = schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let additional_properties = match schema.get("additionalProperties") {
        None => AdditionalProperties::Absent,
        Some(Value::Bool(true)) => AdditionalProperties::Allowed,
        Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
        Some(value) => AdditionalProperties::Schema(Box::new(SchemaNode::from_value(value)?)),
    };

    Ok(SchemaShape::Object(ObjectShape { properties, required, additional_properties }))
}

fn detect_primitive(kind: PrimitiveKind, schema: &Map<String, Value>) -> PrimitiveShape {
    PrimitiveShape {
        kind,
        enum_values: schema.get("enum").and_then(|v| v.as_array()).cloned(),
        format: get_string(schema, "format"),
        pattern: get_string(schema, "pattern"),
        min_length: get_u64(schema, "minLength"),
        max_length: get_u64(schema, "maxLength"),
        minimum: get_number(schema, "minimum"),
        maximum: get_number(schema, "maximum"),
        exclusive_minimum: get_number(schema, "exclusiveMinimum"),
        exclusive_maximum: get_number(schema, "exclusiveMaximum"),
    }
}

fn extract_annotations(schema: &Map<String, Value>) -> Annotations {
    Annotations {
        title: get_string(schema, "title"),
        description: get_string(schema, "description"),
        deprecated: schema.get("deprecated").and_then(|v| v.as_bool()).unwrap_or(false),
        default: schema.get("default").cloned(),
        heading: get_string(schema, "x-heading"),
    }
}

fn get_string(schema: &Map<String, Value>, key: &str) -> Option<String> {
    schema.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn get_u64(schema: &Map<String, Value>, key: &str) -> Option<u64> {
    schema.get(key).and_then(|v| v.as_u64())
}

fn get_number(schema: &Map<String, Value>, key: &str) -> Option<Number> {
    match schema.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}
