//! Effect Schema Emitter
//!
//! One generator per node shape. Every branch returns a fresh [`GenResult`];
//! child refs are merged in first-seen order, docs come from the node itself.
//!
//! Known limitations kept as-is:
//! - `allOf` over objects flattens fields; a later member's field with the same
//!   name is emitted after (and so overrides) an earlier one
//! - `allOf` over non-objects approximates intersection with `S.extend`; so does
//!   an `allOf` over objects with a deferred reference member, which has no `.fields`
//! - `oneOf` renders as `S.Union`, which does not enforce exclusivity
//! - array item docs are not carried into the array's docs

use indexmap::IndexSet;
use serde_json::Value;

use super::hooks::{Constraint, ConstraintSet, OptionalFieldRepresentation};
use super::names::{encode_identifier, property_name};
use super::{generate_pipe, DocMeta, GenResult, GenerationContext};
use crate::error::{Result, SchemaError};
use crate::graph::is_object_shaped;
use crate::schema::{
    AdditionalProperties, ArrayShape, CombinatorKind, CombinatorShape, DefinitionId, ObjectShape,
    PrimitiveKind, PrimitiveShape, SchemaNode, SchemaShape,
};

// =============================================================================
// Dispatch
// =============================================================================

/// Generate the schema expression for `node`
pub fn generate(ctx: &GenerationContext<'_>, node: &SchemaNode) -> Result<GenResult> {
    match &node.shape {
        SchemaShape::Reference(target) => Ok(generate_reference(ctx, node, target)),
        SchemaShape::Array(array) => generate_array(ctx, node, array),
        SchemaShape::Combinator(combinator) => match combinator.kind {
            CombinatorKind::AllOf => generate_all_of(ctx, node, &combinator.members),
            CombinatorKind::OneOf | CombinatorKind::AnyOf => generate_union(ctx, node, combinator),
        },
        SchemaShape::Primitive(primitive) => match ctx.hooks.run_schema_hook(node) {
            Some(output) => Ok(output.result),
            None => generate_primitive(ctx, node, primitive),
        },
        SchemaShape::Object(object) => match ctx.hooks.run_schema_hook(node) {
            Some(output) => Ok(output.result),
            None => generate_object(ctx, node, object),
        },
        SchemaShape::Unsupported(construct) => Err(SchemaError::unsupported(construct.clone())),
        SchemaShape::Malformed(message) => Err(SchemaError::Format(message.clone())),
    }
}

// =============================================================================
// Primitives
// =============================================================================

fn generate_primitive(
    ctx: &GenerationContext<'_>,
    node: &SchemaNode,
    primitive: &PrimitiveShape,
) -> Result<GenResult> {
    let docs = DocMeta::from_node(node);

    match primitive.kind {
        PrimitiveKind::Null => Ok(simple_primitive(ctx, node, PrimitiveKind::Null, "S.Null", docs)),
        PrimitiveKind::Boolean => {
            if primitive.enum_values.is_some() {
                return Err(SchemaError::unsupported("Boolean enum"));
            }
            Ok(simple_primitive(ctx, node, PrimitiveKind::Boolean, "S.Boolean", docs))
        }
        PrimitiveKind::String => generate_string(ctx, node, primitive, docs),
        PrimitiveKind::Number | PrimitiveKind::Integer => generate_number(ctx, node, primitive, docs),
    }
}

fn simple_primitive(
    ctx: &GenerationContext<'_>,
    node: &SchemaNode,
    kind: PrimitiveKind,
    code: &str,
    docs: DocMeta,
) -> GenResult {
    match ctx.hooks.run_primitive_hook(kind, node) {
        Some(output) => GenResult { code: output.result.code, refs: output.result.refs, docs },
        None => GenResult::new(code, docs),
    }
}

fn generate_string(
    ctx: &GenerationContext<'_>,
    node: &SchemaNode,
    primitive: &PrimitiveShape,
    docs: DocMeta,
) -> Result<GenResult> {
    if let Some(values) = &primitive.enum_values {
        if !values.iter().all(Value::is_string) {
            return Err(SchemaError::unsupported(format!(
                "enum values for string schema must be strings: {}",
                Value::Array(values.clone())
            )));
        }
        return Ok(GenResult::new(literal_union(values), docs));
    }

    let format = primitive.format.as_deref();
    let base = match format {
        Some("uuid") => "S.UUID",
        Some("date-time") => "S.Date",
        _ => "S.String",
    };

    let mut pipe = vec![base.to_string()];
    if format == Some("email") {
        pipe.push("S.pattern(/.+@.+/)".to_string());
    }
    if let Some(pattern) = &primitive.pattern {
        pipe.push(format!("S.pattern(new RegExp({}))", Value::String(pattern.clone())));
    }
    if let Some(min) = primitive.min_length {
        pipe.push(format!("S.minLength({min})"));
    }
    if let Some(max) = primitive.max_length {
        pipe.push(format!("S.maxLength({max})"));
    }

    // A hook replaces the whole pipeline built so far
    let mut refs = IndexSet::new();
    if let Some(output) = ctx.hooks.run_primitive_hook(PrimitiveKind::String, node) {
        refs.extend(output.result.refs);
        pipe = vec![output.result.code];
    }

    Ok(GenResult { code: generate_pipe(&pipe), refs, docs })
}

fn generate_number(
    ctx: &GenerationContext<'_>,
    node: &SchemaNode,
    primitive: &PrimitiveShape,
    docs: DocMeta,
) -> Result<GenResult> {
    if let Some(values) = &primitive.enum_values {
        if !values.iter().all(Value::is_number) {
            return Err(SchemaError::unsupported(format!(
                "enum values for {} schema must be numbers: {}",
                primitive.kind.as_str(),
                Value::Array(values.clone())
            )));
        }
        return Ok(GenResult::new(literal_union(values), docs));
    }

    let base = match primitive.format.as_deref() {
        Some("date-time") => "S.DateFromNumber.pipe(S.validDate())",
        _ => "S.Number",
    };

    let mut pipe = vec![base.to_string()];
    if primitive.kind == PrimitiveKind::Integer {
        pipe.push("S.int()".to_string());
    }

    let mut refs = IndexSet::new();
    let mut consumed = ConstraintSet::new();
    if let Some(output) = ctx.hooks.run_primitive_hook(primitive.kind, node) {
        refs.extend(output.result.refs);
        pipe = vec![output.result.code];
        consumed = output.consumed;
    }

    // Range constraints go after the hook unless it already enforces them
    let ranges = [
        (Constraint::Minimum, &primitive.minimum, "S.greaterThanOrEqualTo"),
        (Constraint::Maximum, &primitive.maximum, "S.lessThanOrEqualTo"),
        (Constraint::ExclusiveMinimum, &primitive.exclusive_minimum, "S.greaterThan"),
        (Constraint::ExclusiveMaximum, &primitive.exclusive_maximum, "S.lessThan"),
    ];
    for (constraint, bound, filter) in ranges {
        if let Some(bound) = bound {
            if !consumed.contains(constraint) {
                pipe.push(format!("{filter}({bound})"));
            }
        }
    }

    Ok(GenResult { code: generate_pipe(&pipe), refs, docs })
}

/// `S.Literal(` with one JSON literal per line
fn literal_union(values: &[Value]) -> String {
    let mut code = String::from("S.Literal(\n");
    for value in values {
        code.push_str(&format!("{value},\n"));
    }
    code.push(')');
    code
}

// =============================================================================
// Objects
// =============================================================================

fn generate_object(ctx: &GenerationContext<'_>, node: &SchemaNode, object: &ObjectShape) -> Result<GenResult> {
    let docs = DocMeta::from_node(node);
    let mut refs = IndexSet::new();

    let code = if object.properties.is_empty() {
        match &object.additional_properties {
            AdditionalProperties::Absent => "S.Struct({})".to_string(),
            AdditionalProperties::Allowed => "S.Record(S.String, S.Unknown)".to_string(),
            AdditionalProperties::Forbidden => "S.Record(S.Never, S.Never)".to_string(),
            AdditionalProperties::Schema(value) => {
                let value = generate(ctx, value)?;
                refs.extend(value.refs);
                format!("S.Record(S.String, {})", value.code)
            }
        }
    } else {
        // `true`/`false` have no schema-level equivalent here; only a schema adds an index signature
        let index_signature = match &object.additional_properties {
            AdditionalProperties::Schema(value) => {
                let value = generate(ctx, value)?;
                refs.extend(value.refs);
                Some(format!("{{ key: S.String, value: {} }}", value.code))
            }
            _ => None,
        };

        let fields = generate_fields(ctx, object)?;
        refs.extend(fields.refs);

        match index_signature {
            Some(signature) => format!("S.Struct({{\n{}\n}}, {signature})", fields.code),
            None => format!("S.Struct({{\n{}\n}})", fields.code),
        }
    };

    Ok(GenResult { code, refs, docs })
}

/// The field entries of an object, one per line, without the surrounding struct
pub fn generate_fields(ctx: &GenerationContext<'_>, object: &ObjectShape) -> Result<GenResult> {
    let mut refs = IndexSet::new();
    let mut entries = Vec::with_capacity(object.properties.len());

    for (index, (name, prop)) in object.properties.iter().enumerate() {
        let result = generate(ctx, prop)?;
        refs.extend(result.refs);
        let (block, inline) = result.docs.to_comments();

        let mut code = result.code;
        if !object.required.contains(name) {
            code = optional_field(ctx.hooks.optional_fields, code, prop.annotations.default.as_ref());
        }

        let mut entry = String::new();
        let heading = prop.annotations.heading.as_deref();
        if index > 0 && heading.is_some() {
            entry.push('\n');
        }
        if let Some(heading) = heading.filter(|h| h.starts_with("//")) {
            entry.push_str(heading);
            entry.push('\n');
        }
        if !block.is_empty() {
            entry.push_str(&block);
            entry.push('\n');
        }
        entry.push_str(&format!("{}: {code},", property_name(name)));
        if !inline.is_empty() {
            entry.push(' ');
            entry.push_str(&inline);
        }
        entries.push(entry);
    }

    Ok(GenResult { code: entries.join("\n"), refs, docs: DocMeta::default() })
}

fn optional_field(representation: OptionalFieldRepresentation, code: String, default: Option<&Value>) -> String {
    let inner = match representation {
        OptionalFieldRepresentation::Plain => code,
        OptionalFieldRepresentation::Nullish => format!("S.NullOr({code})"),
    };

    match default {
        // Object literals need parens as an arrow function body
        Some(value @ (Value::Object(_) | Value::Array(_))) => {
            format!("S.optional({inner}, {{ default: () => ({value}) }})")
        }
        Some(value) => format!("S.optional({inner}, {{ default: () => {value} }})"),
        None => format!("S.optional({inner})"),
    }
}

// =============================================================================
// Arrays and References
// =============================================================================

fn generate_array(ctx: &GenerationContext<'_>, node: &SchemaNode, array: &ArrayShape) -> Result<GenResult> {
    let item = generate(ctx, &array.items)?;

    let mut code = format!("S.Array({})", item.code);
    let mut bounds = Vec::new();
    if let Some(min) = array.min_length {
        bounds.push(format!("S.minItems({min})"));
    }
    if let Some(max) = array.max_length {
        bounds.push(format!("S.maxItems({max})"));
    }
    if !bounds.is_empty() {
        code = format!("{code}.pipe({})", bounds.join(", "));
    }

    Ok(GenResult { code, refs: item.refs, docs: DocMeta::from_node(node) })
}

fn generate_reference(ctx: &GenerationContext<'_>, node: &SchemaNode, target: &DefinitionId) -> GenResult {
    let name = encode_identifier(target);
    let code = if ctx.is_ordered_before(target) {
        name
    } else {
        format!("S.suspend((): S.Schema<_{name}, _{name}Encoded> => {name})")
    };

    GenResult::new(code, DocMeta::from_node(node)).with_refs([target.clone()])
}

// =============================================================================
// Combinators
// =============================================================================

fn generate_all_of(ctx: &GenerationContext<'_>, node: &SchemaNode, members: &[SchemaNode]) -> Result<GenResult> {
    if let [single] = members {
        return generate(ctx, single);
    }

    let all_objects = all_object_shaped(ctx, members)? && !has_deferred_reference(ctx, members);

    let effective: Vec<&SchemaNode> = members.iter().filter(|m| !m.is_vacuous_object()).collect();
    match effective.as_slice() {
        [] => return Ok(GenResult::new("S.Struct({})", DocMeta::from_node(node))),
        [single] => return generate(ctx, single),
        _ => {}
    }

    let mut refs = IndexSet::new();
    let mut entries = Vec::with_capacity(effective.len());

    let code = if all_objects {
        for member in &effective {
            let result = generate(ctx, member)?;
            let code = match &member.shape {
                SchemaShape::Object(object) => generate_fields(ctx, object)?.code,
                _ => format!("...{}.fields,", result.code),
            };
            let (block, inline) = result.docs.to_comments();
            entries.push(join_nonempty(&[block.as_str(), inline.as_str(), code.as_str()]));
            refs.extend(result.refs);
        }
        format!("S.Struct({{\n{}\n}})", entries.join("\n"))
    } else {
        for (index, member) in effective.iter().enumerate() {
            let result = generate(ctx, member)?;
            let code = if index > 0 { format!("S.extend({})", result.code) } else { result.code };
            entries.push(member_entry(&result.docs, &code));
            refs.extend(result.refs);
        }
        format!("pipe(\n{}\n)", entries.join("\n"))
    };

    Ok(GenResult { code, refs, docs: DocMeta::from_node(node) })
}

/// References count when their target resolves to an object; inline members
/// only when they are objects themselves.
fn all_object_shaped(ctx: &GenerationContext<'_>, members: &[SchemaNode]) -> Result<bool> {
    for member in members {
        let is_object = match &member.shape {
            SchemaShape::Reference(target) => is_object_shaped(ctx.table, target)?,
            SchemaShape::Object(_) => true,
            _ => false,
        };
        if !is_object {
            return Ok(false);
        }
    }
    Ok(true)
}

fn has_deferred_reference(ctx: &GenerationContext<'_>, members: &[SchemaNode]) -> bool {
    members
        .iter()
        .any(|member| matches!(&member.shape, SchemaShape::Reference(target) if !ctx.is_ordered_before(target)))
}

fn generate_union(
    ctx: &GenerationContext<'_>,
    node: &SchemaNode,
    combinator: &CombinatorShape,
) -> Result<GenResult> {
    match combinator.members.as_slice() {
        [] => Err(SchemaError::unsupported(format!(
            "{} must have at least one schema",
            combinator.kind.keyword()
        ))),
        [single] => generate(ctx, single),
        members => {
            let mut refs = IndexSet::new();
            let mut entries = Vec::with_capacity(members.len());
            for member in members {
                let result = generate(ctx, member)?;
                entries.push(member_entry(&result.docs, &result.code));
                refs.extend(result.refs);
            }
            Ok(GenResult {
                code: format!("S.Union(\n{}\n)", entries.join("\n")),
                refs,
                docs: DocMeta::from_node(node),
            })
        }
    }
}

/// `/** block */` line (if any), then `code,` with the inline comment
fn member_entry(docs: &DocMeta, code: &str) -> String {
    let (block, inline) = docs.to_comments();
    let line = if inline.is_empty() { format!("{code},") } else { format!("{code}, {inline}") };
    join_nonempty(&[block.as_str(), line.as_str()])
}

fn join_nonempty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}
