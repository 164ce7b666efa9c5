//! Field Ordering
//!
//! Reorders (and filters) the fields of an object schema according to a
//! directive's field groups. Produces a new node; the input is untouched.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::spec::FieldGroups;
use crate::error::{Result, SchemaError};
use crate::schema::{SchemaNode, SchemaShape};

/// Split a group key (`"id, name"`) into field names
fn field_names(key: &str) -> impl Iterator<Item = &str> {
    key.split(',').map(str::trim).filter(|name| !name.is_empty())
}

/// Apply field groups to `node`.
///
/// - fields are emitted in group order; fields not named in any group are dropped
/// - the first field of each group is annotated with the group key as heading
/// - a group entry's `default` replaces the default of every field it names
///
/// Combinators are processed member by member; references inside a
/// combinator are left as they are. Anything else is not an object and fails.
pub fn reorder_fields(groups: &FieldGroups, node: &SchemaNode) -> Result<SchemaNode> {
    match &node.shape {
        SchemaShape::Object(_) => Ok(reorder_object(groups, node)),
        SchemaShape::Combinator(combinator) => {
            let members = combinator
                .members
                .iter()
                .map(|member| match member.shape {
                    SchemaShape::Reference(_) => Ok(member.clone()),
                    _ => reorder_fields(groups, member),
                })
                .collect::<Result<Vec<_>>>()?;

            let mut reordered = node.clone();
            if let SchemaShape::Combinator(combinator) = &mut reordered.shape {
                combinator.members = members;
            }
            Ok(reordered)
        }
        _ => Err(SchemaError::unsupported(format!(
            "field ordering requires an object schema, found {}",
            shape_name(&node.shape)
        ))),
    }
}

fn reorder_object(groups: &FieldGroups, node: &SchemaNode) -> SchemaNode {
    let mut ordering: IndexSet<&str> = IndexSet::new();
    let mut headings: IndexMap<&str, &str> = IndexMap::new();
    let mut defaults: IndexMap<&str, &Value> = IndexMap::new();

    for (heading, group) in groups {
        let mut first = true;
        for (key, field_spec) in group {
            for name in field_names(key) {
                ordering.insert(name);
                if first {
                    headings.insert(name, heading.as_str());
                    first = false;
                }
                if let Some(default) = &field_spec.default {
                    defaults.insert(name, default);
                }
            }
        }
    }

    let mut reordered = node.clone();
    let SchemaShape::Object(object) = &mut reordered.shape else {
        return reordered;
    };
    if object.properties.is_empty() {
        return reordered;
    }

    let mut properties = IndexMap::with_capacity(ordering.len());
    for name in &ordering {
        let Some(prop) = object.properties.get(*name) else { continue };
        let mut prop = prop.clone();
        if let Some(heading) = headings.get(name) {
            prop.annotations.heading = Some(heading.to_string());
        }
        if let Some(default) = defaults.get(name) {
            prop.annotations.default = Some((*default).clone());
        }
        properties.insert(name.to_string(), prop);
    }
    object.properties = properties;

    reordered
}

fn shape_name(shape: &SchemaShape) -> &'static str {
    match shape {
        SchemaShape::Reference(_) => "reference",
        SchemaShape::Array(_) => "array",
        SchemaShape::Object(_) => "object",
        SchemaShape::Primitive(_) => "primitive",
        SchemaShape::Combinator(_) => "combinator",
        SchemaShape::Unsupported(_) => "unsupported construct",
        SchemaShape::Malformed(_) => "malformed reference",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PrimitiveKind;
    use serde_json::json;

    fn groups(value: Value) -> FieldGroups {
        serde_json::from_value(value).unwrap()
    }

    fn pet() -> SchemaNode {
        SchemaNode::object(
            [
                ("tag", SchemaNode::primitive(PrimitiveKind::String)),
                ("name", SchemaNode::primitive(PrimitiveKind::String)),
                ("id", SchemaNode::primitive(PrimitiveKind::Integer)),
                ("internal", SchemaNode::primitive(PrimitiveKind::Boolean)),
            ],
            &["id"],
        )
    }

    #[test]
    fn test_reorders_filters_and_marks_headings() {
        let groups = groups(json!({
            "// Identity": { "id, name": {} },
            "// Details": { "tag": { "default": "none" } },
        }));

        let reordered = reorder_fields(&groups, &pet()).unwrap();
        let object = reordered.as_object().unwrap();

        assert_eq!(object.properties.keys().collect::<Vec<_>>(), vec!["id", "name", "tag"]);
        assert_eq!(object.properties["id"].annotations.heading.as_deref(), Some("// Identity"));
        assert_eq!(object.properties["name"].annotations.heading, None);
        assert_eq!(object.properties["tag"].annotations.heading.as_deref(), Some("// Details"));
        assert_eq!(object.properties["tag"].annotations.default, Some(json!("none")));
        assert!(object.required.contains("id"));

        // Input untouched
        assert_eq!(pet().as_object().unwrap().properties.len(), 4);
    }

    #[test]
    fn test_unknown_field_names_ignored() {
        let groups = groups(json!({ "main": { "missing, id": {} } }));
        let reordered = reorder_fields(&groups, &pet()).unwrap();
        let object = reordered.as_object().unwrap();
        assert_eq!(object.properties.keys().collect::<Vec<_>>(), vec!["id"]);
        // The heading lands on the first named field, even if absent
        assert_eq!(object.properties["id"].annotations.heading, None);
    }

    #[test]
    fn test_combinator_members_reordered() {
        let node = SchemaNode::all_of(vec![SchemaNode::reference("Base"), pet()]);
        let groups = groups(json!({ "main": { "name, id": {} } }));

        let reordered = reorder_fields(&groups, &node).unwrap();
        let SchemaShape::Combinator(combinator) = &reordered.shape else { panic!("combinator") };
        assert_eq!(combinator.members[0], SchemaNode::reference("Base"));
        let object = combinator.members[1].as_object().unwrap();
        assert_eq!(object.properties.keys().collect::<Vec<_>>(), vec!["name", "id"]);
    }

    #[test]
    fn test_non_object_fails() {
        let groups = groups(json!({ "main": { "id": {} } }));
        let err = reorder_fields(&groups, &SchemaNode::primitive(PrimitiveKind::String)).unwrap_err();
        assert!(err.to_string().contains("requires an object schema"));
        assert!(reorder_fields(&groups, &SchemaNode::reference("Pet")).is_err());
    }

    #[test]
    fn test_empty_object_unchanged() {
        let groups = groups(json!({ "main": { "id": {} } }));
        let empty = SchemaNode::object(Vec::<(&str, SchemaNode)>::new(), &[]);
        assert_eq!(reorder_fields(&groups, &empty).unwrap(), empty);
    }
}
