//! Object-shape classification
//!
//! Decides whether a definition resolves to an object schema, which is what
//! decides whether `S.extend` applies to an `allOf` member.

use super::cycles::{Visit, Visited};
use crate::error::{Result, SchemaError};
use crate::schema::{CombinatorKind, DefinitionTable, SchemaNode, SchemaShape};

/// Whether the definition `root_id` resolves to an object schema.
///
/// References are followed; `allOf` is object-shaped when every member is.
/// A reference chain that revisits a definition on the current path fails
/// with [`SchemaError::InfiniteRecursion`].
pub fn is_object_shaped(table: &DefinitionTable, root_id: &str) -> Result<bool> {
    let root = table
        .get(root_id)
        .ok_or_else(|| SchemaError::missing(root_id))?;

    let mut visited = Visited::path_from(root_id);
    classify(root, table, &mut visited)
}

/// Same as [`is_object_shaped`] for an anonymous node
pub fn is_node_object_shaped(node: &SchemaNode, table: &DefinitionTable) -> Result<bool> {
    classify(node, table, &mut Visited::path())
}

fn classify(node: &SchemaNode, table: &DefinitionTable, visited: &mut Visited) -> Result<bool> {
    match &node.shape {
        SchemaShape::Reference(target) => {
            if visited.enter(target) == Visit::Revisit {
                return Err(SchemaError::InfiniteRecursion(target.clone()));
            }
            let result = match table.get(target) {
                Some(resolved) => classify(resolved, table, visited),
                None => Err(SchemaError::missing(target.clone())),
            };
            visited.leave(target);
            result
        }
        SchemaShape::Combinator(combinator) => match combinator.kind {
            CombinatorKind::AllOf => {
                // Every member is classified so that errors surface regardless of order
                let mut all_objects = true;
                for member in &combinator.members {
                    all_objects &= classify(member, table, visited)?;
                }
                Ok(all_objects)
            }
            CombinatorKind::OneOf | CombinatorKind::AnyOf => Ok(false),
        },
        SchemaShape::Object(_) => Ok(true),
        SchemaShape::Array(_) | SchemaShape::Primitive(_) => Ok(false),
        SchemaShape::Unsupported(construct) => Err(SchemaError::unsupported(construct.clone())),
        SchemaShape::Malformed(message) => Err(SchemaError::Format(message.clone())),
    }
}
