//! Dependency Extraction
//!
//! Shallow (one hop) dependency sets, the adjacency maps built from them, and
//! the deep dependency tree rooted at one definition.

use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};

use super::cycles::{Visit, Visited};
use crate::error::{Result, SchemaError};
use crate::schema::{AdditionalProperties, DefinitionId, DefinitionTable, SchemaNode, SchemaShape};

/// Definition → directly related definitions (dependencies or dependents)
pub type AdjacencyMap = IndexMap<DefinitionId, IndexSet<DefinitionId>>;

// =============================================================================
// Shallow Dependencies
// =============================================================================

/// Definitions referenced by `node` without following any reference
pub fn shallow_dependencies(node: &SchemaNode) -> Result<IndexSet<DefinitionId>> {
    let mut deps = IndexSet::new();
    collect_shallow(node, &mut deps)?;
    Ok(deps)
}

fn collect_shallow(node: &SchemaNode, deps: &mut IndexSet<DefinitionId>) -> Result<()> {
    match &node.shape {
        SchemaShape::Reference(target) => {
            deps.insert(target.clone());
        }
        SchemaShape::Array(array) => collect_shallow(&array.items, deps)?,
        SchemaShape::Object(object) => {
            for prop in object.properties.values() {
                collect_shallow(prop, deps)?;
            }
            if let AdditionalProperties::Schema(additional) = &object.additional_properties {
                collect_shallow(additional, deps)?;
            }
        }
        SchemaShape::Combinator(combinator) => {
            for member in &combinator.members {
                collect_shallow(member, deps)?;
            }
        }
        SchemaShape::Primitive(_) => {}
        SchemaShape::Unsupported(construct) => {
            return Err(SchemaError::unsupported(construct.clone()));
        }
        SchemaShape::Malformed(message) => {
            return Err(SchemaError::Format(message.clone()));
        }
    }
    Ok(())
}

/// Mapping from each definition to its direct dependencies
pub fn dependencies_map(table: &DefinitionTable) -> Result<AdjacencyMap> {
    table
        .iter()
        .map(|(id, node)| {
            let deps = shallow_dependencies(node).map_err(|e| SchemaError::DependencyAnalysis {
                id: id.clone(),
                source: Box::new(e),
            })?;
            Ok((id.clone(), deps))
        })
        .collect()
}

/// Mapping from each definition to the definitions that reference it directly.
///
/// Definitions nobody references have no entry.
pub fn dependents_map(table: &DefinitionTable) -> Result<AdjacencyMap> {
    let mut dependents = AdjacencyMap::new();

    for (id, deps) in dependencies_map(table)? {
        for dependency in deps {
            dependents.entry(dependency).or_default().insert(id.clone());
        }
    }

    Ok(dependents)
}

// =============================================================================
// Dependency Tree
// =============================================================================

/// A node in the deep dependency tree
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyNode {
    Tree(DependencyTree),
    /// The definition is already on the current path
    Recurse,
}

/// Definition → its own dependencies, recursively
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyTree(pub IndexMap<DefinitionId, DependencyNode>);

impl DependencyTree {
    pub fn get(&self, id: &str) -> Option<&DependencyNode> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn merge(&mut self, other: DependencyTree) {
        self.0.extend(other.0);
    }
}

impl Serialize for DependencyTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Serialize for DependencyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DependencyNode::Tree(tree) => tree.serialize(serializer),
            DependencyNode::Recurse => serializer.serialize_str("recurse"),
        }
    }
}

/// Build the dependency tree rooted at `root_id`.
///
/// A definition that reappears on its own path is truncated with
/// [`DependencyNode::Recurse`]; independent branches expand it again.
pub fn dependency_tree(table: &DefinitionTable, root_id: &str) -> Result<DependencyTree> {
    let root = table
        .get(root_id)
        .ok_or_else(|| SchemaError::missing(root_id))?;

    let mut visited = Visited::path_from(root_id);
    let subtree = deps_deep(root, table, &mut visited)?;

    let mut tree = DependencyTree::default();
    tree.0.insert(root_id.to_string(), DependencyNode::Tree(subtree));
    Ok(tree)
}

fn deps_deep(node: &SchemaNode, table: &DefinitionTable, visited: &mut Visited) -> Result<DependencyTree> {
    let mut tree = DependencyTree::default();

    match &node.shape {
        SchemaShape::Reference(target) => {
            if visited.enter(target) == Visit::Revisit {
                tree.0.insert(target.clone(), DependencyNode::Recurse);
                return Ok(tree);
            }
            let resolved = match table.get(target) {
                Some(resolved) => resolved,
                None => {
                    visited.leave(target);
                    return Err(SchemaError::missing(target.clone()));
                }
            };
            let subtree = deps_deep(resolved, table, visited);
            visited.leave(target);
            tree.0.insert(target.clone(), DependencyNode::Tree(subtree?));
        }
        SchemaShape::Array(array) => return deps_deep(&array.items, table, visited),
        SchemaShape::Object(object) => {
            for prop in object.properties.values() {
                tree.merge(deps_deep(prop, table, visited)?);
            }
            if let AdditionalProperties::Schema(additional) = &object.additional_properties {
                tree.merge(deps_deep(additional, table, visited)?);
            }
        }
        SchemaShape::Combinator(combinator) => {
            for member in &combinator.members {
                tree.merge(deps_deep(member, table, visited)?);
            }
        }
        SchemaShape::Primitive(_) => {}
        SchemaShape::Unsupported(construct) => {
            return Err(SchemaError::unsupported(construct.clone()));
        }
        SchemaShape::Malformed(message) => {
            return Err(SchemaError::Format(message.clone()));
        }
    }

    Ok(tree)
}
