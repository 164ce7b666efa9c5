//! Topological Ordering
//!
//! Orders definitions so that each appears before its dependents wherever the
//! reference graph allows it. Every definition appears exactly once; definitions
//! that can reach themselves are flagged `circular`.

use std::collections::HashMap;

use serde::Serialize;

use super::cycles::{Visit, Visited};
use super::deps::dependents_map;
use super::ReferenceGraph;
use crate::error::Result;
use crate::schema::{DefinitionId, DefinitionTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEntry {
    pub id: DefinitionId,
    pub circular: bool,
}

/// Ordered definitions plus a position index
#[derive(Debug, Clone, Default)]
pub struct TopologicalOrder {
    entries: Vec<OrderEntry>,
    positions: HashMap<DefinitionId, usize>,
}

impl TopologicalOrder {
    fn new(entries: Vec<OrderEntry>) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.id.clone(), i))
            .collect();
        Self { entries, positions }
    }

    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = &DefinitionId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn is_circular(&self, id: &str) -> bool {
        self.position(id).is_some_and(|i| self.entries[i].circular)
    }

    /// Whether `target` is emitted strictly before `current`.
    ///
    /// Ids missing from the order never need deferral and count as ordered.
    pub fn is_before(&self, target: &str, current: &str) -> bool {
        match (self.position(target), self.position(current)) {
            (Some(target), Some(current)) => target < current,
            _ => true,
        }
    }
}

/// Depth-first over dependents, prepending each definition once everything
/// that depends on it has been placed.
pub fn topological_order(table: &DefinitionTable) -> Result<TopologicalOrder> {
    let dependents = dependents_map(table)?;
    let graph = ReferenceGraph::from_table(table)?;

    let mut visited = Visited::global();
    let mut post_order: Vec<&str> = Vec::with_capacity(table.len());

    for id in table.keys() {
        if visited.enter(id) == Visit::Revisit {
            continue;
        }

        // (definition, index of the next dependent to visit)
        let mut stack: Vec<(&str, usize)> = vec![(id.as_str(), 0)];
        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            let next = dependents.get(current).and_then(|d| d.get_index(frame.1));
            frame.1 += 1;

            match next {
                Some(dependent) => {
                    if visited.enter(dependent) == Visit::First {
                        stack.push((dependent.as_str(), 0));
                    }
                }
                None => {
                    post_order.push(current);
                    stack.pop();
                }
            }
        }
    }

    let entries = post_order
        .into_iter()
        .rev()
        .map(|id| OrderEntry { id: id.to_string(), circular: graph.is_circular(id) })
        .collect();

    Ok(TopologicalOrder::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::{PrimitiveKind, SchemaNode, SchemaShape};

    fn table(entries: Vec<(&str, SchemaNode)>) -> DefinitionTable {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn ids(order: &TopologicalOrder) -> Vec<&str> {
        order.ids().map(String::as_str).collect()
    }

    #[test]
    fn test_dependency_before_dependent() {
        let t = table(vec![
            ("A", SchemaNode::reference("B")),
            ("B", SchemaNode::primitive(PrimitiveKind::String)),
        ]);
        let order = topological_order(&t).unwrap();
        assert_eq!(ids(&order), vec!["B", "A"]);
        assert!(order.entries().iter().all(|e| !e.circular));
        assert!(order.is_before("B", "A"));
        assert!(!order.is_before("A", "B"));
    }

    #[test]
    fn test_diamond_is_acyclic() {
        let t = table(vec![
            ("Top", SchemaNode::object(
                [("l", SchemaNode::reference("Left")), ("r", SchemaNode::reference("Right"))],
                &[],
            )),
            ("Left", SchemaNode::reference("Bottom")),
            ("Right", SchemaNode::reference("Bottom")),
            ("Bottom", SchemaNode::primitive(PrimitiveKind::Integer)),
        ]);
        let order = topological_order(&t).unwrap();

        assert_eq!(order.len(), 4);
        assert!(order.is_before("Bottom", "Left"));
        assert!(order.is_before("Bottom", "Right"));
        assert!(order.is_before("Left", "Top"));
        assert!(order.is_before("Right", "Top"));
        assert!(order.entries().iter().all(|e| !e.circular));
    }

    #[test]
    fn test_mutual_recursion() {
        let t = table(vec![
            ("A", SchemaNode::one_of(vec![SchemaNode::reference("B")])),
            ("B", SchemaNode::one_of(vec![SchemaNode::reference("A")])),
        ]);
        let order = topological_order(&t).unwrap();

        assert_eq!(ids(&order), vec!["A", "B"]);
        assert!(order.is_circular("A"));
        assert!(order.is_circular("B"));
    }

    #[test]
    fn test_every_definition_once() {
        let t = table(vec![
            ("Self", SchemaNode::array(SchemaNode::reference("Self"))),
            ("User", SchemaNode::reference("Self")),
            ("Alone", SchemaNode::primitive(PrimitiveKind::Boolean)),
        ]);
        let order = topological_order(&t).unwrap();
        let mut seen = ids(&order);
        seen.sort();
        assert_eq!(seen, vec!["Alone", "Self", "User"]);
        assert!(order.is_circular("Self"));
        assert!(!order.is_circular("User"));
        assert!(order.is_before("Self", "User"));
    }

    #[test]
    fn test_long_ring_terminates() {
        let n = 10_000;
        let t: DefinitionTable = (0..n)
            .map(|i| (format!("D{i}"), SchemaNode::reference(format!("D{}", (i + 1) % n))))
            .collect();
        let order = topological_order(&t).unwrap();

        assert_eq!(order.len(), n);
        let mut seen = ids(&order);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), n);
        assert!(order.entries().iter().all(|e| e.circular));
    }

    #[test]
    fn test_malformed_reference_fails_with_context() {
        let broken = SchemaNode::new(SchemaShape::Malformed("Refs to nested paths not supported".into()));
        let t = table(vec![("Broken", broken)]);
        let err = topological_order(&t).unwrap_err();
        assert!(matches!(err, SchemaError::DependencyAnalysis { ref id, .. } if id == "Broken"));
    }

    #[test]
    fn test_unknown_ids_count_as_ordered() {
        let order = topological_order(&table(vec![])).unwrap();
        assert!(order.is_empty());
        assert!(order.is_before("Anything", "Else"));
    }

    #[test]
    fn test_unsupported_definition_fails_with_context() {
        let t = table(vec![("Mixed", SchemaNode::new(SchemaShape::Unsupported("MixedSchemaObject".into())))]);
        let err = topological_order(&t).unwrap_err();
        assert!(matches!(err, SchemaError::DependencyAnalysis { ref id, .. } if id == "Mixed"));
        assert!(err.to_string().starts_with("Unable to determine dependents for 'Mixed'"));
    }
}
