//! Definition Reference Graph
//!
//! Graph analysis over the definition table: dependency extraction, the deep
//! dependency tree, topological ordering with cycle detection, and object-shape
//! classification.
//!
//! [`ReferenceGraph`] is the petgraph view of the table. It is used for strongly
//! connected components (circular definitions) and DOT export.

pub mod classify;
pub mod cycles;
pub mod deps;
pub mod order;

pub use classify::is_object_shaped;
pub use cycles::{Visit, VisitScope, Visited};
pub use deps::{
    dependencies_map, dependency_tree, dependents_map, shallow_dependencies, AdjacencyMap,
    DependencyNode, DependencyTree,
};
pub use order::{topological_order, OrderEntry, TopologicalOrder};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::schema::{DefinitionId, DefinitionTable};

/// Directed graph of definitions; an edge `A -> B` means A references B
pub struct ReferenceGraph {
    graph: DiGraph<DefinitionId, ()>,

    /// Node index lookup: id -> NodeIndex
    node_indices: HashMap<DefinitionId, NodeIndex>,

    /// Circular reference groups (non-trivial SCCs and self-references)
    cycle_groups: Vec<Vec<DefinitionId>>,

    circular: HashSet<DefinitionId>,
}

impl ReferenceGraph {
    /// Build the graph from shallow dependencies.
    ///
    /// References to ids absent from the table are not represented.
    pub fn from_table(table: &DefinitionTable) -> Result<Self> {
        let dependencies = dependencies_map(table)?;

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        for id in table.keys() {
            node_indices.insert(id.clone(), graph.add_node(id.clone()));
        }

        for (id, deps) in &dependencies {
            let from = node_indices[id];
            for dep in deps {
                if let Some(&to) = node_indices.get(dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycle_groups = Vec::new();
        for scc in kosaraju_scc(&graph) {
            let is_cycle = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if !is_cycle {
                continue;
            }
            let mut members: Vec<DefinitionId> = scc.iter().map(|idx| graph[*idx].clone()).collect();
            members.sort_by_key(|id| table.get_index_of(id));
            cycle_groups.push(members);
        }
        cycle_groups.sort_by_key(|group| group.first().and_then(|id| table.get_index_of(id)));

        let circular = cycle_groups.iter().flatten().cloned().collect();

        Ok(Self { graph, node_indices, cycle_groups, circular })
    }

    pub fn definition_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn cycle_groups(&self) -> &[Vec<DefinitionId>] {
        &self.cycle_groups
    }

    /// Whether `id` can reach itself through references
    pub fn is_circular(&self, id: &str) -> bool {
        self.circular.contains(id)
    }

    /// Immediate outgoing references (dependencies)
    pub fn refs_out(&self, id: &str) -> Vec<&DefinitionId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Immediate incoming references (dependents)
    pub fn refs_in(&self, id: &str) -> Vec<&DefinitionId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&DefinitionId> {
        let Some(&node_idx) = self.node_indices.get(id) else {
            return Vec::new();
        };

        let mut ids: Vec<&DefinitionId> = self
            .graph
            .edges_directed(node_idx, direction)
            .filter_map(|e| {
                let other = if direction == Direction::Outgoing { e.target() } else { e.source() };
                self.graph.node_weight(other)
            })
            .collect();
        ids.sort_by_key(|id| self.node_indices.get(*id).map(|idx| idx.index()));
        ids.dedup();
        ids
    }

    /// Export the graph as Graphviz DOT; circular definitions are highlighted
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph Definitions {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        for idx in self.graph.node_indices() {
            let id = &self.graph[idx];
            let color = if self.is_circular(id) { "#F44336" } else { "#E0E0E0" };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                dot_escape(id),
                dot_escape(id),
                color
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()];
            let target = &self.graph[edge.target()];
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", dot_escape(source), dot_escape(target)));
        }

        output.push_str("}\n");
        output
    }
}

/// Definition ids fuzzy-matching `query`, best match first
pub fn search_definitions<'t>(table: &'t DefinitionTable, query: &str, limit: usize) -> Vec<&'t DefinitionId> {
    use fuzzy_matcher::skim::SkimMatcherV2;
    use fuzzy_matcher::FuzzyMatcher;

    let matcher = SkimMatcherV2::default();
    let mut results: Vec<(i64, &DefinitionId)> = table
        .keys()
        .filter_map(|id| matcher.fuzzy_match(id, query).map(|score| (score, id)))
        .collect();

    // Stable sort keeps document order among equal scores
    results.sort_by(|a, b| b.0.cmp(&a.0));
    results.into_iter().take(limit).map(|(_, id)| id).collect()
}

fn dot_escape(id: &str) -> String {
    id.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PrimitiveKind, SchemaNode};

    fn table(entries: Vec<(&str, SchemaNode)>) -> DefinitionTable {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_mutual_recursion_marks_both() {
        let t = table(vec![
            ("A", SchemaNode::one_of(vec![SchemaNode::reference("B")])),
            ("B", SchemaNode::one_of(vec![SchemaNode::reference("A")])),
            ("C", SchemaNode::reference("A")),
        ]);
        let graph = ReferenceGraph::from_table(&t).unwrap();

        assert!(graph.is_circular("A"));
        assert!(graph.is_circular("B"));
        assert!(!graph.is_circular("C"));
        assert_eq!(graph.cycle_groups(), &[vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_search_definitions() {
        let t = table(vec![
            ("PetCategory", SchemaNode::primitive(PrimitiveKind::String)),
            ("Owner", SchemaNode::primitive(PrimitiveKind::String)),
            ("Pet", SchemaNode::primitive(PrimitiveKind::String)),
        ]);
        let found = search_definitions(&t, "pet", 5);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|id| id.starts_with("Pet")));
        assert!(search_definitions(&t, "zzz", 5).is_empty());
        assert_eq!(search_definitions(&t, "pet", 1).len(), 1);
    }

    #[test]
    fn test_self_reference_is_circular() {
        let t = table(vec![
            ("Node", SchemaNode::object([("next", SchemaNode::reference("Node"))], &[])),
            ("Leaf", SchemaNode::primitive(PrimitiveKind::String)),
        ]);
        let graph = ReferenceGraph::from_table(&t).unwrap();
        assert!(graph.is_circular("Node"));
        assert!(!graph.is_circular("Leaf"));
    }

    #[test]
    fn test_refs_in_and_out() {
        let t = table(vec![
            ("A", SchemaNode::object(
                [("b", SchemaNode::reference("B")), ("c", SchemaNode::reference("C"))],
                &[],
            )),
            ("B", SchemaNode::reference("C")),
            ("C", SchemaNode::primitive(PrimitiveKind::String)),
        ]);
        let graph = ReferenceGraph::from_table(&t).unwrap();
        assert_eq!(graph.refs_out("A"), vec!["B", "C"]);
        assert_eq!(graph.refs_in("C"), vec!["A", "B"]);
        assert!(graph.refs_out("Missing").is_empty());
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_dangling_reference_ignored() {
        let t = table(vec![("A", SchemaNode::reference("Gone"))]);
        let graph = ReferenceGraph::from_table(&t).unwrap();
        assert_eq!(graph.definition_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_to_dot() {
        let t = table(vec![
            ("A", SchemaNode::reference("B")),
            ("B", SchemaNode::primitive(PrimitiveKind::String)),
        ]);
        let dot = ReferenceGraph::from_table(&t).unwrap().to_dot();
        assert!(dot.starts_with("digraph Definitions {"));
        assert!(dot.contains("\"A\" -> \"B\";"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
