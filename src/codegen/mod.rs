//! Code Generation
//!
//! Turns schema nodes into `@effect/schema` TypeScript expressions.
//!
//! Architecture:
//! - GenerationContext: read-only inputs for one definition (table, hooks, ordering)
//! - GenResult: value returned by every generator step, merged as results compose
//! - Emitter (`effect`): one generator per node shape, dispatched exhaustively
//!
//! Generators never mutate their input. Transforms such as field reordering
//! produce new nodes before generation starts.

pub mod effect;
pub mod hooks;
pub mod names;

pub use effect::{generate, generate_fields};
pub use hooks::{
    Constraint, ConstraintSet, GenerationHooks, HookOutput, HookRule, OptionalFieldRepresentation,
    SchemaHook,
};
pub use names::{encode_identifier, property_name};

use indexmap::IndexSet;

use crate::graph::TopologicalOrder;
use crate::schema::{DefinitionId, DefinitionTable, SchemaNode};

// =============================================================================
// GenResult
// =============================================================================

/// Documentation extracted from a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub format: Option<String>,
}

impl DocMeta {
    pub fn from_node(node: &SchemaNode) -> Self {
        Self {
            title: node.annotations.title.clone(),
            description: node.annotations.description.clone(),
            deprecated: node.annotations.deprecated,
            format: node.format().map(String::from),
        }
    }

    /// Render as `(block, inline)`: a `/** */` block from the description and
    /// deprecation flag, and a `//` line comment from the title. Empty parts
    /// render as empty strings.
    pub fn to_comments(&self) -> (String, String) {
        let long = self.description.as_deref().unwrap_or("");
        let deprecated = if self.deprecated { "@deprecated" } else { "" };
        let block = format!("{long}\n{deprecated}");
        let block = block.trim();

        let inline = self
            .title
            .as_deref()
            .unwrap_or("")
            .split('\n')
            .collect::<Vec<_>>()
            .join(" ");
        let inline = inline.trim();

        (
            if block.is_empty() { String::new() } else { format!("/** {block} */") },
            if inline.is_empty() { String::new() } else { format!("// {inline}") },
        )
    }
}

/// Output of one generator step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenResult {
    pub code: String,
    /// Referenced definitions, first-seen order, no duplicates
    pub refs: IndexSet<DefinitionId>,
    pub docs: DocMeta,
}

impl GenResult {
    pub fn new(code: impl Into<String>, docs: DocMeta) -> Self {
        Self { code: code.into(), refs: IndexSet::new(), docs }
    }

    pub fn with_refs<I: IntoIterator<Item = DefinitionId>>(mut self, refs: I) -> Self {
        self.refs.extend(refs);
        self
    }
}

/// Order-preserving union of ref sets
pub fn combine_refs<'a, I>(sets: I) -> IndexSet<DefinitionId>
where
    I: IntoIterator<Item = &'a IndexSet<DefinitionId>>,
{
    sets.into_iter().flatten().cloned().collect()
}

/// One element renders as itself, more as `pipe(a, b, ...)`
pub fn generate_pipe(pipe: &[String]) -> String {
    match pipe {
        [] => String::new(),
        [single] => single.clone(),
        _ => format!("pipe({})", pipe.join(", ")),
    }
}

// =============================================================================
// Generation Context
// =============================================================================

/// Answers "is this definition already emitted?" for reference rendering
#[derive(Debug, Clone, Copy)]
pub enum ReferenceOrdering<'a> {
    /// Every reference renders directly
    Unordered,
    /// Positions in a topological order, relative to the definition being generated
    Topological {
        order: &'a TopologicalOrder,
        current: &'a str,
    },
}

impl ReferenceOrdering<'_> {
    pub fn is_ordered_before(&self, id: &str) -> bool {
        match self {
            ReferenceOrdering::Unordered => true,
            ReferenceOrdering::Topological { order, current } => order.is_before(id, current),
        }
    }
}

/// Inputs shared by every generator call for one definition
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub table: &'a DefinitionTable,
    pub hooks: &'a GenerationHooks,
    pub ordering: ReferenceOrdering<'a>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(table: &'a DefinitionTable, hooks: &'a GenerationHooks) -> Self {
        Self { table, hooks, ordering: ReferenceOrdering::Unordered }
    }

    pub fn with_ordering(self, ordering: ReferenceOrdering<'a>) -> Self {
        Self { ordering, ..self }
    }

    pub fn is_ordered_before(&self, id: &str) -> bool {
        self.ordering.is_ordered_before(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_to_code() {
        let docs = DocMeta {
            title: Some("Short\ntitle".into()),
            description: Some("Long description".into()),
            deprecated: true,
            format: None,
        };
        let (block, inline) = docs.to_comments();
        assert_eq!(block, "/** Long description\n@deprecated */");
        assert_eq!(inline, "// Short title");

        let (block, inline) = DocMeta::default().to_comments();
        assert!(block.is_empty());
        assert!(inline.is_empty());
    }

    #[test]
    fn test_deprecated_only() {
        let docs = DocMeta { deprecated: true, ..Default::default() };
        assert_eq!(docs.to_comments().0, "/** @deprecated */");
    }

    #[test]
    fn test_generate_pipe() {
        assert_eq!(generate_pipe(&["S.String".to_string()]), "S.String");
        assert_eq!(
            generate_pipe(&["S.String".to_string(), "S.minLength(1)".to_string()]),
            "pipe(S.String, S.minLength(1))"
        );
    }

    #[test]
    fn test_combine_refs_preserves_first_seen() {
        let a: IndexSet<DefinitionId> = ["B", "A"].into_iter().map(String::from).collect();
        let b: IndexSet<DefinitionId> = ["A", "C"].into_iter().map(String::from).collect();
        let combined = combine_refs([&a, &b]);
        assert_eq!(combined.into_iter().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    }
}
