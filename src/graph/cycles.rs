//! Cycle Detection Primitive
//!
//! One visited-set with two scopes, shared by the dependency tree (path scope,
//! truncates with a marker), the topological sort (global scope) and the object
//! classifier (path scope, fails hard).

use std::collections::HashSet;

use crate::schema::DefinitionId;

/// How long a visit stays recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitScope {
    /// Only while the definition is on the current traversal path
    Path,
    /// For the whole traversal
    Global,
}

/// Outcome of entering a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    First,
    Revisit,
}

#[derive(Debug, Clone)]
pub struct Visited {
    scope: VisitScope,
    seen: HashSet<DefinitionId>,
}

impl Visited {
    pub fn new(scope: VisitScope) -> Self {
        Self { scope, seen: HashSet::new() }
    }

    pub fn path() -> Self {
        Self::new(VisitScope::Path)
    }

    pub fn global() -> Self {
        Self::new(VisitScope::Global)
    }

    /// Path-scoped set already containing `root`
    pub fn path_from(root: &str) -> Self {
        let mut visited = Self::path();
        visited.enter(root);
        visited
    }

    pub fn scope(&self) -> VisitScope {
        self.scope
    }

    /// Record `id` as visited
    pub fn enter(&mut self, id: &str) -> Visit {
        if self.seen.contains(id) {
            Visit::Revisit
        } else {
            self.seen.insert(id.to_string());
            Visit::First
        }
    }

    /// Leave `id` after a [`Visit::First`]; forgets it under path scope
    pub fn leave(&mut self, id: &str) {
        if self.scope == VisitScope::Path {
            self.seen.remove(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_scope_forgets_on_leave() {
        let mut visited = Visited::path();
        assert_eq!(visited.enter("A"), Visit::First);
        assert_eq!(visited.enter("A"), Visit::Revisit);
        visited.leave("A");
        assert_eq!(visited.enter("A"), Visit::First);
    }

    #[test]
    fn test_global_scope_remembers() {
        let mut visited = Visited::global();
        assert_eq!(visited.enter("A"), Visit::First);
        visited.leave("A");
        assert_eq!(visited.enter("A"), Visit::Revisit);
    }

    #[test]
    fn test_path_from_root() {
        let visited = Visited::path_from("Root");
        assert!(visited.contains("Root"));
        assert_eq!(visited.scope(), VisitScope::Path);
    }
}
