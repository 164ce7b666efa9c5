//! Generation Hooks
//!
//! Caller-supplied overrides for default code generation. A hook receives the
//! node and either declines (`None`) or returns replacement code plus the
//! constraints its output already enforces, so they are not rendered twice.
//!
//! Hooks come from two places: closures registered in code, and declarative
//! [`HookRule`]s from the generation spec file.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{DocMeta, GenResult};
use crate::schema::{DefinitionId, PrimitiveKind, PrimitiveShape, SchemaNode, SchemaShape};

/// A generation hook
pub type SchemaHook = Arc<dyn Fn(&SchemaNode) -> Option<HookOutput> + Send + Sync>;

/// A primitive constraint that default generation would render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constraint {
    Format,
    Pattern,
    MinLength,
    MaxLength,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
}

/// Constraints subsumed by a hook's output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet(HashSet<Constraint>);

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, constraint: Constraint) -> bool {
        self.0.insert(constraint)
    }

    pub fn contains(&self, constraint: Constraint) -> bool {
        self.0.contains(&constraint)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Replacement produced by a hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOutput {
    pub result: GenResult,
    pub consumed: ConstraintSet,
}

impl HookOutput {
    pub fn new(result: GenResult) -> Self {
        Self { result, consumed: ConstraintSet::new() }
    }

    pub fn consuming<I: IntoIterator<Item = Constraint>>(mut self, constraints: I) -> Self {
        self.consumed = constraints.into_iter().collect();
        self
    }
}

/// How non-required object fields are wrapped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalFieldRepresentation {
    /// `S.optional(x)`
    #[default]
    Plain,
    /// `S.optional(S.NullOr(x))`
    Nullish,
}

// =============================================================================
// Hook Registry
// =============================================================================

#[derive(Clone, Default)]
pub struct GenerationHooks {
    /// Consulted for primitive and object nodes before default generation
    schema: Option<SchemaHook>,
    primitives: HashMap<PrimitiveKind, SchemaHook>,
    pub optional_fields: OptionalFieldRepresentation,
}

impl fmt::Debug for GenerationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.primitives.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("GenerationHooks")
            .field("schema", &self.schema.is_some())
            .field("primitives", &kinds)
            .field("optional_fields", &self.optional_fields)
            .finish()
    }
}

impl GenerationHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SchemaNode) -> Option<HookOutput> + Send + Sync + 'static,
    {
        self.schema = Some(Arc::new(hook));
        self
    }

    pub fn with_primitive_hook<F>(mut self, kind: PrimitiveKind, hook: F) -> Self
    where
        F: Fn(&SchemaNode) -> Option<HookOutput> + Send + Sync + 'static,
    {
        self.primitives.insert(kind, Arc::new(hook));
        self
    }

    pub fn with_optional_fields(mut self, representation: OptionalFieldRepresentation) -> Self {
        self.optional_fields = representation;
        self
    }

    /// Build hooks from declarative rules, tried in declaration order per kind
    pub fn from_rules(rules: &[HookRule], optional_fields: OptionalFieldRepresentation) -> Self {
        let mut hooks = Self::new().with_optional_fields(optional_fields);

        let mut by_kind: HashMap<PrimitiveKind, Vec<HookRule>> = HashMap::new();
        for rule in rules {
            by_kind.entry(rule.kind).or_default().push(rule.clone());
        }

        for (kind, rules) in by_kind {
            hooks = hooks.with_primitive_hook(kind, move |node| {
                rules.iter().find(|rule| rule.matches(node)).map(|rule| rule.apply(node))
            });
        }

        hooks
    }

    pub fn run_schema_hook(&self, node: &SchemaNode) -> Option<HookOutput> {
        self.schema.as_ref().and_then(|hook| hook(node))
    }

    pub fn run_primitive_hook(&self, kind: PrimitiveKind, node: &SchemaNode) -> Option<HookOutput> {
        self.primitives.get(&kind).and_then(|hook| hook(node))
    }
}

// =============================================================================
// Declarative Rules
// =============================================================================

/// Spec-file hook: when a primitive of `kind` matches every given matcher,
/// render `code` instead of the default pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookRule {
    pub kind: PrimitiveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    pub code: String,
    /// Definitions the replacement code refers to (resolved to imports)
    #[serde(default)]
    pub refs: Vec<DefinitionId>,
    #[serde(default)]
    pub consumes: Vec<Constraint>,
}

impl HookRule {
    pub fn matches(&self, node: &SchemaNode) -> bool {
        let SchemaShape::Primitive(primitive) = &node.shape else {
            return false;
        };
        primitive.kind == self.kind && self.matches_constraints(primitive)
    }

    fn matches_constraints(&self, primitive: &PrimitiveShape) -> bool {
        fn matcher<T: PartialEq>(expected: &Option<T>, actual: &Option<T>) -> bool {
            expected.is_none() || expected == actual
        }

        matcher(&self.format, &primitive.format)
            && matcher(&self.pattern, &primitive.pattern)
            && matcher(&self.min_length, &primitive.min_length)
            && matcher(&self.max_length, &primitive.max_length)
            && matcher(&self.minimum, &primitive.minimum)
            && matcher(&self.maximum, &primitive.maximum)
    }

    fn apply(&self, node: &SchemaNode) -> HookOutput {
        let result = GenResult::new(self.code.clone(), DocMeta::from_node(node)).with_refs(self.refs.iter().cloned());
        HookOutput::new(result).consuming(self.consumes.iter().copied())
    }
}
