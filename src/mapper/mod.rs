//! # Operation Body Mapper
//!
//! Aligns the fragments of two operation bodies. Matching runs in phases so
//! that confident matches are locked in before weaker ones compete for the
//! same fragments: exact leaves, exact composites, replacement leaves,
//! replacement composites, then structural composites. Inside a phase,
//! candidates are assigned greedily by cost.

pub mod replacement;
pub mod variables;

use crate::config::DiffConfig;
use crate::fragment::{CodeFragment, FragmentId, OperationBody, Shape};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub use replacement::{ParameterBinding, Replacement, ReplacementContext, ReplacementType};
pub use variables::VariableDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Exact,
    Replacement,
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub before: FragmentId,
    pub after: FragmentId,
    pub kind: MappingKind,
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, Default)]
pub struct BodyMapping {
    /// Statement mappings in before pre-order; the controlling expressions
    /// of a mapped composite follow it
    pub mappings: Vec<Mapping>,
    pub unmapped_before_leaves: Vec<FragmentId>,
    pub unmapped_after_leaves: Vec<FragmentId>,
    pub unmapped_before_composites: Vec<FragmentId>,
    pub unmapped_after_composites: Vec<FragmentId>,
    /// `2 * mapped / (before statements + after statements)`
    pub ratio: f64,
    pub variables: VariableDelta,
}

impl BodyMapping {
    pub fn after_of(&self, before: FragmentId) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.before == before)
    }

    pub fn before_of(&self, after: FragmentId) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.after == after)
    }

    pub fn replacements(&self) -> impl Iterator<Item = &Replacement> {
        self.mappings.iter().flat_map(|m| m.replacements.iter())
    }

    pub fn has_replacement(&self, kind: ReplacementType, before: &str, after: &str) -> bool {
        self.replacements()
            .any(|r| r.kind == kind && r.before == before && r.after == after)
    }

    /// Every statement mapped exactly and nothing left over
    pub fn is_identical(&self) -> bool {
        self.unmapped_before_leaves.is_empty()
            && self.unmapped_after_leaves.is_empty()
            && self.unmapped_before_composites.is_empty()
            && self.unmapped_after_composites.is_empty()
            && self.mappings.iter().all(|m| m.kind == MappingKind::Exact)
    }
}

type Cost = (usize, usize, usize, usize, usize, usize);

struct Candidate {
    before: FragmentId,
    after: FragmentId,
    kind: MappingKind,
    replacements: Vec<Replacement>,
    cost: Cost,
}

pub struct BodyMapper<'a> {
    before: &'a OperationBody,
    after: &'a OperationBody,
    before_scope: Option<HashSet<FragmentId>>,
    after_scope: Option<HashSet<FragmentId>>,
    binding: ParameterBinding,
    receivers: &'static [&'static str],
    max_replacements: usize,
}

impl<'a> BodyMapper<'a> {
    pub fn new(
        before: &'a OperationBody,
        after: &'a OperationBody,
        receivers: &'static [&'static str],
        config: &DiffConfig,
    ) -> Self {
        Self {
            before,
            after,
            before_scope: None,
            after_scope: None,
            binding: ParameterBinding::default(),
            receivers,
            max_replacements: config.max_replacements,
        }
    }

    /// Only consider these before fragments
    pub fn restrict_before(mut self, ids: impl IntoIterator<Item = FragmentId>) -> Self {
        self.before_scope = Some(ids.into_iter().collect());
        self
    }

    pub fn restrict_after(mut self, ids: impl IntoIterator<Item = FragmentId>) -> Self {
        self.after_scope = Some(ids.into_iter().collect());
        self
    }

    pub fn with_binding(mut self, binding: ParameterBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn map(&self) -> BodyMapping {
        let before_order = positions(self.before);
        let after_order = positions(self.after);
        let in_before = |id: &FragmentId| self.before_scope.as_ref().is_none_or(|s| s.contains(id));
        let in_after = |id: &FragmentId| self.after_scope.as_ref().is_none_or(|s| s.contains(id));

        let before_leaves: Vec<FragmentId> =
            self.before.leaves().into_iter().filter(|id| in_before(id)).collect();
        let after_leaves: Vec<FragmentId> =
            self.after.leaves().into_iter().filter(|id| in_after(id)).collect();
        let before_composites: Vec<FragmentId> =
            self.before.composites().into_iter().filter(|id| in_before(id)).collect();
        let after_composites: Vec<FragmentId> =
            self.after.composites().into_iter().filter(|id| in_after(id)).collect();

        let mut state = MatchState::default();
        let context = ReplacementContext {
            before_body: self.before,
            after_body: self.after,
            binding: &self.binding,
            receivers: self.receivers,
            max_replacements: self.max_replacements,
        };

        // Exact
        for (before_ids, after_ids) in [
            (&before_leaves, &after_leaves),
            (&before_composites, &after_composites),
        ] {
            let candidates = self.candidates(
                before_ids,
                after_ids,
                &state,
                &before_order,
                &after_order,
                |b, a| (b.text == a.text).then(|| (MappingKind::Exact, Vec::new(), 0)),
            );
            state.assign(candidates);
        }

        // Replacement
        for (before_ids, after_ids) in [
            (&before_leaves, &after_leaves),
            (&before_composites, &after_composites),
        ] {
            let candidates = self.candidates(
                before_ids,
                after_ids,
                &state,
                &before_order,
                &after_order,
                |b, a| {
                    replacement::find_replacements(b, a, &context).map(|r| {
                        let count = r.len();
                        (MappingKind::Replacement, r, count)
                    })
                },
            );
            state.assign(candidates);
        }

        // Structural: same kind and nesting path, with some evidence that
        // the two statements occupy the same place
        let candidates = self.candidates(
            &before_composites,
            &after_composites,
            &state,
            &before_order,
            &after_order,
            |b, a| {
                let same_path =
                    self.before.ancestor_kinds(b.id) == self.after.ancestor_kinds(a.id);
                let shared = self.shared_descendants(b.id, a.id, &state);
                let parents_mapped = match (b.parent, a.parent) {
                    (Some(pb), Some(pa)) => {
                        parent_statement_pair(self.before, self.after, pb, pa, &state)
                    }
                    _ => false,
                };
                (same_path && (shared > 0 || (parents_mapped && b.index == a.index)))
                    .then(|| (MappingKind::Structural, Vec::new(), 0))
            },
        );
        state.assign(candidates);

        let mut mappings: Vec<(usize, usize, Mapping)> = state
            .mappings
            .into_iter()
            .map(|m| (before_order.get(&m.before).copied().unwrap_or(usize::MAX), 0, m))
            .collect();

        // Controlling expressions of mapped composites, pairwise by index
        let mut expression_mappings = Vec::new();
        for (position, _, mapping) in &mappings {
            let before = self.before.get(mapping.before);
            let after = self.after.get(mapping.after);
            for (index, (eb, ea)) in before.expressions.iter().zip(&after.expressions).enumerate() {
                let (eb, ea) = (self.before.get(*eb), self.after.get(*ea));
                let (kind, replacements) = if eb.text == ea.text {
                    (MappingKind::Exact, Vec::new())
                } else if let Some(r) = replacement::find_replacements(eb, ea, &context) {
                    (MappingKind::Replacement, r)
                } else {
                    (MappingKind::Structural, Vec::new())
                };
                expression_mappings.push((
                    *position,
                    index + 1,
                    Mapping {
                        before: eb.id,
                        after: ea.id,
                        kind,
                        replacements,
                    },
                ));
            }
        }
        let statement_mappings = mappings.len();
        mappings.extend(expression_mappings);
        mappings.sort_by_key(|(position, sub, _)| (*position, *sub));
        let mappings: Vec<Mapping> = mappings.into_iter().map(|(_, _, m)| m).collect();

        let mapped_before: HashSet<FragmentId> = mappings.iter().map(|m| m.before).collect();
        let mapped_after: HashSet<FragmentId> = mappings.iter().map(|m| m.after).collect();
        let unmapped = |ids: &[FragmentId], mapped: &HashSet<FragmentId>| -> Vec<FragmentId> {
            ids.iter().copied().filter(|id| !mapped.contains(id)).collect()
        };

        let total = before_leaves.len()
            + before_composites.len()
            + after_leaves.len()
            + after_composites.len();
        let ratio = if total == 0 {
            1.0
        } else {
            2.0 * statement_mappings as f64 / total as f64
        };

        let variables = variables::compute(self.before, self.after, &mappings);
        BodyMapping {
            unmapped_before_leaves: unmapped(&before_leaves, &mapped_before),
            unmapped_after_leaves: unmapped(&after_leaves, &mapped_after),
            unmapped_before_composites: unmapped(&before_composites, &mapped_before),
            unmapped_after_composites: unmapped(&after_composites, &mapped_after),
            mappings,
            ratio,
            variables,
        }
    }

    /// Every unmapped (before, after) pair of the same kind that `accept`
    /// admits, with its cost
    fn candidates(
        &self,
        before_ids: &[FragmentId],
        after_ids: &[FragmentId],
        state: &MatchState,
        before_order: &HashMap<FragmentId, usize>,
        after_order: &HashMap<FragmentId, usize>,
        accept: impl Fn(&CodeFragment, &CodeFragment) -> Option<(MappingKind, Vec<Replacement>, usize)>,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for &b in before_ids.iter().filter(|b| !state.before.contains(b)) {
            let before = self.before.get(b);
            for &a in after_ids.iter().filter(|a| !state.after.contains(a)) {
                let after = self.after.get(a);
                if before.kind != after.kind {
                    continue;
                }
                let Some((kind, replacements, penalty)) = accept(before, after) else {
                    continue;
                };
                let shared = if before.shape == Shape::Composite {
                    self.shared_descendants(b, a, state)
                } else {
                    0
                };
                let cost = (
                    penalty,
                    usize::MAX - shared,
                    before.depth.abs_diff(after.depth),
                    before.index.abs_diff(after.index),
                    before_order.get(&b).copied().unwrap_or(usize::MAX),
                    after_order.get(&a).copied().unwrap_or(usize::MAX),
                );
                candidates.push(Candidate {
                    before: b,
                    after: a,
                    kind,
                    replacements,
                    cost,
                });
            }
        }
        candidates
    }

    /// Descendants of `before` already mapped to descendants of `after`
    fn shared_descendants(&self, before: FragmentId, after: FragmentId, state: &MatchState) -> usize {
        let after_descendants: HashSet<FragmentId> =
            self.after.descendants(after).into_iter().collect();
        self.before
            .descendants(before)
            .into_iter()
            .filter_map(|d| state.pairs.get(&d))
            .filter(|a| after_descendants.contains(a))
            .count()
    }
}

/// Whether the nearest non-block ancestors of two fragments are mapped to
/// each other (two root blocks count as mapped)
fn parent_statement_pair(
    before: &OperationBody,
    after: &OperationBody,
    before_parent: FragmentId,
    after_parent: FragmentId,
    state: &MatchState,
) -> bool {
    let statement = |body: &OperationBody, mut id: FragmentId| -> Option<FragmentId> {
        loop {
            let fragment = body.get(id);
            if !fragment.is_block() {
                return Some(id);
            }
            id = fragment.parent?;
        }
    };
    match (
        statement(before, before_parent),
        statement(after, after_parent),
    ) {
        (None, None) => true,
        (Some(b), Some(a)) => state.pairs.get(&b) == Some(&a),
        _ => false,
    }
}

fn positions(body: &OperationBody) -> HashMap<FragmentId, usize> {
    body.preorder()
        .into_iter()
        .enumerate()
        .map(|(position, id)| (id, position))
        .collect()
}

#[derive(Default)]
struct MatchState {
    before: HashSet<FragmentId>,
    after: HashSet<FragmentId>,
    pairs: HashMap<FragmentId, FragmentId>,
    mappings: Vec<Mapping>,
}

impl MatchState {
    /// Greedy assignment by ascending cost
    fn assign(&mut self, mut candidates: Vec<Candidate>) {
        candidates.sort_by_key(|c| c.cost);
        for candidate in candidates {
            if self.before.contains(&candidate.before) || self.after.contains(&candidate.after) {
                continue;
            }
            self.before.insert(candidate.before);
            self.after.insert(candidate.after);
            self.pairs.insert(candidate.before, candidate.after);
            self.mappings.push(Mapping {
                before: candidate.before,
                after: candidate.after,
                kind: candidate.kind,
                replacements: candidate.replacements,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_source;
    use crate::model::{Model, ModelBuilder};
    use crate::observe::NoopObserver;

    fn model(source: &str) -> Model {
        let unit = parse_source("m.py", source).expect("parse");
        ModelBuilder::new(&NoopObserver).build(&unit)
    }

    fn map(before: &Model, after: &Model) -> BodyMapping {
        let b = &before.classes[0].operations[0].body;
        let a = &after.classes[0].operations[0].body;
        BodyMapper::new(b, a, &["self", "cls"], &DiffConfig::default()).map()
    }

    #[test]
    fn test_identical_bodies_map_exactly() {
        let source = "def f(x):\n    if x:\n        return 1\n    return 2\n";
        let mapping = map(&model(source), &model(source));
        assert!(mapping.is_identical());
        assert_eq!(mapping.ratio, 1.0);
    }

    #[test]
    fn test_reordered_statements_map_exactly() {
        let before = model("def f():\n    a = 1\n    b = 2\n    return a + b\n");
        let after = model("def f():\n    b = 2\n    a = 1\n    return a + b\n");
        let mapping = map(&before, &after);
        assert!(mapping.mappings.iter().all(|m| m.kind == MappingKind::Exact));
        assert!(mapping.unmapped_before_leaves.is_empty());
    }

    #[test]
    fn test_variable_to_field_replacement() {
        let before = model("class C:\n    def f(self, amount):\n        rate = 0.1\n        return amount * rate\n");
        let after = model("class C:\n    def f(self, amount):\n        return amount * self.rate\n");
        let mapping = map(&before, &after);
        assert!(mapping.has_replacement(ReplacementType::VariableToField, "rate", "self.rate"));
        assert_eq!(mapping.unmapped_before_leaves.len(), 1);
        assert_eq!(mapping.variables.removed.len(), 1);
    }

    #[test]
    fn test_changed_condition_keeps_composite_aligned() {
        let before = model("def f(x):\n    if x > 1:\n        log(x)\n        return x\n");
        let after = model("def f(x):\n    if check(x):\n        log(x)\n        return x\n");
        let mapping = map(&before, &after);
        assert!(mapping.unmapped_before_composites.is_empty());
        assert!(mapping.unmapped_after_composites.is_empty());
    }

    #[test]
    fn test_same_name_loops_stay_distinct() {
        let source = "def f(a, b):\n    for i in a:\n        print(i)\n    for i in b:\n        print(i)\n";
        let mapping = map(&model(source), &model(source));
        assert_eq!(mapping.variables.common.len(), 4);
        let body = &model(source).classes[0].operations[0].body;
        let loops: Vec<_> = body.declarations_named("i").collect();
        assert_eq!(loops.len(), 2);
        assert!(!loops[0].scope.overlaps(&loops[1].scope));
        for (b, a) in &mapping.variables.common {
            assert_eq!(body.declaration(*b).scope, body.declaration(*a).scope);
        }
    }

    #[test]
    fn test_renamed_local() {
        let before = model("def f(x):\n    total = x + 1\n    return total\n");
        let after = model("def f(x):\n    result = x + 1\n    return result\n");
        let mapping = map(&before, &after);
        assert_eq!(mapping.variables.renamed.len(), 1);
        assert!(mapping.variables.removed.is_empty());
    }
}
