//! Inference rules, one module per family. Each rule is a pair of plain
//! functions: `candidates` proposes slices of the diff in a deterministic
//! order, `infer` turns one slice into a refactoring or rejects it.

pub mod annotation;
pub mod attribute;
pub mod class;
pub mod extraction;
pub mod inheritance;
pub mod merge_split;
pub mod operation;
pub mod parameter;
pub mod variable;

use super::engine::{InferenceContext, PairView};
use crate::mapper::replacement::identifiers;
use crate::mapper::{BodyMapping, Replacement};
use crate::model::Operation;

/// Last identifier of an expression: `email` for `self.profile.email`
pub(crate) fn last_identifier(text: &str) -> Option<&str> {
    identifiers(text).last().copied()
}

/// Replacements of every mapped operation pair, in pair order
pub(crate) fn all_replacements<'c>(
    pairs: &'c [PairView<'c, '_>],
) -> impl Iterator<Item = &'c Replacement> {
    pairs.iter().flat_map(|p| p.mapping.replacements())
}

/// Operation pairs whose before side belongs to `class_name`
pub(crate) fn pairs_of_class<'c, 'm>(
    context: &'c InferenceContext<'m>,
    class_name: &str,
) -> Vec<PairView<'c, 'm>> {
    context
        .operation_pairs()
        .into_iter()
        .filter(|p| p.before.class_name == class_name)
        .collect()
}

/// Arguments of the first call to `callee` in `caller`, when the call goes
/// through no receiver, the implicit receiver or the class name
pub(crate) fn call_arguments(caller: &Operation, callee: &Operation) -> Option<Vec<String>> {
    let receivers = super::engine::receivers_of(caller);
    let class_name = callee
        .class_name
        .rsplit('.')
        .next()
        .unwrap_or(&callee.class_name);
    caller
        .body
        .fragments
        .iter()
        .flat_map(|f| f.facts.invocations.iter())
        .find(|i| {
            i.name == callee.name
                && i.receiver
                    .as_deref()
                    .is_none_or(|r| receivers.contains(&r) || r == class_name)
        })
        .map(|i| i.arguments.clone())
}

/// Whether the mapping pairs a before fragment mentioning `before` with an
/// after fragment mentioning `after` through some replacement
pub(crate) fn replaced(mapping: &BodyMapping, before: &str, after: &str) -> bool {
    mapping.replacements().any(|r| {
        identifiers(&r.before).contains(&before) && identifiers(&r.after).contains(&after)
    })
}
