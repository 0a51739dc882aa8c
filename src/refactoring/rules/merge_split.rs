//! Merge and Split of attributes, parameters and local variables.
//!
//! Several removed entities merge into one added entity when each of them
//! is related to it, and one removed entity splits when it is related to
//! several added ones. Two entities are related when a mapped statement
//! replaced an expression naming the first with one naming the second.

use super::variable::variables_slice;
use super::{pairs_of_class, replaced};
use crate::fragment::DeclarationId;
use crate::mapper::replacement::identifiers;
use crate::model::Attribute;
use crate::model::variable::VariableRole;
use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, PairView, Subject};
use crate::refactoring::types::{AttributeRef, Refactoring, VariableRef};

fn declaration_slices<'m>(pair: &PairView<'_, 'm>, role: VariableRole) -> Vec<DiffSlice<'m>> {
    let variables = &pair.mapping.variables;
    let removed: Vec<DeclarationId> = variables
        .removed
        .iter()
        .copied()
        .filter(|id| pair.before.body.declaration(*id).role == role)
        .collect();
    let added: Vec<DeclarationId> = variables
        .added
        .iter()
        .copied()
        .filter(|id| pair.after.body.declaration(*id).role == role)
        .collect();
    let related = |b: DeclarationId, a: DeclarationId| {
        replaced(
            pair.mapping,
            &pair.before.body.declaration(b).name,
            &pair.after.body.declaration(a).name,
        )
    };

    let mut slices = Vec::new();
    for a in &added {
        let sources: Vec<DeclarationId> =
            removed.iter().copied().filter(|b| related(*b, *a)).collect();
        if sources.len() >= 2 {
            slices.push(variables_slice(pair.before, pair.after, sources, vec![*a]));
        }
    }
    for b in &removed {
        let targets: Vec<DeclarationId> =
            added.iter().copied().filter(|a| related(*b, *a)).collect();
        if targets.len() >= 2 {
            slices.push(variables_slice(pair.before, pair.after, vec![*b], targets));
        }
    }
    slices
}

/// Every identifier of `part`'s initializer appears in `whole`'s
fn initializer_within(part: &Attribute, whole: &Attribute) -> bool {
    let (Some(part), Some(whole)) = (part.initializer(), whole.initializer()) else {
        return false;
    };
    let part = identifiers(part);
    let whole = identifiers(whole);
    !part.is_empty() && part.len() < whole.len() && part.iter().all(|i| whole.contains(i))
}

fn attribute_slices<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for class in &context.diff.common_classes {
        let pairs = pairs_of_class(context, &class.before.qualified_name());
        let accessed = |r: &Attribute, a: &Attribute| {
            pairs.iter().any(|p| replaced(p.mapping, &r.name, &a.name))
        };

        for after in class.added_attributes.iter().copied() {
            let sources: Vec<&'m Attribute> = class
                .removed_attributes
                .iter()
                .copied()
                .filter(|r| initializer_within(r, after) || accessed(*r, after))
                .collect();
            if sources.len() >= 2 {
                let mut keys: Vec<DeltaKey> =
                    sources.iter().map(|r| DeltaKey::removed_attribute(r)).collect();
                keys.push(DeltaKey::added_attribute(after));
                slices.push(DiffSlice::new(
                    keys,
                    Subject::AttributeGroups {
                        before: sources,
                        after: vec![after],
                    },
                ));
            }
        }
        for before in class.removed_attributes.iter().copied() {
            let targets: Vec<&'m Attribute> = class
                .added_attributes
                .iter()
                .copied()
                .filter(|a| initializer_within(a, before) || accessed(before, *a))
                .collect();
            if targets.len() >= 2 {
                let mut keys = vec![DeltaKey::removed_attribute(before)];
                keys.extend(targets.iter().map(|a| DeltaKey::added_attribute(a)));
                slices.push(DiffSlice::new(
                    keys,
                    Subject::AttributeGroups {
                        before: vec![before],
                        after: targets,
                    },
                ));
            }
        }
    }
    slices
}

pub fn candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = attribute_slices(context);
    for pair in context.operation_pairs() {
        slices.extend(declaration_slices(&pair, VariableRole::Parameter));
        slices.extend(declaration_slices(&pair, VariableRole::Local));
    }
    slices
}

pub fn infer(slice: &DiffSlice<'_>, _context: &InferenceContext<'_>) -> Option<Refactoring> {
    match &slice.subject {
        Subject::AttributeGroups { before, after } => match (before.as_slice(), after.as_slice()) {
            ([single], many) if many.len() >= 2 => Some(Refactoring::SplitAttribute {
                before: AttributeRef::of(single),
                after: many.iter().map(|a| AttributeRef::of(a)).collect(),
            }),
            (many, [single]) if many.len() >= 2 => Some(Refactoring::MergeAttribute {
                before: many.iter().map(|a| AttributeRef::of(a)).collect(),
                after: AttributeRef::of(single),
            }),
            _ => None,
        },
        Subject::Variables {
            before_operation,
            after_operation,
            before,
            after,
        } => {
            let before_refs: Vec<VariableRef> = before
                .iter()
                .map(|id| {
                    VariableRef::of(before_operation, before_operation.body.declaration(*id))
                })
                .collect();
            let after_refs: Vec<VariableRef> = after
                .iter()
                .map(|id| VariableRef::of(after_operation, after_operation.body.declaration(*id)))
                .collect();
            let role = before_operation.body.declaration(*before.first()?).role;
            let is_parameter = role == VariableRole::Parameter;
            match (before_refs.len(), after_refs.len()) {
                (1, n) if n >= 2 => {
                    let before = before_refs.into_iter().next()?;
                    Some(if is_parameter {
                        Refactoring::SplitParameter {
                            before,
                            after: after_refs,
                        }
                    } else {
                        Refactoring::SplitVariable {
                            before,
                            after: after_refs,
                        }
                    })
                }
                (n, 1) if n >= 2 => {
                    let after = after_refs.into_iter().next()?;
                    Some(if is_parameter {
                        Refactoring::MergeParameter {
                            before: before_refs,
                            after,
                        }
                    } else {
                        Refactoring::MergeVariable {
                            before: before_refs,
                            after,
                        }
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}
