//! Move Attribute, Rename Attribute, Move And Rename Attribute and Extract
//! Attribute.

use super::{all_replacements, last_identifier, pairs_of_class};
use crate::mapper::ReplacementType;
use crate::model::Attribute;
use crate::model::variable::VariableRole;
use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, Subject, receivers_of};
use crate::refactoring::types::{AttributeRef, Refactoring, VariableRef};

/// Whether some mapped statement swapped an access to `before` for one to
/// `after`
fn has_access_evidence(
    context: &InferenceContext<'_>,
    before: &Attribute,
    after: &Attribute,
) -> bool {
    let pairs = context.operation_pairs();
    all_replacements(&pairs).any(|r| {
        r.before != r.after
            && last_identifier(&r.before) == Some(before.name.as_str())
            && last_identifier(&r.after) == Some(after.name.as_str())
    })
}

/// Related by inheritance: left to the pull-up/push-down rule
fn in_hierarchy(context: &InferenceContext<'_>, before_class: &str, after_class: &str) -> bool {
    let after_model = context.diff.after;
    after_model.is_subtype(before_class, after_class)
        || after_model.is_subtype(after_class, before_class)
}

pub fn move_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let removed = context.diff.removed_attributes();
    let added = context.diff.added_attributes();

    let mut same_name = Vec::new();
    let mut renamed = Vec::new();
    for before in removed.iter().copied() {
        let target = context.diff.after_name_of(&before.class_name);
        for after in added.iter().copied() {
            if before.type_info != after.type_info || before.role() != after.role() {
                continue;
            }
            let same_class = after.class_name == target;
            if before.name == after.name && same_class {
                continue;
            }
            if !same_class && in_hierarchy(context, &target, &after.class_name) {
                continue;
            }
            let slice = DiffSlice::new(
                vec![
                    DeltaKey::removed_attribute(before),
                    DeltaKey::added_attribute(after),
                ],
                Subject::Attributes {
                    before,
                    after,
                    evidence: has_access_evidence(context, before, after),
                },
            );
            if before.name == after.name {
                same_name.push(slice);
            } else {
                renamed.push(slice);
            }
        }
    }
    same_name.extend(renamed);
    same_name
}

pub fn infer_move(slice: &DiffSlice<'_>, context: &InferenceContext<'_>) -> Option<Refactoring> {
    let Subject::Attributes {
        before,
        after,
        evidence,
    } = &slice.subject
    else {
        return None;
    };
    let same_initializer =
        before.initializer().is_some() && before.initializer() == after.initializer();
    let removed = context.diff.removed_attributes();
    let added = context.diff.added_attributes();
    let before_ref = AttributeRef::of(before);
    let after_ref = AttributeRef::of(after);

    if before.name == after.name {
        let unique = removed.iter().filter(|a| a.name == before.name).count() == 1
            && added.iter().filter(|a| a.name == after.name).count() == 1;
        return (*evidence || (same_initializer && unique)).then_some(Refactoring::MoveAttribute {
            before: before_ref,
            after: after_ref,
        });
    }

    if context.diff.after_name_of(&before.class_name) == after.class_name {
        let only_change = removed
            .iter()
            .filter(|a| a.class_name == before.class_name)
            .count()
            == 1
            && added
                .iter()
                .filter(|a| a.class_name == after.class_name)
                .count()
                == 1;
        return (*evidence || (same_initializer && only_change)).then_some(
            Refactoring::RenameAttribute {
                before: before_ref,
                after: after_ref,
            },
        );
    }

    evidence.then_some(Refactoring::MoveAndRenameAttribute {
        before: before_ref,
        after: after_ref,
    })
}

pub fn extract_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for class in &context.diff.common_classes {
        let pairs = pairs_of_class(context, &class.before.qualified_name());
        for attribute in class.added_attributes.iter().copied() {
            let Some(initializer) = attribute.initializer() else {
                continue;
            };
            let mut variables = Vec::new();
            for pair in &pairs {
                let receivers = receivers_of(pair.before);
                for id in pair.mapping.variables.removed.iter().copied() {
                    let local = pair.before.body.declaration(id);
                    if local.role != VariableRole::Local
                        || local.initializer.as_deref() != Some(initializer)
                    {
                        continue;
                    }
                    let replaced_by_field = pair.mapping.replacements().any(|r| {
                        r.kind == ReplacementType::VariableToField
                            && r.before == local.name
                            && receivers
                                .iter()
                                .any(|recv| r.after == format!("{recv}.{}", attribute.name))
                    });
                    if replaced_by_field {
                        variables.push((pair.before, pair.after, id));
                    }
                }
            }
            if variables.is_empty() {
                continue;
            }
            let mut keys = vec![DeltaKey::added_attribute(attribute)];
            keys.extend(
                variables
                    .iter()
                    .map(|(op, _, id)| DeltaKey::before_variable(op, op.body.declaration(*id))),
            );
            slices.push(DiffSlice::new(
                keys,
                Subject::AttributeFromVariables {
                    attribute,
                    variables,
                },
            ));
        }
    }
    slices
}

pub fn infer_extract(
    slice: &DiffSlice<'_>,
    _context: &InferenceContext<'_>,
) -> Option<Refactoring> {
    let Subject::AttributeFromVariables {
        attribute,
        variables,
    } = &slice.subject
    else {
        return None;
    };
    if variables.is_empty() {
        return None;
    }
    Some(Refactoring::ExtractAttribute {
        attribute: AttributeRef::of(attribute),
        variables: variables
            .iter()
            .map(|(op, _, id)| VariableRef::of(op, op.body.declaration(*id)))
            .collect(),
    })
}
