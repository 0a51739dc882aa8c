//! Replace Variable With Attribute, Extract Variable, Inline Variable,
//! Rename Variable and Rename Parameter.

use crate::fragment::DeclarationId;
use crate::mapper::{BodyMapping, ReplacementType};
use crate::model::variable::{VariableDeclaration, VariableRole};
use crate::model::{Attribute, Operation};
use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, Subject, receivers_of};
use crate::refactoring::types::{AttributeRef, Refactoring, VariableRef};

pub(crate) fn variables_slice<'m>(
    before_operation: &'m Operation,
    after_operation: &'m Operation,
    before: Vec<DeclarationId>,
    after: Vec<DeclarationId>,
) -> DiffSlice<'m> {
    let mut keys: Vec<DeltaKey> = before
        .iter()
        .map(|id| {
            DeltaKey::before_variable(before_operation, before_operation.body.declaration(*id))
        })
        .collect();
    keys.extend(after.iter().map(|id| {
        DeltaKey::after_variable(after_operation, after_operation.body.declaration(*id))
    }));
    DiffSlice::new(
        keys,
        Subject::Variables {
            before_operation,
            after_operation,
            before,
            after,
        },
    )
}

/// Attribute of the after class that `field` (e.g. `self.total`) accesses
fn accessed_attribute<'m>(
    context: &InferenceContext<'m>,
    operation: &Operation,
    field: &str,
) -> Option<&'m Attribute> {
    let (receiver, name) = field.split_once('.')?;
    if !receivers_of(operation).contains(&receiver) {
        return None;
    }
    context
        .diff
        .after
        .class(&operation.class_name)?
        .attribute(name)
}

fn field_replacing<'a>(mapping: &'a BodyMapping, local: &VariableDeclaration) -> Option<&'a str> {
    mapping
        .replacements()
        .find(|r| r.kind == ReplacementType::VariableToField && r.before == local.name)
        .map(|r| r.after.as_str())
}

pub fn replace_with_attribute_candidates<'m>(
    context: &InferenceContext<'m>,
) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for pair in context.operation_pairs() {
        for id in pair.mapping.variables.removed.iter().copied() {
            let local = pair.before.body.declaration(id);
            if local.role != VariableRole::Local {
                continue;
            }
            let has_attribute = field_replacing(pair.mapping, local)
                .and_then(|field| accessed_attribute(context, pair.after, field))
                .is_some();
            if has_attribute {
                slices.push(variables_slice(pair.before, pair.after, vec![id], Vec::new()));
            }
        }
    }
    slices
}

pub fn infer_replace_with_attribute(
    slice: &DiffSlice<'_>,
    context: &InferenceContext<'_>,
) -> Option<Refactoring> {
    let Subject::Variables {
        before_operation,
        after_operation,
        before,
        ..
    } = &slice.subject
    else {
        return None;
    };
    let local = before_operation.body.declaration(*before.first()?);
    let mapping = context.mapping_for(before_operation, after_operation)?;
    let field = field_replacing(mapping, local)?;
    let attribute = accessed_attribute(context, after_operation, field)?;
    Some(Refactoring::ReplaceVariableWithAttribute {
        variable: VariableRef::of(before_operation, local),
        attribute: AttributeRef::of(attribute),
    })
}

pub fn extract_inline_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for pair in context.operation_pairs() {
        let variables = &pair.mapping.variables;
        for id in variables.added.iter().copied() {
            let local = pair.after.body.declaration(id);
            if local.role == VariableRole::Local
                && pair
                    .mapping
                    .replacements()
                    .any(|r| r.kind == ReplacementType::ExtractVariable && r.after == local.name)
            {
                slices.push(variables_slice(pair.before, pair.after, Vec::new(), vec![id]));
            }
        }
        for id in variables.removed.iter().copied() {
            let local = pair.before.body.declaration(id);
            if local.role == VariableRole::Local
                && pair
                    .mapping
                    .replacements()
                    .any(|r| r.kind == ReplacementType::InlineVariable && r.before == local.name)
            {
                slices.push(variables_slice(pair.before, pair.after, vec![id], Vec::new()));
            }
        }
    }
    slices
}

pub fn infer_extract_inline(
    slice: &DiffSlice<'_>,
    _context: &InferenceContext<'_>,
) -> Option<Refactoring> {
    let Subject::Variables {
        before_operation,
        after_operation,
        before,
        after,
    } = &slice.subject
    else {
        return None;
    };
    match (before.as_slice(), after.as_slice()) {
        ([], [id]) => {
            let local = after_operation.body.declaration(*id);
            Some(Refactoring::ExtractVariable {
                variable: VariableRef::of(after_operation, local),
                expression: local.initializer.clone()?,
            })
        }
        ([id], []) => {
            let local = before_operation.body.declaration(*id);
            Some(Refactoring::InlineVariable {
                variable: VariableRef::of(before_operation, local),
                expression: local.initializer.clone()?,
            })
        }
        _ => None,
    }
}

pub fn rename_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    context
        .operation_pairs()
        .into_iter()
        .flat_map(|pair| {
            pair.mapping
                .variables
                .renamed
                .iter()
                .map(move |(b, a)| variables_slice(pair.before, pair.after, vec![*b], vec![*a]))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn infer_rename(slice: &DiffSlice<'_>, _context: &InferenceContext<'_>) -> Option<Refactoring> {
    let Subject::Variables {
        before_operation,
        after_operation,
        before,
        after,
    } = &slice.subject
    else {
        return None;
    };
    let ([b], [a]) = (before.as_slice(), after.as_slice()) else {
        return None;
    };
    let old = before_operation.body.declaration(*b);
    let new = after_operation.body.declaration(*a);
    let before = VariableRef::of(before_operation, old);
    let after = VariableRef::of(after_operation, new);
    match old.role {
        VariableRole::Parameter => Some(Refactoring::RenameParameter { before, after }),
        VariableRole::Local => Some(Refactoring::RenameVariable { before, after }),
        _ => None,
    }
}
