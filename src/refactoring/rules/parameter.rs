//! Parameterize Variable, Add Parameter and Remove Parameter.

use super::variable::variables_slice;
use crate::model::variable::{VariableDeclaration, VariableRole};
use crate::refactoring::engine::{DiffSlice, InferenceContext, Subject};
use crate::refactoring::types::{OperationRef, Refactoring, VariableRef};

/// A new parameter takes over a removed local: it keeps the name and
/// either defaults to the local's initializer or declares the same type
fn takes_over(local: &VariableDeclaration, parameter: &VariableDeclaration) -> bool {
    if local.name != parameter.name {
        return false;
    }
    match (&local.initializer, &parameter.initializer) {
        (Some(initializer), Some(default)) => initializer == default,
        _ => !parameter.type_info.is_untyped() && local.type_info == parameter.type_info,
    }
}

pub fn parameterize_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for pair in context.operation_pairs() {
        let variables = &pair.mapping.variables;
        for b in variables.removed.iter().copied() {
            let local = pair.before.body.declaration(b);
            if local.role != VariableRole::Local {
                continue;
            }
            let parameter = variables.added.iter().copied().find(|a| {
                let parameter = pair.after.body.declaration(*a);
                parameter.role == VariableRole::Parameter && takes_over(local, parameter)
            });
            if let Some(a) = parameter {
                slices.push(variables_slice(pair.before, pair.after, vec![b], vec![a]));
            }
        }
    }
    slices
}

pub fn infer_parameterize(
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
    let ([b], [a]) = (before.as_slice(), after.as_slice()) else {
        return None;
    };
    let local = before_operation.body.declaration(*b);
    let parameter = after_operation.body.declaration(*a);
    takes_over(local, parameter).then(|| Refactoring::ParameterizeVariable {
        variable: VariableRef::of(before_operation, local),
        parameter: VariableRef::of(after_operation, parameter),
    })
}

pub fn add_remove_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for pair in context.operation_pairs() {
        let variables = &pair.mapping.variables;
        for b in variables.removed.iter().copied() {
            if pair.before.body.declaration(b).role == VariableRole::Parameter {
                slices.push(variables_slice(pair.before, pair.after, vec![b], Vec::new()));
            }
        }
        for a in variables.added.iter().copied() {
            if pair.after.body.declaration(a).role == VariableRole::Parameter {
                slices.push(variables_slice(pair.before, pair.after, Vec::new(), vec![a]));
            }
        }
    }
    slices
}

pub fn infer_add_remove(
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
    let before_ref = OperationRef::of(before_operation);
    let after_ref = OperationRef::of(after_operation);
    match (before.as_slice(), after.as_slice()) {
        ([b], []) => Some(Refactoring::RemoveParameter {
            parameter: VariableRef::of(before_operation, before_operation.body.declaration(*b)),
            before: before_ref,
            after: after_ref,
        }),
        ([], [a]) => Some(Refactoring::AddParameter {
            parameter: VariableRef::of(after_operation, after_operation.body.declaration(*a)),
            before: before_ref,
            after: after_ref,
        }),
        _ => None,
    }
}
