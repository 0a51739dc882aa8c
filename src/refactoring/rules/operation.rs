//! Rename Operation, Move Operation, Move And Rename Operation.
//!
//! A removed and an added operation with the same parameters are paired
//! when their bodies map well enough. Candidates are scored up front so the
//! best-mapping pair claims the operations first.

use crate::mapper::BodyMapping;
use crate::model::Operation;
use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, Subject};
use crate::refactoring::types::{OperationRef, Refactoring};
use std::sync::Arc;

fn scored<'m>(
    context: &InferenceContext<'m>,
    pairs: impl IntoIterator<Item = (&'m Operation, &'m Operation)>,
) -> Vec<DiffSlice<'m>> {
    let mut scored: Vec<(f64, DiffSlice<'m>)> = pairs
        .into_iter()
        .filter(|(before, after)| {
            before.has_same_parameters(after)
                && !context.is_claimed(&DeltaKey::removed_operation(before))
                && !context.is_claimed(&DeltaKey::added_operation(after))
        })
        .map(|(before, after)| {
            let mapping: BodyMapping = context.map_bodies(before, after);
            let slice = DiffSlice::new(
                vec![
                    DeltaKey::removed_operation(before),
                    DeltaKey::added_operation(after),
                ],
                Subject::Operations {
                    before,
                    after,
                    mapping: Arc::new(mapping),
                },
            );
            (ratio_of(&slice), slice)
        })
        .collect();
    // Stable: equal scores keep declaration order
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, slice)| slice).collect()
}

fn ratio_of(slice: &DiffSlice<'_>) -> f64 {
    match &slice.subject {
        Subject::Operations { mapping, .. } => mapping.ratio,
        _ => 0.0,
    }
}

pub fn rename_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for class in &context.diff.common_classes {
        let pairs = class.removed_operations.iter().flat_map(|before| {
            class
                .added_operations
                .iter()
                .filter(move |after| after.name != before.name)
                .map(move |after| (*before, *after))
        });
        slices.extend(scored(context, pairs));
    }
    slices
}

pub fn infer_rename(slice: &DiffSlice<'_>, context: &InferenceContext<'_>) -> Option<Refactoring> {
    let Subject::Operations {
        before,
        after,
        mapping,
    } = &slice.subject
    else {
        return None;
    };
    (mapping.ratio >= context.config.operation_mapping_threshold).then(|| {
        Refactoring::RenameOperation {
            before: OperationRef::of(before),
            after: OperationRef::of(after),
        }
    })
}

pub fn move_candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let removed = context.diff.removed_operations();
    let added = context.diff.added_operations();
    let pairs = removed.iter().flat_map(|before| {
        let target = context.diff.after_name_of(&before.class_name);
        added
            .iter()
            .filter(move |after| after.class_name != target)
            .map(move |after| (*before, *after))
    });
    scored(context, pairs.collect::<Vec<_>>())
}

pub fn infer_move(slice: &DiffSlice<'_>, context: &InferenceContext<'_>) -> Option<Refactoring> {
    let Subject::Operations {
        before,
        after,
        mapping,
    } = &slice.subject
    else {
        return None;
    };
    if mapping.ratio < context.config.operation_mapping_threshold {
        return None;
    }
    let before_ref = OperationRef::of(before);
    let after_ref = OperationRef::of(after);
    Some(if before.name == after.name {
        Refactoring::MoveOperation {
            before: before_ref,
            after: after_ref,
        }
    } else {
        Refactoring::MoveAndRenameOperation {
            before: before_ref,
            after: after_ref,
        }
    })
}
