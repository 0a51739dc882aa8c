//! Extract Operation and Inline Operation.
//!
//! An operation is extracted from a mapped pair when the after side starts
//! calling a new operation and the statements the pair left unmapped on the
//! before side reappear in the callee's body. Inlining is the mirror image.

use super::call_arguments;
use crate::fragment::Shape;
use crate::mapper::{BodyMapper, ParameterBinding};
use crate::refactoring::engine::{
    DeltaKey, DiffSlice, InferenceContext, Subject, mapped_statements, receivers_of,
};
use crate::refactoring::types::{OperationRef, Refactoring};
use std::sync::Arc;

pub fn candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for pair in context.operation_pairs() {
        let added_operations = context
            .diff
            .class_diff_after(&pair.after.class_name)
            .map(|d| d.added_operations.clone())
            .unwrap_or_default();
        for added in added_operations {
            if context.is_claimed(&DeltaKey::added_operation(added))
                || call_arguments(pair.before, added).is_some()
            {
                continue;
            }
            let Some(arguments) = call_arguments(pair.after, added) else {
                continue;
            };
            let binding = ParameterBinding::extracted(&added.parameter_names(), &arguments);
            let unmapped = pair
                .mapping
                .unmapped_before_leaves
                .iter()
                .chain(&pair.mapping.unmapped_before_composites)
                .copied();
            let mapping = BodyMapper::new(
                &pair.before.body,
                &added.body,
                receivers_of(pair.before),
                context.config,
            )
            .restrict_before(unmapped)
            .with_binding(binding)
            .map();
            slices.push(
                DiffSlice::new(
                    vec![DeltaKey::Extraction {
                        source: pair.before.key(),
                        target: added.key(),
                    }],
                    Subject::Extraction {
                        source_before: pair.before,
                        source_after: pair.after,
                        target: added,
                        mapping: Arc::new(mapping),
                        inline: false,
                    },
                )
                .also_claiming(vec![DeltaKey::added_operation(added)]),
            );
        }

        let removed_operations = context
            .diff
            .class_diff_before(&pair.before.class_name)
            .map(|d| d.removed_operations.clone())
            .unwrap_or_default();
        for removed in removed_operations {
            if context.is_claimed(&DeltaKey::removed_operation(removed))
                || call_arguments(pair.after, removed).is_some()
            {
                continue;
            }
            let Some(arguments) = call_arguments(pair.before, removed) else {
                continue;
            };
            let binding = ParameterBinding::inlined(&removed.parameter_names(), &arguments);
            let unmapped = pair
                .mapping
                .unmapped_after_leaves
                .iter()
                .chain(&pair.mapping.unmapped_after_composites)
                .copied();
            let mapping = BodyMapper::new(
                &removed.body,
                &pair.after.body,
                receivers_of(removed),
                context.config,
            )
            .restrict_after(unmapped)
            .with_binding(binding)
            .map();
            slices.push(
                DiffSlice::new(
                    vec![DeltaKey::Inlining {
                        source: removed.key(),
                        target: pair.before.key(),
                    }],
                    Subject::Extraction {
                        source_before: pair.before,
                        source_after: pair.after,
                        target: removed,
                        mapping: Arc::new(mapping),
                        inline: true,
                    },
                )
                .also_claiming(vec![DeltaKey::removed_operation(removed)]),
            );
        }
    }
    slices
}

pub fn infer(slice: &DiffSlice<'_>, context: &InferenceContext<'_>) -> Option<Refactoring> {
    let Subject::Extraction {
        source_before,
        source_after,
        target,
        mapping,
        inline,
    } = &slice.subject
    else {
        return None;
    };
    let total = target.body.statement_count();
    if total == 0 {
        return None;
    }
    // Mappings are counted on the side the target body sits on
    let mapped = if *inline {
        mapping
            .mappings
            .iter()
            .filter(|m| target.body.get(m.before).shape != Shape::Expression)
            .count()
    } else {
        mapped_statements(mapping, target)
    };
    if (mapped as f64 / total as f64) < context.config.extract_operation_threshold {
        return None;
    }

    Some(if *inline {
        Refactoring::InlineOperation {
            inlined: OperationRef::of(target),
            target_before: OperationRef::of(source_before),
            target_after: OperationRef::of(source_after),
        }
    } else {
        Refactoring::ExtractOperation {
            extracted: OperationRef::of(target),
            source_before: OperationRef::of(source_before),
            source_after: OperationRef::of(source_after),
        }
    })
}
