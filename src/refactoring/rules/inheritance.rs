//! Pull Up and Push Down of attributes and operations.
//!
//! A member removed from a class and added, under the same name, to one
//! of its supertypes was pulled up; added to one of its subtypes, pushed
//! down. Several subclasses may lose the same member to one pull-up, so a
//! pull-up only requires the removal and merely claims the addition.

use crate::model::{Attribute, Operation};
use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, Subject};
use crate::refactoring::types::{AttributeRef, OperationRef, Refactoring};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

fn direction(
    context: &InferenceContext<'_>,
    before_class: &str,
    after_class: &str,
) -> Option<Direction> {
    let source = context.diff.after_name_of(before_class);
    if source == after_class {
        return None;
    }
    let model = context.diff.after;
    if model.is_subtype(&source, after_class) {
        Some(Direction::Up)
    } else if model.is_subtype(after_class, &source) {
        Some(Direction::Down)
    } else {
        None
    }
}

fn keyed<'m>(
    direction: Direction,
    removed: DeltaKey,
    added: DeltaKey,
    subject: Subject<'m>,
) -> DiffSlice<'m> {
    match direction {
        Direction::Up => DiffSlice::new(vec![removed], subject).also_claiming(vec![added]),
        Direction::Down => DiffSlice::new(vec![added], subject).also_claiming(vec![removed]),
    }
}

fn attribute_slices<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let removed: Vec<&'m Attribute> = context.diff.removed_attributes();
    let added: Vec<&'m Attribute> = context.diff.added_attributes();
    let mut slices = Vec::new();
    for before in removed.iter().copied() {
        for after in added.iter().copied() {
            if before.name != after.name || before.type_info != after.type_info {
                continue;
            }
            if let Some(direction) = direction(context, &before.class_name, &after.class_name) {
                slices.push(keyed(
                    direction,
                    DeltaKey::removed_attribute(before),
                    DeltaKey::added_attribute(after),
                    Subject::Attributes {
                        before,
                        after,
                        evidence: true,
                    },
                ));
            }
        }
    }
    slices
}

fn operation_slices<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let removed: Vec<&'m Operation> = context.diff.removed_operations();
    let added: Vec<&'m Operation> = context.diff.added_operations();
    let mut slices = Vec::new();
    for before in removed.iter().copied() {
        if context.is_claimed(&DeltaKey::removed_operation(before)) {
            continue;
        }
        for after in added.iter().copied() {
            if before.name != after.name || !before.has_same_parameters(after) {
                continue;
            }
            if let Some(direction) = direction(context, &before.class_name, &after.class_name) {
                let mapping = Arc::new(context.map_bodies(before, after));
                slices.push(keyed(
                    direction,
                    DeltaKey::removed_operation(before),
                    DeltaKey::added_operation(after),
                    Subject::Operations {
                        before,
                        after,
                        mapping,
                    },
                ));
            }
        }
    }
    slices
}

pub fn candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = attribute_slices(context);
    slices.extend(operation_slices(context));
    slices
}

pub fn infer(slice: &DiffSlice<'_>, context: &InferenceContext<'_>) -> Option<Refactoring> {
    match &slice.subject {
        Subject::Attributes { before, after, .. } => {
            let before_ref = AttributeRef::of(before);
            let after_ref = AttributeRef::of(after);
            match direction(context, &before.class_name, &after.class_name)? {
                Direction::Up => Some(Refactoring::PullUpAttribute {
                    before: before_ref,
                    after: after_ref,
                }),
                Direction::Down => Some(Refactoring::PushDownAttribute {
                    before: before_ref,
                    after: after_ref,
                }),
            }
        }
        Subject::Operations {
            before,
            after,
            mapping,
        } => {
            // Abstract declarations have nothing to map
            let comparable = before.body.statement_count() > 0 && after.body.statement_count() > 0;
            if comparable && mapping.ratio < context.config.operation_mapping_threshold {
                return None;
            }
            let before_ref = OperationRef::of(before);
            let after_ref = OperationRef::of(after);
            match direction(context, &before.class_name, &after.class_name)? {
                Direction::Up => Some(Refactoring::PullUpOperation {
                    before: before_ref,
                    after: after_ref,
                }),
                Direction::Down => Some(Refactoring::PushDownOperation {
                    before: before_ref,
                    after: after_ref,
                }),
            }
        }
        _ => None,
    }
}
