//! Add, Remove and Modify Class Annotation and Method Annotation.
//!
//! Annotations (decorators in Python) are paired by exact type name, so
//! `@a.Cached` and `@b.Cached` are different annotations; a pair whose
//! arguments differ was modified.

use crate::model::Annotation;
use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, Subject};
use crate::refactoring::types::{AnnotationRef, ClassRef, OperationRef, Refactoring};

/// `(removed, added)` pairs: one side is `None` for an addition or removal
fn changes<'m>(
    before: &'m [Annotation],
    after: &'m [Annotation],
) -> Vec<(Option<&'m Annotation>, Option<&'m Annotation>)> {
    let mut changes = Vec::new();
    for old in before {
        match after.iter().find(|a| a.name == old.name) {
            Some(new) if new.arguments != old.arguments => changes.push((Some(old), Some(new))),
            Some(_) => {}
            None => changes.push((Some(old), None)),
        }
    }
    for new in after {
        if !before.iter().any(|b| b.name == new.name) {
            changes.push((None, Some(new)));
        }
    }
    changes
}

fn name_of(removed: Option<&Annotation>, added: Option<&Annotation>) -> String {
    removed
        .or(added)
        .map(|a| a.name.clone())
        .unwrap_or_default()
}

pub fn candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    let mut slices = Vec::new();
    for class in &context.diff.common_classes {
        for (removed, added) in changes(&class.before.annotations, &class.after.annotations) {
            slices.push(DiffSlice::new(
                vec![DeltaKey::ClassAnnotation {
                    class: class.before.qualified_name(),
                    name: name_of(removed, added),
                }],
                Subject::ClassAnnotation {
                    before: class.before,
                    after: class.after,
                    removed,
                    added,
                },
            ));
        }
    }
    for pair in context.operation_pairs() {
        for (removed, added) in changes(&pair.before.annotations, &pair.after.annotations) {
            slices.push(DiffSlice::new(
                vec![DeltaKey::MethodAnnotation {
                    operation: pair.before.key(),
                    name: name_of(removed, added),
                }],
                Subject::MethodAnnotation {
                    before: pair.before,
                    after: pair.after,
                    removed,
                    added,
                },
            ));
        }
    }
    slices
}

pub fn infer(slice: &DiffSlice<'_>, _context: &InferenceContext<'_>) -> Option<Refactoring> {
    match &slice.subject {
        Subject::ClassAnnotation {
            before,
            after,
            removed,
            added,
        } => match (removed, added) {
            (Some(old), Some(new)) => Some(Refactoring::ModifyClassAnnotation {
                class: ClassRef::of(after),
                before: AnnotationRef::of(old),
                after: AnnotationRef::of(new),
            }),
            (Some(old), None) => Some(Refactoring::RemoveClassAnnotation {
                class: ClassRef::of(before),
                annotation: AnnotationRef::of(old),
            }),
            (None, Some(new)) => Some(Refactoring::AddClassAnnotation {
                class: ClassRef::of(after),
                annotation: AnnotationRef::of(new),
            }),
            (None, None) => None,
        },
        Subject::MethodAnnotation {
            before,
            after,
            removed,
            added,
        } => match (removed, added) {
            (Some(old), Some(new)) => Some(Refactoring::ModifyMethodAnnotation {
                operation: OperationRef::of(after),
                before: AnnotationRef::of(old),
                after: AnnotationRef::of(new),
            }),
            (Some(old), None) => Some(Refactoring::RemoveMethodAnnotation {
                operation: OperationRef::of(before),
                annotation: AnnotationRef::of(old),
            }),
            (None, Some(new)) => Some(Refactoring::AddMethodAnnotation {
                operation: OperationRef::of(after),
                annotation: AnnotationRef::of(new),
            }),
            (None, None) => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn annotation(name: &str, arguments: &[&str]) -> Annotation {
        Annotation {
            name: name.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_changed_arguments_are_a_modification() {
        let before = [annotation("lru_cache", &["maxsize=32"])];
        let after = [annotation("lru_cache", &["maxsize=64"])];
        let changes = changes(&before, &after);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].0.is_some() && changes[0].1.is_some());
    }

    #[test]
    fn test_qualifier_change_is_remove_and_add() {
        let before = [annotation("a.Cached", &[])];
        let after = [annotation("b.Cached", &[])];
        let changes = changes(&before, &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(name_of(changes[0].0, changes[0].1), "a.Cached");
        assert!(changes[0].1.is_none());
        assert_eq!(name_of(changes[1].0, changes[1].1), "b.Cached");
        assert!(changes[1].0.is_none());
    }

    #[test]
    fn test_unchanged_annotations_report_nothing() {
        let both = [annotation("staticmethod", &[]), annotation("a.Cached", &["1"])];
        assert!(changes(&both, &both).is_empty());
    }
}
