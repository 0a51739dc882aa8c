//! Rename Class, Move Class, Move And Rename Class.

use crate::refactoring::engine::{DeltaKey, DiffSlice, InferenceContext, Subject};
use crate::refactoring::types::{ClassRef, Refactoring};

pub fn candidates<'m>(context: &InferenceContext<'m>) -> Vec<DiffSlice<'m>> {
    context
        .diff
        .common_classes
        .iter()
        .filter(|d| d.is_renamed_or_moved())
        .map(|d| {
            DiffSlice::new(
                vec![DeltaKey::ClassPair {
                    before: d.before.qualified_name(),
                    after: d.after.qualified_name(),
                }],
                Subject::Classes(d),
            )
        })
        .collect()
}

pub fn infer(slice: &DiffSlice<'_>, _context: &InferenceContext<'_>) -> Option<Refactoring> {
    let Subject::Classes(diff) = &slice.subject else {
        return None;
    };
    let before = ClassRef::of(diff.before);
    let after = ClassRef::of(diff.after);
    let renamed = diff.before.name != diff.after.name;
    let moved = diff.before.package != diff.after.package;
    match (renamed, moved) {
        (true, false) => Some(Refactoring::RenameClass { before, after }),
        (false, true) => Some(Refactoring::MoveClass { before, after }),
        (true, true) => Some(Refactoring::MoveAndRenameClass { before, after }),
        (false, false) => None,
    }
}
