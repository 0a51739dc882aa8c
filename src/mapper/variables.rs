//! Pairing the local variables and parameters of two mapped bodies.

use super::{Mapping, ReplacementType};
use crate::fragment::{DeclarationId, FragmentId, OperationBody};
use crate::model::variable::{VariableDeclaration, VariableRole};
use std::collections::{HashMap, HashSet};

/// Declarations of a mapped body pair, classified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableDelta {
    /// Only in the before body
    pub removed: Vec<DeclarationId>,
    /// Only in the after body
    pub added: Vec<DeclarationId>,
    /// Same name, same initializer
    pub common: Vec<(DeclarationId, DeclarationId)>,
    /// Same name, initializer changed
    pub replaced: Vec<(DeclarationId, DeclarationId)>,
    pub renamed: Vec<(DeclarationId, DeclarationId)>,
}

impl VariableDelta {
    pub fn is_removed(&self, id: DeclarationId) -> bool {
        self.removed.contains(&id)
    }

    pub fn is_added(&self, id: DeclarationId) -> bool {
        self.added.contains(&id)
    }

    /// Counterpart of a before declaration, renamed or not
    pub fn after_of(&self, id: DeclarationId) -> Option<DeclarationId> {
        self.common
            .iter()
            .chain(&self.replaced)
            .chain(&self.renamed)
            .find(|(b, _)| *b == id)
            .map(|(_, a)| *a)
    }
}

fn tracked(declaration: &VariableDeclaration) -> bool {
    matches!(declaration.role, VariableRole::Local | VariableRole::Parameter)
}

pub(super) fn compute(
    before: &OperationBody,
    after: &OperationBody,
    mappings: &[Mapping],
) -> VariableDelta {
    let statement_pairs: HashMap<FragmentId, FragmentId> =
        mappings.iter().map(|m| (m.before, m.after)).collect();

    let before_ids: Vec<DeclarationId> = (0..before.declarations.len())
        .filter(|id| tracked(before.declaration(*id)))
        .collect();
    let after_ids: Vec<DeclarationId> = (0..after.declarations.len())
        .filter(|id| tracked(after.declaration(*id)))
        .collect();

    let mut paired_before = HashSet::new();
    let mut paired_after = HashSet::new();
    let mut pairs = Vec::new();

    // Same name: parameters pair directly, locals through their mapped
    // declaring statements
    for &b in &before_ids {
        let db = before.declaration(b);
        let found = after_ids.iter().copied().find(|a| {
            let da = after.declaration(*a);
            if paired_after.contains(a) || da.name != db.name || da.role != db.role {
                return false;
            }
            match (db.statement, da.statement) {
                (Some(sb), Some(sa)) => statement_pairs.get(&sb) == Some(&sa),
                _ => db.role == VariableRole::Parameter,
            }
        });
        if let Some(a) = found {
            paired_before.insert(b);
            paired_after.insert(a);
            pairs.push((b, a));
        }
    }

    // Same name, declaring statements not mapped: only when the name is
    // unambiguous on both sides
    for &b in &before_ids {
        if paired_before.contains(&b) {
            continue;
        }
        let db = before.declaration(b);
        let same_before = before_ids
            .iter()
            .filter(|id| before.declaration(**id).name == db.name)
            .count();
        let same_after: Vec<DeclarationId> = after_ids
            .iter()
            .copied()
            .filter(|id| after.declaration(*id).name == db.name)
            .collect();
        let [a] = same_after.as_slice() else {
            continue;
        };
        if same_before == 1 && !paired_after.contains(a) && after.declaration(*a).role == db.role {
            paired_before.insert(b);
            paired_after.insert(*a);
            pairs.push((b, *a));
        }
    }

    let mut delta = VariableDelta::default();
    for (b, a) in pairs {
        if before.declaration(b).initializer == after.declaration(a).initializer {
            delta.common.push((b, a));
        } else {
            delta.replaced.push((b, a));
        }
    }

    // Renames need a variable-name replacement in a fragment that refers to
    // the before declaration
    for &b in &before_ids {
        if paired_before.contains(&b) {
            continue;
        }
        let db = before.declaration(b);
        let references: HashSet<FragmentId> = before.references[b].iter().copied().collect();
        let renamed = after_ids.iter().copied().find(|a| {
            let da = after.declaration(*a);
            !paired_after.contains(a)
                && da.role == db.role
                && da.name != db.name
                && mappings.iter().any(|m| {
                    references.contains(&m.before)
                        && after.references[*a].contains(&m.after)
                        && m.replacements.iter().any(|r| {
                            r.kind == ReplacementType::VariableName
                                && r.before == db.name
                                && r.after == da.name
                        })
                })
        });
        if let Some(a) = renamed {
            paired_before.insert(b);
            paired_after.insert(a);
            delta.renamed.push((b, a));
        }
    }

    delta.removed = before_ids
        .into_iter()
        .filter(|id| !paired_before.contains(id))
        .collect();
    delta.added = after_ids
        .into_iter()
        .filter(|id| !paired_after.contains(id))
        .collect();
    delta
}
