//! Pairing classes whose qualified names differ.

use crate::model::ModelClass;
use std::collections::HashSet;

/// Jaccard index of two member-key sets; empty sets are not similar
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Greedy one-to-one pairing of leftover classes by member overlap.
///
/// Only classes of the same kind are paired (module pseudo-classes with
/// module pseudo-classes). Returns `(before index, after index, score)`
/// triples, best score first, ties broken by declaration order.
pub fn match_classes(
    before: &[&ModelClass],
    after: &[&ModelClass],
    threshold: f64,
) -> Vec<(usize, usize, f64)> {
    let before_keys: Vec<HashSet<String>> = before.iter().map(|c| c.member_keys()).collect();
    let after_keys: Vec<HashSet<String>> = after.iter().map(|c| c.member_keys()).collect();

    let mut candidates = Vec::new();
    for (i, b) in before.iter().enumerate() {
        for (j, a) in after.iter().enumerate() {
            if b.traits.is_module != a.traits.is_module {
                continue;
            }
            let score = jaccard(&before_keys[i], &after_keys[j]);
            if score > 0.0 && score >= threshold {
                candidates.push((i, j, score));
            }
        }
    }
    candidates.sort_by(|x, y| {
        y.2.total_cmp(&x.2)
            .then_with(|| x.0.cmp(&y.0))
            .then_with(|| x.1.cmp(&y.1))
    });

    let mut used_before = HashSet::new();
    let mut used_after = HashSet::new();
    candidates
        .into_iter()
        .filter(|(i, j, _)| {
            if used_before.contains(i) || used_after.contains(j) {
                return false;
            }
            used_before.insert(*i);
            used_after.insert(*j);
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&keys(&["a", "b"]), &keys(&["a", "b"])), 1.0);
        assert_eq!(jaccard(&keys(&["a", "b"]), &keys(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard(&keys(&[]), &keys(&[])), 0.0);
    }
}
