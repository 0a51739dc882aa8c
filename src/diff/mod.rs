//! # Model Differ
//!
//! Partitions the classes of two models into added, removed and common,
//! then the attributes and operations of every common pair. Every common
//! operation pair is handed to the [`BodyMapper`]. The diff only reads the
//! models and is repeatable: the same inputs give the same partitions in
//! the same order.

pub mod similarity;

use crate::config::DiffConfig;
use crate::mapper::{BodyMapper, BodyMapping};
use crate::model::{Attribute, Model, ModelClass, Operation};
use crate::observe::{DiffObserver, PipelineEvent};
use serde::Serialize;
use std::collections::HashMap;

/// How a common class pair was found
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "by")]
pub enum ClassMatch {
    Name,
    Similarity { score: f64 },
}

#[derive(Debug)]
pub struct OperationPair<'m> {
    pub before: &'m Operation,
    pub after: &'m Operation,
    pub mapping: BodyMapping,
}

#[derive(Debug, Clone, Copy)]
pub struct AttributePair<'m> {
    pub before: &'m Attribute,
    pub after: &'m Attribute,
}

#[derive(Debug)]
pub struct ClassDiff<'m> {
    pub before: &'m ModelClass,
    pub after: &'m ModelClass,
    pub matched_by: ClassMatch,
    pub removed_operations: Vec<&'m Operation>,
    pub added_operations: Vec<&'m Operation>,
    pub common_operations: Vec<OperationPair<'m>>,
    pub removed_attributes: Vec<&'m Attribute>,
    pub added_attributes: Vec<&'m Attribute>,
    pub common_attributes: Vec<AttributePair<'m>>,
}

impl<'m> ClassDiff<'m> {
    pub fn compute(
        before: &'m ModelClass,
        after: &'m ModelClass,
        matched_by: ClassMatch,
        config: &DiffConfig,
    ) -> Self {
        let (removed_attributes, added_attributes, common_attributes) =
            partition(&before.attributes, &after.attributes, |b, a| {
                b.match_key() == a.match_key()
            });
        let common_attributes = common_attributes
            .into_iter()
            .map(|(before, after)| AttributePair { before, after })
            .collect();

        let (removed, added, mut common) =
            partition(&before.operations, &after.operations, |b, a| {
                b.signature_key() == a.signature_key()
            });

        // Signature changed: pair leftovers whose name is unique on both sides
        let count = |ops: &[&Operation], name: &str| ops.iter().filter(|o| o.name == name).count();
        let mut removed_operations = Vec::new();
        let mut paired_after = Vec::new();
        for operation in &removed {
            let unique = count(&removed, &operation.name) == 1
                && count(&added, &operation.name) == 1;
            match added.iter().find(|a| a.name == operation.name) {
                Some(after) if unique => {
                    common.push((*operation, *after));
                    paired_after.push(after.key());
                }
                _ => removed_operations.push(*operation),
            }
        }
        let added_operations = added
            .into_iter()
            .filter(|a| !paired_after.contains(&a.key()))
            .collect();

        let before_position: HashMap<_, _> = before
            .operations
            .iter()
            .enumerate()
            .map(|(i, o)| (o.key(), i))
            .collect();
        common.sort_by_key(|(b, _)| before_position.get(&b.key()).copied());

        let receivers = before.language.receiver_names();
        let common_operations = common
            .into_iter()
            .map(|(b, a)| OperationPair {
                before: b,
                after: a,
                mapping: BodyMapper::new(&b.body, &a.body, receivers, config).map(),
            })
            .collect();

        Self {
            before,
            after,
            matched_by,
            removed_operations,
            added_operations,
            common_operations,
            removed_attributes,
            added_attributes,
            common_attributes,
        }
    }

    pub fn is_renamed_or_moved(&self) -> bool {
        matches!(self.matched_by, ClassMatch::Similarity { .. })
    }

    pub fn operation_pair(&self, before: &Operation) -> Option<&OperationPair<'m>> {
        self.common_operations
            .iter()
            .find(|p| p.before.key() == before.key())
    }

    pub fn has_changes(&self) -> bool {
        !(self.removed_operations.is_empty()
            && self.added_operations.is_empty()
            && self.removed_attributes.is_empty()
            && self.added_attributes.is_empty())
    }
}

/// First-fit pairing in declaration order: `(only before, only after, pairs)`
#[allow(clippy::type_complexity)]
fn partition<'m, T>(
    before: &'m [T],
    after: &'m [T],
    same: impl Fn(&T, &T) -> bool,
) -> (Vec<&'m T>, Vec<&'m T>, Vec<(&'m T, &'m T)>) {
    let mut used = vec![false; after.len()];
    let mut removed = Vec::new();
    let mut common = Vec::new();
    for b in before {
        let found = after
            .iter()
            .enumerate()
            .find(|(j, a)| !used[*j] && same(b, a))
            .map(|(j, _)| j);
        match found {
            Some(j) => {
                used[j] = true;
                common.push((b, &after[j]));
            }
            None => removed.push(b),
        }
    }
    let added = after
        .iter()
        .enumerate()
        .filter(|(j, _)| !used[*j])
        .map(|(_, a)| a)
        .collect();
    (removed, added, common)
}

#[derive(Debug)]
pub struct ModelDiff<'m> {
    pub before: &'m Model,
    pub after: &'m Model,
    pub removed_classes: Vec<&'m ModelClass>,
    pub added_classes: Vec<&'m ModelClass>,
    pub common_classes: Vec<ClassDiff<'m>>,
}

impl<'m> ModelDiff<'m> {
    pub fn compute(
        before: &'m Model,
        after: &'m Model,
        config: &DiffConfig,
        observer: &dyn DiffObserver,
    ) -> Self {
        let (removed, added, by_name) = partition(&before.classes, &after.classes, |b, a| {
            b.qualified_name() == a.qualified_name()
        });
        let mut pairs: Vec<(&ModelClass, &ModelClass, ClassMatch)> = by_name
            .into_iter()
            .map(|(b, a)| (b, a, ClassMatch::Name))
            .collect();

        let similar =
            similarity::match_classes(&removed, &added, config.class_similarity_threshold);
        for (i, j, score) in &similar {
            pairs.push((removed[*i], added[*j], ClassMatch::Similarity { score: *score }));
        }
        let removed_classes = removed
            .iter()
            .enumerate()
            .filter(|(i, _)| !similar.iter().any(|(b, _, _)| b == i))
            .map(|(_, c)| *c)
            .collect();
        let added_classes = added
            .iter()
            .enumerate()
            .filter(|(j, _)| !similar.iter().any(|(_, a, _)| a == j))
            .map(|(_, c)| *c)
            .collect();

        let before_position: HashMap<String, usize> = before
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.qualified_name(), i))
            .collect();
        pairs.sort_by_key(|(b, _, _)| before_position.get(&b.qualified_name()).copied());

        let common_classes = pairs
            .into_iter()
            .map(|(b, a, matched_by)| {
                observer.on_event(&PipelineEvent::ClassesMatched {
                    before: b.qualified_name(),
                    after: a.qualified_name(),
                    score: match matched_by {
                        ClassMatch::Name => 1.0,
                        ClassMatch::Similarity { score } => score,
                    },
                });
                ClassDiff::compute(b, a, matched_by, config)
            })
            .collect();

        Self {
            before,
            after,
            removed_classes,
            added_classes,
            common_classes,
        }
    }

    /// Operations only in the before model: those of removed classes, then
    /// the removed operations of common classes
    pub fn removed_operations(&self) -> Vec<&'m Operation> {
        self.removed_classes
            .iter()
            .flat_map(|c| c.operations.iter())
            .chain(
                self.common_classes
                    .iter()
                    .flat_map(|d| d.removed_operations.iter().copied()),
            )
            .collect()
    }

    pub fn added_operations(&self) -> Vec<&'m Operation> {
        self.added_classes
            .iter()
            .flat_map(|c| c.operations.iter())
            .chain(
                self.common_classes
                    .iter()
                    .flat_map(|d| d.added_operations.iter().copied()),
            )
            .collect()
    }

    pub fn removed_attributes(&self) -> Vec<&'m Attribute> {
        self.removed_classes
            .iter()
            .flat_map(|c| c.attributes.iter())
            .chain(
                self.common_classes
                    .iter()
                    .flat_map(|d| d.removed_attributes.iter().copied()),
            )
            .collect()
    }

    pub fn added_attributes(&self) -> Vec<&'m Attribute> {
        self.added_classes
            .iter()
            .flat_map(|c| c.attributes.iter())
            .chain(
                self.common_classes
                    .iter()
                    .flat_map(|d| d.added_attributes.iter().copied()),
            )
            .collect()
    }

    pub fn operation_pairs(&self) -> impl Iterator<Item = &OperationPair<'m>> {
        self.common_classes
            .iter()
            .flat_map(|d| d.common_operations.iter())
    }

    /// Common class pair whose before side has this qualified name
    pub fn class_diff_before(&self, qualified_name: &str) -> Option<&ClassDiff<'m>> {
        self.common_classes
            .iter()
            .find(|d| d.before.qualified_name() == qualified_name)
    }

    pub fn class_diff_after(&self, qualified_name: &str) -> Option<&ClassDiff<'m>> {
        self.common_classes
            .iter()
            .find(|d| d.after.qualified_name() == qualified_name)
    }

    /// After-side name of a before class, following renames
    pub fn after_name_of(&self, before_class: &str) -> String {
        self.class_diff_before(before_class)
            .map(|d| d.after.qualified_name())
            .unwrap_or_else(|| before_class.to_string())
    }

    /// No class, attribute or operation was added or removed
    pub fn is_empty(&self) -> bool {
        self.removed_classes.is_empty()
            && self.added_classes.is_empty()
            && self.common_classes.iter().all(|d| !d.has_changes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_source;
    use crate::model::ModelBuilder;
    use crate::observe::{CollectingObserver, NoopObserver};

    fn model(path: &str, source: &str) -> Model {
        let unit = parse_source(path, source).expect("parse");
        ModelBuilder::new(&NoopObserver).build(&unit)
    }

    const SHAPES: &str = r#"
class Circle:
    def __init__(self, r):
        self.r = r

    def area(self):
        return 3.14 * self.r * self.r

    def scale(self, k):
        return Circle(self.r * k)
"#;

    #[test]
    fn test_identical_models_have_no_changes() {
        let before = model("shapes.py", SHAPES);
        let after = model("shapes.py", SHAPES);
        let diff = ModelDiff::compute(&before, &after, &DiffConfig::default(), &NoopObserver);
        assert!(diff.is_empty());
        assert_eq!(diff.common_classes.len(), 1);
        assert_eq!(diff.common_classes[0].common_operations.len(), 3);
        assert!(
            diff.operation_pairs()
                .all(|pair| pair.mapping.is_identical())
        );
    }

    #[test]
    fn test_renamed_class_is_paired_by_similarity() {
        let before = model("shapes.py", SHAPES);
        let after = model("shapes.py", &SHAPES.replace("class Circle", "class Disc"));
        let observer = CollectingObserver::new();
        let diff = ModelDiff::compute(&before, &after, &DiffConfig::default(), &observer);
        assert!(diff.removed_classes.is_empty());
        assert!(diff.added_classes.is_empty());
        assert!(diff.common_classes[0].is_renamed_or_moved());
        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn test_signature_change_pairs_unique_name() {
        let before = model("shapes.py", SHAPES);
        let after = model(
            "shapes.py",
            &SHAPES.replace("def scale(self, k):", "def scale(self, k, origin):"),
        );
        let diff = ModelDiff::compute(&before, &after, &DiffConfig::default(), &NoopObserver);
        let class = &diff.common_classes[0];
        assert!(class.removed_operations.is_empty());
        assert!(class.added_operations.is_empty());
        assert_eq!(class.common_operations.len(), 3);
    }

    #[test]
    fn test_diff_is_repeatable() {
        let before = model("shapes.py", SHAPES);
        let after = model("shapes.py", &SHAPES.replace("def area", "def surface"));
        let config = DiffConfig::default();
        let first = ModelDiff::compute(&before, &after, &config, &NoopObserver);
        let second = ModelDiff::compute(&before, &after, &config, &NoopObserver);
        let names = |d: &ModelDiff<'_>| {
            (
                d.removed_operations().iter().map(|o| o.name.clone()).collect::<Vec<_>>(),
                d.added_operations().iter().map(|o| o.name.clone()).collect::<Vec<_>>(),
            )
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first).0, vec!["area"]);
    }
}
