//! # Inference Engine
//!
//! Runs the rules of a [`RuleCatalog`] in order over one [`ModelDiff`].
//! Each rule proposes slices of the diff; a slice names the structural
//! deltas it would explain and is skipped when an earlier refactoring has
//! already claimed any of them.

use super::catalog::RuleCatalog;
use super::types::Refactoring;
use crate::ast::SourceLanguage;
use crate::config::DiffConfig;
use crate::diff::{ClassDiff, ModelDiff};
use crate::fragment::{DeclarationId, Shape};
use crate::mapper::{BodyMapper, BodyMapping};
use crate::model::variable::VariableDeclaration;
use crate::model::{Annotation, Attribute, ModelClass, Operation, OperationKey};
use crate::observe::{DiffObserver, PipelineEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    ClassRenameMove,
    RenameOperation,
    ExtractInlineOperation,
    MoveRenameAttribute,
    ExtractAttribute,
    ReplaceVariableWithAttribute,
    ExtractInlineVariable,
    RenameVariable,
    MergeSplit,
    PullUpPushDown,
    MoveOperation,
    Annotations,
    ParameterizeVariable,
    AddRemoveParameter,
}

impl RuleId {
    pub const DEFAULT_ORDER: [RuleId; 14] = [
        RuleId::ClassRenameMove,
        RuleId::RenameOperation,
        RuleId::ExtractInlineOperation,
        RuleId::MoveRenameAttribute,
        RuleId::ExtractAttribute,
        RuleId::ReplaceVariableWithAttribute,
        RuleId::ExtractInlineVariable,
        RuleId::RenameVariable,
        RuleId::MergeSplit,
        RuleId::PullUpPushDown,
        RuleId::MoveOperation,
        RuleId::Annotations,
        RuleId::ParameterizeVariable,
        RuleId::AddRemoveParameter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassRenameMove => "class-rename-move",
            Self::RenameOperation => "rename-operation",
            Self::ExtractInlineOperation => "extract-inline-operation",
            Self::MoveRenameAttribute => "move-rename-attribute",
            Self::ExtractAttribute => "extract-attribute",
            Self::ReplaceVariableWithAttribute => "replace-variable-with-attribute",
            Self::ExtractInlineVariable => "extract-inline-variable",
            Self::RenameVariable => "rename-variable",
            Self::MergeSplit => "merge-split",
            Self::PullUpPushDown => "pull-up-push-down",
            Self::MoveOperation => "move-operation",
            Self::Annotations => "annotations",
            Self::ParameterizeVariable => "parameterize-variable",
            Self::AddRemoveParameter => "add-remove-parameter",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural delta of a [`ModelDiff`] that a refactoring can explain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "delta", rename_all = "snake_case")]
pub enum DeltaKey {
    RemovedClass {
        class: String,
    },
    AddedClass {
        class: String,
    },
    ClassPair {
        before: String,
        after: String,
    },
    RemovedOperation {
        operation: OperationKey,
    },
    AddedOperation {
        operation: OperationKey,
    },
    RemovedAttribute {
        class: String,
        name: String,
    },
    AddedAttribute {
        class: String,
        name: String,
    },
    BeforeVariable {
        operation: OperationKey,
        name: String,
        offset: usize,
    },
    AfterVariable {
        operation: OperationKey,
        name: String,
        offset: usize,
    },
    ClassAnnotation {
        class: String,
        name: String,
    },
    MethodAnnotation {
        operation: OperationKey,
        name: String,
    },
    Extraction {
        source: OperationKey,
        target: OperationKey,
    },
    Inlining {
        source: OperationKey,
        target: OperationKey,
    },
}

impl DeltaKey {
    pub fn removed_operation(operation: &Operation) -> Self {
        Self::RemovedOperation {
            operation: operation.key(),
        }
    }

    pub fn added_operation(operation: &Operation) -> Self {
        Self::AddedOperation {
            operation: operation.key(),
        }
    }

    pub fn removed_attribute(attribute: &Attribute) -> Self {
        Self::RemovedAttribute {
            class: attribute.class_name.clone(),
            name: attribute.name.clone(),
        }
    }

    pub fn added_attribute(attribute: &Attribute) -> Self {
        Self::AddedAttribute {
            class: attribute.class_name.clone(),
            name: attribute.name.clone(),
        }
    }

    pub fn before_variable(operation: &Operation, declaration: &VariableDeclaration) -> Self {
        Self::BeforeVariable {
            operation: operation.key(),
            name: declaration.name.clone(),
            offset: declaration.span.start_offset,
        }
    }

    pub fn after_variable(operation: &Operation, declaration: &VariableDeclaration) -> Self {
        Self::AfterVariable {
            operation: operation.key(),
            name: declaration.name.clone(),
            offset: declaration.span.start_offset,
        }
    }
}

/// The part of the diff a slice is about
#[derive(Debug, Clone)]
pub enum Subject<'m> {
    Classes(&'m ClassDiff<'m>),
    Operations {
        before: &'m Operation,
        after: &'m Operation,
        mapping: Arc<BodyMapping>,
    },
    Attributes {
        before: &'m Attribute,
        after: &'m Attribute,
        /// Some mapped statement replaced an access to `before` by one to `after`
        evidence: bool,
    },
    AttributeGroups {
        before: Vec<&'m Attribute>,
        after: Vec<&'m Attribute>,
    },
    /// Declarations of one mapped operation pair
    Variables {
        before_operation: &'m Operation,
        after_operation: &'m Operation,
        before: Vec<DeclarationId>,
        after: Vec<DeclarationId>,
    },
    AttributeFromVariables {
        attribute: &'m Attribute,
        /// (before operation, after operation, local of the before operation)
        variables: Vec<(&'m Operation, &'m Operation, DeclarationId)>,
    },
    Extraction {
        source_before: &'m Operation,
        source_after: &'m Operation,
        /// The extracted operation, or the inlined one
        target: &'m Operation,
        mapping: Arc<BodyMapping>,
        inline: bool,
    },
    ClassAnnotation {
        before: &'m ModelClass,
        after: &'m ModelClass,
        removed: Option<&'m Annotation>,
        added: Option<&'m Annotation>,
    },
    MethodAnnotation {
        before: &'m Operation,
        after: &'m Operation,
        removed: Option<&'m Annotation>,
        added: Option<&'m Annotation>,
    },
}

#[derive(Debug, Clone)]
pub struct DiffSlice<'m> {
    /// Deltas that must all be unclaimed for the slice to be considered
    pub keys: Vec<DeltaKey>,
    /// Deltas claimed on success without being required
    pub also_claims: Vec<DeltaKey>,
    pub subject: Subject<'m>,
}

impl<'m> DiffSlice<'m> {
    pub fn new(keys: Vec<DeltaKey>, subject: Subject<'m>) -> Self {
        Self {
            keys,
            also_claims: Vec::new(),
            subject,
        }
    }

    pub fn also_claiming(mut self, keys: Vec<DeltaKey>) -> Self {
        self.also_claims = keys;
        self
    }
}

/// An operation pair established by an earlier refactoring
#[derive(Debug, Clone)]
pub struct OperationMatch<'m> {
    pub before: &'m Operation,
    pub after: &'m Operation,
    pub mapping: Arc<BodyMapping>,
}

/// A mapped operation pair, from the differ or from an earlier refactoring
#[derive(Debug, Clone, Copy)]
pub struct PairView<'c, 'm> {
    pub before: &'m Operation,
    pub after: &'m Operation,
    pub mapping: &'c BodyMapping,
}

pub type CandidatesFn = for<'m> fn(&InferenceContext<'m>) -> Vec<DiffSlice<'m>>;
pub type InferFn = for<'m> fn(&DiffSlice<'m>, &InferenceContext<'m>) -> Option<Refactoring>;

#[derive(Clone, Copy)]
pub struct RuleDescriptor {
    pub id: RuleId,
    pub candidates: CandidatesFn,
    pub infer: InferFn,
}

impl fmt::Debug for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor").field("id", &self.id).finish()
    }
}

/// Receiver names for the language an operation is written in
pub fn receivers_of(operation: &Operation) -> &'static [&'static str] {
    SourceLanguage::from_path(&operation.source_file)
        .map(|language| language.receiver_names())
        .unwrap_or(&[])
}

/// Number of statement (not expression) mappings whose after side is in `body`
pub fn mapped_statements(mapping: &BodyMapping, after: &Operation) -> usize {
    mapping
        .mappings
        .iter()
        .filter(|m| after.body.get(m.after).shape != Shape::Expression)
        .count()
}

pub struct InferenceContext<'m> {
    pub diff: &'m ModelDiff<'m>,
    pub config: &'m DiffConfig,
    matched: Vec<OperationMatch<'m>>,
    claimed: BTreeSet<DeltaKey>,
}

impl<'m> InferenceContext<'m> {
    pub fn new(diff: &'m ModelDiff<'m>, config: &'m DiffConfig) -> Self {
        Self {
            diff,
            config,
            matched: Vec::new(),
            claimed: BTreeSet::new(),
        }
    }

    pub fn is_claimed(&self, key: &DeltaKey) -> bool {
        self.claimed.contains(key)
    }

    /// Common operation pairs of the diff, then pairs matched by earlier rules
    pub fn operation_pairs(&self) -> Vec<PairView<'_, 'm>> {
        self.diff
            .operation_pairs()
            .map(|p| PairView {
                before: p.before,
                after: p.after,
                mapping: &p.mapping,
            })
            .chain(self.matched.iter().map(|m| PairView {
                before: m.before,
                after: m.after,
                mapping: m.mapping.as_ref(),
            }))
            .collect()
    }

    pub fn mapping_for(&self, before: &Operation, after: &Operation) -> Option<&BodyMapping> {
        self.operation_pairs()
            .into_iter()
            .find(|p| std::ptr::eq(p.before, before) && std::ptr::eq(p.after, after))
            .map(|p| p.mapping)
    }

    pub fn map_bodies(&self, before: &Operation, after: &Operation) -> BodyMapping {
        BodyMapper::new(&before.body, &after.body, receivers_of(before), self.config).map()
    }

    fn claim(&mut self, keys: impl IntoIterator<Item = DeltaKey>) {
        self.claimed.extend(keys);
    }
}

/// Result of one inference run
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferenceOutcome {
    /// In rule order
    pub refactorings: Vec<Refactoring>,
    pub claimed: BTreeSet<DeltaKey>,
    /// Removed/added classes, operations and attributes no rule explained
    pub unexplained: Vec<DeltaKey>,
}

#[derive(Debug, Clone, Default)]
pub struct InferenceEngine {
    catalog: RuleCatalog,
}

impl InferenceEngine {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn run<'m>(
        &self,
        diff: &'m ModelDiff<'m>,
        config: &'m DiffConfig,
        observer: &dyn DiffObserver,
    ) -> InferenceOutcome {
        let mut context = InferenceContext::new(diff, config);
        let mut refactorings = Vec::new();

        for rule in self.catalog.rules() {
            let slices = (rule.candidates)(&context);
            debug!("Rule {} proposed {} slices", rule.id, slices.len());
            for slice in slices {
                if slice.keys.iter().any(|k| context.is_claimed(k)) {
                    continue;
                }
                let Some(refactoring) = (rule.infer)(&slice, &context) else {
                    continue;
                };
                observer.on_event(&PipelineEvent::RefactoringDetected {
                    rule: rule.id.to_string(),
                    description: refactoring.to_string(),
                });
                if let Subject::Operations {
                    before,
                    after,
                    mapping,
                } = &slice.subject
                {
                    if refactoring.matches_operations() {
                        context.matched.push(OperationMatch {
                            before: *before,
                            after: *after,
                            mapping: Arc::clone(mapping),
                        });
                    }
                }
                context.claim(slice.keys);
                context.claim(slice.also_claims);
                refactorings.push(refactoring);
            }
        }

        let unexplained = unexplained(diff, &context.claimed);
        InferenceOutcome {
            refactorings,
            claimed: context.claimed,
            unexplained,
        }
    }
}

fn unexplained(diff: &ModelDiff<'_>, claimed: &BTreeSet<DeltaKey>) -> Vec<DeltaKey> {
    let mut keys = Vec::new();
    keys.extend(diff.removed_classes.iter().map(|c| DeltaKey::RemovedClass {
        class: c.qualified_name(),
    }));
    keys.extend(diff.added_classes.iter().map(|c| DeltaKey::AddedClass {
        class: c.qualified_name(),
    }));
    keys.extend(diff.removed_operations().into_iter().map(DeltaKey::removed_operation));
    keys.extend(diff.added_operations().into_iter().map(DeltaKey::added_operation));
    keys.extend(diff.removed_attributes().into_iter().map(DeltaKey::removed_attribute));
    keys.extend(diff.added_attributes().into_iter().map(DeltaKey::added_attribute));
    keys.retain(|k| !claimed.contains(k));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_ids_serialize_kebab_case() {
        let json = serde_json::to_string(&RuleId::ReplaceVariableWithAttribute).unwrap();
        assert_eq!(json, "\"replace-variable-with-attribute\"");
        for id in RuleId::DEFAULT_ORDER {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{id}\""));
        }
    }

    #[test]
    fn test_delta_keys_are_ordered() {
        let a = DeltaKey::RemovedClass {
            class: "a.A".to_string(),
        };
        let b = DeltaKey::AddedClass {
            class: "a.A".to_string(),
        };
        let set: BTreeSet<DeltaKey> = [b.clone(), a.clone()].into_iter().collect();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![a, b]);
    }
}
