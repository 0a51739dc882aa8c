//! # Rule Catalog
//!
//! The ordered list of inference rules. Order matters: a rule only sees
//! the deltas that earlier rules left unclaimed.

use super::engine::{CandidatesFn, InferFn, RuleDescriptor, RuleId};
use super::rules;

#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<RuleDescriptor>,
}

impl RuleCatalog {
    /// Catalog running the given rules in the given order
    pub fn with_order(order: &[RuleId]) -> Self {
        Self {
            rules: order.iter().map(|id| Self::descriptor(*id)).collect(),
        }
    }

    pub fn descriptor(id: RuleId) -> RuleDescriptor {
        let (candidates, infer): (CandidatesFn, InferFn) = match id {
            RuleId::ClassRenameMove => (rules::class::candidates, rules::class::infer),
            RuleId::RenameOperation => (
                rules::operation::rename_candidates,
                rules::operation::infer_rename,
            ),
            RuleId::ExtractInlineOperation => (
                rules::extraction::candidates,
                rules::extraction::infer,
            ),
            RuleId::MoveRenameAttribute => (
                rules::attribute::move_candidates,
                rules::attribute::infer_move,
            ),
            RuleId::ExtractAttribute => (
                rules::attribute::extract_candidates,
                rules::attribute::infer_extract,
            ),
            RuleId::ReplaceVariableWithAttribute => (
                rules::variable::replace_with_attribute_candidates,
                rules::variable::infer_replace_with_attribute,
            ),
            RuleId::ExtractInlineVariable => (
                rules::variable::extract_inline_candidates,
                rules::variable::infer_extract_inline,
            ),
            RuleId::RenameVariable => (
                rules::variable::rename_candidates,
                rules::variable::infer_rename,
            ),
            RuleId::MergeSplit => (rules::merge_split::candidates, rules::merge_split::infer),
            RuleId::PullUpPushDown => (
                rules::inheritance::candidates,
                rules::inheritance::infer,
            ),
            RuleId::MoveOperation => (
                rules::operation::move_candidates,
                rules::operation::infer_move,
            ),
            RuleId::Annotations => (rules::annotation::candidates, rules::annotation::infer),
            RuleId::ParameterizeVariable => (
                rules::parameter::parameterize_candidates,
                rules::parameter::infer_parameterize,
            ),
            RuleId::AddRemoveParameter => (
                rules::parameter::add_remove_candidates,
                rules::parameter::infer_add_remove,
            ),
        };
        RuleDescriptor {
            id,
            candidates,
            infer,
        }
    }

    pub fn rules(&self) -> &[RuleDescriptor] {
        &self.rules
    }

    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.id).collect()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::with_order(&RuleId::DEFAULT_ORDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_follows_default_order() {
        let catalog = RuleCatalog::default();
        assert_eq!(catalog.ids(), RuleId::DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn test_custom_order() {
        let catalog = RuleCatalog::with_order(&[
            RuleId::ReplaceVariableWithAttribute,
            RuleId::ExtractAttribute,
        ]);
        assert_eq!(catalog.rules().len(), 2);
        assert_eq!(catalog.rules()[0].id, RuleId::ReplaceVariableWithAttribute);
    }
}
