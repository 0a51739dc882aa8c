//! Sub-expression facts extracted from a fragment for replacement matching.

use crate::ast::{AstNode, AstVisitor, NodeKind, render};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub text: String,
    pub name: String,
    pub receiver: Option<String>,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccess {
    pub text: String,
    pub receiver: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TernaryFact {
    pub text: String,
    pub condition: String,
    pub then_branch: String,
    pub else_branch: String,
}

/// Everything the replacement finder may substitute inside a fragment,
/// in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentFacts {
    /// Distinct simple names
    pub variables: Vec<String>,
    pub invocations: Vec<Invocation>,
    pub field_accesses: Vec<FieldAccess>,
    pub literals: Vec<String>,
    pub ternaries: Vec<TernaryFact>,
    pub creations: Vec<String>,
    pub subscripts: Vec<String>,
    /// Rendered invocation and creation arguments
    pub arguments: Vec<String>,
}

impl FragmentFacts {
    pub fn collect(nodes: &[&AstNode]) -> Self {
        let mut collector = FactCollector::default();
        for node in nodes {
            node.accept(&mut collector);
        }
        collector.facts
    }

    pub fn mentions_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub fn accesses_field(&self, receiver: &str, name: &str) -> bool {
        self.field_accesses
            .iter()
            .any(|f| f.receiver == receiver && f.name == name)
    }

    /// All sub-expression texts, used for variable/expression substitution
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.invocations
            .iter()
            .map(|i| i.text.as_str())
            .chain(self.field_accesses.iter().map(|f| f.text.as_str()))
            .chain(self.creations.iter().map(String::as_str))
            .chain(self.subscripts.iter().map(String::as_str))
            .chain(self.ternaries.iter().map(|t| t.text.as_str()))
            .chain(self.arguments.iter().map(String::as_str))
            .chain(self.literals.iter().map(String::as_str))
    }
}

#[derive(Default)]
struct FactCollector {
    facts: FragmentFacts,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

impl AstVisitor for FactCollector {
    fn visit(&mut self, node: &AstNode) -> bool {
        match &node.kind {
            NodeKind::SimpleName { identifier } => {
                push_unique(&mut self.facts.variables, identifier.clone())
            }
            NodeKind::MethodInvocation { name } => {
                let arguments: Vec<String> = node
                    .children
                    .iter()
                    .skip(1)
                    .filter(|a| !a.is_absent())
                    .map(render)
                    .collect();
                for argument in &arguments {
                    push_unique(&mut self.facts.arguments, argument.clone());
                }
                self.facts.invocations.push(Invocation {
                    text: render(node),
                    name: name.clone(),
                    receiver: node.present(0).map(render),
                    arguments,
                });
            }
            NodeKind::ObjectCreation { .. } => {
                for argument in node.children.iter().filter(|a| !a.is_absent()) {
                    push_unique(&mut self.facts.arguments, render(argument));
                }
                push_unique(&mut self.facts.creations, render(node));
            }
            NodeKind::FieldAccess { name } => {
                if let Some(receiver) = node.present(0) {
                    self.facts.field_accesses.push(FieldAccess {
                        text: render(node),
                        receiver: render(receiver),
                        name: name.clone(),
                    });
                }
            }
            NodeKind::Literal { text, .. } => push_unique(&mut self.facts.literals, text.clone()),
            NodeKind::Ternary => self.facts.ternaries.push(TernaryFact {
                text: render(node),
                condition: node.present(0).map(render).unwrap_or_default(),
                then_branch: node.present(1).map(render).unwrap_or_default(),
                else_branch: node.present(2).map(render).unwrap_or_default(),
            }),
            NodeKind::Subscript => push_unique(&mut self.facts.subscripts, render(node)),
            // Type names are not variables
            NodeKind::TypeRef { .. } => return false,
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::python;

    fn facts_of(source: &str) -> FragmentFacts {
        let unit = python::lower("f.py", source).expect("parse");
        let statement = &unit.root.children[0];
        FragmentFacts::collect(&[statement])
    }

    #[test]
    fn test_collects_invocations_and_fields() {
        let facts = facts_of("total = self.tax(price) * rate if rate else 0\n");
        assert!(facts.mentions_variable("price"));
        assert!(facts.mentions_variable("rate"));
        assert_eq!(facts.invocations.len(), 1);
        assert_eq!(facts.invocations[0].receiver.as_deref(), Some("self"));
        assert_eq!(facts.ternaries.len(), 1);
        assert_eq!(facts.ternaries[0].else_branch, "0");
    }

    #[test]
    fn test_literals_are_distinct() {
        let facts = facts_of("x = [1, 1, 2]\n");
        assert_eq!(facts.literals, vec!["1", "2"]);
    }
}
