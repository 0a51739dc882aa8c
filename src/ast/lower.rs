//! Helpers shared by the tree-sitter lowering front-ends.

use super::{AstNode, NodeKind, Span, UnitRef};
use crate::errors::ServiceError;
use ast_grep_core::Node;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_language::SupportLang as Language;

pub(crate) type TsNode<'r> = Node<'r, StrDoc<Language>>;

pub(crate) fn span_of(node: &TsNode<'_>) -> Span {
    let range = node.range();
    let start = node.start_pos();
    let end = node.end_pos();
    Span {
        start_line: start.line(),
        start_column: start.column(node),
        end_line: end.line(),
        end_column: end.column(node),
        start_offset: range.start,
        end_offset: range.end,
    }
}

/// Named children, comments excluded
pub(crate) fn named_children<'r>(node: &TsNode<'r>) -> Vec<TsNode<'r>> {
    node.children()
        .filter(|child| child.is_named() && child.kind() != "comment")
        .collect()
}

/// Named children with comments kept, for statement lists
pub(crate) fn statement_children<'r>(node: &TsNode<'r>) -> Vec<TsNode<'r>> {
    node.children().filter(|child| child.is_named()).collect()
}

/// Whether `node` has an anonymous token child spelled `token`
pub(crate) fn has_token(node: &TsNode<'_>, token: &str) -> bool {
    node.children()
        .any(|child| !child.is_named() && child.kind() == token)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reject trees that tree-sitter could only recover with error nodes.
pub(crate) fn check_syntax(root: &TsNode<'_>, path: &str) -> Result<(), ServiceError> {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if node.kind() == "ERROR" {
            let start = node.start_pos();
            let snippet: String = node.text().chars().take(40).collect();
            return Err(ServiceError::parse(
                path,
                start.line(),
                format!("unexpected syntax near `{}`", collapse_whitespace(&snippet)),
            ));
        }
        if node.is_missing() {
            return Err(ServiceError::parse(
                path,
                node.start_pos().line(),
                format!("missing `{}`", node.kind()),
            ));
        }
        stack.extend(node.children());
    }
    Ok(())
}

/// Per-file lowering state shared by the front-ends
pub(crate) struct Lowerer {
    pub(crate) unit: UnitRef,
}

impl Lowerer {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            unit: UnitRef::from(path),
        }
    }

    pub(crate) fn node(&self, kind: NodeKind, ts: &TsNode<'_>) -> AstNode {
        AstNode::new(kind, span_of(ts), self.unit.clone())
    }

    pub(crate) fn node_at(&self, kind: NodeKind, span: Span) -> AstNode {
        AstNode::new(kind, span, self.unit.clone())
    }

    pub(crate) fn absent(&self, span: Span) -> AstNode {
        AstNode::absent(span, self.unit.clone())
    }

    pub(crate) fn absent_after(&self, ts: &TsNode<'_>) -> AstNode {
        self.absent(span_of(ts).end_point())
    }

    pub(crate) fn absent_before(&self, ts: &TsNode<'_>) -> AstNode {
        self.absent(span_of(ts).start_point())
    }

    pub(crate) fn other(&self, ts: &TsNode<'_>, children: Vec<AstNode>) -> AstNode {
        self.node(
            NodeKind::Other {
                kind: ts.kind().to_string(),
                text: collapse_whitespace(&ts.text()),
            },
            ts,
        )
        .with_children(children)
    }

    pub(crate) fn simple_name(&self, ts: &TsNode<'_>) -> AstNode {
        self.node(
            NodeKind::SimpleName {
                identifier: ts.text().to_string(),
            },
            ts,
        )
    }

    /// Empty list container positioned at `span`
    pub(crate) fn empty_list(&self, span: Span) -> AstNode {
        self.node_at(NodeKind::ExpressionList, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  +\n   b"), "a + b");
    }
}
