//! Canonical text of expressions and statement headers.
//!
//! Rendering is whitespace-insensitive: two nodes that differ only in
//! formatting render to the same string, which is what the normalizer and
//! the body mapper compare.

use super::{AstNode, CollectionKind, ForStyle, NodeKind, ParameterKind};

fn join(nodes: &[AstNode], separator: &str) -> String {
    nodes
        .iter()
        .filter(|n| !n.is_absent())
        .map(render)
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_at(node: &AstNode, index: usize) -> String {
    node.present(index).map(render).unwrap_or_default()
}

/// Canonical rendering of an expression node
pub fn render(node: &AstNode) -> String {
    let children = &node.children;
    match &node.kind {
        NodeKind::SimpleName { identifier } => identifier.clone(),
        NodeKind::Literal { text, .. } => text.clone(),
        NodeKind::MethodInvocation { name } => {
            let arguments = join(children.get(1..).unwrap_or_default(), ", ");
            match node.present(0) {
                Some(receiver) => format!("{}.{name}({arguments})", render(receiver)),
                None => format!("{name}({arguments})"),
            }
        }
        NodeKind::ObjectCreation { type_name } => {
            format!("new {type_name}({})", join(children, ", "))
        }
        NodeKind::FieldAccess { name } => match node.present(0) {
            Some(receiver) => format!("{}.{name}", render(receiver)),
            None => name.clone(),
        },
        NodeKind::KeywordArgument { name } => format!("{name}={}", render_at(node, 0)),
        NodeKind::BinaryOp { operator } => {
            format!("{} {operator} {}", render_at(node, 0), render_at(node, 1))
        }
        NodeKind::UnaryOp { operator, prefix } => {
            let operand = render_at(node, 0);
            let spaced = operator.chars().any(|c| c.is_alphabetic());
            match (prefix, spaced) {
                (true, true) => format!("{operator} {operand}"),
                (true, false) => format!("{operator}{operand}"),
                (false, _) => format!("{operand}{operator}"),
            }
        }
        NodeKind::Ternary => format!(
            "{} ? {} : {}",
            render_at(node, 0),
            render_at(node, 1),
            render_at(node, 2)
        ),
        NodeKind::Subscript => format!("{}[{}]", render_at(node, 0), render_at(node, 1)),
        NodeKind::Collection { kind } => {
            let items = join(children, ", ");
            match kind {
                CollectionKind::List => format!("[{items}]"),
                CollectionKind::Tuple => format!("({items})"),
                CollectionKind::Set | CollectionKind::Dict | CollectionKind::Array => {
                    format!("{{{items}}}")
                }
            }
        }
        NodeKind::Pair => format!("{}: {}", render_at(node, 0), render_at(node, 1)),
        NodeKind::Parenthesized => format!("({})", render_at(node, 0)),
        NodeKind::ExpressionList => join(children, ", "),
        NodeKind::Lambda => {
            let (params, body) = children.split_at(children.len().saturating_sub(1));
            let params = params
                .iter()
                .map(parameter_text)
                .collect::<Vec<_>>()
                .join(", ");
            let body = body.first().map(render).unwrap_or_default();
            format!("({params}) -> {body}")
        }
        NodeKind::TypeRef { name } => {
            if children.is_empty() {
                name.clone()
            } else {
                format!("{name}[{}]", join(children, ", "))
            }
        }
        NodeKind::Assignment { operator } => {
            let target = render_at(node, 0);
            let value = render_at(node, 2);
            let annotation = node
                .present(1)
                .map(|t| format!(": {}", render(t)))
                .unwrap_or_default();
            if value.is_empty() {
                format!("{target}{annotation}")
            } else {
                format!("{target}{annotation} {operator} {value}")
            }
        }
        NodeKind::Yield { delegate } => {
            let keyword = if *delegate { "yield from" } else { "yield" };
            match node.present(0) {
                Some(value) => format!("{keyword} {}", render(value)),
                None => keyword.to_string(),
            }
        }
        NodeKind::Annotation { name } => {
            if children.is_empty() {
                format!("@{name}")
            } else {
                format!("@{name}({})", join(children, ", "))
            }
        }
        NodeKind::SingleVariableDeclaration { .. } => parameter_text(node),
        NodeKind::ExpressionStatement => render_at(node, 0),
        NodeKind::Other { text, .. } => text.clone(),
        NodeKind::Comment { text } => text.clone(),
        NodeKind::Absent => String::new(),
        _ => statement_text(node),
    }
}

fn parameter_text(node: &AstNode) -> String {
    let NodeKind::SingleVariableDeclaration { name, kind } = &node.kind else {
        return render(node);
    };
    let prefix = match kind {
        ParameterKind::Regular => "",
        ParameterKind::VarArgs => "*",
        ParameterKind::KwArgs => "**",
    };
    let mut text = format!("{prefix}{name}");
    if let Some(ty) = node.present(0) {
        text = format!("{text}: {}", render(ty));
    }
    if let Some(default) = node.present(1) {
        text = format!("{text} = {}", render(default));
    }
    text
}

/// Text of a statement as it appears in a fragment: leaf statements render
/// fully, composite statements render only their header.
pub fn statement_text(node: &AstNode) -> String {
    let children = &node.children;
    match &node.kind {
        NodeKind::Module => "module".to_string(),
        NodeKind::Block => "{".to_string(),
        NodeKind::If => format!("if {}", render_at(node, 0)),
        NodeKind::While { do_while } => {
            let keyword = if *do_while { "do while" } else { "while" };
            format!("{keyword} {}", render_at(node, 0))
        }
        NodeKind::For {
            style: ForStyle::Each,
        } => format!("for {} in {}", render_at(node, 0), render_at(node, 1)),
        NodeKind::For {
            style: ForStyle::Classic,
        } => format!(
            "for({}; {}; {})",
            render_at(node, 0),
            render_at(node, 1),
            render_at(node, 2)
        ),
        NodeKind::Switch => format!("switch {}", render_at(node, 0)),
        NodeKind::Case { is_default } => {
            if *is_default {
                "default".to_string()
            } else {
                let guard = node
                    .present(1)
                    .map(|g| format!(" if {}", render(g)))
                    .unwrap_or_default();
                format!("case {}{guard}", render_at(node, 0))
            }
        }
        NodeKind::Try => {
            let resources = render_at(node, 0);
            if resources.is_empty() {
                "try".to_string()
            } else {
                format!("try({resources})")
            }
        }
        NodeKind::Catch => {
            let types = render_at(node, 0);
            match node.present(1) {
                Some(name) => format!("catch {types} as {}", render(name)).trim().to_string(),
                None => format!("catch {types}").trim_end().to_string(),
            }
        }
        NodeKind::Finally => "finally".to_string(),
        NodeKind::Else => "else".to_string(),
        NodeKind::Break => "break".to_string(),
        NodeKind::Continue => "continue".to_string(),
        NodeKind::Pass => "pass".to_string(),
        NodeKind::Return => match node.present(0) {
            Some(value) => format!("return {}", render(value)),
            None => "return".to_string(),
        },
        NodeKind::Throw => {
            let mut text = "throw".to_string();
            if let Some(exception) = node.present(0) {
                text = format!("{text} {}", render(exception));
            }
            if let Some(cause) = node.present(1) {
                text = format!("{text} from {}", render(cause));
            }
            text
        }
        NodeKind::Assert => match node.present(1) {
            Some(message) => format!("assert {}, {}", render_at(node, 0), render(message)),
            None => format!("assert {}", render_at(node, 0)),
        },
        NodeKind::Global { names } => format!("global {}", names.join(", ")),
        NodeKind::Nonlocal { names } => format!("nonlocal {}", names.join(", ")),
        NodeKind::Del => format!("del {}", join(children, ", ")),
        NodeKind::With => {
            let items = children
                .iter()
                .filter(|c| matches!(c.kind, NodeKind::WithItem))
                .map(statement_text)
                .collect::<Vec<_>>()
                .join(", ");
            format!("with {items}")
        }
        NodeKind::WithItem => match node.present(1) {
            Some(alias) => format!("{} as {}", render_at(node, 0), render(alias)),
            None => render_at(node, 0),
        },
        NodeKind::Async => match children.first() {
            Some(inner) => format!("async {}", statement_text(inner)),
            None => "async".to_string(),
        },
        NodeKind::Synchronized => format!("synchronized({})", render_at(node, 0)),
        NodeKind::Import(decl) => {
            let names = decl
                .names
                .iter()
                .map(|n| match &n.alias {
                    Some(alias) => format!("{} as {alias}", n.name),
                    None => n.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            let names = if decl.is_wildcard { "*".to_string() } else { names };
            let keyword = if decl.is_static { "import static" } else { "import" };
            if decl.module.is_empty() {
                format!("{keyword} {names}")
            } else {
                format!("from {} {keyword} {names}", decl.module)
            }
        }
        NodeKind::VariableDeclarationStatement { .. } => {
            let ty = render_at(node, 0);
            let declarators = children
                .iter()
                .skip(1)
                .filter_map(|d| match &d.kind {
                    NodeKind::SingleVariableDeclaration { name, .. } => Some(match d.present(1) {
                        Some(init) => format!("{name} = {}", render(init)),
                        None => name.clone(),
                    }),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{ty} {declarators}")
        }
        NodeKind::MethodDeclaration(decl) => {
            let params = node
                .parameters()
                .map(parameter_text)
                .collect::<Vec<_>>()
                .join(", ");
            format!("def {}({params})", decl.name)
        }
        NodeKind::TypeDeclaration(decl) => format!("class {}", decl.name),
        NodeKind::EnumConstant { name } => {
            if children.is_empty() {
                name.clone()
            } else {
                format!("{name}({})", join(children, ", "))
            }
        }
        _ => render(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LiteralKind, Span, UnitRef};
    use std::sync::Arc;

    fn unit() -> UnitRef {
        Arc::from("t.py")
    }

    fn name(id: &str) -> AstNode {
        AstNode::new(
            NodeKind::SimpleName {
                identifier: id.to_string(),
            },
            Span::default(),
            unit(),
        )
    }

    fn number(text: &str) -> AstNode {
        AstNode::new(
            NodeKind::Literal {
                kind: LiteralKind::Number,
                text: text.to_string(),
            },
            Span::default(),
            unit(),
        )
    }

    #[test]
    fn test_invocation_rendering() {
        let call = AstNode::new(
            NodeKind::MethodInvocation {
                name: "add".to_string(),
            },
            Span::default(),
            unit(),
        )
        .with_children(vec![name("self"), name("a"), number("2")]);
        assert_eq!(render(&call), "self.add(a, 2)");

        let bare = AstNode::new(
            NodeKind::MethodInvocation {
                name: "len".to_string(),
            },
            Span::default(),
            unit(),
        )
        .with_children(vec![AstNode::absent(Span::default(), unit()), name("xs")]);
        assert_eq!(render(&bare), "len(xs)");
    }

    #[test]
    fn test_unary_spacing() {
        let not = AstNode::new(
            NodeKind::UnaryOp {
                operator: "not".to_string(),
                prefix: true,
            },
            Span::default(),
            unit(),
        )
        .with_children(vec![name("done")]);
        assert_eq!(render(&not), "not done");

        let neg = AstNode::new(
            NodeKind::UnaryOp {
                operator: "-".to_string(),
                prefix: true,
            },
            Span::default(),
            unit(),
        )
        .with_children(vec![number("1")]);
        assert_eq!(render(&neg), "-1");
    }

    #[test]
    fn test_return_header() {
        let ret = AstNode::new(NodeKind::Return, Span::default(), unit())
            .with_children(vec![name("x")]);
        assert_eq!(statement_text(&ret), "return x");
        let bare = AstNode::new(NodeKind::Return, Span::default(), unit())
            .with_children(vec![AstNode::absent(Span::default(), unit())]);
        assert_eq!(statement_text(&bare), "return");
    }
}
