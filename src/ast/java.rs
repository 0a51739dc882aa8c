//! Java front-end: lowers a tree-sitter-java tree into the intermediate AST.

use super::lower::{
    Lowerer, TsNode, check_syntax, collapse_whitespace, has_token, named_children, span_of,
    statement_children,
};
use super::{
    AstNode, CollectionKind, CompilationUnit, ForStyle, ImportDecl, ImportedName, LiteralKind,
    MethodDecl, Modifiers, NodeKind, ParameterKind, SourceLanguage, Span, TypeDecl, TypeKind,
    Visibility,
};
use crate::errors::ServiceError;
use ast_grep_core::AstGrep;
use ast_grep_language::SupportLang as Language;

pub fn lower(path: &str, source: &str) -> Result<CompilationUnit, ServiceError> {
    let grep = AstGrep::new(source, Language::Java);
    let root = grep.root();
    check_syntax(&root, path)?;

    let lowering = JavaLowering {
        base: Lowerer::new(path),
    };
    let children = statement_children(&root)
        .iter()
        .map(|child| lowering.declaration(child))
        .collect();
    let module = lowering
        .base
        .node(NodeKind::Module, &root)
        .with_children(children);

    Ok(CompilationUnit {
        path: lowering.base.unit.clone(),
        language: SourceLanguage::Java,
        root: module,
    })
}

struct JavaLowering {
    base: Lowerer,
}

/// Keyword modifiers plus the annotations found in a `modifiers` node
struct DeclaredModifiers {
    modifiers: Modifiers,
    annotations: Vec<AstNode>,
}

impl JavaLowering {
    fn modifiers(&self, ts: &TsNode<'_>) -> DeclaredModifiers {
        let mut declared = DeclaredModifiers {
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
        };
        let Some(node) = ts.children().find(|c| c.kind() == "modifiers") else {
            return declared;
        };
        for child in node.children() {
            let kind = child.kind();
            match kind.as_ref() {
                "annotation" | "marker_annotation" => {
                    declared.annotations.push(self.annotation(&child))
                }
                "public" => declared.modifiers.visibility = Some(Visibility::Public),
                "protected" => declared.modifiers.visibility = Some(Visibility::Protected),
                "private" => declared.modifiers.visibility = Some(Visibility::Private),
                "static" => declared.modifiers.is_static = true,
                "abstract" => declared.modifiers.is_abstract = true,
                "final" => declared.modifiers.is_final = true,
                "default" => declared.modifiers.is_default = true,
                "synchronized" => declared.modifiers.is_synchronized = true,
                _ => {}
            }
        }
        declared
    }

    fn annotation(&self, ts: &TsNode<'_>) -> AstNode {
        let name = ts
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let arguments = ts
            .field("arguments")
            .map(|args| {
                named_children(&args)
                    .iter()
                    .map(|arg| match arg.kind().as_ref() {
                        "element_value_pair" => {
                            let key = arg
                                .field("key")
                                .map(|k| k.text().to_string())
                                .unwrap_or_default();
                            let value = arg
                                .field("value")
                                .map(|v| self.expression(&v))
                                .unwrap_or_else(|| self.base.absent_after(arg));
                            self.base
                                .node(NodeKind::KeywordArgument { name: key }, arg)
                                .with_children(vec![value])
                        }
                        _ => self.expression(arg),
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.base
            .node(NodeKind::Annotation { name }, ts)
            .with_children(arguments)
    }

    /// Top-level and member declarations
    fn declaration(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.kind().as_ref() {
            "package_declaration" => {
                let name = named_children(ts)
                    .into_iter()
                    .find(|c| c.kind() != "annotation" && c.kind() != "marker_annotation")
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                self.base.node(
                    NodeKind::Other {
                        kind: "package".to_string(),
                        text: name,
                    },
                    ts,
                )
            }
            "import_declaration" => self.import(ts),
            "class_declaration" => self.type_declaration(ts, TypeKind::Class),
            "interface_declaration" => self.type_declaration(ts, TypeKind::Interface),
            "enum_declaration" => self.type_declaration(ts, TypeKind::Enum),
            "record_declaration" => self.type_declaration(ts, TypeKind::Record),
            "annotation_type_declaration" => {
                self.type_declaration(ts, TypeKind::AnnotationType)
            }
            "field_declaration" | "constant_declaration" => self.variable_declaration(ts),
            "method_declaration" | "annotation_type_element_declaration" => {
                self.method(ts, false)
            }
            "constructor_declaration" | "compact_constructor_declaration" => {
                self.method(ts, true)
            }
            "enum_constant" => {
                let name = ts
                    .field("name")
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                let arguments = ts
                    .field("arguments")
                    .map(|args| self.arguments(&args))
                    .unwrap_or_default();
                self.base
                    .node(NodeKind::EnumConstant { name }, ts)
                    .with_children(arguments)
            }
            "line_comment" | "block_comment" => self.base.node(
                NodeKind::Comment {
                    text: ts.text().to_string(),
                },
                ts,
            ),
            _ => self.statement(ts),
        }
    }

    fn import(&self, ts: &TsNode<'_>) -> AstNode {
        let path = named_children(ts)
            .into_iter()
            .find(|c| c.kind() == "scoped_identifier" || c.kind() == "identifier")
            .map(|p| p.text().to_string())
            .unwrap_or_default();
        let is_wildcard = ts.children().any(|c| c.kind() == "asterisk");
        let is_static = has_token(ts, "static");
        let (module, names) = if is_wildcard {
            (path, Vec::new())
        } else {
            match path.rsplit_once('.') {
                Some((module, name)) => (
                    module.to_string(),
                    vec![ImportedName {
                        name: name.to_string(),
                        alias: None,
                    }],
                ),
                None => (
                    String::new(),
                    vec![ImportedName {
                        name: path,
                        alias: None,
                    }],
                ),
            }
        };
        self.base.node(
            NodeKind::Import(ImportDecl {
                module,
                names,
                is_wildcard,
                is_static,
            }),
            ts,
        )
    }

    fn type_declaration(&self, ts: &TsNode<'_>, kind: TypeKind) -> AstNode {
        let declared = self.modifiers(ts);
        let name = ts
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();

        let mut supertypes = Vec::new();
        for child in named_children(ts) {
            match child.kind().as_ref() {
                "superclass" => supertypes.extend(
                    named_children(&child)
                        .iter()
                        .map(|t| Self::type_name(t)),
                ),
                "super_interfaces" | "extends_interfaces" => {
                    for list in named_children(&child) {
                        supertypes.extend(named_children(&list).iter().map(|t| Self::type_name(t)));
                    }
                }
                _ => {}
            }
        }

        let mut children = declared.annotations;
        if kind == TypeKind::Record {
            if let Some(components) = ts.field("parameters") {
                children.extend(self.parameters(&components));
            }
        }
        children.push(self.type_body(ts.field("body"), span_of(ts).end_point()));

        self.base
            .node(
                NodeKind::TypeDeclaration(TypeDecl {
                    name,
                    kind,
                    modifiers: declared.modifiers,
                    supertypes,
                    keywords: Vec::new(),
                }),
                ts,
            )
            .with_children(children)
    }

    fn type_body(&self, ts: Option<TsNode<'_>>, anchor: Span) -> AstNode {
        let Some(body) = ts else {
            return self.base.node_at(NodeKind::Block, anchor);
        };
        let mut members = Vec::new();
        for member in statement_children(&body) {
            if member.kind() == "enum_body_declarations" {
                members.extend(
                    statement_children(&member)
                        .iter()
                        .map(|m| self.declaration(m)),
                );
            } else {
                members.push(self.declaration(&member));
            }
        }
        self.base
            .node(NodeKind::Block, &body)
            .with_children(members)
    }

    fn method(&self, ts: &TsNode<'_>, is_constructor: bool) -> AstNode {
        let declared = self.modifiers(ts);
        let name = ts
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let parameters_node = ts.field("parameters");
        let parameters = parameters_node
            .as_ref()
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let return_type = match ts.field("type") {
            Some(ty) if !is_constructor => self.type_ref(&ty),
            _ => {
                let anchor = parameters_node
                    .as_ref()
                    .map(|p| span_of(p).end_point())
                    .unwrap_or_else(|| span_of(ts).end_point());
                self.base.absent(anchor)
            }
        };
        let body = match ts.field("body") {
            Some(body) => self.block(&body),
            None => self.base.absent_after(ts),
        };

        let mut children = declared.annotations;
        children.extend(parameters);
        children.push(return_type);
        children.push(body);

        self.base
            .node(
                NodeKind::MethodDeclaration(MethodDecl {
                    name,
                    modifiers: declared.modifiers,
                    is_constructor,
                    is_async: false,
                }),
                ts,
            )
            .with_children(children)
    }

    fn parameters(&self, ts: &TsNode<'_>) -> Vec<AstNode> {
        named_children(ts)
            .iter()
            .filter_map(|param| match param.kind().as_ref() {
                "formal_parameter" => {
                    let name = param
                        .field("name")
                        .map(|n| n.text().to_string())
                        .unwrap_or_default();
                    let ty = param
                        .field("type")
                        .map(|t| self.type_ref(&t))
                        .unwrap_or_else(|| self.base.absent_before(param));
                    Some(
                        self.base
                            .node(
                                NodeKind::SingleVariableDeclaration {
                                    name,
                                    kind: ParameterKind::Regular,
                                },
                                param,
                            )
                            .with_children(vec![ty, self.base.absent_after(param)]),
                    )
                }
                "spread_parameter" => {
                    let parts = named_children(param);
                    let ty = parts
                        .iter()
                        .find(|p| p.kind() != "modifiers" && p.kind() != "variable_declarator")
                        .map(|t| self.type_ref(t))
                        .unwrap_or_else(|| self.base.absent_before(param));
                    let name = parts
                        .iter()
                        .find(|p| p.kind() == "variable_declarator")
                        .and_then(|d| d.field("name"))
                        .map(|n| n.text().to_string())
                        .unwrap_or_default();
                    Some(
                        self.base
                            .node(
                                NodeKind::SingleVariableDeclaration {
                                    name,
                                    kind: ParameterKind::VarArgs,
                                },
                                param,
                            )
                            .with_children(vec![ty, self.base.absent_after(param)]),
                    )
                }
                "identifier" => Some(
                    self.base
                        .node(
                            NodeKind::SingleVariableDeclaration {
                                name: param.text().to_string(),
                                kind: ParameterKind::Regular,
                            },
                            param,
                        )
                        .with_children(vec![
                            self.base.absent_before(param),
                            self.base.absent_after(param),
                        ]),
                ),
                _ => None,
            })
            .collect()
    }

    fn type_name(ts: &TsNode<'_>) -> String {
        collapse_whitespace(&ts.text())
    }

    fn type_ref(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.kind().as_ref() {
            "generic_type" => {
                let parts = named_children(ts);
                let base = parts
                    .iter()
                    .find(|p| p.kind() != "type_arguments")
                    .map(|b| Self::type_name(b))
                    .unwrap_or_default();
                let arguments = parts
                    .iter()
                    .filter(|p| p.kind() == "type_arguments")
                    .flat_map(|args| named_children(args))
                    .map(|arg| self.type_ref(&arg))
                    .collect();
                self.base
                    .node(NodeKind::TypeRef { name: base }, ts)
                    .with_children(arguments)
            }
            "array_type" => {
                let element = ts
                    .field("element")
                    .map(|e| self.type_ref(&e))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let name = format!("{}[]", super::render(&element));
                self.base.node(NodeKind::TypeRef { name }, ts)
            }
            _ => self.base.node(
                NodeKind::TypeRef {
                    name: Self::type_name(ts),
                },
                ts,
            ),
        }
    }

    /// `field_declaration` or `local_variable_declaration`
    fn variable_declaration(&self, ts: &TsNode<'_>) -> AstNode {
        let declared = self.modifiers(ts);
        let ty = ts
            .field("type")
            .map(|t| self.type_ref(&t))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let mut children = vec![ty];
        for declarator in named_children(ts) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            children.push(self.declarator(&declarator));
        }
        self.base
            .node(
                NodeKind::VariableDeclarationStatement {
                    modifiers: declared.modifiers,
                },
                ts,
            )
            .with_children(children)
    }

    fn declarator(&self, ts: &TsNode<'_>) -> AstNode {
        let name = ts
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let value = ts
            .field("value")
            .map(|v| self.expression(&v))
            .unwrap_or_else(|| self.base.absent_after(ts));
        self.base
            .node(
                NodeKind::SingleVariableDeclaration {
                    name,
                    kind: ParameterKind::Regular,
                },
                ts,
            )
            .with_children(vec![self.base.absent_before(ts), value])
    }

    fn block(&self, ts: &TsNode<'_>) -> AstNode {
        let statements = statement_children(ts)
            .iter()
            .map(|s| self.statement(s))
            .collect();
        self.base
            .node(NodeKind::Block, ts)
            .with_children(statements)
    }

    /// A statement body: blocks are kept, a single statement is wrapped
    fn body(&self, ts: Option<TsNode<'_>>, anchor: Span) -> AstNode {
        match ts {
            Some(body) if body.kind() == "block" || body.kind() == "constructor_body" => {
                self.block(&body)
            }
            Some(statement) => self
                .base
                .node(NodeKind::Block, &statement)
                .with_children(vec![self.statement(&statement)]),
            None => self.base.node_at(NodeKind::Block, anchor),
        }
    }

    fn condition(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.field("condition") {
            Some(c) if c.kind() == "parenthesized_expression" => named_children(&c)
                .first()
                .map(|inner| self.expression(inner))
                .unwrap_or_else(|| self.base.absent_after(&c)),
            Some(c) => self.expression(&c),
            None => self.base.absent_before(ts),
        }
    }

    fn statement(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.kind().as_ref() {
            "local_variable_declaration" => self.variable_declaration(ts),
            "expression_statement" => match named_children(ts).first() {
                Some(expr) if expr.kind() == "assignment_expression" => {
                    self.assignment(expr, span_of(ts))
                }
                Some(expr) => self
                    .base
                    .node(NodeKind::ExpressionStatement, ts)
                    .with_children(vec![self.expression(expr)]),
                None => self.base.other(ts, Vec::new()),
            },
            "explicit_constructor_invocation" => {
                let name = ts
                    .field("constructor")
                    .map(|c| c.text().to_string())
                    .unwrap_or_else(|| "super".to_string());
                let receiver = ts
                    .field("object")
                    .map(|o| self.expression(&o))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let mut children = vec![receiver];
                if let Some(args) = ts.field("arguments") {
                    children.extend(self.arguments(&args));
                }
                let call = self
                    .base
                    .node(NodeKind::MethodInvocation { name }, ts)
                    .with_children(children);
                self.base
                    .node(NodeKind::ExpressionStatement, ts)
                    .with_children(vec![call])
            }
            "block" => self.block(ts),
            "if_statement" => {
                let condition = self.condition(ts);
                let then = self.body(ts.field("consequence"), span_of(ts).end_point());
                let otherwise = match ts.field("alternative") {
                    Some(alt) if alt.kind() == "if_statement" => self.statement(&alt),
                    Some(alt) => self.body(Some(alt), span_of(ts).end_point()),
                    None => self.base.absent(then.span.end_point()),
                };
                self.base
                    .node(NodeKind::If, ts)
                    .with_children(vec![condition, then, otherwise])
            }
            "while_statement" => {
                let condition = self.condition(ts);
                let body = self.body(ts.field("body"), span_of(ts).end_point());
                let anchor = body.span.end_point();
                self.base
                    .node(NodeKind::While { do_while: false }, ts)
                    .with_children(vec![condition, body, self.base.absent(anchor)])
            }
            "do_statement" => {
                let body = self.body(ts.field("body"), span_of(ts).start_point());
                let condition = self.condition(ts);
                let anchor = span_of(ts).end_point();
                self.base
                    .node(NodeKind::While { do_while: true }, ts)
                    .with_children(vec![condition, body, self.base.absent(anchor)])
            }
            "for_statement" => self.for_statement(ts),
            "enhanced_for_statement" => {
                let name = ts
                    .field("name")
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                let ty = ts
                    .field("type")
                    .map(|t| self.type_ref(&t))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let target_span = match ts.field("name") {
                    Some(n) => ty.span.to(&span_of(&n)),
                    None => ty.span,
                };
                let target = self
                    .base
                    .node_at(
                        NodeKind::SingleVariableDeclaration {
                            name,
                            kind: ParameterKind::Regular,
                        },
                        target_span,
                    )
                    .with_children(vec![ty, self.base.absent(target_span.end_point())]);
                let iterable = ts
                    .field("value")
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent(target_span.end_point()));
                let body = self.body(ts.field("body"), span_of(ts).end_point());
                let anchor = body.span.end_point();
                self.base
                    .node(
                        NodeKind::For {
                            style: ForStyle::Each,
                        },
                        ts,
                    )
                    .with_children(vec![target, iterable, body, self.base.absent(anchor)])
            }
            "switch_expression" | "switch_statement" => self.switch(ts),
            "try_statement" | "try_with_resources_statement" => self.try_statement(ts),
            "return_statement" => {
                let value = named_children(ts)
                    .first()
                    .map(|v| self.expression(v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Return, ts)
                    .with_children(vec![value])
            }
            "throw_statement" => {
                let exception = named_children(ts)
                    .first()
                    .map(|v| self.expression(v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                let cause = self.base.absent_after(ts);
                self.base
                    .node(NodeKind::Throw, ts)
                    .with_children(vec![exception, cause])
            }
            "assert_statement" => {
                let parts = named_children(ts);
                let condition = parts
                    .first()
                    .map(|c| self.expression(c))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                let message = parts
                    .get(1)
                    .map(|m| self.expression(m))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Assert, ts)
                    .with_children(vec![condition, message])
            }
            "yield_statement" => {
                let value = named_children(ts)
                    .first()
                    .map(|v| self.expression(v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Yield { delegate: false }, ts)
                    .with_children(vec![value])
            }
            "break_statement" => self.base.node(NodeKind::Break, ts),
            "continue_statement" => self.base.node(NodeKind::Continue, ts),
            "synchronized_statement" => {
                let lock = named_children(ts)
                    .into_iter()
                    .find(|c| c.kind() == "parenthesized_expression")
                    .and_then(|p| named_children(&p).into_iter().next())
                    .map(|l| self.expression(&l))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let body = self.body(ts.field("body"), span_of(ts).end_point());
                self.base
                    .node(NodeKind::Synchronized, ts)
                    .with_children(vec![lock, body])
            }
            "labeled_statement" => match named_children(ts).last() {
                Some(inner) if inner.kind() != "identifier" => self.statement(inner),
                _ => self.base.other(ts, Vec::new()),
            },
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "record_declaration" | "local_class_declaration" => self.declaration(ts),
            "line_comment" | "block_comment" => self.base.node(
                NodeKind::Comment {
                    text: ts.text().to_string(),
                },
                ts,
            ),
            _ => self.base.other(ts, Vec::new()),
        }
    }

    /// Classic `for`: children are split into init, condition, update and body
    /// by the `;` and `)` tokens.
    fn for_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let mut section = 0;
        let mut init = Vec::new();
        let mut condition = None;
        let mut update = Vec::new();
        let mut body = None;
        let mut separators = Vec::new();
        for child in ts.children() {
            if !child.is_named() {
                match child.kind().as_ref() {
                    ";" => {
                        section += 1;
                        separators.push(span_of(&child));
                    }
                    ")" => {
                        section = 3;
                        separators.push(span_of(&child));
                    }
                    _ => {}
                }
                continue;
            }
            if matches!(child.kind().as_ref(), "line_comment" | "block_comment") {
                continue;
            }
            match section {
                0 if child.kind() == "local_variable_declaration" => {
                    init.push(self.variable_declaration(&child));
                    section = 1;
                }
                0 => init.push(self.expression(&child)),
                1 => condition = Some(self.expression(&child)),
                2 => update.push(self.expression(&child)),
                _ => body = Some(child),
            }
        }

        let start = span_of(ts).start_point();
        let list = |items: Vec<AstNode>, fallback: Span| match (items.first(), items.last()) {
            (Some(first), Some(last)) => {
                let span = first.span.to(&last.span);
                self.base
                    .node_at(NodeKind::ExpressionList, span)
                    .with_children(items)
            }
            _ => self.base.empty_list(fallback),
        };
        let init = list(init, separators.first().copied().unwrap_or(start).start_point());
        let condition =
            condition.unwrap_or_else(|| self.base.absent(separators.get(1).copied().unwrap_or(start).start_point()));
        let update = list(update, separators.last().copied().unwrap_or(start).start_point());
        let body = self.body(body, span_of(ts).end_point());

        self.base
            .node(
                NodeKind::For {
                    style: ForStyle::Classic,
                },
                ts,
            )
            .with_children(vec![init, condition, update, body])
    }

    fn switch(&self, ts: &TsNode<'_>) -> AstNode {
        let subject = self.condition(ts);
        let mut children = vec![subject];
        if let Some(block) = ts.field("body") {
            for group in named_children(&block) {
                match group.kind().as_ref() {
                    "switch_block_statement_group" | "switch_rule" => {
                        children.push(self.case(&group))
                    }
                    _ => {}
                }
            }
        }
        self.base.node(NodeKind::Switch, ts).with_children(children)
    }

    fn case(&self, ts: &TsNode<'_>) -> AstNode {
        let parts = statement_children(ts);
        let labels: Vec<_> = parts.iter().filter(|p| p.kind() == "switch_label").collect();
        let statements: Vec<_> = parts.iter().filter(|p| p.kind() != "switch_label").collect();

        let is_default = labels.iter().any(|l| l.text().trim_start().starts_with("default"));
        let patterns: Vec<AstNode> = labels
            .iter()
            .flat_map(|label| named_children(label))
            .map(|p| self.expression(&p))
            .collect();
        let pattern_span = match (labels.first(), labels.last()) {
            (Some(first), Some(last)) => span_of(first).to(&span_of(last)),
            _ => span_of(ts).start_point(),
        };
        let patterns = self
            .base
            .node_at(NodeKind::ExpressionList, pattern_span)
            .with_children(patterns);
        let guard = self.base.absent(pattern_span.end_point());

        let body = match (statements.first(), statements.last()) {
            (Some(first), _) if statements.len() == 1 && first.kind() == "block" => self.block(first),
            (Some(first), Some(last)) => self
                .base
                .node_at(NodeKind::Block, span_of(first).to(&span_of(last)))
                .with_children(statements.iter().map(|s| self.statement(s)).collect()),
            _ => self.base.node_at(NodeKind::Block, span_of(ts).end_point()),
        };

        self.base
            .node(NodeKind::Case { is_default }, ts)
            .with_children(vec![patterns, guard, body])
    }

    fn try_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let resources = match ts.field("resources") {
            Some(spec) => {
                let items = named_children(&spec)
                    .iter()
                    .map(|r| self.resource(r))
                    .collect();
                self.base
                    .node(NodeKind::ExpressionList, &spec)
                    .with_children(items)
            }
            None => {
                let anchor = ts
                    .field("body")
                    .map(|b| span_of(&b).start_point())
                    .unwrap_or_else(|| span_of(ts).start_point());
                self.base.empty_list(anchor)
            }
        };
        let body = self.body(ts.field("body"), span_of(ts).end_point());

        let mut anchor = body.span.end_point();
        let mut children = vec![resources, body];
        let mut finally = None;
        for clause in named_children(ts) {
            match clause.kind().as_ref() {
                "catch_clause" => {
                    let catch = self.catch_clause(&clause);
                    anchor = catch.span.end_point();
                    children.push(catch);
                }
                "finally_clause" => {
                    let block = named_children(&clause)
                        .into_iter()
                        .find(|c| c.kind() == "block");
                    let inner = self.body(block, span_of(&clause).end_point());
                    finally = Some(
                        self.base
                            .node(NodeKind::Finally, &clause)
                            .with_children(vec![inner]),
                    );
                }
                _ => {}
            }
        }
        children.push(self.base.absent(anchor));
        children.push(finally.unwrap_or_else(|| self.base.absent(anchor)));
        self.base.node(NodeKind::Try, ts).with_children(children)
    }

    fn resource(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.field("name") {
            Some(name) => {
                let ty = ts
                    .field("type")
                    .map(|t| self.type_ref(&t))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let value = ts
                    .field("value")
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(
                        NodeKind::SingleVariableDeclaration {
                            name: name.text().to_string(),
                            kind: ParameterKind::Regular,
                        },
                        ts,
                    )
                    .with_children(vec![ty, value])
            }
            None => match named_children(ts).first() {
                Some(expr) => self.expression(expr),
                None => self.base.other(ts, Vec::new()),
            },
        }
    }

    fn catch_clause(&self, ts: &TsNode<'_>) -> AstNode {
        let parameter = named_children(ts)
            .into_iter()
            .find(|c| c.kind() == "catch_formal_parameter");
        let (types, name) = match parameter {
            Some(param) => {
                let types: Vec<AstNode> = named_children(&param)
                    .iter()
                    .filter(|c| c.kind() == "catch_type")
                    .flat_map(|c| named_children(c))
                    .map(|t| self.type_ref(&t))
                    .collect();
                let list = self
                    .base
                    .node(NodeKind::ExpressionList, &param)
                    .with_children(types);
                let name = param
                    .field("name")
                    .map(|n| self.base.simple_name(&n))
                    .unwrap_or_else(|| self.base.absent_after(&param));
                (list, name)
            }
            None => (
                self.base.empty_list(span_of(ts).start_point()),
                self.base.absent(span_of(ts).start_point()),
            ),
        };
        let body = self.body(ts.field("body"), span_of(ts).end_point());
        self.base
            .node(NodeKind::Catch, ts)
            .with_children(vec![types, name, body])
    }

    fn assignment(&self, ts: &TsNode<'_>, span: Span) -> AstNode {
        let operator = ts
            .field("operator")
            .map(|op| op.text().to_string())
            .unwrap_or_else(|| "=".to_string());
        let target = ts
            .field("left")
            .map(|l| self.expression(&l))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let annotation = self.base.absent(target.span.end_point());
        let value = ts
            .field("right")
            .map(|r| self.expression(&r))
            .unwrap_or_else(|| self.base.absent_after(ts));
        self.base
            .node_at(NodeKind::Assignment { operator }, span)
            .with_children(vec![target, annotation, value])
    }

    fn arguments(&self, ts: &TsNode<'_>) -> Vec<AstNode> {
        named_children(ts)
            .iter()
            .map(|arg| self.expression(arg))
            .collect()
    }

    fn literal(&self, ts: &TsNode<'_>, kind: LiteralKind) -> AstNode {
        self.base.node(
            NodeKind::Literal {
                kind,
                text: ts.text().to_string(),
            },
            ts,
        )
    }

    fn expression(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.kind().as_ref() {
            "identifier" | "this" | "super" => self.base.simple_name(ts),
            "field_access" => {
                let name = ts
                    .field("field")
                    .map(|f| f.text().to_string())
                    .unwrap_or_default();
                let receiver = ts
                    .field("object")
                    .map(|o| self.expression(&o))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                self.base
                    .node(NodeKind::FieldAccess { name }, ts)
                    .with_children(vec![receiver])
            }
            "method_invocation" => {
                let name_node = ts.field("name");
                let name = name_node
                    .as_ref()
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                let receiver = match ts.field("object") {
                    Some(object) => self.expression(&object),
                    None => match &name_node {
                        Some(n) => self.base.absent_before(n),
                        None => self.base.absent_before(ts),
                    },
                };
                let mut children = vec![receiver];
                if let Some(args) = ts.field("arguments") {
                    children.extend(self.arguments(&args));
                }
                self.base
                    .node(NodeKind::MethodInvocation { name }, ts)
                    .with_children(children)
            }
            "object_creation_expression" => {
                let type_name = ts
                    .field("type")
                    .map(|t| Self::type_name(&t))
                    .unwrap_or_default();
                let arguments = ts
                    .field("arguments")
                    .map(|args| self.arguments(&args))
                    .unwrap_or_default();
                self.base
                    .node(NodeKind::ObjectCreation { type_name }, ts)
                    .with_children(arguments)
            }
            "assignment_expression" => self.assignment(ts, span_of(ts)),
            "binary_expression" => {
                let operator = ts
                    .field("operator")
                    .map(|op| op.text().to_string())
                    .unwrap_or_default();
                let left = ts
                    .field("left")
                    .map(|l| self.expression(&l))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let right = ts
                    .field("right")
                    .map(|r| self.expression(&r))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::BinaryOp { operator }, ts)
                    .with_children(vec![left, right])
            }
            "instanceof_expression" => {
                let left = ts
                    .field("left")
                    .map(|l| self.expression(&l))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let right = ts
                    .field("right")
                    .map(|r| self.type_ref(&r))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(
                        NodeKind::BinaryOp {
                            operator: "instanceof".to_string(),
                        },
                        ts,
                    )
                    .with_children(vec![left, right])
            }
            "unary_expression" => {
                let operator = ts
                    .field("operator")
                    .map(|op| op.text().to_string())
                    .unwrap_or_default();
                let operand = ts
                    .field("operand")
                    .map(|o| self.expression(&o))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(
                        NodeKind::UnaryOp {
                            operator,
                            prefix: true,
                        },
                        ts,
                    )
                    .with_children(vec![operand])
            }
            "update_expression" => {
                let prefix = ts.children().next().map(|c| !c.is_named()).unwrap_or(false);
                let operator = ts
                    .children()
                    .find(|c| !c.is_named())
                    .map(|c| c.text().to_string())
                    .unwrap_or_default();
                let operand = named_children(ts)
                    .first()
                    .map(|o| self.expression(o))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::UnaryOp { operator, prefix }, ts)
                    .with_children(vec![operand])
            }
            "ternary_expression" => {
                let part = |field: &str| {
                    ts.field(field)
                        .map(|p| self.expression(&p))
                        .unwrap_or_else(|| self.base.absent_after(ts))
                };
                self.base.node(NodeKind::Ternary, ts).with_children(vec![
                    part("condition"),
                    part("consequence"),
                    part("alternative"),
                ])
            }
            "array_access" => {
                let array = ts
                    .field("array")
                    .map(|a| self.expression(&a))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let index = ts
                    .field("index")
                    .map(|i| self.expression(&i))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Subscript, ts)
                    .with_children(vec![array, index])
            }
            "parenthesized_expression" => {
                let inner = named_children(ts)
                    .first()
                    .map(|i| self.expression(i))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Parenthesized, ts)
                    .with_children(vec![inner])
            }
            "lambda_expression" => {
                let mut children = match ts.field("parameters") {
                    Some(params) if params.kind() == "identifier" => self.parameters_of_single(&params),
                    Some(params) => self.parameters(&params),
                    None => Vec::new(),
                };
                let body = match ts.field("body") {
                    Some(b) if b.kind() == "block" => self.base.other(&b, Vec::new()),
                    Some(b) => self.expression(&b),
                    None => self.base.absent_after(ts),
                };
                children.push(body);
                self.base.node(NodeKind::Lambda, ts).with_children(children)
            }
            "array_initializer" => self
                .base
                .node(
                    NodeKind::Collection {
                        kind: CollectionKind::Array,
                    },
                    ts,
                )
                .with_children(self.arguments(ts)),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
            | "decimal_floating_point_literal"
            | "hex_floating_point_literal" => self.literal(ts, LiteralKind::Number),
            "string_literal" | "text_block" => self.literal(ts, LiteralKind::String),
            "character_literal" => self.literal(ts, LiteralKind::Char),
            "true" | "false" => self.literal(ts, LiteralKind::Boolean),
            "null_literal" => self.literal(ts, LiteralKind::Null),
            "type_identifier" | "generic_type" | "scoped_type_identifier" | "array_type"
            | "integral_type" | "floating_point_type" | "boolean_type" => self.type_ref(ts),
            "scoped_identifier" => self.base.simple_name(ts),
            _ => {
                let children = named_children(ts)
                    .iter()
                    .map(|child| self.expression(child))
                    .collect();
                self.base.other(ts, children)
            }
        }
    }

    fn parameters_of_single(&self, ts: &TsNode<'_>) -> Vec<AstNode> {
        vec![
            self.base
                .node(
                    NodeKind::SingleVariableDeclaration {
                        name: ts.text().to_string(),
                        kind: ParameterKind::Regular,
                    },
                    ts,
                )
                .with_children(vec![self.base.absent_before(ts), self.base.absent_after(ts)]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CompilationUnit {
        lower("src/shop/Cart.java", source).expect("source should parse")
    }

    fn class(unit: &CompilationUnit) -> &AstNode {
        unit.root
            .children
            .iter()
            .find(|c| matches!(c.kind, NodeKind::TypeDeclaration(_)))
            .expect("type declaration")
    }

    #[test]
    fn test_class_members_are_lowered() {
        let unit = parse(
            r#"
package shop;

import java.util.List;

@Entity
public class Cart extends Base implements Serializable {
    private final List<Item> items = new ArrayList<>();

    public Cart(int size) {
        super();
    }

    public int total(int discount) {
        int sum = 0;
        for (Item item : items) {
            sum += item.price();
        }
        return sum - discount;
    }
}
"#,
        );
        let package = &unit.root.children[0];
        assert!(matches!(&package.kind, NodeKind::Other { kind, text } if kind == "package" && text == "shop"));

        let class = class(&unit);
        let NodeKind::TypeDeclaration(decl) = &class.kind else {
            panic!("expected type declaration");
        };
        assert_eq!(decl.name, "Cart");
        assert_eq!(decl.supertypes, vec!["Base", "Serializable"]);
        assert_eq!(decl.modifiers.visibility, Some(Visibility::Public));
        assert_eq!(class.annotations().count(), 1);

        let body = class.body().expect("body");
        assert!(matches!(
            body.children[0].kind,
            NodeKind::VariableDeclarationStatement { .. }
        ));
        let ctor = &body.children[1];
        assert!(matches!(&ctor.kind, NodeKind::MethodDeclaration(m) if m.is_constructor));
        let total = &body.children[2];
        assert_eq!(total.parameters().count(), 1);
        let statements = &total.body().expect("method body").children;
        assert!(matches!(statements[1].kind, NodeKind::For { style: ForStyle::Each }));
    }

    #[test]
    fn test_classic_for_sections() {
        let unit = parse(
            r#"
class Loop {
    void run() {
        for (int i = 0; i < 10; i++) {
            log(i);
        }
    }
}
"#,
        );
        let body = class(&unit).body().expect("body");
        let method = &body.children[0];
        let for_node = &method.body().expect("method body").children[0];
        assert!(matches!(for_node.kind, NodeKind::For { style: ForStyle::Classic }));
        assert_eq!(super::super::statement_text(for_node), "for(int i = 0; i < 10; i++)");
    }

    #[test]
    fn test_if_without_braces_gets_block() {
        let unit = parse(
            r#"
class Guard {
    int check(int x) {
        if (x > 0) return x;
        return 0;
    }
}
"#,
        );
        let body = class(&unit).body().expect("body");
        let if_node = &body.children[0].body().expect("method body").children[0];
        let then = if_node.child(1).expect("then");
        assert!(matches!(then.kind, NodeKind::Block));
        assert_eq!(then.children.len(), 1);
        assert!(if_node.child(2).map(AstNode::is_absent).unwrap_or(false));
    }

    #[test]
    fn test_missing_semicolon_is_a_parse_error() {
        let err = lower(
            "src/shop/Cart.java",
            "class Cart {\n    void add() {\n        int count = 1\n    }\n}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Parse { ref file, .. } if file == "src/shop/Cart.java"));
    }
}
