//! Python front-end: lowers a tree-sitter-python tree into the intermediate AST.

use super::lower::{
    Lowerer, TsNode, check_syntax, collapse_whitespace, has_token, named_children, span_of,
    statement_children,
};
use super::{
    AstNode, CollectionKind, CompilationUnit, ImportDecl, ImportedName, LiteralKind, MethodDecl,
    Modifiers, NodeKind, ParameterKind, SourceLanguage, Span, TypeDecl, TypeKind,
};
use crate::errors::ServiceError;
use ast_grep_core::AstGrep;
use ast_grep_language::SupportLang as Language;

pub fn lower(path: &str, source: &str) -> Result<CompilationUnit, ServiceError> {
    let grep = AstGrep::new(source, Language::Python);
    let root = grep.root();
    check_syntax(&root, path)?;

    let lowering = PythonLowering {
        base: Lowerer::new(path),
    };
    let module = lowering
        .base
        .node(NodeKind::Module, &root)
        .with_children(lowering.statements(&root));

    Ok(CompilationUnit {
        path: lowering.base.unit.clone(),
        language: SourceLanguage::Python,
        root: module,
    })
}

struct PythonLowering {
    base: Lowerer,
}

impl PythonLowering {
    fn statements(&self, ts: &TsNode<'_>) -> Vec<AstNode> {
        statement_children(ts)
            .iter()
            .map(|child| self.statement(child))
            .collect()
    }

    fn block(&self, ts: Option<TsNode<'_>>, anchor: Span) -> AstNode {
        match ts {
            Some(block) => self
                .base
                .node(NodeKind::Block, &block)
                .with_children(self.statements(&block)),
            None => self.base.node_at(NodeKind::Block, anchor),
        }
    }

    fn statement(&self, ts: &TsNode<'_>) -> AstNode {
        match ts.kind().as_ref() {
            "expression_statement" => self.expression_statement(ts),
            "return_statement" => {
                let value = self.optional_value(ts);
                self.base.node(NodeKind::Return, ts).with_children(vec![value])
            }
            "pass_statement" => self.base.node(NodeKind::Pass, ts),
            "break_statement" => self.base.node(NodeKind::Break, ts),
            "continue_statement" => self.base.node(NodeKind::Continue, ts),
            "if_statement" => self.if_statement(ts),
            "while_statement" => self.while_statement(ts),
            "for_statement" => self.for_statement(ts),
            "try_statement" => self.try_statement(ts),
            "with_statement" => self.with_statement(ts),
            "raise_statement" => self.raise_statement(ts),
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
            "global_statement" => self.base.node(
                NodeKind::Global {
                    names: Self::identifiers(ts),
                },
                ts,
            ),
            "nonlocal_statement" => self.base.node(
                NodeKind::Nonlocal {
                    names: Self::identifiers(ts),
                },
                ts,
            ),
            "delete_statement" => {
                let targets = named_children(ts)
                    .iter()
                    .flat_map(|target| {
                        if target.kind() == "expression_list" {
                            named_children(target)
                                .iter()
                                .map(|t| self.expression(t))
                                .collect::<Vec<_>>()
                        } else {
                            vec![self.expression(target)]
                        }
                    })
                    .collect();
                self.base.node(NodeKind::Del, ts).with_children(targets)
            }
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.import(ts)
            }
            "function_definition" => self.function(ts, Vec::new(), span_of(ts)),
            "class_definition" => self.class(ts, Vec::new(), span_of(ts)),
            "decorated_definition" => self.decorated(ts),
            "match_statement" => self.match_statement(ts),
            "comment" => self.base.node(
                NodeKind::Comment {
                    text: ts.text().to_string(),
                },
                ts,
            ),
            _ => {
                let children = named_children(ts)
                    .iter()
                    .map(|child| self.expression(child))
                    .collect();
                self.base.other(ts, children)
            }
        }
    }

    fn identifiers(ts: &TsNode<'_>) -> Vec<String> {
        named_children(ts)
            .iter()
            .map(|name| name.text().to_string())
            .collect()
    }

    /// The single value of a `return`-like statement, tupled when several
    fn optional_value(&self, ts: &TsNode<'_>) -> AstNode {
        let values = named_children(ts);
        match values.as_slice() {
            [] => self.base.absent_after(ts),
            [value] => self.expression(value),
            [first, .., last] => self
                .base
                .node_at(
                    NodeKind::Collection {
                        kind: CollectionKind::Tuple,
                    },
                    span_of(first).to(&span_of(last)),
                )
                .with_children(values.iter().map(|v| self.expression(v)).collect()),
        }
    }

    fn expression_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let parts = named_children(ts);
        match parts.as_slice() {
            [single] => match single.kind().as_ref() {
                "assignment" | "augmented_assignment" => self.assignment(single, span_of(ts)),
                "yield" => self.expression(single),
                _ => self
                    .base
                    .node(NodeKind::ExpressionStatement, ts)
                    .with_children(vec![self.expression(single)]),
            },
            _ => {
                let tuple = self
                    .base
                    .node(
                        NodeKind::Collection {
                            kind: CollectionKind::Tuple,
                        },
                        ts,
                    )
                    .with_children(parts.iter().map(|p| self.expression(p)).collect());
                self.base
                    .node(NodeKind::ExpressionStatement, ts)
                    .with_children(vec![tuple])
            }
        }
    }

    fn assignment(&self, ts: &TsNode<'_>, span: Span) -> AstNode {
        let operator = if ts.kind() == "augmented_assignment" {
            ts.field("operator")
                .map(|op| op.text().to_string())
                .unwrap_or_else(|| "=".to_string())
        } else {
            "=".to_string()
        };
        let left = ts.field("left");
        let target = left
            .as_ref()
            .map(|l| self.expression(l))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let annotation = match ts.field("type") {
            Some(t) => self.type_ref(&t),
            None => self.base.absent(target.span.end_point()),
        };
        let value = match ts.field("right") {
            Some(r) => self.expression(&r),
            None => self.base.absent_after(ts),
        };
        self.base
            .node_at(NodeKind::Assignment { operator }, span)
            .with_children(vec![target, annotation, value])
    }

    fn if_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let condition = ts
            .field("condition")
            .map(|c| self.expression(&c))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let consequence = self.block(ts.field("consequence"), span_of(ts).end_point());
        let clauses: Vec<_> = named_children(ts)
            .into_iter()
            .filter(|c| c.kind() == "elif_clause" || c.kind() == "else_clause")
            .collect();
        let alternative = self.else_chain(&clauses, consequence.span.end_point());
        self.base
            .node(NodeKind::If, ts)
            .with_children(vec![condition, consequence, alternative])
    }

    /// `elif` clauses become nested `If` nodes spanning through the last clause
    fn else_chain(&self, clauses: &[TsNode<'_>], anchor: Span) -> AstNode {
        let Some(first) = clauses.first() else {
            return self.base.absent(anchor);
        };
        if first.kind() == "else_clause" {
            return self.block(first.field("body"), span_of(first).end_point());
        }

        let condition = first
            .field("condition")
            .map(|c| self.expression(&c))
            .unwrap_or_else(|| self.base.absent_before(first));
        let consequence = self.block(first.field("consequence"), span_of(first).end_point());
        let rest = self.else_chain(&clauses[1..], consequence.span.end_point());
        let last = clauses.last().map(span_of).unwrap_or_else(|| span_of(first));
        self.base
            .node_at(NodeKind::If, span_of(first).to(&last))
            .with_children(vec![condition, consequence, rest])
    }

    fn else_clause(&self, ts: Option<TsNode<'_>>, anchor: Span) -> AstNode {
        match ts {
            Some(clause) => {
                let body = self.block(
                    clause.field("body").or_else(|| {
                        named_children(&clause)
                            .into_iter()
                            .find(|c| c.kind() == "block")
                    }),
                    span_of(&clause).end_point(),
                );
                self.base
                    .node(NodeKind::Else, &clause)
                    .with_children(vec![body])
            }
            None => self.base.absent(anchor),
        }
    }

    fn while_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let condition = ts
            .field("condition")
            .map(|c| self.expression(&c))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let body = self.block(ts.field("body"), span_of(ts).end_point());
        let alternative = self.else_clause(ts.field("alternative"), body.span.end_point());
        self.base
            .node(NodeKind::While { do_while: false }, ts)
            .with_children(vec![condition, body, alternative])
    }

    fn for_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let target = ts
            .field("left")
            .map(|l| self.expression(&l))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let iterable = ts
            .field("right")
            .map(|r| self.expression(&r))
            .unwrap_or_else(|| self.base.absent(target.span.end_point()));
        let body = self.block(ts.field("body"), span_of(ts).end_point());
        let alternative = self.else_clause(ts.field("alternative"), body.span.end_point());
        let node = self
            .base
            .node(
                NodeKind::For {
                    style: super::ForStyle::Each,
                },
                ts,
            )
            .with_children(vec![target, iterable, body, alternative]);
        self.wrap_async(ts, node)
    }

    fn wrap_async(&self, ts: &TsNode<'_>, node: AstNode) -> AstNode {
        if has_token(ts, "async") {
            self.base
                .node(NodeKind::Async, ts)
                .with_children(vec![node])
        } else {
            node
        }
    }

    fn try_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let body = self.block(ts.field("body"), span_of(ts).end_point());
        let resources = self.base.empty_list(body.span.start_point());
        let mut children = vec![resources];
        let mut catches = Vec::new();
        let mut else_node = None;
        let mut finally_node = None;

        for clause in named_children(ts) {
            match clause.kind().as_ref() {
                "except_clause" | "except_group_clause" => catches.push(self.catch_clause(&clause)),
                "else_clause" => else_node = Some(self.else_clause(Some(clause), span_of(ts))),
                "finally_clause" => {
                    let block = named_children(&clause)
                        .into_iter()
                        .find(|c| c.kind() == "block");
                    let inner = self.block(block, span_of(&clause).end_point());
                    finally_node = Some(
                        self.base
                            .node(NodeKind::Finally, &clause)
                            .with_children(vec![inner]),
                    );
                }
                _ => {}
            }
        }

        let mut anchor = body.span.end_point();
        children.push(body);
        if let Some(last) = catches.last() {
            anchor = last.span.end_point();
        }
        children.extend(catches);
        let else_child = else_node.unwrap_or_else(|| self.base.absent(anchor));
        let anchor = else_child.span.end_point();
        children.push(else_child);
        children.push(finally_node.unwrap_or_else(|| self.base.absent(anchor)));

        self.base.node(NodeKind::Try, ts).with_children(children)
    }

    fn catch_clause(&self, ts: &TsNode<'_>) -> AstNode {
        let parts = named_children(ts);
        let block = parts.iter().find(|c| c.kind() == "block").cloned();
        let heads: Vec<_> = parts.iter().filter(|c| c.kind() != "block").collect();

        let (exception, alias) = match heads.as_slice() {
            [single] if single.kind() == "as_pattern" => {
                let inner = named_children(single);
                let alias = single.field("alias").or_else(|| inner.get(1).cloned());
                (inner.first().cloned(), alias)
            }
            [exception] => (Some((*exception).clone()), None),
            [exception, alias, ..] => (Some((*exception).clone()), Some((*alias).clone())),
            [] => (None, None),
        };

        let head_start = span_of(ts).start_point();
        let types = match exception {
            Some(exc) => {
                let items: Vec<AstNode> = match exc.kind().as_ref() {
                    "tuple" | "parenthesized_expression" => named_children(&exc)
                        .iter()
                        .flat_map(|item| {
                            if item.kind() == "tuple" || item.kind() == "expression_list" {
                                named_children(item)
                                    .iter()
                                    .map(|i| self.expression(i))
                                    .collect::<Vec<_>>()
                            } else {
                                vec![self.expression(item)]
                            }
                        })
                        .collect(),
                    _ => vec![self.expression(&exc)],
                };
                self.base
                    .node(NodeKind::ExpressionList, &exc)
                    .with_children(items)
            }
            None => self.base.empty_list(head_start),
        };
        let name = match alias {
            Some(alias) => self.alias_target(&alias),
            None => self.base.absent(types.span.end_point()),
        };
        let body = self.block(block, span_of(ts).end_point());
        self.base
            .node(NodeKind::Catch, ts)
            .with_children(vec![types, name, body])
    }

    fn alias_target(&self, ts: &TsNode<'_>) -> AstNode {
        if ts.kind() == "as_pattern_target" {
            if let Some(inner) = named_children(ts).first() {
                return self.expression(inner);
            }
        }
        self.expression(ts)
    }

    fn with_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let mut children = Vec::new();
        let clauses = named_children(ts)
            .into_iter()
            .filter(|c| c.kind() == "with_clause");
        for clause in clauses {
            for item in named_children(&clause) {
                if item.kind() != "with_item" {
                    continue;
                }
                children.push(self.with_item(&item));
            }
        }
        let body = self.block(ts.field("body"), span_of(ts).end_point());
        children.push(body);
        let node = self.base.node(NodeKind::With, ts).with_children(children);
        self.wrap_async(ts, node)
    }

    fn with_item(&self, item: &TsNode<'_>) -> AstNode {
        let value = item
            .field("value")
            .or_else(|| named_children(item).into_iter().next());
        let (context, alias) = match value {
            Some(v) if v.kind() == "as_pattern" => {
                let inner = named_children(&v);
                let context = inner
                    .first()
                    .map(|c| self.expression(c))
                    .unwrap_or_else(|| self.base.absent_before(&v));
                let alias = v
                    .field("alias")
                    .or_else(|| inner.get(1).cloned())
                    .map(|a| self.alias_target(&a))
                    .unwrap_or_else(|| self.base.absent_after(&v));
                (context, alias)
            }
            Some(v) => (self.expression(&v), self.base.absent_after(&v)),
            None => (self.base.absent_before(item), self.base.absent_after(item)),
        };
        self.base
            .node(NodeKind::WithItem, item)
            .with_children(vec![context, alias])
    }

    fn raise_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let cause_node = ts.field("cause");
        let cause_range = cause_node.as_ref().map(|c| c.range());
        let exception = named_children(ts)
            .into_iter()
            .find(|c| Some(c.range()) != cause_range)
            .map(|e| self.expression(&e))
            .unwrap_or_else(|| self.base.absent_after(ts));
        let cause = cause_node
            .map(|c| self.expression(&c))
            .unwrap_or_else(|| self.base.absent_after(ts));
        self.base
            .node(NodeKind::Throw, ts)
            .with_children(vec![exception, cause])
    }

    fn import(&self, ts: &TsNode<'_>) -> AstNode {
        let module_node = ts.field("module_name");
        let module = match ts.kind().as_ref() {
            "future_import_statement" => "__future__".to_string(),
            _ => module_node
                .as_ref()
                .map(|m| m.text().to_string())
                .unwrap_or_default(),
        };
        let module_range = module_node.as_ref().map(|m| m.range());
        let mut names = Vec::new();
        let mut is_wildcard = false;
        for child in named_children(ts) {
            if Some(child.range()) == module_range {
                continue;
            }
            match child.kind().as_ref() {
                "dotted_name" => names.push(ImportedName {
                    name: child.text().to_string(),
                    alias: None,
                }),
                "aliased_import" => names.push(ImportedName {
                    name: child
                        .field("name")
                        .map(|n| n.text().to_string())
                        .unwrap_or_default(),
                    alias: child.field("alias").map(|a| a.text().to_string()),
                }),
                "wildcard_import" => is_wildcard = true,
                _ => {}
            }
        }
        self.base.node(
            NodeKind::Import(ImportDecl {
                module,
                names,
                is_wildcard,
                is_static: false,
            }),
            ts,
        )
    }

    fn match_statement(&self, ts: &TsNode<'_>) -> AstNode {
        let subject = ts
            .field("subject")
            .map(|s| self.expression(&s))
            .unwrap_or_else(|| self.base.absent_before(ts));
        let mut children = vec![subject];
        if let Some(body) = ts.field("body") {
            for clause in named_children(&body) {
                if clause.kind() == "case_clause" {
                    children.push(self.case_clause(&clause));
                }
            }
        }
        self.base.node(NodeKind::Switch, ts).with_children(children)
    }

    fn case_clause(&self, ts: &TsNode<'_>) -> AstNode {
        let patterns: Vec<_> = named_children(ts)
            .into_iter()
            .filter(|c| c.kind() == "case_pattern")
            .collect();
        let is_default = patterns.len() == 1 && patterns[0].text().trim() == "_";
        let pattern_list = match (patterns.first(), patterns.last()) {
            (Some(first), Some(last)) => self
                .base
                .node_at(NodeKind::ExpressionList, span_of(first).to(&span_of(last)))
                .with_children(
                    patterns
                        .iter()
                        .map(|p| match named_children(p).as_slice() {
                            [inner] => self.expression(inner),
                            _ => self.base.other(p, Vec::new()),
                        })
                        .collect(),
                ),
            _ => self.base.empty_list(span_of(ts).start_point()),
        };
        let guard = ts
            .field("guard")
            .and_then(|g| named_children(&g).into_iter().next())
            .map(|g| self.expression(&g))
            .unwrap_or_else(|| self.base.absent(pattern_list.span.end_point()));
        let body = self.block(ts.field("consequence"), span_of(ts).end_point());
        self.base
            .node(NodeKind::Case { is_default }, ts)
            .with_children(vec![pattern_list, guard, body])
    }

    fn decorated(&self, ts: &TsNode<'_>) -> AstNode {
        let decorators: Vec<AstNode> = named_children(ts)
            .iter()
            .filter(|c| c.kind() == "decorator")
            .map(|d| self.decorator(d))
            .collect();
        match ts.field("definition") {
            Some(def) if def.kind() == "function_definition" => {
                self.function(&def, decorators, span_of(ts))
            }
            Some(def) if def.kind() == "class_definition" => {
                self.class(&def, decorators, span_of(ts))
            }
            _ => self.base.other(ts, decorators),
        }
    }

    fn decorator(&self, ts: &TsNode<'_>) -> AstNode {
        let Some(expr) = named_children(ts).into_iter().next() else {
            return self.base.node(
                NodeKind::Annotation {
                    name: collapse_whitespace(ts.text().trim_start_matches('@')),
                },
                ts,
            );
        };
        match expr.kind().as_ref() {
            "call" => {
                let name = expr
                    .field("function")
                    .map(|f| collapse_whitespace(&f.text()))
                    .unwrap_or_default();
                let arguments = expr
                    .field("arguments")
                    .map(|args| self.arguments(&args))
                    .unwrap_or_default();
                self.base
                    .node(NodeKind::Annotation { name }, ts)
                    .with_children(arguments)
            }
            _ => self.base.node(
                NodeKind::Annotation {
                    name: collapse_whitespace(&expr.text()),
                },
                ts,
            ),
        }
    }

    fn function(&self, ts: &TsNode<'_>, decorators: Vec<AstNode>, span: Span) -> AstNode {
        let name = ts
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let parameters_node = ts.field("parameters");
        let parameters = parameters_node
            .as_ref()
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let return_anchor = parameters_node
            .as_ref()
            .map(|p| span_of(p).end_point())
            .unwrap_or_else(|| span_of(ts).start_point());
        let return_type = match ts.field("return_type") {
            Some(r) => self.type_ref(&r),
            None => self.base.absent(return_anchor),
        };
        let body = self.block(ts.field("body"), span_of(ts).end_point());

        let mut children = decorators;
        children.extend(parameters);
        children.push(return_type);
        children.push(body);

        self.base
            .node_at(
                NodeKind::MethodDeclaration(MethodDecl {
                    name,
                    modifiers: Modifiers::default(),
                    is_constructor: false,
                    is_async: has_token(ts, "async"),
                }),
                span,
            )
            .with_children(children)
    }

    fn class(&self, ts: &TsNode<'_>, decorators: Vec<AstNode>, span: Span) -> AstNode {
        let name = ts
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        let mut supertypes = Vec::new();
        let mut keywords = Vec::new();
        if let Some(bases) = ts.field("superclasses") {
            for base in named_children(&bases) {
                match base.kind().as_ref() {
                    "keyword_argument" => {
                        let key = base
                            .field("name")
                            .map(|n| n.text().to_string())
                            .unwrap_or_default();
                        let value = base
                            .field("value")
                            .map(|v| collapse_whitespace(&v.text()))
                            .unwrap_or_default();
                        keywords.push((key, value));
                    }
                    "list_splat" | "dictionary_splat" => {}
                    _ => supertypes.push(collapse_whitespace(&base.text())),
                }
            }
        }
        let body = self.block(ts.field("body"), span_of(ts).end_point());

        let mut children = decorators;
        children.push(body);
        self.base
            .node_at(
                NodeKind::TypeDeclaration(TypeDecl {
                    name,
                    kind: TypeKind::Class,
                    modifiers: Modifiers::default(),
                    supertypes,
                    keywords,
                }),
                span,
            )
            .with_children(children)
    }

    fn parameters(&self, ts: &TsNode<'_>) -> Vec<AstNode> {
        named_children(ts)
            .iter()
            .filter_map(|param| self.parameter(param))
            .collect()
    }

    fn parameter(&self, ts: &TsNode<'_>) -> Option<AstNode> {
        let declaration = |name: String, kind: ParameterKind, ty: AstNode, default: AstNode| {
            self.base
                .node(NodeKind::SingleVariableDeclaration { name, kind }, ts)
                .with_children(vec![ty, default])
        };
        match ts.kind().as_ref() {
            "identifier" => Some(declaration(
                ts.text().to_string(),
                ParameterKind::Regular,
                self.base.absent_after(ts),
                self.base.absent_after(ts),
            )),
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let (name, kind) = Self::splat(ts);
                Some(declaration(
                    name,
                    kind,
                    self.base.absent_after(ts),
                    self.base.absent_after(ts),
                ))
            }
            "typed_parameter" => {
                let ty = ts.field("type");
                let ty_range = ty.as_ref().map(|t| t.range());
                let inner = named_children(ts)
                    .into_iter()
                    .find(|c| Some(c.range()) != ty_range)?;
                let (name, kind) = match inner.kind().as_ref() {
                    "identifier" => (inner.text().to_string(), ParameterKind::Regular),
                    _ => Self::splat(&inner),
                };
                let ty = ty
                    .map(|t| self.type_ref(&t))
                    .unwrap_or_else(|| self.base.absent_after(&inner));
                Some(declaration(name, kind, ty, self.base.absent_after(ts)))
            }
            "default_parameter" | "typed_default_parameter" => {
                let name_node = ts.field("name")?;
                let ty = ts
                    .field("type")
                    .map(|t| self.type_ref(&t))
                    .unwrap_or_else(|| self.base.absent_after(&name_node));
                let default = ts
                    .field("value")
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                Some(declaration(
                    name_node.text().to_string(),
                    ParameterKind::Regular,
                    ty,
                    default,
                ))
            }
            _ => None,
        }
    }

    fn splat(ts: &TsNode<'_>) -> (String, ParameterKind) {
        let kind = if ts.kind() == "dictionary_splat_pattern" {
            ParameterKind::KwArgs
        } else {
            ParameterKind::VarArgs
        };
        let name = named_children(ts)
            .first()
            .map(|n| n.text().to_string())
            .unwrap_or_else(|| ts.text().trim_start_matches('*').to_string());
        (name, kind)
    }

    /// Lower a type annotation structurally
    fn type_ref(&self, ts: &TsNode<'_>) -> AstNode {
        let inner = if ts.kind() == "type" {
            named_children(ts).into_iter().next()
        } else {
            Some(ts.clone())
        };
        let Some(inner) = inner else {
            return self.base.node(
                NodeKind::TypeRef {
                    name: collapse_whitespace(&ts.text()),
                },
                ts,
            );
        };
        let named = |name: String| NodeKind::TypeRef { name };

        match inner.kind().as_ref() {
            "none" => self.base.node(named("None".to_string()), ts),
            "string" => {
                let text = inner.text();
                let name = text.trim_matches(|c| c == '"' || c == '\'').to_string();
                self.base.node(named(name), ts)
            }
            "generic_type" => {
                let parts = named_children(&inner);
                let base = parts
                    .first()
                    .map(|b| collapse_whitespace(&b.text()))
                    .unwrap_or_default();
                let arguments = parts
                    .iter()
                    .filter(|p| p.kind() == "type_parameter")
                    .flat_map(|p| named_children(p))
                    .map(|arg| self.type_ref(&arg))
                    .collect();
                self.base.node(named(base), ts).with_children(arguments)
            }
            "subscript" => {
                let base = inner
                    .field("value")
                    .map(|v| collapse_whitespace(&v.text()))
                    .unwrap_or_default();
                let arguments = named_children(&inner)
                    .iter()
                    .skip(1)
                    .map(|arg| self.type_ref(arg))
                    .collect();
                self.base.node(named(base), ts).with_children(arguments)
            }
            "binary_operator" | "union_type" => {
                let arguments = named_children(&inner)
                    .iter()
                    .map(|arg| self.type_ref(arg))
                    .collect();
                self.base
                    .node(named("Union".to_string()), ts)
                    .with_children(arguments)
            }
            _ => self
                .base
                .node(named(collapse_whitespace(&inner.text())), ts),
        }
    }

    fn arguments(&self, ts: &TsNode<'_>) -> Vec<AstNode> {
        match ts.kind().as_ref() {
            "argument_list" => named_children(ts)
                .iter()
                .map(|arg| self.expression(arg))
                .collect(),
            _ => vec![self.expression(ts)],
        }
    }

    fn call(&self, ts: &TsNode<'_>) -> AstNode {
        let arguments = ts
            .field("arguments")
            .map(|args| self.arguments(&args))
            .unwrap_or_default();
        let Some(function) = ts.field("function") else {
            return self.base.other(ts, arguments);
        };
        let (name, receiver) = match function.kind().as_ref() {
            "attribute" => {
                let name = function
                    .field("attribute")
                    .map(|a| a.text().to_string())
                    .unwrap_or_default();
                let receiver = function
                    .field("object")
                    .map(|o| self.expression(&o))
                    .unwrap_or_else(|| self.base.absent_before(&function));
                (name, receiver)
            }
            "identifier" => (
                function.text().to_string(),
                self.base.absent_before(&function),
            ),
            _ => (
                collapse_whitespace(&function.text()),
                self.base.absent_before(&function),
            ),
        };
        let mut children = vec![receiver];
        children.extend(arguments);
        self.base
            .node(NodeKind::MethodInvocation { name }, ts)
            .with_children(children)
    }

    fn collection(&self, ts: &TsNode<'_>, kind: CollectionKind) -> AstNode {
        self.base
            .node(NodeKind::Collection { kind }, ts)
            .with_children(
                named_children(ts)
                    .iter()
                    .map(|item| self.expression(item))
                    .collect(),
            )
    }

    fn unary(&self, ts: &TsNode<'_>, operator: &str, operand: Option<TsNode<'_>>) -> AstNode {
        let operand = operand
            .map(|o| self.expression(&o))
            .unwrap_or_else(|| self.base.absent_after(ts));
        self.base
            .node(
                NodeKind::UnaryOp {
                    operator: operator.to_string(),
                    prefix: true,
                },
                ts,
            )
            .with_children(vec![operand])
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
        let first_named = || named_children(ts).into_iter().next();
        match ts.kind().as_ref() {
            "identifier" => self.base.simple_name(ts),
            "attribute" => {
                let name = ts
                    .field("attribute")
                    .map(|a| a.text().to_string())
                    .unwrap_or_default();
                let receiver = ts
                    .field("object")
                    .map(|o| self.expression(&o))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                self.base
                    .node(NodeKind::FieldAccess { name }, ts)
                    .with_children(vec![receiver])
            }
            "call" => self.call(ts),
            "binary_operator" | "boolean_operator" => {
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
            "comparison_operator" => {
                let operands = named_children(ts);
                let operators: Vec<String> = ts
                    .children()
                    .filter(|c| !c.is_named())
                    .map(|c| collapse_whitespace(&c.text()))
                    .collect();
                match (operands.as_slice(), operators.as_slice()) {
                    ([left, right], [operator]) => self
                        .base
                        .node(
                            NodeKind::BinaryOp {
                                operator: operator.clone(),
                            },
                            ts,
                        )
                        .with_children(vec![self.expression(left), self.expression(right)]),
                    _ => self.base.other(
                        ts,
                        operands.iter().map(|o| self.expression(o)).collect(),
                    ),
                }
            }
            "not_operator" => self.unary(ts, "not", ts.field("argument")),
            "unary_operator" => {
                let operator = ts
                    .field("operator")
                    .map(|op| op.text().to_string())
                    .unwrap_or_default();
                self.unary(ts, &operator, ts.field("argument"))
            }
            "await" => self.unary(ts, "await", first_named()),
            "list_splat" | "list_splat_pattern" => self.unary(ts, "*", first_named()),
            "dictionary_splat" | "dictionary_splat_pattern" => self.unary(ts, "**", first_named()),
            "conditional_expression" => {
                let parts = named_children(ts);
                match parts.as_slice() {
                    [then, condition, otherwise] => self
                        .base
                        .node(NodeKind::Ternary, ts)
                        .with_children(vec![
                            self.expression(condition),
                            self.expression(then),
                            self.expression(otherwise),
                        ]),
                    _ => self
                        .base
                        .other(ts, parts.iter().map(|p| self.expression(p)).collect()),
                }
            }
            "subscript" => {
                let value = ts.field("value");
                let value_range = value.as_ref().map(|v| v.range());
                let indices: Vec<_> = named_children(ts)
                    .into_iter()
                    .filter(|c| Some(c.range()) != value_range)
                    .collect();
                let value = value
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let index = match indices.as_slice() {
                    [] => self.base.absent_after(ts),
                    [single] => self.expression(single),
                    [first, .., last] => self
                        .base
                        .node_at(
                            NodeKind::Collection {
                                kind: CollectionKind::Tuple,
                            },
                            span_of(first).to(&span_of(last)),
                        )
                        .with_children(indices.iter().map(|i| self.expression(i)).collect()),
                };
                self.base
                    .node(NodeKind::Subscript, ts)
                    .with_children(vec![value, index])
            }
            "integer" | "float" => self.literal(ts, LiteralKind::Number),
            "string" | "concatenated_string" => self.literal(ts, LiteralKind::String),
            "true" | "false" => self.literal(ts, LiteralKind::Boolean),
            "none" => self.literal(ts, LiteralKind::Null),
            "list" | "list_pattern" => self.collection(ts, CollectionKind::List),
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => {
                self.collection(ts, CollectionKind::Tuple)
            }
            "set" => self.collection(ts, CollectionKind::Set),
            "dictionary" => self.collection(ts, CollectionKind::Dict),
            "pair" => {
                let key = ts
                    .field("key")
                    .map(|k| self.expression(&k))
                    .unwrap_or_else(|| self.base.absent_before(ts));
                let value = ts
                    .field("value")
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Pair, ts)
                    .with_children(vec![key, value])
            }
            "parenthesized_expression" => {
                let inner = first_named()
                    .map(|i| self.expression(&i))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::Parenthesized, ts)
                    .with_children(vec![inner])
            }
            "lambda" => {
                let mut children = ts
                    .field("parameters")
                    .map(|p| self.parameters(&p))
                    .unwrap_or_default();
                children.push(
                    ts.field("body")
                        .map(|b| self.expression(&b))
                        .unwrap_or_else(|| self.base.absent_after(ts)),
                );
                self.base.node(NodeKind::Lambda, ts).with_children(children)
            }
            "yield" => {
                let value = first_named()
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(
                        NodeKind::Yield {
                            delegate: has_token(ts, "from"),
                        },
                        ts,
                    )
                    .with_children(vec![value])
            }
            "keyword_argument" => {
                let name = ts
                    .field("name")
                    .map(|n| n.text().to_string())
                    .unwrap_or_default();
                let value = ts
                    .field("value")
                    .map(|v| self.expression(&v))
                    .unwrap_or_else(|| self.base.absent_after(ts));
                self.base
                    .node(NodeKind::KeywordArgument { name }, ts)
                    .with_children(vec![value])
            }
            "assignment" | "augmented_assignment" => self.assignment(ts, span_of(ts)),
            "as_pattern_target" => match first_named() {
                Some(inner) => self.expression(&inner),
                None => self.base.other(ts, Vec::new()),
            },
            "type" => self.type_ref(ts),
            _ => {
                let children = named_children(ts)
                    .iter()
                    .map(|child| self.expression(child))
                    .collect();
                self.base.other(ts, children)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CompilationUnit {
        lower("pkg/sample.py", source).expect("source should parse")
    }

    fn first_class(unit: &CompilationUnit) -> &AstNode {
        unit.root
            .children
            .iter()
            .find(|c| matches!(c.kind, NodeKind::TypeDeclaration(_)))
            .expect("class declaration")
    }

    #[test]
    fn test_class_with_bases_and_methods() {
        let unit = parse(
            r#"
class Square(Shape, Drawable, metaclass=ABCMeta):
    def __init__(self, side: int = 1):
        self.side = side

    @property
    def area(self) -> int:
        return self.side * self.side
"#,
        );
        let class = first_class(&unit);
        let NodeKind::TypeDeclaration(decl) = &class.kind else {
            panic!("expected type declaration");
        };
        assert_eq!(decl.name, "Square");
        assert_eq!(decl.supertypes, vec!["Shape", "Drawable"]);
        assert_eq!(decl.keywords, vec![("metaclass".to_string(), "ABCMeta".to_string())]);

        let body = class.body().expect("class body");
        let methods: Vec<_> = body
            .children
            .iter()
            .filter(|c| matches!(c.kind, NodeKind::MethodDeclaration(_)))
            .collect();
        assert_eq!(methods.len(), 2);

        let init_params: Vec<_> = methods[0].parameters().collect();
        assert_eq!(init_params.len(), 2);
        assert!(init_params[1].present(0).is_some(), "typed parameter");
        assert!(init_params[1].present(1).is_some(), "default value");

        assert_eq!(methods[1].annotations().count(), 1);
        assert!(methods[1].return_type().is_some());
    }

    #[test]
    fn test_if_elif_else_chain_nests() {
        let unit = parse(
            r#"
def classify(n):
    if n < 0:
        return "negative"
    elif n == 0:
        return "zero"
    else:
        return "positive"
"#,
        );
        let function = &unit.root.children[0];
        let body = function.body().expect("body");
        let if_node = &body.children[0];
        assert!(matches!(if_node.kind, NodeKind::If));
        let elif = if_node.child(2).expect("else slot");
        assert!(matches!(elif.kind, NodeKind::If));
        assert!(if_node.span.contains(&elif.span));
        let else_block = elif.child(2).expect("final else");
        assert!(matches!(else_block.kind, NodeKind::Block));
    }

    #[test]
    fn test_missing_optional_slots_are_absent() {
        let unit = parse(
            r#"
def f(items):
    for item in items:
        pass
    return
"#,
        );
        let body = unit.root.children[0].body().expect("body");
        let for_node = &body.children[0];
        assert!(for_node.child(3).map(AstNode::is_absent).unwrap_or(false));
        let ret = &body.children[1];
        assert!(ret.child(0).map(AstNode::is_absent).unwrap_or(false));
    }

    #[test]
    fn test_sibling_spans_are_monotonic() {
        let unit = parse(
            r#"
def g(a, b=2, *rest, **options):
    x = a + b
    try:
        y = x / 0
    except ZeroDivisionError as err:
        y = 0
    finally:
        x = 1
    return y
"#,
        );

        fn check(node: &AstNode) {
            let mut previous = node.span.start_offset;
            for child in &node.children {
                assert!(child.span.start_offset >= previous, "non-monotonic child {:?}", child.kind);
                assert!(node.span.contains(&child.span), "child escapes parent {:?}", child.kind);
                previous = child.span.end_offset.max(previous);
                check(child);
            }
        }
        check(&unit.root);
    }

    #[test]
    fn test_syntax_error_is_reported_with_file() {
        let err = lower("broken.py", "def f(:\n    return 1\n").unwrap_err();
        match err {
            ServiceError::Parse { file, .. } => assert_eq!(file, "broken.py"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_spans_use_byte_offsets() {
        let unit = parse("x = 'é'\nclass A:\n    pass\n");
        let class = first_class(&unit);
        assert_eq!(class.span.start_line, 1);
        assert_eq!(class.span.start_offset, 9);
    }
}
