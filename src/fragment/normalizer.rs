//! Turns the statements of one operation into an [`OperationBody`].

use super::{
    CodeFragment, FragmentFacts, FragmentId, OperationBody, Shape, StatementKind, TryInfo,
};
use crate::ast::{
    AstNode, CollectionKind, ForStyle, NodeKind, SourceLanguage, Span, UnitRef, render,
    statement_text,
};
use crate::model::variable::{Scope, TypeInfo, VariableDeclaration, VariableRole};
use crate::observe::{DiffObserver, PipelineEvent};

/// What the normalizer needs to know about the operation's surroundings
pub struct NormalizeContext<'a> {
    pub language: SourceLanguage,
    pub file: UnitRef,
    /// Span of the owning class; scope of receiver-qualified attributes
    pub class_span: Span,
    /// Name of the implicit receiver (`self`, `cls`, `this`), if any
    pub receiver: Option<&'a str>,
    pub observer: &'a dyn DiffObserver,
}

/// Normalize `method`'s body. `parameters` are the declared parameters
/// with any implicit receiver already skipped.
pub fn normalize_operation(
    method: &AstNode,
    parameters: &[&AstNode],
    context: &NormalizeContext<'_>,
) -> OperationBody {
    let body_node = method.body();
    let function_end = body_node
        .map(|b| b.span.end_offset)
        .unwrap_or(method.span.end_offset);
    let mut normalizer = Normalizer {
        context,
        body: OperationBody::default(),
        function_end,
        block_ends: Vec::new(),
        try_stack: Vec::new(),
        globals: Vec::new(),
    };

    let parameter_scope = Scope::of_span(context.file.clone(), &method.span);
    for parameter in parameters {
        if let Some(declaration) =
            VariableDeclaration::from_parameter(parameter, parameter_scope.clone())
        {
            normalizer.declare(declaration, None);
        }
    }

    if let Some(block) = body_node {
        let root = normalizer.block(block, None, 0);
        normalizer.body.root = Some(root);
    }
    normalizer.resolve_references();
    normalizer.body
}

struct Normalizer<'c, 'a> {
    context: &'c NormalizeContext<'a>,
    body: OperationBody,
    function_end: usize,
    block_ends: Vec<usize>,
    try_stack: Vec<FragmentId>,
    globals: Vec<String>,
}

impl Normalizer<'_, '_> {
    #[allow(clippy::too_many_arguments)]
    fn fragment(
        &mut self,
        kind: StatementKind,
        shape: Shape,
        depth: usize,
        text: String,
        span: Span,
        parent: Option<FragmentId>,
        facts: FragmentFacts,
    ) -> FragmentId {
        let id = FragmentId(self.body.fragments.len());
        let index = match parent {
            Some(p) if shape == Shape::Expression => self.body.get(p).expressions.len(),
            Some(p) => self.body.get(p).children.len(),
            None => 0,
        };
        self.body.fragments.push(CodeFragment {
            id,
            kind,
            shape,
            depth,
            text,
            span,
            parent,
            children: Vec::new(),
            expressions: Vec::new(),
            index,
            declarations: Vec::new(),
            facts,
        });
        if let Some(p) = parent {
            let parent_fragment = &mut self.body.fragments[p.0];
            match shape {
                Shape::Expression => parent_fragment.expressions.push(id),
                _ => parent_fragment.children.push(id),
            }
        }
        if shape != Shape::Expression {
            if let Some(&enclosing) = self.try_stack.last() {
                self.body.enclosing_try.insert(id, enclosing);
            }
        }
        id
    }

    fn declare(&mut self, mut declaration: VariableDeclaration, statement: Option<FragmentId>) {
        if self.body.declarations.contains(&declaration) {
            return;
        }
        declaration.statement = statement;
        let index = self.body.declarations.len();
        self.body.declarations.push(declaration);
        self.body.references.push(Vec::new());
        if let Some(id) = statement {
            self.body.fragments[id.0].declarations.push(index);
        }
    }

    /// Whether a non-attribute declaration of `name` is visible at `offset`
    fn is_declared(&self, name: &str, offset: usize) -> bool {
        self.body
            .declarations
            .iter()
            .any(|d| d.name == name && !d.is_attribute() && d.scope.contains(offset))
    }

    fn local_scope(&self, span: &Span) -> Scope {
        let end = match self.context.language {
            SourceLanguage::Python => self.function_end,
            SourceLanguage::Java => self.block_ends.last().copied().unwrap_or(self.function_end),
        };
        Scope::new(self.context.file.clone(), span.start_offset, end)
    }

    fn statement_scope(&self, span: &Span) -> Scope {
        Scope::of_span(self.context.file.clone(), span)
    }

    fn block(&mut self, node: &AstNode, parent: Option<FragmentId>, depth: usize) -> FragmentId {
        let id = self.fragment(
            StatementKind::Block,
            Shape::Composite,
            depth,
            "{".to_string(),
            node.span,
            parent,
            FragmentFacts::default(),
        );
        self.block_ends.push(node.span.end_offset);
        for child in &node.children {
            self.statement(child, id, depth + 1);
        }
        self.block_ends.pop();
        id
    }

    /// A branch body: blocks get their own fragment, anything else is a statement
    fn branch(&mut self, node: &AstNode, parent: FragmentId, depth: usize) {
        match node.kind {
            NodeKind::Block => {
                self.block(node, Some(parent), depth);
            }
            NodeKind::Absent => {}
            _ => self.statement(node, parent, depth),
        }
    }

    fn expression(&mut self, node: &AstNode, parent: FragmentId, depth: usize) {
        if node.is_absent() {
            return;
        }
        self.fragment(
            StatementKind::Expression,
            Shape::Expression,
            depth,
            render(node),
            node.span,
            Some(parent),
            FragmentFacts::collect(&[node]),
        );
    }

    fn composite(
        &mut self,
        kind: StatementKind,
        node: &AstNode,
        parent: FragmentId,
        depth: usize,
        controls: &[&AstNode],
    ) -> FragmentId {
        let id = self.fragment(
            kind,
            Shape::Composite,
            depth,
            statement_text(node),
            node.span,
            Some(parent),
            FragmentFacts::collect(controls),
        );
        for control in controls {
            self.expression(control, id, depth);
        }
        id
    }

    fn leaf(
        &mut self,
        kind: StatementKind,
        node: &AstNode,
        parent: FragmentId,
        depth: usize,
    ) -> FragmentId {
        self.fragment(
            kind,
            Shape::Leaf,
            depth,
            statement_text(node),
            node.span,
            Some(parent),
            FragmentFacts::collect(&[node]),
        )
    }

    fn statement(&mut self, node: &AstNode, parent: FragmentId, depth: usize) {
        match &node.kind {
            NodeKind::Comment { .. } => {}
            NodeKind::Block => {
                self.block(node, Some(parent), depth);
            }
            NodeKind::If => {
                let controls = present_children(node, &[0]);
                let id = self.composite(StatementKind::If, node, parent, depth, &controls);
                if let Some(then) = node.child(1) {
                    self.branch(then, id, depth + 1);
                }
                if let Some(otherwise) = node.present(2) {
                    self.branch(otherwise, id, depth + 1);
                }
            }
            NodeKind::While { .. } => {
                let controls = present_children(node, &[0]);
                let id = self.composite(StatementKind::While, node, parent, depth, &controls);
                if let Some(body) = node.child(1) {
                    self.branch(body, id, depth + 1);
                }
                if let Some(otherwise) = node.present(2) {
                    self.statement(otherwise, id, depth + 1);
                }
            }
            NodeKind::For {
                style: ForStyle::Each,
            } => {
                let controls = present_children(node, &[0, 1]);
                let id = self.composite(StatementKind::For, node, parent, depth, &controls);
                if let Some(target) = node.present(0) {
                    let initializer = node.present(1).map(render);
                    self.declare_targets(target, &node.span, initializer, id);
                }
                if let Some(body) = node.child(2) {
                    self.branch(body, id, depth + 1);
                }
                if let Some(otherwise) = node.present(3) {
                    self.statement(otherwise, id, depth + 1);
                }
            }
            NodeKind::For {
                style: ForStyle::Classic,
            } => {
                let mut controls: Vec<&AstNode> = Vec::new();
                if let Some(init) = node.child(0) {
                    controls.extend(init.children.iter());
                }
                controls.extend(node.present(1));
                if let Some(update) = node.child(2) {
                    controls.extend(update.children.iter());
                }
                let id = self.composite(StatementKind::For, node, parent, depth, &controls);
                if let Some(init) = node.child(0) {
                    for item in &init.children {
                        if matches!(item.kind, NodeKind::VariableDeclarationStatement { .. }) {
                            self.declare_variables(item, self.statement_scope(&node.span), id);
                        }
                    }
                }
                if let Some(body) = node.child(3) {
                    self.branch(body, id, depth + 1);
                }
            }
            NodeKind::Switch => {
                let controls = present_children(node, &[0]);
                let id = self.composite(StatementKind::Switch, node, parent, depth, &controls);
                for case in node.children.iter().skip(1) {
                    self.statement(case, id, depth + 1);
                }
            }
            NodeKind::Case { .. } => {
                let mut controls: Vec<&AstNode> = Vec::new();
                if let Some(patterns) = node.child(0) {
                    controls.extend(patterns.children.iter());
                }
                controls.extend(node.present(1));
                let id = self.composite(StatementKind::Case, node, parent, depth, &controls);
                if let Some(body) = node.child(2) {
                    self.branch(body, id, depth + 1);
                }
            }
            NodeKind::Try => self.try_statement(node, parent, depth),
            NodeKind::Catch | NodeKind::Else | NodeKind::Finally => {
                self.clause(node, parent, depth);
            }
            NodeKind::With => {
                let items: Vec<&AstNode> = node
                    .children
                    .iter()
                    .filter(|c| matches!(c.kind, NodeKind::WithItem))
                    .collect();
                let controls: Vec<&AstNode> = items.iter().filter_map(|i| i.present(0)).collect();
                let id = self.composite(StatementKind::With, node, parent, depth, &controls);
                for item in items {
                    if let Some(alias) = item.present(1) {
                        let initializer = item.present(0).map(render);
                        self.declare_targets(alias, &node.span, initializer, id);
                    }
                }
                if let Some(body) = node.children.last() {
                    self.branch(body, id, depth + 1);
                }
            }
            NodeKind::Async => {
                let id = self.composite(StatementKind::Async, node, parent, depth, &[]);
                for inner in &node.children {
                    self.statement(inner, id, depth + 1);
                }
            }
            NodeKind::Synchronized => {
                let controls = present_children(node, &[0]);
                let id =
                    self.composite(StatementKind::Synchronized, node, parent, depth, &controls);
                if let Some(body) = node.child(1) {
                    self.branch(body, id, depth + 1);
                }
            }
            NodeKind::MethodDeclaration(_) | NodeKind::TypeDeclaration(_) => {
                self.fragment(
                    StatementKind::Declaration,
                    Shape::Leaf,
                    depth,
                    statement_text(node),
                    node.span,
                    Some(parent),
                    FragmentFacts::default(),
                );
            }
            NodeKind::VariableDeclarationStatement { .. } => {
                let id = self.leaf(StatementKind::VariableDeclaration, node, parent, depth);
                let scope = self.local_scope(&node.span);
                self.declare_variables(node, scope, id);
            }
            NodeKind::Assignment { operator } => {
                let id = self.leaf(StatementKind::Assignment, node, parent, depth);
                self.declare_assigned(node, operator == "=", id);
            }
            NodeKind::ExpressionStatement => {
                self.leaf(StatementKind::ExpressionStatement, node, parent, depth);
            }
            NodeKind::Return => {
                self.leaf(StatementKind::Return, node, parent, depth);
            }
            NodeKind::Throw => {
                self.leaf(StatementKind::Throw, node, parent, depth);
            }
            NodeKind::Assert => {
                self.leaf(StatementKind::Assert, node, parent, depth);
            }
            NodeKind::Break => {
                self.leaf(StatementKind::Break, node, parent, depth);
            }
            NodeKind::Continue => {
                self.leaf(StatementKind::Continue, node, parent, depth);
            }
            NodeKind::Pass => {
                self.leaf(StatementKind::Pass, node, parent, depth);
            }
            NodeKind::Yield { .. } => {
                self.leaf(StatementKind::Yield, node, parent, depth);
            }
            NodeKind::Global { names } | NodeKind::Nonlocal { names } => {
                self.globals.extend(names.iter().cloned());
                self.leaf(StatementKind::Global, node, parent, depth);
            }
            NodeKind::Del => {
                self.leaf(StatementKind::Del, node, parent, depth);
            }
            NodeKind::Import(_) => {
                self.leaf(StatementKind::Import, node, parent, depth);
            }
            _ => self.context.observer.on_event(&PipelineEvent::NodeSkipped {
                file: self.context.file.to_string(),
                line: node.span.start_line,
                kind: node.kind.label().to_string(),
            }),
        }
    }

    /// `try` composite; its catch/else/finally clauses become siblings in
    /// the parent and are recorded in the side table
    fn try_statement(&mut self, node: &AstNode, parent: FragmentId, depth: usize) {
        let resources: Vec<&AstNode> = node
            .child(0)
            .map(|r| r.children.iter().collect())
            .unwrap_or_default();
        let id = self.composite(StatementKind::Try, node, parent, depth, &resources);
        for resource in &resources {
            if let NodeKind::SingleVariableDeclaration { name, .. } = &resource.kind {
                let mut declaration = VariableDeclaration::new(
                    name.clone(),
                    VariableRole::Local,
                    self.statement_scope(&node.span),
                    resource.span,
                );
                declaration.type_info = TypeInfo::from_node(resource.present(0));
                declaration.initializer = resource.present(1).map(render);
                self.declare(declaration, Some(id));
            }
        }

        if let Some(body) = node.child(1) {
            self.try_stack.push(id);
            self.branch(body, id, depth + 1);
            self.try_stack.pop();
        }

        let mut info = TryInfo::default();
        for clause in node.children.iter().skip(2) {
            match clause.kind {
                NodeKind::Catch => info.catch_clauses.push(self.clause(clause, parent, depth)),
                NodeKind::Else => info.else_clause = Some(self.clause(clause, parent, depth)),
                NodeKind::Finally => info.finally = Some(self.clause(clause, parent, depth)),
                _ => {}
            }
        }
        self.body.try_clauses.insert(id, info);
    }

    fn clause(&mut self, node: &AstNode, parent: FragmentId, depth: usize) -> FragmentId {
        match node.kind {
            NodeKind::Catch => {
                let controls: Vec<&AstNode> = node
                    .child(0)
                    .map(|types| types.children.iter().collect())
                    .unwrap_or_default();
                let id = self.composite(StatementKind::Catch, node, parent, depth, &controls);
                if let Some(name) = node.present(1).and_then(AstNode::identifier) {
                    let mut declaration = VariableDeclaration::new(
                        name,
                        VariableRole::Local,
                        self.statement_scope(&node.span),
                        node.span,
                    );
                    declaration.type_info = TypeInfo::from_node(controls.first().copied());
                    self.declare(declaration, Some(id));
                }
                if let Some(body) = node.child(2) {
                    self.branch(body, id, depth + 1);
                }
                id
            }
            _ => {
                let kind = if matches!(node.kind, NodeKind::Finally) {
                    StatementKind::Finally
                } else {
                    StatementKind::Else
                };
                let id = self.composite(kind, node, parent, depth, &[]);
                if let Some(body) = node.child(0) {
                    self.branch(body, id, depth + 1);
                }
                id
            }
        }
    }

    /// Loop targets and `with` aliases, scoped to their statement
    fn declare_targets(
        &mut self,
        target: &AstNode,
        statement_span: &Span,
        initializer: Option<String>,
        statement: FragmentId,
    ) {
        let scope = self.statement_scope(statement_span);
        if let NodeKind::SingleVariableDeclaration { name, .. } = &target.kind {
            let mut declaration =
                VariableDeclaration::new(name.clone(), VariableRole::Local, scope, target.span);
            declaration.type_info = TypeInfo::from_node(target.present(0));
            declaration.initializer = initializer;
            self.declare(declaration, Some(statement));
            return;
        }
        let names = target_names(target);
        let single = names.len() == 1;
        for name in names {
            let mut declaration =
                VariableDeclaration::new(name, VariableRole::Local, scope.clone(), target.span);
            if single {
                declaration.initializer = initializer.clone();
            }
            self.declare(declaration, Some(statement));
        }
    }

    fn declare_variables(&mut self, node: &AstNode, scope: Scope, statement: FragmentId) {
        let type_info = TypeInfo::from_node(node.child(0));
        for declarator in node.children.iter().skip(1) {
            let NodeKind::SingleVariableDeclaration { name, .. } = &declarator.kind else {
                continue;
            };
            let mut declaration = VariableDeclaration::new(
                name.clone(),
                VariableRole::Local,
                scope.clone(),
                declarator.span,
            );
            declaration.type_info = type_info.clone();
            declaration.initializer = declarator.present(1).map(render);
            self.declare(declaration, Some(statement));
        }
    }

    /// Locals introduced by first assignment and receiver-qualified attributes
    fn declare_assigned(&mut self, node: &AstNode, plain: bool, statement: FragmentId) {
        let Some(target) = node.child(0) else {
            return;
        };
        let targets = flatten_targets(target);
        let single = targets.len() == 1;
        let type_info = TypeInfo::from_node(node.present(1));
        let initializer = node.present(2).map(render);

        for target in targets {
            match &target.kind {
                NodeKind::SimpleName { identifier }
                    if plain && self.context.language.declares_on_assignment() =>
                {
                    if self.globals.contains(identifier)
                        || self.is_declared(identifier, node.span.start_offset)
                    {
                        continue;
                    }
                    let mut declaration = VariableDeclaration::new(
                        identifier.clone(),
                        VariableRole::Local,
                        self.local_scope(&node.span),
                        target.span,
                    );
                    if single {
                        declaration.type_info = type_info.clone();
                        declaration.initializer = initializer.clone();
                    }
                    self.declare(declaration, Some(statement));
                }
                NodeKind::FieldAccess { name } if plain => {
                    let receiver = target.present(0).and_then(AstNode::identifier);
                    if receiver.is_none() || receiver != self.context.receiver {
                        continue;
                    }
                    let scope = Scope::of_span(self.context.file.clone(), &self.context.class_span);
                    let mut declaration =
                        VariableDeclaration::new(name.clone(), VariableRole::Attribute, scope, target.span);
                    if single {
                        declaration.type_info = type_info.clone();
                        declaration.initializer = initializer.clone();
                    }
                    self.declare(declaration, Some(statement));
                }
                _ => {}
            }
        }
    }

    fn resolve_references(&mut self) {
        let receiver = self.context.receiver;
        for (index, declaration) in self.body.declarations.iter().enumerate() {
            let references = self
                .body
                .fragments
                .iter()
                .filter(|f| !f.is_block())
                .filter(|f| match declaration.role {
                    VariableRole::Attribute | VariableRole::EnumConstant => receiver
                        .map(|r| f.facts.accesses_field(r, &declaration.name))
                        .unwrap_or(false),
                    _ => {
                        declaration.scope.contains(f.span.start_offset)
                            && f.facts.mentions_variable(&declaration.name)
                    }
                })
                .map(|f| f.id)
                .collect();
            self.body.references[index] = references;
        }
    }
}

fn present_children<'n>(node: &'n AstNode, indices: &[usize]) -> Vec<&'n AstNode> {
    indices.iter().filter_map(|i| node.present(*i)).collect()
}

/// Assignment targets with tuple/list destructuring flattened
fn flatten_targets(target: &AstNode) -> Vec<&AstNode> {
    match &target.kind {
        NodeKind::Collection {
            kind: CollectionKind::Tuple | CollectionKind::List,
        } => target.children.iter().flat_map(flatten_targets).collect(),
        NodeKind::Parenthesized => target.children.iter().flat_map(flatten_targets).collect(),
        _ => vec![target],
    }
}

/// Simple names bound by a loop target or `with` alias
fn target_names(target: &AstNode) -> Vec<String> {
    flatten_targets(target)
        .into_iter()
        .filter_map(|t| match &t.kind {
            NodeKind::SimpleName { identifier } => Some(identifier.clone()),
            NodeKind::UnaryOp { .. } => t.present(0).and_then(AstNode::identifier).map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::python;
    use crate::observe::{CollectingObserver, NoopObserver};
    use std::sync::Arc;

    fn normalize_first_function(source: &str, observer: &dyn DiffObserver) -> OperationBody {
        let unit = python::lower("m.py", source).expect("parse");
        let method = unit
            .root
            .children
            .iter()
            .find(|c| matches!(c.kind, NodeKind::MethodDeclaration(_)))
            .expect("function");
        let parameters: Vec<&AstNode> = method.parameters().collect();
        let context = NormalizeContext {
            language: SourceLanguage::Python,
            file: Arc::from("m.py"),
            class_span: unit.root.span,
            receiver: None,
            observer,
        };
        normalize_operation(method, &parameters, &context)
    }

    #[test]
    fn test_depths_and_expressions() {
        let body = normalize_first_function(
            r#"
def f(items):
    total = 0
    for item in items:
        if item > 0:
            total += item
    return total
"#,
            &NoopObserver,
        );
        let root = body.get(body.root.expect("root"));
        assert_eq!(root.depth, 0);
        let for_fragment = body
            .fragments
            .iter()
            .find(|f| f.kind == StatementKind::For)
            .expect("for");
        assert_eq!(for_fragment.depth, 1);
        assert_eq!(for_fragment.text, "for item in items");
        assert_eq!(for_fragment.expressions.len(), 2);
        let increment = body
            .fragments
            .iter()
            .find(|f| f.text == "total += item")
            .expect("augmented assignment");
        assert_eq!(increment.depth, 5);
    }

    #[test]
    fn test_same_name_loops_keep_separate_scopes() {
        let body = normalize_first_function(
            r#"
def f(a, b):
    for i in a:
        print(i)
    for i in b:
        print(i)
"#,
            &NoopObserver,
        );
        let loops: Vec<_> = body.declarations_named("i").collect();
        assert_eq!(loops.len(), 2);
        assert!(!loops[0].scope.overlaps(&loops[1].scope));
    }

    #[test]
    fn test_first_assignment_declares() {
        let body = normalize_first_function(
            r#"
def f(x):
    y = x
    y = y + 1
    x = 3
    return y
"#,
            &NoopObserver,
        );
        assert_eq!(body.declarations_named("y").count(), 1);
        // parameter already declares x
        assert_eq!(body.declarations_named("x").count(), 1);
        let y = body.declarations_named("y").next().expect("y");
        assert_eq!(y.initializer.as_deref(), Some("x"));
    }

    #[test]
    fn test_try_side_tables() {
        let body = normalize_first_function(
            r#"
def f(path):
    try:
        data = read(path)
    except IOError as err:
        data = None
    finally:
        close(path)
    return data
"#,
            &NoopObserver,
        );
        let try_id = body
            .fragments
            .iter()
            .find(|f| f.kind == StatementKind::Try)
            .map(|f| f.id)
            .expect("try");
        let info = body.try_info(try_id).expect("try info");
        assert_eq!(info.catch_clauses.len(), 1);
        assert!(info.finally.is_some());

        let read = body
            .fragments
            .iter()
            .find(|f| f.text == "data = read(path)")
            .expect("read");
        assert_eq!(body.enclosing_try(read.id), Some(try_id));
        let fallback = body
            .fragments
            .iter()
            .find(|f| f.text == "data = None")
            .expect("fallback");
        assert_eq!(body.enclosing_try(fallback.id), None);
        assert_eq!(body.declarations_named("err").count(), 1);
    }

    #[test]
    fn test_unrecognized_statement_is_reported() {
        let observer = CollectingObserver::new();
        let body = normalize_first_function(
            r#"
def f():
    exec("x")
    return 1
"#,
            &observer,
        );
        assert!(body.fragments.iter().any(|f| f.text == "return 1"));
        let events = observer.events();
        let skipped = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::NodeSkipped { .. }))
            .count();
        assert!(skipped <= 1);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let source = r#"
def f(n):
    while n > 0:
        n = n - 1 if n % 2 else n // 2
    return n
"#;
        let first = normalize_first_function(source, &NoopObserver);
        let second = normalize_first_function(source, &NoopObserver);
        assert_eq!(first.texts(), second.texts());
    }
}
