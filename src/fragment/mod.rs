//! # Code Fragments
//!
//! Normalized statements and expressions of one operation body, stored in
//! an arena and addressed by [`FragmentId`]. Parent/child links, catch and
//! finally clauses of `try` composites and the enclosing-try back-links are
//! all plain indices.

pub mod facts;
pub mod normalizer;

use crate::ast::Span;
use crate::model::variable::VariableDeclaration;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub use facts::FragmentFacts;
pub use normalizer::{NormalizeContext, normalize_operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FragmentId(pub usize);

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index into [`OperationBody::declarations`]
pub type DeclarationId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Block,
    If,
    Else,
    While,
    For,
    Switch,
    Case,
    Try,
    Catch,
    Finally,
    With,
    Async,
    Synchronized,
    Return,
    Throw,
    Assert,
    Break,
    Continue,
    Pass,
    Yield,
    Global,
    Del,
    Import,
    Assignment,
    VariableDeclaration,
    ExpressionStatement,
    /// Nested function or class definition, kept as a header-only leaf
    Declaration,
    /// Controlling expression of a composite
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Leaf,
    Composite,
    Expression,
}

#[derive(Debug, Clone)]
pub struct CodeFragment {
    pub id: FragmentId,
    pub kind: StatementKind,
    pub shape: Shape,
    /// Structural depth; the root body block is 0
    pub depth: usize,
    /// Canonical text: full statement for leaves, header for composites
    pub text: String,
    pub span: Span,
    pub parent: Option<FragmentId>,
    /// Nested statements of a composite
    pub children: Vec<FragmentId>,
    /// Controlling expressions of a composite
    pub expressions: Vec<FragmentId>,
    /// Position among the parent's children (or expressions)
    pub index: usize,
    pub declarations: Vec<DeclarationId>,
    pub facts: FragmentFacts,
}

impl CodeFragment {
    pub fn is_leaf(&self) -> bool {
        self.shape == Shape::Leaf
    }

    pub fn is_composite(&self) -> bool {
        self.shape == Shape::Composite
    }

    pub fn is_block(&self) -> bool {
        self.kind == StatementKind::Block
    }
}

/// Catch/else/finally clauses attached to a `try` composite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TryInfo {
    pub catch_clauses: Vec<FragmentId>,
    pub else_clause: Option<FragmentId>,
    pub finally: Option<FragmentId>,
}

/// The normalized body of one operation
#[derive(Debug, Clone, Default)]
pub struct OperationBody {
    pub fragments: Vec<CodeFragment>,
    pub root: Option<FragmentId>,
    pub try_clauses: HashMap<FragmentId, TryInfo>,
    pub enclosing_try: HashMap<FragmentId, FragmentId>,
    /// Parameters, locals and receiver-qualified attribute assignments,
    /// unique by (scope, name)
    pub declarations: Vec<VariableDeclaration>,
    /// Fragments referencing each declaration, parallel to `declarations`
    pub references: Vec<Vec<FragmentId>>,
}

impl OperationBody {
    pub fn get(&self, id: FragmentId) -> &CodeFragment {
        &self.fragments[id.0]
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Statement fragments in pre-order, the root block included
    pub fn preorder(&self) -> Vec<FragmentId> {
        let mut order = Vec::with_capacity(self.fragments.len());
        let mut stack: Vec<FragmentId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.get(id).children.iter().rev().copied());
        }
        order
    }

    pub fn leaves(&self) -> Vec<FragmentId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.get(*id).is_leaf())
            .collect()
    }

    /// Composite statements, blocks excluded
    pub fn composites(&self) -> Vec<FragmentId> {
        self.preorder()
            .into_iter()
            .filter(|id| {
                let fragment = self.get(*id);
                fragment.is_composite() && !fragment.is_block()
            })
            .collect()
    }

    /// Number of mappable statements
    pub fn statement_count(&self) -> usize {
        self.preorder()
            .into_iter()
            .filter(|id| !self.get(*id).is_block())
            .count()
    }

    pub fn enclosing_try(&self, id: FragmentId) -> Option<FragmentId> {
        self.enclosing_try.get(&id).copied()
    }

    pub fn try_info(&self, id: FragmentId) -> Option<&TryInfo> {
        self.try_clauses.get(&id)
    }

    /// Kinds of the ancestors of `id`, nearest first, blocks skipped
    pub fn ancestor_kinds(&self, id: FragmentId) -> Vec<StatementKind> {
        let mut kinds = Vec::new();
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            let fragment = self.get(parent);
            if !fragment.is_block() {
                kinds.push(fragment.kind);
            }
            current = fragment.parent;
        }
        kinds
    }

    /// All descendants of a composite, statements only
    pub fn descendants(&self, id: FragmentId) -> Vec<FragmentId> {
        let mut found = Vec::new();
        let mut stack: Vec<FragmentId> = self.get(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            found.push(next);
            stack.extend(self.get(next).children.iter().rev().copied());
        }
        found
    }

    pub fn declaration(&self, id: DeclarationId) -> &VariableDeclaration {
        &self.declarations[id]
    }

    pub fn declarations_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a VariableDeclaration> + 'a {
        self.declarations.iter().filter(move |d| d.name == name)
    }

    /// Canonical text of every fragment in arena order
    pub fn texts(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}
