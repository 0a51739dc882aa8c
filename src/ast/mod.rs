//! # Intermediate AST
//!
//! A language-neutral syntax tree lowered from the ast-grep/tree-sitter
//! parse of a single source file. Every front-end produces the same closed
//! set of [`NodeKind`]s with a fixed child layout per kind, so the model
//! builder and the normalizer never look at grammar-specific node names.

pub mod java;
pub mod python;
pub mod render;

mod lower;

use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use render::{render, statement_text};

/// Shared, non-owning handle to the compilation unit a node belongs to.
pub type UnitRef = Arc<str>;

/// Source location of a node. Lines and columns are zero-based; offsets are
/// tree-sitter byte offsets into the source text, not character offsets, so
/// they only compare meaningfully within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Span {
    /// A zero-width span, used for [`NodeKind::Absent`] markers.
    pub fn empty_at(offset: usize, line: usize, column: usize) -> Self {
        Self {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column,
            start_offset: offset,
            end_offset: offset,
        }
    }

    /// Zero-width span at the end of this span
    pub fn end_point(&self) -> Self {
        Self::empty_at(self.end_offset, self.end_line, self.end_column)
    }

    /// Zero-width span at the start of this span
    pub fn start_point(&self) -> Self {
        Self::empty_at(self.start_offset, self.start_line, self.start_column)
    }

    /// Span covering `self` through the end of `other`
    pub fn to(&self, other: &Span) -> Self {
        Self {
            start_line: self.start_line,
            start_column: self.start_column,
            end_line: other.end_line,
            end_column: other.end_column,
            start_offset: self.start_offset,
            end_offset: other.end_offset,
        }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start_offset <= other.start_offset && other.end_offset <= self.end_offset
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// The languages with a lowering front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Python,
    Java,
}

impl SourceLanguage {
    /// Detect the language from a file path's extension
    pub fn from_path(path: &str) -> Option<Self> {
        match Path::new(path).extension()?.to_str()? {
            "py" | "pyi" => Some(Self::Python),
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    /// Names that denote the implicit receiver inside an instance method
    pub fn receiver_names(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["self", "cls"],
            Self::Java => &["this"],
        }
    }

    /// Whether instance methods declare their receiver as the first parameter
    pub fn declares_receiver(&self) -> bool {
        matches!(self, Self::Python)
    }

    /// Whether a plain assignment to an unbound name introduces a local variable
    pub fn declares_on_assignment(&self) -> bool {
        matches!(self, Self::Python)
    }

    /// Name of the designated initializer operation, if the language has one by convention
    pub fn initializer_name(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some("__init__"),
            Self::Java => None,
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Java => write!(f, "java"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
            Visibility::Private => "private",
        };
        f.write_str(text)
    }
}

/// Declaration modifiers as written in the source. Dynamic languages leave
/// everything unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_default: bool,
    pub is_synchronized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    AnnotationType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// `extends`/`implements`/base-class names in declaration order
    pub supertypes: Vec<String>,
    /// Keyword arguments of a Python base list, e.g. `metaclass=ABCMeta`
    pub keywords: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub is_constructor: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    Regular,
    VarArgs,
    KwArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Source module for `from m import x`; empty for plain `import a.b`
    pub module: String,
    pub names: Vec<ImportedName>,
    pub is_wildcard: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForStyle {
    /// `for target in iterable` / `for (T x : items)`
    Each,
    /// `for (init; condition; update)`
    Classic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Number,
    String,
    Char,
    Boolean,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Tuple,
    Set,
    Dict,
    Array,
}

/// Node categories. The documented child layout of each variant is fixed;
/// optional slots hold an [`NodeKind::Absent`] child instead of being omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Compilation unit root. Children: top-level statements and declarations.
    Module,
    /// Children: statements.
    Block,
    /// `[condition, then: Block, else: Block | If | Absent]`
    If,
    /// `[condition, body: Block, else: Else | Absent]`
    While { do_while: bool },
    /// Each: `[target, iterable, body: Block, else: Else | Absent]`;
    /// Classic: `[init: ExpressionList, condition | Absent, update: ExpressionList, body: Block]`
    For { style: ForStyle },
    /// `[subject, Case...]`
    Switch,
    /// `[patterns: ExpressionList, guard | Absent, body: Block]`
    Case { is_default: bool },
    /// `[resources: ExpressionList, body: Block, Catch..., else: Else | Absent, finally: Finally | Absent]`
    Try,
    /// `[types: ExpressionList, name: SimpleName | Absent, body: Block]`
    Catch,
    /// `[body: Block]`
    Finally,
    /// `[body: Block]`, the `else` clause of a loop or `try`
    Else,
    Break,
    Continue,
    Pass,
    /// `[value | Absent]`
    Return,
    /// `[exception | Absent, cause | Absent]`
    Throw,
    /// `[condition, message | Absent]`
    Assert,
    /// `[value | Absent]`; statement or expression
    Yield { delegate: bool },
    Global { names: Vec<String> },
    Nonlocal { names: Vec<String> },
    /// `[targets...]`
    Del,
    /// `[WithItem..., body: Block]`
    With,
    /// `[context, alias | Absent]`
    WithItem,
    Import(ImportDecl),
    /// `[target, annotation: TypeRef | Absent, value | Absent]`
    Assignment { operator: String },
    /// `[type: TypeRef, SingleVariableDeclaration...]`
    VariableDeclarationStatement { modifiers: Modifiers },
    /// `[expression]`
    ExpressionStatement,
    /// `[lock, body: Block]`
    Synchronized,
    /// `[receiver | Absent, arguments...]`
    MethodInvocation { name: String },
    /// `[arguments...]`
    ObjectCreation { type_name: String },
    /// `[receiver]`
    FieldAccess { name: String },
    SimpleName { identifier: String },
    Literal { kind: LiteralKind, text: String },
    /// `[left, right]`
    BinaryOp { operator: String },
    /// `[operand]`
    UnaryOp { operator: String, prefix: bool },
    /// `[condition, then, else]`
    Ternary,
    /// `[value, index]`
    Subscript,
    /// Children: elements (`Pair`s for dictionaries)
    Collection { kind: CollectionKind },
    /// `[key, value]`
    Pair,
    /// `[value]`
    KeywordArgument { name: String },
    /// `[SingleVariableDeclaration..., body]`
    Lambda,
    /// `[inner]`
    Parenthesized,
    /// Children: expressions
    ExpressionList,
    /// Children: argument expressions
    Annotation { name: String },
    /// `[Annotation..., SingleVariableDeclaration (record components)..., body: Block]`
    TypeDeclaration(TypeDecl),
    /// `[Annotation..., SingleVariableDeclaration..., return: TypeRef | Absent, body: Block | Absent]`
    MethodDeclaration(MethodDecl),
    /// `[type: TypeRef | Absent, initializer | Absent]`
    SingleVariableDeclaration { name: String, kind: ParameterKind },
    /// `[arguments...]`, an enum constant inside a type body
    EnumConstant { name: String },
    /// Children: type arguments (`TypeRef`s)
    TypeRef { name: String },
    /// `[statement]`
    Async,
    Comment { text: String },
    /// A construct the front-end has no category for. Children are lowered
    /// where possible; `text` is the whitespace-normalized source.
    Other { kind: String, text: String },
    /// Explicit marker for a missing optional or required child
    Absent,
}

impl NodeKind {
    /// Short label for logging
    pub fn label(&self) -> &str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Block => "block",
            NodeKind::If => "if",
            NodeKind::While { .. } => "while",
            NodeKind::For { .. } => "for",
            NodeKind::Switch => "switch",
            NodeKind::Case { .. } => "case",
            NodeKind::Try => "try",
            NodeKind::Catch => "catch",
            NodeKind::Finally => "finally",
            NodeKind::Else => "else",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Pass => "pass",
            NodeKind::Return => "return",
            NodeKind::Throw => "throw",
            NodeKind::Assert => "assert",
            NodeKind::Yield { .. } => "yield",
            NodeKind::Global { .. } => "global",
            NodeKind::Nonlocal { .. } => "nonlocal",
            NodeKind::Del => "del",
            NodeKind::With => "with",
            NodeKind::WithItem => "with_item",
            NodeKind::Import(_) => "import",
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::VariableDeclarationStatement { .. } => "variable_declaration",
            NodeKind::ExpressionStatement => "expression_statement",
            NodeKind::Synchronized => "synchronized",
            NodeKind::MethodInvocation { .. } => "method_invocation",
            NodeKind::ObjectCreation { .. } => "object_creation",
            NodeKind::FieldAccess { .. } => "field_access",
            NodeKind::SimpleName { .. } => "simple_name",
            NodeKind::Literal { .. } => "literal",
            NodeKind::BinaryOp { .. } => "binary_op",
            NodeKind::UnaryOp { .. } => "unary_op",
            NodeKind::Ternary => "ternary",
            NodeKind::Subscript => "subscript",
            NodeKind::Collection { .. } => "collection",
            NodeKind::Pair => "pair",
            NodeKind::KeywordArgument { .. } => "keyword_argument",
            NodeKind::Lambda => "lambda",
            NodeKind::Parenthesized => "parenthesized",
            NodeKind::ExpressionList => "expression_list",
            NodeKind::Annotation { .. } => "annotation",
            NodeKind::TypeDeclaration(_) => "type_declaration",
            NodeKind::MethodDeclaration(_) => "method_declaration",
            NodeKind::SingleVariableDeclaration { .. } => "single_variable_declaration",
            NodeKind::EnumConstant { .. } => "enum_constant",
            NodeKind::TypeRef { .. } => "type_ref",
            NodeKind::Async => "async",
            NodeKind::Comment { .. } => "comment",
            NodeKind::Other { kind, .. } => kind,
            NodeKind::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<AstNode>,
    pub unit: UnitRef,
}

impl AstNode {
    pub fn new(kind: NodeKind, span: Span, unit: UnitRef) -> Self {
        Self {
            kind,
            span,
            children: Vec::new(),
            unit,
        }
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }

    pub fn absent(span: Span, unit: UnitRef) -> Self {
        Self::new(NodeKind::Absent, span, unit)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.kind, NodeKind::Absent)
    }

    /// The child at `index` unless it is an absent marker
    pub fn present(&self, index: usize) -> Option<&AstNode> {
        self.children.get(index).filter(|child| !child.is_absent())
    }

    pub fn child(&self, index: usize) -> Option<&AstNode> {
        self.children.get(index)
    }

    /// Pre-order traversal: the visitor sees `self`, then (if it asked to
    /// descend) each child left to right, then `leave` for `self`.
    pub fn accept<V: AstVisitor + ?Sized>(&self, visitor: &mut V) {
        if visitor.visit(self) {
            for child in &self.children {
                child.accept(visitor);
            }
        }
        visitor.leave(self);
    }

    pub fn annotations(&self) -> impl Iterator<Item = &AstNode> {
        self.children
            .iter()
            .filter(|child| matches!(child.kind, NodeKind::Annotation { .. }))
    }

    /// Parameters of a method declaration, or components of a record type
    pub fn parameters(&self) -> impl Iterator<Item = &AstNode> {
        self.children
            .iter()
            .filter(|child| matches!(child.kind, NodeKind::SingleVariableDeclaration { .. }))
    }

    /// Return type slot of a method declaration
    pub fn return_type(&self) -> Option<&AstNode> {
        match self.kind {
            NodeKind::MethodDeclaration(_) if self.children.len() >= 2 => {
                self.present(self.children.len() - 2)
            }
            _ => None,
        }
    }

    /// Body block of a method or type declaration
    pub fn body(&self) -> Option<&AstNode> {
        match self.kind {
            NodeKind::MethodDeclaration(_) | NodeKind::TypeDeclaration(_) => self
                .children
                .last()
                .filter(|child| matches!(child.kind, NodeKind::Block)),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::SimpleName { identifier } => Some(identifier),
            _ => None,
        }
    }
}

/// Visitor-acceptance protocol over [`AstNode`]
pub trait AstVisitor {
    /// Called before the children of `node`; return `false` to skip them
    fn visit(&mut self, node: &AstNode) -> bool;

    /// Called after the children of `node`
    fn leave(&mut self, _node: &AstNode) {}
}

/// One parsed source file
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub path: UnitRef,
    pub language: SourceLanguage,
    pub root: AstNode,
}

/// Parse `text` with the front-end selected by the extension of `path`.
pub fn parse_source(path: &str, text: &str) -> Result<CompilationUnit, ServiceError> {
    match SourceLanguage::from_path(path) {
        Some(SourceLanguage::Python) => python::lower(path, text),
        Some(SourceLanguage::Java) => java::lower(path, text),
        None => Err(ServiceError::UnsupportedLanguage(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KindCollector(Vec<String>);

    impl AstVisitor for KindCollector {
        fn visit(&mut self, node: &AstNode) -> bool {
            self.0.push(node.kind.label().to_string());
            true
        }
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(SourceLanguage::from_path("a/b.py"), Some(SourceLanguage::Python));
        assert_eq!(SourceLanguage::from_path("A.java"), Some(SourceLanguage::Java));
        assert_eq!(SourceLanguage::from_path("README.md"), None);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err = parse_source("notes.txt", "hello").unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_accept_is_preorder() {
        let unit: UnitRef = Arc::from("t.py");
        let name = |id: &str| {
            AstNode::new(
                NodeKind::SimpleName {
                    identifier: id.to_string(),
                },
                Span::default(),
                unit.clone(),
            )
        };
        let tree = AstNode::new(
            NodeKind::BinaryOp {
                operator: "+".to_string(),
            },
            Span::default(),
            unit.clone(),
        )
        .with_children(vec![name("a"), name("b")]);

        let mut collector = KindCollector(Vec::new());
        tree.accept(&mut collector);
        assert_eq!(collector.0, vec!["binary_op", "simple_name", "simple_name"]);
    }

    #[test]
    fn test_span_helpers() {
        let outer = Span {
            start_line: 0,
            start_column: 0,
            end_line: 3,
            end_column: 4,
            start_offset: 0,
            end_offset: 40,
        };
        let inner = Span::empty_at(10, 1, 2);
        assert!(outer.contains(&inner));
        assert!(inner.is_empty());
        assert_eq!(outer.end_point().start_offset, 40);
    }
}
