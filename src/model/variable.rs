//! Variable declarations and the types they carry.

use crate::ast::{AstNode, NodeKind, ParameterKind, Span, render};
use crate::fragment::FragmentId;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Declared type of a variable, parameter or attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(untagged)]
pub enum TypeInfo {
    /// No annotation, the default for dynamically typed sources
    #[default]
    Untyped,
    Named {
        name: String,
        arguments: Vec<TypeInfo>,
    },
}

impl TypeInfo {
    pub fn named(name: impl Into<String>) -> Self {
        TypeInfo::Named {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Structural type from a `TypeRef` node; anything else is untyped
    pub fn from_node(node: Option<&AstNode>) -> Self {
        match node.map(|n| (&n.kind, n)) {
            Some((NodeKind::TypeRef { name }, node)) => TypeInfo::Named {
                name: name.clone(),
                arguments: node
                    .children
                    .iter()
                    .map(|arg| TypeInfo::from_node(Some(arg)))
                    .collect(),
            },
            Some((NodeKind::Absent, _)) | None => TypeInfo::Untyped,
            Some((_, node)) => TypeInfo::named(render(node)),
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, TypeInfo::Untyped)
    }

    /// Base name without type arguments
    pub fn base_name(&self) -> Option<&str> {
        match self {
            TypeInfo::Untyped => None,
            TypeInfo::Named { name, .. } => Some(name),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Untyped => f.write_str("_"),
            TypeInfo::Named { name, arguments } if arguments.is_empty() => f.write_str(name),
            TypeInfo::Named { name, arguments } => {
                let args = arguments
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{name}<{args}>")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableRole {
    Local,
    Parameter,
    Attribute,
    EnumConstant,
}

/// File plus byte-offset interval (same offsets as [`crate::ast::Span`])
/// over which a declaration is visible
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub file: Arc<str>,
    pub start: usize,
    pub end: usize,
}

impl Scope {
    pub fn new(file: Arc<str>, start: usize, end: usize) -> Self {
        Self { file, start, end }
    }

    pub fn of_span(file: Arc<str>, span: &Span) -> Self {
        Self::new(file, span.start_offset, span.end_offset)
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end.max(self.start + 1)
    }

    pub fn overlaps(&self, other: &Scope) -> bool {
        self.file == other.file && self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub name: String,
    pub type_info: TypeInfo,
    pub role: VariableRole,
    pub scope: Scope,
    pub initializer: Option<String>,
    pub span: Span,
    pub is_varargs: bool,
    /// Fragment that introduces the declaration, when it lives in a body
    pub statement: Option<FragmentId>,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, role: VariableRole, scope: Scope, span: Span) -> Self {
        Self {
            name: name.into(),
            type_info: TypeInfo::Untyped,
            role,
            scope,
            initializer: None,
            span,
            is_varargs: false,
            statement: None,
        }
    }

    /// Declaration for a `SingleVariableDeclaration` parameter node
    pub fn from_parameter(node: &AstNode, scope: Scope) -> Option<Self> {
        let NodeKind::SingleVariableDeclaration { name, kind } = &node.kind else {
            return None;
        };
        let mut declaration =
            VariableDeclaration::new(name.clone(), VariableRole::Parameter, scope, node.span);
        declaration.type_info = TypeInfo::from_node(node.present(0));
        declaration.initializer = node.present(1).map(render);
        declaration.is_varargs = !matches!(kind, ParameterKind::Regular);
        Some(declaration)
    }

    pub fn is_parameter(&self) -> bool {
        self.role == VariableRole::Parameter
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.role, VariableRole::Attribute | VariableRole::EnumConstant)
    }

    /// `name : Type`, or just the name when untyped
    pub fn actual_signature(&self) -> String {
        if self.type_info.is_untyped() {
            self.name.clone()
        } else {
            format!("{} : {}", self.name, self.type_info)
        }
    }
}

impl PartialEq for VariableDeclaration {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope && self.name == other.name
    }
}

impl Eq for VariableDeclaration {}

impl Hash for VariableDeclaration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn scope(start: usize, end: usize) -> Scope {
        Scope::new(Arc::from("m.py"), start, end)
    }

    #[test]
    fn test_identity_is_scope_and_name() {
        let first = VariableDeclaration::new("i", VariableRole::Local, scope(10, 40), Span::default());
        let mut retyped = first.clone();
        retyped.type_info = TypeInfo::named("int");
        let disjoint = VariableDeclaration::new("i", VariableRole::Local, scope(50, 90), Span::default());

        assert_eq!(first, retyped);
        assert_ne!(first, disjoint);

        let set: HashSet<_> = [first, retyped, disjoint].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_actual_signature() {
        let mut declaration =
            VariableDeclaration::new("items", VariableRole::Parameter, scope(0, 5), Span::default());
        assert_eq!(declaration.actual_signature(), "items");
        declaration.type_info = TypeInfo::Named {
            name: "List".to_string(),
            arguments: vec![TypeInfo::named("Item")],
        };
        assert_eq!(declaration.actual_signature(), "items : List<Item>");
    }

    #[test]
    fn test_scope_overlap() {
        assert!(scope(0, 10).overlaps(&scope(5, 20)));
        assert!(!scope(0, 10).overlaps(&scope(10, 20)));
    }
}
