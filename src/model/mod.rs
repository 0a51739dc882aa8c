//! # Structural Model
//!
//! Classes, operations and attributes of one program snapshot, built from
//! the intermediate AST by [`builder::ModelBuilder`]. Models are immutable
//! once built; the differ only reads them.

pub mod builder;
pub mod variable;

use crate::ast::{SourceLanguage, Span, Visibility};
use crate::fragment::OperationBody;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use variable::{TypeInfo, VariableDeclaration, VariableRole};

pub use builder::ModelBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub name: String,
    pub arguments: Vec<String>,
    #[serde(skip)]
    pub span: Span,
}

impl Annotation {
    /// Simple type name, e.g. `abstractmethod` for `abc.abstractmethod`
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arguments.is_empty() {
            write!(f, "@{}", self.name)
        } else {
            write!(f, "@{}({})", self.name, self.arguments.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub source_file: String,
}

/// Superclass/subclass edge, by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generalization {
    pub child: String,
    pub parent: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassTraits {
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_final: bool,
    pub is_static: bool,
    pub is_annotation_type: bool,
    pub is_enum: bool,
    pub is_record: bool,
    /// Synthesized holder of a file's top-level functions
    pub is_module: bool,
}

#[derive(Debug, Clone)]
pub struct ModelClass {
    pub name: String,
    pub package: String,
    pub source_file: String,
    pub language: SourceLanguage,
    pub visibility: Visibility,
    pub traits: ClassTraits,
    /// Primary superclass (first declared supertype)
    pub superclass: Option<String>,
    /// Edges for every further supertype
    pub generalizations: Vec<Generalization>,
    pub attributes: Vec<Attribute>,
    pub operations: Vec<Operation>,
    pub annotations: Vec<Annotation>,
    pub comments: Vec<Comment>,
    pub span: Span,
}

impl ModelClass {
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Every declared supertype name, primary first
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.superclass
            .iter()
            .map(String::as_str)
            .chain(self.generalizations.iter().map(|g| g.parent.as_str()))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn operations_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Operation> {
        self.operations.iter().filter(move |o| o.name == name)
    }

    pub fn initializer(&self) -> Option<&Operation> {
        self.operations.iter().find(|o| o.traits.is_constructor)
    }

    /// Member keys used for class similarity
    pub fn member_keys(&self) -> HashSet<String> {
        self.operations
            .iter()
            .map(|o| format!("op:{}", o.signature()))
            .chain(self.attributes.iter().map(|a| format!("attr:{}", a.name)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationTraits {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
    pub is_async: bool,
    pub is_final: bool,
    pub is_class_method: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    In,
    VarArgs,
    KwArgs,
    /// Return-type pseudo-parameter
    Return,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub declaration: VariableDeclaration,
    pub role: ParameterRole,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.declaration.type_info
    }
}

/// Identity of an operation inside one model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationKey {
    pub class_name: String,
    pub name: String,
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    /// Qualified name of the owning class
    pub class_name: String,
    pub visibility: Visibility,
    pub traits: OperationTraits,
    /// Declared parameters followed by the return pseudo-parameter
    pub parameters: Vec<Parameter>,
    pub annotations: Vec<Annotation>,
    pub comments: Vec<Comment>,
    pub span: Span,
    pub source_file: String,
    pub body: OperationBody,
}

impl Operation {
    pub fn key(&self) -> OperationKey {
        OperationKey {
            class_name: self.class_name.clone(),
            name: self.name.clone(),
            start_offset: self.span.start_offset,
        }
    }

    /// Declared parameters, return pseudo-parameter excluded
    pub fn in_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.role != ParameterRole::Return)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.in_parameters().map(Parameter::name).collect()
    }

    pub fn parameter_types(&self) -> Vec<String> {
        self.in_parameters()
            .map(|p| p.type_info().to_string())
            .collect()
    }

    pub fn return_type(&self) -> Option<&TypeInfo> {
        self.parameters
            .iter()
            .find(|p| p.role == ParameterRole::Return)
            .map(Parameter::type_info)
    }

    pub fn arity(&self) -> usize {
        self.in_parameters().count()
    }

    /// `name(p1 : T, p2)`
    pub fn signature(&self) -> String {
        let parameters = self
            .in_parameters()
            .map(|p| p.declaration.actual_signature())
            .collect::<Vec<_>>()
            .join(", ");
        match self.return_type() {
            Some(ty) if !ty.is_untyped() => format!("{}({parameters}) : {ty}", self.name),
            _ => format!("{}({parameters})", self.name),
        }
    }

    /// Matching key across models: name, arity and parameter types
    pub fn signature_key(&self) -> (String, usize, Vec<String>) {
        (self.name.clone(), self.arity(), self.parameter_types())
    }

    /// Same parameter names and types, in order
    pub fn has_same_parameters(&self, other: &Operation) -> bool {
        self.parameter_names() == other.parameter_names()
            && self.parameter_types() == other.parameter_types()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.in_parameters().find(|p| p.name() == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.simple_name() == name)
    }

    /// Locals declared in the body, parameters and attributes excluded
    pub fn local_variables(&self) -> impl Iterator<Item = &VariableDeclaration> {
        self.body
            .declarations
            .iter()
            .filter(|d| d.role == VariableRole::Local)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub type_info: TypeInfo,
    /// Qualified name of the owning class
    pub class_name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub declaration: VariableDeclaration,
    /// Operation whose body introduced the attribute
    pub declaring_operation: Option<String>,
}

impl Attribute {
    pub fn role(&self) -> VariableRole {
        self.declaration.role
    }

    pub fn initializer(&self) -> Option<&str> {
        self.declaration.initializer.as_deref()
    }

    /// Matching key across models: name, type and role
    pub fn match_key(&self) -> (String, String, VariableRole) {
        (self.name.clone(), self.type_info.to_string(), self.role())
    }
}

/// One snapshot: classes in file-path order, then declaration order
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub classes: Vec<ModelClass>,
    pub imports: Vec<Import>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, other: Model) {
        self.classes.extend(other.classes);
        self.imports.extend(other.imports);
    }

    pub fn class(&self, qualified_name: &str) -> Option<&ModelClass> {
        self.classes
            .iter()
            .find(|c| c.qualified_name() == qualified_name)
    }

    /// Resolve a supertype name as written: qualified first, then simple
    pub fn resolve(&self, name: &str) -> Option<&ModelClass> {
        self.class(name).or_else(|| {
            let simple = name.rsplit('.').next().unwrap_or(name);
            self.classes.iter().find(|c| c.name == simple)
        })
    }

    /// Whether `child` inherits from `ancestor` (by qualified name), directly
    /// or transitively
    pub fn is_subtype(&self, child: &str, ancestor: &str) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![child.to_string()];
        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(class) = self.class(&current) else {
                continue;
            };
            for parent in class.supertypes() {
                match self.resolve(parent) {
                    Some(resolved) => {
                        let qualified = resolved.qualified_name();
                        if qualified == ancestor {
                            return true;
                        }
                        pending.push(qualified);
                    }
                    None if parent == ancestor => return true,
                    None => {}
                }
            }
        }
        false
    }

    pub fn operation_count(&self) -> usize {
        self.classes.iter().map(|c| c.operations.len()).sum()
    }
}
