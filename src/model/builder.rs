//! Builds [`ModelClass`]es from one compilation unit.

use super::variable::{Scope, TypeInfo, VariableDeclaration, VariableRole};
use super::{
    Annotation, Attribute, ClassTraits, Comment, Generalization, Import, Model, ModelClass,
    Operation, OperationTraits, Parameter, ParameterRole,
};
use crate::ast::{
    AstNode, AstVisitor, CompilationUnit, NodeKind, ParameterKind, SourceLanguage, Span,
    TypeDecl, TypeKind, Visibility, render,
};
use crate::fragment::{NormalizeContext, normalize_operation};
use crate::observe::DiffObserver;
use std::path::Path;

const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

/// Where an operation is declared, as far as the receiver convention cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Instance,
    ClassMethod,
    Static,
    Module,
}

/// Number of leading parameters that name the implicit receiver
pub fn receiver_offset(language: SourceLanguage, placement: Placement) -> usize {
    match placement {
        Placement::Instance | Placement::ClassMethod if language.declares_receiver() => 1,
        _ => 0,
    }
}

/// Python visibility from the naming convention
fn visibility_by_name(name: &str) -> Visibility {
    if name.starts_with("__") && name.ends_with("__") {
        Visibility::Public
    } else if name.starts_with("__") {
        Visibility::Private
    } else if name.starts_with('_') {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

fn annotation_of(node: &AstNode) -> Option<Annotation> {
    let NodeKind::Annotation { name } = &node.kind else {
        return None;
    };
    Some(Annotation {
        name: name.clone(),
        arguments: node.children.iter().map(render).collect(),
        span: node.span,
    })
}

#[derive(Default)]
struct CommentCollector(Vec<Comment>);

impl AstVisitor for CommentCollector {
    fn visit(&mut self, node: &AstNode) -> bool {
        if let NodeKind::Comment { text } = &node.kind {
            self.0.push(Comment {
                text: text.clone(),
                span: node.span,
            });
        }
        true
    }
}

/// Assignments reachable from `node` without entering nested definitions
fn walk_statements<'n>(node: &'n AstNode, found: &mut Vec<&'n AstNode>) {
    for child in &node.children {
        match child.kind {
            NodeKind::Assignment { .. } => found.push(child),
            NodeKind::MethodDeclaration(_) | NodeKind::TypeDeclaration(_) => {}
            _ => walk_statements(child, found),
        }
    }
}

pub struct ModelBuilder<'a> {
    observer: &'a dyn DiffObserver,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(observer: &'a dyn DiffObserver) -> Self {
        Self { observer }
    }

    pub fn build(&self, unit: &CompilationUnit) -> Model {
        let path = unit.path.to_string();
        let file = FileContext {
            path: path.clone(),
            language: unit.language,
            unit: unit.path.clone(),
            package: Self::package_of(unit),
        };

        let mut model = Model::new();
        let mut module_operations = Vec::new();
        let mut module_statements = Vec::new();
        let mut module_comments = Vec::new();

        for child in &unit.root.children {
            match &child.kind {
                NodeKind::TypeDeclaration(_) => {
                    model.classes.extend(self.build_class(child, None, &file))
                }
                NodeKind::MethodDeclaration(_) => module_operations.push(child),
                NodeKind::Import(decl) => {
                    if decl.names.is_empty() {
                        model.imports.push(Import {
                            module: decl.module.clone(),
                            name: None,
                            alias: None,
                            source_file: path.clone(),
                        });
                    }
                    for name in &decl.names {
                        model.imports.push(Import {
                            module: decl.module.clone(),
                            name: Some(name.name.clone()),
                            alias: name.alias.clone(),
                            source_file: path.clone(),
                        });
                    }
                }
                NodeKind::Comment { text } => module_comments.push(Comment {
                    text: text.clone(),
                    span: child.span,
                }),
                NodeKind::Assignment { .. } => module_statements.push(child),
                _ => {}
            }
        }

        if !module_operations.is_empty() {
            let module = self.build_module(unit, &file, &module_operations, &module_statements, module_comments);
            model.classes.insert(0, module);
        }
        model
    }

    /// Package of the types declared in `unit`: the `package` clause for
    /// Java, the dotted module path for Python
    fn package_of(unit: &CompilationUnit) -> String {
        match unit.language {
            SourceLanguage::Java => unit
                .root
                .children
                .iter()
                .find_map(|c| match &c.kind {
                    NodeKind::Other { kind, text } if kind == "package" => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default(),
            SourceLanguage::Python => {
                let path = Path::new(unit.path.as_ref()).with_extension("");
                path.components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .filter(|c| *c != "." && *c != "..")
                    .collect::<Vec<_>>()
                    .join(".")
            }
        }
    }

    fn build_module(
        &self,
        unit: &CompilationUnit,
        file: &FileContext,
        functions: &[&AstNode],
        statements: &[&AstNode],
        comments: Vec<Comment>,
    ) -> ModelClass {
        let (package, name) = match file.package.rsplit_once('.') {
            Some((package, name)) => (package.to_string(), name.to_string()),
            None => (String::new(), file.package.clone()),
        };
        let mut class = ModelClass {
            name,
            package,
            source_file: file.path.clone(),
            language: file.language,
            visibility: Visibility::Public,
            traits: ClassTraits {
                is_module: true,
                ..ClassTraits::default()
            },
            superclass: None,
            generalizations: Vec::new(),
            attributes: Vec::new(),
            operations: Vec::new(),
            annotations: Vec::new(),
            comments,
            span: unit.root.span,
        };
        let class_name = class.qualified_name();

        for statement in statements {
            let NodeKind::Assignment { .. } = statement.kind else {
                continue;
            };
            if let Some(target) = statement.present(0).and_then(AstNode::identifier) {
                if class.attribute(target).is_some() {
                    continue;
                }
                let attribute = self.attribute(
                    target,
                    statement,
                    &class_name,
                    &unit.root.span,
                    file,
                    VariableRole::Attribute,
                    true,
                );
                class.attributes.push(attribute);
            }
        }

        class.operations.extend(functions.iter().filter_map(|function| {
            self.build_operation(
                function,
                &class_name,
                unit.root.span,
                Placement::Module,
                false,
                file,
            )
        }));
        class
    }

    fn class_traits(&self, decl: &TypeDecl, node: &AstNode, language: SourceLanguage) -> ClassTraits {
        let simple = |name: &str| name.rsplit('.').next().unwrap_or(name).to_string();
        let annotations: Vec<String> = node
            .annotations()
            .filter_map(annotation_of)
            .map(|a| a.simple_name().to_string())
            .collect();
        match language {
            SourceLanguage::Java => ClassTraits {
                is_abstract: decl.modifiers.is_abstract || decl.kind == TypeKind::Interface,
                is_interface: decl.kind == TypeKind::Interface,
                is_final: decl.modifiers.is_final,
                is_static: decl.modifiers.is_static,
                is_annotation_type: decl.kind == TypeKind::AnnotationType,
                is_enum: decl.kind == TypeKind::Enum,
                is_record: decl.kind == TypeKind::Record,
                is_module: false,
            },
            SourceLanguage::Python => {
                let bases: Vec<String> = decl.supertypes.iter().map(|s| simple(s)).collect();
                let has_abstract_method = node.body().is_some_and(|body| {
                    body.children.iter().any(|member| {
                        member
                            .annotations()
                            .filter_map(annotation_of)
                            .any(|a| a.simple_name() == "abstractmethod")
                    })
                });
                ClassTraits {
                    is_abstract: bases.iter().any(|b| b == "ABC")
                        || decl
                            .keywords
                            .iter()
                            .any(|(k, v)| k == "metaclass" && simple(v) == "ABCMeta")
                        || has_abstract_method,
                    is_interface: bases.iter().any(|b| b == "Protocol"),
                    is_final: annotations.iter().any(|a| a == "final"),
                    is_static: false,
                    is_annotation_type: false,
                    is_enum: bases.iter().any(|b| ENUM_BASES.contains(&b.as_str())),
                    is_record: annotations.iter().any(|a| a == "dataclass"),
                    is_module: false,
                }
            }
        }
    }

    fn build_class(
        &self,
        node: &AstNode,
        outer: Option<&str>,
        file: &FileContext,
    ) -> Vec<ModelClass> {
        let NodeKind::TypeDeclaration(decl) = &node.kind else {
            return Vec::new();
        };
        let name = match outer {
            Some(outer) => format!("{outer}.{}", decl.name),
            None => decl.name.clone(),
        };
        let traits = self.class_traits(decl, node, file.language);
        let visibility = match file.language {
            SourceLanguage::Java => decl.modifiers.visibility.unwrap_or(Visibility::Package),
            SourceLanguage::Python => visibility_by_name(&decl.name),
        };
        let mut supertypes = decl.supertypes.iter();
        let superclass = supertypes.next().cloned();
        let mut class = ModelClass {
            name: name.clone(),
            package: file.package.clone(),
            source_file: file.path.clone(),
            language: file.language,
            visibility,
            traits,
            superclass,
            generalizations: Vec::new(),
            attributes: Vec::new(),
            operations: Vec::new(),
            annotations: node.annotations().filter_map(annotation_of).collect(),
            comments: Vec::new(),
            span: node.span,
        };
        let qualified = class.qualified_name();
        class.generalizations = supertypes
            .map(|parent| Generalization {
                child: qualified.clone(),
                parent: parent.clone(),
            })
            .collect();

        let mut nested = Vec::new();

        // Record components
        for component in node.parameters() {
            if let NodeKind::SingleVariableDeclaration { name, .. } = &component.kind {
                let scope = Scope::of_span(file.unit.clone(), &node.span);
                let mut declaration =
                    VariableDeclaration::new(name.clone(), VariableRole::Attribute, scope, component.span);
                declaration.type_info = TypeInfo::from_node(component.present(0));
                class.attributes.push(Attribute {
                    name: name.clone(),
                    type_info: declaration.type_info.clone(),
                    class_name: qualified.clone(),
                    visibility: Visibility::Private,
                    is_static: false,
                    is_final: true,
                    declaration,
                    declaring_operation: None,
                });
            }
        }

        let members = node.body().map(|b| b.children.as_slice()).unwrap_or_default();
        let mut initializers = Vec::new();
        for member in members {
            match &member.kind {
                NodeKind::MethodDeclaration(method) => {
                    let annotations: Vec<String> = member
                        .annotations()
                        .filter_map(annotation_of)
                        .map(|a| a.simple_name().to_string())
                        .collect();
                    let placement = if method.modifiers.is_static
                        || annotations.iter().any(|a| a == "staticmethod")
                    {
                        Placement::Static
                    } else if annotations.iter().any(|a| a == "classmethod") {
                        Placement::ClassMethod
                    } else {
                        Placement::Instance
                    };
                    if file.language.initializer_name() == Some(method.name.as_str()) {
                        initializers.push(member);
                    }
                    class.operations.extend(self.build_operation(
                        member,
                        &qualified,
                        node.span,
                        placement,
                        traits.is_interface,
                        file,
                    ));
                }
                NodeKind::TypeDeclaration(_) => {
                    nested.extend(self.build_class(member, Some(&name), file));
                }
                NodeKind::VariableDeclarationStatement { modifiers } => {
                    let type_info = TypeInfo::from_node(member.child(0));
                    for declarator in member.children.iter().skip(1) {
                        let NodeKind::SingleVariableDeclaration { name, .. } = &declarator.kind
                        else {
                            continue;
                        };
                        let scope = Scope::of_span(file.unit.clone(), &node.span);
                        let mut declaration = VariableDeclaration::new(
                            name.clone(),
                            VariableRole::Attribute,
                            scope,
                            declarator.span,
                        );
                        declaration.type_info = type_info.clone();
                        declaration.initializer = declarator.present(1).map(render);
                        let default_visibility = if traits.is_interface {
                            Visibility::Public
                        } else {
                            Visibility::Package
                        };
                        class.attributes.push(Attribute {
                            name: name.clone(),
                            type_info: type_info.clone(),
                            class_name: qualified.clone(),
                            visibility: modifiers.visibility.unwrap_or(default_visibility),
                            is_static: modifiers.is_static || traits.is_interface,
                            is_final: modifiers.is_final || traits.is_interface,
                            declaration,
                            declaring_operation: None,
                        });
                    }
                }
                NodeKind::EnumConstant { name } => {
                    let scope = Scope::of_span(file.unit.clone(), &node.span);
                    let mut declaration = VariableDeclaration::new(
                        name.clone(),
                        VariableRole::EnumConstant,
                        scope,
                        member.span,
                    );
                    declaration.type_info = TypeInfo::named(decl.name.clone());
                    if !member.children.is_empty() {
                        declaration.initializer = Some(
                            member
                                .children
                                .iter()
                                .map(render)
                                .collect::<Vec<_>>()
                                .join(", "),
                        );
                    }
                    class.attributes.push(Attribute {
                        name: name.clone(),
                        type_info: declaration.type_info.clone(),
                        class_name: qualified.clone(),
                        visibility: Visibility::Public,
                        is_static: true,
                        is_final: true,
                        declaration,
                        declaring_operation: None,
                    });
                }
                NodeKind::Assignment { .. } => {
                    self.class_scope_assignment(member, &mut class, node, file);
                }
                NodeKind::Comment { text } => class.comments.push(Comment {
                    text: text.clone(),
                    span: member.span,
                }),
                _ => {}
            }
        }

        for initializer in initializers {
            self.discover_attributes(initializer, &mut class, node, file);
        }

        let mut classes = vec![class];
        classes.extend(nested);
        classes
    }

    /// Class-body assignments: plain names become static attributes (enum
    /// constants inside enums), receiver-qualified targets become instance
    /// attributes
    fn class_scope_assignment(
        &self,
        statement: &AstNode,
        class: &mut ModelClass,
        class_node: &AstNode,
        file: &FileContext,
    ) {
        let Some(target) = statement.present(0) else {
            return;
        };
        let qualified = class.qualified_name();
        let (name, role, is_static) = match &target.kind {
            NodeKind::SimpleName { identifier } => {
                let role = if class.traits.is_enum {
                    VariableRole::EnumConstant
                } else {
                    VariableRole::Attribute
                };
                // Annotated-only fields of dataclasses are per instance
                let is_static = !(class.traits.is_record || statement.present(2).is_none());
                (identifier.clone(), role, is_static)
            }
            NodeKind::FieldAccess { name }
                if target
                    .present(0)
                    .and_then(AstNode::identifier)
                    .is_some_and(|r| file.language.receiver_names().contains(&r)) =>
            {
                (name.clone(), VariableRole::Attribute, false)
            }
            _ => return,
        };
        if class.attribute(&name).is_some() {
            return;
        }
        let attribute = self.attribute(
            &name,
            statement,
            &qualified,
            &class_node.span,
            file,
            role,
            is_static,
        );
        class.attributes.push(attribute);
    }

    /// Scan the designated initializer for `self.x = ...`; first assignment
    /// per name wins
    fn discover_attributes(
        &self,
        initializer: &AstNode,
        class: &mut ModelClass,
        class_node: &AstNode,
        file: &FileContext,
    ) {
        let Some(receiver) = initializer
            .parameters()
            .next()
            .and_then(|p| match &p.kind {
                NodeKind::SingleVariableDeclaration { name, .. } => Some(name.clone()),
                _ => None,
            })
        else {
            return;
        };
        let Some(body) = initializer.body() else {
            return;
        };
        let mut assignments = Vec::new();
        walk_statements(body, &mut assignments);

        let qualified = class.qualified_name();
        let operation_name = match &initializer.kind {
            NodeKind::MethodDeclaration(m) => Some(m.name.clone()),
            _ => None,
        };
        for assignment in assignments {
            let Some(target) = assignment.child(0) else {
                continue;
            };
            let targets: Vec<&AstNode> = match &target.kind {
                NodeKind::Collection { .. } => target.children.iter().collect(),
                _ => vec![target],
            };
            let single = targets.len() == 1;
            for target in targets {
                let NodeKind::FieldAccess { name } = &target.kind else {
                    continue;
                };
                if target.present(0).and_then(AstNode::identifier) != Some(receiver.as_str()) {
                    continue;
                }
                if class.attribute(name).is_some() {
                    continue;
                }
                let mut attribute = self.attribute(
                    name,
                    assignment,
                    &qualified,
                    &class_node.span,
                    file,
                    VariableRole::Attribute,
                    false,
                );
                if !single {
                    attribute.declaration.initializer = None;
                }
                attribute.declaring_operation = operation_name.clone();
                class.attributes.push(attribute);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attribute(
        &self,
        name: &str,
        assignment: &AstNode,
        class_name: &str,
        class_span: &Span,
        file: &FileContext,
        role: VariableRole,
        is_static: bool,
    ) -> Attribute {
        let scope = Scope::of_span(file.unit.clone(), class_span);
        let mut declaration = VariableDeclaration::new(name, role, scope, assignment.span);
        declaration.type_info = TypeInfo::from_node(assignment.present(1));
        declaration.initializer = assignment.present(2).map(render);
        Attribute {
            name: name.to_string(),
            type_info: declaration.type_info.clone(),
            class_name: class_name.to_string(),
            visibility: match file.language {
                SourceLanguage::Python => visibility_by_name(name),
                SourceLanguage::Java => Visibility::Package,
            },
            is_static,
            is_final: name.chars().all(|c| c.is_uppercase() || c == '_' || c.is_ascii_digit())
                && file.language == SourceLanguage::Python
                && role != VariableRole::EnumConstant
                && is_static,
            declaration,
            declaring_operation: None,
        }
    }

    fn build_operation(
        &self,
        node: &AstNode,
        class_name: &str,
        class_span: Span,
        placement: Placement,
        in_interface: bool,
        file: &FileContext,
    ) -> Option<Operation> {
        let NodeKind::MethodDeclaration(decl) = &node.kind else {
            return None;
        };
        let annotations: Vec<Annotation> = node.annotations().filter_map(annotation_of).collect();
        let has = |name: &str| annotations.iter().any(|a| a.simple_name() == name);

        let offset = receiver_offset(file.language, placement);
        let declared: Vec<&AstNode> = node.parameters().collect();
        let receiver = match file.language {
            SourceLanguage::Python if offset > 0 => declared.first().and_then(|p| match &p.kind {
                NodeKind::SingleVariableDeclaration { name, .. } => Some(name.as_str()),
                _ => None,
            }),
            SourceLanguage::Java if placement != Placement::Static => Some("this"),
            _ => None,
        };
        let parameters_nodes: Vec<&AstNode> = declared.iter().skip(offset).copied().collect();

        let scope = Scope::of_span(file.unit.clone(), &node.span);
        let mut parameters: Vec<Parameter> = parameters_nodes
            .iter()
            .filter_map(|p| {
                let role = match &p.kind {
                    NodeKind::SingleVariableDeclaration { kind, .. } => match kind {
                        ParameterKind::Regular => ParameterRole::In,
                        ParameterKind::VarArgs => ParameterRole::VarArgs,
                        ParameterKind::KwArgs => ParameterRole::KwArgs,
                    },
                    _ => return None,
                };
                VariableDeclaration::from_parameter(p, scope.clone())
                    .map(|declaration| Parameter { declaration, role })
            })
            .collect();
        let mut return_declaration =
            VariableDeclaration::new("return", VariableRole::Parameter, scope, node.span);
        return_declaration.type_info = TypeInfo::from_node(node.return_type());
        parameters.push(Parameter {
            declaration: return_declaration,
            role: ParameterRole::Return,
        });

        let has_body = node.body().is_some();
        let traits = OperationTraits {
            is_static: placement == Placement::Static,
            is_abstract: decl.modifiers.is_abstract
                || has("abstractmethod")
                || (in_interface && !has_body),
            is_constructor: decl.is_constructor
                || file.language.initializer_name() == Some(decl.name.as_str()),
            is_async: decl.is_async,
            is_final: decl.modifiers.is_final || has("final"),
            is_class_method: placement == Placement::ClassMethod,
        };
        let visibility = match file.language {
            SourceLanguage::Java if in_interface => {
                decl.modifiers.visibility.unwrap_or(Visibility::Public)
            }
            SourceLanguage::Java => decl.modifiers.visibility.unwrap_or(Visibility::Package),
            SourceLanguage::Python => visibility_by_name(&decl.name),
        };

        let mut comments = CommentCollector::default();
        node.accept(&mut comments);

        let context = NormalizeContext {
            language: file.language,
            file: file.unit.clone(),
            class_span,
            receiver,
            observer: self.observer,
        };
        let body = normalize_operation(node, &parameters_nodes, &context);

        Some(Operation {
            name: decl.name.clone(),
            class_name: class_name.to_string(),
            visibility,
            traits,
            parameters,
            annotations,
            comments: comments.0,
            span: node.span,
            source_file: file.path.clone(),
            body,
        })
    }
}

struct FileContext {
    path: String,
    language: SourceLanguage,
    unit: crate::ast::UnitRef,
    package: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_source;
    use crate::observe::NoopObserver;

    fn build(path: &str, source: &str) -> Model {
        let unit = parse_source(path, source).expect("parse");
        ModelBuilder::new(&NoopObserver).build(&unit)
    }

    #[test]
    fn test_receiver_offset_is_pure() {
        assert_eq!(receiver_offset(SourceLanguage::Python, Placement::Instance), 1);
        assert_eq!(receiver_offset(SourceLanguage::Python, Placement::ClassMethod), 1);
        assert_eq!(receiver_offset(SourceLanguage::Python, Placement::Static), 0);
        assert_eq!(receiver_offset(SourceLanguage::Python, Placement::Module), 0);
        assert_eq!(receiver_offset(SourceLanguage::Java, Placement::Instance), 0);
    }

    #[test]
    fn test_python_class_model() {
        let model = build(
            "shop/cart.py",
            r#"
class Cart(Base, Serializable):
    LIMIT = 10

    def __init__(self, owner, items=None):
        self.owner = owner
        if items:
            self.items = items
        else:
            self.items = []
        self.owner = None

    @staticmethod
    def empty():
        return Cart(None)

    def _total(self, tax: float) -> float:
        return sum(self.items) * tax
"#,
        );
        assert_eq!(model.classes.len(), 1);
        let cart = &model.classes[0];
        assert_eq!(cart.qualified_name(), "shop.cart.Cart");
        assert_eq!(cart.superclass.as_deref(), Some("Base"));
        assert_eq!(cart.generalizations.len(), 1);
        assert_eq!(cart.generalizations[0].parent, "Serializable");

        let names: Vec<_> = cart.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["LIMIT", "owner", "items"]);
        let owner = cart.attribute("owner").expect("owner");
        assert_eq!(owner.initializer(), Some("owner"));
        assert_eq!(owner.declaring_operation.as_deref(), Some("__init__"));
        assert!(cart.attribute("LIMIT").expect("LIMIT").is_static);

        let init = &cart.operations[0];
        assert!(init.traits.is_constructor);
        assert_eq!(init.parameter_names(), vec!["owner", "items"]);

        let empty = &cart.operations[1];
        assert!(empty.traits.is_static);
        assert_eq!(empty.arity(), 0);

        let total = &cart.operations[2];
        assert_eq!(total.visibility, Visibility::Protected);
        assert_eq!(total.signature(), "_total(tax : float) : float");
    }

    #[test]
    fn test_module_class_only_with_functions() {
        let with_functions = build("util.py", "import os\n\ndef helper(x):\n    return x\n");
        assert_eq!(with_functions.classes.len(), 1);
        assert!(with_functions.classes[0].traits.is_module);
        assert_eq!(with_functions.classes[0].name, "util");
        assert_eq!(with_functions.imports.len(), 1);

        let without = build("consts.py", "X = 1\n");
        assert!(without.classes.is_empty());
    }

    #[test]
    fn test_python_traits() {
        let model = build(
            "kinds.py",
            r#"
class Color(Enum):
    RED = 1

class Shape(ABC):
    @abstractmethod
    def area(self):
        pass

@dataclass
class Point:
    x: int
    y: int = 0
"#,
        );
        let color = &model.classes[0];
        assert!(color.traits.is_enum);
        assert_eq!(color.attributes[0].role(), VariableRole::EnumConstant);
        let shape = &model.classes[1];
        assert!(shape.traits.is_abstract);
        assert!(shape.operations[0].traits.is_abstract);
        let point = &model.classes[2];
        assert!(point.traits.is_record);
        assert!(point.attributes.iter().all(|a| !a.is_static));
    }

    #[test]
    fn test_java_class_model() {
        let model = build(
            "src/shop/Order.java",
            r#"
package shop;

public class Order extends Entity implements Comparable<Order>, Serializable {
    private static final int LIMIT = 5;
    private String id;

    public Order(String id) {
        this.id = id;
    }

    public int compareTo(Order other) {
        return id.compareTo(other.id);
    }

    static class Line {
        int qty;
    }
}
"#,
        );
        assert_eq!(model.classes.len(), 2);
        let order = &model.classes[0];
        assert_eq!(order.qualified_name(), "shop.Order");
        assert_eq!(order.superclass.as_deref(), Some("Entity"));
        assert_eq!(order.generalizations.len(), 2);
        assert_eq!(order.attributes.len(), 2);
        assert!(order.attribute("LIMIT").expect("LIMIT").is_static);
        assert!(order.operations[0].traits.is_constructor);
        assert_eq!(order.operations[1].parameter_types(), vec!["Order"]);
        assert_eq!(model.classes[1].qualified_name(), "shop.Order.Line");
    }
}
