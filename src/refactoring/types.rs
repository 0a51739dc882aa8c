//! # Refactoring Records
//!
//! The typed output of inference. Records refer to model entities through
//! small key structs so they can outlive the models and serialize cleanly.

use crate::model::variable::VariableDeclaration;
use crate::model::{Annotation, Attribute, ModelClass, Operation};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassRef {
    /// Qualified name
    pub name: String,
    pub file: String,
}

impl ClassRef {
    pub fn of(class: &ModelClass) -> Self {
        Self {
            name: class.qualified_name(),
            file: class.source_file.clone(),
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationRef {
    pub class_name: String,
    pub name: String,
    pub signature: String,
    pub file: String,
    /// 1-based
    pub line: usize,
}

impl OperationRef {
    pub fn of(operation: &Operation) -> Self {
        Self {
            class_name: operation.class_name.clone(),
            name: operation.name.clone(),
            signature: operation.signature(),
            file: operation.source_file.clone(),
            line: operation.span.start_line + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeRef {
    pub class_name: String,
    pub name: String,
    pub type_name: String,
}

impl AttributeRef {
    pub fn of(attribute: &Attribute) -> Self {
        Self {
            class_name: attribute.class_name.clone(),
            name: attribute.name.clone(),
            type_name: attribute.type_info.to_string(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name, self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariableRef {
    pub name: String,
    pub type_name: String,
    /// Qualified name of the declaring operation
    pub operation: String,
    /// 1-based
    pub line: usize,
}

impl VariableRef {
    pub fn of(operation: &Operation, declaration: &VariableDeclaration) -> Self {
        Self {
            name: declaration.name.clone(),
            type_name: declaration.type_info.to_string(),
            operation: operation.qualified_name(),
            line: declaration.span.start_line + 1,
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name, self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationRef {
    pub name: String,
    pub text: String,
}

impl AnnotationRef {
    pub fn of(annotation: &Annotation) -> Self {
        Self {
            name: annotation.name.clone(),
            text: annotation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Refactoring {
    RenameClass {
        before: ClassRef,
        after: ClassRef,
    },
    MoveClass {
        before: ClassRef,
        after: ClassRef,
    },
    MoveAndRenameClass {
        before: ClassRef,
        after: ClassRef,
    },
    RenameOperation {
        before: OperationRef,
        after: OperationRef,
    },
    ExtractOperation {
        extracted: OperationRef,
        source_before: OperationRef,
        source_after: OperationRef,
    },
    InlineOperation {
        inlined: OperationRef,
        target_before: OperationRef,
        target_after: OperationRef,
    },
    MoveAttribute {
        before: AttributeRef,
        after: AttributeRef,
    },
    RenameAttribute {
        before: AttributeRef,
        after: AttributeRef,
    },
    MoveAndRenameAttribute {
        before: AttributeRef,
        after: AttributeRef,
    },
    ExtractAttribute {
        attribute: AttributeRef,
        variables: Vec<VariableRef>,
    },
    ReplaceVariableWithAttribute {
        variable: VariableRef,
        attribute: AttributeRef,
    },
    ExtractVariable {
        variable: VariableRef,
        expression: String,
    },
    InlineVariable {
        variable: VariableRef,
        expression: String,
    },
    RenameVariable {
        before: VariableRef,
        after: VariableRef,
    },
    RenameParameter {
        before: VariableRef,
        after: VariableRef,
    },
    MergeAttribute {
        before: Vec<AttributeRef>,
        after: AttributeRef,
    },
    SplitAttribute {
        before: AttributeRef,
        after: Vec<AttributeRef>,
    },
    MergeParameter {
        before: Vec<VariableRef>,
        after: VariableRef,
    },
    SplitParameter {
        before: VariableRef,
        after: Vec<VariableRef>,
    },
    MergeVariable {
        before: Vec<VariableRef>,
        after: VariableRef,
    },
    SplitVariable {
        before: VariableRef,
        after: Vec<VariableRef>,
    },
    PullUpAttribute {
        before: AttributeRef,
        after: AttributeRef,
    },
    PushDownAttribute {
        before: AttributeRef,
        after: AttributeRef,
    },
    PullUpOperation {
        before: OperationRef,
        after: OperationRef,
    },
    PushDownOperation {
        before: OperationRef,
        after: OperationRef,
    },
    MoveOperation {
        before: OperationRef,
        after: OperationRef,
    },
    MoveAndRenameOperation {
        before: OperationRef,
        after: OperationRef,
    },
    AddClassAnnotation {
        class: ClassRef,
        annotation: AnnotationRef,
    },
    RemoveClassAnnotation {
        class: ClassRef,
        annotation: AnnotationRef,
    },
    ModifyClassAnnotation {
        class: ClassRef,
        before: AnnotationRef,
        after: AnnotationRef,
    },
    AddMethodAnnotation {
        operation: OperationRef,
        annotation: AnnotationRef,
    },
    RemoveMethodAnnotation {
        operation: OperationRef,
        annotation: AnnotationRef,
    },
    ModifyMethodAnnotation {
        operation: OperationRef,
        before: AnnotationRef,
        after: AnnotationRef,
    },
    ParameterizeVariable {
        variable: VariableRef,
        parameter: VariableRef,
    },
    AddParameter {
        parameter: VariableRef,
        before: OperationRef,
        after: OperationRef,
    },
    RemoveParameter {
        parameter: VariableRef,
        before: OperationRef,
        after: OperationRef,
    },
}

impl Refactoring {
    /// Human-readable kind, e.g. `Rename Operation`
    pub fn name(&self) -> &'static str {
        match self {
            Self::RenameClass { .. } => "Rename Class",
            Self::MoveClass { .. } => "Move Class",
            Self::MoveAndRenameClass { .. } => "Move And Rename Class",
            Self::RenameOperation { .. } => "Rename Operation",
            Self::ExtractOperation { .. } => "Extract Operation",
            Self::InlineOperation { .. } => "Inline Operation",
            Self::MoveAttribute { .. } => "Move Attribute",
            Self::RenameAttribute { .. } => "Rename Attribute",
            Self::MoveAndRenameAttribute { .. } => "Move And Rename Attribute",
            Self::ExtractAttribute { .. } => "Extract Attribute",
            Self::ReplaceVariableWithAttribute { .. } => "Replace Variable With Attribute",
            Self::ExtractVariable { .. } => "Extract Variable",
            Self::InlineVariable { .. } => "Inline Variable",
            Self::RenameVariable { .. } => "Rename Variable",
            Self::RenameParameter { .. } => "Rename Parameter",
            Self::MergeAttribute { .. } => "Merge Attribute",
            Self::SplitAttribute { .. } => "Split Attribute",
            Self::MergeParameter { .. } => "Merge Parameter",
            Self::SplitParameter { .. } => "Split Parameter",
            Self::MergeVariable { .. } => "Merge Variable",
            Self::SplitVariable { .. } => "Split Variable",
            Self::PullUpAttribute { .. } => "Pull Up Attribute",
            Self::PushDownAttribute { .. } => "Push Down Attribute",
            Self::PullUpOperation { .. } => "Pull Up Operation",
            Self::PushDownOperation { .. } => "Push Down Operation",
            Self::MoveOperation { .. } => "Move Operation",
            Self::MoveAndRenameOperation { .. } => "Move And Rename Operation",
            Self::AddClassAnnotation { .. } => "Add Class Annotation",
            Self::RemoveClassAnnotation { .. } => "Remove Class Annotation",
            Self::ModifyClassAnnotation { .. } => "Modify Class Annotation",
            Self::AddMethodAnnotation { .. } => "Add Method Annotation",
            Self::RemoveMethodAnnotation { .. } => "Remove Method Annotation",
            Self::ModifyMethodAnnotation { .. } => "Modify Method Annotation",
            Self::ParameterizeVariable { .. } => "Parameterize Variable",
            Self::AddParameter { .. } => "Add Parameter",
            Self::RemoveParameter { .. } => "Remove Parameter",
        }
    }

    /// Whether the record pairs a before operation with an after operation
    /// that the differ left unmatched
    pub fn matches_operations(&self) -> bool {
        matches!(
            self,
            Self::RenameOperation { .. }
                | Self::MoveOperation { .. }
                | Self::MoveAndRenameOperation { .. }
                | Self::PullUpOperation { .. }
                | Self::PushDownOperation { .. }
        )
    }
}

fn names(items: &[impl fmt::Display]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Refactoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.name();
        match self {
            Self::RenameClass { before, after }
            | Self::MoveClass { before, after }
            | Self::MoveAndRenameClass { before, after } => {
                write!(f, "{kind} {} moved/renamed to {}", before.name, after.name)
            }
            Self::RenameOperation { before, after } => write!(
                f,
                "{kind} {} renamed to {} in class {}",
                before.signature, after.signature, after.class_name
            ),
            Self::ExtractOperation {
                extracted,
                source_before,
                ..
            } => write!(
                f,
                "{kind} {} extracted from {} in class {}",
                extracted.signature, source_before.signature, source_before.class_name
            ),
            Self::InlineOperation {
                inlined,
                target_after,
                ..
            } => write!(
                f,
                "{kind} {} inlined to {} in class {}",
                inlined.signature, target_after.signature, target_after.class_name
            ),
            Self::MoveAttribute { before, after }
            | Self::MoveAndRenameAttribute { before, after }
            | Self::PullUpAttribute { before, after }
            | Self::PushDownAttribute { before, after } => write!(
                f,
                "{kind} {before} from class {} to {after} from class {}",
                before.class_name, after.class_name
            ),
            Self::RenameAttribute { before, after } => write!(
                f,
                "{kind} {} to {} in class {}",
                before.name, after.name, after.class_name
            ),
            Self::ExtractAttribute {
                attribute,
                variables,
            } => write!(
                f,
                "{kind} {attribute} in class {} from {}",
                attribute.class_name,
                variables
                    .iter()
                    .map(|v| v.operation.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::ReplaceVariableWithAttribute {
                variable,
                attribute,
            } => write!(
                f,
                "{kind} {variable} to {attribute} in method {}",
                variable.operation
            ),
            Self::ExtractVariable {
                variable,
                expression,
            }
            | Self::InlineVariable {
                variable,
                expression,
            } => write!(
                f,
                "{kind} {variable} = {expression} in method {}",
                variable.operation
            ),
            Self::RenameVariable { before, after } | Self::RenameParameter { before, after } => {
                write!(f, "{kind} {before} to {after} in method {}", after.operation)
            }
            Self::MergeAttribute { before, after } => write!(
                f,
                "{kind} [{}] to {after} in class {}",
                names(before),
                after.class_name
            ),
            Self::SplitAttribute { before, after } => write!(
                f,
                "{kind} {before} to [{}] in class {}",
                names(after),
                before.class_name
            ),
            Self::MergeParameter { before, after } | Self::MergeVariable { before, after } => {
                write!(
                    f,
                    "{kind} [{}] to {after} in method {}",
                    names(before),
                    after.operation
                )
            }
            Self::SplitParameter { before, after } | Self::SplitVariable { before, after } => {
                write!(
                    f,
                    "{kind} {before} to [{}] in method {}",
                    names(after),
                    before.operation
                )
            }
            Self::PullUpOperation { before, after }
            | Self::PushDownOperation { before, after }
            | Self::MoveOperation { before, after }
            | Self::MoveAndRenameOperation { before, after } => write!(
                f,
                "{kind} {} from class {} to {} from class {}",
                before.signature, before.class_name, after.signature, after.class_name
            ),
            Self::AddClassAnnotation { class, annotation }
            | Self::RemoveClassAnnotation { class, annotation } => {
                write!(f, "{kind} {} in class {}", annotation.text, class.name)
            }
            Self::ModifyClassAnnotation {
                class,
                before,
                after,
            } => write!(
                f,
                "{kind} {} to {} in class {}",
                before.text, after.text, class.name
            ),
            Self::AddMethodAnnotation {
                operation,
                annotation,
            }
            | Self::RemoveMethodAnnotation {
                operation,
                annotation,
            } => write!(
                f,
                "{kind} {} in method {} from class {}",
                annotation.text, operation.signature, operation.class_name
            ),
            Self::ModifyMethodAnnotation {
                operation,
                before,
                after,
            } => write!(
                f,
                "{kind} {} to {} in method {} from class {}",
                before.text, after.text, operation.signature, operation.class_name
            ),
            Self::ParameterizeVariable {
                variable,
                parameter,
            } => write!(
                f,
                "{kind} {variable} to {parameter} in method {}",
                parameter.operation
            ),
            Self::AddParameter {
                parameter, after, ..
            } => write!(
                f,
                "{kind} {parameter} in method {} from class {}",
                after.signature, after.class_name
            ),
            Self::RemoveParameter {
                parameter, before, ..
            } => write!(
                f,
                "{kind} {parameter} in method {} from class {}",
                before.signature, before.class_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(name: &str) -> OperationRef {
        OperationRef {
            class_name: "shop.Calculator".to_string(),
            name: name.to_string(),
            signature: format!("{name}(x, y)"),
            file: "shop.py".to_string(),
            line: 3,
        }
    }

    #[test]
    fn test_description() {
        let refactoring = Refactoring::RenameOperation {
            before: operation("sum"),
            after: operation("add"),
        };
        assert_eq!(
            refactoring.to_string(),
            "Rename Operation sum(x, y) renamed to add(x, y) in class shop.Calculator"
        );
        assert!(refactoring.matches_operations());
    }

    #[test]
    fn test_serialized_with_type_tag() {
        let refactoring = Refactoring::RenameOperation {
            before: operation("sum"),
            after: operation("add"),
        };
        let json = serde_json::to_value(&refactoring).unwrap();
        assert_eq!(json["type"], "rename_operation");
        assert_eq!(json["after"]["name"], "add");
    }
}
