mod common;

use common::*;
use refactor_miner::{DeltaKey, DiffConfig, Refactoring, RefactoringDetector, RuleId};

#[test]
fn test_identical_snapshots_have_no_refactorings() {
    let files = [("calc.py", CALCULATOR), ("users.py", USER_BEFORE)];
    let detection = detect(&files, &files);
    assert!(detection.refactorings().is_empty());
    assert!(detection.unexplained().is_empty());
    assert!(detection.skipped().is_empty());
}

#[test]
fn test_rename_operation() {
    let after = CALCULATOR.replace("def sum(self, x, y):", "def add(self, x, y):");
    let detection = detect(&[("calc.py", CALCULATOR)], &[("calc.py", after.as_str())]);

    assert_eq!(detection.refactorings().len(), 1);
    match &detection.refactorings()[0] {
        Refactoring::RenameOperation { before, after } => {
            assert_eq!(before.name, "sum");
            assert_eq!(after.name, "add");
            assert_eq!(before.class_name, after.class_name);
        }
        other => panic!("unexpected refactoring: {other}"),
    }
    assert!(detection.unexplained().is_empty());
}

#[test]
fn test_move_attribute_between_classes() {
    let detection = detect(&[("users.py", USER_BEFORE)], &[("users.py", USER_AFTER)]);

    let moves = named(&detection, "Move Attribute");
    assert_eq!(moves.len(), 1);
    let Refactoring::MoveAttribute { before, after } = moves[0] else {
        panic!("expected a Move Attribute record");
    };
    assert_eq!(before.name, "email");
    assert!(before.class_name.ends_with("User"));
    assert!(after.class_name.ends_with("Profile"));
    assert!(!detection.unexplained().iter().any(|d| matches!(
        d,
        DeltaKey::RemovedAttribute { .. } | DeltaKey::AddedAttribute { .. }
    )));
}

#[test]
fn test_extract_attribute_from_duplicated_locals() {
    let detection = detect(
        &[("invoice.py", INVOICE_BEFORE)],
        &[("invoice.py", INVOICE_AFTER)],
    );

    let extracted = named(&detection, "Extract Attribute");
    assert_eq!(extracted.len(), 1);
    let Refactoring::ExtractAttribute {
        attribute,
        variables,
    } = extracted[0]
    else {
        panic!("expected an Extract Attribute record");
    };
    assert_eq!(attribute.name, "tax_rate");
    assert_eq!(variables.len(), 2);
    assert!(variables.iter().all(|v| v.name == "tax_rate"));
    assert!(named(&detection, "Replace Variable With Attribute").is_empty());
}

#[test]
fn test_rename_class() {
    let after = CALCULATOR.replace("class Calculator:", "class Adder:");
    let detection = detect(&[("calc.py", CALCULATOR)], &[("calc.py", after.as_str())]);

    let renames = named(&detection, "Rename Class");
    assert_eq!(renames.len(), 1);
    assert!(renames[0].to_string().contains("Adder"));
    assert!(detection.unexplained().is_empty());
}

#[test]
fn test_removed_operation_is_unexplained() {
    let after = CALCULATOR.replace(
        "\n    def clear(self):\n        self.memory = 0\n",
        "\n",
    );
    let detection = detect(&[("calc.py", CALCULATOR)], &[("calc.py", after.as_str())]);

    assert!(detection.refactorings().is_empty());
    assert_eq!(detection.unexplained().len(), 1);
    assert!(matches!(
        &detection.unexplained()[0],
        DeltaKey::RemovedOperation { operation } if operation.name == "clear"
    ));
}

#[test]
fn test_detection_is_deterministic() {
    let detector = RefactoringDetector::default();
    let before = snapshot(&[("users.py", USER_BEFORE), ("invoice.py", INVOICE_BEFORE)]);
    let after = snapshot(&[("users.py", USER_AFTER), ("invoice.py", INVOICE_AFTER)]);

    let first = detector.detect(&before, &after);
    let second = RefactoringDetector::default().detect(&before, &after);
    assert_eq!(
        serde_json::to_string(first.refactorings()).unwrap(),
        serde_json::to_string(second.refactorings()).unwrap()
    );
    assert_eq!(first.unexplained(), second.unexplained());
}

#[test]
fn test_disabled_rule_leaves_delta_unexplained() {
    let config = DiffConfig {
        rule_order: RuleId::DEFAULT_ORDER
            .into_iter()
            .filter(|id| *id != RuleId::RenameOperation)
            .collect(),
        ..DiffConfig::default()
    };
    let after = CALCULATOR.replace("def sum(self, x, y):", "def add(self, x, y):");
    let detection = RefactoringDetector::new(config).detect(
        &snapshot(&[("calc.py", CALCULATOR)]),
        &snapshot(&[("calc.py", after.as_str())]),
    );

    assert!(named(&detection, "Rename Operation").is_empty());
    assert_eq!(detection.unexplained().len(), 2);
}

#[test]
fn test_extract_and_inline_operation() {
    let detection = detect(&[("report.py", REPORT_BEFORE)], &[("report.py", REPORT_AFTER)]);
    let extractions = named(&detection, "Extract Operation");
    assert_eq!(extractions.len(), 1);
    let Refactoring::ExtractOperation {
        extracted,
        source_before,
        ..
    } = extractions[0]
    else {
        panic!("expected an Extract Operation record");
    };
    assert_eq!(extracted.name, "append_rows");
    assert_eq!(source_before.name, "render");
    assert!(detection.unexplained().is_empty());

    let detection = detect(&[("report.py", REPORT_AFTER)], &[("report.py", REPORT_BEFORE)]);
    let inlinings = named(&detection, "Inline Operation");
    assert_eq!(inlinings.len(), 1);
    assert!(matches!(
        inlinings[0],
        Refactoring::InlineOperation { inlined, .. } if inlined.name == "append_rows"
    ));
    assert!(detection.unexplained().is_empty());
}

#[test]
fn test_move_operation_to_unrelated_class() {
    let detection = detect(&[("orders.py", ORDER_BEFORE)], &[("orders.py", ORDER_AFTER)]);
    let moves = named(&detection, "Move Operation");
    assert_eq!(moves.len(), 1);
    let Refactoring::MoveOperation { before, after } = moves[0] else {
        panic!("expected a Move Operation record");
    };
    assert_eq!(before.name, "describe");
    assert!(before.class_name.ends_with("Order"));
    assert!(after.class_name.ends_with("Formatter"));
    assert!(detection.unexplained().is_empty());
}

#[test]
fn test_pull_up_operation_and_push_down_attribute() {
    let detection = detect(&[("shapes.py", SHAPES_BEFORE)], &[("shapes.py", SHAPES_AFTER)]);

    let pulled = named(&detection, "Pull Up Operation");
    assert_eq!(pulled.len(), 1);
    let Refactoring::PullUpOperation { before, after } = pulled[0] else {
        panic!("expected a Pull Up Operation record");
    };
    assert_eq!(before.name, "label");
    assert!(before.class_name.ends_with("Circle"));
    assert!(after.class_name.ends_with("Shape"));

    let pushed = named(&detection, "Push Down Attribute");
    assert_eq!(pushed.len(), 1);
    let Refactoring::PushDownAttribute { before, after } = pushed[0] else {
        panic!("expected a Push Down Attribute record");
    };
    assert_eq!(before.name, "radius");
    assert!(after.class_name.ends_with("Circle"));

    // Hierarchy moves are not reported as plain moves
    assert!(named(&detection, "Move Attribute").is_empty());
    assert!(named(&detection, "Move Operation").is_empty());
    assert!(detection.unexplained().is_empty());
}

#[test]
fn test_class_and_method_annotation_changes() {
    let detection = detect(
        &[("repository.py", REPOSITORY_BEFORE)],
        &[("repository.py", REPOSITORY_AFTER)],
    );

    let added = named(&detection, "Add Class Annotation");
    assert_eq!(added.len(), 1);
    assert!(matches!(
        added[0],
        Refactoring::AddClassAnnotation { annotation, .. } if annotation.name == "register"
    ));
    let modified = named(&detection, "Modify Method Annotation");
    assert_eq!(modified.len(), 1);
    assert!(matches!(
        modified[0],
        Refactoring::ModifyMethodAnnotation { operation, .. } if operation.name == "find"
    ));
    let removed = named(&detection, "Remove Method Annotation");
    assert_eq!(removed.len(), 1);
    assert!(matches!(
        removed[0],
        Refactoring::RemoveMethodAnnotation { annotation, .. } if annotation.name == "deprecated"
    ));
    assert_eq!(detection.refactorings().len(), 3);
}

#[test]
fn test_extract_variable_and_renames() {
    let detection = detect(&[("pricing.py", PRICING_BEFORE)], &[("pricing.py", PRICING_AFTER)]);

    let extracted = named(&detection, "Extract Variable");
    assert_eq!(extracted.len(), 1);
    let Refactoring::ExtractVariable {
        variable,
        expression,
    } = extracted[0]
    else {
        panic!("expected an Extract Variable record");
    };
    assert_eq!(variable.name, "subtotal");
    assert_eq!(expression, "price * qty");

    let renamed = named(&detection, "Rename Variable");
    assert_eq!(renamed.len(), 1);
    assert!(matches!(
        renamed[0],
        Refactoring::RenameVariable { before, after } if before.name == "amount" && after.name == "result"
    ));
    let renamed = named(&detection, "Rename Parameter");
    assert_eq!(renamed.len(), 1);
    assert!(matches!(
        renamed[0],
        Refactoring::RenameParameter { before, after } if before.name == "qty" && after.name == "count"
    ));
    assert!(named(&detection, "Add Parameter").is_empty());
    assert!(named(&detection, "Remove Parameter").is_empty());
}

#[test]
fn test_inline_variable() {
    let detection = detect(&[("pricing.py", PRICING_AFTER)], &[("pricing.py", PRICING_BEFORE)]);

    let inlined = named(&detection, "Inline Variable");
    assert_eq!(inlined.len(), 1);
    let Refactoring::InlineVariable {
        variable,
        expression,
    } = inlined[0]
    else {
        panic!("expected an Inline Variable record");
    };
    assert_eq!(variable.name, "subtotal");
    assert_eq!(expression, "price * qty");
    assert!(named(&detection, "Extract Variable").is_empty());
}

#[test]
fn test_merge_parameters() {
    let detection = detect(&[("client.py", CLIENT_BEFORE)], &[("client.py", CLIENT_AFTER)]);

    let merged = named(&detection, "Merge Parameter");
    assert_eq!(merged.len(), 1);
    let Refactoring::MergeParameter { before, after } = merged[0] else {
        panic!("expected a Merge Parameter record");
    };
    let names: Vec<&str> = before.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["host", "port"]);
    assert_eq!(after.name, "endpoint");
    // The merged parameters are not also reported one by one
    assert!(named(&detection, "Remove Parameter").is_empty());
    assert!(named(&detection, "Add Parameter").is_empty());
}

#[test]
fn test_parameterize_variable_and_parameter_changes() {
    let detection = detect(&[("canvas.py", CANVAS_BEFORE)], &[("canvas.py", CANVAS_AFTER)]);

    let parameterized = named(&detection, "Parameterize Variable");
    assert_eq!(parameterized.len(), 1);
    let Refactoring::ParameterizeVariable {
        variable,
        parameter,
    } = parameterized[0]
    else {
        panic!("expected a Parameterize Variable record");
    };
    assert_eq!(variable.name, "height");
    assert_eq!(parameter.name, "height");

    let added = named(&detection, "Add Parameter");
    assert_eq!(added.len(), 1);
    assert!(matches!(
        added[0],
        Refactoring::AddParameter { parameter, after, .. } if parameter.name == "anchor" && after.name == "resize"
    ));
    let removed = named(&detection, "Remove Parameter");
    assert_eq!(removed.len(), 1);
    assert!(matches!(
        removed[0],
        Refactoring::RemoveParameter { parameter, before, .. } if parameter.name == "force" && before.name == "reset"
    ));
    assert_eq!(detection.refactorings().len(), 3);
}

#[test]
fn test_earlier_rule_claims_shared_locals() {
    let mut rule_order: Vec<RuleId> = RuleId::DEFAULT_ORDER
        .into_iter()
        .filter(|id| *id != RuleId::ReplaceVariableWithAttribute)
        .collect();
    let extract = rule_order
        .iter()
        .position(|id| *id == RuleId::ExtractAttribute)
        .unwrap();
    rule_order.insert(extract, RuleId::ReplaceVariableWithAttribute);
    let config = DiffConfig {
        rule_order,
        ..DiffConfig::default()
    };
    let detection = RefactoringDetector::new(config).detect(
        &snapshot(&[("invoice.py", INVOICE_BEFORE)]),
        &snapshot(&[("invoice.py", INVOICE_AFTER)]),
    );

    // Each local is claimed on its own, so the attribute extraction that
    // needs both of them never fires
    assert_eq!(named(&detection, "Replace Variable With Attribute").len(), 2);
    assert!(named(&detection, "Extract Attribute").is_empty());
    assert!(detection.unexplained().iter().any(|d| matches!(
        d,
        DeltaKey::AddedAttribute { name, .. } if name == "tax_rate"
    )));
}
