mod common;

use common::*;
use refactor_miner::{CollectingObserver, DiffConfig, PipelineEvent, RefactoringDetector, SourceSet};
use std::fs;
use std::sync::Arc;

fn load(dir: &tempfile::TempDir) -> SourceSet {
    let config = DiffConfig::default();
    SourceSet::from_directory(dir.path(), &config.include, config.max_file_size).unwrap()
}

#[tokio::test]
async fn test_detect_concurrent_over_directories() {
    let before_dir = write_snapshot(&[
        ("shop/invoice.py", INVOICE_BEFORE),
        ("shop/users.py", USER_BEFORE),
        ("README.md", "# shop"),
    ]);
    let after_dir = write_snapshot(&[
        ("shop/invoice.py", INVOICE_AFTER),
        ("shop/users.py", USER_AFTER),
        ("README.md", "# shop"),
    ]);
    let before = load(&before_dir);
    let after = load(&after_dir);
    assert_eq!(before.len(), 2);

    let detector = RefactoringDetector::default();
    let concurrent = detector.detect_concurrent(&before, &after).await;
    let sequential = RefactoringDetector::default().detect(&before, &after);

    assert_eq!(
        serde_json::to_string(concurrent.refactorings()).unwrap(),
        serde_json::to_string(sequential.refactorings()).unwrap()
    );
    assert_eq!(named(&concurrent, "Extract Attribute").len(), 1);
    assert_eq!(named(&concurrent, "Move Attribute").len(), 1);
}

#[tokio::test]
async fn test_unparsable_file_is_reported_not_fatal() {
    let after_calc = CALCULATOR.replace("def sum(self, x, y):", "def add(self, x, y):");
    let before = snapshot(&[("calc.py", CALCULATOR)]);
    let after = snapshot(&[("calc.py", after_calc.as_str()), ("broken.py", "def broken(:\n    pass\n")]);

    let observer = Arc::new(CollectingObserver::new());
    let detector = RefactoringDetector::default().with_observer(observer.clone());
    let detection = detector.detect_concurrent(&before, &after).await;

    assert_eq!(detection.skipped().len(), 1);
    assert_eq!(detection.skipped()[0].file, "broken.py");
    assert_eq!(named(&detection, "Rename Operation").len(), 1);
    assert!(
        observer
            .events()
            .iter()
            .any(|e| matches!(e, PipelineEvent::RefactoringDetected { .. }))
    );
}

#[tokio::test]
async fn test_unchanged_files_hit_the_model_cache() {
    let before = snapshot(&[("calc.py", CALCULATOR), ("users.py", USER_BEFORE)]);
    let after = snapshot(&[("calc.py", CALCULATOR), ("users.py", USER_AFTER)]);

    let detector = RefactoringDetector::default();
    detector.detect_concurrent(&before, &after).await;
    // calc.py is identical in both snapshots
    assert_eq!(detector.cache_stats().0, 3);

    detector.detect_concurrent(&before, &after).await;
    assert_eq!(detector.cache_stats().0, 3);
}

#[test]
fn test_config_discovered_from_parent_directory() {
    let temp_dir = write_snapshot(&[(
        "refminer.yml",
        "maxConcurrency: 2\noperationMappingThreshold: 0.8\nruleOrder:\n  - rename-operation\n  - class-rename-move\n",
    )]);
    let nested = temp_dir.path().join("project/src");
    fs::create_dir_all(&nested).unwrap();

    let config = DiffConfig::load(&nested).unwrap();
    assert_eq!(config.max_concurrency, 2);
    assert_eq!(config.operation_mapping_threshold, 0.8);
    assert_eq!(config.rule_order.len(), 2);
    assert_eq!(config.max_replacements, DiffConfig::default().max_replacements);
}

#[test]
fn test_invalid_threshold_is_rejected() {
    assert!(DiffConfig::from_yaml("classSimilarityThreshold: 1.5\n").is_err());
}
