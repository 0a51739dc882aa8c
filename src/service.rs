//! # Detection Service
//!
//! Builds the models of two snapshots, diffs them and runs inference.
//! Per-file models are cached by content hash, so repeated detections over
//! mostly unchanged snapshots only rebuild what changed.

use crate::ast::parse_source;
use crate::config::DiffConfig;
use crate::diff::ModelDiff;
use crate::errors::ServiceError;
use crate::model::{Model, ModelBuilder};
use crate::observe::{DiffObserver, NoopObserver, PipelineEvent};
use crate::refactoring::{DeltaKey, InferenceEngine, Refactoring, RuleCatalog};
use crate::source::SourceSet;
use futures::stream::{self, StreamExt};
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// A file left out of its snapshot model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Outcome of comparing two snapshots
#[derive(Debug, Clone)]
pub struct Detection {
    before: Model,
    after: Model,
    refactorings: Vec<Refactoring>,
    unexplained: Vec<DeltaKey>,
    skipped: Vec<SkippedFile>,
}

impl Detection {
    pub fn before(&self) -> &Model {
        &self.before
    }

    pub fn after(&self) -> &Model {
        &self.after
    }

    /// In rule order
    pub fn refactorings(&self) -> &[Refactoring] {
        &self.refactorings
    }

    /// Removed or added classes, operations and attributes no refactoring
    /// explains
    pub fn unexplained(&self) -> &[DeltaKey] {
        &self.unexplained
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }
}

#[derive(Clone)]
pub struct RefactoringDetector {
    config: DiffConfig,
    observer: Arc<dyn DiffObserver>,
    engine: InferenceEngine,
    model_cache: Arc<Mutex<LruCache<String, Arc<Model>>>>,
}

impl Default for RefactoringDetector {
    fn default() -> Self {
        Self::new(DiffConfig::default())
    }
}

impl RefactoringDetector {
    pub fn new(config: DiffConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.model_cache_size)
            .unwrap_or(NonZeroUsize::new(1000).unwrap());
        let engine = InferenceEngine::new(RuleCatalog::with_order(&config.rule_order));
        Self {
            config,
            observer: Arc::new(NoopObserver),
            engine,
            model_cache: Arc::new(Mutex::new(LruCache::new(cache_size))),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DiffObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    fn cache_key(path: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update([0]);
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Model of a single file, from the cache when the same path and text
    /// were built before
    pub fn build_file(&self, path: &str, text: &str) -> Result<Arc<Model>, ServiceError> {
        let key = Self::cache_key(path, text);
        if let Ok(mut cache) = self.model_cache.lock()
            && let Some(model) = cache.get(&key)
        {
            self.observer.on_event(&PipelineEvent::CacheHit {
                file: path.to_string(),
            });
            return Ok(Arc::clone(model));
        }

        let unit = parse_source(path, text)?;
        let model = Arc::new(ModelBuilder::new(self.observer.as_ref()).build(&unit));
        self.observer.on_event(&PipelineEvent::FileParsed {
            file: path.to_string(),
            classes: model.classes.len(),
        });

        if let Ok(mut cache) = self.model_cache.lock() {
            cache.put(key, Arc::clone(&model));
        }
        Ok(model)
    }

    /// Merge per-file results in path order; failed files are skipped
    fn merge(
        &self,
        results: impl IntoIterator<Item = (String, Result<Arc<Model>, ServiceError>)>,
    ) -> (Model, Vec<SkippedFile>) {
        let mut model = Model::new();
        let mut skipped = Vec::new();
        for (path, result) in results {
            match result {
                Ok(file_model) => model.extend(file_model.as_ref().clone()),
                Err(e) => {
                    let reason = e.to_string();
                    self.observer.on_event(&PipelineEvent::FileSkipped {
                        file: path.clone(),
                        reason: reason.clone(),
                    });
                    skipped.push(SkippedFile { file: path, reason });
                }
            }
        }
        (model, skipped)
    }

    pub fn build_model(&self, sources: &SourceSet) -> (Model, Vec<SkippedFile>) {
        self.merge(
            sources
                .iter()
                .map(|(path, text)| (path.to_string(), self.build_file(path, text))),
        )
    }

    /// Same result as [`Self::build_model`], with files built on a bounded
    /// pool of blocking tasks
    pub async fn build_model_concurrent(&self, sources: &SourceSet) -> (Model, Vec<SkippedFile>) {
        let files: Vec<(usize, String, String)> = sources
            .iter()
            .enumerate()
            .map(|(i, (path, text))| (i, path.to_string(), text.to_string()))
            .collect();

        let mut results: Vec<(usize, String, Result<Arc<Model>, ServiceError>)> =
            stream::iter(files)
                .map(|(index, path, text)| {
                    let detector = self.clone();
                    async move {
                        let task_path = path.clone();
                        let result = tokio::task::spawn_blocking(move || {
                            detector.build_file(&task_path, &text)
                        })
                        .await
                        .unwrap_or_else(|e| {
                            Err(ServiceError::Internal(format!("Model build task failed: {e}")))
                        });
                        (index, path, result)
                    }
                })
                .buffer_unordered(self.config.max_concurrency.max(1))
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);
        self.merge(results.into_iter().map(|(_, path, result)| (path, result)))
    }

    fn infer(&self, before: Model, after: Model, skipped: Vec<SkippedFile>) -> Detection {
        let outcome = {
            let diff = ModelDiff::compute(&before, &after, &self.config, self.observer.as_ref());
            self.engine.run(&diff, &self.config, self.observer.as_ref())
        };
        tracing::debug!(
            "Detected {} refactorings, {} unexplained deltas",
            outcome.refactorings.len(),
            outcome.unexplained.len()
        );
        Detection {
            before,
            after,
            refactorings: outcome.refactorings,
            unexplained: outcome.unexplained,
            skipped,
        }
    }

    pub fn detect(&self, before: &SourceSet, after: &SourceSet) -> Detection {
        let (before_model, mut skipped) = self.build_model(before);
        let (after_model, after_skipped) = self.build_model(after);
        skipped.extend(after_skipped);
        self.infer(before_model, after_model, skipped)
    }

    pub async fn detect_concurrent(&self, before: &SourceSet, after: &SourceSet) -> Detection {
        let (before_model, mut skipped) = self.build_model_concurrent(before).await;
        let (after_model, after_skipped) = self.build_model_concurrent(after).await;
        skipped.extend(after_skipped);
        self.infer(before_model, after_model, skipped)
    }

    /// Cached file models and cache capacity
    pub fn cache_stats(&self) -> (usize, usize) {
        if let Ok(cache) = self.model_cache.lock() {
            (cache.len(), cache.cap().get())
        } else {
            (0, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::CollectingObserver;

    const CART: &str = r#"
class Cart:
    def __init__(self):
        self.items = []

    def add(self, item):
        self.items.append(item)
"#;

    #[test]
    fn test_build_file_uses_cache() {
        let observer = Arc::new(CollectingObserver::new());
        let detector = RefactoringDetector::default().with_observer(observer.clone());
        let first = detector.build_file("cart.py", CART).unwrap();
        let second = detector.build_file("cart.py", CART).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(detector.cache_stats().0, 1);
        assert!(
            observer
                .events()
                .iter()
                .any(|e| matches!(e, PipelineEvent::CacheHit { .. }))
        );
    }

    #[test]
    fn test_unparsable_file_is_skipped() {
        let sources = SourceSet::new()
            .with_file("cart.py", CART)
            .with_file("broken.py", "def broken(:\n    pass\n");
        let detector = RefactoringDetector::default();
        let (model, skipped) = detector.build_model(&sources);
        assert_eq!(model.classes.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].file, "broken.py");
    }

    #[test]
    fn test_unsupported_file_is_skipped() {
        let sources = SourceSet::new().with_file("notes.txt", "hello");
        let (model, skipped) = RefactoringDetector::default().build_model(&sources);
        assert!(model.classes.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_build_matches_sequential() {
        let sources = SourceSet::new()
            .with_file("b.py", CART.replace("Cart", "Basket"))
            .with_file("a.py", CART);
        let detector = RefactoringDetector::default();
        let (sequential, _) = detector.build_model(&sources);
        let (concurrent, _) = detector.build_model_concurrent(&sources).await;
        let names = |m: &Model| m.classes.iter().map(|c| c.qualified_name()).collect::<Vec<_>>();
        assert_eq!(names(&sequential), names(&concurrent));
        assert_eq!(names(&sequential), vec!["a.Cart", "b.Basket"]);
    }
}
