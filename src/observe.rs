//! # Pipeline Observability
//!
//! Structured events emitted by the builder, the service and the inference
//! engine. Components receive a `&dyn DiffObserver` instead of logging on
//! their own, so callers decide where events go.

use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    FileParsed {
        file: String,
        classes: usize,
    },
    /// A file failed to parse or to load and was left out of its snapshot
    FileSkipped {
        file: String,
        reason: String,
    },
    /// An unrecognized or absent statement inside an operation body
    NodeSkipped {
        file: String,
        line: usize,
        kind: String,
    },
    CacheHit {
        file: String,
    },
    ClassesMatched {
        before: String,
        after: String,
        score: f64,
    },
    RefactoringDetected {
        rule: String,
        description: String,
    },
}

pub trait DiffObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DiffObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiffObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::FileParsed { file, classes } => {
                tracing::debug!("Parsed {} ({} classes)", file, classes)
            }
            PipelineEvent::FileSkipped { file, reason } => {
                tracing::warn!("Skipping {}: {}", file, reason)
            }
            PipelineEvent::NodeSkipped { file, line, kind } => {
                tracing::warn!("Skipped {} statement at {}:{}", kind, file, line + 1)
            }
            PipelineEvent::CacheHit { file } => tracing::debug!("Model cache hit for {}", file),
            PipelineEvent::ClassesMatched {
                before,
                after,
                score,
            } => tracing::debug!("Matched class {} -> {} (score {:.2})", before, after, score),
            PipelineEvent::RefactoringDetected { rule, description } => {
                tracing::info!("[{}] {}", rule, description)
            }
        }
    }
}

/// Records events in memory, mostly for tests
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl DiffObserver for CollectingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_observer_keeps_order() {
        let observer = CollectingObserver::new();
        observer.on_event(&PipelineEvent::CacheHit {
            file: "a.py".to_string(),
        });
        observer.on_event(&PipelineEvent::FileSkipped {
            file: "b.py".to_string(),
            reason: "parse error".to_string(),
        });
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PipelineEvent::CacheHit { .. }));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(PipelineEvent::NodeSkipped {
            file: "a.py".to_string(),
            line: 3,
            kind: "print_statement".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], "node_skipped");
        assert_eq!(json["line"], 3);
    }
}
