pub mod ast;
pub mod config;
pub mod diff;
pub mod errors;
pub mod fragment;
pub mod mapper;
pub mod model;
pub mod observe;
pub mod refactoring;
pub mod service;
pub mod source;

// Re-export commonly used types
pub use config::DiffConfig;
pub use errors::ServiceError;
pub use observe::{CollectingObserver, DiffObserver, NoopObserver, PipelineEvent, TracingObserver};
pub use refactoring::{DeltaKey, Refactoring, RuleId};
pub use service::{Detection, RefactoringDetector, SkippedFile};
pub use source::SourceSet;
