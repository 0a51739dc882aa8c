//! # Refactoring Inference
//!
//! Turns a [`crate::diff::ModelDiff`] into typed refactoring records. Rules
//! are plain function pairs kept in an ordered [`RuleCatalog`]; the
//! [`InferenceEngine`] runs them and tracks which structural deltas each
//! detected refactoring explains.

pub mod catalog;
pub mod engine;
pub mod rules;
pub mod types;

pub use catalog::RuleCatalog;
pub use engine::{DeltaKey, InferenceEngine, InferenceOutcome, RuleId};
pub use types::{AnnotationRef, AttributeRef, ClassRef, OperationRef, Refactoring, VariableRef};
