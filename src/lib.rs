//! Field Tracker: field-reference tracking and tokenization for JSON(C)
//! visualization specifications.
//!
//! A specification refers to dataset fields by name in many syntactic
//! contexts: JSON string values, `datum.X` and `datum['X']` accessors,
//! expression strings, format helper suffixes. This crate finds those
//! references, tracks which dataset fields a specification uses, and
//! rewrites them to positional placeholders (`__0__`, `__1__`, ...) and
//! back again.
//!
//! # Architecture
//!
//! - [`pattern`] builds the sixteen regex/template pairs per field name.
//! - [`tracking`] locates fields in a spec and reconciles tracking state.
//! - [`tokenizer`] rewrites a spec in either direction.
//! - [`store`] owns tracking state and enforces the remap lifecycle.
//! - [`worker`] runs the locator and tokenizer on background threads,
//!   delivering only the response to the latest request.
//! - [`template`] attaches and detaches the `usermeta` block.
//!
//! Text changes to JSON documents compile down to [`Edit`], a verified
//! byte-span replacement.
//!
//! # Example
//!
//! ```
//! use field_tracker::field::{Dataset, DatasetField};
//! use field_tracker::{locate_fields, tokenize_for_export};
//!
//! let dataset = Dataset::new(vec![DatasetField::new("Sales")]);
//! let spec = r#"{"encoding": {"y": {"field": "Sales"}}}"#;
//!
//! let located = locate_fields(spec, &dataset, &Default::default());
//! let result = tokenize_for_export(spec, &located.tracked_fields, &[]);
//! assert_eq!(result.spec, r#"{"encoding": {"y": {"field": "__0__"}}}"#);
//! ```

pub mod cache;
pub mod config;
pub mod edit;
pub mod field;
pub mod json;
pub mod pattern;
pub mod pool;
pub mod state;
pub mod store;
pub mod template;
pub mod tokenizer;
pub mod tracking;
pub mod worker;

// Re-exports
pub use config::{load_from_path, load_from_str, load_or_default, ConfigError, EngineConfig};
pub use edit::{Edit, EditError, EditVerification};
pub use state::{RemapState, TemplateExportProcessingState, TransitionError};
pub use store::{RemapStep, StoreError, TrackingStore};
pub use template::{
    export_template, import_template, ExportError, ImportedTemplate, TemplateDetails,
    TemplateError,
};
pub use tokenizer::{detokenize, tokenize, tokenize_for_export, TokenizeResult};
pub use tracking::{locate_fields, FieldLocator, LocatorResult, TrackedFields};
pub use worker::{Orchestrator, OrchestratorError, RemapOutcome};
