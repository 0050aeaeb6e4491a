//! Template export and import.
//!
//! A template is a tokenized specification carrying a top-level `usermeta`
//! property that describes each placeholder, so the template can later be
//! bound to a different dataset.

pub mod errors;
pub mod export;
pub mod import;
pub mod usermeta;

pub use errors::{ExportError, TemplateError};
pub use export::{build_usermeta, export_template, finish_export, insert_usermeta};
pub use import::{extract_usermeta, import_template, ImportedTemplate};
pub use usermeta::{
    DenebMetadata, TemplateDetails, TemplateInformation, Usermeta, META_VERSION, USERMETA_KEY,
};
