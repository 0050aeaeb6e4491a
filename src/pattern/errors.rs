use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid pattern for '{field}': {message}")]
    Compile {
        field: String,
        pattern: String,
        message: String,
    },
}

impl PatternError {
    /// The field (or search key) the failing pattern was built for.
    pub fn field(&self) -> &str {
        match self {
            PatternError::Compile { field, .. } => field,
        }
    }
}
