use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("failed to set JSON language for parser")]
    LanguageSet,

    #[error("failed to parse specification")]
    ParseFailed,

    #[error("syntax error detected at byte {byte_start}..{byte_end}")]
    SyntaxError { byte_start: usize, byte_end: usize },

    #[error("multiple syntax errors detected: {count} ERROR nodes")]
    MultipleSyntaxErrors { count: usize },

    #[error("specification root is not an object")]
    RootNotObject,

    #[error("property '{key}' not found at top level")]
    PropertyNotFound { key: String },
}
