//! Thread-local parser pooling.
//!
//! Each worker thread parses the specification on every request. Keeping one
//! parser per thread avoids re-creating it (and re-loading the grammar) on
//! every keystroke-driven run.

use crate::json::{JsonError, JsonParser};
use std::cell::RefCell;

thread_local! {
    static JSON_PARSER: RefCell<Option<JsonParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use field_tracker::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse_with_source(r#"{"mark": "bar"}"#).map(|p| p.has_errors())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, JsonError>
where
    F: FnOnce(&mut JsonParser) -> R,
{
    JSON_PARSER.with(|cell| {
        let mut opt = cell.borrow_mut();
        if opt.is_none() {
            *opt = Some(JsonParser::new()?);
        }
        Ok(f(opt.as_mut().expect("parser was just initialized above")))
    })
}
