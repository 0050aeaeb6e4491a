//! Thread-local compiled-regex cache.
//!
//! Every tracked field expands to sixteen patterns and the same fields are
//! matched again on every edit, so each worker thread keeps the compiled
//! regexes it has already built. The cap leaves room for a few hundred fields;
//! when full the cache is cleared and rebuilt on demand.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 8192;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled regex from cache, or compile and cache it.
///
/// Compile failures are returned to the caller and never cached.
pub fn get_or_compile_regex(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern)?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Number of cached regexes on this thread.
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}
