use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with verification.
///
/// Splicing properties into a specification compiles down to this primitive,
/// so everything outside the span keeps its exact formatting and comments.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in text of length {text_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },

    #[error("Edit range [{byte_start}, {byte_end}) splits a UTF-8 character")]
    NotCharBoundary { byte_start: usize, byte_end: usize },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Edit {
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        let expected = expected_before.into();
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(&expected),
        }
    }

    fn validate(&self, text: &str) -> Result<(), EditError> {
        if self.byte_start > self.byte_end || self.byte_end > text.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                text_len: text.len(),
            });
        }
        if !text.is_char_boundary(self.byte_start) || !text.is_char_boundary(self.byte_end) {
            return Err(EditError::NotCharBoundary {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            });
        }

        let current = &text[self.byte_start..self.byte_end];
        if current != self.new_text && !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }
        Ok(())
    }

    /// Apply this edit to `text`, returning the new text.
    pub fn apply_to(&self, text: &str) -> Result<String, EditError> {
        self.validate(text)?;
        let mut out = String::with_capacity(text.len() + self.new_text.len());
        out.push_str(&text[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&text[self.byte_end..]);
        Ok(out)
    }
}

/// Write `content` to `path` unless it already holds exactly that text.
///
/// Returns whether the file changed.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool, EditError> {
    if let Ok(existing) = fs::read(path) {
        if existing == content.as_bytes() {
            return Ok(false);
        }
    }
    atomic_write(path, content.as_bytes())?;
    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;
    Ok(true)
}

/// Atomic file write: tempfile + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
