//! Template build compatibility using semver constraints.
//!
//! Templates record the build that produced them; the importer accepts a
//! template when that build satisfies a requirement like ">=1.0.0, <2.0.0".

use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Parse a requirement; blank means any version.
pub fn parse_requirement(requirement: &str) -> Result<VersionReq, VersionError> {
    let trimmed = requirement.trim();
    if trimmed.is_empty() {
        return Ok(VersionReq::STAR);
    }
    VersionReq::parse(trimmed).map_err(|e| VersionError::InvalidRequirement {
        value: trimmed.to_string(),
        source: e.to_string(),
    })
}

/// Check whether a template `build` satisfies `requirement`.
///
/// # Examples
///
/// ```
/// use field_tracker::config::version::is_supported_build;
///
/// assert!(is_supported_build("1.8.0", ">=1.0.0").unwrap());
/// assert!(!is_supported_build("0.9.2", ">=1.0.0").unwrap());
/// assert!(is_supported_build("0.1.0", "").unwrap());
/// ```
pub fn is_supported_build(build: &str, requirement: &str) -> Result<bool, VersionError> {
    let req = parse_requirement(requirement)?;
    let version = Version::parse(build.trim()).map_err(|e| VersionError::InvalidVersion {
        value: build.to_string(),
        source: e.to_string(),
    })?;
    Ok(req.matches(&version))
}
