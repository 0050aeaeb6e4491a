use crate::config::version::parse_requirement;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Engine configuration, read from `field-tracker.toml`. Every section is
/// optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WorkersConfig {
    /// How long to wait for the latest response before giving up on it.
    pub timeout_ms: u64,
    pub fields_threads: usize,
    pub tokenizer_threads: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            fields_threads: 1,
            tokenizer_threads: 1,
        }
    }
}

impl WorkersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Grammar a specification is written for.
#[derive(Debug, Deserialize, serde::Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Provider {
    #[default]
    Vega,
    VegaLite,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Vega => write!(f, "vega"),
            Provider::VegaLite => write!(f, "vegaLite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateConfig {
    /// Provider written into exported templates.
    pub provider: Provider,
    /// Build version written into exported templates.
    pub build: String,
    /// Builds whose templates can be imported.
    pub supported: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            build: "1.8.0".to_string(),
            supported: ">=1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.workers.timeout_ms == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "workers.timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        for (field, threads) in [
            ("workers.fields_threads", self.workers.fields_threads),
            ("workers.tokenizer_threads", self.workers.tokenizer_threads),
        ] {
            if threads == 0 {
                issues.push(ValidationIssue::OutOfRange {
                    field,
                    message: "at least one thread is required".to_string(),
                });
            }
        }

        if self.template.build.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "template.build",
            });
        } else if let Err(e) = semver::Version::parse(self.template.build.trim()) {
            issues.push(ValidationIssue::InvalidVersion {
                field: "template.build",
                message: e.to_string(),
            });
        }
        if let Err(e) = parse_requirement(&self.template.supported) {
            issues.push(ValidationIssue::InvalidVersion {
                field: "template.supported",
                message: e.to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// TOML sections holding at least one issue, in first-seen order.
    pub fn sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        for issue in &self.issues {
            let section = issue.section();
            if !sections.contains(&section) {
                sections.push(section);
            }
        }
        sections
    }
}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    OutOfRange {
        field: &'static str,
        message: String,
    },
    InvalidVersion {
        field: &'static str,
        message: String,
    },
}

impl ValidationIssue {
    /// Dotted `section.key` the issue is about.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationIssue::MissingField { field }
            | ValidationIssue::OutOfRange { field, .. }
            | ValidationIssue::InvalidVersion { field, .. } => *field,
        }
    }

    pub fn section(&self) -> &'static str {
        let field = self.field();
        field.split_once('.').map_or(field, |(section, _)| section)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::OutOfRange { field, message } => {
                write!(f, "'{field}' {message}")
            }
            ValidationIssue::InvalidVersion { field, message } => {
                write!(f, "'{field}' is not a valid version: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers.timeout(), Duration::from_millis(2000));
        assert_eq!(config.template.provider.to_string(), "vega");
    }

    #[test]
    fn collects_every_issue() {
        let mut config = EngineConfig::default();
        config.workers.timeout_ms = 0;
        config.workers.tokenizer_threads = 0;
        config.template.build = "one".into();
        config.template.supported = ">=bad".into();

        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 4);
        assert_eq!(err.sections(), vec!["workers", "template"]);
        assert_eq!(err.issues[3].field(), "template.supported");
        let rendered = err.to_string();
        assert!(rendered.contains("workers.timeout_ms"));
        assert!(rendered.contains("template.supported"));
    }
}
