pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{load_from_path, load_from_str, load_or_default, ConfigError, ConfigOrigin};
pub use schema::{
    EngineConfig, LogConfig, Provider, TemplateConfig, ValidationError, ValidationIssue,
    WorkersConfig,
};
pub use version::{is_supported_build, parse_requirement, VersionError};
