//! The `usermeta` block carried by exported templates.

use crate::config::Provider;
use crate::tracking::TemplateFieldMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level property name of the block inside the specification.
pub const USERMETA_KEY: &str = "usermeta";

/// Revision of the usermeta layout written by this crate.
pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usermeta {
    pub deneb: DenebMetadata,
    pub information: TemplateInformation,
    /// One entry per placeholder, ordered by placeholder.
    #[serde(default)]
    pub dataset: Vec<TemplateFieldMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenebMetadata {
    /// Build that produced the template.
    pub build: String,
    #[serde(default = "default_meta_version")]
    pub meta_version: u32,
    #[serde(default)]
    pub provider: Provider,
}

fn default_meta_version() -> u32 {
    META_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInformation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    pub uuid: Uuid,
    pub generated: DateTime<Utc>,
}

/// What the user supplies when exporting; identity and timestamp are
/// generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDetails {
    pub name: String,
    pub description: String,
    pub author: String,
}

impl TemplateInformation {
    pub fn generate(details: &TemplateDetails) -> Self {
        Self {
            name: details.name.clone(),
            description: details.description.clone(),
            author: details.author.clone(),
            uuid: Uuid::new_v4(),
            generated: Utc::now(),
        }
    }
}
