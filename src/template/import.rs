//! Template import: detach `usermeta` and seed tracking from it.

use crate::config::{is_supported_build, TemplateConfig};
use crate::edit::Edit;
use crate::field::is_placeholder;
use crate::json::{remove_property_edit, top_level_property};
use crate::pool::with_parser;
use crate::template::errors::TemplateError;
use crate::template::usermeta::{Usermeta, USERMETA_KEY};
use crate::tracking::{TrackedFieldProperties, TrackedFields};
use tracing::{debug, info};

/// A template split into its specification and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTemplate {
    /// Template text with the `usermeta` property removed.
    pub spec: String,
    pub usermeta: Usermeta,
    /// One entry per placeholder, keyed by placeholder, awaiting assignment.
    pub tracked_fields: TrackedFields,
}

/// Remove the top-level `usermeta` property, returning the remaining text and
/// the parsed metadata.
pub fn extract_usermeta(text: &str) -> Result<(String, Usermeta), TemplateError> {
    let (edit, usermeta) = with_parser(|parser| -> Result<(Edit, Usermeta), TemplateError> {
        let parsed = parser.parse_with_source(text)?;
        let span = top_level_property(&parsed, USERMETA_KEY)?
            .ok_or(TemplateError::MissingUsermeta)?;
        let usermeta: Usermeta = serde_json::from_str(&text[span.value_start..span.value_end])?;
        Ok((remove_property_edit(&parsed, USERMETA_KEY)?, usermeta))
    })??;
    Ok((edit.apply_to(text)?, usermeta))
}

fn seed_tracked_fields(usermeta: &Usermeta) -> Result<TrackedFields, TemplateError> {
    let mut tracked = TrackedFields::new();
    for entry in &usermeta.dataset {
        if !is_placeholder(&entry.key) {
            return Err(TemplateError::InvalidPlaceholder {
                key: entry.key.clone(),
            });
        }
        if tracked.contains_key(&entry.key) {
            return Err(TemplateError::DuplicatePlaceholder {
                key: entry.key.clone(),
            });
        }
        let mut props = TrackedFieldProperties::new(entry.key.clone());
        props.template_metadata_original = Some(entry.clone());
        tracked.insert(entry.key.clone(), props);
    }
    Ok(tracked)
}

/// Split a template and check it was produced by a supported build.
pub fn import_template(
    text: &str,
    config: &TemplateConfig,
) -> Result<ImportedTemplate, TemplateError> {
    let (spec, usermeta) = extract_usermeta(text)?;

    if !is_supported_build(&usermeta.deneb.build, &config.supported)? {
        return Err(TemplateError::UnsupportedBuild {
            build: usermeta.deneb.build.clone(),
            supported: config.supported.clone(),
        });
    }
    debug!(
        build = %usermeta.deneb.build,
        meta_version = usermeta.deneb.meta_version,
        "template build accepted"
    );

    let tracked_fields = seed_tracked_fields(&usermeta)?;
    info!(
        name = %usermeta.information.name,
        placeholders = tracked_fields.len(),
        "template imported"
    );
    Ok(ImportedTemplate {
        spec,
        usermeta,
        tracked_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{
  "mark": "bar",
  "encoding": {"x": {"field": "__0__"}},
  "usermeta": {
    "deneb": {"build": "1.7.2", "metaVersion": 1, "provider": "vegaLite"},
    "information": {
      "name": "Bars",
      "description": "",
      "author": "",
      "uuid": "6a8a4f0e-2b8e-4c55-9f8a-3f2b8c1d9e77",
      "generated": "2026-03-01T12:00:00Z"
    },
    "dataset": [{"key": "__0__", "name": "Sales", "kind": "measure", "type": "numeric"}]
  }
}"#;

    #[test]
    fn splits_template() {
        let imported = import_template(TEMPLATE, &TemplateConfig::default()).unwrap();
        assert_eq!(
            imported.spec,
            "{\n  \"mark\": \"bar\",\n  \"encoding\": {\"x\": {\"field\": \"__0__\"}}\n}"
        );
        assert_eq!(imported.usermeta.information.name, "Bars");

        let seeded = &imported.tracked_fields["__0__"];
        assert_eq!(seeded.placeholder, "__0__");
        assert!(seeded.template_metadata.is_none());
        assert_eq!(
            seeded.template_metadata_original.as_ref().map(|m| m.name.as_str()),
            Some("Sales")
        );
    }

    #[test]
    fn rejects_unsupported_builds() {
        let config = TemplateConfig {
            supported: ">=1.8.0".into(),
            ..TemplateConfig::default()
        };
        assert!(matches!(
            import_template(TEMPLATE, &config),
            Err(TemplateError::UnsupportedBuild { .. })
        ));
    }

    #[test]
    fn rejects_malformed_placeholders() {
        let text = TEMPLATE.replace(r#""key": "__0__""#, r#""key": "Sales""#);
        assert!(matches!(
            import_template(&text, &TemplateConfig::default()),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
    }

    #[test]
    fn plain_spec_has_no_usermeta() {
        assert!(matches!(
            import_template(r#"{"mark": "bar"}"#, &TemplateConfig::default()),
            Err(TemplateError::MissingUsermeta)
        ));
    }
}
