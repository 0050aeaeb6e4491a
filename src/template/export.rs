//! Template export: tokenize the spec and attach `usermeta`.

use crate::config::TemplateConfig;
use crate::field::placeholder_index;
use crate::json::{append_property_edit, top_level_property};
use crate::pool::with_parser;
use crate::store::TrackingStore;
use crate::template::errors::ExportError;
use crate::template::usermeta::{
    DenebMetadata, TemplateDetails, TemplateInformation, Usermeta, META_VERSION, USERMETA_KEY,
};
use crate::tokenizer::tokenize;
use crate::tracking::{TemplateFieldMetadata, TrackedFields};
use crate::worker::TokenizerResponse;
use tracing::info;

/// Describe every field the spec references, ordered by placeholder.
pub fn build_usermeta(
    tracked: &TrackedFields,
    details: &TemplateDetails,
    config: &TemplateConfig,
) -> Usermeta {
    let mut dataset: Vec<TemplateFieldMetadata> = tracked
        .iter()
        .filter(|(_, props)| props.is_in_specification)
        .map(|(key, props)| {
            let mut entry = props
                .template_metadata
                .clone()
                .unwrap_or_else(|| TemplateFieldMetadata {
                    name: key.clone(),
                    ..Default::default()
                });
            entry.key = props.placeholder.clone();
            entry
        })
        .collect();
    dataset.sort_by(|a, b| {
        placeholder_index(&a.key)
            .unwrap_or(u64::MAX)
            .cmp(&placeholder_index(&b.key).unwrap_or(u64::MAX))
            .then_with(|| a.key.cmp(&b.key))
    });

    Usermeta {
        deneb: DenebMetadata {
            build: config.build.clone(),
            meta_version: META_VERSION,
            provider: config.provider,
        },
        information: TemplateInformation::generate(details),
        dataset,
    }
}

/// Append `usermeta` as the last top-level property of `spec`, leaving the
/// rest of the text untouched.
pub fn insert_usermeta(spec: &str, usermeta: &Usermeta) -> Result<String, ExportError> {
    let value = serde_json::to_string_pretty(usermeta)?;
    let edit = with_parser(|parser| -> Result<_, ExportError> {
        let parsed = parser.parse_with_source(spec)?;
        parsed.check_syntax()?;
        if top_level_property(&parsed, USERMETA_KEY)?.is_some() {
            return Err(ExportError::UsermetaPresent);
        }
        Ok(append_property_edit(&parsed, USERMETA_KEY, &value)?)
    })??;
    Ok(edit.apply_to(spec)?)
}

/// Complete an export from the tokenizer's response.
pub fn finish_export(
    store: &mut TrackingStore,
    response: TokenizerResponse,
    details: &TemplateDetails,
    config: &TemplateConfig,
) -> Result<String, ExportError> {
    let tokenized = store.complete_export(response)?;
    let usermeta = build_usermeta(store.tracked_fields(), details, config);
    let template = insert_usermeta(&tokenized, &usermeta)?;
    info!(
        name = %usermeta.information.name,
        fields = usermeta.dataset.len(),
        "template exported"
    );
    Ok(template)
}

/// Export the store's spec as a template, tokenizing on the calling thread.
pub fn export_template(
    store: &mut TrackingStore,
    details: &TemplateDetails,
    config: &TemplateConfig,
) -> Result<String, ExportError> {
    let request = store.begin_export()?;
    let response = tokenize(
        &request.spec,
        &request.tracked_fields,
        &request.supplementary_replacers,
        request.is_remap,
    );
    finish_export(store, response, details, config)
}
