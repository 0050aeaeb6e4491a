//! Authoritative tracking state.
//!
//! The store is the only owner and the only mutator of tracked fields. It
//! hands out snapshot requests for the workers and adopts their responses
//! stage by stage, enforcing the remap and export lifecycles.

use crate::field::{Dataset, DatasetField};
use crate::pattern::{replacement_patterns, PatternReplacer};
use crate::state::{RemapState, TemplateExportProcessingState, TransitionError};
use crate::template::ExportError;
use crate::tracking::{
    apply_renames, contains_level_tokens, drilldown_replacers, pending_renames, TemplateFieldMetadata,
    TrackedDrilldownProperties, TrackedFields, DRILLDOWN_FIELD,
};
use crate::worker::{FieldsInUseRequest, FieldsInUseResponse, TokenizerRequest, TokenizerResponse};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("no tracked field '{key}'")]
    UnknownTrackedField { key: String },

    #[error("dataset has no field '{name}'")]
    UnknownDatasetField { name: String },

    #[error("no locator result to adopt")]
    NothingPending,
}

/// What the caller must do after the store adopts a locator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapStep {
    /// Renames must be substituted into the spec: run this through the
    /// tokenizer and hand the result to [`TrackingStore::receive_replaced`].
    Replace(TokenizerRequest),
    /// Tracking is written. Push the text (if any) into the editor, then call
    /// [`TrackingStore::editor_updated`].
    UpdateEditor(Option<String>),
}

#[derive(Debug, Clone, Default)]
pub struct TrackingStore {
    spec: String,
    dataset: Dataset,
    tracked_fields: TrackedFields,
    tracked_drilldown: TrackedDrilldownProperties,
    remap_state: RemapState,
    export_state: TemplateExportProcessingState,
    pending: Option<FieldsInUseResponse>,
    reset_requested: bool,
}

impl TrackingStore {
    pub fn new(spec: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            spec: spec.into(),
            dataset,
            ..Default::default()
        }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn tracked_fields(&self) -> &TrackedFields {
        &self.tracked_fields
    }

    pub fn tracked_drilldown(&self) -> TrackedDrilldownProperties {
        self.tracked_drilldown
    }

    pub fn remap_state(&self) -> RemapState {
        self.remap_state
    }

    pub fn export_state(&self) -> TemplateExportProcessingState {
        self.export_state
    }

    /// Keys that need reassignment, with the drilldown role last.
    pub fn fields_requiring_mapping(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .tracked_fields
            .iter()
            .filter(|(_, props)| props.is_mapping_required)
            .map(|(key, _)| key.clone())
            .collect();
        if self.tracked_drilldown.is_mapping_required {
            fields.push(DRILLDOWN_FIELD.to_string());
        }
        fields
    }

    pub fn is_mapping_required(&self) -> bool {
        !self.fields_requiring_mapping().is_empty()
    }

    fn settle(&mut self) {
        if self.remap_state == RemapState::Complete {
            self.remap_state = RemapState::None;
        }
    }

    /// Record an edit of the specification text.
    pub fn set_spec(&mut self, spec: impl Into<String>) {
        self.spec = spec.into();
        self.settle();
    }

    /// Record a change of the dataset's field set.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.settle();
    }

    /// Replace the spec and tracking with an imported template. The next
    /// remap cycle runs with `reset`.
    pub fn load_template(
        &mut self,
        spec: impl Into<String>,
        tracked: TrackedFields,
    ) -> Result<(), StoreError> {
        if !self.remap_state.is_idle() {
            return Err(TransitionError::Remap {
                from: self.remap_state,
                to: RemapState::None,
            }
            .into());
        }
        self.spec = spec.into();
        self.tracked_fields = tracked;
        self.tracked_drilldown = TrackedDrilldownProperties::default();
        self.reset_requested = true;
        self.settle();
        Ok(())
    }

    fn transition(&mut self, to: RemapState) -> Result<(), TransitionError> {
        if !self.remap_state.can_transition_to(to) {
            return Err(TransitionError::Remap {
                from: self.remap_state,
                to,
            });
        }
        debug!(from = %self.remap_state, to = %to, "remap transition");
        self.remap_state = to;
        Ok(())
    }

    /// Start a remap cycle and return the locator request for it.
    pub fn begin_remap(&mut self, reset: bool) -> Result<FieldsInUseRequest, StoreError> {
        self.settle();
        self.transition(RemapState::Tokenizing)?;
        let reset = reset || std::mem::take(&mut self.reset_requested);
        Ok(FieldsInUseRequest {
            spec: self.spec.clone(),
            dataset: self.dataset.clone(),
            tracked_fields_current: self.tracked_fields.clone(),
            tracked_drilldown_current: self.tracked_drilldown,
            reset,
        })
    }

    /// Adopt the locator response for the current cycle.
    pub fn receive_fields(
        &mut self,
        response: FieldsInUseResponse,
    ) -> Result<RemapStep, StoreError> {
        self.transition(RemapState::Replacing)?;

        let renames = pending_renames(&response.tracked_fields);
        // Level tokens left by an imported template go back to whichever
        // drilldown columns are bound now.
        let levels = if contains_level_tokens(&self.spec) {
            drilldown_replacers(&self.dataset, true)
        } else {
            Vec::new()
        };
        if renames.is_empty() && levels.is_empty() {
            return self.write_tracking(response, None);
        }

        // Old names go to placeholders first so chained or swapped renames
        // cannot capture each other.
        let mut replacers: Vec<PatternReplacer> = renames
            .iter()
            .filter_map(|(key, props)| {
                let target = props.pending_rename(key)?;
                Some(replacement_patterns(&props.placeholder, &target))
            })
            .flatten()
            .collect();
        info!(
            renames = renames.len(),
            restore_drilldown = !levels.is_empty(),
            "substituting renamed fields"
        );
        replacers.extend(levels);

        let request = TokenizerRequest {
            spec: self.spec.clone(),
            tracked_fields: renames,
            supplementary_replacers: replacers,
            is_remap: false,
        };
        self.pending = Some(response);
        Ok(RemapStep::Replace(request))
    }

    /// Adopt the spec rewritten during the `Replacing` stage.
    pub fn receive_replaced(
        &mut self,
        response: TokenizerResponse,
    ) -> Result<RemapStep, StoreError> {
        if self.remap_state != RemapState::Replacing {
            return Err(TransitionError::Remap {
                from: self.remap_state,
                to: RemapState::Tracking,
            }
            .into());
        }
        let mut fields = self.pending.take().ok_or(StoreError::NothingPending)?;
        if !response.skipped.is_empty() {
            // A partial rewrite would leave tracking and text disagreeing;
            // keep both as they were and retry the renames next cycle.
            warn!(
                skipped = response.skipped.len(),
                "rename substitution incomplete, keeping specification"
            );
            return self.write_tracking(fields, None);
        }

        fields.tracked_fields = apply_renames(&fields.tracked_fields);
        for (key, props) in fields.tracked_fields.iter_mut() {
            props.is_in_dataset = self.dataset.contains(key);
        }

        let editor_text = (response.spec != self.spec).then(|| response.spec.clone());
        self.spec = response.spec;
        self.write_tracking(fields, editor_text)
    }

    fn write_tracking(
        &mut self,
        response: FieldsInUseResponse,
        editor_text: Option<String>,
    ) -> Result<RemapStep, StoreError> {
        self.transition(RemapState::Tracking)?;
        self.tracked_fields = response.tracked_fields;
        self.tracked_drilldown = response.tracked_drilldown;

        let mapping = self.fields_requiring_mapping();
        if mapping.is_empty() {
            debug!(fields = self.tracked_fields.len(), "tracking updated");
        } else {
            info!(fields = ?mapping, "fields require mapping");
        }

        self.transition(RemapState::UpdatingEditor)?;
        Ok(RemapStep::UpdateEditor(editor_text))
    }

    /// The editor now shows [`TrackingStore::spec`]; the cycle is complete.
    pub fn editor_updated(&mut self) -> Result<(), StoreError> {
        self.transition(RemapState::Complete)?;
        Ok(())
    }

    /// Resolve a tracked entry to a dataset field chosen by the user.
    ///
    /// This is the only way a mapping-required entry is cleared outside a
    /// locator run. The spec itself is rewritten by the next remap cycle.
    pub fn assign_field(&mut self, key: &str, field_name: &str) -> Result<(), StoreError> {
        let field: &DatasetField = self
            .dataset
            .standard_fields()
            .find(|f| f.name == field_name || f.key() == field_name)
            .ok_or_else(|| StoreError::UnknownDatasetField {
                name: field_name.to_string(),
            })?;
        let props = self
            .tracked_fields
            .get_mut(key)
            .ok_or_else(|| StoreError::UnknownTrackedField {
                key: key.to_string(),
            })?;

        let mut metadata = TemplateFieldMetadata::from_dataset_field(&props.placeholder, field);
        if let Some(original) = &props.template_metadata_original {
            metadata.description.clone_from(&original.description);
        }
        props.template_metadata = Some(metadata);
        props.is_mapping_required = false;
        debug!(field = %key, assigned = %field.name, "field assigned");
        Ok(())
    }

    /// Start an export, returning the tokenizer request for it.
    pub fn begin_export(&mut self) -> Result<TokenizerRequest, ExportError> {
        let fields = self.fields_requiring_mapping();
        if !fields.is_empty() {
            return Err(ExportError::MappingRequired { fields });
        }
        if self.export_state == TemplateExportProcessingState::Tokenizing {
            return Err(ExportError::InProgress);
        }
        self.export_state = TemplateExportProcessingState::Tokenizing;
        debug!("export tokenizing");

        let in_spec: TrackedFields = self
            .tracked_fields
            .iter()
            .filter(|(_, props)| props.is_in_specification)
            .map(|(key, props)| (key.clone(), props.clone()))
            .collect();
        Ok(TokenizerRequest {
            spec: self.spec.clone(),
            tracked_fields: in_spec,
            supplementary_replacers: drilldown_replacers(&self.dataset, false),
            is_remap: false,
        })
    }

    /// Finish the export started by [`TrackingStore::begin_export`].
    pub fn complete_export(&mut self, response: TokenizerResponse) -> Result<String, ExportError> {
        if self.export_state != TemplateExportProcessingState::Tokenizing {
            return Err(ExportError::NotStarted);
        }
        self.export_state = TemplateExportProcessingState::Complete;
        debug!("export complete");
        if !response.skipped.is_empty() {
            return Err(ExportError::Skipped {
                skipped: response.skipped,
            });
        }
        Ok(response.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::tracking::{FieldLocator, TrackedFieldProperties};

    fn run_locator(request: &FieldsInUseRequest) -> FieldsInUseResponse {
        let result = FieldLocator::new(&request.dataset, &request.tracked_fields_current)
            .with_drilldown(request.tracked_drilldown_current)
            .with_reset(request.reset)
            .locate(&request.spec);
        FieldsInUseResponse {
            tracked_fields: result.tracked_fields,
            tracked_drilldown: result.tracked_drilldown,
            skipped: result.skipped,
        }
    }

    fn cycle(store: &mut TrackingStore) -> Option<String> {
        let request = store.begin_remap(false).unwrap();
        let step = store.receive_fields(run_locator(&request)).unwrap();
        let step = match step {
            RemapStep::Replace(request) => {
                assert_eq!(store.remap_state(), RemapState::Replacing);
                let result = tokenize(
                    &request.spec,
                    &request.tracked_fields,
                    &request.supplementary_replacers,
                    request.is_remap,
                );
                store.receive_replaced(result).unwrap()
            }
            step => step,
        };
        assert_eq!(store.remap_state(), RemapState::UpdatingEditor);
        store.editor_updated().unwrap();
        match step {
            RemapStep::UpdateEditor(text) => text,
            RemapStep::Replace(_) => unreachable!(),
        }
    }

    fn dataset(names: &[&str]) -> Dataset {
        Dataset::new(names.iter().map(|n| DatasetField::new(*n)).collect())
    }

    const SPEC: &str = r#"{"encoding": {"x": {"field": "Sales"}, "y": {"field": "Region"}}}"#;

    #[test]
    fn cycle_tracks_fields() {
        let mut store = TrackingStore::new(SPEC, dataset(&["Sales", "Region"]));
        assert_eq!(cycle(&mut store), None);
        assert_eq!(store.remap_state(), RemapState::Complete);
        assert_eq!(store.tracked_fields().len(), 2);

        store.set_spec(SPEC);
        assert_eq!(store.remap_state(), RemapState::None);
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut store = TrackingStore::new(SPEC, dataset(&["Sales"]));
        assert!(store.editor_updated().is_err());
        assert!(matches!(
            store.receive_fields(FieldsInUseResponse::default()),
            Err(StoreError::Transition(_))
        ));
        store.begin_remap(false).unwrap();
        assert!(store.begin_remap(false).is_err());
    }

    #[test]
    fn removed_field_blocks_export_until_assigned() {
        let mut store = TrackingStore::new(SPEC, dataset(&["Sales", "Region"]));
        cycle(&mut store);

        store.set_dataset(dataset(&["Revenue", "Region"]));
        cycle(&mut store);
        assert_eq!(store.fields_requiring_mapping(), vec!["Sales".to_string()]);
        assert!(matches!(
            store.begin_export(),
            Err(ExportError::MappingRequired { .. })
        ));
        assert_eq!(store.export_state(), TemplateExportProcessingState::None);

        store.assign_field("Sales", "Revenue").unwrap();
        assert!(!store.is_mapping_required());

        let editor = cycle(&mut store);
        assert_eq!(
            editor.as_deref(),
            Some(r#"{"encoding": {"x": {"field": "Revenue"}, "y": {"field": "Region"}}}"#)
        );
        assert!(store.tracked_fields().contains_key("Revenue"));
        assert!(!store.tracked_fields().contains_key("Sales"));
        assert_eq!(store.tracked_fields()["Revenue"].placeholder, "__0__");
    }

    #[test]
    fn incomplete_rename_keeps_spec_and_pending_assignment() {
        let mut store = TrackingStore::new(SPEC, dataset(&["Sales", "Region"]));
        cycle(&mut store);
        store.set_dataset(dataset(&["Revenue", "Region"]));
        cycle(&mut store);
        store.assign_field("Sales", "Revenue").unwrap();

        let request = store.begin_remap(false).unwrap();
        let RemapStep::Replace(replace) = store.receive_fields(run_locator(&request)).unwrap() else {
            panic!("expected a rename substitution");
        };
        let step = store
            .receive_replaced(crate::worker::unchanged_spec(&replace, "timed out"))
            .unwrap();
        assert_eq!(step, RemapStep::UpdateEditor(None));
        assert_eq!(store.spec(), SPEC);
        assert!(store.tracked_fields()["Sales"].pending_rename("Sales").is_some());
        store.editor_updated().unwrap();

        assert!(cycle(&mut store).is_some());
        assert!(store.tracked_fields().contains_key("Revenue"));
    }

    #[test]
    fn export_lifecycle() {
        let mut store = TrackingStore::new(SPEC, dataset(&["Sales", "Region", "Unused"]));
        cycle(&mut store);

        let request = store.begin_export().unwrap();
        assert_eq!(store.export_state(), TemplateExportProcessingState::Tokenizing);
        assert!(!request.tracked_fields.contains_key("Unused"));
        assert!(matches!(store.begin_export(), Err(ExportError::InProgress)));

        let result = tokenize(
            &request.spec,
            &request.tracked_fields,
            &request.supplementary_replacers,
            false,
        );
        let tokenized = store.complete_export(result).unwrap();
        assert_eq!(
            tokenized,
            r#"{"encoding": {"x": {"field": "__0__"}, "y": {"field": "__1__"}}}"#
        );
        assert_eq!(store.export_state(), TemplateExportProcessingState::Complete);
        assert!(matches!(
            store.complete_export(TokenizerResponse::default()),
            Err(ExportError::NotStarted)
        ));
    }

    #[test]
    fn imported_template_flags_unassigned_placeholders() {
        let mut tracked = TrackedFields::new();
        tracked.insert("__0__".into(), TrackedFieldProperties::new("__0__"));
        let mut store = TrackingStore::new("{}", dataset(&["Sales"]));
        store
            .load_template(r#"{"encoding": {"x": {"field": "__0__"}}}"#, tracked)
            .unwrap();

        cycle(&mut store);
        assert_eq!(store.fields_requiring_mapping(), vec!["__0__".to_string()]);

        store.assign_field("__0__", "Sales").unwrap();
        let editor = cycle(&mut store);
        assert_eq!(
            editor.as_deref(),
            Some(r#"{"encoding": {"x": {"field": "Sales"}}}"#)
        );
        assert_eq!(store.tracked_fields()["Sales"].placeholder, "__0__");
        assert!(store.tracked_fields()["Sales"].is_in_dataset);
    }

    #[test]
    fn imported_level_tokens_return_to_bound_columns() {
        use crate::field::FieldRole;

        let mut tracked = TrackedFields::new();
        tracked.insert("__0__".into(), TrackedFieldProperties::new("__0__"));
        let data = Dataset::new(vec![
            DatasetField::new("Sales"),
            DatasetField::new("Quarter").with_role(FieldRole::Drilldown),
        ]);
        let mut store = TrackingStore::new("{}", data);
        store
            .load_template(
                r#"{"encoding": {"x": {"field": "__drilldown0__"}, "y": {"field": "__0__"}}}"#,
                tracked,
            )
            .unwrap();

        let editor = cycle(&mut store);
        assert_eq!(
            editor.as_deref(),
            Some(r#"{"encoding": {"x": {"field": "Quarter"}, "y": {"field": "__0__"}}}"#)
        );
        assert_eq!(store.fields_requiring_mapping(), vec!["__0__".to_string()]);
        assert!(!store.tracked_drilldown().is_mapping_required);

        store.assign_field("__0__", "Sales").unwrap();
        assert_eq!(
            cycle(&mut store).as_deref(),
            Some(r#"{"encoding": {"x": {"field": "Quarter"}, "y": {"field": "Sales"}}}"#)
        );
    }

    #[test]
    fn level_tokens_wait_for_bound_columns() {
        let mut store = TrackingStore::new("{}", dataset(&["Sales"]));
        store
            .load_template(
                r#"{"encoding": {"x": {"field": "__drilldown0__"}}}"#,
                TrackedFields::new(),
            )
            .unwrap();

        assert_eq!(cycle(&mut store), None);
        assert!(store.tracked_drilldown().is_mapping_required);
        assert!(store.spec().contains("__drilldown0__"));
    }

    #[test]
    fn unknown_assignments_are_rejected() {
        let mut store = TrackingStore::new(SPEC, dataset(&["Sales"]));
        cycle(&mut store);
        assert!(matches!(
            store.assign_field("Nope", "Sales"),
            Err(StoreError::UnknownTrackedField { .. })
        ));
        assert!(matches!(
            store.assign_field("Sales", "Nope"),
            Err(StoreError::UnknownDatasetField { .. })
        ));
    }
}
