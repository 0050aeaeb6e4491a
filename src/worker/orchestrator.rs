//! Drives the store through remap and export cycles using the two
//! background workers.

use crate::config::{TemplateConfig, WorkersConfig};
use crate::store::{RemapStep, StoreError, TrackingStore};
use crate::template::{finish_export, ExportError, TemplateDetails};
use crate::tracking::SkippedField;
use crate::worker::handle::{JobId, WorkerError, WorkerHandle};
use crate::worker::messages::{
    unchanged_spec, FieldsInUseRequest, FieldsInUseResponse, TokenizerRequest, TokenizerResponse,
};
use crate::worker::workers::{FieldsInUseWorker, TokenizerWorker};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// What a completed remap cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapOutcome {
    /// Rewritten spec the editor should show, when renames changed it.
    pub editor_text: Option<String>,
    pub fields_requiring_mapping: Vec<String>,
    pub skipped: Vec<SkippedField>,
}

pub struct Orchestrator {
    fields: WorkerHandle<FieldsInUseWorker>,
    tokenizer: WorkerHandle<TokenizerWorker>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(config: &WorkersConfig) -> Result<Self, WorkerError> {
        Ok(Self {
            fields: WorkerHandle::spawn(FieldsInUseWorker, config.fields_threads)?,
            tokenizer: WorkerHandle::spawn(TokenizerWorker, config.tokenizer_threads)?,
            timeout: config.timeout(),
        })
    }

    /// Fire-and-forget locator request; supersedes earlier submissions.
    pub fn submit_fields(&self, request: FieldsInUseRequest) -> Result<JobId, WorkerError> {
        self.fields.submit(request)
    }

    /// Response to the most recent [`Orchestrator::submit_fields`], or `None`
    /// on timeout.
    pub fn await_fields(&self) -> Option<FieldsInUseResponse> {
        self.fields.recv_latest(self.timeout)
    }

    fn locate(&self, request: FieldsInUseRequest) -> Result<FieldsInUseResponse, WorkerError> {
        let fallback = FieldsInUseResponse::unchanged(&request);
        self.submit_fields(request)?;
        Ok(self.await_fields().unwrap_or(fallback))
    }

    /// Run a tokenizer request; on timeout the spec comes back unchanged with
    /// every field reported as skipped.
    pub fn tokenize(&self, request: TokenizerRequest) -> Result<TokenizerResponse, WorkerError> {
        let fallback = unchanged_spec(&request, "tokenizer did not respond");
        self.tokenizer.submit(request)?;
        Ok(self.tokenizer.recv_latest(self.timeout).unwrap_or(fallback))
    }

    /// Run one full remap cycle against the store.
    ///
    /// The store's spec is authoritative once this returns; the caller shows
    /// `editor_text` if it is set.
    pub fn run_remap_cycle(
        &self,
        store: &mut TrackingStore,
        reset: bool,
    ) -> Result<RemapOutcome, OrchestratorError> {
        let request = store.begin_remap(reset)?;
        let response = self.locate(request)?;
        let skipped = response.skipped.clone();

        let mut step = store.receive_fields(response)?;
        let editor_text = loop {
            match step {
                RemapStep::Replace(request) => {
                    let response = self.tokenize(request)?;
                    step = store.receive_replaced(response)?;
                }
                RemapStep::UpdateEditor(text) => break text,
            }
        };
        store.editor_updated()?;

        let outcome = RemapOutcome {
            editor_text,
            fields_requiring_mapping: store.fields_requiring_mapping(),
            skipped,
        };
        debug!(
            mapping_required = outcome.fields_requiring_mapping.len(),
            rewritten = outcome.editor_text.is_some(),
            "remap cycle complete"
        );
        Ok(outcome)
    }

    /// Export the store's spec as a template through the tokenizer worker.
    pub fn export_template(
        &self,
        store: &mut TrackingStore,
        details: &TemplateDetails,
        config: &TemplateConfig,
    ) -> Result<String, OrchestratorError> {
        let request = store.begin_export()?;
        let response = self.tokenize(request)?;
        Ok(finish_export(store, response, details, config)?)
    }
}
