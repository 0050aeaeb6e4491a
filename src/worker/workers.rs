use crate::tokenizer::tokenize;
use crate::tracking::FieldLocator;
use crate::worker::handle::Worker;
use crate::worker::messages::{
    unchanged_spec, FieldsInUseRequest, FieldsInUseResponse, TokenizerRequest, TokenizerResponse,
};

/// Runs the field locator.
#[derive(Debug, Default)]
pub struct FieldsInUseWorker;

impl Worker for FieldsInUseWorker {
    type Request = FieldsInUseRequest;
    type Response = FieldsInUseResponse;
    const NAME: &'static str = "fields-in-use";

    fn process(&self, request: &FieldsInUseRequest) -> FieldsInUseResponse {
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

    fn recover(&self, request: &FieldsInUseRequest) -> FieldsInUseResponse {
        FieldsInUseResponse::unchanged(request)
    }
}

/// Runs the tokenizer in either direction.
#[derive(Debug, Default)]
pub struct TokenizerWorker;

impl Worker for TokenizerWorker {
    type Request = TokenizerRequest;
    type Response = TokenizerResponse;
    const NAME: &'static str = "spec-tokenizer";

    fn process(&self, request: &TokenizerRequest) -> TokenizerResponse {
        tokenize(
            &request.spec,
            &request.tracked_fields,
            &request.supplementary_replacers,
            request.is_remap,
        )
    }

    fn recover(&self, request: &TokenizerRequest) -> TokenizerResponse {
        unchanged_spec(request, "tokenizer panicked")
    }
}
