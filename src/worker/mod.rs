//! Background workers and the orchestrator that correlates their responses.

pub mod handle;
pub mod messages;
pub mod orchestrator;
pub mod workers;

pub use handle::{JobId, Worker, WorkerError, WorkerHandle};
pub use messages::{
    unchanged_spec, FieldsInUseRequest, FieldsInUseResponse, TokenizerRequest, TokenizerResponse,
};
pub use orchestrator::{Orchestrator, OrchestratorError, RemapOutcome};
pub use workers::{FieldsInUseWorker, TokenizerWorker};
