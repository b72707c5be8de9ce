mod runtime;

pub mod clients;
pub mod media;
pub mod storage;

pub use runtime::admission::{Permit, TranscodePool};
pub use runtime::orchestrator::{Collaborators, PipelineOrchestrator, PipelineSettings};
pub use runtime::tracker::{TaskSnapshot, TaskTracker};
pub use runtime::types::{PipelineError, TaskState};
