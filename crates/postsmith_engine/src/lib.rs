//! Postsmith engine: REST job client, status polling, and persistence IO.
mod api;
mod engine;
mod persist;
mod poller;
mod types;

pub use api::{ApiSettings, JobApi, ReqwestJobApi, OWNER_HEADER};
pub use engine::EngineHandle;
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use poller::{poll_job, ChannelEventSink, EventSink, PollSettings};
pub use types::{
    AnalysisIssue, EngineEvent, JobId, JobKind, JobOutcome, JobStatus, PromotionalVerdict,
    RateLimitNotice, StatusError, StatusSnapshot, SubmitError, TerminalResult,
};
