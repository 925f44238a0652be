//! Postsmith core: pure state machine and view-model helpers.
mod correlation;
mod effect;
mod job;
mod msg;
mod state;
mod update;
mod view_model;

pub use correlation::PromptLedger;
pub use effect::Effect;
pub use job::{
    AnalysisIssue, AnalysisReport, ConversationEntry, GenerationOutcome, ImageOutcome, JobId,
    JobKind, JobPayload, JobStatus, RateLimitNotice, Role, SubmitFailure,
};
pub use msg::Msg;
pub use state::{AppState, QUALITY_THRESHOLD};
pub use update::{update, REWRITE_SETTLE_DELAY};
pub use view_model::{AppViewModel, ImageSlot, JobRowView, IMAGE_PROMPT_MAX_CHARS};
