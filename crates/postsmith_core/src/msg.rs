use crate::job::{ConversationEntry, JobId, JobKind, JobPayload, JobStatus, SubmitFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the prompt input box (debounced text).
    PromptChanged(String),
    /// User submitted the current prompt for generation.
    PromptSubmitted { with_image: bool },
    /// User asked for a quality analysis of the working content.
    AnalysisRequested,
    /// Promotional pre-check verdict arrived.
    ClassificationReady {
        promotional: bool,
        suggested_disclosure: Option<String>,
    },
    /// User accepted the suggested disclosure in the blocking prompt.
    DisclosureAccepted,
    /// User declined the suggested disclosure.
    DisclosureDeclined,
    /// Backend accepted a submission and handed back a job id.
    SubmissionAccepted { kind: JobKind, job_id: JobId },
    /// Submission failed before any job was created.
    SubmissionFailed {
        kind: JobKind,
        failure: SubmitFailure,
    },
    /// Poller observed a non-terminal status change.
    JobStatusChanged {
        job_id: JobId,
        kind: JobKind,
        status: JobStatus,
        progress: Option<u8>,
    },
    /// Poller delivered a completed terminal result.
    JobCompleted {
        job_id: JobId,
        payload: JobPayload,
        /// Unix seconds; stamped by the shell for conversation entries.
        at: i64,
    },
    /// Poller delivered a failed terminal result.
    JobFailed {
        job_id: JobId,
        kind: JobKind,
        message: String,
    },
    /// Observation of a job ended without a backend result.
    JobCancelled { job_id: JobId, kind: JobKind },
    /// Settle-delay timer armed for an auto-rewrite elapsed.
    RewriteTimerElapsed { content_version: u64 },
    /// User replaced the working content by hand.
    ContentEdited(String),
    /// User cleared the working content.
    ContentCleared,
    /// User asked for a fresh image after a partial result.
    RegenerateImageClicked,
    /// User dismissed a background notification.
    NotificationDismissed(usize),
    /// Restore previously archived conversation entries.
    RestoreConversation(Vec<ConversationEntry>),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
