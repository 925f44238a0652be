use std::fmt;

/// Opaque backend-assigned job identifier.
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Generation,
    Image,
    Analysis,
    Rewrite,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Generation => write!(f, "generation"),
            JobKind::Image => write!(f, "image"),
            JobKind::Analysis => write!(f, "analysis"),
            JobKind::Rewrite => write!(f, "rewrite"),
        }
    }
}

/// Job lifecycle: `Queued -> Running -> {Completed | Failed | Cancelled}`.
/// Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Lifecycle rank used for the monotonicity guard: observed ranks
    /// must never decrease for a given job.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => 2,
        }
    }
}

/// Result of a completed text-generation or rewrite job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub text: String,
    /// The original prompt, when the backend echoes it back.
    pub prompt: Option<String>,
}

/// Result of a completed image job. `data` absent is a soft failure:
/// the job is not retried, the user gets a manual regenerate affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOutcome {
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisIssue {
    pub category: String,
    pub message: String,
}

/// Result of a completed analysis job. Sub-fields may lag the terminal
/// status; [`AnalysisReport::is_complete`] gates anything that acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisReport {
    pub overall_score: Option<u8>,
    pub issues: Option<Vec<AnalysisIssue>>,
}

impl AnalysisReport {
    /// A report is complete once a numeric overall score and the issues
    /// collection are both present.
    pub fn is_complete(&self) -> bool {
        self.overall_score.is_some() && self.issues.is_some()
    }
}

/// Typed payload of a completed job, one variant per [`JobKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    Generation(GenerationOutcome),
    Image(ImageOutcome),
    Analysis(AnalysisReport),
    Rewrite(GenerationOutcome),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Generation(_) => JobKind::Generation,
            JobPayload::Image(_) => JobKind::Image,
            JobPayload::Analysis(_) => JobKind::Analysis,
            JobPayload::Rewrite(_) => JobKind::Rewrite,
        }
    }
}

/// Conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    /// Unix seconds, stamped by the shell when the message was built.
    pub at: i64,
}

/// Structured rate-limit response, kept distinct from generic submission
/// failures so the view can show remaining quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitNotice {
    pub message: String,
    pub tier: String,
    pub hourly_remaining: u32,
}

/// Why a submission failed before any job existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    RateLimited(RateLimitNotice),
    Rejected { message: String },
}
