use std::fmt;

use serde::Deserialize;

/// Opaque backend-assigned job identifier.
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Generation,
    Image,
    Analysis,
    Rewrite,
}

impl JobKind {
    /// Path of the async-submit endpoint for this kind, relative to the
    /// API base URL.
    pub fn operation(self) -> &'static str {
        match self {
            JobKind::Generation => "content/generate",
            JobKind::Image => "content/image",
            JobKind::Analysis => "content/analyze",
            JobKind::Rewrite => "content/rewrite",
        }
    }
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

/// Backend job lifecycle. `Completed`, `Failed` and `Cancelled` are
/// terminal; once one is observed, polling stops for that id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
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

    /// Lifecycle rank backing the monotonicity guard: a status whose
    /// rank is lower than one already observed is stale and discarded.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => 2,
        }
    }
}

/// Wire shape of one `GET /jobs/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisIssue {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub message: String,
}

/// Typed result payload of a completed job, decoded per kind. Missing
/// or malformed fields decode to their absent form; completeness is the
/// consumer's judgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Generation {
        text: String,
        prompt: Option<String>,
    },
    Image {
        data: Option<String>,
    },
    Analysis {
        overall_score: Option<u8>,
        issues: Option<Vec<AnalysisIssue>>,
    },
    Rewrite {
        text: String,
    },
}

impl JobOutcome {
    pub fn decode(kind: JobKind, result: Option<serde_json::Value>) -> Self {
        match kind {
            JobKind::Generation | JobKind::Rewrite => {
                #[derive(Deserialize, Default)]
                struct Wire {
                    #[serde(default)]
                    text: String,
                    #[serde(default)]
                    prompt: Option<String>,
                }
                let wire: Wire = result
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
                if kind == JobKind::Generation {
                    JobOutcome::Generation {
                        text: wire.text,
                        prompt: wire.prompt,
                    }
                } else {
                    JobOutcome::Rewrite { text: wire.text }
                }
            }
            JobKind::Image => {
                #[derive(Deserialize, Default)]
                struct Wire {
                    #[serde(default)]
                    data: Option<String>,
                }
                let wire: Wire = result
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
                JobOutcome::Image { data: wire.data }
            }
            JobKind::Analysis => {
                #[derive(Deserialize, Default)]
                struct Wire {
                    #[serde(default)]
                    overall_score: Option<u8>,
                    #[serde(default)]
                    issues: Option<Vec<AnalysisIssue>>,
                }
                let wire: Wire = result
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
                JobOutcome::Analysis {
                    overall_score: wire.overall_score,
                    issues: wire.issues,
                }
            }
        }
    }
}

/// Structured HTTP 429 body. Surfaced as its own error category so the
/// UI can show the limiting tier and remaining quota.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitNotice {
    pub message: String,
    pub tier: String,
    pub hourly_remaining: u32,
}

/// Verdict of the lightweight promotional pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromotionalVerdict {
    pub promotional: bool,
    #[serde(default)]
    pub suggested_disclosure: Option<String>,
}

/// Why a submission failed. No job exists in any of these cases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("rate limited: {}", .0.message)]
    RateLimited(RateLimitNotice),
    #[error("submission rejected: {message}")]
    Rejected { message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single failed status probe. Always treated as transient; the
/// poller escalates after a bounded run of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Terminal result of one observed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalResult {
    Completed(JobOutcome),
    Failed { message: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SubmissionAccepted {
        kind: JobKind,
        job_id: JobId,
    },
    SubmissionFailed {
        kind: JobKind,
        error: SubmitError,
    },
    StatusChanged {
        job_id: JobId,
        kind: JobKind,
        status: JobStatus,
        progress: Option<u8>,
    },
    /// Emitted exactly once per observed job.
    Terminal {
        job_id: JobId,
        kind: JobKind,
        result: TerminalResult,
    },
    ClassificationReady {
        verdict: PromotionalVerdict,
    },
}
