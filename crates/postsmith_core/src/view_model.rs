use crate::job::{
    AnalysisReport, ConversationEntry, JobId, JobKind, JobStatus, RateLimitNotice,
};

/// Longest prefix of generated text used as a derived image prompt.
pub const IMAGE_PROMPT_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub prompt_input: String,
    pub content: String,
    pub content_version: u64,
    pub conversation: Vec<ConversationEntry>,
    pub jobs: Vec<JobRowView>,
    pub analysis: Option<AnalysisReport>,
    /// Suggested disclosure text while the blocking prompt is open.
    pub disclosure_prompt: Option<String>,
    /// Distinct rate-limit state, not folded into notifications.
    pub rate_limit: Option<RateLimitNotice>,
    pub notifications: Vec<String>,
    pub image: ImageSlot,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: Option<u8>,
}

/// The single image attachment slot for the working content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageSlot {
    #[default]
    Empty,
    Pending,
    Ready(String),
    /// Job completed without image data; offer a manual regenerate.
    Missing,
}
