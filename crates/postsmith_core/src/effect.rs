use std::time::Duration;

use crate::job::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Submit a text-generation job for the given prompt.
    SubmitGeneration { prompt: String },
    /// Submit an image job whose prompt is derived from generated text.
    SubmitImage { prompt: String },
    /// Run the lightweight promotional pre-check on the given content.
    ClassifyContent { content: String },
    /// Submit a full content-analysis job.
    SubmitAnalysis { content: String },
    /// Submit an automatic rewrite of low-scoring content.
    SubmitRewrite { content: String },
    /// Arm the settle-delay timer before a rewrite fires. The elapsed
    /// message echoes `content_version`; a stale version is ignored,
    /// which is how the timer is cancelled.
    ScheduleRewrite {
        content_version: u64,
        delay: Duration,
    },
    /// Stop observing a job.
    CancelJob { job_id: JobId },
}
