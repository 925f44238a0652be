use crate::correlation::PromptLedger;
use crate::job::{
    AnalysisReport, ConversationEntry, JobId, JobKind, JobStatus, RateLimitNotice, Role,
};
use crate::view_model::{AppViewModel, ImageSlot, JobRowView};

/// Score below which a completed analysis triggers an automatic rewrite.
pub const QUALITY_THRESHOLD: u8 = 80;

/// Auto-rewrite lifecycle for the current content version. Reset to
/// `Idle` only when the content is cleared or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RewritePlan {
    #[default]
    Idle,
    /// Low score detected; settle-delay timer armed for this version.
    Scheduled { content_version: u64 },
    /// Rewrite submitted; no re-trigger until the content changes.
    Fired,
}

/// Per-kind "last processed job id" markers backing the at-most-once
/// completion guarantee. Each kind owns an independent slot; a
/// generation marker must never suppress an image completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProcessedMarkers {
    generation: Option<JobId>,
    image: Option<JobId>,
    analysis: Option<JobId>,
    rewrite: Option<JobId>,
}

impl ProcessedMarkers {
    fn slot(&mut self, kind: JobKind) -> &mut Option<JobId> {
        match kind {
            JobKind::Generation => &mut self.generation,
            JobKind::Image => &mut self.image,
            JobKind::Analysis => &mut self.analysis,
            JobKind::Rewrite => &mut self.rewrite,
        }
    }

    /// Check-then-set, in one call with no suspension point between the
    /// check and the set: returns false when this id was already
    /// processed for this kind, otherwise records it first and returns
    /// true. Side effects run only on `true`.
    pub(crate) fn claim(&mut self, kind: JobKind, job_id: &str) -> bool {
        let slot = self.slot(kind);
        if slot.as_deref() == Some(job_id) {
            return false;
        }
        *slot = Some(job_id.to_owned());
        true
    }
}

/// One tracked job, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobRow {
    pub(crate) job_id: JobId,
    pub(crate) kind: JobKind,
    pub(crate) status: JobStatus,
    pub(crate) progress: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    prompt_input: String,
    /// Sticky toggle: derive an image job from each completed generation.
    image_opt_in: bool,
    /// Prompt handed to Effect::SubmitGeneration, awaiting a job id.
    generation_in_flight: bool,
    content: String,
    content_version: u64,
    conversation: Vec<ConversationEntry>,
    jobs: Vec<JobRow>,
    ledger: PromptLedger,
    markers: ProcessedMarkers,
    rewrite: RewritePlan,
    /// Content version a full analysis was submitted for, if any.
    analysis_submitted_for: Option<u64>,
    classify_pending: bool,
    pending_disclosure: Option<String>,
    analysis: Option<AnalysisReport>,
    rate_limit: Option<RateLimitNotice>,
    notifications: Vec<String>,
    image: ImageSlot,
    last_image_prompt: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            prompt_input: self.prompt_input.clone(),
            content: self.content.clone(),
            content_version: self.content_version,
            conversation: self.conversation.clone(),
            jobs: self
                .jobs
                .iter()
                .map(|row| JobRowView {
                    job_id: row.job_id.clone(),
                    kind: row.kind,
                    status: row.status,
                    progress: row.progress,
                })
                .collect(),
            analysis: self.analysis.clone(),
            disclosure_prompt: self.pending_disclosure.clone(),
            rate_limit: self.rate_limit.clone(),
            notifications: self.notifications.clone(),
            image: self.image.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// The conversation log, for archiving.
    pub fn conversation_snapshot(&self) -> Vec<ConversationEntry> {
        self.conversation.clone()
    }

    // ---- prompt & submission bookkeeping ----

    pub(crate) fn set_prompt_input(&mut self, text: String) {
        self.prompt_input = text;
    }

    pub(crate) fn prompt_input(&self) -> &str {
        &self.prompt_input
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Capture the prompt for submission: clears the input box, parks the
    /// prompt in the pending slot, and remembers the image toggle.
    pub(crate) fn begin_generation(&mut self, with_image: bool) -> String {
        let prompt = std::mem::take(&mut self.prompt_input);
        self.image_opt_in = with_image;
        self.generation_in_flight = true;
        self.rate_limit = None;
        self.ledger.set_pending(prompt.clone());
        prompt
    }

    pub(crate) fn generation_in_flight(&self) -> bool {
        self.generation_in_flight
    }

    pub(crate) fn image_opt_in(&self) -> bool {
        self.image_opt_in
    }

    /// A submission was accepted: track the job and, for generations,
    /// move the pending prompt into the ledger under the new id.
    pub(crate) fn record_submission(&mut self, kind: JobKind, job_id: &str) {
        if kind == JobKind::Generation {
            self.generation_in_flight = false;
            if let Some(prompt) = self.ledger.take_pending() {
                self.ledger.remember(job_id, prompt);
            }
        }
        self.rate_limit = None;
        self.upsert_job(kind, job_id);
    }

    /// A submission failed before any job existed: restore the
    /// pre-submission state so the user can retry without losing input.
    pub(crate) fn record_submission_failure(&mut self, kind: JobKind) {
        if kind == JobKind::Generation {
            self.generation_in_flight = false;
            if let Some(prompt) = self.ledger.take_pending() {
                if self.prompt_input.is_empty() {
                    self.prompt_input = prompt;
                }
            }
        }
        if kind == JobKind::Analysis {
            self.analysis_submitted_for = None;
        }
        if kind == JobKind::Image {
            self.image = ImageSlot::Empty;
        }
    }

    pub(crate) fn set_rate_limit(&mut self, notice: RateLimitNotice) {
        self.rate_limit = Some(notice);
    }

    // ---- job table ----

    fn upsert_job(&mut self, kind: JobKind, job_id: &str) {
        if self.jobs.iter().any(|row| row.job_id == job_id) {
            return;
        }
        self.jobs.push(JobRow {
            job_id: job_id.to_owned(),
            kind,
            status: JobStatus::Queued,
            progress: None,
        });
    }

    /// Apply a status observation, discarding anything that would make
    /// the job's observed lifecycle rank decrease.
    pub(crate) fn apply_status(&mut self, job_id: &str, status: JobStatus, progress: Option<u8>) {
        let Some(row) = self.jobs.iter_mut().find(|row| row.job_id == job_id) else {
            return;
        };
        if status.rank() < row.status.rank() || row.status.is_terminal() {
            return;
        }
        row.status = status;
        if progress.is_some() {
            row.progress = progress;
        }
    }

    /// Non-terminal jobs of a kind, used to cancel orphaned observers.
    pub(crate) fn live_jobs_of_kind(&self, kind: JobKind) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|row| row.kind == kind && !row.status.is_terminal())
            .map(|row| row.job_id.clone())
            .collect()
    }

    // ---- completion routing ----

    /// At-most-once gate for terminal side effects; see
    /// [`ProcessedMarkers::claim`].
    pub(crate) fn claim_terminal(&mut self, kind: JobKind, job_id: &str) -> bool {
        self.markers.claim(kind, job_id)
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut PromptLedger {
        &mut self.ledger
    }

    // ---- content & coordination ----

    pub(crate) fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn content_version(&self) -> u64 {
        self.content_version
    }

    /// Replace the working content. This is the only place the rewrite
    /// plan and analysis report reset.
    pub(crate) fn replace_content(&mut self, text: String) {
        self.content = text;
        self.content_version += 1;
        self.rewrite = RewritePlan::Idle;
        self.analysis = None;
        self.analysis_submitted_for = None;
    }

    pub(crate) fn rewrite_plan(&self) -> RewritePlan {
        self.rewrite
    }

    pub(crate) fn set_rewrite_plan(&mut self, plan: RewritePlan) {
        self.rewrite = plan;
    }

    pub(crate) fn analysis_submitted_for(&self) -> Option<u64> {
        self.analysis_submitted_for
    }

    pub(crate) fn mark_analysis_submitted(&mut self) {
        self.analysis_submitted_for = Some(self.content_version);
    }

    pub(crate) fn set_analysis(&mut self, report: AnalysisReport) {
        self.analysis = Some(report);
    }

    pub(crate) fn classify_pending(&self) -> bool {
        self.classify_pending
    }

    pub(crate) fn set_classify_pending(&mut self, pending: bool) {
        self.classify_pending = pending;
    }

    pub(crate) fn pending_disclosure(&self) -> Option<&str> {
        self.pending_disclosure.as_deref()
    }

    pub(crate) fn open_disclosure(&mut self, suggestion: String) {
        self.pending_disclosure = Some(suggestion);
    }

    pub(crate) fn take_disclosure(&mut self) -> Option<String> {
        self.pending_disclosure.take()
    }

    // ---- image slot ----

    pub(crate) fn set_image(&mut self, slot: ImageSlot) {
        self.image = slot;
    }

    pub(crate) fn image(&self) -> &ImageSlot {
        &self.image
    }

    pub(crate) fn set_last_image_prompt(&mut self, prompt: String) {
        self.last_image_prompt = Some(prompt);
    }

    pub(crate) fn last_image_prompt(&self) -> Option<&str> {
        self.last_image_prompt.as_deref()
    }

    // ---- conversation & notifications ----

    /// Append an entry unless an identical `(role, content)` pair sits in
    /// the last two entries; overlapping completion callbacks otherwise
    /// double-append.
    pub(crate) fn push_entry(&mut self, role: Role, content: String, at: i64) {
        let duplicate = self
            .conversation
            .iter()
            .rev()
            .take(2)
            .any(|entry| entry.role == role && entry.content == content);
        if duplicate {
            return;
        }
        self.conversation.push(ConversationEntry { role, content, at });
    }

    pub(crate) fn restore_conversation(&mut self, entries: Vec<ConversationEntry>) {
        self.conversation = entries;
    }

    pub(crate) fn push_notification(&mut self, text: String) {
        self.notifications.push(text);
    }

    pub(crate) fn dismiss_notification(&mut self, index: usize) {
        if index < self.notifications.len() {
            self.notifications.remove(index);
        }
    }
}
