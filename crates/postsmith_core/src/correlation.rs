use std::collections::HashMap;

use crate::job::JobId;

/// Maps an in-flight job id to the prompt captured at submission time.
///
/// The prompt input box is cleared as soon as a submission is accepted so
/// the user can type a follow-up, so by the time the job resolves the
/// original prompt may be gone from the UI. Entries are read once and
/// removed; abandoned entries are bounded by job volume and tolerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptLedger {
    entries: HashMap<JobId, String>,
    /// Last-resort single slot: the most recent prompt submitted but not
    /// yet associated with a job id.
    pending: Option<String>,
}

impl PromptLedger {
    pub fn remember(&mut self, job_id: &str, prompt: String) {
        self.entries.insert(job_id.to_owned(), prompt);
    }

    /// Returns the remembered prompt and removes the entry.
    pub fn recall(&mut self, job_id: &str) -> Option<String> {
        self.entries.remove(job_id)
    }

    pub fn forget(&mut self, job_id: &str) {
        self.entries.remove(job_id);
    }

    pub fn set_pending(&mut self, prompt: String) {
        self.pending = Some(prompt);
    }

    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Reconstruct the prompt for a resolving job. Resolution order: the
    /// prompt echoed in the job's own result payload, then the ledger
    /// entry for the id, then the pending slot.
    pub fn resolve(&mut self, job_id: &str, echoed: Option<&str>) -> Option<String> {
        if let Some(prompt) = echoed {
            self.forget(job_id);
            return Some(prompt.to_owned());
        }
        self.recall(job_id).or_else(|| self.pending.take())
    }
}
