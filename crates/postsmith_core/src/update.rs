use std::time::Duration;

use crate::job::{JobKind, JobPayload, JobStatus, Role, SubmitFailure};
use crate::state::{AppState, RewritePlan, QUALITY_THRESHOLD};
use crate::view_model::{ImageSlot, IMAGE_PROMPT_MAX_CHARS};
use crate::{Effect, Msg};

/// Pause between a low-score analysis landing and the automatic rewrite
/// being submitted, so the triggering result renders first.
pub const REWRITE_SETTLE_DELAY: Duration = Duration::from_millis(2500);

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::PromptChanged(text) => {
            state.set_prompt_input(text);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PromptSubmitted { with_image } => {
            if state.prompt_input().trim().is_empty() || state.generation_in_flight() {
                return (state, Vec::new());
            }
            let prompt = state.begin_generation(with_image);
            state.mark_dirty();
            vec![Effect::SubmitGeneration { prompt }]
        }
        Msg::AnalysisRequested => {
            if state.content().is_empty() {
                state.push_notification("Nothing to analyze yet.".to_string());
                state.mark_dirty();
                return (state, Vec::new());
            }
            let analysis_busy = !state.live_jobs_of_kind(JobKind::Analysis).is_empty();
            if state.classify_pending() || state.pending_disclosure().is_some() || analysis_busy {
                return (state, Vec::new());
            }
            state.set_classify_pending(true);
            state.mark_dirty();
            vec![Effect::ClassifyContent {
                content: state.content().to_owned(),
            }]
        }
        Msg::ClassificationReady {
            promotional,
            suggested_disclosure,
        } => {
            if !state.classify_pending() {
                return (state, Vec::new());
            }
            state.set_classify_pending(false);
            state.mark_dirty();
            match suggested_disclosure {
                Some(suggestion) if promotional => {
                    // Block on the disclosure prompt; the analysis is
                    // submitted when the user accepts or declines.
                    state.open_disclosure(suggestion);
                    Vec::new()
                }
                _ => submit_analysis(&mut state),
            }
        }
        Msg::DisclosureAccepted => match state.take_disclosure() {
            Some(suggestion) => {
                let amended = format!("{}\n\n{}", state.content(), suggestion);
                state.replace_content(amended);
                state.mark_dirty();
                submit_analysis(&mut state)
            }
            None => Vec::new(),
        },
        Msg::DisclosureDeclined => match state.take_disclosure() {
            Some(_) => {
                state.mark_dirty();
                submit_analysis(&mut state)
            }
            None => Vec::new(),
        },
        Msg::SubmissionAccepted { kind, job_id } => {
            state.record_submission(kind, &job_id);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SubmissionFailed { kind, failure } => {
            state.record_submission_failure(kind);
            match failure {
                SubmitFailure::RateLimited(notice) => state.set_rate_limit(notice),
                SubmitFailure::Rejected { message } => {
                    state.push_notification(format!("{kind} submission failed: {message}"));
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::JobStatusChanged {
            job_id,
            status,
            progress,
            ..
        } => {
            state.apply_status(&job_id, status, progress);
            state.mark_dirty();
            Vec::new()
        }
        Msg::JobCompleted {
            job_id,
            payload,
            at,
        } => {
            let kind = payload.kind();
            state.apply_status(&job_id, JobStatus::Completed, Some(100));
            if !state.claim_terminal(kind, &job_id) {
                return (state, Vec::new());
            }
            state.mark_dirty();
            apply_completion(&mut state, &job_id, payload, at)
        }
        Msg::JobFailed {
            job_id,
            kind,
            message,
        } => {
            state.apply_status(&job_id, JobStatus::Failed, None);
            if !state.claim_terminal(kind, &job_id) {
                return (state, Vec::new());
            }
            apply_failure(&mut state, &job_id, kind, &message);
            state.mark_dirty();
            Vec::new()
        }
        Msg::JobCancelled { job_id, kind } => {
            state.apply_status(&job_id, JobStatus::Cancelled, None);
            // Claim the marker so a straggling delivery cannot fire
            // callbacks for a job the user walked away from.
            state.claim_terminal(kind, &job_id);
            state.mark_dirty();
            Vec::new()
        }
        Msg::RewriteTimerElapsed { content_version } => {
            let armed = matches!(
                state.rewrite_plan(),
                RewritePlan::Scheduled { content_version: v } if v == content_version
            );
            if !armed || content_version != state.content_version() || state.content().is_empty() {
                return (state, Vec::new());
            }
            state.set_rewrite_plan(RewritePlan::Fired);
            vec![Effect::SubmitRewrite {
                content: state.content().to_owned(),
            }]
        }
        Msg::ContentEdited(text) => {
            let effects = cancel_live_analysis(&mut state);
            state.replace_content(text);
            state.mark_dirty();
            effects
        }
        Msg::ContentCleared => {
            let effects = cancel_live_analysis(&mut state);
            state.replace_content(String::new());
            state.set_image(ImageSlot::Empty);
            state.mark_dirty();
            effects
        }
        Msg::RegenerateImageClicked => {
            if *state.image() != ImageSlot::Missing {
                return (state, Vec::new());
            }
            match state.last_image_prompt() {
                Some(prompt) => {
                    let prompt = prompt.to_owned();
                    state.set_image(ImageSlot::Pending);
                    state.mark_dirty();
                    vec![Effect::SubmitImage { prompt }]
                }
                None => Vec::new(),
            }
        }
        Msg::NotificationDismissed(index) => {
            state.dismiss_notification(index);
            state.mark_dirty();
            Vec::new()
        }
        Msg::RestoreConversation(entries) => {
            state.restore_conversation(entries);
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Side effects of a completed job. Runs at most once per job id; the
/// caller has already claimed the per-kind marker.
fn apply_completion(
    state: &mut AppState,
    job_id: &str,
    payload: JobPayload,
    at: i64,
) -> Vec<Effect> {
    match payload {
        JobPayload::Generation(outcome) => {
            let prompt = state
                .ledger_mut()
                .resolve(job_id, outcome.prompt.as_deref());
            if let Some(prompt) = prompt {
                state.push_entry(Role::User, prompt, at);
            }
            state.push_entry(Role::Assistant, outcome.text.clone(), at);
            state.replace_content(outcome.text.clone());
            if state.image_opt_in() {
                let prompt = truncated_prefix(&outcome.text, IMAGE_PROMPT_MAX_CHARS);
                state.set_last_image_prompt(prompt.clone());
                state.set_image(ImageSlot::Pending);
                return vec![Effect::SubmitImage { prompt }];
            }
            Vec::new()
        }
        JobPayload::Rewrite(outcome) => {
            state.push_entry(Role::Assistant, outcome.text.clone(), at);
            state.replace_content(outcome.text);
            Vec::new()
        }
        JobPayload::Image(outcome) => {
            match outcome.data {
                Some(data) => state.set_image(ImageSlot::Ready(data)),
                None => {
                    // Soft failure: no automatic retry, just the
                    // regenerate affordance.
                    state.set_image(ImageSlot::Missing);
                    state.push_notification(
                        "Image finished without data. Use regenerate to retry.".to_string(),
                    );
                }
            }
            Vec::new()
        }
        JobPayload::Analysis(report) => {
            state.set_analysis(report.clone());
            let fresh = state.analysis_submitted_for() == Some(state.content_version());
            let low_score = report
                .overall_score
                .map(|score| score < QUALITY_THRESHOLD)
                .unwrap_or(false);
            if fresh
                && report.is_complete()
                && low_score
                && state.rewrite_plan() == RewritePlan::Idle
            {
                let content_version = state.content_version();
                state.set_rewrite_plan(RewritePlan::Scheduled { content_version });
                return vec![Effect::ScheduleRewrite {
                    content_version,
                    delay: REWRITE_SETTLE_DELAY,
                }];
            }
            Vec::new()
        }
    }
}

/// A failed dependent job degrades to its feature being absent; the
/// primary result stays usable.
fn apply_failure(state: &mut AppState, job_id: &str, kind: JobKind, message: &str) {
    state.push_notification(format!("{kind} job failed: {message}"));
    match kind {
        JobKind::Generation => state.ledger_mut().forget(job_id),
        JobKind::Image => state.set_image(ImageSlot::Empty),
        JobKind::Analysis => state.record_submission_failure(JobKind::Analysis),
        JobKind::Rewrite => {}
    }
}

fn submit_analysis(state: &mut AppState) -> Vec<Effect> {
    state.mark_analysis_submitted();
    vec![Effect::SubmitAnalysis {
        content: state.content().to_owned(),
    }]
}

/// Stop observing analysis jobs whose subject content is going away.
fn cancel_live_analysis(state: &mut AppState) -> Vec<Effect> {
    let live = state.live_jobs_of_kind(JobKind::Analysis);
    let mut effects = Vec::with_capacity(live.len());
    for job_id in live {
        state.apply_status(&job_id, JobStatus::Cancelled, None);
        state.claim_terminal(JobKind::Analysis, &job_id);
        effects.push(Effect::CancelJob { job_id });
    }
    effects
}

/// Char-boundary-safe bounded prefix for derived image prompts.
fn truncated_prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
