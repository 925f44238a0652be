use std::sync::Once;

use postsmith_core::{
    update, AnalysisIssue, AnalysisReport, AppState, Effect, GenerationOutcome, ImageOutcome,
    ImageSlot, JobKind, JobPayload, JobStatus, Msg,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn submit_prompt(state: AppState, prompt: &str, with_image: bool) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::PromptChanged(prompt.to_string()));
    update(state, Msg::PromptSubmitted { with_image })
}

fn accept(state: AppState, kind: JobKind, job_id: &str) -> AppState {
    let (state, _) = update(
        state,
        Msg::SubmissionAccepted {
            kind,
            job_id: job_id.to_string(),
        },
    );
    state
}

fn generation_done(text: &str) -> JobPayload {
    JobPayload::Generation(GenerationOutcome {
        text: text.to_string(),
        prompt: None,
    })
}

#[test]
fn duplicate_terminal_delivery_fires_callback_once() {
    init_logging();
    let (state, _) = submit_prompt(AppState::new(), "write about rust", true);
    let state = accept(state, JobKind::Generation, "job-1");

    let done = Msg::JobCompleted {
        job_id: "job-1".to_string(),
        payload: generation_done("Rust post body"),
        at: 100,
    };

    let (state, effects) = update(state, done.clone());
    assert_eq!(state.view().conversation.len(), 2);
    assert_eq!(
        effects,
        vec![Effect::SubmitImage {
            prompt: "Rust post body".to_string(),
        }]
    );

    // Second delivery of the same terminal state: no side effects.
    let (state, effects) = update(state, done);
    assert_eq!(state.view().conversation.len(), 2);
    assert!(effects.is_empty());
}

#[test]
fn completion_markers_are_isolated_per_kind() {
    init_logging();
    let (state, _) = submit_prompt(AppState::new(), "write about rust", true);
    let state = accept(state, JobKind::Generation, "job-1");

    let (state, effects) = update(
        state,
        Msg::JobCompleted {
            job_id: "job-1".to_string(),
            payload: generation_done("Generated text"),
            at: 100,
        },
    );
    assert_eq!(effects.len(), 1);

    // The generation marker must not suppress the image completion.
    let state = accept(state, JobKind::Image, "job-2");
    let (state, _) = update(
        state,
        Msg::JobCompleted {
            job_id: "job-2".to_string(),
            payload: JobPayload::Image(ImageOutcome {
                data: Some("base64-bytes".to_string()),
            }),
            at: 101,
        },
    );
    assert_eq!(
        state.view().image,
        ImageSlot::Ready("base64-bytes".to_string())
    );
}

#[test]
fn status_observations_never_regress() {
    init_logging();
    let (state, _) = submit_prompt(AppState::new(), "write about rust", false);
    let state = accept(state, JobKind::Generation, "job-1");

    let (state, _) = update(
        state,
        Msg::JobStatusChanged {
            job_id: "job-1".to_string(),
            kind: JobKind::Generation,
            status: JobStatus::Running,
            progress: Some(50),
        },
    );
    assert_eq!(state.view().jobs[0].status, JobStatus::Running);

    // A stale queued observation after running is discarded.
    let (state, _) = update(
        state,
        Msg::JobStatusChanged {
            job_id: "job-1".to_string(),
            kind: JobKind::Generation,
            status: JobStatus::Queued,
            progress: None,
        },
    );
    assert_eq!(state.view().jobs[0].status, JobStatus::Running);
    assert_eq!(state.view().jobs[0].progress, Some(50));

    let (state, _) = update(
        state,
        Msg::JobCompleted {
            job_id: "job-1".to_string(),
            payload: generation_done("done"),
            at: 100,
        },
    );
    assert_eq!(state.view().jobs[0].status, JobStatus::Completed);

    // Nothing moves a terminal row back.
    let (state, _) = update(
        state,
        Msg::JobStatusChanged {
            job_id: "job-1".to_string(),
            kind: JobKind::Generation,
            status: JobStatus::Running,
            progress: Some(10),
        },
    );
    assert_eq!(state.view().jobs[0].status, JobStatus::Completed);
}

#[test]
fn cancelled_analysis_never_fires_callbacks() {
    init_logging();
    let (state, _) = submit_prompt(AppState::new(), "write about rust", false);
    let state = accept(state, JobKind::Generation, "job-1");
    let (state, _) = update(
        state,
        Msg::JobCompleted {
            job_id: "job-1".to_string(),
            payload: generation_done("First draft"),
            at: 100,
        },
    );

    let (state, _) = update(state, Msg::AnalysisRequested);
    let (state, effects) = update(
        state,
        Msg::ClassificationReady {
            promotional: false,
            suggested_disclosure: None,
        },
    );
    assert_eq!(effects.len(), 1);
    let state = accept(state, JobKind::Analysis, "job-a");

    // Editing the content cancels the in-flight analysis observer.
    let (state, effects) = update(state, Msg::ContentEdited("Edited draft".to_string()));
    assert_eq!(
        effects,
        vec![Effect::CancelJob {
            job_id: "job-a".to_string(),
        }]
    );

    // A straggling terminal delivery for the cancelled job is inert.
    let (state, effects) = update(
        state,
        Msg::JobCompleted {
            job_id: "job-a".to_string(),
            payload: JobPayload::Analysis(AnalysisReport {
                overall_score: Some(10),
                issues: Some(vec![AnalysisIssue {
                    category: "tone".to_string(),
                    message: "too informal".to_string(),
                }]),
            }),
            at: 101,
        },
    );
    assert!(effects.is_empty());
    assert!(state.view().analysis.is_none());
}

#[test]
fn failed_image_job_degrades_without_touching_content() {
    init_logging();
    let (state, _) = submit_prompt(AppState::new(), "write about rust", true);
    let state = accept(state, JobKind::Generation, "job-1");
    let (state, _) = update(
        state,
        Msg::JobCompleted {
            job_id: "job-1".to_string(),
            payload: generation_done("Primary text"),
            at: 100,
        },
    );
    let state = accept(state, JobKind::Image, "job-2");

    let (state, effects) = update(
        state,
        Msg::JobFailed {
            job_id: "job-2".to_string(),
            kind: JobKind::Image,
            message: "gpu pool exhausted".to_string(),
        },
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.image, ImageSlot::Empty);
    assert_eq!(view.content, "Primary text");
    assert_eq!(view.notifications.len(), 1);

    // Duplicate failure delivery does not stack notifications.
    let (state, _) = update(
        state,
        Msg::JobFailed {
            job_id: "job-2".to_string(),
            kind: JobKind::Image,
            message: "gpu pool exhausted".to_string(),
        },
    );
    assert_eq!(state.view().notifications.len(), 1);
}
