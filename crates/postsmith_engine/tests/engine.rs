use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use postsmith_engine::{
    EngineEvent, EngineHandle, JobApi, JobId, JobKind, JobOutcome, JobStatus, PollSettings,
    PromotionalVerdict, RateLimitNotice, StatusError, StatusSnapshot, SubmitError,
    TerminalResult,
};

fn test_poll_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(5),
        max_failures: 5,
    }
}

/// Hands out queued job ids on submit and replays per-job status
/// scripts; the last snapshot of a script repeats forever.
struct FakeApi {
    job_ids: Mutex<VecDeque<Result<JobId, SubmitError>>>,
    scripts: Mutex<HashMap<JobId, VecDeque<StatusSnapshot>>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            job_ids: Mutex::new(VecDeque::new()),
            scripts: Mutex::new(HashMap::new()),
        }
    }

    fn queue_submit(&self, result: Result<&str, SubmitError>) {
        self.job_ids
            .lock()
            .unwrap()
            .push_back(result.map(|id| id.to_string()));
    }

    fn script(&self, job_id: &str, statuses: Vec<StatusSnapshot>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), statuses.into());
    }
}

fn running() -> StatusSnapshot {
    StatusSnapshot {
        status: JobStatus::Running,
        progress: None,
        result: None,
        error: None,
    }
}

fn completed(result: serde_json::Value) -> StatusSnapshot {
    StatusSnapshot {
        status: JobStatus::Completed,
        progress: Some(100),
        result: Some(result),
        error: None,
    }
}

#[async_trait::async_trait]
impl JobApi for FakeApi {
    async fn submit(
        &self,
        _kind: JobKind,
        _payload: serde_json::Value,
    ) -> Result<JobId, SubmitError> {
        self.job_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(SubmitError::Rejected {
                    message: "no submission scripted".to_string(),
                })
            })
    }

    async fn status(&self, job_id: &str) -> Result<StatusSnapshot, StatusError> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(job_id)
            .ok_or_else(|| StatusError::Transport("unknown job".to_string()))?;
        if script.len() > 1 {
            Ok(script.pop_front().expect("non-empty script"))
        } else {
            script
                .front()
                .cloned()
                .ok_or_else(|| StatusError::Transport("empty script".to_string()))
        }
    }

    async fn classify(&self, content: &str) -> Result<PromotionalVerdict, SubmitError> {
        Ok(PromotionalVerdict {
            promotional: content.contains("buy"),
            suggested_disclosure: Some("#ad".to_string()),
        })
    }
}

/// Drain events until `done` matches one or the timeout expires.
fn drain_until(
    handle: &EngineHandle,
    timeout: Duration,
    done: impl Fn(&EngineEvent) -> bool,
) -> Vec<EngineEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while Instant::now() < deadline {
        while let Some(event) = handle.try_recv() {
            let finished = done(&event);
            events.push(event);
            if finished {
                return events;
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    events
}

#[test]
fn submission_is_polled_to_exactly_one_terminal() {
    let api = Arc::new(FakeApi::new());
    api.queue_submit(Ok("job-1"));
    api.script(
        "job-1",
        vec![
            running(),
            completed(serde_json::json!({ "text": "done", "prompt": "p" })),
        ],
    );

    let handle = EngineHandle::with_api(api, test_poll_settings());
    handle.submit(
        JobKind::Generation,
        serde_json::json!({ "prompt": "p" }),
    );

    let events = drain_until(&handle, Duration::from_secs(2), |event| {
        matches!(event, EngineEvent::Terminal { .. })
    });

    assert!(matches!(
        &events[0],
        EngineEvent::SubmissionAccepted { kind: JobKind::Generation, job_id } if job_id == "job-1"
    ));
    let terminals: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, EngineEvent::Terminal { .. }))
        .collect();
    assert_eq!(terminals.len(), 1);
    assert!(matches!(
        terminals[0],
        EngineEvent::Terminal {
            result: TerminalResult::Completed(JobOutcome::Generation { .. }),
            ..
        }
    ));
    handle.shutdown();
}

#[test]
fn rate_limited_submission_surfaces_as_failed_event() {
    let api = Arc::new(FakeApi::new());
    api.queue_submit(Err(SubmitError::RateLimited(RateLimitNotice {
        message: "hourly limit reached".to_string(),
        tier: "free".to_string(),
        hourly_remaining: 0,
    })));

    let handle = EngineHandle::with_api(api, test_poll_settings());
    handle.submit(JobKind::Generation, serde_json::json!({ "prompt": "p" }));

    let events = drain_until(&handle, Duration::from_secs(2), |event| {
        matches!(event, EngineEvent::SubmissionFailed { .. })
    });
    assert!(matches!(
        events.last(),
        Some(EngineEvent::SubmissionFailed {
            error: SubmitError::RateLimited(notice),
            ..
        }) if notice.hourly_remaining == 0 && notice.tier == "free"
    ));
    handle.shutdown();
}

#[test]
fn new_submission_of_same_kind_replaces_observer() {
    let api = Arc::new(FakeApi::new());
    api.queue_submit(Ok("job-1"));
    api.queue_submit(Ok("job-2"));
    // job-1 never finishes; job-2 completes promptly.
    api.script("job-1", vec![running()]);
    api.script(
        "job-2",
        vec![completed(serde_json::json!({ "text": "second" }))],
    );

    let handle = EngineHandle::with_api(api, test_poll_settings());
    handle.submit(JobKind::Generation, serde_json::json!({ "prompt": "a" }));
    let accepted = drain_until(&handle, Duration::from_secs(2), |event| {
        matches!(event, EngineEvent::SubmissionAccepted { .. })
    });
    assert!(!accepted.is_empty());

    handle.submit(JobKind::Generation, serde_json::json!({ "prompt": "b" }));
    let mut events = drain_until(&handle, Duration::from_secs(2), |event| {
        matches!(event, EngineEvent::Terminal { .. })
    });

    // Give the replaced observer time to misbehave if it was going to.
    std::thread::sleep(Duration::from_millis(50));
    while let Some(event) = handle.try_recv() {
        events.push(event);
    }

    let terminal_ids: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Terminal { job_id, .. } => Some(job_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(terminal_ids, vec!["job-2"]);
    handle.shutdown();
}

#[test]
fn independent_kinds_are_observed_concurrently() {
    let api = Arc::new(FakeApi::new());
    api.queue_submit(Ok("gen-1"));
    api.queue_submit(Ok("img-1"));
    api.script(
        "gen-1",
        vec![
            running(),
            completed(serde_json::json!({ "text": "the text" })),
        ],
    );
    api.script(
        "img-1",
        vec![completed(serde_json::json!({ "data": "bytes" }))],
    );

    let handle = EngineHandle::with_api(api, test_poll_settings());
    handle.submit(JobKind::Generation, serde_json::json!({ "prompt": "a" }));
    handle.submit(JobKind::Image, serde_json::json!({ "prompt": "b" }));

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut terminal_ids = Vec::new();
    while Instant::now() < deadline && terminal_ids.len() < 2 {
        while let Some(event) = handle.try_recv() {
            if let EngineEvent::Terminal { job_id, .. } = event {
                terminal_ids.push(job_id);
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    terminal_ids.sort();
    assert_eq!(terminal_ids, vec!["gen-1", "img-1"]);
    handle.shutdown();
}

#[test]
fn classification_round_trips_through_the_engine() {
    let api = Arc::new(FakeApi::new());
    let handle = EngineHandle::with_api(api, test_poll_settings());
    handle.classify("please buy this");

    let events = drain_until(&handle, Duration::from_secs(2), |event| {
        matches!(event, EngineEvent::ClassificationReady { .. })
    });
    assert!(matches!(
        events.last(),
        Some(EngineEvent::ClassificationReady { verdict }) if verdict.promotional
    ));
    handle.shutdown();
}
