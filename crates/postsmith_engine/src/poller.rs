use std::sync::mpsc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn, set_poll_tick};
use tokio_util::sync::CancellationToken;

use crate::api::JobApi;
use crate::types::{EngineEvent, JobKind, JobOutcome, JobStatus, TerminalResult};

/// Polling tunables. The values are not correctness-affecting; they
/// trade backend load against latency of observing a transition.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Fixed delay between status probes.
    pub interval: Duration,
    /// Consecutive transport failures tolerated before the job is
    /// surfaced as failed with a synthetic error.
    pub max_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_failures: 5,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Poll one job until a terminal state, cancellation, or the failure
/// bound is hit. Emits `StatusChanged` for observed transitions and
/// exactly one `Terminal`; stale statuses whose lifecycle rank would
/// regress are discarded.
pub async fn poll_job(
    api: &dyn JobApi,
    kind: JobKind,
    job_id: &str,
    settings: &PollSettings,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) {
    let mut tick: u64 = 0;
    let mut failures: u32 = 0;
    let mut last_rank: u8 = 0;
    let mut last_seen: Option<(JobStatus, Option<u8>)> = None;

    loop {
        if cancel.is_cancelled() {
            engine_debug!("observation of job {} cancelled", job_id);
            return;
        }
        tick += 1;
        set_poll_tick(tick);

        match api.status(job_id).await {
            Ok(snapshot) => {
                failures = 0;
                let status = snapshot.status;
                if status.rank() < last_rank {
                    engine_debug!("discarding stale status {:?} for job {}", status, job_id);
                } else {
                    last_rank = status.rank();
                    if status.is_terminal() {
                        let result = if status == JobStatus::Completed {
                            TerminalResult::Completed(JobOutcome::decode(kind, snapshot.result))
                        } else if status == JobStatus::Failed {
                            TerminalResult::Failed {
                                message: snapshot
                                    .error
                                    .unwrap_or_else(|| "job failed".to_string()),
                            }
                        } else {
                            TerminalResult::Cancelled
                        };
                        sink.emit(EngineEvent::Terminal {
                            job_id: job_id.to_owned(),
                            kind,
                            result,
                        });
                        return;
                    }
                    if last_seen != Some((status, snapshot.progress)) {
                        last_seen = Some((status, snapshot.progress));
                        sink.emit(EngineEvent::StatusChanged {
                            job_id: job_id.to_owned(),
                            kind,
                            status,
                            progress: snapshot.progress,
                        });
                    }
                }
            }
            Err(err) => {
                failures += 1;
                engine_warn!(
                    "status check failed for job {} ({}/{}): {}",
                    job_id,
                    failures,
                    settings.max_failures,
                    err
                );
                if failures >= settings.max_failures {
                    sink.emit(EngineEvent::Terminal {
                        job_id: job_id.to_owned(),
                        kind,
                        result: TerminalResult::Failed {
                            message: format!("status check failed: {err}"),
                        },
                    });
                    return;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}
