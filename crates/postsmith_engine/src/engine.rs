use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use engine_logging::{engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiSettings, JobApi, ReqwestJobApi};
use crate::poller::{poll_job, ChannelEventSink, EventSink, PollSettings};
use crate::types::{EngineEvent, JobId, JobKind};

enum EngineCommand {
    Submit {
        kind: JobKind,
        payload: serde_json::Value,
    },
    Classify {
        content: String,
    },
    Cancel {
        job_id: JobId,
    },
    Shutdown,
}

/// One live observer per job kind. Submitting a new job of a kind
/// cancels the poller still watching that kind's previous id.
type Observers = Arc<Mutex<HashMap<JobKind, (JobId, CancellationToken)>>>;

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(api: ApiSettings, poll: PollSettings) -> Self {
        Self::with_api(Arc::new(ReqwestJobApi::new(api)), poll)
    }

    /// Build against any [`JobApi`] implementation; tests inject
    /// scripted fakes here.
    pub fn with_api(api: Arc<dyn JobApi>, poll: PollSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let observers: Observers = Arc::new(Mutex::new(HashMap::new()));

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                if matches!(command, EngineCommand::Shutdown) {
                    break;
                }
                let api = api.clone();
                let event_tx = event_tx.clone();
                let observers = observers.clone();
                let poll = poll.clone();
                runtime.spawn(async move {
                    handle_command(api, command, poll, observers, event_tx).await;
                });
            }
            // Stop every live poller before the runtime is torn down.
            let observers = observers.lock().expect("lock observers");
            for (job_id, token) in observers.values() {
                engine_info!("cancelling observation of job {} on shutdown", job_id);
                token.cancel();
            }
        });

        Self { cmd_tx, event_rx }
    }

    /// Submit a job and, on acceptance, start observing it.
    pub fn submit(&self, kind: JobKind, payload: serde_json::Value) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { kind, payload });
    }

    pub fn classify(&self, content: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Classify {
            content: content.into(),
        });
    }

    /// Stop observing a job. Client-side only; the backend job keeps
    /// running.
    pub fn cancel(&self, job_id: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel {
            job_id: job_id.into(),
        });
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn handle_command(
    api: Arc<dyn JobApi>,
    command: EngineCommand,
    poll: PollSettings,
    observers: Observers,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelEventSink::new(event_tx);
    match command {
        EngineCommand::Submit { kind, payload } => {
            match api.submit(kind, payload).await {
                Ok(job_id) => {
                    let token = CancellationToken::new();
                    {
                        let mut map = observers.lock().expect("lock observers");
                        if let Some((old_id, old_token)) =
                            map.insert(kind, (job_id.clone(), token.clone()))
                        {
                            engine_info!("replacing {} observer, dropping job {}", kind, old_id);
                            old_token.cancel();
                        }
                    }
                    sink.emit(EngineEvent::SubmissionAccepted {
                        kind,
                        job_id: job_id.clone(),
                    });
                    poll_job(api.as_ref(), kind, &job_id, &poll, &sink, &token).await;
                    let mut map = observers.lock().expect("lock observers");
                    if map.get(&kind).is_some_and(|(id, _)| id == &job_id) {
                        map.remove(&kind);
                    }
                }
                Err(error) => {
                    engine_warn!("{} submission failed: {}", kind, error);
                    sink.emit(EngineEvent::SubmissionFailed { kind, error });
                }
            }
        }
        EngineCommand::Classify { content } => match api.classify(&content).await {
            Ok(verdict) => sink.emit(EngineEvent::ClassificationReady { verdict }),
            Err(error) => sink.emit(EngineEvent::SubmissionFailed {
                kind: JobKind::Analysis,
                error,
            }),
        },
        EngineCommand::Cancel { job_id } => {
            let mut map = observers.lock().expect("lock observers");
            let kind = map
                .iter()
                .find(|(_, (id, _))| id == &job_id)
                .map(|(kind, _)| *kind);
            if let Some(kind) = kind {
                if let Some((_, token)) = map.remove(&kind) {
                    engine_info!("cancelled observation of {} job {}", kind, job_id);
                    token.cancel();
                }
            }
        }
        EngineCommand::Shutdown => {}
    }
}
