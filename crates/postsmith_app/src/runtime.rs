use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use engine_logging::{engine_info, engine_warn};
use postsmith_core::{
    update, AnalysisIssue, AnalysisReport, AppState, AppViewModel, Effect, GenerationOutcome,
    ImageOutcome, ImageSlot, JobPayload, Msg, RateLimitNotice, Role, SubmitFailure,
};
use postsmith_engine::{
    ApiSettings, EngineEvent, EngineHandle, JobOutcome, PollSettings, SubmitError, TerminalResult,
};

use crate::persistence;

/// One line of user input, parsed off the stdin thread.
enum Input {
    Core(Msg),
    ToggleImage(bool),
    Submit(String),
    Quit,
}

pub(crate) fn run(base_url: String, owner_id: String, state_dir: PathBuf) -> anyhow::Result<()> {
    let engine = EngineHandle::new(ApiSettings::new(base_url, owner_id), PollSettings::default());
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let (input_tx, input_rx) = mpsc::channel::<Input>();

    thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if let Some(input) = parse_input(&line) {
                if input_tx.send(input).is_err() {
                    return;
                }
            }
        }
        let _ = input_tx.send(Input::Quit);
    });

    let mut runtime = Runtime {
        state: AppState::new(),
        engine,
        msg_tx,
        with_image: false,
        quit: false,
    };

    let archived = persistence::load_conversation(&state_dir);
    if !archived.is_empty() {
        runtime.dispatch(Msg::RestoreConversation(archived));
    }

    println!("postsmith: type a prompt, or :help for commands");
    loop {
        while let Some(event) = runtime.engine.try_recv() {
            let msg = map_event(event);
            runtime.dispatch(msg);
        }
        while let Ok(msg) = msg_rx.try_recv() {
            runtime.dispatch(msg);
        }
        while let Ok(input) = input_rx.try_recv() {
            runtime.handle_input(input);
        }
        if runtime.quit {
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }

    persistence::save_conversation(&state_dir, &runtime.state.conversation_snapshot());
    runtime.engine.shutdown();
    Ok(())
}

struct Runtime {
    state: AppState,
    engine: EngineHandle,
    msg_tx: mpsc::Sender<Msg>,
    with_image: bool,
    quit: bool,
}

impl Runtime {
    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;
        self.run_effects(effects);
        if was_dirty {
            render(&view);
        }
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Core(msg) => self.dispatch(msg),
            Input::ToggleImage(on) => {
                self.with_image = on;
                engine_info!("image generation opt-in: {}", on);
            }
            Input::Submit(line) => {
                self.dispatch(Msg::PromptChanged(line));
                let with_image = self.with_image;
                self.dispatch(Msg::PromptSubmitted { with_image });
            }
            Input::Quit => self.quit = true,
        }
    }

    fn run_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitGeneration { prompt } => {
                    engine_info!("submitting generation, prompt_len={}", prompt.len());
                    self.engine.submit(
                        postsmith_engine::JobKind::Generation,
                        serde_json::json!({ "prompt": prompt }),
                    );
                }
                Effect::SubmitImage { prompt } => {
                    engine_info!("submitting image, prompt_len={}", prompt.len());
                    self.engine.submit(
                        postsmith_engine::JobKind::Image,
                        serde_json::json!({ "prompt": prompt }),
                    );
                }
                Effect::ClassifyContent { content } => {
                    self.engine.classify(content);
                }
                Effect::SubmitAnalysis { content } => {
                    engine_info!("submitting analysis, content_len={}", content.len());
                    self.engine.submit(
                        postsmith_engine::JobKind::Analysis,
                        serde_json::json!({ "content": content }),
                    );
                }
                Effect::SubmitRewrite { content } => {
                    engine_info!("submitting auto-rewrite, content_len={}", content.len());
                    self.engine.submit(
                        postsmith_engine::JobKind::Rewrite,
                        serde_json::json!({ "content": content }),
                    );
                }
                Effect::ScheduleRewrite {
                    content_version,
                    delay,
                } => {
                    let tx = self.msg_tx.clone();
                    thread::spawn(move || {
                        thread::sleep(delay);
                        let _ = tx.send(Msg::RewriteTimerElapsed { content_version });
                    });
                }
                Effect::CancelJob { job_id } => {
                    self.engine.cancel(job_id);
                }
            }
        }
    }
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(command) = line.strip_prefix(':') {
        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        return match name {
            "quit" => Some(Input::Quit),
            "image" => Some(Input::ToggleImage(rest.trim() == "on")),
            "analyze" => Some(Input::Core(Msg::AnalysisRequested)),
            "accept" => Some(Input::Core(Msg::DisclosureAccepted)),
            "decline" => Some(Input::Core(Msg::DisclosureDeclined)),
            "clear" => Some(Input::Core(Msg::ContentCleared)),
            "edit" => Some(Input::Core(Msg::ContentEdited(rest.trim().to_string()))),
            "regen" => Some(Input::Core(Msg::RegenerateImageClicked)),
            "dismiss" => rest
                .trim()
                .parse()
                .ok()
                .map(|index| Input::Core(Msg::NotificationDismissed(index))),
            "help" => {
                print_help();
                None
            }
            _ => {
                engine_warn!("unknown command :{}", name);
                None
            }
        };
    }
    Some(Input::Submit(line.to_string()))
}

fn print_help() {
    println!(
        "commands: :image on|off  :analyze  :accept  :decline  :clear  \
         :edit <text>  :regen  :dismiss <n>  :quit"
    );
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SubmissionAccepted { kind, job_id } => Msg::SubmissionAccepted {
            kind: map_kind(kind),
            job_id,
        },
        EngineEvent::SubmissionFailed { kind, error } => Msg::SubmissionFailed {
            kind: map_kind(kind),
            failure: map_failure(error),
        },
        EngineEvent::StatusChanged {
            job_id,
            kind,
            status,
            progress,
        } => Msg::JobStatusChanged {
            job_id,
            kind: map_kind(kind),
            status: map_status(status),
            progress,
        },
        EngineEvent::Terminal {
            job_id,
            kind,
            result,
        } => match result {
            TerminalResult::Completed(outcome) => Msg::JobCompleted {
                job_id,
                payload: map_payload(outcome),
                at: Utc::now().timestamp(),
            },
            TerminalResult::Failed { message } => Msg::JobFailed {
                job_id,
                kind: map_kind(kind),
                message,
            },
            TerminalResult::Cancelled => Msg::JobCancelled {
                job_id,
                kind: map_kind(kind),
            },
        },
        EngineEvent::ClassificationReady { verdict } => Msg::ClassificationReady {
            promotional: verdict.promotional,
            suggested_disclosure: verdict.suggested_disclosure,
        },
    }
}

fn map_kind(kind: postsmith_engine::JobKind) -> postsmith_core::JobKind {
    match kind {
        postsmith_engine::JobKind::Generation => postsmith_core::JobKind::Generation,
        postsmith_engine::JobKind::Image => postsmith_core::JobKind::Image,
        postsmith_engine::JobKind::Analysis => postsmith_core::JobKind::Analysis,
        postsmith_engine::JobKind::Rewrite => postsmith_core::JobKind::Rewrite,
    }
}

fn map_status(status: postsmith_engine::JobStatus) -> postsmith_core::JobStatus {
    match status {
        postsmith_engine::JobStatus::Queued => postsmith_core::JobStatus::Queued,
        postsmith_engine::JobStatus::Running => postsmith_core::JobStatus::Running,
        postsmith_engine::JobStatus::Completed => postsmith_core::JobStatus::Completed,
        postsmith_engine::JobStatus::Failed => postsmith_core::JobStatus::Failed,
        postsmith_engine::JobStatus::Cancelled => postsmith_core::JobStatus::Cancelled,
    }
}

fn map_payload(outcome: JobOutcome) -> JobPayload {
    match outcome {
        JobOutcome::Generation { text, prompt } => {
            JobPayload::Generation(GenerationOutcome { text, prompt })
        }
        JobOutcome::Image { data } => JobPayload::Image(ImageOutcome { data }),
        JobOutcome::Analysis {
            overall_score,
            issues,
        } => JobPayload::Analysis(AnalysisReport {
            overall_score,
            issues: issues.map(|issues| {
                issues
                    .into_iter()
                    .map(|issue| AnalysisIssue {
                        category: issue.category,
                        message: issue.message,
                    })
                    .collect()
            }),
        }),
        JobOutcome::Rewrite { text } => JobPayload::Rewrite(GenerationOutcome {
            text,
            prompt: None,
        }),
    }
}

fn map_failure(error: SubmitError) -> SubmitFailure {
    match error {
        SubmitError::RateLimited(notice) => SubmitFailure::RateLimited(RateLimitNotice {
            message: notice.message,
            tier: notice.tier,
            hourly_remaining: notice.hourly_remaining,
        }),
        other => SubmitFailure::Rejected {
            message: other.to_string(),
        },
    }
}

fn render(view: &AppViewModel) {
    for entry in view.conversation.iter().rev().take(4).rev() {
        let tag = match entry.role {
            Role::User => "you",
            Role::Assistant => "postsmith",
        };
        println!("[{tag}] {}", entry.content);
    }
    for job in &view.jobs {
        let progress = job
            .progress
            .map(|p| format!(" {p}%"))
            .unwrap_or_default();
        println!("  job {} {} {:?}{}", job.job_id, job.kind, job.status, progress);
    }
    if let Some(analysis) = &view.analysis {
        if let Some(score) = analysis.overall_score {
            println!("  analysis score: {score}/100");
        }
        if let Some(issues) = &analysis.issues {
            for issue in issues {
                println!("  issue [{}] {}", issue.category, issue.message);
            }
        }
    }
    if let Some(suggestion) = &view.disclosure_prompt {
        println!("  promotional content detected. suggested disclosure:");
        println!("    {suggestion}");
        println!("  :accept to add it, :decline to analyze as-is");
    }
    if let Some(limit) = &view.rate_limit {
        println!(
            "  rate limited ({} tier): {}, {} left this hour",
            limit.tier, limit.message, limit.hourly_remaining
        );
    }
    match &view.image {
        ImageSlot::Pending => println!("  image: generating..."),
        ImageSlot::Ready(_) => println!("  image: ready"),
        ImageSlot::Missing => println!("  image: missing, :regen to retry"),
        ImageSlot::Empty => {}
    }
    for (index, note) in view.notifications.iter().enumerate() {
        println!("  ({index}) {note}");
    }
}
