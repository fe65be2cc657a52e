use std::{
    io::Write,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use tokio::{
    process::{Child, Command},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    process::spawn_with_retry, Adapter, Dispatch, EventHandler, EventPayload, LineDecoder,
    LineLimits, LineMux, NormalizedEvent, ObservabilityProvider, ResultSummary, RunError, RunMeta,
    RunState,
};

/// Everything the orchestrator needs to drive one provider process.
pub struct RunRequest {
    /// Fully built command (program, args, env, working dir). Pipe wiring is
    /// done by the orchestrator.
    pub command: Command,
    pub binary: PathBuf,
    pub meta: RunMeta,
    pub handler: Option<Arc<dyn EventHandler>>,
    pub observer: Option<Arc<dyn ObservabilityProvider>>,
    pub output: Option<Box<dyn Write + Send>>,
    pub timeout: Option<Duration>,
    pub limits: LineLimits,
}

impl RunRequest {
    pub fn new(command: Command, binary: impl Into<PathBuf>, meta: RunMeta) -> Self {
        Self {
            command,
            binary: binary.into(),
            meta,
            handler: None,
            observer: None,
            output: None,
            timeout: None,
            limits: LineLimits::default(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResult {
    pub text: String,
    pub session_id: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub num_turns: u32,
}

/// How long buffered output is still read after a kill. Descendants of the
/// CLI may hold the pipes open well past that.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Interrupt {
    Canceled,
    TimedOut,
}

async fn interrupted(cancel: &CancellationToken, deadline: Option<Instant>) -> Interrupt {
    match deadline {
        Some(deadline) => tokio::select! {
            _ = cancel.cancelled() => Interrupt::Canceled,
            _ = time::sleep_until(deadline) => Interrupt::TimedOut,
        },
        None => {
            cancel.cancelled().await;
            Interrupt::Canceled
        }
    }
}

fn kill(child: &mut Child, provider: &'static str, reason: Interrupt) {
    match reason {
        Interrupt::Canceled => info!(provider, "run canceled; killing agent process"),
        Interrupt::TimedOut => warn!(provider, "run timed out; killing agent process"),
    }
    if let Err(err) = child.start_kill() {
        debug!(provider, error = %err, "kill failed; process likely already exited");
    }
}

/// Runs one provider process to completion, feeding every decoded line
/// through `adapter`.
///
/// Lines keep being decoded after a kill until both pipes close or a short
/// grace period runs out. Only the final outcome depends on whether the run
/// was interrupted.
pub async fn run_process<A>(
    adapter: &mut A,
    request: RunRequest,
    cancel: &CancellationToken,
) -> Result<AgentResult, RunError>
where
    A: Adapter + ?Sized,
{
    let provider = adapter.provider();
    let RunRequest {
        mut command,
        binary,
        meta,
        handler,
        observer,
        output,
        timeout,
        limits,
    } = request;

    if cancel.is_cancelled() {
        return Err(RunError::Canceled);
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = spawn_with_retry(&mut command, &binary, provider)?;
    info!(provider, binary = %binary.display(), pid = ?child.id(), "agent process started");

    let stdout = child
        .stdout
        .take()
        .ok_or(RunError::StdoutUnavailable { provider })?;
    let stderr = child
        .stderr
        .take()
        .ok_or(RunError::StderrUnavailable { provider })?;

    let deadline = timeout.map(|t| started + t);
    let mut mux = LineMux::spawn(stdout, stderr, limits);
    let mut decoder = LineDecoder::new(limits.max_diagnostic_bytes);
    let mut state = RunState::new();
    let mut dispatch = Dispatch::new(meta)
        .with_handler(handler)
        .with_output(output)
        .with_observer(observer);
    let mut interrupt = None;
    let mut drain_until = None;
    let mut abandoned = false;

    loop {
        let next = if let Some(drain_until) = drain_until {
            match time::timeout_at(drain_until, mux.recv()).await {
                Ok(line) => line,
                Err(_) => {
                    warn!(provider, "output pipes still open after kill; abandoning readers");
                    abandoned = true;
                    break;
                }
            }
        } else {
            tokio::select! {
                line = mux.recv() => line,
                reason = interrupted(cancel, deadline) => {
                    kill(&mut child, provider, reason);
                    interrupt = Some(reason);
                    drain_until = Some(Instant::now() + KILL_DRAIN_GRACE);
                    continue;
                }
            }
        };
        let Some(line) = next else {
            break;
        };
        if let Some(decoded) = decoder.decode(&line) {
            adapter.classify(&decoded, &mut state, &mut dispatch);
        }
    }
    if abandoned {
        mux.abort();
    } else {
        mux.join().await;
    }

    let waited = loop {
        if interrupt.is_some() {
            break child.wait().await;
        }
        tokio::select! {
            status = child.wait() => break status,
            reason = interrupted(cancel, deadline) => {
                kill(&mut child, provider, reason);
                interrupt = Some(reason);
            }
        }
    };
    let diagnostics = decoder.into_diagnostics();

    let status = match waited {
        Ok(status) => status,
        Err(source) => {
            if cancel.is_cancelled() {
                return Err(RunError::Canceled);
            }
            return Err(RunError::Wait { provider, source });
        }
    };
    info!(
        provider,
        status = %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "agent process exited"
    );

    resolve(
        adapter,
        Finished {
            status,
            interrupt,
            canceled: cancel.is_cancelled(),
            timeout,
            diagnostics,
        },
        &mut state,
        &dispatch,
    )
}

struct Finished {
    status: ExitStatus,
    interrupt: Option<Interrupt>,
    canceled: bool,
    timeout: Option<Duration>,
    diagnostics: String,
}

fn resolve<A>(
    adapter: &A,
    exit: Finished,
    state: &mut RunState,
    dispatch: &Dispatch,
) -> Result<AgentResult, RunError>
where
    A: Adapter + ?Sized,
{
    let provider = adapter.provider();

    if exit.interrupt == Some(Interrupt::Canceled) || (exit.canceled && !exit.status.success()) {
        return Err(RunError::Canceled);
    }

    if exit.interrupt == Some(Interrupt::TimedOut) {
        let timeout = exit.timeout.unwrap_or_default();
        let message = format!("{provider} run timed out after {timeout:?}");
        synthesize_error(state, dispatch, &message);
        dispatch.record_completion(state, &message, true);
        return Err(RunError::Timeout { provider, timeout });
    }

    if !exit.status.success() {
        let message = state.failure_text(&exit.diagnostics).to_string();
        synthesize_error(state, dispatch, &message);
        dispatch.record_completion(state, &message, true);
        return Err(RunError::Exit {
            provider,
            status: exit.status,
            stderr: exit.diagnostics,
        });
    }

    if state.failed {
        let message = state.failure_text("").to_string();
        dispatch.record_completion(state, &message, true);
        return Err(RunError::ProviderFailure {
            provider,
            message,
            stderr: exit.diagnostics,
        });
    }

    let text = adapter.final_text(state);
    if !state.result_emitted {
        dispatch.emit(NormalizedEvent::new(EventPayload::Result(ResultSummary {
            text: text.clone(),
            subtype: Some("success".to_string()),
            cost_usd: state.cost_usd,
            duration_ms: state.duration_ms,
            num_turns: state.num_turns,
            is_error: false,
        })));
        state.mark_terminal(false);
    }
    dispatch.record_completion(state, &text, false);

    Ok(AgentResult {
        text,
        session_id: state.session_id.clone(),
        cost_usd: state.cost_usd,
        duration_ms: state.duration_ms,
        num_turns: state.num_turns,
    })
}

fn synthesize_error(state: &mut RunState, dispatch: &Dispatch, message: &str) {
    if state.result_emitted {
        return;
    }
    dispatch.emit(NormalizedEvent::new(EventPayload::ResultError(
        ResultSummary {
            text: message.to_string(),
            subtype: Some("error".to_string()),
            cost_usd: state.cost_usd,
            duration_ms: state.duration_ms,
            num_turns: state.num_turns,
            is_error: true,
        },
    )));
    state.mark_terminal(true);
}
