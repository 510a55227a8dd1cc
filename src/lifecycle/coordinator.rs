//! Shutdown coordinator.
//!
//! # Responsibilities
//! - Wire listener, channel, acceptor and sink together
//! - Race a termination signal against acceptor and sink failures
//! - Drive the ordered shutdown: grace period, cancel, bounded drain, close channel,
//!   wait for the sink
//!
//! # States
//! ```text
//! Starting → Serving → Draining → Stopped
//! Starting → Stopped            (setup failure)
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::config::DaemonConfig;
use crate::error::{DaemonError, StartupError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::{TerminationKind, TerminationSignals};
use crate::lifecycle::startup;
use crate::net::Accept;
use crate::pipeline::{self, LineOutput, LineSink, Output, ReaderOptions, ServeSummary, SinkStats};

/// Process lifecycle state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DaemonState::Starting => "starting",
            DaemonState::Serving => "serving",
            DaemonState::Draining => "draining",
            DaemonState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

fn enter(state: DaemonState) {
    tracing::info!(state = %state, "Daemon state changed");
}

/// Timing and sizing for one run.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub grace_period: Duration,
    pub drain_timeout: Duration,
    pub channel_capacity: usize,
    pub reader: ReaderOptions,
}

impl From<&DaemonConfig> for CoordinatorOptions {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            grace_period: config.shutdown.grace_period(),
            drain_timeout: config.shutdown.drain_timeout(),
            channel_capacity: config.pipeline.channel_capacity,
            reader: ReaderOptions::from(&config.pipeline),
        }
    }
}

/// What a clean run produced.
#[derive(Debug)]
pub struct RunReport<W> {
    /// The output, handed back by the sink after its final sync.
    pub output: W,
    pub sink: SinkStats,
    pub serve: ServeSummary,
    /// The signal that ended the run, if any.
    pub signal: Option<TerminationKind>,
    /// Readers had to be aborted because they outlived the drain timeout.
    pub drain_timed_out: bool,
}

fn joined<T, E>(task: &'static str, result: Result<Result<T, E>, JoinError>) -> Result<T, DaemonError>
where
    E: Into<DaemonError>,
{
    match result {
        Ok(inner) => inner.map_err(Into::into),
        Err(source) => Err(DaemonError::Task { task, source }),
    }
}

/// Serve until `termination` resolves or a fatal error occurs, then shut down in order.
pub async fn run_until<L, W, F>(
    listener: L,
    output: W,
    options: CoordinatorOptions,
    termination: F,
) -> Result<RunReport<W>, DaemonError>
where
    L: Accept,
    W: LineOutput,
    F: Future<Output = TerminationKind>,
{
    let shutdown = Shutdown::new();
    let (lines_tx, lines_rx) = mpsc::channel(options.channel_capacity.max(1));

    let mut sink_task = tokio::spawn(LineSink::new(output).run(lines_rx));
    let mut serve_task = tokio::spawn(pipeline::serve(
        listener,
        lines_tx.clone(),
        shutdown.clone(),
        options.reader,
    ));
    enter(DaemonState::Serving);

    let mut failure: Option<DaemonError> = None;
    let mut serve = ServeSummary::default();
    let mut serve_done = false;
    let mut sink_done = None;
    let mut signal = None;

    tokio::pin!(termination);
    tokio::select! {
        kind = &mut termination => {
            tracing::info!(
                signal = %kind,
                grace_period_ms = options.grace_period.as_millis() as u64,
                "Termination signal received"
            );
            signal = Some(kind);
            tokio::time::sleep(options.grace_period).await;
        }
        result = &mut serve_task => {
            serve_done = true;
            match joined("acceptor", result) {
                Ok(summary) => {
                    tracing::warn!("Accept loop exited without a shutdown request");
                    serve = summary;
                }
                Err(e) => failure = Some(e),
            }
        }
        result = &mut sink_task => {
            tracing::error!("Line sink stopped while serving");
            sink_done = Some(result);
        }
    }

    enter(DaemonState::Draining);
    shutdown.trigger();

    let mut drain_timed_out = false;
    if !serve_done {
        let result = match tokio::time::timeout(options.drain_timeout, &mut serve_task).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    drain_timeout_ms = options.drain_timeout.as_millis() as u64,
                    "Connections did not drain in time, aborting readers"
                );
                drain_timed_out = true;
                // Dropping the acceptor drops its join set, which aborts every reader.
                serve_task.abort();
                serve_task.await
            }
        };

        match result {
            Err(e) if e.is_cancelled() => {}
            result => match joined("acceptor", result) {
                Ok(summary) => serve = summary,
                Err(e) => {
                    failure.get_or_insert(e);
                }
            },
        }
    }

    // Last sender: the channel closes here and the sink drains what is left.
    drop(lines_tx);
    let sink_result = match sink_done {
        Some(result) => result,
        None => sink_task.await,
    };
    let sink = joined("sink", sink_result);

    enter(DaemonState::Stopped);

    if let Some(e) = failure {
        return Err(e);
    }
    let (output, sink) = sink?;

    Ok(RunReport {
        output,
        sink,
        serve,
        signal,
        drain_timed_out,
    })
}

/// Run the daemon with OS signal handling until it stops.
pub async fn run(config: &DaemonConfig) -> Result<RunReport<Output>, DaemonError> {
    enter(DaemonState::Starting);

    let started = async {
        let signals = TerminationSignals::install().map_err(StartupError::Signal)?;
        let resources = startup::start(config).await?;
        Ok::<_, StartupError>((signals, resources))
    }
    .await;

    let (mut signals, resources) = match started {
        Ok(started) => started,
        Err(e) => {
            enter(DaemonState::Stopped);
            return Err(e.into());
        }
    };

    run_until(
        resources.listener,
        resources.output,
        CoordinatorOptions::from(config),
        async move { signals.recv().await },
    )
    .await
}
