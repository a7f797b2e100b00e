//! Background tasks of an initialized reader.
//!
//! ```text
//! ┌──────────┐  mpsc   ┌────────────┐
//! │ Driver   │────────►│ Event pump │──► SessionCore::ingest_*
//! │ callback │         └────────────┘
//! └──────────┘
//!                      ┌────────────┐
//!          interval ──►│ Watchdog   │──► SessionCore::check_key_timeouts
//!                      └────────────┘
//! ```
//!
//! Both tasks stop on a shared cancellation token at `free`. Dropping the
//! task set aborts whatever is still running.

use crate::session::SessionCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uhf_hardware::DriverEvent;

/// Task termination classification for shutdown handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    /// Task returned normally.
    Completed,
    /// Task was aborted.
    Cancelled,
    /// Task panicked.
    Panic,
}

impl TaskTermination {
    fn classify(result: std::result::Result<(), tokio::task::JoinError>) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Panic,
        }
    }
}

/// Running event pump and watchdog.
#[derive(Debug)]
pub(crate) struct BackgroundTasks {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl BackgroundTasks {
    /// Spawn the watchdog, and the event pump when a stream is available.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn(
        core: Arc<SessionCore>,
        events: Option<mpsc::Receiver<DriverEvent>>,
        check_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        match events {
            Some(rx) => {
                tasks.spawn(event_pump(Arc::clone(&core), rx, cancel.clone()));
            }
            None => warn!("driver event stream unavailable, raw events must be ingested directly"),
        }
        tasks.spawn(key_watchdog(core, check_interval, cancel.clone()));

        Self { cancel, tasks }
    }

    /// Signal both tasks to stop and wait for them.
    pub(crate) async fn shutdown(mut self) {
        self.cancel.cancel();

        let mut panics = 0usize;
        while let Some(result) = self.tasks.join_next().await {
            if TaskTermination::classify(result) == TaskTermination::Panic {
                panics += 1;
            }
        }

        if panics > 0 {
            error!(panics, "background reader task panicked");
        } else {
            debug!("background reader tasks stopped");
        }
    }
}

async fn event_pump(
    core: Arc<SessionCore>,
    mut rx: mpsc::Receiver<DriverEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(DriverEvent::TagRead(read)) => core.ingest_tag(&read),
                Some(DriverEvent::Key(key)) => core.ingest_key(key),
                Some(other) => debug!(?other, "unhandled driver event"),
                None => {
                    warn!("driver event stream closed");
                    break;
                }
            },
        }
    }
}

async fn key_watchdog(core: Arc<SessionCore>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                core.check_key_timeouts();
            }
        }
    }
}
