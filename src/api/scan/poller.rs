//! Scan status poller.
//!
//! [`PollMachine`] holds the transition rules and knows nothing about time or
//! I/O. [`poll_scan`] drives it against a [`ScanBackend`] on a fixed interval,
//! and [`PollHandle`] runs that loop as a background task that stops fetching
//! as soon as it is cancelled or dropped.

use std::{sync::Arc, time::Duration};

use crate::{
    api::traits::ScanBackend,
    core::task_manager::spawn_result_task,
    protocol::{
        types::{Scan, ScanStatus},
        ApiError,
    },
};

pub const SCAN_FAILED_FALLBACK: &str = "Scan failed";
pub const POLL_TIMEOUT_MESSAGE: &str = "Timeout. Please try again.";
pub const POLL_FETCH_ERROR_MESSAGE: &str = "Error checking status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 60,
        }
    }
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(Scan),
    /// The backend reported the scan as failed
    Failed { scan: Scan, message: String },
    /// `attempts` non-terminal snapshots in a row
    TimedOut { attempts: u32, last: Scan },
    /// A status fetch did not succeed. Never retried.
    FetchFailed { message: String, detail: String },
    Cancelled { last: Option<Scan> },
}

impl PollOutcome {
    /// User-facing message, `None` for success and cancellation.
    pub fn message(&self) -> Option<&str> {
        match self {
            PollOutcome::Completed(_) | PollOutcome::Cancelled { .. } => None,
            PollOutcome::Failed { message, .. } | PollOutcome::FetchFailed { message, .. } => {
                Some(message)
            }
            PollOutcome::TimedOut { .. } => Some(POLL_TIMEOUT_MESSAGE),
        }
    }

    /// Latest snapshot known when the poll ended.
    pub fn scan(&self) -> Option<&Scan> {
        match self {
            PollOutcome::Completed(scan) | PollOutcome::Failed { scan, .. } => Some(scan),
            PollOutcome::TimedOut { last, .. } => Some(last),
            PollOutcome::Cancelled { last } => last.as_ref(),
            PollOutcome::FetchFailed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Completed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Completed(_) => "completed",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::FetchFailed { .. } => "fetch_failed",
            PollOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Idle,
    Submitted { scan: Scan },
    Polling { attempts: u32, snapshot: Scan },
    Resolved(PollOutcome),
}

/// Identifies one status fetch. Later ticks compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(u32);

/// Result of feeding a fetch result into the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Response arrived after resolution or after a newer one; dropped
    Discarded,
    Continue { attempt: u32, scan: Scan },
    Resolved(PollOutcome),
}

#[derive(Debug)]
pub struct PollMachine {
    config: PollConfig,
    state: PollState,
    issued: u32,
    last_applied: u32,
    attempts: u32,
}

impl PollMachine {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            state: PollState::Idle,
            issued: 0,
            last_applied: 0,
            attempts: 0,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, PollState::Resolved(_))
    }

    pub fn outcome(&self) -> Option<&PollOutcome> {
        match &self.state {
            PollState::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Record the scan returned by the create call. A scan that is already
    /// terminal resolves right away and no polling is needed.
    pub fn submitted(&mut self, scan: Scan) -> Option<PollOutcome> {
        if self.is_resolved() {
            return None;
        }
        match terminal_outcome(&scan) {
            Some(outcome) => Some(self.resolve(outcome)),
            None => {
                self.state = PollState::Submitted { scan };
                None
            }
        }
    }

    pub fn begin_tick(&mut self) -> Tick {
        self.issued += 1;
        Tick(self.issued)
    }

    pub fn observe(&mut self, tick: Tick, result: Result<Scan, ApiError>) -> Step {
        if self.is_resolved() || tick.0 <= self.last_applied {
            log::debug!("Discarding status response for tick {}", tick.0);
            return Step::Discarded;
        }
        self.last_applied = tick.0;

        let scan = match result {
            Ok(scan) => scan,
            Err(err) => {
                log::warn!("Scan status fetch failed: {err}");
                return Step::Resolved(self.resolve(PollOutcome::FetchFailed {
                    message: POLL_FETCH_ERROR_MESSAGE.to_string(),
                    detail: err.to_string(),
                }));
            }
        };

        if let Some(outcome) = terminal_outcome(&scan) {
            return Step::Resolved(self.resolve(outcome));
        }

        self.attempts += 1;
        if self.attempts >= self.config.max_attempts {
            log::warn!(
                "Scan {} still {} after {} attempts",
                scan.id,
                scan.status,
                self.attempts
            );
            return Step::Resolved(self.resolve(PollOutcome::TimedOut {
                attempts: self.attempts,
                last: scan,
            }));
        }

        self.state = PollState::Polling {
            attempts: self.attempts,
            snapshot: scan.clone(),
        };
        Step::Continue {
            attempt: self.attempts,
            scan,
        }
    }

    /// Stop polling. Returns `None` when the poll had already resolved.
    pub fn cancel(&mut self) -> Option<PollOutcome> {
        let last = match &self.state {
            PollState::Resolved(_) => return None,
            PollState::Idle => None,
            PollState::Submitted { scan } => Some(scan.clone()),
            PollState::Polling { snapshot, .. } => Some(snapshot.clone()),
        };
        Some(self.resolve(PollOutcome::Cancelled { last }))
    }

    fn resolve(&mut self, outcome: PollOutcome) -> PollOutcome {
        self.state = PollState::Resolved(outcome.clone());
        outcome
    }
}

fn terminal_outcome(scan: &Scan) -> Option<PollOutcome> {
    match scan.status {
        ScanStatus::Completed => Some(PollOutcome::Completed(scan.clone())),
        ScanStatus::Failed => {
            let message = scan
                .error_message
                .as_deref()
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .unwrap_or(SCAN_FAILED_FALLBACK)
                .to_string();
            Some(PollOutcome::Failed {
                scan: scan.clone(),
                message,
            })
        }
        ScanStatus::Pending | ScanStatus::Processing => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Snapshot { attempt: u32, scan: Scan },
    Resolved(PollOutcome),
}

/// Follow a scan until it resolves.
///
/// The first fetch is issued immediately, the rest `config.interval` apart.
/// A message on `control`, or every sender of it going away, cancels the
/// poll between or during fetches.
pub async fn poll_scan<B: ScanBackend + ?Sized>(
    backend: &B,
    initial: Scan,
    config: &PollConfig,
    events: Option<&flume::Sender<PollEvent>>,
    control: &flume::Receiver<PollControl>,
) -> PollOutcome {
    let emit = |event: PollEvent| {
        if let Some(tx) = events {
            // receiver gone means nobody is watching, keep going
            let _ = tx.send(event);
        }
    };

    let mut machine = PollMachine::new(config.clone());
    let scan_id = initial.id.clone();
    if let Some(outcome) = machine.submitted(initial) {
        log::info!("Scan {scan_id} already terminal on submission");
        emit(PollEvent::Resolved(outcome.clone()));
        return outcome;
    }

    log::info!(
        "Polling scan {scan_id} every {}ms (max {} attempts)",
        config.interval.as_millis(),
        config.max_attempts
    );

    loop {
        let tick = machine.begin_tick();
        let step = tokio::select! {
            biased;
            _ = control.recv_async() => None,
            result = backend.fetch_scan(&scan_id) => Some(machine.observe(tick, result)),
        };

        match step {
            None => return cancelled(&mut machine, &scan_id, &emit),
            Some(Step::Resolved(outcome)) => {
                log::info!("Scan {scan_id} poll resolved: {}", outcome.label());
                emit(PollEvent::Resolved(outcome.clone()));
                return outcome;
            }
            Some(Step::Continue { attempt, scan }) => {
                log::debug!("Scan {scan_id} attempt {attempt}: {}", scan.status);
                emit(PollEvent::Snapshot { attempt, scan });
            }
            Some(Step::Discarded) => {}
        }

        tokio::select! {
            biased;
            _ = control.recv_async() => return cancelled(&mut machine, &scan_id, &emit),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

fn cancelled(
    machine: &mut PollMachine,
    scan_id: &str,
    emit: &impl Fn(PollEvent),
) -> PollOutcome {
    log::info!("Polling for scan {scan_id} cancelled");
    let outcome = machine
        .cancel()
        .unwrap_or(PollOutcome::Cancelled { last: None });
    emit(PollEvent::Resolved(outcome.clone()));
    outcome
}

/// Handle to a poll running in the background
///
/// Dropping the handle aborts the task, so no fetch is issued after the
/// owner goes away.
pub struct PollHandle {
    events: flume::Receiver<PollEvent>,
    control: flume::Sender<PollControl>,
    handle: Option<tokio::task::JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn spawn<B>(backend: Arc<B>, initial: Scan, config: PollConfig) -> Self
    where
        B: ScanBackend + ?Sized + 'static,
    {
        let (event_tx, event_rx) = flume::unbounded();
        let (control_tx, control_rx) = flume::unbounded();

        let handle = spawn_result_task("scan-poll", async move {
            poll_scan(
                backend.as_ref(),
                initial,
                &config,
                Some(&event_tx),
                &control_rx,
            )
            .await
        });

        Self {
            events: event_rx,
            control: control_tx,
            handle: Some(handle),
        }
    }

    pub fn events(&self) -> &flume::Receiver<PollEvent> {
        &self.events
    }

    pub fn try_recv(&self) -> Option<PollEvent> {
        self.events.try_recv().ok()
    }

    pub fn cancel(&self) {
        let _ = self.control.send(PollControl::Cancel);
    }

    /// Sender usable from elsewhere (a Ctrl-C handler) to cancel this poll.
    pub fn canceller(&self) -> flume::Sender<PollControl> {
        self.control.clone()
    }

    pub async fn wait(mut self) -> anyhow::Result<PollOutcome> {
        match self.handle.take() {
            Some(handle) => Ok(handle.await?),
            None => Err(anyhow::anyhow!("Poll task already consumed")),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
