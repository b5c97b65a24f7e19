//! Polls a transcription job until it reaches a terminal state.
//!
//! One [`ProgressMonitor`] is created per upload attempt and never reused.
//! The poll loop is chained: a tick's fetch is awaited and its result applied
//! (subscribers included) before the loop waits for the next tick. Every fetch
//! is tagged with the generation it was issued under and a tick sequence
//! number; results from a cancelled generation or older than the last applied
//! tick are discarded wholesale, partial captions included.

use crate::captions::CaptionTrack;
use crate::client::JobStatusClient;
use crate::error::{ClientError, JobError, MonitorError};
use crate::job::{JobResult, JobState, JobStatus};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// A status fetch still pending after this long counts as a failed tick.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub type JobOutcome = Result<JobResult, JobError>;

type SnapshotCallback = Box<dyn FnMut(&JobStatus) + Send>;
type TerminalCallback = Box<dyn FnOnce(JobOutcome) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle,
    Polling,
    /// Absorbing. A new job needs a new monitor.
    Terminated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollState {
    pub consecutive_failures: u32,
    pub last_known_status: Option<JobStatus>,
    pub phase: MonitorPhase,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            last_known_status: None,
            phase: MonitorPhase::Idle,
        }
    }
}

#[derive(Default)]
struct MonitorState {
    poll: PollState,
    generation: u64,
    last_issued_tick: u64,
    last_applied_tick: u64,
    outcome: Option<JobOutcome>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Subscribers {
    snapshot: Vec<SnapshotCallback>,
    terminal: Vec<TerminalCallback>,
}

/// Lock order is always `state`, then the caption track, then `subscribers`.
#[derive(Default)]
struct Shared {
    state: Mutex<MonitorState>,
    subscribers: Mutex<Subscribers>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickFlow {
    Continue,
    Stop,
}

pub struct ProgressMonitor {
    client: Arc<dyn JobStatusClient>,
    failure_threshold: u32,
    fetch_timeout: Duration,
    captions: CaptionTrack,
    shared: Arc<Shared>,
}

impl ProgressMonitor {
    pub fn new(client: Arc<dyn JobStatusClient>) -> Self {
        Self {
            client,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            captions: CaptionTrack::new(),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Partial captions streamed by the job, appended as snapshots arrive.
    pub fn captions(&self) -> CaptionTrack {
        self.captions.clone()
    }

    pub fn phase(&self) -> MonitorPhase {
        self.shared.state().poll.phase
    }

    pub fn poll_state(&self) -> PollState {
        self.shared.state().poll.clone()
    }

    pub fn outcome(&self) -> Option<JobOutcome> {
        self.shared.state().outcome.clone()
    }

    /// Start polling on the current tokio runtime. Does not block: one
    /// immediate fetch detects a job that is already running or finished, then
    /// `fetch_status` runs every `interval`.
    pub fn start(&self, interval: Duration) -> Result<(), MonitorError> {
        let mut state = self.shared.state();
        if state.poll.phase != MonitorPhase::Idle {
            return Err(MonitorError::AlreadyRunning);
        }
        state.poll.phase = MonitorPhase::Polling;
        state.generation += 1;

        let poller = Poller {
            client: self.client.clone(),
            shared: self.shared.clone(),
            captions: self.captions.clone(),
            failure_threshold: self.failure_threshold,
            fetch_timeout: self.fetch_timeout,
            generation: state.generation,
        };
        let interval = interval.max(Duration::from_millis(1));
        info!(
            "[monitor] polling every {:?} (failure threshold {})",
            interval, self.failure_threshold
        );
        state.task = Some(tokio::spawn(poller.run(interval)));
        Ok(())
    }

    /// Cancel polling. Idempotent. Results of fetches already in flight are
    /// discarded. Terminal subscribers are dropped without being called unless
    /// the outcome is already known, in which case they are still notified.
    pub fn stop(&self) {
        let mut state = self.shared.state();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if state.poll.phase != MonitorPhase::Terminated {
            debug!("[monitor] stopped in phase {:?}", state.poll.phase);
            state.poll.phase = MonitorPhase::Terminated;
        }
        let dropped = if state.outcome.is_none() {
            std::mem::take(&mut self.shared.subscribers().terminal)
        } else {
            Vec::new()
        };
        drop(state);
        drop(dropped);
    }

    /// Called with every snapshot fetched while polling.
    pub fn on_snapshot(&self, callback: impl FnMut(&JobStatus) + Send + 'static) {
        self.shared.subscribers().snapshot.push(Box::new(callback));
    }

    /// Called exactly once with the job's outcome. Registering after the
    /// outcome is known calls `callback` right away.
    pub fn on_terminal(&self, callback: impl FnOnce(JobOutcome) + Send + 'static) {
        let state = self.shared.state();
        let outcome = state.outcome.clone();
        match outcome {
            Some(outcome) => {
                drop(state);
                callback(outcome);
            }
            None if state.poll.phase == MonitorPhase::Terminated => {
                debug!("[monitor] terminal subscriber registered after stop, dropping");
            }
            None => {
                self.shared.subscribers().terminal.push(Box::new(callback));
            }
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The spawned side of a monitor: owns the loop for one generation.
struct Poller {
    client: Arc<dyn JobStatusClient>,
    shared: Arc<Shared>,
    captions: CaptionTrack,
    failure_threshold: u32,
    fetch_timeout: Duration,
    generation: u64,
}

impl Poller {
    async fn run(self, interval: Duration) {
        // Initial probe: same classification as a tick, but a failure is not counted.
        let Some(tick) = self.issue() else { return };
        match self.fetch().await {
            Ok(status) => {
                if self.apply_snapshot(tick, status) == TickFlow::Stop {
                    return;
                }
            }
            Err(e) => debug!("[monitor] initial status probe failed: {}", e),
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(tick) = self.issue() else { return };
            let flow = match self.fetch().await {
                Ok(status) => self.apply_snapshot(tick, status),
                Err(e) => self.apply_failure(tick, e),
            };
            if flow == TickFlow::Stop {
                return;
            }
        }
    }

    async fn fetch(&self) -> Result<JobStatus, ClientError> {
        match tokio::time::timeout(self.fetch_timeout, self.client.fetch_status()).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Allocate a tick number, or `None` if this generation was cancelled.
    fn issue(&self) -> Option<u64> {
        let mut state = self.shared.state();
        if state.generation != self.generation || state.poll.phase != MonitorPhase::Polling {
            return None;
        }
        state.last_issued_tick += 1;
        Some(state.last_issued_tick)
    }

    /// Returns `None` when the result must be dropped.
    fn accept(&self, state: &mut MonitorState, tick: u64) -> Option<TickFlow> {
        if state.generation != self.generation || state.poll.phase != MonitorPhase::Polling {
            debug!("[monitor] discarding tick {} from a cancelled generation", tick);
            return Some(TickFlow::Stop);
        }
        if tick <= state.last_applied_tick {
            debug!(
                "[monitor] discarding stale tick {} (already applied {})",
                tick, state.last_applied_tick
            );
            return Some(TickFlow::Continue);
        }
        state.last_applied_tick = tick;
        None
    }

    fn terminate(&self, state: &mut MonitorState, outcome: JobOutcome) {
        state.poll.phase = MonitorPhase::Terminated;
        state.generation += 1;
        // Dropping the handle detaches this task; it returns on its own.
        state.task = None;
        state.outcome = Some(outcome);
    }

    fn apply_snapshot(&self, tick: u64, status: JobStatus) -> TickFlow {
        let (terminal, added) = {
            let mut state = self.shared.state();
            if let Some(flow) = self.accept(&mut state, tick) {
                return flow;
            }
            state.poll.consecutive_failures = 0;
            state.poll.last_known_status = Some(status.clone());

            let outcome = match status.classify() {
                JobState::Pending => None,
                JobState::Succeeded(result) => Some(Ok(result)),
                JobState::Failed(e) => Some(Err(e)),
            };
            if let Some(outcome) = &outcome {
                self.terminate(&mut state, outcome.clone());
            }
            (outcome, self.captions.append_from(&status.partial_captions))
        };

        debug!(
            "[monitor] tick {}: {}% '{}' (+{} captions)",
            tick, status.progress, status.current_stage, added
        );
        // Run callbacks outside the lock so they may call `stop` or subscribe.
        let mut callbacks = std::mem::take(&mut self.shared.subscribers().snapshot);
        for callback in callbacks.iter_mut() {
            callback(&status);
        }
        let mut subscribers = self.shared.subscribers();
        callbacks.append(&mut subscribers.snapshot);
        subscribers.snapshot = callbacks;
        drop(subscribers);

        match terminal {
            Some(outcome) => {
                self.notify_terminal(outcome);
                TickFlow::Stop
            }
            None => TickFlow::Continue,
        }
    }

    fn apply_failure(&self, tick: u64, error: ClientError) -> TickFlow {
        let outcome = {
            let mut state = self.shared.state();
            if let Some(flow) = self.accept(&mut state, tick) {
                return flow;
            }
            state.poll.consecutive_failures += 1;
            let failures = state.poll.consecutive_failures;
            warn!(
                "[monitor] status fetch failed ({}/{}): {}",
                failures, self.failure_threshold, error
            );
            if failures < self.failure_threshold {
                return TickFlow::Continue;
            }
            let outcome: JobOutcome = Err(JobError::PollExhausted);
            self.terminate(&mut state, outcome.clone());
            outcome
        };
        self.notify_terminal(outcome);
        TickFlow::Stop
    }

    fn notify_terminal(&self, outcome: JobOutcome) {
        match &outcome {
            Ok(result) => info!("[monitor] job finished: video={} subtitles={}", result.video, result.subtitles),
            Err(e) => warn!("[monitor] job ended with error: {}", e),
        }
        let callbacks = std::mem::take(&mut self.shared.subscribers().terminal);
        for callback in callbacks {
            callback(outcome.clone());
        }
    }
}
