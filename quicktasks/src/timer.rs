//! Per-task time tracking.
//!
//! [`TimeAccumulator`] is the pure `{Stopped, Running}` state machine: it
//! counts seconds from the persisted baseline and says when a
//! reconciliation write is due. [`TimerRegistry`] runs one accumulator per
//! task on its own tokio task, ticking on an interval and writing
//! reconciled minutes through the [`Remote`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quicktasks_proto::record::{Collection, RecordId};
use quicktasks_proto::task::TaskPatch;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::remote::{Remote, RemoteError};

/// Default seconds between reconciliation writes.
pub const DEFAULT_RECONCILE_EVERY_SECS: u64 = 30;

/// Whether the accumulator is counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerState {
    /// Not counting.
    #[default]
    Stopped,
    /// Counting one second per tick.
    Running,
}

/// Local seconds counter reconciled against persisted whole minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAccumulator {
    state: TimerState,
    elapsed_secs: u64,
    reconcile_every: u64,
}

impl TimeAccumulator {
    /// Starts stopped at `baseline_minutes` of persisted time.
    #[must_use]
    pub const fn new(baseline_minutes: u64, reconcile_every_secs: u64) -> Self {
        Self {
            state: TimerState::Stopped,
            elapsed_secs: baseline_minutes.saturating_mul(60),
            reconcile_every: if reconcile_every_secs == 0 {
                DEFAULT_RECONCILE_EVERY_SECS
            } else {
                reconcile_every_secs
            },
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TimerState {
        self.state
    }

    /// Returns `true` while counting.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running)
    }

    /// Total tracked seconds, baseline included.
    #[must_use]
    pub const fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Tracked time in whole minutes, rounded down.
    #[must_use]
    pub const fn minutes(&self) -> u64 {
        self.elapsed_secs / 60
    }

    /// Starts counting. Returns `false` if already running.
    pub const fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// Advances one second while running.
    ///
    /// Returns the minutes to persist when the total reaches a multiple of
    /// the reconcile period.
    pub const fn tick(&mut self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        if self.elapsed_secs % self.reconcile_every == 0 {
            Some(self.minutes())
        } else {
            None
        }
    }

    /// Stops counting. Returns the minutes to persist if it was running
    /// with any time on the clock.
    pub const fn stop(&mut self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        self.state = TimerState::Stopped;
        if self.elapsed_secs > 0 {
            Some(self.minutes())
        } else {
            None
        }
    }

    /// Zeroes and stops the counter. Always returns `0`, the value to
    /// persist.
    pub const fn reset(&mut self) -> u64 {
        self.state = TimerState::Stopped;
        self.elapsed_secs = 0;
        0
    }

    /// Adopts a newer persisted baseline. Ignored while running, since the
    /// local count is ahead of the store then, and when `minutes` already
    /// matches the local count, so the echo of our own write keeps the
    /// seconds past the last whole minute.
    pub const fn rebase(&mut self, minutes: u64) -> bool {
        if self.is_running() || minutes == self.minutes() {
            return false;
        }
        self.elapsed_secs = minutes.saturating_mul(60);
        true
    }
}

/// Formats seconds as `h:mm:ss`, or `m:ss` under an hour.
#[must_use]
pub fn format_elapsed(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Snapshot of a live timer, published after every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStatus {
    /// Total tracked seconds.
    pub elapsed_secs: u64,
    /// Whether it is counting.
    pub running: bool,
}

impl TimerStatus {
    fn of(acc: &TimeAccumulator) -> Self {
        Self {
            elapsed_secs: acc.elapsed_secs(),
            running: acc.is_running(),
        }
    }
}

/// Commands accepted by a timer task.
#[derive(Debug)]
enum TimerCommand {
    Pause,
    Resume,
    Rebase(u64),
    Reset(oneshot::Sender<Result<(), RemoteError>>),
    Teardown,
}

struct TimerHandle {
    commands: mpsc::UnboundedSender<TimerCommand>,
    status: watch::Receiver<TimerStatus>,
    join: JoinHandle<()>,
}

/// Timing settings shared by every timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    /// Interval between ticks; one tick is one tracked second.
    pub tick: Duration,
    /// Seconds between reconciliation writes.
    pub reconcile_every_secs: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            reconcile_every_secs: DEFAULT_RECONCILE_EVERY_SECS,
        }
    }
}

/// Owns at most one running timer task per task id.
///
/// Dropping the registry closes every command channel; each timer task then
/// flushes its final write and exits on its own.
pub struct TimerRegistry<R> {
    remote: Arc<R>,
    settings: TimerSettings,
    timers: HashMap<RecordId, TimerHandle>,
}

impl<R: Remote + 'static> TimerRegistry<R> {
    /// Creates an empty registry writing through `remote`.
    ///
    /// A zero tick interval falls back to one second.
    pub fn new(remote: Arc<R>, mut settings: TimerSettings) -> Self {
        if settings.tick.is_zero() {
            settings.tick = TimerSettings::default().tick;
        }
        Self {
            remote,
            settings,
            timers: HashMap::new(),
        }
    }

    /// Starts a running timer for `task_id` from `baseline_minutes`.
    ///
    /// A timer already registered for the task is discarded without a
    /// final write, so the new one restarts cleanly from the persisted
    /// baseline.
    pub fn start(&mut self, task_id: &RecordId, baseline_minutes: u64) {
        if self.discard(task_id) {
            tracing::debug!(%task_id, "restarting timer from persisted baseline");
        }

        let mut acc = TimeAccumulator::new(baseline_minutes, self.settings.reconcile_every_secs);
        acc.start();
        let (commands, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(TimerStatus::of(&acc));
        let join = tokio::spawn(run_timer(
            Arc::clone(&self.remote),
            task_id.clone(),
            acc,
            self.settings.tick,
            rx,
            status_tx,
        ));

        tracing::debug!(%task_id, baseline_minutes, "timer started");
        self.timers.insert(
            task_id.clone(),
            TimerHandle {
                commands,
                status,
                join,
            },
        );
    }

    fn send(&self, task_id: &RecordId, command: TimerCommand) -> bool {
        self.timers
            .get(task_id)
            .is_some_and(|h| h.commands.send(command).is_ok())
    }

    /// Stops counting and persists the time so far. The timer stays
    /// registered. Returns `false` if there is no timer for the task.
    pub fn pause(&self, task_id: &RecordId) -> bool {
        self.send(task_id, TimerCommand::Pause)
    }

    /// Resumes a paused timer.
    pub fn resume(&self, task_id: &RecordId) -> bool {
        self.send(task_id, TimerCommand::Resume)
    }

    /// Passes a newer persisted value to a paused timer.
    pub fn rebase(&self, task_id: &RecordId, minutes: u64) -> bool {
        self.send(task_id, TimerCommand::Rebase(minutes))
    }

    /// Zeroes the timer and persists 0, waiting for the write.
    ///
    /// Without a registered timer the 0 is written directly.
    ///
    /// # Errors
    ///
    /// Returns the [`RemoteError`] of the write.
    pub async fn reset(&self, task_id: &RecordId) -> Result<(), RemoteError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.send(task_id, TimerCommand::Reset(reply_tx)) {
            return reply_rx
                .await
                .unwrap_or_else(|_| Err(RemoteError::Unavailable("timer stopped".to_string())));
        }
        write_minutes(&*self.remote, task_id, 0).await
    }

    /// Stops the timer, flushes its final write and waits for its task to
    /// finish. Returns `false` if there was no timer.
    pub async fn teardown(&mut self, task_id: &RecordId) -> bool {
        let Some(handle) = self.timers.remove(task_id) else {
            return false;
        };
        let _ = handle.commands.send(TimerCommand::Teardown);
        if let Err(e) = handle.join.await {
            tracing::warn!(%task_id, error = %e, "timer task failed");
        }
        true
    }

    /// Tears down every timer, flushing each final write.
    pub async fn teardown_all(&mut self) {
        let ids: Vec<RecordId> = self.timers.keys().cloned().collect();
        for id in ids {
            self.teardown(&id).await;
        }
    }

    /// Aborts the timer without a final write. Used when its task is gone.
    pub fn discard(&mut self, task_id: &RecordId) -> bool {
        self.timers.remove(task_id).is_some_and(|handle| {
            handle.join.abort();
            true
        })
    }

    /// Latest status of the task's timer.
    #[must_use]
    pub fn status(&self, task_id: &RecordId) -> Option<TimerStatus> {
        self.timers.get(task_id).map(|h| *h.status.borrow())
    }

    /// Returns `true` if the task's timer is counting.
    #[must_use]
    pub fn is_running(&self, task_id: &RecordId) -> bool {
        self.status(task_id).is_some_and(|s| s.running)
    }

    /// Ids with a registered timer.
    pub fn tracked(&self) -> impl Iterator<Item = &RecordId> {
        self.timers.keys()
    }
}

async fn write_minutes<R: Remote>(
    remote: &R,
    task_id: &RecordId,
    minutes: u64,
) -> Result<(), RemoteError> {
    remote
        .update(
            Collection::Tasks,
            task_id,
            TaskPatch::accumulated_minutes(minutes).into_patch(),
        )
        .await
}

async fn persist<R: Remote>(remote: &R, task_id: &RecordId, minutes: u64) {
    match write_minutes(remote, task_id, minutes).await {
        Ok(()) => tracing::debug!(%task_id, minutes, "tracked time reconciled"),
        Err(e) => tracing::warn!(%task_id, minutes, error = %e, "failed to persist tracked time"),
    }
}

/// Body of one timer task.
async fn run_timer<R: Remote>(
    remote: Arc<R>,
    task_id: RecordId,
    mut acc: TimeAccumulator,
    period: Duration,
    mut commands: mpsc::UnboundedReceiver<TimerCommand>,
    status: watch::Sender<TimerStatus>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(minutes) = acc.tick() {
                    persist(&*remote, &task_id, minutes).await;
                }
            }
            command = commands.recv() => match command {
                Some(TimerCommand::Pause) => {
                    if let Some(minutes) = acc.stop() {
                        persist(&*remote, &task_id, minutes).await;
                    }
                }
                Some(TimerCommand::Resume) => {
                    if acc.start() {
                        ticker.reset();
                    }
                }
                Some(TimerCommand::Rebase(minutes)) => {
                    acc.rebase(minutes);
                }
                Some(TimerCommand::Reset(reply)) => {
                    let minutes = acc.reset();
                    let _ = reply.send(write_minutes(&*remote, &task_id, minutes).await);
                }
                Some(TimerCommand::Teardown) | None => {
                    if let Some(minutes) = acc.stop() {
                        persist(&*remote, &task_id, minutes).await;
                    }
                    status.send_replace(TimerStatus::of(&acc));
                    tracing::debug!(%task_id, "timer torn down");
                    return;
                }
            }
        }
        status.send_replace(TimerStatus::of(&acc));
    }
}
