//! Timer capability injected into the channel.
//!
//! The channel asks for a [`Timer`] to fire after a delay and receives a
//! [`TimerHandle`]. When the timer is due, whoever drives the channel hands
//! `(handle, timer)` back to `RealtimeChannel::handle_timer`. Handles the
//! channel no longer holds are ignored, so a cancel that races a firing
//! timer is harmless.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Periodic liveness probe.
    Heartbeat,
    /// Deadline for the `pong` answering the last probe.
    Liveness,
    /// Next automatic connection attempt.
    Reconnect,
}

pub trait Scheduler {
    fn after(&mut self, delay: Duration, timer: Timer) -> TimerHandle;

    fn cancel(&mut self, handle: TimerHandle);

    /// Wall-clock milliseconds since the Unix epoch, used for envelope
    /// timestamps.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub timer: Timer,
}

/// Tokio-backed scheduler: every timer is a sleeping task that posts a
/// [`FiredTimer`] when it wakes.
#[derive(Debug)]
pub struct TokioScheduler {
    next_id: u64,
    fired: UnboundedSender<FiredTimer>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(fired: UnboundedSender<FiredTimer>) -> Self {
        Self {
            next_id: 0,
            fired,
            tasks: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn after(&mut self, delay: Duration, timer: Timer) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(FiredTimer { handle, timer });
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }

    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
