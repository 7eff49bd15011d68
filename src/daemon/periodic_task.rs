// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic tasks on dedicated threads
//!
//! A [`PeriodicTask`] waits for an optional startup delay, runs its body once, then
//! runs it again every `period` ticks. Its [`TaskControl`] can pause, resume and kill
//! it from any thread:
//!
//! ```text
//! Created ──▶ Running ◀──▶ Paused
//!                │            │
//!                └──▶ Killed ◀┘
//! ```
//!
//! Pausing lets the cycle in progress finish. A paused task runs again as soon as it
//! is resumed. Killing wakes a sleeping task at once; it is terminal. Waits go through
//! a condition variable, and the period is re-read while waiting, so a period change
//! shortens or extends the current wait.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info};

/// Lifecycle state of a periodic task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Paused,
    Killed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::Paused => "paused",
            TaskState::Killed => "killed",
        })
    }
}

/// Shared run state of a periodic task
pub struct TaskControl {
    name: String,
    tick: Duration,
    period_ticks: AtomicU64,
    silent: bool,
    state: Mutex<TaskState>,
    changed: Condvar,
}

impl TaskControl {
    pub fn new(name: &str, period_ticks: u64, tick: Duration, silent: bool) -> Self {
        Self {
            name: name.to_string(),
            tick,
            period_ticks: AtomicU64::new(period_ticks),
            silent,
            state: Mutex::new(TaskState::Created),
            changed: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        *self.lock()
    }

    /// Period in ticks; 0 makes the task run once
    pub fn period(&self) -> u64 {
        self.period_ticks.load(Ordering::SeqCst)
    }

    pub fn set_period(&self, ticks: u64) {
        let previous = self.period_ticks.swap(ticks, Ordering::SeqCst);
        if previous != ticks {
            info!(
                "Task {} period changed from {} to {} ticks",
                self.name, previous, ticks
            );
            // Let a sleeping task recompute its deadline
            let _guard = self.lock();
            self.changed.notify_all();
        }
    }

    /// Stop scheduling new cycles; returns `false` if the task was not running
    pub fn pause(&self) -> bool {
        self.transition(|state| match state {
            TaskState::Created | TaskState::Running => Some(TaskState::Paused),
            _ => None,
        })
    }

    /// Schedule cycles again; returns `false` if the task was not paused
    pub fn resume(&self) -> bool {
        self.transition(|state| match state {
            TaskState::Paused => Some(TaskState::Running),
            _ => None,
        })
    }

    /// Stop the task for good
    pub fn kill(&self) -> bool {
        self.transition(|state| match state {
            TaskState::Killed => None,
            _ => Some(TaskState::Killed),
        })
    }

    fn start(&self) -> bool {
        self.transition(|state| match state {
            TaskState::Created => Some(TaskState::Running),
            _ => None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, TaskState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn transition(&self, next: impl FnOnce(TaskState) -> Option<TaskState>) -> bool {
        let mut state = self.lock();
        let Some(new_state) = next(*state) else {
            return false;
        };
        if self.silent {
            debug!("Task {}: {} -> {}", self.name, *state, new_state);
        } else {
            info!("Task {}: {} -> {}", self.name, *state, new_state);
        }
        *state = new_state;
        self.changed.notify_all();
        true
    }

    /// Block while the task is paused; returns the state that ended the wait
    fn wait_runnable(&self) -> TaskState {
        let guard = self.lock();
        let guard = match self.changed.wait_while(guard, |state| {
            matches!(state, TaskState::Paused | TaskState::Created)
        }) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard
    }

    /// Wait out the startup delay; time spent paused counts towards it
    fn delay(&self, ticks: u64) -> TaskState {
        let started = Instant::now();
        loop {
            match self.sleep_from(started, || ticks) {
                TaskState::Paused | TaskState::Created => {
                    if self.wait_runnable() == TaskState::Killed {
                        return TaskState::Killed;
                    }
                }
                state => return state,
            }
        }
    }

    /// Sleep `ticks()` ticks from now, waking early if the task leaves `Running`
    fn sleep(&self, ticks: impl Fn() -> u64) -> TaskState {
        self.sleep_from(Instant::now(), ticks)
    }

    fn sleep_from(&self, started: Instant, ticks: impl Fn() -> u64) -> TaskState {
        let mut state = self.lock();
        loop {
            if *state != TaskState::Running {
                return *state;
            }
            let ticks = u32::try_from(ticks()).unwrap_or(u32::MAX);
            let deadline = started + self.tick.saturating_mul(ticks);
            let now = Instant::now();
            if now >= deadline {
                return *state;
            }
            state = match self.changed.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// A task body run on its own thread every `period` ticks
pub struct PeriodicTask {
    control: Arc<TaskControl>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Start `body` on a new thread named after `control`
    ///
    /// The first cycle runs after `start_delay_ticks` ticks.
    pub fn spawn<F>(
        control: Arc<TaskControl>,
        start_delay_ticks: u64,
        mut body: F,
    ) -> io::Result<Self>
    where
        F: FnMut(&TaskControl) + Send + 'static,
    {
        let task_control = Arc::clone(&control);
        let handle = thread::Builder::new()
            .name(control.name.clone())
            .spawn(move || {
                let control = task_control;
                control.start();
                if start_delay_ticks > 0 && control.delay(start_delay_ticks) == TaskState::Killed {
                    return;
                }
                loop {
                    if control.wait_runnable() == TaskState::Killed {
                        break;
                    }
                    body(&control);
                    if control.period() == 0 {
                        debug!("Task {} ran once", control.name);
                        break;
                    }
                    if control.sleep(|| control.period()) == TaskState::Killed {
                        break;
                    }
                }
                debug!("Task {} stopped", control.name);
            })?;

        Ok(Self {
            control,
            handle: Some(handle),
        })
    }

    pub fn control(&self) -> &Arc<TaskControl> {
        &self.control
    }

    /// Kill the task; a cycle in progress completes
    pub fn kill(&self) {
        self.control.kill();
    }

    /// Wait for the thread to end
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Task {} panicked", self.control.name);
            }
        }
    }
}
