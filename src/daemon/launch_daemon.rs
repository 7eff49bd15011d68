// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, error, info, warn};
use tokio::runtime::Handle;

use super::controller::ControlLoop;
use super::periodic_task::{PeriodicTask, TaskControl};
use crate::config::Config;
use crate::datalog::{AppendLog, Sample};
use crate::ipc::{CommandChannel, IpcCommand};
use crate::probe::{self, PhEstimator, ProbeTransport, TemperatureSensor};
use crate::relay::{self, RelayActuator, RelayDriver};
use crate::settings::SettingsStore;
use crate::uplink::UplinkPublisher;

/// Length of a scheduling tick in deployment
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// The three periodic tasks of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Measure, actuate, log and forward
    Sample,
    /// Flush the data log
    LogFlush,
    /// Read pause/resume commands
    CommandPoll,
}

impl TaskKind {
    fn thread_name(self) -> &'static str {
        match self {
            TaskKind::Sample => "sample",
            TaskKind::LogFlush => "log-flush",
            TaskKind::CommandPoll => "command-poll",
        }
    }
}

/// Hardware the controller talks to
pub struct Hardware {
    pub probe: Box<dyn ProbeTransport>,
    pub temperature: Box<dyn TemperatureSensor>,
    pub relay: Box<dyn RelayDriver>,
}

impl Hardware {
    /// Open the devices selected by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            probe: probe::create_transport(&config.probe)
                .with_context(|| format!("Failed to open pH probe {}", config.probe.device))?,
            temperature: probe::create_temperature_sensor(&config.temperature),
            relay: relay::create_driver(&config.relay).context("Failed to set up CO2 relay")?,
        })
    }
}

/// Represents the running controller and its periodic tasks
pub struct Daemon {
    tick: Duration,
    tasks: Vec<(TaskKind, PeriodicTask)>,
    log: Option<Arc<AppendLog<Sample>>>,
    running: Arc<AtomicBool>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance ticking every second
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    /// Daemon whose periods and delays are counted in `tick` units
    pub fn with_tick(tick: Duration) -> Self {
        Daemon {
            tick,
            tasks: Vec::new(),
            log: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the sampling, log flush and command poll tasks
    ///
    /// `runtime` hosts the uplink requests.
    pub fn launch(&mut self, config: &Config, hardware: Hardware, runtime: Handle) -> Result<()> {
        let store = SettingsStore::new(&config.settings_path);
        let settings = store.load().context("Failed to load settings")?;
        info!("Settings loaded from {}", config.settings_path);

        let log = Arc::new(
            AppendLog::<Sample>::open(&config.datalog.path, &config.datalog.separator)
                .context("Failed to open the data log")?,
        );

        let uplink = if config.uplink.enabled {
            let publisher = UplinkPublisher::new(&config.uplink, runtime)
                .context("Failed to set up the uplink")?;
            info!("Forwarding samples to {}", publisher.url());
            Some(publisher)
        } else {
            info!("Sample forwarding disabled");
            None
        };

        let mut channel = CommandChannel::new(&config.ipc.pipe_path);
        channel
            .listen()
            .context("Failed to open the command pipe")?;

        let request = u8::try_from(config.probe.request)
            .context("Probe request must be a single byte")?;
        let mut control_loop = ControlLoop::new(
            PhEstimator::new(hardware.probe, request, config.probe.averaging_window),
            RelayActuator::new(hardware.relay),
            hardware.temperature,
            Arc::clone(&log),
            uplink,
            store,
            settings.clone(),
        );
        control_loop.prime();

        let sample_control = Arc::new(TaskControl::new(
            TaskKind::Sample.thread_name(),
            settings.interval,
            self.tick,
            false,
        ));
        let flush_control = Arc::new(TaskControl::new(
            TaskKind::LogFlush.thread_name(),
            settings.log_flush_period,
            self.tick,
            false,
        ));
        let poll_control = Arc::new(TaskControl::new(
            TaskKind::CommandPoll.thread_name(),
            1,
            self.tick,
            true,
        ));

        self.running.store(true, Ordering::SeqCst);

        let flush_period = Arc::clone(&flush_control);
        let sample_task = PeriodicTask::spawn(Arc::clone(&sample_control), 0, move |task| {
            control_loop.run_cycle(Local::now().naive_local());
            let settings = control_loop.settings();
            task.set_period(settings.interval);
            flush_period.set_period(settings.log_flush_period);
        })
        .context("Failed to start the sampling task")?;
        self.tasks.push((TaskKind::Sample, sample_task));

        let flush_log = Arc::clone(&log);
        let flush_task = PeriodicTask::spawn(
            Arc::clone(&flush_control),
            config.datalog.flush_delay_s,
            move |_| {
                if let Err(err) = flush_log.flush() {
                    error!("Log flush failed: {}", err);
                }
            },
        )
        .context("Failed to start the log flush task")?;
        self.tasks.push((TaskKind::LogFlush, flush_task));

        let controlled = [sample_control, flush_control];
        let poll_task = PeriodicTask::spawn(poll_control, 0, move |_| {
            let commands = match channel.poll() {
                Ok(commands) => commands,
                Err(err) => {
                    warn!("Command pipe poll failed: {}", err);
                    return;
                }
            };
            for command in commands {
                for task in &controlled {
                    match command {
                        IpcCommand::PauseController => task.pause(),
                        IpcCommand::ResumeController => task.resume(),
                    };
                }
            }
        })
        .context("Failed to start the command poll task")?;
        self.tasks.push((TaskKind::CommandPoll, poll_task));

        self.log = Some(log);
        info!("Controller started");
        Ok(())
    }

    /// Run state handle of one of the tasks
    pub fn task(&self, kind: TaskKind) -> Option<&Arc<TaskControl>> {
        self.tasks
            .iter()
            .find(|(task_kind, _)| *task_kind == kind)
            .map(|(_, task)| task.control())
    }

    /// State of every task, for diagnostics
    pub fn task_states(&self) -> HashMap<TaskKind, super::TaskState> {
        self.tasks
            .iter()
            .map(|(kind, task)| (*kind, task.control().state()))
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down controller tasks");
        self.running.store(false, Ordering::SeqCst);
        for (_, task) in &self.tasks {
            task.kill();
        }
    }

    /// Wait for all tasks to complete and flush the data log one last time
    pub fn join(self) -> Result<()> {
        for (kind, task) in self.tasks {
            debug!("Waiting for task {:?}", kind);
            task.join();
        }
        if let Some(log) = self.log {
            log.close().context("Final flush of the data log failed")?;
            info!("Data log flushed");
        }
        Ok(())
    }
}
