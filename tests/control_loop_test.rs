// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rust_aquapi::config::Config;
use rust_aquapi::daemon::{Daemon, Hardware, TaskKind, TaskState};
use rust_aquapi::ipc::{CommandChannel, IpcCommand};
use rust_aquapi::probe::{SimulatedProbe, SimulatedTemperature};
use rust_aquapi::relay::{MockRelay, RelayState};
use rust_aquapi::settings::SettingsStore;
use tempfile::{tempdir, TempDir};

const TICK: Duration = Duration::from_millis(20);

struct Controller {
    dir: TempDir,
    config: Config,
    daemon: Daemon,
    reads: Arc<AtomicUsize>,
    relay: MockRelay,
}

/// Controller on simulated hardware whose probe reads `raw`, ticking every 20 ms
fn start_controller(raw: f64, runtime: &tokio::runtime::Runtime) -> Result<Controller> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir()?;

    let mut config = Config::default();
    config.settings_path = dir.path().join("settings.json").to_string_lossy().to_string();
    config.datalog.path = dir.path().join("log.csv").to_string_lossy().to_string();
    config.datalog.flush_delay_s = 1;
    config.ipc.pipe_path = dir.path().join("ctl.ipc").to_string_lossy().to_string();
    config.uplink.enabled = false;

    // One sample per tick, one flush every two ticks
    let store = SettingsStore::new(&config.settings_path);
    let mut settings = store.load()?;
    settings.interval = 1;
    settings.log_flush_period = 2;
    store.save(&settings)?;

    let probe = SimulatedProbe::with_seed(raw, 42);
    let reads = probe.read_counter();
    let relay = MockRelay::new(RelayState::Off);
    let hardware = Hardware {
        probe: Box::new(probe),
        temperature: Box::new(SimulatedTemperature::new(24.5)),
        relay: Box::new(relay.clone()),
    };

    let mut daemon = Daemon::with_tick(TICK);
    daemon.launch(&config, hardware, runtime.handle().clone())?;
    Ok(Controller {
        dir,
        config,
        daemon,
        reads,
        relay,
    })
}

fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_pause_and_resume_through_pipe() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let controller = start_controller(387.0, &runtime)?;
    let reads = Arc::clone(&controller.reads);
    let sample_task = Arc::clone(
        controller
            .daemon
            .task(TaskKind::Sample)
            .ok_or_else(|| anyhow::anyhow!("no sample task"))?,
    );
    let poll_task = Arc::clone(
        controller
            .daemon
            .task(TaskKind::CommandPoll)
            .ok_or_else(|| anyhow::anyhow!("no poll task"))?,
    );

    wait_for("first samples", || reads.load(Ordering::SeqCst) >= 3);

    let channel = CommandChannel::new(&controller.config.ipc.pipe_path);
    channel.try_put(IpcCommand::PauseController)?;
    wait_for("pause", || sample_task.state() == TaskState::Paused);

    // A cycle already started when the command arrived may still complete
    thread::sleep(TICK * 5);
    let paused_reads = reads.load(Ordering::SeqCst);
    thread::sleep(TICK * 15);
    assert_eq!(reads.load(Ordering::SeqCst), paused_reads);
    assert_eq!(poll_task.state(), TaskState::Running);
    assert_eq!(
        controller.daemon.task_states()[&TaskKind::LogFlush],
        TaskState::Paused
    );

    channel.try_put(IpcCommand::ResumeController)?;
    wait_for("resume", || reads.load(Ordering::SeqCst) > paused_reads + 2);
    assert_eq!(sample_task.state(), TaskState::Running);

    controller.daemon.shutdown();
    controller.daemon.join()?;
    Ok(())
}

#[test]
fn test_samples_are_logged_and_relay_driven() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    // Raw 394 is pH 7 with the default calibration, above the 6.8-6.9 band
    let controller = start_controller(394.0, &runtime)?;
    let reads = Arc::clone(&controller.reads);

    wait_for("samples", || reads.load(Ordering::SeqCst) >= 5);
    wait_for("relay on", || controller.relay.state() == RelayState::On);
    assert_eq!(controller.relay.writes(), 1);

    let log_path = controller.dir.path().join("log.csv");
    controller.daemon.shutdown();
    controller.daemon.join()?;

    let contents = fs::read_to_string(&log_path)?;
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("timestamp;ph;temperature;relay"));
    let records: Vec<Vec<&str>> = lines.map(|line| line.split(';').collect()).collect();
    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(record.len(), 4);
        let ph: f64 = record[1].parse()?;
        assert!((ph - 7.0).abs() < 0.15, "unexpected pH {}", ph);
        assert_eq!(record[3], "1");
    }
    Ok(())
}

#[test]
fn test_shutdown_is_prompt() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let controller = start_controller(387.0, &runtime)?;
    let reads = Arc::clone(&controller.reads);
    wait_for("first sample", || reads.load(Ordering::SeqCst) >= 2);

    let started = Instant::now();
    controller.daemon.shutdown();
    assert!(!controller.daemon.is_running());
    controller.daemon.join()?;
    assert!(started.elapsed() < Duration::from_secs(1));
    Ok(())
}
