// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use chrono::NaiveDate;
use rust_aquapi::datalog::{AppendLog, Sample};
use rust_aquapi::relay::RelayState;
use std::fs;
use tempfile::tempdir;

fn sample(minute: u32, ph: f64, relay: RelayState) -> Sample {
    let timestamp = NaiveDate::from_ymd_opt(2024, 7, 14)
        .unwrap()
        .and_hms_opt(8, minute, 0)
        .unwrap();
    Sample::new(timestamp, ph, 25.0, relay)
}

#[test]
fn test_header_repair_keeps_history_in_order() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = tempdir()?;
    let log_path = temp_dir.path().join("log.csv");

    // A log written by an older release, without the temperature column
    let history: Vec<String> = (0..20)
        .map(|minute| format!("2024-07-13 20:{:02}:00;6.{:02};0", minute, 80 + minute))
        .collect();
    fs::write(
        &log_path,
        format!("timestamp;ph;relay\n{}\n", history.join("\n")),
    )?;

    {
        let log = AppendLog::<Sample>::open(&log_path, ";")?;
        log.log_data(&sample(0, 6.87, RelayState::On))?;
        log.close()?;
    }

    let contents = fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "timestamp;ph;temperature;relay");
    let kept: Vec<&str> = history.iter().map(String::as_str).collect();
    assert_eq!(&lines[1..21], kept.as_slice());
    assert_eq!(lines[21], "2024-07-14 08:00:00;6.87;25.00;1");
    assert_eq!(lines.len(), 22);

    // A second run finds the header in place and only appends
    {
        let log = AppendLog::<Sample>::open(&log_path, ";")?;
        log.log_data(&sample(1, 6.79, RelayState::Off))?;
        log.flush()?;
    }
    let reopened = fs::read_to_string(&log_path)?;
    assert!(reopened.starts_with(&contents));
    assert!(reopened.ends_with("2024-07-14 08:01:00;6.79;25.00;0\n"));
    Ok(())
}

#[test]
fn test_custom_separator() -> Result<()> {
    let temp_dir = tempdir()?;
    let log_path = temp_dir.path().join("log.tsv");

    let log = AppendLog::<Sample>::open(&log_path, "\t")?;
    log.log_data(&sample(30, 7.016, RelayState::Off))?;
    log.flush()?;

    assert_eq!(
        fs::read_to_string(&log_path)?,
        "timestamp\tph\ttemperature\trelay\n2024-07-14 08:30:00\t7.02\t25.00\t0\n"
    );
    Ok(())
}
