// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Append-only delimited log with header self-repair
//!
//! The log keeps a single buffered append handle for the lifetime of the process.
//! Records reach the disk on [`AppendLog::flush`], which the control loop calls
//! periodically, or when the buffer fills up.
//!
//! The first line of the file must be the header of the record type. When it is not
//! (older schema, truncated file, missing header), the file is rewritten once: the
//! stale header is dropped, every data line is kept in order, and the corrected file
//! atomically replaces the old one. The header check, the rewrite, appends and flushes
//! all happen under the same lock.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::{LogRecord, TIMESTAMP_FORMAT};
use crate::error::LogError;
use crate::utility::parent_dir;

struct LogState {
    writer: Option<BufWriter<File>>,
    header_checked: bool,
    closed: bool,
}

/// Durable log of `R` records
pub struct AppendLog<R: LogRecord> {
    path: PathBuf,
    staging_dir: PathBuf,
    separator: String,
    header: String,
    state: Mutex<LogState>,
    _record: PhantomData<fn(&R)>,
}

impl<R: LogRecord> AppendLog<R> {
    /// Open `path` for appending, creating it if needed, and repair its header.
    ///
    /// A failed header check is logged and retried on the next [`AppendLog::log_data`].
    pub fn open<P: AsRef<Path>>(path: P, separator: &str) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let writer = open_append(&path)?;
        let log = Self {
            header: R::field_names().join(separator),
            separator: separator.to_string(),
            staging_dir: parent_dir(&path).to_path_buf(),
            state: Mutex::new(LogState {
                writer: Some(writer),
                header_checked: false,
                closed: false,
            }),
            path,
            _record: PhantomData,
        };

        {
            let mut state = log.lock();
            if let Err(err) = log.check_header(&mut state) {
                warn!("Header check of {:?} failed, will retry: {}", log.path, err);
            }
        }
        info!("Logging samples to {:?}", log.path);
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header line expected at the top of the file
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Append one record
    pub fn log_data(&self, record: &R) -> Result<(), LogError> {
        let mut state = self.lock();
        if !state.header_checked {
            self.check_header(&mut state)?;
        }

        let line = record.field_values().join(&self.separator);
        let writer = self.writer(&mut state)?;
        writeln!(writer, "{}", line).map_err(|source| self.io_error(source))
    }

    /// Push buffered records to the file and sync them to disk
    pub fn flush(&self) -> Result<(), LogError> {
        let mut state = self.lock();
        let writer = self.writer(&mut state)?;
        writer.flush().map_err(|source| self.io_error(source))?;
        writer
            .get_ref()
            .sync_data()
            .map_err(|source| self.io_error(source))?;
        debug!("Log {:?} flushed", self.path);
        Ok(())
    }

    /// Flush and release the file handle; later appends fail with [`LogError::Closed`]
    pub fn close(&self) -> Result<(), LogError> {
        self.flush()?;
        let mut state = self.lock();
        state.writer = None;
        state.closed = true;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append handle, reopened if an earlier repair could not restore it
    fn writer<'a>(&self, state: &'a mut LogState) -> Result<&'a mut BufWriter<File>, LogError> {
        if state.closed {
            return Err(LogError::Closed(self.path.clone()));
        }
        if state.writer.is_none() {
            state.writer = Some(open_append(&self.path)?);
        }
        state
            .writer
            .as_mut()
            .ok_or_else(|| LogError::Closed(self.path.clone()))
    }

    fn io_error(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn check_header(&self, state: &mut LogState) -> Result<(), LogError> {
        self.writer(state)?
            .flush()
            .map_err(|source| self.io_error(source))?;

        let bytes = fs::read(&self.path).map_err(|source| self.io_error(source))?;
        let mut lines = bytes.split(|byte| *byte == b'\n');
        let first = lines.next().unwrap_or_default();
        let first = first.strip_suffix(b"\r").unwrap_or(first);
        if first == self.header.as_bytes() {
            state.header_checked = true;
            return Ok(());
        }

        let first_text = String::from_utf8_lossy(first);
        let keep_first = self.is_data_line(&first_text);
        if !first.is_empty() {
            if keep_first {
                warn!("Log {:?} has no header, adding it", self.path);
            } else {
                warn!(
                    "Log {:?} header {:?} does not match {:?}, rewriting",
                    self.path, first_text, self.header
                );
            }
        }

        let body: Vec<&[u8]> = keep_first
            .then_some(first)
            .into_iter()
            .chain(lines)
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .collect();

        // The old handle stays usable until the corrected file is in place
        self.rewrite(&body)?;
        state.writer = None;
        state.writer = Some(open_append(&self.path)?);
        state.header_checked = true;

        info!(
            "Log {:?} rewritten with current header, {} records kept",
            self.path,
            body.len()
        );
        Ok(())
    }

    fn rewrite(&self, body: &[&[u8]]) -> Result<(), LogError> {
        let mut tmp =
            NamedTempFile::new_in(&self.staging_dir).map_err(|source| self.io_error(source))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            writeln!(writer, "{}", self.header).map_err(|source| self.io_error(source))?;
            for line in body {
                writer
                    .write_all(line)
                    .and_then(|()| writer.write_all(b"\n"))
                    .map_err(|source| self.io_error(source))?;
            }
            writer.flush().map_err(|source| self.io_error(source))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|source| self.io_error(source))?;
        tmp.persist(&self.path).map_err(|source| LogError::Persist {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// A data line starts with a record timestamp
    fn is_data_line(&self, line: &str) -> bool {
        line.split(self.separator.as_str())
            .next()
            .is_some_and(|field| NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT).is_ok())
    }
}

impl<R: LogRecord> Drop for AppendLog<R> {
    fn drop(&mut self) {
        if let Some(writer) = self.lock().writer.as_mut() {
            if let Err(err) = writer.flush() {
                warn!("Failed to flush log {:?} on drop: {}", self.path, err);
            }
        }
    }
}

fn open_append(path: &Path) -> Result<BufWriter<File>, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(|source| LogError::Io {
            path: path.to_path_buf(),
            source,
        })
}
