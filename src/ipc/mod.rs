// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pause/resume commands over a named pipe
//!
//! The web server (or `aquapi_ctl`) writes a command name to a FIFO; the controller
//! polls it once per second without ever blocking.
//!
//! The controller keeps the read end open for its whole lifetime. Writers therefore
//! never race a reader that is closing the pipe, and a non-blocking writer can tell
//! that no controller is running (`ENXIO`).
//!
//! Commands are newline-terminated. A bare command name followed by the writer
//! closing the pipe is accepted as well.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::error::CommandChannelError;

/// Command understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcCommand {
    PauseController,
    ResumeController,
}

impl IpcCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpcCommand::PauseController => "PAUSE_CONTROLLER",
            IpcCommand::ResumeController => "RESUME_CONTROLLER",
        }
    }
}

impl fmt::Display for IpcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IpcCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PAUSE_CONTROLLER" => Ok(IpcCommand::PauseController),
            "RESUME_CONTROLLER" => Ok(IpcCommand::ResumeController),
            other => Err(format!("unknown command {:?}", other)),
        }
    }
}

/// Named pipe carrying [`IpcCommand`]s
pub struct CommandChannel {
    path: PathBuf,
    reader: Option<File>,
    pending: String,
}

impl CommandChannel {
    /// Channel on `path`; the pipe is created on first use
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            pending: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Send `command`, blocking until a reader has the pipe open
    pub fn put(&self, command: IpcCommand) -> Result<(), CommandChannelError> {
        self.ensure_fifo()?;
        let mut pipe = OpenOptions::new().write(true).open(&self.path)?;
        pipe.write_all(format!("{}\n", command).as_bytes())?;
        debug!("Sent {} on {:?}", command, self.path);
        Ok(())
    }

    /// Send `command`, failing with [`CommandChannelError::NoReader`] instead of blocking
    pub fn try_put(&self, command: IpcCommand) -> Result<(), CommandChannelError> {
        self.ensure_fifo()?;
        let mut pipe = match OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(&self.path)
        {
            Ok(pipe) => pipe,
            Err(err) if err.raw_os_error() == Some(Errno::ENXIO as i32) => {
                return Err(CommandChannelError::NoReader(self.path.clone()))
            }
            Err(err) => return Err(err.into()),
        };
        pipe.write_all(format!("{}\n", command).as_bytes())?;
        debug!("Sent {} on {:?}", command, self.path);
        Ok(())
    }

    /// Read the commands pending on the pipe without blocking
    ///
    /// Unknown commands are logged and discarded.
    pub fn poll(&mut self) -> Result<Vec<IpcCommand>, CommandChannelError> {
        let writer_closed = self.drain()?;

        let mut lines: Vec<String> = Vec::new();
        while let Some(end) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=end).collect();
            lines.push(line);
        }
        if writer_closed && !self.pending.is_empty() {
            lines.push(std::mem::take(&mut self.pending));
        }

        let mut commands = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<IpcCommand>() {
                Ok(command) => {
                    info!("Received {} on {:?}", command, self.path);
                    commands.push(command);
                }
                Err(err) => warn!("Discarding IPC message: {}", err),
            }
        }
        Ok(commands)
    }

    /// Create the pipe if needed and keep its read end open
    ///
    /// Called implicitly by [`CommandChannel::poll`].
    pub fn listen(&mut self) -> Result<(), CommandChannelError> {
        if self.reader.is_none() {
            self.ensure_fifo()?;
            let reader = OpenOptions::new()
                .read(true)
                .custom_flags(OFlag::O_NONBLOCK.bits())
                .open(&self.path)?;
            info!("Listening for commands on {:?}", self.path);
            self.reader = Some(reader);
        }
        Ok(())
    }

    /// Move everything readable into `pending`; returns `true` when no writer is left
    fn drain(&mut self) -> Result<bool, CommandChannelError> {
        self.listen()?;
        let Some(reader) = self.reader.as_mut() else {
            return Ok(true);
        };

        let mut buffer = [0u8; 256];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => return Ok(true),
                Ok(n) => self
                    .pending
                    .push_str(&String::from_utf8_lossy(&buffer[..n])),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn ensure_fifo(&self) -> Result<(), CommandChannelError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.file_type().is_fifo() => Ok(()),
            Ok(_) => Err(CommandChannelError::NotAFifo(self.path.clone())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match nix::unistd::mkfifo(&self.path, Mode::from_bits_truncate(0o666)) {
                    Ok(()) => {
                        debug!("Created command pipe {:?}", self.path);
                        Ok(())
                    }
                    // Created concurrently by the other side
                    Err(Errno::EEXIST) => Ok(()),
                    Err(source) => Err(CommandChannelError::Create {
                        path: self.path.clone(),
                        source,
                    }),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[test]
    fn test_poll_without_writer_returns_immediately() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut channel = CommandChannel::new(dir.path().join("ctl.ipc"));

        let started = Instant::now();
        assert!(channel.poll()?.is_empty());
        assert!(channel.poll()?.is_empty());
        assert!(started.elapsed() < Duration::from_millis(50));
        Ok(())
    }

    #[test]
    fn test_put_then_poll() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ctl.ipc");
        let mut reader = CommandChannel::new(&path);
        reader.listen()?;

        let writer = CommandChannel::new(&path);
        writer.put(IpcCommand::PauseController)?;
        writer.try_put(IpcCommand::ResumeController)?;

        assert_eq!(
            reader.poll()?,
            vec![IpcCommand::PauseController, IpcCommand::ResumeController]
        );
        assert!(reader.poll()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_bare_name_and_unknown_command() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ctl.ipc");
        let mut reader = CommandChannel::new(&path);
        reader.poll()?;

        {
            let mut pipe = OpenOptions::new().write(true).open(&path)?;
            pipe.write_all(b"REBOOT\n")?;
        }
        assert!(reader.poll()?.is_empty());

        {
            let mut pipe = OpenOptions::new().write(true).open(&path)?;
            pipe.write_all(b"RESUME_CONTROLLER")?;
        }
        assert_eq!(reader.poll()?, vec![IpcCommand::ResumeController]);
        Ok(())
    }

    #[test]
    fn test_try_put_without_reader() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let channel = CommandChannel::new(dir.path().join("ctl.ipc"));

        assert!(matches!(
            channel.try_put(IpcCommand::PauseController),
            Err(CommandChannelError::NoReader(_))
        ));
        Ok(())
    }

    #[test]
    fn test_regular_file_is_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ctl.ipc");
        fs::write(&path, "")?;

        let mut channel = CommandChannel::new(&path);
        assert!(matches!(
            channel.poll(),
            Err(CommandChannelError::NotAFifo(_))
        ));
        Ok(())
    }
}
