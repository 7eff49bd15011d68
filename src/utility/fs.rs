// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! File helpers shared by the settings store and the data log

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Directory holding `path`, `.` for bare file names
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `contents` to a temporary file next to `path` and rename it over `path`
///
/// Readers observe either the old or the new file, never a truncated one.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
