//! Hides the hashbang line of a script from the compiler.
//!
//! A script starting with `#!/usr/bin/env gorun` can be run directly, but Go
//! (like most compilers) rejects that line.  While building, the leading
//! `#!` is overwritten in place with `//`, turning the line into a comment;
//! afterwards it's written back.  Only those two bytes are touched, so the
//! file length and every offset past them stay the same.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

/// The first line recognized as this tool's hashbang.
pub const HASHBANG: &[u8] = b"#!/usr/bin/env gorun";

/// Whether the first line of the file, without its terminator, is exactly
/// `hashbang`.
pub fn has_hashbang(file: &mut File, hashbang: &[u8]) -> std::io::Result<bool> {
    file.seek(SeekFrom::Start(0))?;
    let mut line = Vec::new();
    BufReader::new(&mut *file).read_until(b'\n', &mut line)?;
    let line = line.strip_suffix(b"\n").unwrap_or(&line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Ok(line == hashbang)
}

fn overwrite_prefix(file: &mut File, prefix: &[u8; 2]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(prefix)?;
    file.flush()
}

/// Holds a script whose hashbang may be commented out, and puts it back when
/// released or dropped.
pub struct HashbangGuard {
    file: File,
    commented: bool,
}

impl HashbangGuard {
    /// Open the script for reading and writing and comment out its hashbang.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| anyhow::anyhow!("could not open {}: {}", path.display(), err))?;
        Self::comment_out(file, HASHBANG)
            .map_err(|err| anyhow::anyhow!("could not comment out hashbang of {}: {}", path.display(), err))
    }

    /// Comment out the hashbang if the first line is exactly `hashbang`;
    /// otherwise the file is left untouched.
    pub fn comment_out(mut file: File, hashbang: &[u8]) -> std::io::Result<Self> {
        let commented = has_hashbang(&mut file, hashbang)?;
        if commented {
            overwrite_prefix(&mut file, b"//")?;
        }
        Ok(HashbangGuard { file, commented })
    }

    /// Whether the file had a hashbang that is currently commented out.
    pub fn had_hashbang(&self) -> bool {
        self.commented
    }

    fn restore_inner(&mut self) -> std::io::Result<()> {
        if self.commented {
            overwrite_prefix(&mut self.file, b"#!")?;
            self.commented = false;
        }
        Ok(())
    }

    /// Put the hashbang back, reporting failure.  Dropping the guard also
    /// restores, but can only log errors.
    pub fn restore(mut self) -> std::io::Result<()> {
        self.restore_inner()
    }
}

impl Drop for HashbangGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore_inner() {
            tracing::error!("could not restore hashbang: {}", err);
        }
    }
}
