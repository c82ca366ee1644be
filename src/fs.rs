//! Modification times and the decision whether a script must be rebuilt.

use filetime::FileTime;
use std::path::Path;
use std::time::SystemTime;

/// MTime info gathered for a file.  This also models "file is absent".
/// It's not using an Option<> just because it makes the code using it easier
/// to follow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MTime {
    Missing,
    Stamp(SystemTime),
}

/// stat() an on-disk path, producing its MTime.
pub fn stat(path: &Path) -> std::io::Result<MTime> {
    Ok(match std::fs::metadata(path) {
        Ok(meta) => MTime::Stamp(meta.modified()?),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                MTime::Missing
            } else {
                return Err(err);
            }
        }
    })
}

/// Whether a file at `path` has changed since `binary` was built: it is
/// strictly newer than the binary, it's gone, or the binary is gone.
pub fn newer_than(path: &Path, binary: &Path) -> std::io::Result<bool> {
    let binary = match stat(binary)? {
        MTime::Missing => return Ok(true),
        MTime::Stamp(t) => t,
    };
    Ok(match stat(path)? {
        MTime::Missing => true,
        MTime::Stamp(t) => t > binary,
    })
}

/// Decide whether the script must be (re)compiled.  A script with the same
/// mtime as its binary counts as up to date.
pub fn needs_build(script: &Path, binary: &Path, force: bool) -> std::io::Result<bool> {
    if force {
        return Ok(true);
    }
    newer_than(script, binary)
}

/// Whether `path` was modified after `since`, or is gone.
pub fn changed_since(path: &Path, since: SystemTime) -> std::io::Result<bool> {
    Ok(match stat(path)? {
        MTime::Missing => true,
        MTime::Stamp(t) => t > since,
    })
}

/// Put back an mtime that our own writes to a file bumped.
pub fn set_mtime(path: &Path, mtime: SystemTime) -> std::io::Result<()> {
    filetime::set_file_mtime(path, FileTime::from_system_time(mtime))
}

/// Stamp both files with the same mtime, so the binary is exactly as new as
/// the source it was built from.
pub fn sync_mtime(script: &Path, binary: &Path, mtime: SystemTime) -> std::io::Result<()> {
    let mtime = FileTime::from_system_time(mtime);
    filetime::set_file_mtime(binary, mtime)?;
    filetime::set_file_mtime(script, mtime)
}
