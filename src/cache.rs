//! Locates compiled binaries in the cache.
//!
//! Binaries are keyed by the script's directory and the toolchain target, so
//! a cache directory shared between machines (e.g. over NFS) never hands out
//! a binary built for another platform.

use crate::config::Config;
use crate::script::ScriptRef;
use anyhow::anyhow;
use std::path::{Path, PathBuf};

/// Identifies the target the toolchain builds for, e.g. "linux_x86_64".
pub fn toolchain_tag() -> String {
    format!("{}_{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Turn an absolute directory into a single path component, e.g.
/// "/home/me/bin" => "_home_me_bin".
fn flatten_dir(dir: &Path) -> String {
    dir.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Where the binary for a script lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRef {
    pub dir: PathBuf,
    pub path: PathBuf,
    /// Intermediate object written by the compile step and removed once the
    /// link step succeeds.
    pub object: PathBuf,
}

impl BinaryRef {
    /// Compute the binary location without touching the filesystem.
    pub fn new(script: &ScriptRef, config: &Config) -> BinaryRef {
        let root = &config.cache_directory;
        let dir = if root.is_absolute() {
            root.join(flatten_dir(&script.dir))
        } else {
            script.dir.join(root)
        }
        .join(toolchain_tag());
        let stem = script.stem();
        BinaryRef {
            path: dir.join(format!("{}{}", stem, std::env::consts::EXE_SUFFIX)),
            object: dir.join(format!("_gorun_{}.o", stem)),
            dir,
        }
    }
}

fn create_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o750);
    builder.create(dir)
}

/// Compute the binary location for a script and make sure its directory
/// exists.
pub fn locate(script: &ScriptRef, config: &Config) -> anyhow::Result<BinaryRef> {
    let binary = BinaryRef::new(script, config);
    create_dir(&binary.dir)
        .map_err(|err| anyhow!("could not make directory {}: {}", binary.dir.display(), err))?;
    tracing::debug!("binary {}", binary.path.display());
    Ok(binary)
}
