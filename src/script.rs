//! The script being run, resolved once at startup.

use anyhow::anyhow;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRef {
    /// Absolute path to the source file.
    pub path: PathBuf,
    /// Absolute path of the directory containing the source file.
    pub dir: PathBuf,
    /// File name, e.g. "hello.go".
    pub name: String,
    /// Extension without the dot, e.g. "go"; empty if there is none.
    pub ext: String,
}

impl ScriptRef {
    /// Resolve a script path as given on the command line.
    /// Fails if the file does not exist.
    pub fn resolve(path: &Path) -> anyhow::Result<Self> {
        let path = std::fs::canonicalize(path)
            .map_err(|err| anyhow!("could not open script {:?}: {}", path, err))?;
        Self::from_absolute(path)
    }

    /// Build a ScriptRef from an already absolute path, without touching the
    /// filesystem.
    pub fn from_absolute(path: PathBuf) -> anyhow::Result<Self> {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => anyhow::bail!("script path {:?} has no file name", path),
        };
        let dir = match path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => anyhow::bail!("script path {:?} has no parent directory", path),
        };
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ScriptRef {
            path,
            dir,
            name,
            ext,
        })
    }

    /// The file name with its extension stripped.
    pub fn stem(&self) -> &str {
        if self.ext.is_empty() {
            &self.name
        } else {
            &self.name[..self.name.len() - self.ext.len() - 1]
        }
    }
}
