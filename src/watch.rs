//! Filesystem change notifications for hot reload.
//!
//! The notify backend calls us on its own thread; relevant changes are
//! forwarded over a channel to the supervisor loop.

use crate::config::Config;
use crate::script::ScriptRef;
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// What the listener tells the supervisor.
#[derive(Debug)]
pub enum Event {
    /// A watched file changed.
    Changed(PathBuf),
    /// The backend reported a problem.
    Error(String),
}

/// Decides which notifications matter.
#[derive(Debug, Clone)]
pub struct Filter {
    script: PathBuf,
    config: Config,
}

impl Filter {
    pub fn new(script: &ScriptRef, config: &Config) -> Self {
        Filter {
            script: script.path.clone(),
            config: config.clone(),
        }
    }

    /// The script itself always matters.  Other files only do when the whole
    /// tree is watched, and then only non-hidden ones with a watched
    /// extension; hidden names are editor droppings like Emacs' `.#main.go`.
    fn path_matches(&self, path: &Path) -> bool {
        if path == self.script {
            return true;
        }
        if !self.config.watches_tree() {
            return false;
        }
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };
        if name.starts_with('.') {
            return false;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.config.watches_extension(ext),
            None => false,
        }
    }

    /// The first path of the event that is of interest, if any.  Reads and
    /// attribute-only changes (permissions, timestamps) never are.
    pub fn matches<'a>(&self, event: &'a notify::Event) -> Option<&'a Path> {
        match event.kind {
            EventKind::Access(_) | EventKind::Other => return None,
            EventKind::Modify(ModifyKind::Metadata(_)) => return None,
            _ => {}
        }
        event
            .paths
            .iter()
            .map(|p| p.as_path())
            .find(|p| self.path_matches(p))
    }
}

/// All directories under `root`, including root, skipping hidden ones.
pub fn walk_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            stack.push(entry.path());
        }
        dirs.push(dir);
    }
    Ok(dirs)
}

/// Keeps the watch alive; dropping it stops notifications.
pub struct Watcher {
    _watcher: RecommendedWatcher,
}

/// Start watching the script, or its whole directory tree when configured
/// to, sending relevant changes to `tx`.
pub fn watch(script: &ScriptRef, config: &Config, tx: Sender<Event>) -> anyhow::Result<Watcher> {
    let filter = Filter::new(script, config);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => match filter.matches(&event) {
                Some(path) => Event::Changed(path.to_path_buf()),
                None => return,
            },
            Err(err) => Event::Error(err.to_string()),
        };
        // The send only fails once the supervisor is gone.
        let _ = tx.send(event);
    })?;

    if config.watches_tree() {
        for dir in walk_dirs(&script.dir)? {
            tracing::debug!("watching {}", dir.display());
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        }
    } else {
        // Editors that save by renaming a new file over the script replace
        // its inode, so the directory is watched rather than the file.
        tracing::debug!("watching {} in {}", script.name, script.dir.display());
        watcher.watch(&script.dir, RecursiveMode::NonRecursive)?;
    }
    Ok(Watcher { _watcher: watcher })
}
