//! Builds a script into its cached binary by running the external toolchain.
//!
//! Toolchain commands are shell command lines from the config, where `$in`
//! and `$out` (or `${in}`/`${out}`) expand to the step's input and output
//! paths and `$$` is a literal dollar.  Other `$` references are left for
//! the shell.

use crate::cache::BinaryRef;
use crate::config::Config;
use crate::fs::{self, MTime};
use crate::hashbang::HashbangGuard;
use crate::process::{self, Termination};
use crate::script::ScriptRef;
use anyhow::anyhow;
use std::path::{Path, PathBuf};

/// The result of running the toolchain.
#[derive(Debug)]
pub struct BuildOutcome {
    pub success: bool,
    /// Combined stdout and stderr of the failing (or last) command.  On
    /// failure this is everything the user gets to see.
    pub output: Vec<u8>,
}

/// Quote a path for the shell, if needed.
#[cfg(unix)]
fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/._-+,:@%".contains(&b));
    if plain {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(not(unix))]
fn shell_quote(s: &str) -> String {
    format!("\"{}\"", s)
}

/// Expand `$in`/`$out` in a command template.
pub fn expand(template: &str, input: &Path, output: &Path) -> String {
    let input = shell_quote(&input.to_string_lossy());
    let output = shell_quote(&output.to_string_lossy());
    let mut result = String::with_capacity(template.len() + input.len() + output.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        let ident_end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if let Some(after) = rest.strip_prefix('$') {
            result.push('$');
            rest = after;
        } else if let Some(after) = rest.strip_prefix("{in}") {
            result.push_str(&input);
            rest = after;
        } else if let Some(after) = rest.strip_prefix("{out}") {
            result.push_str(&output);
            rest = after;
        } else if &rest[..ident_end] == "in" {
            result.push_str(&input);
            rest = &rest[ident_end..];
        } else if &rest[..ident_end] == "out" {
            result.push_str(&output);
            rest = &rest[ident_end..];
        } else {
            result.push('$');
        }
    }
    result.push_str(rest);
    result
}

/// Run one toolchain command line.
fn run_step(cmdline: &str) -> BuildOutcome {
    tracing::debug!("run: {}", cmdline);
    match process::run_command(cmdline) {
        Ok((termination, output)) => BuildOutcome {
            success: termination == Termination::Success,
            output,
        },
        Err(err) => BuildOutcome {
            success: false,
            output: format!("{}: {}\n", cmdline, err).into_bytes(),
        },
    }
}

/// Changes the process working directory and changes it back when dropped.
struct CwdGuard {
    prev: PathBuf,
}

impl CwdGuard {
    /// Returns None if `dir` already is the working directory.
    fn enter(dir: &Path) -> anyhow::Result<Option<CwdGuard>> {
        let prev = std::env::current_dir()?;
        if prev == dir {
            return Ok(None);
        }
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
        Ok(Some(CwdGuard { prev }))
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.prev) {
            tracing::error!("chdir {:?}: {}", self.prev, err);
        }
    }
}

fn remove_object(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Compile the script alone into an object, then link that into the binary.
fn compile_and_link(
    script: &ScriptRef,
    binary: &BinaryRef,
    config: &Config,
) -> anyhow::Result<BuildOutcome> {
    let mut outcome = run_step(&expand(&config.compile_command, &script.path, &binary.object));
    if outcome.success {
        outcome = run_step(&expand(&config.link_command, &binary.object, &binary.path));
    }
    if let Err(err) = remove_object(&binary.object) {
        let msg = format!(
            "could not remove object file {}: {}",
            binary.object.display(),
            err
        );
        if !outcome.success {
            tracing::warn!("{}", msg);
        } else {
            anyhow::bail!(msg);
        }
    }
    Ok(outcome)
}

/// Build the script's whole directory, from within that directory.
fn build_directory(
    script: &ScriptRef,
    binary: &BinaryRef,
    config: &Config,
) -> anyhow::Result<BuildOutcome> {
    let _cwd = CwdGuard::enter(&script.dir)?;
    Ok(run_step(&expand(&config.build_command, &script.path, &binary.path)))
}

/// Build the binary for a script.  The hashbang line is commented out for
/// the duration of the build and restored on every path out of here.
///
/// The binary is stamped with the script's mtime from before the build, so
/// the next run is a cache hit.  Our own hashbang writes bump the script's
/// mtime, so it gets that mtime back too, but only if its contents are what
/// we started from: an edit saved during the build must stay newer than the
/// binary.
pub fn build(script: &ScriptRef, binary: &BinaryRef, config: &Config) -> anyhow::Result<BuildOutcome> {
    let mtime = match fs::stat(&script.path)? {
        MTime::Stamp(t) => t,
        MTime::Missing => anyhow::bail!("could not open script {}: missing", script.path.display()),
    };
    let original = std::fs::read(&script.path)
        .map_err(|err| anyhow!("could not open script {}: {}", script.path.display(), err))?;

    let guard = HashbangGuard::open(&script.path)?;
    let touched = guard.had_hashbang();
    let outcome = if config.whole_directory_build {
        build_directory(script, binary, config)?
    } else {
        compile_and_link(script, binary, config)?
    };
    guard
        .restore()
        .map_err(|err| anyhow!("could not restore hashbang of {}: {}", script.path.display(), err))?;

    let restamp_script = touched && std::fs::read(&script.path)? == original;
    if !restamp_script && touched {
        tracing::debug!("{} changed during the build", script.path.display());
    }
    match (outcome.success, restamp_script) {
        (true, true) => fs::sync_mtime(&script.path, &binary.path, mtime)?,
        (true, false) => fs::set_mtime(&binary.path, mtime)?,
        (false, true) => fs::set_mtime(&script.path, mtime)?,
        (false, false) => {}
    }
    Ok(outcome)
}
